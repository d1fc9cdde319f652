//! Jurisdiction code resolution for boundary features.
//!
//! A feature's code comes from the first strategy in [`CodeResolver::CHAIN`]
//! that yields one.

use serde_json::{Map, Value};

/// ISO 3166 entries for the waters this crate is meant for:
/// (alpha-3, alpha-2, official name).
const COUNTRY_CODES: &[(&str, &str, &str)] = &[
    ("ALA", "AX", "Åland Islands"),
    ("BLR", "BY", "Belarus"),
    ("DEU", "DE", "Germany"),
    ("DNK", "DK", "Denmark"),
    ("EST", "EE", "Estonia"),
    ("FIN", "FI", "Finland"),
    ("FRO", "FO", "Faroe Islands"),
    ("GBR", "GB", "United Kingdom"),
    ("ISL", "IS", "Iceland"),
    ("LTU", "LT", "Lithuania"),
    ("LVA", "LV", "Latvia"),
    ("NLD", "NL", "Netherlands"),
    ("NOR", "NO", "Norway"),
    ("POL", "PL", "Poland"),
    ("RUS", "RU", "Russian Federation"),
    ("SWE", "SE", "Sweden"),
    ("UKR", "UA", "Ukraine"),
];

/// Region names seen in the Baltic datasets that the code table does not
/// cover verbatim.
const REGION_FALLBACK: &[(&str, &str)] = &[
    ("FINLAND", "FI"),
    ("ESTONIA", "EE"),
    ("LATVIA", "LV"),
    ("LITHUANIA", "LT"),
    ("SWEDEN", "SE"),
    ("DENMARK", "DK"),
    ("RUSSIA", "RU"),
    ("POLAND", "PL"),
    ("GERMANY", "DE"),
];

const ISO_FIELDS: &[&str] = &["iso_ter1", "iso_sov1", "iso_sov"];
const NAME_FIELDS: &[&str] = &["territory1", "sovereign1", "geoname", "country", "name"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeResolver {
    /// Embedded ISO territory/sovereign code, alpha-3 reduced to alpha-2.
    IsoField,
    /// Human-readable name looked up in the code table.
    NameLookup,
    /// Built-in table of known region names.
    RegionFallback,
}

impl CodeResolver {
    pub const CHAIN: [CodeResolver; 3] = [
        CodeResolver::IsoField,
        CodeResolver::NameLookup,
        CodeResolver::RegionFallback,
    ];

    pub fn resolve(self, properties: &Map<String, Value>) -> Option<String> {
        match self {
            Self::IsoField => first_property(properties, ISO_FIELDS).and_then(iso_to_alpha2),
            Self::NameLookup => first_property(properties, NAME_FIELDS).and_then(|name| {
                COUNTRY_CODES
                    .iter()
                    .find(|(_, _, official)| official.eq_ignore_ascii_case(name))
                    .map(|(_, alpha2, _)| (*alpha2).to_string())
            }),
            Self::RegionFallback => first_property(properties, NAME_FIELDS).and_then(|name| {
                let upper = name.to_uppercase();
                REGION_FALLBACK
                    .iter()
                    .find(|(region, _)| *region == upper)
                    .map(|(_, code)| (*code).to_string())
            }),
        }
    }
}

/// Applies the resolver chain, short-circuiting on the first hit.
pub fn resolve_code(properties: &Map<String, Value>) -> Option<String> {
    CodeResolver::CHAIN
        .iter()
        .find_map(|resolver| resolver.resolve(properties))
}

/// First non-blank string among `keys`, matching keys case-insensitively.
fn first_property<'a>(properties: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| {
        properties
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .and_then(|(_, v)| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    })
}

fn iso_to_alpha2(code: &str) -> Option<String> {
    let code = code.to_uppercase();
    COUNTRY_CODES
        .iter()
        .find(|(alpha3, alpha2, _)| match code.len() {
            3 => *alpha3 == code,
            2 => *alpha2 == code,
            _ => false,
        })
        .map(|(_, alpha2, _)| (*alpha2).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_iso3_is_reduced_to_alpha2() {
        assert_eq!(resolve_code(&props(json!({"iso_ter1": "fin"}))), Some("FI".to_string()));
        assert_eq!(resolve_code(&props(json!({"ISO_SOV1": " EST "}))), Some("EE".to_string()));
    }

    #[test]
    fn test_iso_fields_are_tried_in_order() {
        let p = props(json!({"iso_sov1": "SWE", "iso_ter1": "ALA"}));
        assert_eq!(CodeResolver::IsoField.resolve(&p), Some("AX".to_string()));
    }

    #[test]
    fn test_name_lookup_when_iso_unknown() {
        let p = props(json!({"iso_ter1": "XXX", "territory1": "Russian Federation"}));
        assert_eq!(CodeResolver::IsoField.resolve(&p), None);
        assert_eq!(resolve_code(&p), Some("RU".to_string()));
    }

    #[test]
    fn test_region_fallback_for_short_names() {
        let p = props(json!({"TERRITORY1": "Russia"}));
        assert_eq!(CodeResolver::NameLookup.resolve(&p), None);
        assert_eq!(resolve_code(&p), Some("RU".to_string()));
    }

    #[test]
    fn test_unresolvable_feature_yields_none() {
        assert_eq!(resolve_code(&props(json!({"name": "Gulf of Bothnia"}))), None);
        assert_eq!(resolve_code(&Map::new()), None);
        assert_eq!(resolve_code(&props(json!({"iso_ter1": 246, "name": ""}))), None);
    }
}
