use crate::domain::model::BoundingBox;
use crate::utils::error::{AisError, Result};
use std::collections::HashSet;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(AisError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(AisError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(AisError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(AisError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(AisError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(AisError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_file_extensions(
    field_name: &str,
    files: &[String],
    allowed_extensions: &[&str],
) -> Result<()> {
    let allowed_set: HashSet<&str> = allowed_extensions.iter().copied().collect();

    for file in files {
        match std::path::Path::new(file)
            .extension()
            .and_then(|ext| ext.to_str())
        {
            Some(extension) if allowed_set.contains(extension) => {}
            Some(extension) => {
                return Err(AisError::InvalidConfigValueError {
                    field: field_name.to_string(),
                    value: file.clone(),
                    reason: format!(
                        "Unsupported file extension: {}. Allowed extensions: {}",
                        extension,
                        allowed_extensions.join(", ")
                    ),
                });
            }
            None => {
                return Err(AisError::InvalidConfigValueError {
                    field: field_name.to_string(),
                    value: file.clone(),
                    reason: "File has no extension or invalid filename".to_string(),
                });
            }
        }
    }

    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| AisError::MissingConfigError {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AisError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(AisError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

/// WGS84 ranges and min < max on both axes.
pub fn validate_bbox(field_name: &str, bbox: &BoundingBox) -> Result<()> {
    validate_range(&format!("{}.min_lon", field_name), bbox.min_lon, -180.0, 180.0)?;
    validate_range(&format!("{}.max_lon", field_name), bbox.max_lon, -180.0, 180.0)?;
    validate_range(&format!("{}.min_lat", field_name), bbox.min_lat, -90.0, 90.0)?;
    validate_range(&format!("{}.max_lat", field_name), bbox.max_lat, -90.0, 90.0)?;

    if bbox.min_lon >= bbox.max_lon || bbox.min_lat >= bbox.max_lat {
        return Err(AisError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: format!(
                "[{}, {}] x [{}, {}]",
                bbox.min_lon, bbox.max_lon, bbox.min_lat, bbox.max_lat
            ),
            reason: "minimum must be below maximum on both axes".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("source.endpoint", "https://example.com").is_ok());
        assert!(validate_url("source.endpoint", "http://example.com").is_ok());
        assert!(validate_url("source.endpoint", "").is_err());
        assert!(validate_url("source.endpoint", "invalid-url").is_err());
        assert!(validate_url("source.endpoint", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_file_extensions() {
        let files = vec!["baltic.geojson".to_string(), "zones.json".to_string()];
        assert!(validate_file_extensions("candidates", &files, &["geojson", "json"]).is_ok());

        let invalid_files = vec!["zones.shp".to_string()];
        assert!(validate_file_extensions("candidates", &invalid_files, &["geojson"]).is_err());
        assert!(validate_file_extensions("candidates", &["README".to_string()], &["geojson"]).is_err());
    }

    #[test]
    fn test_validate_bbox() {
        assert!(validate_bbox("region", &BoundingBox::BALTIC).is_ok());

        let out_of_range = BoundingBox {
            max_lat: 95.0,
            ..BoundingBox::BALTIC
        };
        assert!(validate_bbox("region", &out_of_range).is_err());

        let flat = BoundingBox {
            max_lon: 17.0,
            ..BoundingBox::BALTIC
        };
        assert!(validate_bbox("region", &flat).is_err());
    }

    #[test]
    fn test_validate_required_field() {
        assert_eq!(*validate_required_field("store.key", &Some(3)).unwrap(), 3);
        assert!(validate_required_field::<String>("store.key", &None).is_err());
    }
}
