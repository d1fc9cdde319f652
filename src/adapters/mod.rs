// Adapters layer: concrete implementations for external systems (feed, store, files).

pub mod digitraffic;
pub mod local;
pub mod supabase;
