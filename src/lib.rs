pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;

pub use adapters::{digitraffic::AisFeedClient, local::LocalStorage, supabase::SupabaseStore};
pub use core::{
    collector::CollectorPipeline,
    etl::EtlEngine,
    retention::{execute_deletion, plan_deletion, Confirmation, RetentionClassifier},
    territory::{BoundaryClassifier, LazyClassifier},
};
pub use domain::model::{Jurisdiction, PositionReport};
pub use utils::error::{AisError, Result};
