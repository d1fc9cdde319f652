pub mod collector;
pub mod etl;
pub mod geometry;
pub mod jurisdiction;
pub mod retention;
pub mod stats;
pub mod territory;

pub use crate::domain::ports::{Pipeline, PositionStore, Storage};
pub use crate::utils::error::Result;
