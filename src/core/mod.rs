pub mod adjust;
pub mod buildup;
pub mod composite;
pub mod crosswalk;
pub mod etl;
pub mod heuristics;
pub mod linking;
pub mod nrm;
pub mod prompt;
pub mod qa;
pub mod similarity;
pub mod waste;

pub use crate::domain::model::{NamedGroupFile, RateGroupFile, RateIndex, SeedRate};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
