pub mod etl;

pub use crate::app::pipelines::dsire_pipeline::{DsireExtract, DsirePipeline};
pub use crate::app::pipelines::places_pipeline::PlacesPipeline;
pub use crate::domain::model::{Cell, Table};
pub use crate::domain::ports::{Pipeline, Storage};
pub use crate::utils::error::Result;
