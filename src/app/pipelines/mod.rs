pub mod dsire_pipeline;
pub mod places_pipeline;
