// Domain layer: tabular model, merge rules and API models. No I/O here.

pub mod dsire;
pub mod model;
pub mod places;
pub mod ports;
