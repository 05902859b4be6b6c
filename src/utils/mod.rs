pub mod error;
pub mod logger;
pub mod monitor;
pub mod secret;
pub mod text;
pub mod validation;
