//! Shared plumbing for the authbed workspace: HTTP errors, tracing layers,
//! guard traits, and YAML config helpers.

pub mod config;
pub mod error;
pub mod guards;
pub mod layers;

pub use config::{ConfigError, ConfigValidationDetail};
pub use error::{error_response, HttpError};
pub use guards::{Guard, GuardContext, Identity};
pub use layers::{
    catch_panic_layer, default_trace, init_tracing, try_init_test_tracing, with_default_layers,
};
