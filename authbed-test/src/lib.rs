//! In-process OAuth2 test harness.
//!
//! [`Harness::setup`] boots a private token issuer and the values API,
//! wired together without sockets. Tests exchange fixture credentials for
//! tokens and drive the API through [`TestApp`].

mod app;
pub mod fixtures;
mod harness;
mod json_path;

pub use app::{TestApp, TestRequest, TestResponse};
pub use harness::{Harness, HarnessConfig, HarnessError, ValidationMode};
pub use json_path::resolve_path;
