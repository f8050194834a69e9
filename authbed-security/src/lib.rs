//! Resource-server side of authbed: how an API host trusts a token issuer.
//!
//! A [`ClaimsValidator`] is built from a [`SecurityConfig`] and a
//! [`Backchannel`] to the issuer. Routes are protected with
//! [`policy::enforce_policy`], and handlers receive the caller as an
//! [`AuthenticatedUser`].

pub mod backchannel;
pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod extractor;
pub mod guards;
pub mod identity;
pub mod introspection;
pub mod jwks;
pub mod openid;
pub mod policy;
pub mod validator;

pub use backchannel::{Backchannel, BackchannelResponse};
pub use client::{ClientAuthStyle, ClientCredentials, TokenClient, TokenError, TokenResponse};
pub use config::{SecurityConfig, ValidationMode};
pub use discovery::OpenIdMetadata;
pub use error::SecurityError;
pub use extractor::{authenticate_headers, bearer_token_from_headers, extract_bearer_token};
pub use guards::AuthorizationPolicy;
pub use identity::{build_authenticated_user, AuthenticatedUser};
pub use introspection::IntrospectionClient;
pub use jwks::JwksCache;
pub use openid::{ClaimRoleExtractor, RoleExtractor};
pub use policy::{enforce_policy, PolicyGate};
pub use validator::ClaimsValidator;
