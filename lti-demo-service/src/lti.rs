//! LTI 1.3 protocol pieces the tool consumes.
//!
//! - [`claims`]: typed view over the launch token's claim set
//! - [`roles`]: role URIs and the standard instructor check
//! - [`token`]: the [`LaunchValidator`] seam and the payload decoder
//! - [`login`]: OIDC third-party login initiation

pub mod claims;
pub mod login;
pub mod roles;
pub mod token;

pub use claims::LtiClaims;
pub use login::{LoginInitiation, authorization_redirect, generate_opaque_id};
pub use roles::RoleSet;
pub use token::{LaunchValidator, UnverifiedTokenDecoder};
