//! Client-side identity session: login, SUPER_ADMIN impersonation with a
//! single suspended credential, and an authenticated gateway for backend calls.

// === PUBLIC CONTRACT ===
pub mod contract;
pub use contract::{client, error, model};

pub use config::IdentitySessionConfig;
pub use module::IdentitySession;

// === INTERNAL MODULES ===
#[doc(hidden)]
pub mod config;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod gateways;
#[doc(hidden)]
pub mod infra;
#[doc(hidden)]
pub mod module;
