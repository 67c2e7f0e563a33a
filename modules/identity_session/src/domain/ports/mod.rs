pub mod identity;
pub mod store;

pub use identity::IdentityPort;
pub use store::{CredentialStore, PersistedSession};
