pub mod file;
pub mod memory;

pub use file::JsonFileCredentialStore;
pub use memory::InMemoryCredentialStore;
