pub mod http_identity_client;

pub use http_identity_client::HttpIdentityClient;
