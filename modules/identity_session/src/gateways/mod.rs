pub mod audit;
pub mod local;
pub mod resource;

pub use audit::AuditLogReader;
pub use local::SessionLocalClient;
pub use resource::ResourceGateway;
