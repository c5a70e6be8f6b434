//! Data access layer (Repository pattern)

pub mod application;
pub mod audit;
pub mod request;

pub use application::ApplicationRepository;
pub use audit::AuditRepository;
pub use request::AccessRequestRepository;
