//! Business logic layer

pub mod access_request;
pub mod approval;
pub mod catalog;

pub use access_request::{AccessRequestService, Viewer};
pub use approval::{ApprovalService, DecisionOutcome};
pub use catalog::CatalogService;
