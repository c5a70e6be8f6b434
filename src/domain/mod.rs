//! Domain models for the access portal

pub mod application;
pub mod common;
pub mod principal;
pub mod request;
pub mod workflow;

pub use application::*;
pub use common::StringUuid;
pub use principal::*;
pub use request::*;
pub use workflow::*;
