//! HTTP middleware: bearer-token extractor, observability layer, trace spans

pub mod auth;
pub mod metrics;
pub mod trace;

pub use auth::AuthUser;
pub use metrics::ObservabilityLayer;
pub use trace::SanitizedMakeSpan;
