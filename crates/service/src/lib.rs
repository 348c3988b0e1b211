#![forbid(unsafe_code)]

mod config;
mod error;
mod history;
mod provenance;

pub use config::ServiceConfig;
pub use error::ServiceError;
pub use history::{CheckoutOutcome, HistoryEntry, NodeDetail};
pub use provenance::{Provenance, Recorded, RecordRequest, ResolvedArtifact};
