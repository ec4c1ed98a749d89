//! Source-control webhook ingest

pub mod events;
pub mod ingest;
pub mod signature;

pub use ingest::{ingest, WebhookDelivery};
pub use signature::verify_signature;
