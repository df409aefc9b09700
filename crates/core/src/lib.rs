//! Core types, validation, and error taxonomy for the Glasswing ingestion engine.

pub mod batch;
pub mod envelope;
pub mod error;
pub mod fingerprint;
pub mod limits;

pub use batch::*;
pub use envelope::*;
pub use error::{Error, Result, ValidationErrorCode};
pub use fingerprint::*;
