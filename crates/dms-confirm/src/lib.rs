//! Validation & Confirmation Engine: the quality-check dry run, the
//! eight-step confirmation pipeline, and integrity re-verification (spec
//! §4.6).

pub mod archive;
pub mod confirm;
pub mod error;
pub mod integrity;
pub mod quality;
pub mod sanitize;

pub use confirm::{confirm, verify, ConfirmContext, ConfirmRequest};
pub use error::ConfirmError;
pub use quality::{dry_run_validation, FieldReport, ValidationReport};
