//! HTTP middleware.
//!
//! - [`envelope`] - Wraps bare framework error responses in the envelope

pub mod envelope;

pub use envelope::envelope_bare_errors;
