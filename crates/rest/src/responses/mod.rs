//! Response formatting.
//!
//! - [`envelope`] - the `{ status, data }` envelope every endpoint returns

pub mod envelope;

pub use envelope::{Envelope, ResponseStatus};
