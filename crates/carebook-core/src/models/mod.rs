//! Domain models for carebook.

mod file_ref;
mod patient;
mod record;

pub use file_ref::*;
pub use patient::*;
pub use record::*;
