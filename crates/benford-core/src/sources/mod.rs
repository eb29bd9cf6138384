//! Adapters that turn already-decoded collaborator output into samples.

pub mod midi;
pub mod source;
