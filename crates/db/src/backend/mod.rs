//! Storage backends implementing [`crate::DocumentStore`].

pub mod memory;
pub mod postgres;
