//! Core of the `quay` package registry.
//!
//! This crate holds the registry's business logic: package identity and
//! versioning, the ingestion/update pipeline, the quality scoring engine, and
//! the dependency cost engine. The HTTP layer, the durable metadata database,
//! and the blob storage service are external collaborators consumed through
//! the traits in [`store`] and [`facts`].

/// Result type alias using [`error::RegistryError`] as the default error type.
pub type Result<T, E = error::RegistryError> = core::result::Result<T, E>;

pub mod config;

pub mod cost;

pub mod error;

pub mod facts;

pub mod ident;

pub mod model;

pub mod pipeline;

pub mod scoring;

pub mod store;

mod archive;

pub use archive::{Archive, debloat};

#[cfg(test)]
pub(crate) mod test_support;
