//! core
//!
//! Domain types, the corpus entity, and the pure algorithms around it.
//!
//! # Modules
//!
//! - [`types`] - Strong types: CorpusId, StorageId, CorpusKind, Language
//! - [`hashing`] - Deterministic vocabulary fingerprints
//! - [`index`] - Derived lookup indices and candidate generation
//! - [`record`] - The persisted record schema
//! - [`corpus`] - The corpus entity, its factory and the vocabulary merger
//! - [`graph`] - Forest representation and traversal
//! - [`verify`] - Structural verification of a whole forest
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at construction
//! - Schemas are strict and self-describing
//! - Nothing here performs I/O except config loading
pub mod config;
pub mod corpus;
pub mod graph;
pub mod hashing;
pub mod index;
pub mod record;
pub mod types;
pub mod verify;
