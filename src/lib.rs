//! corpus-forest - versioned vocabulary corpora organized as a forest
//!
//! A corpus is a named, versioned collection of words. Corpora form a
//! forest in which a parent aggregates its children's vocabularies, and
//! each corpus carries derived indices for exact and approximate lookup
//! plus a deterministic hash for cache isolation and change detection.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to the manager)
//! - [`manager`] - Every forest mutation, under per-resource locks
//! - [`services`] - Language and literature workflows built on the manager
//! - [`core`] - Domain types, the corpus entity, indices, hashing, verification
//! - [`store`] - Versioned record storage (in-memory and file-backed)
//! - [`normalize`] - Normalization service seam and a reference implementation
//! - [`search`] - Notifications to downstream search structures
//!
//! # Correctness Invariants
//!
//! 1. The parent/child graph is a forest: no cycles, at most one parent
//! 2. A corpus never lists itself as a child
//! 3. Stored vocabularies are sorted and duplicate-free
//! 4. Every write is checked against the version it was read at

pub mod cli;
pub mod core;
pub mod manager;
pub mod normalize;
pub mod search;
pub mod services;
pub mod store;
