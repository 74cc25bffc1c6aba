//! Payer policy retrieval for ClaimPilot.
//!
//! Policy documents are split into sections offline, embedded, and stored per
//! payer. At run time the Retrieve stage asks a [`PolicyRetriever`] for the
//! sections closest to the denial description.
//!
//! Two implementations ship:
//!
//! - [`PolicyIndex`]: SQLite with a sqlite-vec `vec0` table partitioned by payer
//! - [`InMemoryPolicyIndex`]: brute-force cosine similarity, for tests and demos

pub mod error;
pub mod index;
pub mod memory;
pub mod retriever;
pub mod vector;

pub use error::{Result, RetrievalError};
pub use index::PolicyIndex;
pub use memory::InMemoryPolicyIndex;
pub use retriever::{PolicyIndexer, PolicyRetriever, SharedRetriever, similarity_from_distance};
