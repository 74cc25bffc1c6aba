//! Shared domain types for the ClaimPilot appeal pipeline.
//!
//! These types cross crate boundaries: the retrieval crate produces
//! [`PolicyExcerpt`]s, the pipeline consumes [`ClaimInput`] and emits a
//! [`DenialCategory`], and the CLI reads and prints all of them.

pub mod category;
pub mod claim;
pub mod policy;

pub use category::{DenialCategory, ParseCategoryError};
pub use claim::{ClaimInput, REQUIRED_FIELDS};
pub use policy::{PolicyExcerpt, PolicySection};
