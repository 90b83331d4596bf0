//! The filter-and-update DSL interpreter (C5): pure functions over
//! `serde_json::Value`, with no knowledge of storage, indexing, or locking.

pub mod filter;
pub mod projection;
pub mod update;

pub use filter::document_filter_match;
pub use projection::apply_projection;
pub use update::update_document_with_override;
