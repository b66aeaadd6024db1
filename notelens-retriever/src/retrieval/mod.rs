//! Reconciliation, retrieval, and question handling.

pub mod conversation;
pub mod indexer;
pub mod reformulator;
pub mod retriever;
pub mod source;
