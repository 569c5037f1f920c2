//! Core engine for matching a local video library against a media
//! catalog: title similarity, relation-graph traversal, fetch
//! scheduling, and library reconciliation.

pub mod classify;
pub mod config;
pub mod download;
pub mod error;
pub mod matcher;
pub mod models;
pub mod normalize;
pub mod reconciler;
pub mod relations;
pub mod scan;
pub mod scan_log;
pub mod scheduler;
pub mod session;
pub mod source;
