//! App Clusters - Library Entry Point
//!
//! Reads launcher favorites, tags each application with a remote language
//! model (caching tags on disk), embeds the tags and groups similar
//! applications with DBSCAN.

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod traits;

// Re-export commonly used types
pub use config::{Config, Provider};
pub use error::{EmptyInput, Error, Result};
pub use models::{ApplicationRecord, ClusterLabel, GroupedResult, Tags};
pub use services::{Dbscan, DbscanParams, Orchestrator, TagCache};
pub use traits::{EmbeddingClient, TextGenerationClient};
