//! Services module.

pub mod cache;
pub mod classifier;
pub mod clustering;
pub mod embedder;
pub mod embedding_memo;
pub mod extractor;
pub mod orchestrator;
pub mod vector_ops;

pub use cache::TagCache;
pub use classifier::TagClassifier;
pub use clustering::{Clusterer, Dbscan, DbscanParams};
pub use embedder::Embedder;
pub use embedding_memo::EmbeddingMemo;
pub use extractor::{extract_apps, seed_demo_database};
pub use orchestrator::{Orchestrator, PipelineOutput, RunStats};
pub use vector_ops::VectorOps;
