// Partition / reduce / merge top-K engine
pub mod top_k;

// Record-to-key extraction and lossy line reading
pub mod record;

pub mod error;

// Constants used across the engine
pub mod constants;

// Logging setup and report formatting
pub mod utils;

// Re-export main types for convenience
pub use error::TopKError;
pub use record::{ClientIp, KeyExtractor, WhitespaceField};
pub use top_k::{top_k, top_k_from_reader, Candidate, TopKConfig, TopKProcessor, TopKReport, TopKStats};
