//! Evidence store implementation and per-ticker leases

pub mod embedding;
pub mod locks;
pub mod memory;
pub mod similarity;

pub use embedding::LexicalEmbedder;
pub use locks::TickerLocks;
pub use memory::InMemoryEvidenceStore;
