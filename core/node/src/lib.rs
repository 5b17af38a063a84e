pub mod config;
mod indexer;

pub use indexer::LightIndexer;
