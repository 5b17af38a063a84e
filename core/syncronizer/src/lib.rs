mod context;
pub mod rpc;
mod syncronizer;

pub use context::EngineContext;
pub use rpc::BitcoinRpc;
pub use syncronizer::{PassError, PassReport, Syncronizer};
