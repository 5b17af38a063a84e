mod balance;
mod checkpoint;
mod config;
mod error;
mod response;
mod source;
mod status;

pub use balance::*;
pub use checkpoint::*;
pub use config::*;
pub use error::*;
pub use response::*;
pub use source::*;
pub use status::*;

/// Height of a block on the base chain.
pub type BlockHeight = u64;
