pub mod fixtures;
pub mod logging;
pub mod mock;
pub mod poll;
pub mod server;
