pub mod args;
pub mod cli;
mod commands;
