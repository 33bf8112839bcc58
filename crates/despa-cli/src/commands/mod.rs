//! Subcommands of the `despa` binary.

pub mod catalog;
pub mod compare;
pub mod config;
pub mod detect;
pub mod extract;
pub mod input;
pub mod text;
