//! ZQLZ Core - Core abstractions for SQL object execution
//!
//! This crate provides the fundamental traits and types that the SQL object
//! layer builds on. It defines:
//!
//! - `Connection` - Trait for connections able to execute call statements
//! - `Handle` - A live connection with its `ConfigRegistry`
//! - `Call` - A stored procedure call being customized and executed
//! - `OutParameters` - Output values produced by a call
//! - Common types like `Value`, `SqlType` and `ZqlzError`

mod config;
mod connection;
mod error;
mod out_parameters;
mod statement;
pub mod template;
mod types;

pub use config::*;
pub use connection::*;
pub use error::*;
pub use out_parameters::*;
pub use statement::*;
pub use types::*;
