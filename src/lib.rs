//! MySQL MCP Gateway Library
//!
//! This library exposes a single MySQL database to AI assistants over MCP.
//! Statements are classified by their leading keyword and checked against a
//! fixed access policy before they reach a bounded connection pool.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::{GatewayError, GatewayResult};
pub use mcp::{GatewayService, ToolDispatcher};
