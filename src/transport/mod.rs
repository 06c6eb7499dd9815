//! Transport layer for the MCP server.
//!
//! The gateway speaks MCP over standard input/output.

pub mod stdio;

pub use stdio::StdioTransport;
