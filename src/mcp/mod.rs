//! MCP server integration module.
//!
//! This module provides the integration between the MCP protocol and
//! the gateway's tool handlers using the rmcp framework.

pub mod dispatcher;
pub mod service;

pub use dispatcher::{ResourceDocument, TableResource, ToolDispatcher, ToolInvocation, ToolResponse};
pub use service::GatewayService;
