//! MCP service implementation using rmcp.
//!
//! `GatewayService` adapts the [`ToolDispatcher`] to rmcp's `ServerHandler`.
//! Tool failures travel inside the envelope with `isError` set, so the
//! protocol-level error path is only used by the resource methods.

use crate::db::Connector;
use crate::mcp::dispatcher::{ToolDispatcher, ToolInvocation, ToolResponse};
use crate::tools::ToolName;
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    model::{
        AnnotateAble, CallToolRequestParam, CallToolResult, Content, Implementation,
        ListResourcesResult, ListToolsResult, PaginatedRequestParam, ProtocolVersion, RawResource,
        ReadResourceRequestParam, ReadResourceResult, ResourceContents, ServerCapabilities,
        ServerInfo, Tool,
    },
    service::RequestContext,
};
use std::sync::Arc;

pub struct GatewayService<C: Connector> {
    dispatcher: Arc<ToolDispatcher<C>>,
}

impl<C: Connector> Clone for GatewayService<C> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
        }
    }
}

impl<C: Connector> GatewayService<C> {
    pub fn new(dispatcher: Arc<ToolDispatcher<C>>) -> Self {
        Self { dispatcher }
    }

    /// Tool descriptors advertised by `tools/list`.
    pub fn tools() -> Vec<Tool> {
        ToolName::ALL
            .into_iter()
            .map(|tool| {
                Tool::new(
                    tool.as_str(),
                    tool.description(),
                    Arc::new(tool.input_schema()),
                )
            })
            .collect()
    }
}

impl From<ToolResponse> for CallToolResult {
    fn from(response: ToolResponse) -> Self {
        let content = vec![Content::text(response.content_text)];
        if response.is_error {
            CallToolResult::error(content)
        } else {
            CallToolResult::success(content)
        }
    }
}

impl<C: Connector> ServerHandler for GatewayService<C> {
    fn get_info(&self) -> ServerInfo {
        let policy = self.dispatcher.policy();
        let writes = if policy.allow_write {
            "INSERT/UPDATE/DELETE are enabled"
        } else {
            "the server is read-only"
        };

        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_owned(),
                title: Some("MySQL MCP Gateway".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(format!(
                "Query the MySQL database `{}`.\n\
                \n\
                ## Tools\n\
                - `list_tables`: table names of the database\n\
                - `describe_table`: column layout of one table\n\
                - `query`: run one SQL statement\n\
                \n\
                ## Policy\n\
                SELECT/SHOW/DESCRIBE always run; CREATE/DROP/ALTER/TRUNCATE are always rejected; \
                {}.\n\
                \n\
                ## Resources\n\
                Each table is readable as `mysql:///{}/<table>`.",
                self.dispatcher.database(),
                writes,
                self.dispatcher.database(),
            )),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(Self::tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let invocation = ToolInvocation::new(
            request.name.to_string(),
            request.arguments.unwrap_or_default(),
        );
        Ok(self.dispatcher.dispatch(invocation).await.into())
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let resources = self
            .dispatcher
            .list_resources()
            .await
            .into_iter()
            .map(|table| {
                let mut raw = RawResource::new(table.uri, table.name);
                raw.description = Some(table.description);
                raw.mime_type = Some(table.mime_type);
                raw.no_annotation()
            })
            .collect();
        Ok(ListResourcesResult::with_all_items(resources))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        let document = self.dispatcher.read_resource(&request.uri).await?;
        let mut contents = ResourceContents::text(document.text, document.uri);
        if let ResourceContents::TextResourceContents { mime_type, .. } = &mut contents {
            *mime_type = Some(document.mime_type);
        }

        Ok(ReadResourceResult {
            contents: vec![contents],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ConnectionPool, MemoryConnector};
    use crate::tools::Policy;

    fn service() -> GatewayService<MemoryConnector> {
        let pool = ConnectionPool::new(MemoryConnector::new(), 1).unwrap();
        GatewayService::new(Arc::new(ToolDispatcher::new(pool, Policy::read_only(), "shuwu")))
    }

    #[test]
    fn test_tools_are_advertised() {
        let names: Vec<String> = GatewayService::<MemoryConnector>::tools()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect();
        assert_eq!(names, vec!["query", "list_tables", "describe_table"]);
    }

    #[test]
    fn test_server_info_enables_tools_and_resources() {
        let info = service().get_info();
        assert!(info.capabilities.tools.is_some());
        assert!(info.capabilities.resources.is_some());
        assert!(info.instructions.unwrap().contains("read-only"));
    }

    #[test]
    fn test_error_response_sets_is_error() {
        let result: CallToolResult = ToolResponse {
            content_text: "{}".to_string(),
            is_error: true,
        }
        .into();
        assert_eq!(result.is_error, Some(true));
    }
}
