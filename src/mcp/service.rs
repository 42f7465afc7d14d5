//! MCP service implementation using rmcp.
//!
//! This module defines the DataAgentService struct exposing one tool
//! (`execute_read_query`), one resource (`get_database_catalog`) and one
//! prompt (`base_query`) via the rmcp framework's macros.
//!
//! Handler failures are never returned as protocol errors: they are logged
//! and returned to the client as `Error: ...` text. Only a read of an unknown
//! resource URI is rejected at the protocol level.

use crate::db::ConnectionManager;
use crate::error::DbError;
use crate::mcp::prompts::render_base_query;
use crate::tools::envelope::{format_error_response, format_text_response};
use crate::tools::{CatalogReader, QueryToolHandler, ReadQueryInput};
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::router::prompt::PromptRouter,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{
        AnnotateAble, CallToolResult, Content, GetPromptRequestParam, GetPromptResult,
        Implementation, ListPromptsResult, ListResourcesResult, PaginatedRequestParam,
        PromptMessage, PromptMessageRole, ProtocolVersion, RawResource, ReadResourceRequestParam,
        ReadResourceResult, ResourceContents, ServerCapabilities, ServerInfo,
    },
    prompt, prompt_handler, prompt_router,
    service::RequestContext,
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};

/// URI of the catalog resource.
pub const CATALOG_URI: &str = "catalog://database";
/// Name of the catalog resource.
pub const CATALOG_RESOURCE_NAME: &str = "get_database_catalog";

/// Arguments of the `base_query` prompt.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct BaseQueryArgs {
    /// Business question to answer with SQL
    pub qry: String,
}

#[derive(Clone)]
pub struct DataAgentService {
    /// Shared owner of the single database connection
    connection_manager: Arc<ConnectionManager>,
    catalog: CatalogReader,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
    prompt_router: PromptRouter<Self>,
}

impl DataAgentService {
    /// Create a new DataAgentService instance.
    ///
    /// # Arguments
    ///
    /// * `connection_manager` - Shared owner of the database connection
    /// * `catalog` - Reader for the schema catalog document
    pub fn new(connection_manager: Arc<ConnectionManager>, catalog: CatalogReader) -> Self {
        Self {
            connection_manager,
            catalog,
            tool_router: Self::tool_router(),
            prompt_router: Self::prompt_router(),
        }
    }

    /// Run a read query and render the text returned to the client.
    ///
    /// `Ok` holds the pretty-printed success envelope, `Err` the error text.
    pub async fn read_query(&self, sql: &str) -> Result<String, String> {
        let handler = QueryToolHandler::new(self.connection_manager.clone());
        match handler.run(sql).await {
            Ok(envelope) => Ok(format_text_response(&envelope)),
            Err(e) => {
                error!(
                    error = %e,
                    retryable = e.is_retryable(),
                    suggestion = e.suggestion(),
                    "Error executing read query"
                );
                Err(format_error_response(&e))
            }
        }
    }

    /// Catalog text, or the error text when it cannot be read.
    pub async fn database_catalog(&self) -> String {
        match self.catalog.read().await {
            Ok(text) => format_text_response(&text),
            Err(DbError::Catalog { message }) => {
                error!(error = %message, "Error fetching database catalog");
                format_error_response(message)
            }
            Err(e) => {
                error!(error = %e, "Error fetching database catalog");
                format_error_response(&e)
            }
        }
    }

    fn catalog_resource() -> rmcp::model::Resource {
        let mut resource = RawResource::new(CATALOG_URI, CATALOG_RESOURCE_NAME);
        resource.description =
            Some("Fetches the database schema and table information.".to_string());
        resource.no_annotation()
    }

    /// Contents of the resource at `uri`.
    async fn resource_contents(&self, uri: &str) -> Result<ReadResourceResult, McpError> {
        if uri != CATALOG_URI {
            return Err(McpError::resource_not_found(
                format!("Unknown resource uri: {uri}"),
                Some(serde_json::json!({ "uri": uri })),
            ));
        }
        let text = self.database_catalog().await;
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(text, uri)],
        })
    }
}

#[tool_router]
impl DataAgentService {
    #[tool(
        description = "Executes a SQL query to read from the database.\nReturns the rows as JSON with column names, types and the row count."
    )]
    async fn execute_read_query(
        &self,
        Parameters(input): Parameters<ReadQueryInput>,
    ) -> Result<CallToolResult, McpError> {
        Ok(match self.read_query(&input.sql).await {
            Ok(text) => CallToolResult::success(vec![Content::text(text)]),
            Err(text) => CallToolResult::error(vec![Content::text(text)]),
        })
    }
}

#[prompt_router]
impl DataAgentService {
    /// Create a SQL query against the database
    #[prompt(name = "base_query")]
    async fn base_query(
        &self,
        Parameters(args): Parameters<BaseQueryArgs>,
    ) -> Result<Vec<PromptMessage>, McpError> {
        info!("Prompt: base_query");
        let text = render_base_query(self.connection_manager.db_type(), &args.qry);
        Ok(vec![PromptMessage::new_text(PromptMessageRole::User, text)])
    }
}

#[tool_handler]
#[prompt_handler]
impl ServerHandler for DataAgentService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_prompts()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: "sql-agent-mcp".to_owned(),
                title: Some("SQL Data Agent".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(format!(
                "Read-only analyst access to a {} database.\n\
                \n\
                ## Workflow\n\
                1. Read the `get_database_catalog` resource to learn the `dim_`/`fct_` tables\n\
                2. Call `execute_read_query` with a single SQL statement\n\
                3. Results come back as {{\"status\", \"metadata\", \"results\"}} JSON\n\
                \n\
                Failures are returned as text starting with `Error: `.",
                self.connection_manager.db_type()
            )),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult::with_all_items(vec![
            Self::catalog_resource(),
        ]))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        self.resource_contents(&request.uri).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Credentials;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_service(catalog: CatalogReader) -> DataAgentService {
        let manager = Arc::new(ConnectionManager::new(Credentials::sqlite(
            "/nonexistent/dir/x.db",
        )));
        DataAgentService::new(manager, catalog)
    }

    #[test]
    fn test_server_info() {
        let service = create_test_service(CatalogReader::default());
        let info = service.get_info();
        assert_eq!(info.server_info.name, "sql-agent-mcp");
        assert!(info.capabilities.tools.is_some());
        assert!(info.capabilities.prompts.is_some());
        assert!(info.capabilities.resources.is_some());
        assert!(info.instructions.unwrap().contains("SQLite"));
    }

    #[test]
    fn test_routers_register_tool_and_prompt() {
        let service = create_test_service(CatalogReader::default());
        let tools = service.tool_router.list_all();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "execute_read_query");

        let prompts = service.prompt_router.list_all();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].name, "base_query");
    }

    #[test]
    fn test_catalog_resource_listing() {
        let resource = DataAgentService::catalog_resource();
        assert_eq!(resource.uri, CATALOG_URI);
        assert_eq!(resource.name, CATALOG_RESOURCE_NAME);
    }

    #[tokio::test]
    async fn test_read_query_without_connection_is_error_text() {
        let service = create_test_service(CatalogReader::default());
        let err = service.read_query("SELECT 1").await.unwrap_err();
        assert!(err.starts_with("Error: "));
        assert!(err.contains("unable to open database file"));
    }

    #[tokio::test]
    async fn test_blank_catalog_is_error_text() {
        let file = NamedTempFile::new().unwrap();
        let service =
            create_test_service(CatalogReader::new(Some(file.path().to_path_buf())));
        assert_eq!(
            service.database_catalog().await,
            "Error: Unable to fetch catalog data."
        );
    }

    #[tokio::test]
    async fn test_unknown_resource_uri_is_rejected() {
        let service = create_test_service(CatalogReader::default());
        let err = service
            .resource_contents("catalog://elsewhere")
            .await
            .unwrap_err();
        assert_eq!(err.code.0, -32002);
        assert!(err.message.contains("catalog://elsewhere"));
    }

    #[tokio::test]
    async fn test_catalog_uri_returns_catalog_text() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "dim_store(id, name)").unwrap();
        let service =
            create_test_service(CatalogReader::new(Some(file.path().to_path_buf())));
        let result = service.resource_contents(CATALOG_URI).await.unwrap();
        assert_eq!(result.contents.len(), 1);
        match &result.contents[0] {
            ResourceContents::TextResourceContents { uri, text, .. } => {
                assert_eq!(uri, CATALOG_URI);
                assert_eq!(text, "dim_store(id, name)");
            }
            other => panic!("unexpected contents: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_json_catalog_is_pretty_printed() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"nodes":{{"dim_store":{{}}}}}}"#).unwrap();
        let service =
            create_test_service(CatalogReader::new(Some(file.path().to_path_buf())));
        let text = service.database_catalog().await;
        assert!(text.starts_with("{\n  \"nodes\""));
    }
}
