//! OpenAPI documentation aggregator, served via Scalar UI at `/docs`.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "mcp-relay API",
        version = "0.1.0",
        description = "Resolves natural-language queries with a language model and an MCP tool server.",
    ),
    tags(
        (name = "Health", description = "Liveness, session status and effective config"),
        (name = "Tools", description = "The connected server's tool catalog"),
        (name = "Query", description = "Model-driven query resolution"),
    ),
    paths(
        crate::api::health::health,
        crate::api::health::config,
        crate::api::tools::tools,
        crate::api::query::query,
    ),
    components(schemas(
        crate::api::HealthResponse,
        crate::api::QueryRequest,
        crate::api::QueryResponse,
        crate::api::ErrorResponse,
    ))
)]
pub struct ApiDoc;
