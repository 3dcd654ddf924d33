use crate::tool::{SessionError, ToolDescriptor, ToolSession};
use indexmap::IndexMap;
use tracing::{info, warn};

/// Snapshot of the tools a session advertises.
///
/// Fetched once per connection and handed to every model call; never
/// refetched in the middle of a resolution. Keeps the provider's order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolCatalog {
    tools: IndexMap<String, ToolDescriptor>,
}

impl ToolCatalog {
    /// Ask the session for its tools (one `list_tools` call) and materialize them.
    pub async fn fetch(session: &dyn ToolSession) -> Result<Self, SessionError> {
        let descriptors = session.list_tools().await?;
        let catalog = Self::from_descriptors(descriptors);
        info!(
            count = catalog.len(),
            tools = ?catalog.names().collect::<Vec<_>>(),
            "MCP available tools"
        );
        Ok(catalog)
    }

    /// Build a catalog from descriptors. A repeated name replaces the
    /// earlier entry in place.
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = ToolDescriptor>) -> Self {
        let mut tools = IndexMap::new();
        for desc in descriptors {
            if tools.contains_key(&desc.name) {
                warn!(name = %desc.name, "Duplicate tool name in catalog, keeping the last one");
            }
            tools.insert(desc.name.clone(), desc);
        }
        Self { tools }
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// All descriptors in provider order (for sending to the LLM).
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.values().cloned().collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{descriptor, FakeToolSession};

    #[tokio::test]
    async fn test_fetch_materializes_descriptors() {
        let session = FakeToolSession::new()
            .with_tool(descriptor("list_files"))
            .with_tool(descriptor("read_file"));

        let catalog = ToolCatalog::fetch(&session).await.unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["list_files", "read_file"]);
        assert!(catalog.contains("read_file"));
        assert_eq!(catalog.get("list_files").unwrap().description, "list_files tool");
        assert_eq!(session.list_calls(), 1);
    }

    #[tokio::test]
    async fn test_fetch_twice_is_idempotent() {
        let session = FakeToolSession::new()
            .with_tool(descriptor("a"))
            .with_tool(descriptor("b"));

        let first = ToolCatalog::fetch(&session).await.unwrap();
        let second = ToolCatalog::fetch(&session).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.descriptors(), second.descriptors());
    }

    #[tokio::test]
    async fn test_fetch_propagates_session_failure() {
        let session = FakeToolSession::new().failing_list();
        let err = ToolCatalog::fetch(&session).await.unwrap_err();
        assert!(matches!(err, SessionError::Transport(_)));
    }

    #[test]
    fn test_duplicate_name_keeps_last() {
        let mut second = descriptor("echo");
        second.description = "newer".to_string();
        let catalog = ToolCatalog::from_descriptors(vec![descriptor("echo"), second]);

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("echo").unwrap().description, "newer");
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = ToolCatalog::default();
        assert!(catalog.is_empty());
        assert!(catalog.descriptors().is_empty());
        assert!(catalog.get("anything").is_none());
    }
}
