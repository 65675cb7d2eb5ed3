use std::sync::Arc;

use crate::core::tool::{Tool, ToolError};
use crate::domain::ToolDescriptor;
use crate::tools::{CanConfigTool, ExportArxmlTool, NvmConfigTool, OsConfigTool, ValidateConfigTool};

/// Ordered set of server-side tools, looked up by name.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Arc<Vec<Arc<dyn Tool>>>,
}

#[derive(Debug)]
pub enum CallError {
    UnknownTool(String),
    Tool(ToolError),
}

impl ToolRegistry {
    pub fn with_tools<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Tool>>,
    {
        Self { tools: Arc::new(iter.into_iter().collect()) }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn list(&self) -> Vec<ToolDescriptor> {
        self.tools
            .iter()
            .map(|t| ToolDescriptor {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    pub async fn call(&self, name: &str, args: &serde_json::Value) -> Result<serde_json::Value, CallError> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| CallError::UnknownTool(name.to_string()))?;
        tool.call(args).await.map_err(CallError::Tool)
    }
}

/// Registry with every configuration tool, in catalog order.
pub fn build_registry() -> ToolRegistry {
    ToolRegistry::with_tools([
        Arc::new(CanConfigTool) as Arc<dyn Tool>,
        Arc::new(NvmConfigTool),
        Arc::new(OsConfigTool),
        Arc::new(ValidateConfigTool),
        Arc::new(ExportArxmlTool),
    ])
}
