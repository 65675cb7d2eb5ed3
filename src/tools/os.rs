use async_trait::async_trait;
use serde_json::json;

use crate::core::tool::{Tool, ToolError, ToolSpec};

/// OS task/alarm configuration. Accepts parameters but renders nothing yet.
#[derive(Clone, Default)]
pub struct OsConfigTool;

impl ToolSpec for OsConfigTool {
    fn name(&self) -> &'static str {
        "generateOsConfig"
    }
    fn description(&self) -> &'static str {
        "Generate AUTOSAR OS configuration (tasks, alarms, scheduling policy). Not rendered yet."
    }
    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "taskCount": { "type": "integer", "minimum": 1, "maximum": 32 },
                "tickDuration": { "type": "number", "minimum": 0.1, "maximum": 100.0 },
                "schedulingPolicy": {
                    "type": "string",
                    "enum": ["FULL_PREEMPTIVE", "NON_PREEMPTIVE", "MIXED"]
                }
            },
            "required": ["taskCount", "tickDuration"]
        })
    }
}

#[async_trait]
impl Tool for OsConfigTool {
    async fn call(&self, arguments: &serde_json::Value) -> Result<serde_json::Value, ToolError> {
        tracing::info!(params = %arguments, "OS configuration requested");
        Ok(json!({
            "success": true,
            "module": "OS",
            "message": "OS configuration generation coming soon",
            "parameters": arguments,
        }))
    }
}
