use async_trait::async_trait;
use thiserror::Error;

/// Failure raised by a server-side tool.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Caller supplied bad or missing parameters (maps to 400).
    #[error("{0}")]
    InvalidParams(String),
}

/// Minimal metadata every tool must expose.
pub trait ToolSpec {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn input_schema(&self) -> serde_json::Value;
}

/// Tool = Spec + execution
#[async_trait]
pub trait Tool: ToolSpec + Send + Sync {
    async fn call(&self, arguments: &serde_json::Value) -> Result<serde_json::Value, ToolError>;
}

/// Pull a required field out of a JSON argument object.
pub fn require<'a>(args: &'a serde_json::Value, field: &str) -> Result<&'a serde_json::Value, ToolError> {
    match args.get(field) {
        Some(v) if !v.is_null() => Ok(v),
        _ => Err(ToolError::InvalidParams(format!("Missing required field: {field}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    impl ToolSpec for Echo {
        fn name(&self) -> &'static str {
            "test.echo"
        }
        fn description(&self) -> &'static str {
            "echo tool"
        }
        fn input_schema(&self) -> serde_json::Value {
            json!({"type":"object"})
        }
    }

    #[async_trait]
    impl Tool for Echo {
        async fn call(&self, args: &serde_json::Value) -> Result<serde_json::Value, ToolError> {
            require(args, "x")?;
            Ok(args.clone())
        }
    }

    #[tokio::test]
    async fn it_runs_echo() {
        let out = Echo.call(&json!({"x":1})).await.unwrap();
        assert_eq!(out["x"], 1);
    }

    #[tokio::test]
    async fn it_reports_missing_fields() {
        let err = Echo.call(&json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing required field: x");
        assert!(matches!(err, ToolError::InvalidParams(_)));
    }
}
