//! Tool registry for the query agents.
//!
//! A tool is a named function with a JSON schema that the language model
//! may call. Input is checked against the schema before the handler runs,
//! so handlers only ever see well-formed input.

use crate::error::{ToolError, TransportError};
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Tool definition in the chat API's function-calling format.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A function the model can call.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (must match what the model calls).
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the input object.
    fn parameters(&self) -> &Value;

    /// Run the tool on input that already passed schema validation.
    async fn call(&self, input: Value) -> Result<Value, ToolError>;
}

type ToolHandler = dyn Fn(Value) -> BoxFuture<'static, Result<Value, ToolError>> + Send + Sync;

/// Closure-backed tool.
pub struct FnTool {
    name: String,
    description: String,
    parameters: Value,
    handler: Arc<ToolHandler>,
}

impl FnTool {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        handler: F,
    ) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler: Arc::new(move |input| Box::pin(handler(input))),
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &Value {
        &self.parameters
    }

    async fn call(&self, input: Value) -> Result<Value, ToolError> {
        (self.handler)(input).await
    }
}

/// The set of tools attached to one agent. Names are unique.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool, rejecting a second tool with the same name.
    pub fn register(&mut self, tool: impl Tool + 'static) -> Result<(), ToolError> {
        if self.get(tool.name()).is_some() {
            return Err(ToolError::Duplicate(tool.name().to_string()));
        }
        debug!("Registered tool: {}", tool.name());
        self.tools.push(Arc::new(tool));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Definitions to send to the model, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition {
                tool_type: "function".to_string(),
                function: FunctionDefinition {
                    name: t.name().to_string(),
                    description: t.description().to_string(),
                    parameters: t.parameters().clone(),
                },
            })
            .collect()
    }

    /// Validate `input` against the tool's schema and run it.
    pub async fn invoke(&self, name: &str, input: Value) -> Result<Value, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        // Models often send null for tools without parameters.
        let input = if input.is_null() {
            Value::Object(Map::new())
        } else {
            input
        };

        debug!("Executing tool: {} with args: {}", name, input);

        validate_input(tool.parameters(), &input)
            .map_err(|message| ToolError::invalid_input(name, message))?;

        let result = tool.call(input).await;
        if let Err(ref e) = result {
            warn!("Tool {} failed: {}", name, e);
        }
        result
    }
}

/// Check `input` against an object schema: required fields, property types,
/// and string enums. Returns the first violation.
pub fn validate_input(schema: &Value, input: &Value) -> Result<(), String> {
    let Some(obj) = input.as_object() else {
        return Err(format!("expected an object, got {}", json_type_name(input)));
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for field in required.iter().filter_map(Value::as_str) {
            if !obj.contains_key(field) {
                return Err(format!("missing required field '{}'", field));
            }
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };

    for (key, value) in obj {
        let Some(prop) = properties.get(key) else {
            continue;
        };

        if let Some(expected) = prop.get("type").and_then(Value::as_str) {
            if !matches_type(value, expected) {
                return Err(format!(
                    "field '{}' expected type '{}', got {}",
                    key,
                    expected,
                    json_type_name(value)
                ));
            }
        }

        if let Some(allowed) = prop.get("enum").and_then(Value::as_array) {
            if !allowed.contains(value) {
                return Err(format!("field '{}' must be one of {}", key, Value::Array(allowed.clone())));
            }
        }
    }

    Ok(())
}

fn matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Deserialize validated input into the tool's typed parameters.
pub fn parse_input<T: DeserializeOwned>(tool: &str, input: Value) -> Result<T, ToolError> {
    serde_json::from_value(input).map_err(|e| ToolError::invalid_input(tool, e.to_string()))
}

/// Serialize a tool's typed output.
pub fn to_output<T: Serialize>(tool: &str, output: &T) -> Result<Value, ToolError> {
    serde_json::to_value(output)
        .map_err(|e| ToolError::execution(tool, TransportError::Decode(e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn echo_tool(name: &str) -> FnTool {
        FnTool::new(
            name,
            "Echo the input",
            json!({
                "type": "object",
                "properties": {
                    "text": {"type": "string", "description": "Text to echo"},
                    "mode": {"type": "string", "enum": ["plain", "loud"]}
                },
                "required": ["text"]
            }),
            |input| async move { Ok(json!({ "echo": input["text"] })) },
        )
    }

    #[tokio::test]
    async fn test_invoke_valid_input() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_tool("echo")).unwrap();

        let output = registry.invoke("echo", json!({"text": "hi"})).await.unwrap();
        assert_eq!(output, json!({"echo": "hi"}));
    }

    #[tokio::test]
    async fn test_schema_violation_skips_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut registry = ToolRegistry::new();
        registry
            .register(FnTool::new(
                "count",
                "Count calls",
                json!({"type": "object", "properties": {"n": {"type": "integer"}}, "required": ["n"]}),
                move |_| {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(Value::Null)
                    }
                },
            ))
            .unwrap();

        let missing = registry.invoke("count", json!({})).await.unwrap_err();
        assert!(matches!(missing, ToolError::InvalidInput { .. }));

        let wrong_type = registry.invoke("count", json!({"n": "3"})).await.unwrap_err();
        assert!(wrong_type.to_string().contains("expected type 'integer'"));

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry.invoke("nope", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_null_input_for_zero_arg_tool() {
        let mut registry = ToolRegistry::new();
        registry
            .register(FnTool::new(
                "ping",
                "Ping",
                json!({"type": "object", "properties": {}, "required": []}),
                |_| async { Ok(json!("pong")) },
            ))
            .unwrap();

        assert_eq!(registry.invoke("ping", Value::Null).await.unwrap(), json!("pong"));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_tool("echo")).unwrap();
        let err = registry.register(echo_tool("echo")).unwrap_err();

        assert!(matches!(err, ToolError::Duplicate(_)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_definitions_in_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_tool("b")).unwrap();
        registry.register(echo_tool("a")).unwrap();

        let defs = registry.definitions();
        let names: Vec<_> = defs.iter().map(|d| d.function.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);

        let value = serde_json::to_value(&defs[0]).unwrap();
        assert_eq!(value["type"], "function");
        assert_eq!(value["function"]["parameters"]["required"][0], "text");
    }

    #[test]
    fn test_enum_validation() {
        let schema = echo_tool("x").parameters().clone();
        assert!(validate_input(&schema, &json!({"text": "a", "mode": "loud"})).is_ok());
        assert!(validate_input(&schema, &json!({"text": "a", "mode": "quiet"})).is_err());
        assert!(validate_input(&schema, &json!(["text"])).is_err());
    }
}
