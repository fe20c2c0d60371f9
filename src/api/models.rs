use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data_models::ToolResponse;

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub tool_name: String,
    #[serde(default)]
    pub parameters: Option<Value>,
}

impl ExecuteRequest {
    /// The postcode parameter as given, untrimmed. Falsy JSON values
    /// (missing, null, false, 0, empty string) and arrays/objects count as
    /// absent; other scalars are passed through unvalidated.
    pub fn postcode(&self) -> Option<String> {
        match self.parameters.as_ref()?.get("postcode")? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) if n.as_f64().is_some_and(|v| v != 0.0) => Some(n.to_string()),
            Value::Bool(true) => Some("true".to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub result: ToolResponse,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}
