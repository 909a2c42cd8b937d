//! Tool and resource payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

const JSON_MIME: &str = "application/json";

fn pretty(value: &impl Serialize) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| e.to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn new(name: &str, description: &str, input_schema: Value) -> Self {
        Self {
            name: name.to_string(),
            description: Some(description.to_string()),
            input_schema,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    Text { text: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub content: Vec<ToolContent>,
    #[serde(default, rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl ToolCallResult {
    pub fn json(value: &impl Serialize) -> Self {
        Self {
            content: vec![ToolContent::Text { text: pretty(value) }],
            is_error: None,
        }
    }

    /// A failed call that still reports structured detail, such as the
    /// state a round was left in.
    pub fn json_error(value: &impl Serialize) -> Self {
        Self {
            is_error: Some(true),
            ..Self::json(value)
        }
    }

    /// Text of the first content block.
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().map(|c| match c {
            ToolContent::Text { text } => text.as_str(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDefinition {
    pub uri: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl ResourceDefinition {
    pub fn json(uri: &str, name: &str, description: &str) -> Self {
        Self {
            uri: uri.to_string(),
            name: name.to_string(),
            description: Some(description.to_string()),
            mime_type: Some(JSON_MIME.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTemplateDefinition {
    pub uri_template: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl ResourceTemplateDefinition {
    pub fn json(uri_template: &str, name: &str, description: &str) -> Self {
        Self {
            uri_template: uri_template.to_string(),
            name: name.to_string(),
            description: Some(description.to_string()),
            mime_type: Some(JSON_MIME.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContent {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadResourceResult {
    pub contents: Vec<ResourceContent>,
}

impl ReadResourceResult {
    /// A single JSON document at `uri`.
    pub fn json(uri: &str, value: &impl Serialize) -> Self {
        Self {
            contents: vec![ResourceContent {
                uri: uri.to_string(),
                mime_type: Some(JSON_MIME.to_string()),
                text: pretty(value),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_result_wire_shape() {
        let ok = serde_json::to_value(ToolCallResult::json(&json!({"a": 1}))).unwrap();
        assert_eq!(ok["content"][0]["type"], "text");
        assert!(ok.get("isError").is_none());

        let failed = ToolCallResult::json_error(&json!({"state": "failed"}));
        assert_eq!(failed.is_error, Some(true));
        let body: Value = serde_json::from_str(failed.first_text().unwrap()).unwrap();
        assert_eq!(body["state"], "failed");
    }

    #[test]
    fn test_resource_template_uses_camel_case() {
        let t = serde_json::to_value(ResourceTemplateDefinition::json("x://{id}", "X", "d")).unwrap();
        assert_eq!(t["uriTemplate"], "x://{id}");
        assert_eq!(t["mimeType"], JSON_MIME);
    }
}
