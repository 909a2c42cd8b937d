//! One JSON value per line.

use crate::types::{JsonRpcMessage, McpError, McpResult};

pub fn parse_message(line: &str) -> McpResult<JsonRpcMessage> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(McpError::ParseError("Empty message".to_string()));
    }
    serde_json::from_str(trimmed).map_err(|e| McpError::ParseError(e.to_string()))
}

/// Serialize with a trailing newline. serde_json never emits raw newlines
/// inside a compact value, so one frame is always one line.
pub fn frame_message(value: &serde_json::Value) -> McpResult<String> {
    let mut line = serde_json::to_string(value)?;
    line.push('\n');
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_and_garbage_lines_are_parse_errors() {
        assert!(matches!(parse_message("   "), Err(McpError::ParseError(_))));
        assert!(matches!(parse_message("{not json"), Err(McpError::ParseError(_))));
        assert!(matches!(
            parse_message(r#"{"jsonrpc":"2.0","id":1,"result":{}}"#),
            Err(McpError::ParseError(_))
        ));
    }

    #[test]
    fn test_frame_is_one_line() {
        let framed = frame_message(&serde_json::json!({"text": "a\nb"})).unwrap();
        assert_eq!(framed, "{\"text\":\"a\\nb\"}\n");
    }
}
