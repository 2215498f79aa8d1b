//! JSON-RPC 2.0 response envelopes.

use serde_json::{json, Value};

/// Wraps a payload into a JSON-RPC 2.0 result envelope.
pub fn wrap_result(value: &Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": -1,
        "result": value,
    })
}

/// Builds a JSON-RPC 2.0 internal-error object around a message.
pub fn wrap_error(message: &str, data: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": -1,
        "error": {
            "code": -32603,
            "message": message,
            "data": data,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_result_nests_under_result() {
        let wrapped = wrap_result(&json!({"height": "100"}));
        assert_eq!(wrapped["jsonrpc"], "2.0");
        assert_eq!(wrapped["result"]["height"], "100");
    }

    #[test]
    fn test_wrap_error_uses_internal_error_code() {
        let wrapped = wrap_error("not found", Value::Null);
        assert_eq!(wrapped["error"]["code"], -32603);
        assert_eq!(wrapped["error"]["message"], "not found");
    }
}
