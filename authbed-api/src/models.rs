use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Value {
    pub id: u64,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct ValueRequest {
    pub value: String,
}

impl ValueRequest {
    /// Extract the stored value from a request body of any shape.
    ///
    /// `{"value": ...}` and a bare JSON string are unwrapped; anything else,
    /// including an empty body, is stored as raw text.
    pub fn from_body(body: &str) -> String {
        if let Ok(request) = serde_json::from_str::<ValueRequest>(body) {
            return request.value;
        }
        match serde_json::from_str::<String>(body) {
            Ok(value) => value,
            Err(_) => body.to_string(),
        }
    }
}
