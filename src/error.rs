use serde_json::Value;

pub type Result<T> = std::result::Result<T, KerioError>;

/// Failure of a single client call.
///
/// Every variant is terminal for the call that produced it; the client never
/// retries on its own.
#[derive(Debug, thiserror::Error)]
pub enum KerioError {
    /// Missing hostname, username or password, or an impossible endpoint.
    #[error("{0}")]
    Configuration(String),

    /// Login was rejected or returned no token.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The server answered with an `error` or `errors` payload.
    #[error("{}", protocol_display(.message, .method.as_deref()))]
    Protocol {
        message: String,
        method: Option<String>,
    },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid JSON response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl KerioError {
    pub fn protocol(message: impl Into<String>, method: Option<&str>) -> Self {
        KerioError::Protocol {
            message: message.into(),
            method: method.map(str::to_string),
        }
    }

    /// The RPC method that triggered the failure, when known.
    pub fn method(&self) -> Option<&str> {
        match self {
            KerioError::Protocol { method, .. } => method.as_deref(),
            _ => None,
        }
    }
}

fn protocol_display(message: &str, method: Option<&str>) -> String {
    match method {
        Some(method) => format!("While running {method}: {message}"),
        None => message.to_string(),
    }
}

/// Render a server error value as human readable text.
///
/// Objects contribute their `message` with `%1`, `%2`, ... placeholders
/// filled from `data.messageParameters.positionalParameters` (or a sibling
/// `messageParameters`, the shape used inside `errors` arrays). Strings are
/// used as-is and anything else falls back to its JSON text.
pub fn error_message(error: &Value) -> String {
    match error {
        Value::String(s) => s.clone(),
        Value::Object(map) => match map.get("message").and_then(Value::as_str) {
            Some(message) => {
                let params = map
                    .get("data")
                    .and_then(|d| d.get("messageParameters"))
                    .or_else(|| map.get("messageParameters"))
                    .and_then(|p| p.get("positionalParameters"))
                    .and_then(Value::as_array);
                match params {
                    Some(params) => substitute_positional(message, params),
                    None => message.to_string(),
                }
            }
            None => error.to_string(),
        },
        other => other.to_string(),
    }
}

fn substitute_positional(message: &str, params: &[Value]) -> String {
    let mut out = String::with_capacity(message.len());
    let mut chars = message.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let index = chars.peek().and_then(|d| d.to_digit(10));
        let param = index
            .and_then(|i| (i as usize).checked_sub(1))
            .and_then(|i| params.get(i));
        match param {
            Some(param) => {
                chars.next();
                match param {
                    Value::String(s) => out.push_str(s),
                    other => out.push_str(&other.to_string()),
                }
            }
            None => out.push(c),
        }
    }

    out
}
