use crate::error::{error_message, KerioError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Client identification sent with `Session.login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub name: String,
    pub vendor: String,
    pub version: String,
}

impl Default for Application {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            vendor: "Tuxis".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub application: Application,
    pub user_name: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiVersion {
    pub api_version: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedConstant {
    pub name: String,
    pub value: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamedConstantList {
    #[serde(default)]
    pub constants: Vec<NamedConstant>,
}

#[derive(Debug, Default, Deserialize)]
struct RawResponse {
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<Value>>,
    #[serde(default)]
    result: Option<Value>,
}

/// Shape of a JSON-RPC response body.
///
/// `error` wins over `errors`, which wins over `result`. A body carrying
/// none of them is an acknowledgement without a value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawResponse")]
pub enum ResponsePayload {
    Error(Value),
    Errors(Vec<Value>),
    Result(Value),
    Empty,
}

impl From<RawResponse> for ResponsePayload {
    fn from(raw: RawResponse) -> Self {
        if let Some(error) = raw.error {
            return ResponsePayload::Error(error);
        }
        match raw.errors {
            Some(errors) if !errors.is_empty() => ResponsePayload::Errors(errors),
            _ => match raw.result {
                Some(result) => ResponsePayload::Result(result),
                None => ResponsePayload::Empty,
            },
        }
    }
}

impl ResponsePayload {
    /// Decode a response body, which must be a JSON object.
    pub fn parse(body: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(body)?;
        if !value.is_object() {
            return Err(KerioError::Decode(serde::de::Error::custom(format!(
                "expected a JSON object, got {value}"
            ))));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Collapse the payload into a value or a protocol failure for `method`.
    pub fn into_result(self, method: Option<&str>) -> Result<Value> {
        match self {
            ResponsePayload::Error(error) => {
                Err(KerioError::protocol(error_message(&error), method))
            }
            ResponsePayload::Errors(errors) => {
                Err(KerioError::protocol(error_message(&errors[0]), method))
            }
            ResponsePayload::Result(result) => {
                // Batch calls report per-item failures inside the result.
                if let Some(first) = result
                    .get("errors")
                    .and_then(Value::as_array)
                    .and_then(|errors| errors.first())
                {
                    return Err(KerioError::protocol(error_message(first), method));
                }
                Ok(result)
            }
            ResponsePayload::Empty => Ok(Value::Null),
        }
    }
}

/// Turn a raw response body into the call's value or its failure.
pub fn unify(body: &str, method: Option<&str>) -> Result<Value> {
    ResponsePayload::parse(body)?.into_result(method)
}

/// `None` for params that should be left off the wire (`null` or `{}`).
pub fn non_empty_params(params: Value) -> Option<Value> {
    match &params {
        Value::Null => None,
        Value::Object(map) if map.is_empty() => None,
        _ => Some(params),
    }
}
