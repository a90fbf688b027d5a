//! JSON-RPC message types for the container service.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC 2.0 error codes used by the server.
pub mod error_codes {
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
}

/// The four remotely callable container operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    IncreaseMass,
    DecreaseMass,
    GetPressure,
    IsDestroyed,
}

impl Method {
    pub const ALL: [Self; 4] = [
        Self::IncreaseMass,
        Self::DecreaseMass,
        Self::GetPressure,
        Self::IsDestroyed,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IncreaseMass => "increaseMass",
            Self::DecreaseMass => "decreaseMass",
            Self::GetPressure => "getPressure",
            Self::IsDestroyed => "isDestroyed",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == value)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Request {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Request {
    pub fn new(id: u64, method: Method, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method: method.as_str(),
            params,
        }
    }
}

/// Parameters of `increaseMass` / `decreaseMass`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub(crate) struct MassParams {
    pub mass: f64,
}

pub(crate) fn mass_params(mass: f64) -> Value {
    serde_json::json!({ "mass": mass })
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorObject {
    pub code: i64,
    pub message: String,
}

/// A response as seen by the client.
#[derive(Debug, Deserialize)]
pub(crate) struct Response {
    pub id: Option<u64>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<ErrorObject>,
}

pub(crate) fn success(id: Value, result: Value) -> Value {
    serde_json::json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "result": result
    })
}

pub(crate) fn failure(id: Value, code: i64, message: impl Into<String>) -> Value {
    serde_json::json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "error": {
            "code": code,
            "message": message.into()
        }
    })
}
