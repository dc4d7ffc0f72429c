#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::config::HarnessConfig;
use crate::loopback::LoopbackRemote;
use dupcheck_contracts::record::{StoredContract, StoredPayment};

pub const MAX_ERROR_MESSAGE_LEN: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    CustomerContract,
    CustomerPayment,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::CustomerContract => "/api/customer-contract",
            Endpoint::CustomerPayment => "/api/customer-payment",
        }
    }
}

/// The load-bearing split: `Rejected` is a server-side business judgment
/// and a valid assertion target for negative scenarios; `Unreachable`
/// means the service produced no judgment at all and is always
/// inconclusive; `Malformed` marks a success response the harness could
/// not interpret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    Rejected { status: u16, message: String },
    Unreachable { cause: String },
    Malformed { detail: String },
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteError::Rejected { status, message } => {
                write!(f, "rejected with status {status}: {message}")
            }
            RemoteError::Unreachable { cause } => write!(f, "unreachable: {cause}"),
            RemoteError::Malformed { detail } => write!(f, "malformed response: {detail}"),
        }
    }
}

impl std::error::Error for RemoteError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedRecord {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRemoteConfig {
    pub base_url: String,
    pub connect_timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ScriptedResponse {
    pub settle_after_ms: u64,
    pub result: Result<i64, RemoteError>,
}

/// Canned per-marker responses keyed by the payload's distinguishing
/// marker (`description` or `note`). Each response is consumed once, so a
/// burst maps deterministically onto its script regardless of completion
/// order.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRemote {
    responses: Arc<Mutex<HashMap<String, ScriptedResponse>>>,
}

impl ScriptedRemote {
    #[cfg(test)]
    fn new(responses: HashMap<String, ScriptedResponse>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
        }
    }

    fn submit(&self, payload: &Value) -> Result<CreatedRecord, RemoteError> {
        let marker = payload_marker(payload);
        let scripted = {
            let mut responses = self.responses.lock().map_err(|_| RemoteError::Unreachable {
                cause: "scripted response table lock poisoned".to_string(),
            })?;
            marker.as_deref().and_then(|m| responses.remove(m))
        };
        match scripted {
            Some(response) => {
                if response.settle_after_ms > 0 {
                    std::thread::sleep(Duration::from_millis(response.settle_after_ms));
                }
                response.result.map(|id| CreatedRecord { id })
            }
            None => Err(RemoteError::Unreachable {
                cause: match marker {
                    Some(m) => format!("no scripted response for marker {m:?}"),
                    None => "payload carries no marker field".to_string(),
                },
            }),
        }
    }
}

fn payload_marker(payload: &Value) -> Option<String> {
    payload
        .get("description")
        .or_else(|| payload.get("note"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[derive(Debug, Clone)]
pub enum RemoteClientRuntime {
    Http(HttpRemoteConfig),
    Loopback(LoopbackRemote),
    Scripted(ScriptedRemote),
    AlwaysFail { cause: String },
}

impl RemoteClientRuntime {
    /// A configured target URL selects the HTTP client; otherwise the run
    /// exercises the in-memory loopback remote.
    pub fn from_config(config: &HarnessConfig) -> Result<Self, String> {
        match &config.target_url {
            Some(base_url) => {
                Url::parse(base_url).map_err(|e| format!("invalid target url {base_url}: {e}"))?;
                Ok(Self::Http(HttpRemoteConfig {
                    base_url: base_url.clone(),
                    connect_timeout_ms: config.connect_timeout_ms,
                }))
            }
            None => Ok(Self::Loopback(LoopbackRemote::new())),
        }
    }

    #[cfg(test)]
    pub fn scripted_for_tests(responses: HashMap<String, ScriptedResponse>) -> Self {
        Self::Scripted(ScriptedRemote::new(responses))
    }

    #[cfg(test)]
    pub fn always_fail_for_tests(cause: &str) -> Self {
        Self::AlwaysFail {
            cause: cause.to_string(),
        }
    }

    pub fn target_label(&self) -> String {
        match self {
            Self::Http(config) => config.base_url.clone(),
            Self::Loopback(_) => "loopback".to_string(),
            Self::Scripted(_) => "scripted".to_string(),
            Self::AlwaysFail { .. } => "always-fail".to_string(),
        }
    }

    pub fn submit(
        &self,
        endpoint: Endpoint,
        payload: &Value,
        timeout_ms: u64,
    ) -> Result<CreatedRecord, RemoteError> {
        match self {
            Self::Http(config) => http_submit(config, endpoint, payload, timeout_ms),
            Self::Loopback(remote) => remote.submit(endpoint, payload),
            Self::Scripted(remote) => remote.submit(payload),
            Self::AlwaysFail { cause } => Err(RemoteError::Unreachable {
                cause: cause.clone(),
            }),
        }
    }

    pub fn list_contracts(&self, timeout_ms: u64) -> Result<Vec<StoredContract>, RemoteError> {
        match self {
            Self::Http(config) => http_list(config, Endpoint::CustomerContract, timeout_ms),
            Self::Loopback(remote) => remote.list_contracts(),
            Self::Scripted(_) => Ok(Vec::new()),
            Self::AlwaysFail { cause } => Err(RemoteError::Unreachable {
                cause: cause.clone(),
            }),
        }
    }

    pub fn list_payments(&self, timeout_ms: u64) -> Result<Vec<StoredPayment>, RemoteError> {
        match self {
            Self::Http(config) => http_list(config, Endpoint::CustomerPayment, timeout_ms),
            Self::Loopback(remote) => remote.list_payments(),
            Self::Scripted(_) => Ok(Vec::new()),
            Self::AlwaysFail { cause } => Err(RemoteError::Unreachable {
                cause: cause.clone(),
            }),
        }
    }
}

fn build_agent(connect_timeout_ms: u64, request_timeout_ms: u64) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout_connect(Duration::from_millis(connect_timeout_ms))
        .timeout_read(Duration::from_millis(request_timeout_ms))
        .timeout_write(Duration::from_millis(request_timeout_ms))
        .build()
}

fn endpoint_url(config: &HttpRemoteConfig, endpoint: Endpoint) -> Result<String, RemoteError> {
    Url::parse(&config.base_url)
        .and_then(|base| base.join(endpoint.path()))
        .map(String::from)
        .map_err(|e| RemoteError::Unreachable {
            cause: format!("invalid target url {}: {e}", config.base_url),
        })
}

fn http_submit(
    config: &HttpRemoteConfig,
    endpoint: Endpoint,
    payload: &Value,
    timeout_ms: u64,
) -> Result<CreatedRecord, RemoteError> {
    let url = endpoint_url(config, endpoint)?;
    let agent = build_agent(config.connect_timeout_ms, timeout_ms);
    match agent
        .post(&url)
        .set("Content-Type", "application/json")
        .set("Accept", "application/json")
        .send_json(payload.clone())
    {
        Ok(response) => parse_created(response),
        Err(ureq::Error::Status(status, response)) => {
            Err(classify_status(status, read_error_message(response)))
        }
        Err(ureq::Error::Transport(transport)) => Err(RemoteError::Unreachable {
            cause: classify_transport(&transport),
        }),
    }
}

fn http_list<T: serde::de::DeserializeOwned>(
    config: &HttpRemoteConfig,
    endpoint: Endpoint,
    timeout_ms: u64,
) -> Result<Vec<T>, RemoteError> {
    let url = endpoint_url(config, endpoint)?;
    let agent = build_agent(config.connect_timeout_ms, timeout_ms);
    match agent.get(&url).set("Accept", "application/json").call() {
        Ok(response) => serde_json::from_reader(response.into_reader()).map_err(|e| {
            RemoteError::Malformed {
                detail: format!("collection body was not the expected json: {e}"),
            }
        }),
        Err(ureq::Error::Status(status, response)) => {
            Err(classify_status(status, read_error_message(response)))
        }
        Err(ureq::Error::Transport(transport)) => Err(RemoteError::Unreachable {
            cause: classify_transport(&transport),
        }),
    }
}

fn parse_created(response: ureq::Response) -> Result<CreatedRecord, RemoteError> {
    let body: Value =
        serde_json::from_reader(response.into_reader()).map_err(|_| RemoteError::Malformed {
            detail: "create response body was not json".to_string(),
        })?;
    created_id_from_body(&body)
        .map(|id| CreatedRecord { id })
        .ok_or_else(|| RemoteError::Malformed {
            detail: "create response carries no numeric id".to_string(),
        })
}

fn created_id_from_body(body: &Value) -> Option<i64> {
    body.get("id").and_then(Value::as_i64)
}

/// A 4xx is the server declining a request it processed; a 5xx produced no
/// business judgment, so it classifies as unreachable rather than as a
/// rejection a negative scenario could claim as a pass.
fn classify_status(status: u16, message: String) -> RemoteError {
    if (400..500).contains(&status) {
        RemoteError::Rejected { status, message }
    } else {
        RemoteError::Unreachable {
            cause: format!("http status {status}"),
        }
    }
}

fn read_error_message(response: ureq::Response) -> String {
    let status = response.status();
    let raw = response.into_string().unwrap_or_default();
    let from_json = serde_json::from_str::<Value>(&raw).ok().and_then(|body| {
        body.get("message")
            .or_else(|| body.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });
    let message = from_json.unwrap_or_else(|| raw.trim().to_string());
    if message.is_empty() {
        return format!("http status {status}");
    }
    bound_message(message)
}

fn bound_message(message: String) -> String {
    if message.len() > MAX_ERROR_MESSAGE_LEN {
        message.chars().take(MAX_ERROR_MESSAGE_LEN).collect()
    } else {
        message
    }
}

fn classify_transport(transport: &ureq::Transport) -> String {
    let combined = format!("{:?} {}", transport.kind(), transport);
    format!(
        "{}: {}",
        classify_transport_cause(&combined),
        bound_message(combined)
    )
}

fn classify_transport_cause(raw: &str) -> &'static str {
    let lower = raw.to_ascii_lowercase();
    if lower.contains("timeout") {
        "timeout"
    } else if lower.contains("dns") {
        "dns"
    } else if lower.contains("connection") || lower.contains("connect") {
        "connection"
    } else {
        "transport"
    }
}
