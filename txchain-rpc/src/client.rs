//! Blocking JSON-RPC transport.

use reqwest::{blocking::Client, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::{fs, path::PathBuf, time::Duration};
use tracing::debug;

use crate::error::{RpcError, RpcResult};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Credentials presented with every request.
#[derive(Clone, Debug)]
pub enum Auth {
    None,
    UserPass { user: String, password: String },
    /// Node-written `.cookie` file holding `user:password`.
    CookieFile(PathBuf),
}

impl Auth {
    fn resolve(&self) -> RpcResult<Option<(String, String)>> {
        match self {
            Auth::None => Ok(None),
            Auth::UserPass { user, password } => Ok(Some((user.clone(), password.clone()))),
            Auth::CookieFile(path) => {
                let raw = fs::read_to_string(path).map_err(|source| RpcError::Cookie {
                    path: path.clone(),
                    source,
                })?;
                let (user, password) = raw
                    .trim()
                    .split_once(':')
                    .ok_or_else(|| RpcError::CookieFormat(path.clone()))?;
                Ok(Some((user.to_string(), password.to_string())))
            }
        }
    }
}

#[derive(Serialize)]
struct Request<'a> {
    jsonrpc: &'static str,
    id: String,
    method: &'a str,
    params: &'a [Value],
}

#[derive(Deserialize)]
struct Reply {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<ReplyError>,
}

#[derive(Deserialize)]
struct ReplyError {
    code: i64,
    message: String,
}

/// Client bound to one node endpoint (optionally a wallet sub-endpoint).
#[derive(Clone, Debug)]
pub struct RpcClient {
    http: Client,
    base: Url,
    url: Url,
    credentials: Option<(String, String)>,
}

impl RpcClient {
    pub fn new(url: &str, auth: Auth, timeout: Duration) -> RpcResult<Self> {
        let base = Url::parse(url).map_err(|e| RpcError::InvalidUrl(format!("{url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(RpcError::InvalidUrl(url.to_string()));
        }
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: base.clone(),
            base,
            credentials: auth.resolve()?,
        })
    }

    /// Same connection, addressed to `/wallet/<name>`.
    pub fn wallet_client(&self, name: &str) -> RpcResult<Self> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| RpcError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .push("wallet")
            .push(name);
        Ok(Self {
            url,
            ..self.clone()
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn call_value(&self, method: &str, params: &[Value]) -> RpcResult<Value> {
        let body = Request {
            jsonrpc: "1.0",
            id: uuid::Uuid::new_v4().to_string(),
            method,
            params,
        };
        debug!(%method, url = %self.url, "rpc call");

        let mut req = self.http.post(self.url.clone()).json(&body);
        if let Some((user, password)) = &self.credentials {
            req = req.basic_auth(user, Some(password));
        }
        let resp = req.send()?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RpcError::Unauthorized(status.as_u16()));
        }
        let text = resp.text()?;
        parse_reply(method, status, &text)
    }

    pub fn call<T: DeserializeOwned>(&self, method: &str, params: &[Value]) -> RpcResult<T> {
        let value = self.call_value(method, params)?;
        serde_json::from_value(value).map_err(|source| RpcError::Decode {
            method: method.to_string(),
            source,
        })
    }
}

/// The node answers RPC-level failures with HTTP 500 and a JSON body,
/// so the body is inspected before the status.
fn parse_reply(method: &str, status: StatusCode, text: &str) -> RpcResult<Value> {
    match serde_json::from_str::<Reply>(text) {
        Ok(Reply {
            error: Some(err), ..
        }) => Err(RpcError::Node {
            code: err.code,
            message: err.message,
        }),
        Ok(reply) if status.is_success() => Ok(reply.result),
        Ok(_) => Err(RpcError::Http {
            status: status.as_u16(),
            body: text.to_string(),
        }),
        Err(_) if !status.is_success() => Err(RpcError::Http {
            status: status.as_u16(),
            body: text.to_string(),
        }),
        Err(source) => Err(RpcError::Decode {
            method: method.to_string(),
            source,
        }),
    }
}
