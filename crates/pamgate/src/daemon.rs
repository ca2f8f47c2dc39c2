//! pamgated wire protocol and request dispatch.
//!
//! Newline-delimited JSON over a unix socket:
//!   Request:  {"cmd": "lookup", "args": {"username": "alice"}}
//!   Response: {"ok": true, "data": {...}} or {"ok": false, "error": "..."}
//!
//! The socket is root-owned with mode 0600, so every peer that can connect
//! is administrative by construction; `diagnose` runs with admin privilege
//! over this surface.

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;

use log::{debug, error};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::diagnose;
use crate::error::AuthError;
use crate::gateway::PamGateway;
use crate::identity::Identity;

// --- Protocol types ---

#[derive(Debug, Deserialize)]
pub struct Request {
    pub cmd: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct Response {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Response {
    pub fn with_data(data: serde_json::Value) -> Self {
        Self {
            ok: true,
            error: None,
            data: Some(data),
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(msg.into()),
            data: None,
        }
    }
}

impl From<AuthError> for Response {
    fn from(err: AuthError) -> Self {
        Self {
            ok: false,
            error: Some(err.to_string()),
            data: Some(json!({ "kind": err.kind() })),
        }
    }
}

// --- Dispatch ---

pub fn dispatch(gateway: &PamGateway, req: &Request) -> Response {
    // Never log args: authenticate requests carry the password.
    debug!("dispatching '{}'", req.cmd);
    match req.cmd.as_str() {
        "authenticate" => cmd_authenticate(gateway, &req.args),
        "lookup" => cmd_lookup(gateway, &req.args),
        "lookup-group" => cmd_lookup_group(gateway, &req.args),
        "diagnose" => cmd_diagnose(),
        "ping" => cmd_ping(gateway),
        other => Response::error(format!("unknown command: {other}")),
    }
}

fn get_str<'a>(args: &'a serde_json::Value, key: &str) -> Result<&'a str, Response> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| Response::error(format!("missing '{key}'")))
}

fn identity_data(identity: &Identity) -> Response {
    match serde_json::to_value(identity) {
        Ok(data) => Response::with_data(data),
        Err(e) => Response::error(format!("serializing identity: {e}")),
    }
}

// --- Command handlers ---

fn cmd_authenticate(gateway: &PamGateway, args: &serde_json::Value) -> Response {
    let username = match get_str(args, "username") {
        Ok(u) => u,
        Err(r) => return r,
    };
    let password = match get_str(args, "password") {
        Ok(p) => p,
        Err(r) => return r,
    };

    match gateway.authenticate(username, password) {
        Ok(identity) => identity_data(&identity),
        Err(e) => e.into(),
    }
}

fn cmd_lookup(gateway: &PamGateway, args: &serde_json::Value) -> Response {
    let username = match get_str(args, "username") {
        Ok(u) => u,
        Err(r) => return r,
    };

    match gateway.lookup(username) {
        Ok(identity) => identity_data(&identity),
        Err(e) => e.into(),
    }
}

fn cmd_lookup_group(gateway: &PamGateway, args: &serde_json::Value) -> Response {
    let group = match get_str(args, "group") {
        Ok(g) => g,
        Err(r) => return r,
    };

    match gateway.lookup_group(group) {
        Ok(info) => Response::with_data(json!({ "name": info.name })),
        Err(e) => e.into(),
    }
}

fn cmd_diagnose() -> Response {
    // The command itself succeeds either way; the advisory verdict lives in
    // the payload (ok / ok-with-message / error-with-message).
    let result = diagnose::diagnose(true);
    Response::with_data(json!({ "ok": result.ok, "message": result.message }))
}

fn cmd_ping(gateway: &PamGateway) -> Response {
    Response::with_data(json!({
        "service_name": gateway.service_name(),
        "id_comparison": gateway.id_comparison(),
    }))
}

// --- Connection handling ---

pub fn handle_connection(gateway: &PamGateway, stream: UnixStream) {
    let reader = BufReader::new(&stream);
    let mut writer = &stream;

    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                error!("read error: {e}");
                return;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(&line) {
            Ok(req) => dispatch(gateway, &req),
            Err(e) => Response::error(format!("invalid request: {e}")),
        };

        let mut resp_json = serde_json::to_string(&response)
            .unwrap_or_else(|_| r#"{"ok":false,"error":"serialization failed"}"#.to_string());
        resp_json.push('\n');

        if let Err(e) = writer.write_all(resp_json.as_bytes()) {
            error!("write error: {e}");
            return;
        }
        let _ = writer.flush();
    }
}
