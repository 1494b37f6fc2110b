//! Expression assembly for AI invocation.
//!
//! The host evaluates a single expression string to reach a pre-configured AI
//! connection: `functionName('<json-config>', '<escaped-prompt>')`. The JSON
//! config names the connection and the per-call sampling parameters; the
//! prompt is embedded as a host string literal. Both arguments follow the
//! host's literal escaping rule — single quotes doubled — and the prompt
//! additionally has control characters removed because the literal is
//! single-line. This contract is consumed byte-for-byte by the platform's
//! server-side-extension bridge, so none of it is negotiable here.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use promptlens_types::PanelOptions;

/// Host function evaluated to reach the configured AI connection.
pub const DEFAULT_INVOKE_FUNCTION: &str = "endpoints.ScriptEvalStr";

/// External collaborator capable of evaluating a host expression string.
///
/// Implementations wrap the host's evaluation API. The engine holds one only
/// behind a shared reference; it carries no global state of its own.
#[async_trait]
pub trait ExpressionInvoker: Send + Sync {
    /// Evaluate `expression` and return its scalar result.
    async fn evaluate(&self, expression: &str) -> Result<Value>;
}

/// Escape text for embedding in a host single-quoted string literal.
///
/// Single quotes are doubled; control characters are removed, not replaced,
/// because the host literal is single-line.
pub fn escape_host_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch.is_control() {
            continue;
        }
        if ch == '\'' {
            out.push_str("''");
        } else {
            out.push(ch);
        }
    }
    out
}

/// Join the system prompt and the resolved user prompt with a blank line;
/// either side may be absent.
pub fn combine_prompts(system: &str, user: &str) -> String {
    let system = system.trim();
    let user = user.trim();
    match (system.is_empty(), user.is_empty()) {
        (true, true) => String::new(),
        (true, false) => user.to_string(),
        (false, true) => system.to_string(),
        (false, false) => format!("{system}\n\n{user}"),
    }
}

#[derive(Serialize)]
struct RequestEnvelope<'a> {
    #[serde(rename = "RequestType")]
    request_type: &'static str,
    endpoint: Endpoint<'a>,
}

#[derive(Serialize)]
struct Endpoint<'a> {
    connectionname: &'a str,
    column: &'static str,
    parameters: Parameters,
}

#[derive(Serialize)]
struct Parameters {
    temperature: f64,
    #[serde(rename = "Top K")]
    top_k: u32,
    #[serde(rename = "Top P")]
    top_p: f64,
    max_tokens: u32,
}

/// Build the full invocation expression for a resolved prompt.
///
/// The config JSON is itself a host string literal, so its quotes are
/// escaped the same way as the prompt's.
pub fn build_invocation_expression(function_name: &str, options: &PanelOptions, resolved_prompt: &str) -> Result<String> {
    let envelope = RequestEnvelope {
        request_type: "endpoint",
        endpoint: Endpoint {
            connectionname: options.connection_name.trim(),
            column: "text",
            parameters: Parameters {
                temperature: options.temperature,
                top_k: options.top_k,
                top_p: options.top_p,
                max_tokens: options.max_tokens,
            },
        },
    };
    let config = serde_json::to_string(&envelope).context("serialize invocation config")?;
    Ok(format!(
        "{function_name}('{}', '{}')",
        escape_host_literal(&config),
        escape_host_literal(resolved_prompt)
    ))
}
