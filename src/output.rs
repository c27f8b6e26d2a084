// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal (human) and JSON output modes.

use crate::api::DeploymentResponse;
use serde::Serialize;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self { mode }
    }

    /// Print a progress message (suppressed in json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    pub fn success(&self, message: &str) {
        self.emit("success", message, false);
    }

    pub fn error(&self, message: &str) {
        self.emit("error", message, true);
    }

    fn emit(&self, event: &str, message: &str, to_stderr: bool) {
        let line = match self.mode {
            OutputMode::Normal if to_stderr => format!("Error: {message}"),
            OutputMode::Normal => message.to_string(),
            OutputMode::Json => match serde_json::to_string(&JsonEvent { event, message }) {
                Ok(json) => json,
                Err(_) => return,
            },
        };
        if to_stderr {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    }

    /// Print a deployment, as a field list or a single JSON object.
    pub fn deployment(&self, deployment: &DeploymentResponse) -> serde_json::Result<()> {
        match self.mode {
            OutputMode::Json => println!("{}", serde_json::to_string(deployment)?),
            OutputMode::Normal => print!("{}", render_deployment(deployment)),
        }
        Ok(())
    }
}

fn render_deployment(d: &DeploymentResponse) -> String {
    let mut out = String::new();
    let mut field = |name: &str, value: Option<&str>| {
        if let Some(value) = value {
            out.push_str(&format!("{name:<18}{value}\n"));
        }
    };

    field("Deployment:", Some(d.id.as_str()));
    field("Request:", d.request_id.as_deref());
    field("Contract:", Some(d.contract_name.as_str()));
    field("State:", Some(d.state.as_str()));
    field("Transaction:", d.transaction_hash.as_deref());
    field("Address:", d.contract_address.as_deref());
    field("Whitelist:", d.whitelist_id.as_deref());
    field("Error:", d.error_message.as_deref());
    field("Updated:", Some(d.updated_at.to_rfc3339().as_str()));
    out
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
}
