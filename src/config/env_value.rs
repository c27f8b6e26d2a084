// ABOUTME: Configuration values that are either literals or environment references.
// ABOUTME: Keeps collaborator secrets out of the YAML file when wanted.

use crate::error::{Error, Result};
use serde::Deserialize;

/// A string given inline or as `{env: VAR, default: ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Literal(String),
    FromEnv {
        #[serde(rename = "env")]
        var: String,
        #[serde(default)]
        default: Option<String>,
    },
}

impl EnvValue {
    pub fn resolve(&self) -> Result<String> {
        match self {
            EnvValue::Literal(s) => Ok(s.clone()),
            EnvValue::FromEnv { var, default } => match std::env::var(var) {
                Ok(val) => Ok(val),
                Err(_) => default
                    .clone()
                    .ok_or_else(|| Error::MissingEnvVar(var.clone())),
            },
        }
    }

    /// Render back to YAML for generated templates.
    pub(crate) fn to_yaml(&self) -> String {
        match self {
            EnvValue::Literal(s) => format!("\"{s}\""),
            EnvValue::FromEnv { var, default: None } => format!("{{ env: {var} }}"),
            EnvValue::FromEnv {
                var,
                default: Some(d),
            } => format!("{{ env: {var}, default: \"{d}\" }}"),
        }
    }
}
