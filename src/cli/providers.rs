//! The `providers` command.

use std::path::PathBuf;

use serde::Serialize;

use crate::cli::args::OutputFormat;
use crate::cli::context::AppContext;
use crate::core::provider::{ProviderDescriptor, ProviderKind};
use crate::error::Result;
use crate::render::{self, human};
use crate::storage::config::ConfigSources;
use crate::util::env::non_empty_var;

/// One cascade entry as shown by `gym providers`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    pub provider_id: String,
    pub kind: ProviderKind,
    pub model: String,
    pub priority: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// `None` for providers that need no key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    pub credentials_present: bool,
}

impl ProviderStatus {
    /// Status of a descriptor, checking its key with `lookup`.
    #[must_use]
    pub fn from_descriptor(
        descriptor: &ProviderDescriptor,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let api_key_env = descriptor.resolved_api_key_env().map(String::from);
        Self {
            provider_id: descriptor.provider_id.clone(),
            kind: descriptor.kind,
            model: descriptor.model.clone(),
            priority: descriptor.priority,
            timeout_ms: descriptor.timeout_ms,
            base_url: descriptor.resolved_base_url().map(String::from),
            credentials_present: api_key_env.as_deref().is_none_or(|env| lookup(env).is_some()),
            api_key_env,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProvidersOutput {
    config_path: PathBuf,
    sources: ConfigSources,
    cascade: Vec<ProviderStatus>,
}

/// Show the ordered provider cascade.
///
/// # Errors
/// Returns error if the routing table is invalid.
pub fn providers(ctx: &AppContext, format: OutputFormat, pretty: bool) -> Result<()> {
    let cascade: Vec<ProviderStatus> = ctx
        .config
        .ai
        .build_cascade()?
        .iter()
        .map(|d| ProviderStatus::from_descriptor(d, non_empty_var))
        .collect();

    let output = ProvidersOutput {
        config_path: ctx.config.config_path.clone(),
        sources: ctx.config.sources.clone(),
        cascade,
    };
    render::emit(
        "providers",
        &output,
        |o| human::render_providers(&o.cascade),
        Vec::new(),
        format,
        pretty,
    )
}
