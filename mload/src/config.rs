//! `.graphqlconfig` handling: schema location, named endpoints and loader
//! settings.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::ConfigError;
use crate::ndf::DEFAULT_FLUSH_THRESHOLD;
use crate::reflector::ListRule;

pub const CONFIG_FILE_NAME: &str = ".graphqlconfig";
pub const DEFAULT_ENDPOINT: &str = "default";

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLConfig {
    pub schema_path: Option<PathBuf>,
    #[serde(default)]
    pub extensions: Extensions,
    /// Directory the file was read from; relative paths resolve against it.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Extensions {
    #[serde(default)]
    pub endpoints: BTreeMap<String, EndpointSpec>,
    #[serde(default)]
    pub mload: LoadSettings,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum EndpointSpec {
    Url(String),
    Detailed {
        url: String,
        #[serde(default)]
        headers: BTreeMap<String, String>,
    },
}

/// A resolved endpoint with environment references substituted.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub name: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl Endpoint {
    pub fn from_url(name: impl Into<String>, url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            name: name.into(),
            url: validate_url(&substitute_env(url))?,
            headers: Vec::new(),
        })
    }
}

/// Loader settings. Every field is optional so layers can be stacked:
/// built-in defaults, then `extensions.mload`, then command-line flags.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoadSettings {
    pub batch_size: Option<usize>,
    pub flush_threshold: Option<usize>,
    pub list_rule: Option<String>,
    pub list_suffix: Option<String>,
    pub short_dates: Option<bool>,
}

impl LoadSettings {
    /// Returns these settings with every value present in `overrides` taking
    /// precedence.
    pub fn overlay(self, overrides: LoadSettings) -> LoadSettings {
        LoadSettings {
            batch_size: overrides.batch_size.or(self.batch_size),
            flush_threshold: overrides.flush_threshold.or(self.flush_threshold),
            list_rule: overrides.list_rule.or(self.list_rule),
            list_suffix: overrides.list_suffix.or(self.list_suffix),
            short_dates: overrides.short_dates.or(self.short_dates),
        }
    }

    pub fn list_rule(&self) -> Result<ListRule, ConfigError> {
        match (&self.list_rule, &self.list_suffix) {
            (Some(name), suffix) => ListRule::from_name(name, suffix.as_deref()),
            (None, _) => Ok(ListRule::default()),
        }
    }

    /// `None` means a single batch per file.
    pub fn batch_size(&self) -> Option<usize> {
        self.batch_size.filter(|size| *size > 0)
    }

    pub fn flush_threshold(&self) -> usize {
        self.flush_threshold.unwrap_or(DEFAULT_FLUSH_THRESHOLD)
    }

    pub fn iso_dates(&self) -> bool {
        !self.short_dates.unwrap_or(false)
    }
}

impl GraphQLConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
        let mut config = Self::from_json(&text)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Loads `.graphqlconfig` from `dir` if there is one.
    pub async fn discover(dir: &Path) -> Result<Option<Self>, ConfigError> {
        let path = dir.join(CONFIG_FILE_NAME);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(None);
        }
        Self::load(&path).await.map(Some)
    }

    /// The configured schema file, resolved against the config directory.
    pub fn schema_path(&self) -> Option<PathBuf> {
        let path = self.schema_path.as_ref()?;
        Some(match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.clone(),
        })
    }

    /// Picks the endpoint called `name`; without a name, `default` or the
    /// only endpoint declared.
    pub fn endpoint(&self, name: Option<&str>) -> Result<Endpoint, ConfigError> {
        let endpoints = &self.extensions.endpoints;
        let (name, spec) = match name {
            Some(name) => endpoints
                .get_key_value(name)
                .ok_or_else(|| ConfigError::EndpointNotFound(name.to_string()))?,
            None => match endpoints.get_key_value(DEFAULT_ENDPOINT) {
                Some(found) => found,
                None if endpoints.len() == 1 => endpoints.iter().next().ok_or(ConfigError::NoEndpoint)?,
                None => return Err(ConfigError::NoEndpoint),
            },
        };

        let (url, headers) = match spec {
            EndpointSpec::Url(url) => (url, Vec::new()),
            EndpointSpec::Detailed { url, headers } => (
                url,
                headers
                    .iter()
                    .map(|(key, value)| (key.clone(), substitute_env(value)))
                    .collect(),
            ),
        };
        Ok(Endpoint {
            name: name.clone(),
            url: validate_url(&substitute_env(url))?,
            headers,
        })
    }
}

fn validate_url(raw: &str) -> Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEndpoint {
        url: raw.to_string(),
        reason,
    };
    let parsed = url::Url::parse(raw).map_err(|err| invalid(err.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed.to_string()),
        other => Err(invalid(format!("unsupported scheme '{other}'"))),
    }
}

/// Replaces `${env:NAME}` references with the variable's value. Unset
/// variables expand to an empty string.
pub fn substitute_env(text: &str) -> String {
    substitute_with(text, |name| std::env::var(name).ok())
}

fn substitute_with(text: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    const OPEN: &str = "${env:";
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(OPEN) {
        let after = &rest[start + OPEN.len()..];
        let Some(end) = after.find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let name = after[..end].trim();
        match lookup(name) {
            Some(value) => out.push_str(&value),
            None => log::warn!("environment variable {name} is not set"),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}
