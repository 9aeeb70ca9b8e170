//! Upload type policies and their registry.
//!
//! Precedence: built-in defaults < config file < environment

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const ENV_PREFIX: &str = "UPLIFT_";

/// HTTP method a policy's endpoint expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    #[default]
    Post,
    Put,
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
        }
    }
}

/// Immutable description of where and how one logical kind of upload goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadPolicy {
    /// Accepted file extensions, compared case-insensitively.
    /// `None` accepts every file.
    #[serde(default)]
    pub allowed_extensions: Option<Vec<String>>,
    /// Endpoint path the transport submits to.
    pub endpoint: String,
    #[serde(default)]
    pub method: HttpMethod,
    /// Field in the JSON response body holding the result array.
    pub resource_key: String,
    /// Field of the first result element carrying the stored URL.
    #[serde(default = "default_url_field")]
    pub url_field: String,
}

fn default_url_field() -> String {
    "url".to_string()
}

/// Requested a kind the registry does not know. A caller error, not a
/// condition the coordinator recovers from.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown upload kind: {0}")]
pub struct UnknownKind(pub String);

/// Maps a logical upload kind ("image", "file", ...) to its policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRegistry {
    kinds: BTreeMap<String, UploadPolicy>,
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        let mut kinds = BTreeMap::new();
        kinds.insert(
            "image".to_string(),
            UploadPolicy {
                allowed_extensions: Some(
                    ["gif", "jpg", "jpeg", "png", "svg", "svgz", "webp"]
                        .map(String::from)
                        .to_vec(),
                ),
                endpoint: "/images/upload/".to_string(),
                method: HttpMethod::Post,
                resource_key: "images".to_string(),
                url_field: default_url_field(),
            },
        );
        kinds.insert(
            "file".to_string(),
            UploadPolicy {
                allowed_extensions: None,
                endpoint: "/files/upload/".to_string(),
                method: HttpMethod::Post,
                resource_key: "files".to_string(),
                url_field: default_url_field(),
            },
        );
        kinds.insert(
            "media".to_string(),
            UploadPolicy {
                allowed_extensions: Some(["mp4", "webm", "ogv"].map(String::from).to_vec()),
                endpoint: "/media/upload/".to_string(),
                method: HttpMethod::Post,
                resource_key: "media".to_string(),
                url_field: default_url_field(),
            },
        );
        Self { kinds }
    }
}

impl PolicyRegistry {
    /// Built-in kinds merged with an optional TOML file and `UPLIFT_`
    /// environment overrides.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = config_file {
            figment = figment.merge(Toml::file(path));
        }

        let registry: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to load upload policy registry")?;

        registry.validate()?;
        Ok(registry)
    }

    /// Look up the policy for a logical kind.
    pub fn policy(&self, kind: &str) -> Result<UploadPolicy, UnknownKind> {
        self.kinds
            .get(kind)
            .cloned()
            .ok_or_else(|| UnknownKind(kind.to_string()))
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }

    fn validate(&self) -> Result<()> {
        for (kind, policy) in &self.kinds {
            ensure!(
                !policy.endpoint.is_empty(),
                "policy for kind '{kind}' has an empty endpoint"
            );
            ensure!(
                !policy.resource_key.is_empty(),
                "policy for kind '{kind}' has an empty resource key"
            );
        }
        Ok(())
    }
}
