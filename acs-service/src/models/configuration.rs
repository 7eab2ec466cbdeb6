//! Tenant-owned ACS configuration, as handed to this layer by the caller.
//!
//! Credentials arrive as a per-vendor JSON blob. They are parsed into
//! [`AcsCredentials`] according to `acs_type` at deserialization time, so an
//! adapter never has to guess which shape it was given.

use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// ACS vendor selector.
///
/// Unknown wire values are kept in [`AcsType::Other`] so the dispatcher can
/// report them verbatim instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AcsType {
    Lenel,
    S2Security,
    Custom,
    Ccure9000,
    Other(String),
}

impl AcsType {
    pub fn as_str(&self) -> &str {
        match self {
            AcsType::Lenel => "lenel",
            AcsType::S2Security => "s2_security",
            AcsType::Custom => "custom",
            AcsType::Ccure9000 => "ccure9000",
            AcsType::Other(value) => value,
        }
    }

    /// Bounded label for metrics; unknown types collapse to `unknown`.
    pub fn metric_label(&self) -> &'static str {
        match self {
            AcsType::Lenel => "lenel",
            AcsType::S2Security => "s2_security",
            AcsType::Custom => "custom",
            AcsType::Ccure9000 => "ccure9000",
            AcsType::Other(_) => "unknown",
        }
    }
}

impl From<String> for AcsType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "lenel" => AcsType::Lenel,
            "s2_security" => AcsType::S2Security,
            "custom" => AcsType::Custom,
            "ccure9000" => AcsType::Ccure9000,
            _ => AcsType::Other(value),
        }
    }
}

impl From<&str> for AcsType {
    fn from(value: &str) -> Self {
        AcsType::from(value.to_string())
    }
}

impl From<AcsType> for String {
    fn from(value: AcsType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for AcsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bearer-token credentials for REST vendors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RestCredentials {
    #[serde(default)]
    pub api_key: Option<Secret<String>>,
    #[serde(default)]
    pub token: Option<Secret<String>>,
    /// Extra headers merged into every request after `Authorization`.
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
}

impl RestCredentials {
    /// `api_key` takes precedence over `token`; blank values are ignored.
    pub fn bearer_token(&self) -> Option<&str> {
        [&self.api_key, &self.token]
            .into_iter()
            .flatten()
            .map(|secret| secret.expose_secret().as_str())
            .find(|value| !value.trim().is_empty())
    }
}

/// Login credentials for the session-based C•CURE 9000 web service.
#[derive(Clone, Deserialize)]
pub struct CcureCredentials {
    pub base_url: String,
    pub user_name: String,
    pub password: Secret<String>,
    pub client_name: String,
    pub client_id: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub personnel_type_name: Option<String>,
}

impl fmt::Debug for CcureCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CcureCredentials")
            .field("base_url", &self.base_url)
            .field("user_name", &self.user_name)
            .field("password", &service_core::observability::REDACTED)
            .field("client_name", &self.client_name)
            .field("client_id", &self.client_id)
            .field("version", &self.version)
            .field("personnel_type_name", &self.personnel_type_name)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum AcsCredentials {
    Rest(RestCredentials),
    Ccure(CcureCredentials),
    /// Credentials this layer stores but never inspects.
    Opaque(serde_json::Value),
}

impl AcsCredentials {
    /// Parse the raw blob into the shape `acs_type` requires.
    pub fn parse(acs_type: &AcsType, raw: serde_json::Value) -> Result<Self, serde_json::Error> {
        match acs_type {
            AcsType::Ccure9000 => serde_json::from_value(raw).map(AcsCredentials::Ccure),
            AcsType::Custom => {
                let raw = if raw.is_null() {
                    serde_json::Value::Object(Default::default())
                } else {
                    raw
                };
                serde_json::from_value(raw).map(AcsCredentials::Rest)
            }
            // The simulated vendors never read their credentials.
            AcsType::Lenel | AcsType::S2Security | AcsType::Other(_) => {
                Ok(AcsCredentials::Opaque(raw))
            }
        }
    }

    fn digest_into(&self, hasher: &mut Sha256) {
        match self {
            AcsCredentials::Rest(rest) => {
                hasher.update(b"rest\0");
                for secret in [&rest.api_key, &rest.token] {
                    let value = secret.as_ref().map(|s| s.expose_secret().as_str());
                    hasher.update(value.unwrap_or_default());
                    hasher.update([0]);
                }
                let sorted: BTreeMap<_, _> = rest.headers.iter().flatten().collect();
                for (name, value) in sorted {
                    hasher.update(name);
                    hasher.update(b"=");
                    hasher.update(value);
                    hasher.update([0]);
                }
            }
            AcsCredentials::Ccure(ccure) => {
                hasher.update(b"ccure\0");
                for field in [
                    ccure.base_url.as_str(),
                    ccure.user_name.as_str(),
                    ccure.password.expose_secret().as_str(),
                    ccure.client_name.as_str(),
                    ccure.client_id.as_str(),
                    ccure.version.as_deref().unwrap_or_default(),
                    ccure.personnel_type_name.as_deref().unwrap_or_default(),
                ] {
                    hasher.update(field);
                    hasher.update([0]);
                }
            }
            AcsCredentials::Opaque(value) => {
                hasher.update(b"opaque\0");
                hasher.update(value.to_string());
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawAcsConfiguration")]
pub struct AcsConfiguration {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub acs_type: AcsType,
    pub api_endpoint: Option<String>,
    pub credentials: AcsCredentials,
    pub is_active: bool,
}

#[derive(Deserialize)]
struct RawAcsConfiguration {
    id: String,
    tenant_id: String,
    name: String,
    acs_type: AcsType,
    #[serde(default)]
    api_endpoint: Option<String>,
    #[serde(default)]
    credentials: serde_json::Value,
    #[serde(default = "default_active")]
    is_active: bool,
}

fn default_active() -> bool {
    true
}

impl TryFrom<RawAcsConfiguration> for AcsConfiguration {
    type Error = String;

    fn try_from(raw: RawAcsConfiguration) -> Result<Self, Self::Error> {
        let credentials = AcsCredentials::parse(&raw.acs_type, raw.credentials).map_err(|e| {
            format!(
                "invalid credentials for {} ACS configuration '{}': {}",
                raw.acs_type, raw.id, e
            )
        })?;

        Ok(AcsConfiguration {
            id: raw.id,
            tenant_id: raw.tenant_id,
            name: raw.name,
            acs_type: raw.acs_type,
            api_endpoint: raw.api_endpoint,
            credentials,
            is_active: raw.is_active,
        })
    }
}

impl AcsConfiguration {
    /// Stable digest of everything an adapter is built from.
    ///
    /// Two configurations with the same id but different fingerprints must
    /// not share a cached adapter.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.acs_type.as_str());
        hasher.update([0]);
        hasher.update(self.api_endpoint.as_deref().unwrap_or_default());
        hasher.update([0]);
        self.credentials.digest_into(&mut hasher);
        hex::encode(hasher.finalize())
    }
}
