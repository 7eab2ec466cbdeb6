//! Generic REST integration for tenants running their own ACS gateway.
//!
//! Contract: `POST {endpoint}/provision`, `POST {endpoint}/revoke` and
//! `GET {endpoint}/health`, all bearer-authenticated with JSON bodies.

use super::AcsAdapter;
use crate::models::{
    AcsConfiguration, AcsCredentials, AccessProvisioningResult, CivPivCardInfo,
    ConnectionTestResult, RestCredentials, VisitorData,
};
use crate::services::clock::Clock;
use crate::services::error::AcsError;
use crate::services::transport::{HttpTransport, TransportRequest};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const VENDOR: &str = "Custom ACS";

/// How long a provisioned credential stays valid.
const ACCESS_WINDOW_HOURS: i64 = 24;

pub struct CustomRestAdapter {
    endpoint: String,
    credentials: RestCredentials,
    transport: Arc<dyn HttpTransport>,
    clock: Arc<dyn Clock>,
}

#[derive(Debug, Serialize)]
struct ProvisionRequest<'a> {
    visitor: VisitorPayload<'a>,
    facility_id: &'a str,
    access_level: &'a str,
    valid_from: DateTime<Utc>,
    valid_until: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct VisitorPayload<'a> {
    id: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    email: Option<&'a str>,
    company: Option<&'a str>,
    civ_piv_card: Option<&'a CivPivCardInfo>,
}

#[derive(Debug, Serialize)]
struct RevokeRequest<'a> {
    visitor_id: &'a str,
    reference_id: Option<&'a str>,
}

#[derive(Debug, Default, Deserialize)]
struct ProvisionResponse {
    #[serde(default)]
    reference_id: Option<serde_json::Value>,
    #[serde(default)]
    id: Option<serde_json::Value>,
}

impl ProvisionResponse {
    /// `reference_id` wins over `id`; numeric ids are stringified.
    fn acs_reference_id(&self) -> Option<String> {
        [&self.reference_id, &self.id]
            .into_iter()
            .flatten()
            .find_map(|value| match value {
                serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
    }
}

impl CustomRestAdapter {
    pub fn new(
        config: &AcsConfiguration,
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AcsError> {
        let endpoint = config
            .api_endpoint
            .as_deref()
            .map(|endpoint| endpoint.trim().trim_end_matches('/'))
            .filter(|endpoint| !endpoint.is_empty())
            .ok_or_else(|| {
                AcsError::Configuration("Custom ACS configuration has no api_endpoint".to_string())
            })?
            .to_string();

        let credentials = match &config.credentials {
            AcsCredentials::Rest(rest) => rest.clone(),
            _ => {
                return Err(AcsError::Configuration(
                    "Custom ACS configuration requires api_key/token credentials".to_string(),
                ))
            }
        };

        if credentials.bearer_token().is_none() {
            return Err(AcsError::Configuration(
                "Custom ACS credentials must include an api_key or token".to_string(),
            ));
        }

        Ok(Self {
            endpoint,
            credentials,
            transport,
            clock,
        })
    }

    /// Request with bearer auth, then the tenant's extra headers on top.
    fn request(&self, request: TransportRequest) -> TransportRequest {
        let mut request = match self.credentials.bearer_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        for (name, value) in self.credentials.headers.iter().flatten() {
            request = request.header(name.as_str(), value.as_str());
        }
        request
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path)
    }
}

#[async_trait]
impl AcsAdapter for CustomRestAdapter {
    fn vendor(&self) -> &'static str {
        VENDOR
    }

    async fn provision_access(
        &self,
        visitor: &VisitorData,
        facility_id: &str,
        access_level: &str,
    ) -> Result<AccessProvisioningResult, AcsError> {
        let now = self.clock.now();
        let body = ProvisionRequest {
            visitor: VisitorPayload {
                id: &visitor.id,
                first_name: &visitor.first_name,
                last_name: &visitor.last_name,
                email: visitor.email.as_deref(),
                company: visitor.company.as_deref(),
                civ_piv_card: visitor.civ_piv_card_info.as_ref(),
            },
            facility_id,
            access_level,
            valid_from: now,
            valid_until: now + Duration::hours(ACCESS_WINDOW_HOURS),
        };

        let request = self.request(TransportRequest::post(self.url("provision")).json(&body)?);
        let response = self.transport.send(request).await?.error_for_status()?;
        let parsed: ProvisionResponse = response.json()?;
        let reference = parsed.acs_reference_id();

        tracing::info!(
            visitor_id = %visitor.id,
            facility_id,
            acs_reference_id = ?reference,
            "Access provisioned in custom ACS"
        );

        Ok(AccessProvisioningResult::success(
            "Access provisioned successfully",
            reference,
        ))
    }

    async fn revoke_access(
        &self,
        visitor: &VisitorData,
        acs_reference_id: Option<&str>,
    ) -> Result<AccessProvisioningResult, AcsError> {
        let body = RevokeRequest {
            visitor_id: &visitor.id,
            reference_id: acs_reference_id,
        };

        let request = self.request(TransportRequest::post(self.url("revoke")).json(&body)?);
        self.transport.send(request).await?.error_for_status()?;

        tracing::info!(
            visitor_id = %visitor.id,
            acs_reference_id = ?acs_reference_id,
            "Access revoked in custom ACS"
        );

        Ok(AccessProvisioningResult::success(
            "Access revoked successfully",
            acs_reference_id.map(str::to_string),
        ))
    }

    async fn test_connection(&self) -> Result<ConnectionTestResult, AcsError> {
        let request = self.request(TransportRequest::get(self.url("health")));
        let response = self.transport.send(request).await?;

        if response.is_success() {
            Ok(ConnectionTestResult::ok("Connection successful"))
        } else {
            tracing::warn!(
                endpoint = %self.endpoint,
                status = response.status,
                "Custom ACS health check failed"
            );
            Ok(ConnectionTestResult::failed(format!(
                "Connection failed: {}",
                response.status_text
            )))
        }
    }
}
