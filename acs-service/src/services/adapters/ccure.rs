//! Software House C•CURE 9000 integration over its victor web service.
//!
//! The vendor requires a logged-in session. Login succeeds only when the
//! response body is the literal text `true`; there is no expiry signal, so
//! a session is assumed valid for a fixed window after login and renewed
//! lazily before the next call that needs it.
//!
//! Provisioning is three calls: create the personnel record (fatal on
//! failure), assign a clearance and enroll the CIV/PIV card. The last two
//! are best effort: their failures are logged and counted but the overall
//! result still reports success with the personnel id as reference.

use super::AcsAdapter;
use crate::models::{
    AcsConfiguration, AcsCredentials, AccessProvisioningResult, CcureCredentials, CivPivCardInfo,
    ConnectionTestResult, VisitorData,
};
use crate::services::clock::Clock;
use crate::services::error::AcsError;
use crate::services::metrics::{record_login, record_partial_provisioning};
use crate::services::transport::{HttpTransport, TransportRequest, TransportResponse};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use secrecy::ExposeSecret;
use serde::Serialize;
use service_core::observability::REDACTED;
use std::sync::Arc;
use tokio::sync::Mutex;

const VENDOR: &str = "C•CURE 9000";
const METRIC_VENDOR: &str = "ccure9000";

const LOGIN_PATH: &str = "api/authenticate/Login";
const PERSIST_PATH: &str = "api/Objects/Persist";
const PERSIST_TO_CONTAINER_PATH: &str = "api/Objects/PersistToContainer";
const SET_PROPERTY_PATH: &str = "api/Objects/SetProperty";

/// Response header carrying the session token, echoed on later requests.
const SESSION_HEADER: &str = "session-id";

const PERSONNEL_TYPE: &str = "SoftwareHouse.NextGen.Common.SecurityObjects.Personnel";
const CLEARANCE_TYPE: &str = "SoftwareHouse.NextGen.Common.SecurityObjects.PersonnelClearancePair";
const CREDENTIAL_TYPE: &str = "SoftwareHouse.NextGen.Common.SecurityObjects.Credential";

const DEFAULT_CLIENT_VERSION: &str = "3.0";
const DEFAULT_PERSONNEL_TYPE_NAME: &str = "Visitor";
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 30;

/// Client-side view of the vendor session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated {
        token: Option<String>,
        expiry: DateTime<Utc>,
    },
}

impl SessionState {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match self {
            SessionState::Authenticated { expiry, .. } => now <= *expiry,
            SessionState::Unauthenticated => false,
        }
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            SessionState::Authenticated { token, .. } => token.as_deref(),
            SessionState::Unauthenticated => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub success: bool,
    pub message: String,
}

impl StepOutcome {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonnelOutcome {
    pub success: bool,
    pub personnel_id: Option<String>,
    pub message: String,
}

impl PersonnelOutcome {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            personnel_id: None,
            message: message.into(),
        }
    }
}

// No Debug: this carries the password.
#[derive(Serialize)]
struct LoginRequest<'a> {
    #[serde(rename = "UserName")]
    user_name: &'a str,
    #[serde(rename = "Password")]
    password: &'a str,
    #[serde(rename = "ClientName")]
    client_name: &'a str,
    #[serde(rename = "ClientID")]
    client_id: &'a str,
    #[serde(rename = "ClientVersion")]
    client_version: &'a str,
}

#[derive(Debug, Serialize)]
struct PersistRequest {
    #[serde(rename = "Type")]
    object_type: &'static str,
    #[serde(rename = "PropertyNames")]
    property_names: Vec<&'static str>,
    #[serde(rename = "PropertyValues")]
    property_values: Vec<String>,
}

impl PersistRequest {
    /// Build from name/value pairs, dropping absent values.
    fn new(object_type: &'static str, properties: Vec<(&'static str, Option<String>)>) -> Self {
        let (property_names, property_values) = properties
            .into_iter()
            .filter_map(|(name, value)| value.map(|value| (name, value)))
            .unzip();

        Self {
            object_type,
            property_names,
            property_values,
        }
    }
}

#[derive(Debug, Serialize)]
struct PersistToContainerRequest<'a> {
    #[serde(rename = "ContainerType")]
    container_type: &'static str,
    #[serde(rename = "ContainerID")]
    container_id: &'a str,
    #[serde(rename = "Children")]
    children: Vec<PersistRequest>,
}

#[derive(Debug, Serialize)]
struct SetPropertyRequest<'a> {
    #[serde(rename = "Type")]
    object_type: &'static str,
    #[serde(rename = "ObjectID")]
    object_id: &'a str,
    #[serde(rename = "PropertyName")]
    property_name: &'static str,
    #[serde(rename = "PropertyValue")]
    property_value: serde_json::Value,
}

pub struct CcureAdapter {
    credentials: CcureCredentials,
    base_url: String,
    transport: Arc<dyn HttpTransport>,
    clock: Arc<dyn Clock>,
    session_ttl: Duration,
    session: Mutex<SessionState>,
}

impl CcureAdapter {
    pub fn new(
        config: &AcsConfiguration,
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AcsError> {
        let credentials = match &config.credentials {
            AcsCredentials::Ccure(credentials) => credentials.clone(),
            _ => {
                return Err(AcsError::Configuration(
                    "C•CURE 9000 configuration requires session credentials".to_string(),
                ))
            }
        };

        let base_url = Some(credentials.base_url.trim())
            .filter(|url| !url.is_empty())
            .or_else(|| config.api_endpoint.as_deref().map(str::trim))
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                AcsError::Configuration("C•CURE 9000 configuration has no base_url".to_string())
            })?;

        // Paths are appended directly, so the base must end with a slash.
        let base_url = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };

        Ok(Self {
            credentials,
            base_url,
            transport,
            clock,
            session_ttl: Duration::minutes(DEFAULT_SESSION_TTL_MINUTES),
            session: Mutex::new(SessionState::Unauthenticated),
        })
    }

    pub fn with_session_ttl(mut self, session_ttl: Duration) -> Self {
        self.session_ttl = session_ttl;
        self
    }

    pub async fn session_state(&self) -> SessionState {
        self.session.lock().await.clone()
    }

    /// Log in unconditionally, replacing any existing session.
    pub async fn authenticate(&self) -> Result<(), AcsError> {
        let mut session = self.session.lock().await;
        self.login(&mut session).await
    }

    /// Create the visitor's personnel record.
    ///
    /// Authentication and connection failures are returned as `Err`; a
    /// vendor refusal comes back as an unsuccessful outcome.
    pub async fn create_personnel(
        &self,
        visitor: &VisitorData,
        access_level: &str,
    ) -> Result<PersonnelOutcome, AcsError> {
        let personnel_type = self
            .credentials
            .personnel_type_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(DEFAULT_PERSONNEL_TYPE_NAME);

        let body = PersistRequest::new(
            PERSONNEL_TYPE,
            vec![
                ("FirstName", Some(visitor.first_name.clone())),
                ("LastName", Some(visitor.last_name.clone())),
                ("EmailAddress", visitor.email.clone()),
                ("PersonnelTypeName", Some(personnel_type.to_string())),
                ("Text1", Some(personnel_key(visitor).to_string())),
                ("Text2", visitor.company.clone()),
                ("Text3", Some(access_level.to_string())),
            ],
        );

        let request = TransportRequest::post(self.url(PERSIST_PATH)).json(&body)?;
        let response = match self.send_authenticated(request).await?.error_for_status() {
            Ok(response) => response,
            Err(e) => return Ok(PersonnelOutcome::failed(e.to_string())),
        };

        match parse_object_id(&response.body) {
            Some(personnel_id) => {
                tracing::info!(
                    visitor_id = %visitor.id,
                    personnel_id = %personnel_id,
                    "Personnel record created in C•CURE 9000"
                );
                Ok(PersonnelOutcome {
                    success: true,
                    personnel_id: Some(personnel_id),
                    message: "Personnel record created".to_string(),
                })
            }
            None => Ok(PersonnelOutcome::failed(
                "C•CURE 9000 did not return a personnel id",
            )),
        }
    }

    pub async fn assign_access_level(
        &self,
        personnel_id: &str,
        access_level: &str,
        facility_id: &str,
    ) -> StepOutcome {
        let clearance = PersistRequest::new(
            CLEARANCE_TYPE,
            vec![
                ("ClearanceName", Some(access_level.to_string())),
                ("PartitionName", Some(facility_id.to_string())),
            ],
        );

        match self.persist_child(personnel_id, clearance).await {
            Ok(()) => StepOutcome::ok(format!("Access level '{}' assigned", access_level)),
            Err(e) => StepOutcome::failed(format!(
                "Failed to assign access level '{}': {}",
                access_level, e
            )),
        }
    }

    pub async fn enroll_civ_piv_card(
        &self,
        personnel_id: &str,
        card: &CivPivCardInfo,
    ) -> StepOutcome {
        let card_number = card.card_number.clone().filter(|n| !n.trim().is_empty());
        let fasc_n = card.fasc_n.clone().filter(|n| !n.trim().is_empty());
        if card_number.is_none() && fasc_n.is_none() {
            return StepOutcome::failed("CIV/PIV card has neither a card number nor a FASC-N");
        }

        let credential = PersistRequest::new(
            CREDENTIAL_TYPE,
            vec![
                ("Name", Some(format!("CIV/PIV {}", personnel_id))),
                ("CardNumber", card_number),
                ("FASCN", fasc_n),
                ("Text1", card.edipi.clone()),
                ("ExpirationDateTime", card.expiration_date.clone()),
            ],
        );

        match self.persist_child(personnel_id, credential).await {
            Ok(()) => StepOutcome::ok("CIV/PIV card enrolled"),
            Err(e) => StepOutcome::failed(format!("Failed to enroll CIV/PIV card: {}", e)),
        }
    }

    pub async fn deactivate_personnel(&self, personnel_id: &str) -> Result<(), AcsError> {
        let body = SetPropertyRequest {
            object_type: PERSONNEL_TYPE,
            object_id: personnel_id,
            property_name: "Disabled",
            property_value: serde_json::Value::Bool(true),
        };

        let request = TransportRequest::post(self.url(SET_PROPERTY_PATH)).json(&body)?;
        self.send_authenticated(request).await?.error_for_status()?;

        tracing::info!(personnel_id, "Personnel record disabled in C•CURE 9000");
        Ok(())
    }

    async fn persist_child(&self, personnel_id: &str, child: PersistRequest) -> Result<(), AcsError> {
        let body = PersistToContainerRequest {
            container_type: PERSONNEL_TYPE,
            container_id: personnel_id,
            children: vec![child],
        };

        let request = TransportRequest::post(self.url(PERSIST_TO_CONTAINER_PATH)).json(&body)?;
        self.send_authenticated(request).await?.error_for_status()?;
        Ok(())
    }

    /// Attach the session token and send. A 401 drops the session so the
    /// next call logs in again.
    async fn send_authenticated(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, AcsError> {
        let token = self.ensure_authenticated().await?;
        let request = match token {
            Some(token) => request.header(SESSION_HEADER, token),
            None => request,
        };

        let response = self.transport.send(request).await?;
        if response.status == 401 {
            tracing::warn!("C•CURE 9000 rejected the session; it will be renewed on next use");
            *self.session.lock().await = SessionState::Unauthenticated;
        }
        Ok(response)
    }

    /// Log in if there is no session or it has passed its assumed expiry.
    async fn ensure_authenticated(&self) -> Result<Option<String>, AcsError> {
        let mut session = self.session.lock().await;
        if !session.is_valid_at(self.clock.now()) {
            self.login(&mut session).await?;
        }
        Ok(session.token().map(str::to_string))
    }

    async fn login(&self, session: &mut SessionState) -> Result<(), AcsError> {
        *session = SessionState::Unauthenticated;

        let client_version = self
            .credentials
            .version
            .as_deref()
            .unwrap_or(DEFAULT_CLIENT_VERSION);

        tracing::info!(
            base_url = %self.base_url,
            user_name = %self.credentials.user_name,
            password = REDACTED,
            client_name = %self.credentials.client_name,
            client_version,
            "Authenticating with C•CURE 9000"
        );

        let body = LoginRequest {
            user_name: &self.credentials.user_name,
            password: self.credentials.password.expose_secret(),
            client_name: &self.credentials.client_name,
            client_id: &self.credentials.client_id,
            client_version,
        };
        let request = TransportRequest::post(self.url(LOGIN_PATH)).json(&body)?;

        let response = self.transport.send(request).await.inspect_err(|_| {
            record_login(METRIC_VENDOR, "error");
        })?;

        if !response.is_success() {
            record_login(METRIC_VENDOR, "rejected");
            tracing::warn!(status = response.status, "C•CURE 9000 login rejected");
            return Err(AcsError::Authentication(format!(
                "HTTP {} {}: {}",
                response.status,
                response.status_text,
                response.body.trim()
            )));
        }

        if response.body.trim() != "true" {
            record_login(METRIC_VENDOR, "rejected");
            tracing::warn!(body = %response.body, "C•CURE 9000 login did not return true");
            return Err(AcsError::Authentication(response.body));
        }

        let expiry = self.clock.now() + self.session_ttl;
        *session = SessionState::Authenticated {
            token: response.header(SESSION_HEADER).map(str::to_string),
            expiry,
        };
        record_login(METRIC_VENDOR, "success");
        tracing::info!(expiry = %expiry, "C•CURE 9000 session established");

        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl AcsAdapter for CcureAdapter {
    fn vendor(&self) -> &'static str {
        VENDOR
    }

    async fn provision_access(
        &self,
        visitor: &VisitorData,
        facility_id: &str,
        access_level: &str,
    ) -> Result<AccessProvisioningResult, AcsError> {
        let created = self.create_personnel(visitor, access_level).await?;
        let personnel_id = match created.personnel_id {
            Some(id) if created.success => id,
            _ => {
                return Err(AcsError::Vendor(format!(
                    "Failed to create personnel: {}",
                    created.message
                )))
            }
        };

        let mut warnings = Vec::new();

        let assignment = self
            .assign_access_level(&personnel_id, access_level, facility_id)
            .await;
        if !assignment.success {
            tracing::warn!(
                personnel_id = %personnel_id,
                access_level,
                error = %assignment.message,
                "Access level assignment failed; personnel record kept"
            );
            record_partial_provisioning(METRIC_VENDOR, "access_level");
            warnings.push("access level assignment failed");
        }

        if let Some(card) = &visitor.civ_piv_card_info {
            let enrollment = self.enroll_civ_piv_card(&personnel_id, card).await;
            if !enrollment.success {
                tracing::warn!(
                    personnel_id = %personnel_id,
                    error = %enrollment.message,
                    "CIV/PIV card enrollment failed; personnel record kept"
                );
                record_partial_provisioning(METRIC_VENDOR, "card_enrollment");
                warnings.push("CIV/PIV card enrollment failed");
            }
        }

        let message = if warnings.is_empty() {
            format!("Access provisioned successfully in {}", VENDOR)
        } else {
            format!(
                "Access provisioned successfully in {} with warnings: {}",
                VENDOR,
                warnings.join("; ")
            )
        };

        Ok(AccessProvisioningResult::success(message, Some(personnel_id)))
    }

    async fn revoke_access(
        &self,
        visitor: &VisitorData,
        acs_reference_id: Option<&str>,
    ) -> Result<AccessProvisioningResult, AcsError> {
        let personnel_id = acs_reference_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(AcsError::RevocationPrecondition)?;

        self.deactivate_personnel(personnel_id).await?;

        tracing::info!(
            visitor_id = %visitor.id,
            personnel_id,
            "Access revoked in C•CURE 9000"
        );

        Ok(AccessProvisioningResult::success(
            format!("Access revoked successfully in {}", VENDOR),
            Some(personnel_id.to_string()),
        ))
    }

    async fn test_connection(&self) -> Result<ConnectionTestResult, AcsError> {
        Ok(match self.authenticate().await {
            Ok(()) => ConnectionTestResult::ok(format!("Successfully authenticated with {}", VENDOR)),
            Err(e) => ConnectionTestResult::failed(e.to_string()),
        })
    }
}

/// Vendor-side key for the visitor: the card's EDIPI when present.
fn personnel_key(visitor: &VisitorData) -> &str {
    visitor.edipi().unwrap_or(&visitor.id)
}

/// Pull the object id out of a persist response: a JSON object with an
/// `ObjectID`-style field, a bare JSON scalar, or a raw token. Bare strings
/// and raw tokens must look like an id; "OK" or an HTML error page is not one.
fn parse_object_id(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::Object(map)) => ["ObjectID", "ObjectId", "ID", "Id", "id"]
            .iter()
            .find_map(|key| map.get(*key))
            .and_then(scalar_id),
        Ok(value) => scalar_id(&value).filter(|id| is_id_token(id)),
        Err(_) => Some(trimmed.to_string()).filter(|id| is_id_token(id)),
    }
}

fn scalar_id(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Alphanumerics, `-` and `_`, with at least one digit.
fn is_id_token(token: &str) -> bool {
    token
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        && token.chars().any(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AcsType;
    use crate::services::clock::ManualClock;
    use crate::services::transport::MockTransport;
    use chrono::TimeZone;
    use secrecy::Secret;
    use serde_json::json;

    const BASE: &str = "https://ccure.example.com/victorwebservice/";

    fn config() -> AcsConfiguration {
        AcsConfiguration {
            id: "cfg-ccure".to_string(),
            tenant_id: "tenant-1".to_string(),
            name: "HQ".to_string(),
            acs_type: AcsType::Ccure9000,
            api_endpoint: None,
            credentials: AcsCredentials::Ccure(CcureCredentials {
                base_url: BASE.to_string(),
                user_name: "svc-vms".to_string(),
                password: Secret::new("hunter2".to_string()),
                client_name: "VMS".to_string(),
                client_id: "client-123".to_string(),
                version: None,
                personnel_type_name: None,
            }),
            is_active: true,
        }
    }

    fn visitor(card: Option<CivPivCardInfo>) -> VisitorData {
        VisitorData {
            id: "v-7".to_string(),
            first_name: "Katherine".to_string(),
            last_name: "Johnson".to_string(),
            email: Some("kj@example.com".to_string()),
            company: Some("NASA".to_string()),
            civ_piv_card_info: card,
        }
    }

    fn card() -> CivPivCardInfo {
        CivPivCardInfo {
            edipi: Some("1234567890".to_string()),
            fasc_n: Some("D13810D828AC6C10843C10C1".to_string()),
            card_number: Some("000123".to_string()),
            ..Default::default()
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 8, 0, 0).unwrap()
    }

    fn setup() -> (CcureAdapter, Arc<MockTransport>, Arc<ManualClock>) {
        let transport = Arc::new(MockTransport::new());
        let clock = Arc::new(ManualClock::new(start()));
        let adapter = CcureAdapter::new(&config(), transport.clone(), clock.clone()).unwrap();
        (adapter, transport, clock)
    }

    fn push_login_ok(transport: &MockTransport) {
        transport.push_response(
            TransportResponse::new(200, "true").with_header("session-id", "sess-1"),
        );
    }

    #[tokio::test]
    async fn test_login_true_establishes_session() {
        let (adapter, transport, _) = setup();
        push_login_ok(&transport);

        adapter.authenticate().await.unwrap();

        assert_eq!(
            adapter.session_state().await,
            SessionState::Authenticated {
                token: Some("sess-1".to_string()),
                expiry: start() + Duration::minutes(30),
            }
        );

        let request = &transport.requests()[0];
        assert_eq!(request.url, format!("{}api/authenticate/Login", BASE));
        assert_eq!(
            request.body.as_ref().unwrap(),
            &json!({
                "UserName": "svc-vms",
                "Password": "hunter2",
                "ClientName": "VMS",
                "ClientID": "client-123",
                "ClientVersion": "3.0"
            })
        );
    }

    #[tokio::test]
    async fn test_login_accepts_whitespace_around_true() {
        let (adapter, transport, _) = setup();
        transport.push_text(200, "  true\r\n");

        adapter.authenticate().await.unwrap();
        assert!(adapter.session_state().await.is_valid_at(start()));
    }

    #[tokio::test]
    async fn test_login_false_is_authentication_failure() {
        let (adapter, transport, _) = setup();
        transport.push_text(200, "false");

        let err = adapter.authenticate().await.unwrap_err();
        assert!(matches!(err, AcsError::Authentication(_)));
        assert!(err.to_string().contains("Authentication failed: false"));
        assert_eq!(adapter.session_state().await, SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_login_http_error_reports_status() {
        let (adapter, transport, _) = setup();
        transport.push_text(401, "bad credentials");

        let err = adapter.authenticate().await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("401"));
        assert!(message.contains("bad credentials"));
        assert_eq!(adapter.session_state().await, SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_session_is_reused_until_expiry() {
        let (adapter, transport, clock) = setup();
        push_login_ok(&transport);
        transport.push_json(200, json!({ "ObjectID": 5001 }));
        transport.push_json(200, json!({ "ObjectID": 5002 }));

        adapter.authenticate().await.unwrap();
        clock.advance(Duration::minutes(30));
        let created = adapter.create_personnel(&visitor(None), "lobby").await.unwrap();
        assert_eq!(created.personnel_id.as_deref(), Some("5001"));
        assert_eq!(transport.requests_to(LOGIN_PATH).len(), 1);

        let created = adapter.create_personnel(&visitor(None), "lobby").await.unwrap();
        assert_eq!(created.personnel_id.as_deref(), Some("5002"));
        assert_eq!(transport.requests_to(LOGIN_PATH).len(), 1);
    }

    #[tokio::test]
    async fn test_expired_session_triggers_relogin() {
        let (adapter, transport, clock) = setup();
        push_login_ok(&transport);
        transport.push_json(200, json!({ "ObjectID": 5001 }));

        adapter.create_personnel(&visitor(None), "lobby").await.unwrap();
        assert_eq!(transport.call_count(), 2);

        clock.advance(Duration::minutes(31));
        push_login_ok(&transport);
        transport.push_json(200, json!({ "ObjectID": 5002 }));

        let created = adapter.create_personnel(&visitor(None), "lobby").await.unwrap();
        assert_eq!(created.personnel_id.as_deref(), Some("5002"));
        assert_eq!(transport.requests_to(LOGIN_PATH).len(), 2);
        assert_eq!(
            adapter.session_state().await,
            SessionState::Authenticated {
                token: Some("sess-1".to_string()),
                expiry: start() + Duration::minutes(61),
            }
        );
    }

    #[tokio::test]
    async fn test_create_personnel_sends_session_and_fields() {
        let (adapter, transport, _) = setup();
        push_login_ok(&transport);
        transport.push_text(200, "\"P-77\"");

        let created = adapter
            .create_personnel(&visitor(Some(card())), "lab-access")
            .await
            .unwrap();
        assert!(created.success);
        assert_eq!(created.personnel_id.as_deref(), Some("P-77"));

        let request = &transport.requests()[1];
        assert_eq!(request.url, format!("{}api/Objects/Persist", BASE));
        assert_eq!(request.header_value("session-id"), Some("sess-1"));

        let body = request.body.as_ref().unwrap();
        assert_eq!(body["Type"], PERSONNEL_TYPE);
        let names = body["PropertyNames"].as_array().unwrap();
        let values = body["PropertyValues"].as_array().unwrap();
        let text1 = names.iter().position(|n| n == "Text1").unwrap();
        assert_eq!(values[text1], "1234567890");
        let personnel_type = names.iter().position(|n| n == "PersonnelTypeName").unwrap();
        assert_eq!(values[personnel_type], "Visitor");
    }

    #[tokio::test]
    async fn test_provision_full_success_with_card() {
        let (adapter, transport, _) = setup();
        push_login_ok(&transport);
        transport.push_json(200, json!({ "ObjectID": 5001 }));
        transport.push_text(200, "");
        transport.push_text(200, "");

        let result = adapter
            .provision_access(&visitor(Some(card())), "fac-1", "lab-access")
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.acs_reference_id.as_deref(), Some("5001"));
        assert!(!result.message.contains("warnings"));

        let containers = transport.requests_to(PERSIST_TO_CONTAINER_PATH);
        assert_eq!(containers.len(), 2);
        let clearance = containers[0].body.as_ref().unwrap();
        assert_eq!(clearance["ContainerID"], "5001");
        assert_eq!(clearance["Children"][0]["Type"], CLEARANCE_TYPE);
        assert_eq!(
            clearance["Children"][0]["PropertyValues"],
            json!(["lab-access", "fac-1"])
        );
        let credential = containers[1].body.as_ref().unwrap();
        assert_eq!(credential["Children"][0]["Type"], CREDENTIAL_TYPE);
    }

    #[tokio::test]
    async fn test_access_level_failure_is_partial_success() {
        let (adapter, transport, _) = setup();
        push_login_ok(&transport);
        transport.push_json(200, json!({ "ObjectID": 5001 }));
        transport.push_text(500, "clearance not found");

        let result = adapter
            .provision_access(&visitor(None), "fac-1", "vault")
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.acs_reference_id.as_deref(), Some("5001"));
        assert!(result.message.starts_with("Access provisioned successfully"));
        assert!(result.message.contains("access level assignment failed"));
        // No card on the visitor, so no enrollment call.
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test]
    async fn test_card_enrollment_failure_is_partial_success() {
        let (adapter, transport, _) = setup();
        push_login_ok(&transport);
        transport.push_json(200, json!({ "ObjectID": 5001 }));
        transport.push_text(200, "");
        transport.push_text(400, "bad FASC-N");

        let result = adapter
            .provision_access(&visitor(Some(card())), "fac-1", "lobby")
            .await
            .unwrap();

        assert!(result.success);
        assert!(result.message.contains("CIV/PIV card enrollment failed"));
    }

    #[tokio::test]
    async fn test_card_without_identifiers_is_not_sent() {
        let (adapter, _, _) = setup();
        let outcome = adapter
            .enroll_civ_piv_card("5001", &CivPivCardInfo::default())
            .await;
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn test_personnel_creation_failure_is_fatal() {
        let (adapter, transport, _) = setup();
        push_login_ok(&transport);
        transport.push_text(500, "duplicate");

        let err = adapter
            .provision_access(&visitor(None), "fac-1", "lobby")
            .await
            .unwrap_err();

        assert!(matches!(err, AcsError::Vendor(_)));
        assert!(err.to_string().contains("Failed to create personnel"));
        assert!(err.to_string().contains("500"));
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_login_failure_aborts_provisioning() {
        let (adapter, transport, _) = setup();
        transport.push_text(200, "false");

        let err = adapter
            .provision_access(&visitor(None), "fac-1", "lobby")
            .await
            .unwrap_err();
        assert!(matches!(err, AcsError::Authentication(_)));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_revoke_requires_reference_without_network() {
        let (adapter, transport, _) = setup();

        let err = adapter.revoke_access(&visitor(None), None).await.unwrap_err();
        assert_eq!(err.to_string(), "ACS reference ID is required for revocation");

        let err = adapter
            .revoke_access(&visitor(None), Some("  "))
            .await
            .unwrap_err();
        assert!(matches!(err, AcsError::RevocationPrecondition));

        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_revoke_disables_personnel() {
        let (adapter, transport, _) = setup();
        push_login_ok(&transport);
        transport.push_text(200, "");

        let result = adapter
            .revoke_access(&visitor(None), Some("5001"))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.acs_reference_id.as_deref(), Some("5001"));

        let request = &transport.requests()[1];
        assert_eq!(request.url, format!("{}api/Objects/SetProperty", BASE));
        assert_eq!(
            request.body.as_ref().unwrap(),
            &json!({
                "Type": PERSONNEL_TYPE,
                "ObjectID": "5001",
                "PropertyName": "Disabled",
                "PropertyValue": true
            })
        );
    }

    #[tokio::test]
    async fn test_unauthorized_response_drops_session() {
        let (adapter, transport, _) = setup();
        push_login_ok(&transport);
        transport.push_text(401, "");

        assert!(adapter.deactivate_personnel("5001").await.is_err());
        assert_eq!(adapter.session_state().await, SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_connection_reports_login_outcome_without_error() {
        let (adapter, transport, _) = setup();
        transport.push_text(200, "false");
        push_login_ok(&transport);

        let failed = adapter.test_connection().await.unwrap();
        assert!(!failed.success);
        assert!(failed.message.contains("Authentication failed: false"));

        let ok = adapter.test_connection().await.unwrap();
        assert!(ok.success);
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let mut config = config();
        if let AcsCredentials::Ccure(creds) = &mut config.credentials {
            creds.base_url = "https://ccure.example.com/victorwebservice".to_string();
        }
        let adapter = CcureAdapter::new(
            &config,
            Arc::new(MockTransport::new()),
            Arc::new(ManualClock::default()),
        )
        .unwrap();
        assert_eq!(
            adapter.url(LOGIN_PATH),
            "https://ccure.example.com/victorwebservice/api/authenticate/Login"
        );
    }

    #[test]
    fn test_parse_object_id_shapes() {
        assert_eq!(parse_object_id(r#"{"ObjectID": 12}"#).as_deref(), Some("12"));
        assert_eq!(parse_object_id(r#"{"Id": "abc"}"#).as_deref(), Some("abc"));
        assert_eq!(parse_object_id("5003").as_deref(), Some("5003"));
        assert_eq!(parse_object_id("P-9").as_deref(), Some("P-9"));
        assert_eq!(parse_object_id(""), None);
        assert_eq!(parse_object_id(r#"{"Status": "ok"}"#), None);
        assert_eq!(parse_object_id("<html> error </html>"), None);
    }

    #[test]
    fn test_parse_object_id_rejects_status_words() {
        assert_eq!(parse_object_id("OK"), None);
        assert_eq!(parse_object_id("Error"), None);
        assert_eq!(parse_object_id("<html>"), None);
        assert_eq!(parse_object_id(r#""Success""#), None);
        assert_eq!(parse_object_id("null"), None);
        assert_eq!(parse_object_id(r#""8812""#).as_deref(), Some("8812"));
        assert_eq!(parse_object_id("a1b2_c3").as_deref(), Some("a1b2_c3"));
    }

    #[tokio::test]
    async fn test_persist_ok_without_id_fails_provisioning() {
        let (adapter, transport, _) = setup();
        push_login_ok(&transport);
        transport.push_text(200, "OK");

        let err = adapter
            .provision_access(&visitor(None), "fac-1", "lobby")
            .await
            .unwrap_err();

        assert!(matches!(err, AcsError::Vendor(_)));
        assert!(err.to_string().contains("Failed to create personnel"));
        assert!(err.to_string().contains("did not return a personnel id"));
        assert_eq!(transport.call_count(), 2);
    }
}
