//! Access provisioning endpoints.
//!
//! Vendor failures are part of the response body (`success: false`), so
//! these handlers only return an error status for malformed requests.

use crate::models::{AccessProvisioningResult, AcsConfiguration, ConnectionTestResult, VisitorData};
use crate::startup::AppState;
use axum::{extract::State, Json};
use serde::Deserialize;
use service_core::error::AppError;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct ProvisionAccessRequest {
    #[validate(nested)]
    pub visitor: VisitorData,
    pub configuration: AcsConfiguration,
    #[validate(length(min = 1, message = "facility_id must not be empty"))]
    pub facility_id: String,
    #[validate(length(min = 1, message = "access_level must not be empty"))]
    pub access_level: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RevokeAccessRequest {
    #[validate(nested)]
    pub visitor: VisitorData,
    pub configuration: AcsConfiguration,
    #[serde(default)]
    pub acs_reference_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TestConnectionRequest {
    pub configuration: AcsConfiguration,
}

pub async fn provision_access(
    State(state): State<AppState>,
    Json(request): Json<ProvisionAccessRequest>,
) -> Result<Json<AccessProvisioningResult>, AppError> {
    request.validate()?;

    let result = state
        .dispatcher
        .provision_access(
            &request.visitor,
            &request.configuration,
            &request.facility_id,
            &request.access_level,
        )
        .await;

    Ok(Json(result))
}

pub async fn revoke_access(
    State(state): State<AppState>,
    Json(request): Json<RevokeAccessRequest>,
) -> Result<Json<AccessProvisioningResult>, AppError> {
    request.validate()?;

    let result = state
        .dispatcher
        .revoke_access(
            &request.visitor,
            &request.configuration,
            request.acs_reference_id.as_deref(),
        )
        .await;

    Ok(Json(result))
}

pub async fn test_connection(
    State(state): State<AppState>,
    Json(request): Json<TestConnectionRequest>,
) -> Json<ConnectionTestResult> {
    Json(state.dispatcher.test_connection(&request.configuration).await)
}
