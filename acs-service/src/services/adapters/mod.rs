//! Vendor adapters.
//!
//! Each adapter talks to one kind of access-control system. Adapters return
//! `Err` freely; the dispatcher is the single place errors are turned into
//! caller-facing results.

pub mod ccure;
pub mod custom;
pub mod simulated;

use crate::models::{AccessProvisioningResult, ConnectionTestResult, VisitorData};
use crate::services::error::AcsError;
use async_trait::async_trait;
use service_core::config::Environment;

pub use ccure::{CcureAdapter, PersonnelOutcome, SessionState, StepOutcome};
pub use custom::CustomRestAdapter;
pub use simulated::{SimulatedAdapter, SimulatedVendor};

#[async_trait]
pub trait AcsAdapter: Send + Sync {
    /// Human-readable vendor name used in messages and logs.
    fn vendor(&self) -> &'static str;

    async fn provision_access(
        &self,
        visitor: &VisitorData,
        facility_id: &str,
        access_level: &str,
    ) -> Result<AccessProvisioningResult, AcsError>;

    async fn revoke_access(
        &self,
        visitor: &VisitorData,
        acs_reference_id: Option<&str>,
    ) -> Result<AccessProvisioningResult, AcsError>;

    async fn test_connection(&self) -> Result<ConnectionTestResult, AcsError>;
}

/// Whether vendors without a real integration may fake success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationPolicy {
    /// Return synthetic success without touching the network.
    Simulate,
    /// Refuse with a not-implemented error.
    FailClosed,
}

impl SimulationPolicy {
    pub fn for_environment(environment: Environment) -> Self {
        if environment.is_production() {
            SimulationPolicy::FailClosed
        } else {
            SimulationPolicy::Simulate
        }
    }
}
