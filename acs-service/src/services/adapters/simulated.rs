use super::{AcsAdapter, SimulationPolicy};
use crate::models::{AccessProvisioningResult, ConnectionTestResult, VisitorData};
use crate::services::clock::Clock;
use crate::services::error::AcsError;
use async_trait::async_trait;
use std::sync::Arc;

/// A vendor whose integration is simulated outside production.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedVendor {
    pub display_name: &'static str,
    pub reference_prefix: &'static str,
}

impl SimulatedVendor {
    pub const LENEL: SimulatedVendor = SimulatedVendor {
        display_name: "Lenel OnGuard",
        reference_prefix: "LENEL",
    };

    pub const S2_SECURITY: SimulatedVendor = SimulatedVendor {
        display_name: "S2 Security",
        reference_prefix: "S2",
    };
}

pub struct SimulatedAdapter {
    vendor: SimulatedVendor,
    policy: SimulationPolicy,
    clock: Arc<dyn Clock>,
}

impl SimulatedAdapter {
    pub fn new(vendor: SimulatedVendor, policy: SimulationPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            vendor,
            policy,
            clock,
        }
    }

    fn ensure_simulation_allowed(&self, operation: &str) -> Result<(), AcsError> {
        match self.policy {
            SimulationPolicy::Simulate => Ok(()),
            SimulationPolicy::FailClosed => {
                tracing::error!(
                    vendor = self.vendor.display_name,
                    operation,
                    "Refusing simulated ACS operation in production"
                );
                Err(AcsError::NotImplemented(self.vendor.display_name.to_string()))
            }
        }
    }
}

#[async_trait]
impl AcsAdapter for SimulatedAdapter {
    fn vendor(&self) -> &'static str {
        self.vendor.display_name
    }

    async fn provision_access(
        &self,
        visitor: &VisitorData,
        facility_id: &str,
        access_level: &str,
    ) -> Result<AccessProvisioningResult, AcsError> {
        self.ensure_simulation_allowed("provision")?;

        let reference = format!(
            "{}_{}",
            self.vendor.reference_prefix,
            self.clock.now().timestamp_millis()
        );

        tracing::info!(
            vendor = self.vendor.display_name,
            visitor_id = %visitor.id,
            facility_id,
            access_level,
            acs_reference_id = %reference,
            "[SIMULATED] Access would be provisioned"
        );

        Ok(AccessProvisioningResult::success(
            format!(
                "Access provisioned successfully in {} (simulated)",
                self.vendor.display_name
            ),
            Some(reference),
        ))
    }

    async fn revoke_access(
        &self,
        visitor: &VisitorData,
        acs_reference_id: Option<&str>,
    ) -> Result<AccessProvisioningResult, AcsError> {
        self.ensure_simulation_allowed("revoke")?;

        tracing::info!(
            vendor = self.vendor.display_name,
            visitor_id = %visitor.id,
            acs_reference_id = ?acs_reference_id,
            "[SIMULATED] Access would be revoked"
        );

        Ok(AccessProvisioningResult::success(
            format!(
                "Access revoked successfully in {} (simulated)",
                self.vendor.display_name
            ),
            acs_reference_id.map(str::to_string),
        ))
    }

    async fn test_connection(&self) -> Result<ConnectionTestResult, AcsError> {
        self.ensure_simulation_allowed("test_connection")?;

        Ok(ConnectionTestResult::ok(format!(
            "Connection to {} successful (simulated)",
            self.vendor.display_name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::clock::ManualClock;
    use chrono::{TimeZone, Utc};

    fn visitor() -> VisitorData {
        VisitorData {
            id: "v-1".to_string(),
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            email: None,
            company: None,
            civ_piv_card_info: None,
        }
    }

    fn adapter(vendor: SimulatedVendor, policy: SimulationPolicy) -> SimulatedAdapter {
        let clock = ManualClock::new(Utc.timestamp_millis_opt(1_700_000_000_000).unwrap());
        SimulatedAdapter::new(vendor, policy, Arc::new(clock))
    }

    #[tokio::test]
    async fn test_simulated_provision_uses_prefix_and_timestamp() {
        let adapter = adapter(SimulatedVendor::LENEL, SimulationPolicy::Simulate);
        let result = adapter
            .provision_access(&visitor(), "fac-1", "lobby")
            .await
            .unwrap();

        assert!(result.success);
        assert!(result.message.contains("simulated"));
        assert_eq!(result.acs_reference_id.as_deref(), Some("LENEL_1700000000000"));
    }

    #[tokio::test]
    async fn test_simulated_s2_revoke_and_test_connection() {
        let adapter = adapter(SimulatedVendor::S2_SECURITY, SimulationPolicy::Simulate);

        let revoked = adapter
            .revoke_access(&visitor(), Some("S2_1"))
            .await
            .unwrap();
        assert!(revoked.success);
        assert_eq!(revoked.acs_reference_id.as_deref(), Some("S2_1"));

        let connection = adapter.test_connection().await.unwrap();
        assert!(connection.success);
        assert!(connection.message.contains("simulated"));
    }

    #[tokio::test]
    async fn test_production_fails_closed() {
        let adapter = adapter(SimulatedVendor::LENEL, SimulationPolicy::FailClosed);

        let err = adapter
            .provision_access(&visitor(), "fac-1", "lobby")
            .await
            .unwrap_err();
        assert!(matches!(err, AcsError::NotImplemented(_)));
        assert!(err.to_string().contains("not yet implemented"));

        assert!(adapter.revoke_access(&visitor(), None).await.is_err());
        assert!(adapter.test_connection().await.is_err());
    }
}
