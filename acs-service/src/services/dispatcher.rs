//! Single entry point for ACS operations.
//!
//! The dispatcher resolves an adapter for the tenant's configuration,
//! forwards the call and folds every error into the uniform result shape.
//! None of its public operations can fail.

use crate::models::{
    AccessProvisioningResult, AcsConfiguration, AcsType, ConnectionTestResult, VisitorData,
};
use crate::services::adapter_cache::{AdapterCache, AdapterCacheSettings};
use crate::services::adapters::AcsAdapter;
use crate::services::error::AcsError;
use crate::services::metrics::record_operation;
use crate::services::registry::AdapterRegistry;
use std::sync::Arc;
use std::time::Instant;

pub const PROVISIONING_ERROR: &str = "PROVISIONING_ERROR";
pub const REVOCATION_ERROR: &str = "REVOCATION_ERROR";

#[derive(Debug, Clone, Copy)]
enum Operation {
    Provision,
    Revoke,
}

impl Operation {
    fn label(self) -> &'static str {
        match self {
            Operation::Provision => "provision",
            Operation::Revoke => "revoke",
        }
    }

    fn error_code(self) -> &'static str {
        match self {
            Operation::Provision => PROVISIONING_ERROR,
            Operation::Revoke => REVOCATION_ERROR,
        }
    }

    fn failure_prefix(self) -> &'static str {
        match self {
            Operation::Provision => "Failed to provision access",
            Operation::Revoke => "Failed to revoke access",
        }
    }

    fn empty_message(self, success: bool) -> &'static str {
        match (self, success) {
            (Operation::Provision, true) => "Access provisioned successfully",
            (Operation::Provision, false) => "Failed to provision access",
            (Operation::Revoke, true) => "Access revoked successfully",
            (Operation::Revoke, false) => "Failed to revoke access",
        }
    }
}

pub struct AcsDispatcher {
    registry: AdapterRegistry,
    cache: Option<AdapterCache>,
}

impl AcsDispatcher {
    /// Dispatcher that keeps one adapter per configuration for vendors
    /// whose factory reports them cacheable.
    pub fn new(registry: AdapterRegistry) -> Self {
        Self::with_cache(registry, AdapterCacheSettings::default())
    }

    pub fn with_cache(registry: AdapterRegistry, settings: AdapterCacheSettings) -> Self {
        if settings.max_entries == 0 {
            return Self::without_cache(registry);
        }
        Self {
            registry,
            cache: Some(AdapterCache::new(settings)),
        }
    }

    /// Dispatcher that builds a fresh adapter for every call.
    pub fn without_cache(registry: AdapterRegistry) -> Self {
        Self {
            registry,
            cache: None,
        }
    }

    pub fn supported_types(&self) -> Vec<AcsType> {
        self.registry.supported_types()
    }

    pub fn cached_adapters(&self) -> usize {
        self.cache.as_ref().map_or(0, AdapterCache::len)
    }

    /// Drop the cached adapter for a configuration, if any.
    pub fn evict(&self, tenant_id: &str, config_id: &str) -> bool {
        self.cache
            .as_ref()
            .is_some_and(|cache| cache.remove(tenant_id, config_id))
    }

    /// A session adapter whose login failed holds nothing worth keeping.
    fn evict_on_session_failure(&self, config: &AcsConfiguration, error: &AcsError) {
        if matches!(error, AcsError::Authentication(_) | AcsError::Connection(_))
            && self.evict(&config.tenant_id, &config.id)
        {
            tracing::debug!(error_kind = error.kind(), "Dropped cached ACS adapter");
        }
    }

    #[tracing::instrument(
        name = "acs.provision",
        skip_all,
        fields(
            tenant_id = %config.tenant_id,
            config_id = %config.id,
            acs_type = %config.acs_type,
            visitor_id = %visitor.id,
        )
    )]
    pub async fn provision_access(
        &self,
        visitor: &VisitorData,
        config: &AcsConfiguration,
        facility_id: &str,
        access_level: &str,
    ) -> AccessProvisioningResult {
        let started = Instant::now();
        let operation = Operation::Provision;

        let outcome = match self.resolve(config) {
            Ok(adapter) => {
                adapter
                    .provision_access(visitor, facility_id, access_level)
                    .await
            }
            Err(e) => Err(e),
        };

        self.finish(config, operation, outcome, started)
    }

    #[tracing::instrument(
        name = "acs.revoke",
        skip_all,
        fields(
            tenant_id = %config.tenant_id,
            config_id = %config.id,
            acs_type = %config.acs_type,
            visitor_id = %visitor.id,
        )
    )]
    pub async fn revoke_access(
        &self,
        visitor: &VisitorData,
        config: &AcsConfiguration,
        acs_reference_id: Option<&str>,
    ) -> AccessProvisioningResult {
        let started = Instant::now();
        let operation = Operation::Revoke;

        let outcome = match self.resolve(config) {
            Ok(adapter) => adapter.revoke_access(visitor, acs_reference_id).await,
            Err(e) => Err(e),
        };

        self.finish(config, operation, outcome, started)
    }

    #[tracing::instrument(
        name = "acs.test_connection",
        skip_all,
        fields(
            tenant_id = %config.tenant_id,
            config_id = %config.id,
            acs_type = %config.acs_type,
        )
    )]
    pub async fn test_connection(&self, config: &AcsConfiguration) -> ConnectionTestResult {
        let started = Instant::now();
        let vendor = config.acs_type.metric_label();

        let outcome = match self.resolve(config) {
            Ok(adapter) => adapter.test_connection().await,
            Err(e) => Err(e),
        };

        match &outcome {
            Ok(result) if !result.success => {
                self.evict(&config.tenant_id, &config.id);
            }
            Err(e) => self.evict_on_session_failure(config, e),
            Ok(_) => {}
        }

        let (result, label) = match outcome {
            Ok(result) if result.success => (result, "success"),
            Ok(result) => (result, "failure"),
            Err(e @ AcsError::UnsupportedProvider(_)) => {
                tracing::warn!(error = %e, "No adapter for ACS type");
                (ConnectionTestResult::failed(e.to_string()), "unsupported")
            }
            Err(e) => {
                tracing::warn!(error = %e, kind = e.kind(), "ACS connection test failed");
                (
                    ConnectionTestResult::failed(format!("Connection test failed: {}", e)),
                    "error",
                )
            }
        };

        record_operation(
            vendor,
            "test_connection",
            label,
            started.elapsed().as_secs_f64(),
        );
        result
    }

    fn resolve(&self, config: &AcsConfiguration) -> Result<Arc<dyn AcsAdapter>, AcsError> {
        let factory = self
            .registry
            .get(&config.acs_type)
            .ok_or_else(|| AcsError::UnsupportedProvider(config.acs_type.to_string()))?;

        if !config.is_active {
            tracing::debug!("Dispatching against an inactive ACS configuration");
        }

        match &self.cache {
            Some(cache) if factory.cacheable() => {
                cache.get_or_build(config, || factory.build(config))
            }
            _ => factory.build(config),
        }
    }

    fn finish(
        &self,
        config: &AcsConfiguration,
        operation: Operation,
        outcome: Result<AccessProvisioningResult, AcsError>,
        started: Instant,
    ) -> AccessProvisioningResult {
        if let Err(e) = &outcome {
            self.evict_on_session_failure(config, e);
        }

        let (result, label) = match outcome {
            Ok(result) => {
                let fallback = operation.empty_message(result.success);
                let label = if result.success { "success" } else { "failure" };
                (result.with_message_fallback(fallback), label)
            }
            Err(e) => {
                let label = match e {
                    AcsError::UnsupportedProvider(_) => "unsupported",
                    _ => "error",
                };
                tracing::warn!(
                    operation = operation.label(),
                    error = %e,
                    kind = e.kind(),
                    "ACS operation failed"
                );
                (failure_from(e, operation), label)
            }
        };

        record_operation(
            config.acs_type.metric_label(),
            operation.label(),
            label,
            started.elapsed().as_secs_f64(),
        );
        result
    }
}

fn failure_from(error: AcsError, operation: Operation) -> AccessProvisioningResult {
    match error {
        AcsError::UnsupportedProvider(_) => AccessProvisioningResult::failure(error.to_string()),
        AcsError::RevocationPrecondition => {
            AccessProvisioningResult::failure(error.to_string()).with_error_code(REVOCATION_ERROR)
        }
        other => AccessProvisioningResult::failure(format!(
            "{}: {}",
            operation.failure_prefix(),
            other
        ))
        .with_error_code(operation.error_code()),
    }
}
