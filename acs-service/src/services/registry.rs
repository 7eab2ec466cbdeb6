//! Maps each ACS type to the factory that builds its adapter.

use crate::models::{AcsConfiguration, AcsType};
use crate::services::adapters::{
    AcsAdapter, CcureAdapter, CustomRestAdapter, SimulatedAdapter, SimulatedVendor,
    SimulationPolicy,
};
use crate::services::clock::Clock;
use crate::services::error::AcsError;
use crate::services::transport::HttpTransport;
use std::collections::HashMap;
use std::sync::Arc;

/// Builds an adapter for one configuration.
pub trait AdapterFactory: Send + Sync {
    fn build(&self, config: &AcsConfiguration) -> Result<Arc<dyn AcsAdapter>, AcsError>;

    /// Whether built adapters hold state worth reusing across calls.
    fn cacheable(&self) -> bool {
        false
    }
}

/// Shared collaborators handed to every built-in factory.
#[derive(Clone)]
pub struct AdapterDependencies {
    pub transport: Arc<dyn HttpTransport>,
    pub clock: Arc<dyn Clock>,
    pub simulation: SimulationPolicy,
    pub session_ttl: chrono::Duration,
}

pub struct SimulatedFactory {
    vendor: SimulatedVendor,
    policy: SimulationPolicy,
    clock: Arc<dyn Clock>,
}

impl SimulatedFactory {
    pub fn new(vendor: SimulatedVendor, policy: SimulationPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            vendor,
            policy,
            clock,
        }
    }
}

impl AdapterFactory for SimulatedFactory {
    fn build(&self, _config: &AcsConfiguration) -> Result<Arc<dyn AcsAdapter>, AcsError> {
        Ok(Arc::new(SimulatedAdapter::new(
            self.vendor,
            self.policy,
            self.clock.clone(),
        )))
    }
}

pub struct CustomRestFactory {
    transport: Arc<dyn HttpTransport>,
    clock: Arc<dyn Clock>,
}

impl CustomRestFactory {
    pub fn new(transport: Arc<dyn HttpTransport>, clock: Arc<dyn Clock>) -> Self {
        Self { transport, clock }
    }
}

impl AdapterFactory for CustomRestFactory {
    fn build(&self, config: &AcsConfiguration) -> Result<Arc<dyn AcsAdapter>, AcsError> {
        Ok(Arc::new(CustomRestAdapter::new(
            config,
            self.transport.clone(),
            self.clock.clone(),
        )?))
    }
}

pub struct CcureFactory {
    transport: Arc<dyn HttpTransport>,
    clock: Arc<dyn Clock>,
    session_ttl: chrono::Duration,
}

impl CcureFactory {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
        session_ttl: chrono::Duration,
    ) -> Self {
        Self {
            transport,
            clock,
            session_ttl,
        }
    }
}

impl AdapterFactory for CcureFactory {
    fn build(&self, config: &AcsConfiguration) -> Result<Arc<dyn AcsAdapter>, AcsError> {
        let adapter = CcureAdapter::new(config, self.transport.clone(), self.clock.clone())?
            .with_session_ttl(self.session_ttl);
        Ok(Arc::new(adapter))
    }

    // Reusing the adapter keeps its login session alive between calls.
    fn cacheable(&self) -> bool {
        true
    }
}

#[derive(Default)]
pub struct AdapterRegistry {
    factories: HashMap<AcsType, Arc<dyn AdapterFactory>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in vendor.
    pub fn with_defaults(deps: AdapterDependencies) -> Self {
        let mut registry = Self::new();
        registry.register(
            AcsType::Lenel,
            SimulatedFactory::new(SimulatedVendor::LENEL, deps.simulation, deps.clock.clone()),
        );
        registry.register(
            AcsType::S2Security,
            SimulatedFactory::new(
                SimulatedVendor::S2_SECURITY,
                deps.simulation,
                deps.clock.clone(),
            ),
        );
        registry.register(
            AcsType::Custom,
            CustomRestFactory::new(deps.transport.clone(), deps.clock.clone()),
        );
        registry.register(
            AcsType::Ccure9000,
            CcureFactory::new(deps.transport, deps.clock, deps.session_ttl),
        );
        registry
    }

    /// Register a factory, replacing any existing one for the type.
    pub fn register(&mut self, acs_type: AcsType, factory: impl AdapterFactory + 'static) {
        self.factories.insert(acs_type, Arc::new(factory));
    }

    pub fn get(&self, acs_type: &AcsType) -> Option<Arc<dyn AdapterFactory>> {
        self.factories.get(acs_type).cloned()
    }

    pub fn supported_types(&self) -> Vec<AcsType> {
        let mut types: Vec<_> = self.factories.keys().cloned().collect();
        types.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        types
    }
}
