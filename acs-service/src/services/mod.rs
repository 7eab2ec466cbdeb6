pub mod adapter_cache;
pub mod adapters;
pub mod clock;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod transport;

pub use adapters::{
    AcsAdapter, CcureAdapter, CustomRestAdapter, SessionState, SimulatedAdapter,
    SimulatedVendor, SimulationPolicy,
};
pub use adapter_cache::{AdapterCache, AdapterCacheSettings};
pub use clock::{Clock, ManualClock, SystemClock};
pub use dispatcher::{AcsDispatcher, PROVISIONING_ERROR, REVOCATION_ERROR};
pub use error::AcsError;
pub use metrics::{get_metrics, init_metrics};
pub use registry::{AdapterDependencies, AdapterFactory, AdapterRegistry};
pub use transport::{HttpTransport, MockTransport, ReqwestTransport};
