pub mod configuration;
pub mod result;
pub mod visitor;

pub use configuration::{
    AcsConfiguration, AcsCredentials, AcsType, CcureCredentials, RestCredentials,
};
pub use result::{AccessProvisioningResult, ConnectionTestResult};
pub use visitor::{CivPivCardInfo, VisitorData};
