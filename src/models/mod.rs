pub mod category;
pub mod endpoint;
pub mod parameter;
pub mod payload;
pub mod report;
pub mod scan;
pub mod severity;
pub mod test_result;
pub mod vulnerability;

pub use category::{VulnCategory, EXPLOIT_ORDER, PAYLOAD_PRIORITY};
pub use endpoint::{normalize_url, DiscoverySource, Endpoint};
pub use parameter::{ParamClass, ParamLocation, Parameter, Sensitivity};
pub use payload::{Encoding, Payload};
pub use report::*;
pub use scan::*;
pub use severity::Severity;
pub use test_result::TestResult;
pub use vulnerability::Vulnerability;
