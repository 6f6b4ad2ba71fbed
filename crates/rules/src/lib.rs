mod catalog;
mod matcher;
mod rule;
mod types;

pub use catalog::RuleCatalog;
pub use matcher::{evaluate, rule_matches};
pub use rule::Rule;
pub use types::{ActionVerb, Decision, EventCode, HostEvent, TelemetryRecord};
