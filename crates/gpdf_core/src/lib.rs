pub mod domain;
pub mod ports;

pub use domain::{ConversionResult, ExportFormat, QaAnswer, Session, SummaryResult, UsageSnapshot};
pub use ports::{BackendService, KeyValueStore, PortError, PortResult};
