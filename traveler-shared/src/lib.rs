pub mod models;
pub mod pii;

pub use models::events::{ReportRequestedEvent, REPORT_REQUESTED_TOPIC};
pub use pii::Masked;
