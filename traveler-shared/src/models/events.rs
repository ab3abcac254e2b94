use chrono::NaiveDate;
use uuid::Uuid;

pub const REPORT_REQUESTED_TOPIC: &str = "report.requested";

/// Payload handed to the report worker when a report is too large to build inline.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct ReportRequestedEvent {
    pub job_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub requested_by: Uuid,
    pub requester_email: String,
    pub booking_ids: Vec<i64>,
    pub requested_at: i64,
}

impl ReportRequestedEvent {
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn decode(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }
}
