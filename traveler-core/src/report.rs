use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use traveler_shared::{Masked, ReportRequestedEvent};
use uuid::Uuid;

use crate::models::{BookingId, FlightId};
use crate::policy::Caller;
use crate::repository::BookingRepository;
use crate::search::DATE_FORMAT;
use crate::{CoreError, CoreResult};

/// Reports with more matches than this are built off the request path.
pub const REPORT_SYNC_LIMIT: usize = 10;

pub const PROCESSING_MESSAGE: &str =
    "Your request is processing, once your report is ready you will get an email notification!";

const MISSING_DATES: &str =
    "Start and End date are required! e.g?end_date=2019-06-22&start_date=2018-06-22";

#[derive(Debug, Default, Deserialize)]
pub struct ReportRequest {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportRequest {
    pub fn validate(self) -> CoreResult<ReportWindow> {
        let (start, end) = match (
            self.start_date.filter(|d| !d.is_empty()),
            self.end_date.filter(|d| !d.is_empty()),
        ) {
            (Some(start), Some(end)) => (start, end),
            _ => return Err(CoreError::Validation(MISSING_DATES.to_string())),
        };

        let start = parse_date("start_date", &start)?;
        let end = parse_date("end_date", &end)?;
        if start > end {
            return Err(CoreError::Validation("start_date must not be after end_date".to_string()));
        }

        Ok(ReportWindow { start, end })
    }
}

fn parse_date(field: &str, value: &str) -> CoreResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| CoreError::Validation(format!("{} format is invalid: Format Y-m-d", field)))
}

impl ReportWindow {
    /// From the first instant of `start` to the last instant of `end`.
    pub fn bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let from = self.start.and_time(NaiveTime::MIN).and_utc();
        let to = (self.end + Duration::days(1)).and_time(NaiveTime::MIN).and_utc()
            - Duration::microseconds(1);
        (from, to)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportRow {
    pub booking_id: BookingId,
    pub flight_id: FlightId,
    pub from_location: String,
    pub to_location: String,
    pub departure_time: DateTime<Utc>,
    pub user_email: Masked<String>,
    pub booked_at: DateTime<Utc>,
}

pub fn render_csv(rows: &[ReportRow]) -> String {
    let mut out = String::from("booking_id,flight_id,from_location,to_location,departure_time,user_email,booked_at\n");
    for row in rows {
        out.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            row.booking_id,
            row.flight_id,
            csv_field(&row.from_location),
            csv_field(&row.to_location),
            row.departure_time.to_rfc3339(),
            csv_field(&row.user_email.0),
            row.booked_at.to_rfc3339(),
        ));
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Hand-off point to the background report worker.
#[async_trait]
pub trait ReportQueue: Send + Sync {
    /// Returns once the job is accepted by the queue, not when it completes.
    async fn enqueue(&self, job: &ReportRequestedEvent) -> CoreResult<()>;
}

#[derive(Debug, PartialEq)]
pub enum ReportOutcome {
    Ready(Vec<ReportRow>),
    Deferred { job_id: Uuid, matched: usize },
}

pub struct ReportDispatcher {
    bookings: Arc<dyn BookingRepository>,
    queue: Arc<dyn ReportQueue>,
    sync_limit: usize,
}

impl ReportDispatcher {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        queue: Arc<dyn ReportQueue>,
        sync_limit: usize,
    ) -> Self {
        Self { bookings, queue, sync_limit }
    }

    pub async fn dispatch(&self, caller: &Caller, request: ReportRequest) -> CoreResult<ReportOutcome> {
        let window = request.validate()?;
        let (from, to) = window.bounds();
        let scope = caller.booking_scope();

        // One row past the limit is enough to know the report must be deferred.
        let rows = self
            .bookings
            .report_rows(scope, from, to, self.sync_limit.saturating_add(1))
            .await?;
        if rows.len() <= self.sync_limit {
            return Ok(ReportOutcome::Ready(rows));
        }

        let booking_ids = self.bookings.report_booking_ids(scope, from, to).await?;
        let matched = booking_ids.len();

        let job = ReportRequestedEvent {
            job_id: Uuid::new_v4(),
            start_date: window.start,
            end_date: window.end,
            requested_by: caller.user_id,
            requester_email: caller.email.clone(),
            booking_ids,
            requested_at: Utc::now().timestamp(),
        };
        self.queue.enqueue(&job).await?;

        info!(
            job_id = %job.job_id,
            matched,
            requested_by = %caller.user_id,
            "Report deferred to background worker"
        );

        Ok(ReportOutcome::Deferred {
            job_id: job.job_id,
            matched,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Booking, Flight};
    use crate::policy::{BookingScope, Role};
    use chrono::TimeZone;
    use tokio::sync::Mutex;

    struct FixedBookings {
        rows: Vec<ReportRow>,
        scopes: std::sync::Mutex<Vec<BookingScope>>,
        largest_fetch: std::sync::Mutex<usize>,
    }

    impl FixedBookings {
        fn new(rows: Vec<ReportRow>) -> Self {
            Self {
                rows,
                scopes: Default::default(),
                largest_fetch: Default::default(),
            }
        }

        fn in_window(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> impl Iterator<Item = &ReportRow> {
            self.rows.iter().filter(move |r| r.booked_at >= from && r.booked_at <= to)
        }
    }

    #[async_trait]
    impl BookingRepository for FixedBookings {
        async fn insert_booking(&self, _: &Flight, _: &Caller) -> CoreResult<Option<Booking>> {
            Ok(None)
        }

        async fn list_bookings(&self, _: BookingScope) -> CoreResult<Vec<Booking>> {
            Ok(vec![])
        }

        async fn report_rows(
            &self,
            scope: BookingScope,
            from: DateTime<Utc>,
            to: DateTime<Utc>,
            limit: usize,
        ) -> CoreResult<Vec<ReportRow>> {
            self.scopes.lock().unwrap().push(scope);
            let rows: Vec<ReportRow> = self.in_window(from, to).take(limit).cloned().collect();
            let mut largest = self.largest_fetch.lock().unwrap();
            *largest = (*largest).max(rows.len());
            Ok(rows)
        }

        async fn report_booking_ids(
            &self,
            scope: BookingScope,
            from: DateTime<Utc>,
            to: DateTime<Utc>,
        ) -> CoreResult<Vec<BookingId>> {
            self.scopes.lock().unwrap().push(scope);
            Ok(self.in_window(from, to).map(|r| r.booking_id).collect())
        }

        async fn report_rows_by_ids(&self, _: &[BookingId]) -> CoreResult<Vec<ReportRow>> {
            Ok(vec![])
        }

        async fn departing_between(&self, _: DateTime<Utc>, _: DateTime<Utc>) -> CoreResult<Vec<ReportRow>> {
            Ok(vec![])
        }
    }

    #[derive(Default)]
    struct RecordingQueue {
        jobs: Mutex<Vec<ReportRequestedEvent>>,
    }

    #[async_trait]
    impl ReportQueue for RecordingQueue {
        async fn enqueue(&self, job: &ReportRequestedEvent) -> CoreResult<()> {
            self.jobs.lock().await.push(job.clone());
            Ok(())
        }
    }

    fn rows(count: usize) -> Vec<ReportRow> {
        (0..count)
            .map(|i| ReportRow {
                booking_id: i as i64 + 1,
                flight_id: 7,
                from_location: "Lagos".to_string(),
                to_location: "Nairobi".to_string(),
                departure_time: Utc.with_ymd_and_hms(2019, 7, 1, 8, 0, 0).unwrap(),
                user_email: Masked(format!("user{}@example.com", i)),
                booked_at: Utc.with_ymd_and_hms(2019, 6, 10, 12, 0, 0).unwrap(),
            })
            .collect()
    }

    fn admin() -> Caller {
        Caller {
            user_id: Uuid::new_v4(),
            email: "admin@example.com".to_string(),
            role: Role::Admin,
        }
    }

    fn june() -> ReportRequest {
        ReportRequest {
            start_date: Some("2019-06-01".to_string()),
            end_date: Some("2019-06-30".to_string()),
        }
    }

    #[test]
    fn test_missing_dates_rejected() {
        let only_start = ReportRequest { start_date: Some("2019-06-01".to_string()), end_date: None };
        match only_start.validate() {
            Err(CoreError::Validation(msg)) => assert_eq!(msg, MISSING_DATES),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(ReportRequest::default().validate(), Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_bad_or_reversed_dates_rejected() {
        let bad = ReportRequest { start_date: Some("22-06-2019".to_string()), end_date: Some("2019-06-30".to_string()) };
        assert!(matches!(bad.validate(), Err(CoreError::Validation(_))));

        let reversed = ReportRequest { start_date: Some("2019-07-01".to_string()), end_date: Some("2019-06-01".to_string()) };
        assert!(matches!(reversed.validate(), Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_window_covers_whole_end_day() {
        let (from, to) = june().validate().unwrap().bounds();
        assert_eq!(from, Utc.with_ymd_and_hms(2019, 6, 1, 0, 0, 0).unwrap());
        assert!(to > Utc.with_ymd_and_hms(2019, 6, 30, 23, 59, 59).unwrap());
        assert!(to < Utc.with_ymd_and_hms(2019, 7, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_csv_quotes_awkward_fields() {
        let mut row = rows(1).remove(0);
        row.from_location = "Lagos, NG".to_string();
        let csv = render_csv(&[row]);
        assert!(csv.starts_with("booking_id,"));
        assert!(csv.contains("\"Lagos, NG\""));
        assert_eq!(csv.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_ten_rows_returned_inline() {
        let queue = Arc::new(RecordingQueue::default());
        let dispatcher = ReportDispatcher::new(
            Arc::new(FixedBookings::new(rows(10))),
            queue.clone(),
            REPORT_SYNC_LIMIT,
        );

        match dispatcher.dispatch(&admin(), june()).await.unwrap() {
            ReportOutcome::Ready(rows) => assert_eq!(rows.len(), 10),
            other => panic!("expected inline report, got {:?}", other),
        }
        assert!(queue.jobs.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_eleven_rows_deferred() {
        let queue = Arc::new(RecordingQueue::default());
        let bookings = Arc::new(FixedBookings::new(rows(11)));
        let dispatcher = ReportDispatcher::new(bookings.clone(), queue.clone(), REPORT_SYNC_LIMIT);
        let caller = admin();

        let outcome = dispatcher.dispatch(&caller, june()).await.unwrap();
        let job_id = match outcome {
            ReportOutcome::Deferred { job_id, matched } => {
                assert_eq!(matched, 11);
                job_id
            }
            other => panic!("expected deferral, got {:?}", other),
        };

        let jobs = queue.jobs.lock().await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].job_id, job_id);
        assert_eq!(jobs[0].requested_by, caller.user_id);
        assert_eq!(jobs[0].requester_email, caller.email);
        assert_eq!(jobs[0].booking_ids, (1..=11).collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn test_rows_outside_window_not_counted() {
        let mut all = rows(11);
        all[0].booked_at = Utc.with_ymd_and_hms(2019, 5, 31, 23, 59, 59).unwrap();
        let dispatcher = ReportDispatcher::new(
            Arc::new(FixedBookings::new(all)),
            Arc::new(RecordingQueue::default()),
            REPORT_SYNC_LIMIT,
        );

        assert!(matches!(
            dispatcher.dispatch(&admin(), june()).await.unwrap(),
            ReportOutcome::Ready(rows) if rows.len() == 10
        ));
    }

    #[tokio::test]
    async fn test_large_report_never_loaded_on_request_path() {
        let bookings = Arc::new(FixedBookings::new(rows(500)));
        let queue = Arc::new(RecordingQueue::default());
        let dispatcher = ReportDispatcher::new(bookings.clone(), queue.clone(), REPORT_SYNC_LIMIT);

        let outcome = dispatcher.dispatch(&admin(), june()).await.unwrap();

        assert!(matches!(outcome, ReportOutcome::Deferred { matched: 500, .. }));
        assert_eq!(*bookings.largest_fetch.lock().unwrap(), REPORT_SYNC_LIMIT + 1);
        assert_eq!(queue.jobs.lock().await[0].booking_ids.len(), 500);
    }

    #[tokio::test]
    async fn test_owner_report_is_scoped_to_own_bookings() {
        let bookings = Arc::new(FixedBookings::new(rows(3)));
        let dispatcher = ReportDispatcher::new(
            bookings.clone(),
            Arc::new(RecordingQueue::default()),
            REPORT_SYNC_LIMIT,
        );
        let owner = Caller {
            user_id: Uuid::new_v4(),
            email: "owner@example.com".to_string(),
            role: Role::Owner,
        };

        dispatcher.dispatch(&owner, june()).await.unwrap();
        dispatcher.dispatch(&admin(), june()).await.unwrap();

        assert_eq!(
            *bookings.scopes.lock().unwrap(),
            vec![BookingScope::Own(owner.user_id), BookingScope::All]
        );
    }
}
