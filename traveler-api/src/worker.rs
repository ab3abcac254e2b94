use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{error, info, warn};
use traveler_core::notify::Notifier;
use traveler_core::report::ReportWindow;
use traveler_core::repository::BookingRepository;
use traveler_core::CoreResult;
use traveler_shared::{Masked, ReportRequestedEvent};

// ============================================================================
// Report jobs
// ============================================================================

/// Loads the bookings captured at request time and mails the finished report.
/// Returns the number of rows delivered.
pub async fn process_report_job(
    job: &ReportRequestedEvent,
    bookings: &dyn BookingRepository,
    notifier: &dyn Notifier,
) -> CoreResult<usize> {
    let rows = bookings.report_rows_by_ids(&job.booking_ids).await?;
    let window = ReportWindow {
        start: job.start_date,
        end: job.end_date,
    };

    notifier.report_ready(&job.requester_email, &window, &rows).await?;

    info!(
        job_id = %job.job_id,
        rows = rows.len(),
        recipient = %Masked(job.requester_email.as_str()),
        "Report delivered"
    );
    Ok(rows.len())
}

/// Drains the in-process queue. Jobs run independently of each other.
pub async fn run_local_report_worker(
    mut rx: mpsc::Receiver<ReportRequestedEvent>,
    bookings: Arc<dyn BookingRepository>,
    notifier: Arc<dyn Notifier>,
) {
    info!("Report worker started");

    while let Some(job) = rx.recv().await {
        let bookings = bookings.clone();
        let notifier = notifier.clone();
        tokio::spawn(async move {
            if let Err(e) = process_report_job(&job, bookings.as_ref(), notifier.as_ref()).await {
                error!(job_id = %job.job_id, "Report job failed: {}", e);
            }
        });
    }

    info!("Report queue closed, worker stopping");
}

#[cfg(feature = "kafka")]
pub async fn start_report_consumer(
    brokers: String,
    group_id: String,
    topic: String,
    bookings: Arc<dyn BookingRepository>,
    notifier: Arc<dyn Notifier>,
) -> Result<(), rdkafka::error::KafkaError> {
    use rdkafka::config::ClientConfig;
    use rdkafka::consumer::{Consumer, StreamConsumer};
    use rdkafka::message::Message;

    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", &brokers)
        .set("group.id", &group_id)
        .set("enable.auto.commit", "true")
        .set("auto.offset.reset", "earliest")
        .create()?;

    consumer.subscribe(&[topic.as_str()])?;

    info!("Report consumer started, listening on {}...", topic);

    loop {
        match consumer.recv().await {
            Err(e) => error!("Kafka error: {}", e),
            Ok(m) => match m.payload_view::<str>() {
                Some(Ok(payload)) => match ReportRequestedEvent::decode(payload) {
                    Ok(job) => {
                        if let Err(e) = process_report_job(&job, bookings.as_ref(), notifier.as_ref()).await {
                            error!(job_id = %job.job_id, "Report job failed: {}", e);
                        }
                    }
                    Err(e) => error!("Malformed report job: {}", e),
                },
                Some(Err(e)) => error!("Error reading payload: {}", e),
                None => warn!("Empty report job message"),
            },
        }
    }
}

// ============================================================================
// Departure reminders
// ============================================================================

/// Emails every passenger whose flight leaves within `lead` of `now`.
/// A failed email is logged and skipped; the count covers successful sends.
pub async fn send_departure_reminders(
    bookings: &dyn BookingRepository,
    notifier: &dyn Notifier,
    now: DateTime<Utc>,
    lead: Duration,
) -> CoreResult<usize> {
    let rows = bookings.departing_between(now, now + lead).await?;
    let mut sent = 0;

    for row in &rows {
        match notifier.departure_reminder(row).await {
            Ok(()) => sent += 1,
            Err(e) => warn!(
                booking_id = row.booking_id,
                recipient = %row.user_email,
                "Failed to send departure reminder: {}",
                e
            ),
        }
    }

    info!(due = rows.len(), sent, "Departure reminders processed");
    Ok(sent)
}

/// One full period after startup, so a restart does not resend the same reminders.
fn first_reminder_run(started: Instant, every: std::time::Duration) -> Instant {
    started + every
}

pub async fn start_reminder_worker(
    bookings: Arc<dyn BookingRepository>,
    notifier: Arc<dyn Notifier>,
    every: std::time::Duration,
    lead: Duration,
) {
    let mut ticker = tokio::time::interval_at(first_reminder_run(Instant::now(), every), every);
    info!("Reminder worker started, running every {:?}", every);

    loop {
        ticker.tick().await;
        if let Err(e) = send_departure_reminders(bookings.as_ref(), notifier.as_ref(), Utc::now(), lead).await {
            error!("Reminder run failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone};
    use std::sync::Mutex;
    use traveler_core::models::{Booking, Flight, NewFlight};
    use traveler_core::report::ReportRow;
    use traveler_core::repository::FlightRepository;
    use traveler_core::{Caller, CoreError, Role};
    use traveler_store::MemoryStore;
    use uuid::Uuid;

    #[derive(Default)]
    struct RecordingNotifier {
        reports: Mutex<Vec<(String, usize)>>,
        reminders: Mutex<Vec<i64>>,
        fail_for: Option<String>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn booking_confirmed(&self, _: &Booking, _: &Flight) -> CoreResult<()> {
            Ok(())
        }

        async fn report_ready(&self, recipient: &str, _: &ReportWindow, rows: &[ReportRow]) -> CoreResult<()> {
            self.reports.lock().unwrap().push((recipient.to_string(), rows.len()));
            Ok(())
        }

        async fn departure_reminder(&self, row: &ReportRow) -> CoreResult<()> {
            if self.fail_for.as_deref() == Some(row.user_email.0.as_str()) {
                return Err(CoreError::Notification("mailbox full".to_string()));
            }
            self.reminders.lock().unwrap().push(row.booking_id);
            Ok(())
        }
    }

    fn caller(email: &str) -> Caller {
        Caller {
            user_id: Uuid::new_v4(),
            email: email.to_string(),
            role: Role::Owner,
        }
    }

    async fn flight_at(store: &MemoryStore, to: &str, departure: DateTime<Utc>) -> Flight {
        store
            .create_flight(&NewFlight {
                from_location: "Lagos".to_string(),
                to_location: to.to_string(),
                departure_time: departure,
                capacity: 100,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_first_reminder_run_waits_a_full_period() {
        let started = Instant::now();
        let every = std::time::Duration::from_secs(86_400);
        assert_eq!(first_reminder_run(started, every) - started, every);
        assert!(first_reminder_run(started, every) > Instant::now());
    }

    #[tokio::test]
    async fn test_report_job_mails_captured_bookings() {
        let store = MemoryStore::new();
        let departure = Utc.with_ymd_and_hms(2019, 6, 25, 9, 0, 0).unwrap();
        let flight = flight_at(&store, "Abuja", departure).await;
        let mut ids = Vec::new();
        for i in 0..3 {
            let booking = store
                .insert_booking(&flight, &caller(&format!("user{}@example.com", i)))
                .await
                .unwrap()
                .unwrap();
            ids.push(booking.id);
        }

        let job = ReportRequestedEvent {
            job_id: Uuid::new_v4(),
            start_date: NaiveDate::from_ymd_opt(2019, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2019, 6, 30).unwrap(),
            requested_by: Uuid::new_v4(),
            requester_email: "admin@example.com".to_string(),
            booking_ids: ids[..2].to_vec(),
            requested_at: 0,
        };

        let notifier = RecordingNotifier::default();
        let delivered = process_report_job(&job, &store, &notifier).await.unwrap();

        assert_eq!(delivered, 2);
        assert_eq!(
            *notifier.reports.lock().unwrap(),
            vec![("admin@example.com".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn test_reminders_only_for_flights_within_lead() {
        let store = MemoryStore::new();
        let now = Utc.with_ymd_and_hms(2019, 6, 22, 8, 0, 0).unwrap();
        let tomorrow = flight_at(&store, "Abuja", now + Duration::hours(20)).await;
        let next_week = flight_at(&store, "Kano", now + Duration::days(7)).await;

        let due = store.insert_booking(&tomorrow, &caller("a@example.com")).await.unwrap().unwrap();
        store.insert_booking(&next_week, &caller("b@example.com")).await.unwrap().unwrap();

        let notifier = RecordingNotifier::default();
        let sent = send_departure_reminders(&store, &notifier, now, Duration::hours(24)).await.unwrap();

        assert_eq!(sent, 1);
        assert_eq!(*notifier.reminders.lock().unwrap(), vec![due.id]);
    }

    #[tokio::test]
    async fn test_failed_reminder_does_not_stop_the_run() {
        let store = MemoryStore::new();
        let now = Utc.with_ymd_and_hms(2019, 6, 22, 8, 0, 0).unwrap();
        let flight = flight_at(&store, "Abuja", now + Duration::hours(3)).await;
        store.insert_booking(&flight, &caller("full@example.com")).await.unwrap().unwrap();
        let ok = store.insert_booking(&flight, &caller("ok@example.com")).await.unwrap().unwrap();

        let notifier = RecordingNotifier {
            fail_for: Some("full@example.com".to_string()),
            ..Default::default()
        };
        let sent = send_departure_reminders(&store, &notifier, now, Duration::hours(24)).await.unwrap();

        assert_eq!(sent, 1);
        assert_eq!(*notifier.reminders.lock().unwrap(), vec![ok.id]);
    }

    #[tokio::test]
    async fn test_local_worker_processes_queued_jobs() {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let (tx, rx) = mpsc::channel(4);

        let worker = tokio::spawn(run_local_report_worker(rx, store.clone(), notifier.clone()));
        tx.send(ReportRequestedEvent {
            job_id: Uuid::new_v4(),
            start_date: NaiveDate::from_ymd_opt(2019, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2019, 6, 30).unwrap(),
            requested_by: Uuid::new_v4(),
            requester_email: "admin@example.com".to_string(),
            booking_ids: vec![],
            requested_at: 0,
        })
        .await
        .unwrap();
        drop(tx);
        worker.await.unwrap();

        for _ in 0..50 {
            if !notifier.reports.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(notifier.reports.lock().unwrap().len(), 1);
    }
}
