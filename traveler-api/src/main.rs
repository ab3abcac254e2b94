use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use traveler_api::{
    app,
    state::{AppState, AuthConfig, RateLimit},
    worker,
};
use traveler_core::notify::Notifier;
use traveler_core::report::ReportQueue;
use traveler_core::repository::{BookingRepository, FlightRepository};
use traveler_store::app_config::Config;
use traveler_store::queue::LOCAL_QUEUE_CAPACITY;
use traveler_store::{
    ConsoleMailer, DbClient, LocalReportQueue, PostgresBookingRepository, PostgresFlightRepository,
    RedisClient, SmtpMailer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "traveler_api=debug,traveler_store=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Traveler API on port {}", config.server.port);

    // Database Connection
    let db = DbClient::new(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;

    let flights: Arc<dyn FlightRepository> = Arc::new(PostgresFlightRepository::new(db.pool.clone()));
    let bookings: Arc<dyn BookingRepository> = Arc::new(PostgresBookingRepository::new(db.pool.clone()));

    // Mail
    let notifier: Arc<dyn Notifier> = match &config.mail {
        Some(mail) => Arc::new(SmtpMailer::new(mail).context("Failed to configure SMTP")?),
        None => {
            tracing::warn!("No [mail] section configured, emails will be logged only");
            Arc::new(ConsoleMailer::new())
        }
    };

    let reports = report_queue(&config, bookings.clone(), notifier.clone())?;

    // Redis Connection (rate limiting)
    let rate_limit = match &config.redis {
        Some(redis) => Some(RateLimit {
            redis: Arc::new(RedisClient::new(&redis.url).context("Invalid Redis URL")?),
            per_minute: redis.rate_limit_per_minute,
        }),
        None => None,
    };

    let rules = config.business_rules.clone();
    tokio::spawn(worker::start_reminder_worker(
        bookings.clone(),
        notifier.clone(),
        std::time::Duration::from_secs(rules.reminder_interval_seconds.max(1)),
        chrono::Duration::hours(rules.reminder_lead_hours),
    ));

    let app_state = AppState {
        flights,
        bookings,
        notifier,
        reports,
        rate_limit,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
        },
        business_rules: rules,
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Kafka when built with the `kafka` feature and configured, otherwise an in-process queue.
fn report_queue(
    config: &Config,
    bookings: Arc<dyn BookingRepository>,
    notifier: Arc<dyn Notifier>,
) -> anyhow::Result<Arc<dyn ReportQueue>> {
    if let Some(queue) = kafka_queue(config, bookings.clone(), notifier.clone())? {
        return Ok(queue);
    }

    let (queue, rx) = LocalReportQueue::new(LOCAL_QUEUE_CAPACITY);
    tokio::spawn(worker::run_local_report_worker(rx, bookings, notifier));
    Ok(Arc::new(queue))
}

#[cfg(feature = "kafka")]
fn kafka_queue(
    config: &Config,
    bookings: Arc<dyn BookingRepository>,
    notifier: Arc<dyn Notifier>,
) -> anyhow::Result<Option<Arc<dyn ReportQueue>>> {
    let Some(kafka) = &config.kafka else {
        return Ok(None);
    };

    let producer = traveler_store::EventProducer::new(&kafka.brokers, &kafka.report_topic)
        .context("Failed to create Kafka producer")?;

    let (brokers, group_id, topic) = (kafka.brokers.clone(), kafka.group_id.clone(), kafka.report_topic.clone());
    tokio::spawn(async move {
        if let Err(e) = worker::start_report_consumer(brokers, group_id, topic, bookings, notifier).await {
            tracing::error!("Report consumer stopped: {}", e);
        }
    });

    Ok(Some(Arc::new(producer)))
}

#[cfg(not(feature = "kafka"))]
fn kafka_queue(
    config: &Config,
    _bookings: Arc<dyn BookingRepository>,
    _notifier: Arc<dyn Notifier>,
) -> anyhow::Result<Option<Arc<dyn ReportQueue>>> {
    if config.kafka.is_some() {
        tracing::warn!("Kafka is configured but this build lacks the kafka feature, using the local queue");
    }
    Ok(None)
}
