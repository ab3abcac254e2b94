use std::sync::Arc;
use traveler_core::booking::BookingLedger;
use traveler_core::notify::Notifier;
use traveler_core::report::{ReportDispatcher, ReportQueue};
use traveler_core::repository::{BookingRepository, FlightRepository};
use traveler_store::app_config::BusinessRules;
use traveler_store::RedisClient;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct RateLimit {
    pub redis: Arc<RedisClient>,
    pub per_minute: i64,
}

#[derive(Clone)]
pub struct AppState {
    pub flights: Arc<dyn FlightRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub notifier: Arc<dyn Notifier>,
    pub reports: Arc<dyn ReportQueue>,
    pub rate_limit: Option<RateLimit>,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
}

impl AppState {
    pub fn ledger(&self) -> BookingLedger {
        BookingLedger::new(self.flights.clone(), self.bookings.clone(), self.notifier.clone())
    }

    pub fn report_dispatcher(&self) -> ReportDispatcher {
        ReportDispatcher::new(
            self.bookings.clone(),
            self.reports.clone(),
            self.business_rules.report_sync_limit,
        )
    }
}
