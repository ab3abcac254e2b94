use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: Option<RedisConfig>,
    pub kafka: Option<KafkaConfig>,
    pub auth: AuthConfig,
    pub mail: Option<MailConfig>,
    #[serde(default)]
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    #[serde(default = "default_report_sync_limit")]
    pub report_sync_limit: usize,
    #[serde(default = "default_reminder_interval")]
    pub reminder_interval_seconds: u64,
    #[serde(default = "default_reminder_lead")]
    pub reminder_lead_hours: i64,
}

fn default_report_sync_limit() -> usize { traveler_core::report::REPORT_SYNC_LIMIT }
fn default_reminder_interval() -> u64 { 86_400 }
fn default_reminder_lead() -> i64 { 24 }

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            report_sync_limit: default_report_sync_limit(),
            reminder_interval_seconds: default_reminder_interval(),
            reminder_lead_hours: default_reminder_lead(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: i64,
}

fn default_rate_limit() -> i64 { 100 }

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    #[serde(default = "default_report_topic")]
    pub report_topic: String,
    #[serde(default = "default_group_id")]
    pub group_id: String,
}

fn default_report_topic() -> String { traveler_shared::REPORT_REQUESTED_TOPIC.to_string() }
fn default_group_id() -> String { "traveler-report-worker".to_string() }

#[derive(Debug, Deserialize, Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_email: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
}

fn default_smtp_port() -> u16 { 587 }
fn default_from_name() -> String { "Traveler".to_string() }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Untracked local overrides
            .add_source(config::File::with_name("config/local").required(false))
            // Eg.. `TRAVELER_AUTH__JWT_SECRET=...` sets `auth.jwt_secret`
            .add_source(config::Environment::with_prefix("TRAVELER").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_fills_defaults() {
        let s = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [server]
                port = 8000

                [database]
                url = "postgres://localhost/traveler"

                [auth]
                jwt_secret = "secret"
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();

        let config: Config = s.try_deserialize().unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.database.max_connections, 5);
        assert!(config.redis.is_none());
        assert!(config.kafka.is_none());
        assert!(config.mail.is_none());
        assert_eq!(config.business_rules.report_sync_limit, 10);
        assert_eq!(config.business_rules.reminder_lead_hours, 24);
    }

    #[test]
    fn test_optional_sections() {
        let s = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [server]
                port = 8000

                [database]
                url = "postgres://localhost/traveler"

                [auth]
                jwt_secret = "secret"

                [kafka]
                brokers = "localhost:9092"

                [business_rules]
                report_sync_limit = 25
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();

        let config: Config = s.try_deserialize().unwrap();
        let kafka = config.kafka.unwrap();
        assert_eq!(kafka.report_topic, "report.requested");
        assert_eq!(kafka.group_id, "traveler-report-worker");
        assert_eq!(config.business_rules.report_sync_limit, 25);
        assert_eq!(config.business_rules.reminder_interval_seconds, 86_400);
    }
}
