use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use tracing::{error, info};
use traveler_core::report::ReportQueue;
use traveler_core::{CoreError, CoreResult};
use traveler_shared::ReportRequestedEvent;

#[derive(Clone)]
pub struct EventProducer {
    producer: FutureProducer,
    report_topic: String,
}

impl EventProducer {
    pub fn new(brokers: &str, report_topic: &str) -> Result<Self, rdkafka::error::KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()?;

        Ok(Self {
            producer,
            report_topic: report_topic.to_string(),
        })
    }

    pub async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<(), rdkafka::error::KafkaError> {
        let record = FutureRecord::to(topic)
            .key(key)
            .payload(payload);

        match self.producer.send(record, Timeout::After(Duration::from_secs(0))).await {
            Ok(delivery) => {
                info!(
                    "Sent message to {}/{}: partition {} offset {}",
                    topic, key, delivery.partition, delivery.offset
                );
                Ok(())
            }
            Err((e, _msg)) => {
                error!("Failed to send message to {}: {}", topic, e);
                Err(e)
            }
        }
    }
}

#[async_trait]
impl ReportQueue for EventProducer {
    async fn enqueue(&self, job: &ReportRequestedEvent) -> CoreResult<()> {
        let payload = job
            .encode()
            .map_err(|e| CoreError::Queue(format!("Failed to encode report job: {}", e)))?;

        self.publish(&self.report_topic, &job.job_id.to_string(), &payload)
            .await
            .map_err(|e| CoreError::Queue(e.to_string()))
    }
}
