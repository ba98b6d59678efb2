//! Broker Consumer Worker (BCW): subscribes to the inbound topic and feeds
//! every received payload into the inbound queue.
//!
//! Initialization failures (bad bootstrap servers, subscribe failure) are
//! logged and end the thread; they never crash the process — the
//! WebSocket side keeps serving already-connected clients even if the
//! broker side never came up. Transient poll errors (partition EOF, poll
//! timeout) are expected noise during normal operation and are not logged
//! above `trace!`.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{error, info, trace, warn};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{BaseConsumer, Consumer};
use rdkafka::error::KafkaError;
use rdkafka::message::Message;
use rdkafka::types::RDKafkaErrorCode;

use crate::config::Config;
use crate::queue::BoundedQueue;
use crate::shutdown;

pub fn spawn_consumer(config: &Config, inbound: Arc<BoundedQueue>) -> JoinHandle<()> {
    let brokers = config.kafka_brokers.clone();
    let group_id = config.kafka_group_id.clone();
    let topic = config.kafka_consumer_topic.clone();
    let poll_timeout = Duration::from_millis(config.kafka_poll_timeout_ms);

    thread::spawn(move || {
        let consumer: BaseConsumer = match ClientConfig::new()
            .set("bootstrap.servers", &brokers)
            .set("group.id", &group_id)
            .set("enable.auto.commit", "true")
            .set("auto.offset.reset", "latest")
            .create()
        {
            Ok(consumer) => consumer,
            Err(err) => {
                error!("failed to create Kafka consumer: {err}");
                return;
            }
        };

        if let Err(err) = consumer.subscribe(&[topic.as_str()]) {
            error!("failed to subscribe to topic {topic}: {err}");
            return;
        }

        info!("Kafka consumer started for topic {topic}");

        while !shutdown::is_shutdown() {
            match consumer.poll(poll_timeout) {
                None => continue,
                Some(Err(KafkaError::MessageConsumption(RDKafkaErrorCode::PartitionEOF))) => {
                    trace!("partition EOF");
                }
                Some(Err(KafkaError::MessageConsumption(RDKafkaErrorCode::RequestTimedOut))) => {
                    trace!("poll timed out");
                }
                Some(Err(err)) => {
                    warn!("Kafka consumer error: {err}");
                }
                Some(Ok(message)) => {
                    if let Some(payload) = message.payload() {
                        if !payload.is_empty() && !inbound.push(payload.to_vec()) {
                            warn!("dropping inbound message; queue closed during shutdown");
                        }
                    }
                }
            }
        }

        info!("shutting down Kafka consumer");
    })
}
