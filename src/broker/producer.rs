//! Broker Producer Worker (BPW): drains the outbound queue and publishes
//! each payload to the configured outbound topic.
//!
//! Tuned for low latency rather than throughput (`acks=1`, `linger.ms=0`,
//! `batch.size=0`) since the outbound queue has already absorbed
//! application-layer backpressure — there is no reason for the producer to
//! also batch on top of that. Enqueue failures and delivery failures are
//! both logged and dropped; the outbound MQ's blocking push is the only
//! backpressure mechanism this bridge applies to clients.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{error, info, warn};
use rdkafka::client::ClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::message::DeliveryResult;
use rdkafka::producer::{BaseProducer, BaseRecord, NoCustomPartitioner, Producer, ProducerContext};

use crate::config::Config;
use crate::queue::BoundedQueue;
use crate::shutdown;

const FLUSH_DEADLINE: Duration = Duration::from_secs(5);

struct BridgeProducerContext;

impl ClientContext for BridgeProducerContext {}

impl ProducerContext for BridgeProducerContext {
    type DeliveryOpaque = ();

    fn delivery(&self, delivery_result: &DeliveryResult<'_>, _delivery_opaque: Self::DeliveryOpaque) {
        if let Err((err, _msg)) = delivery_result {
            warn!("Kafka delivery failed: {err}");
        }
    }
}

pub fn spawn_producer(config: &Config, outbound: Arc<BoundedQueue>) -> JoinHandle<()> {
    let brokers = config.kafka_brokers.clone();
    let topic = config.kafka_producer_topic.clone();
    let poll_timeout = Duration::from_millis(config.kafka_poll_timeout_ms);

    thread::spawn(move || {
        // `BaseProducer`, not `ThreadedProducer`: the latter spawns its own
        // background thread that calls `poll` automatically, which would
        // make the explicit `producer.poll(poll_timeout)` below redundant.
        // The spec calls for this worker to drive that poll itself on every
        // loop iteration, matching the reference's manual `rd_kafka_poll`.
        let producer: BaseProducer<BridgeProducerContext, NoCustomPartitioner> =
            match ClientConfig::new()
                .set("bootstrap.servers", &brokers)
                .set("acks", "1")
                .set("linger.ms", "0")
                .set("batch.size", "0")
                .create_with_context(BridgeProducerContext)
            {
                Ok(producer) => producer,
                Err(err) => {
                    error!("failed to create Kafka producer: {err}");
                    return;
                }
            };

        info!("Kafka producer started for topic {topic}");

        while !shutdown::is_shutdown() {
            if let Some(payload) = outbound.try_pop() {
                let record: BaseRecord<'_, (), [u8], ()> =
                    BaseRecord::to(&topic).payload(&payload);
                if let Err((err, _record)) = producer.send(record) {
                    warn!("failed to enqueue message for topic {topic}: {err}");
                }
            }

            producer.poll(poll_timeout);
        }

        info!("shutting down Kafka producer");
        let _ = producer.flush(FLUSH_DEADLINE);
    })
}
