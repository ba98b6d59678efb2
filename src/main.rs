mod broker;
mod config;
mod error;
mod queue;
mod registry;
mod shutdown;
mod ws;

use std::sync::Arc;

use anyhow::Context;
use log::info;

use config::Config;
use queue::BoundedQueue;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load().context("failed to load configuration")?;

    shutdown::install_handlers();

    let inbound = Arc::new(BoundedQueue::new(config.message_queue_capacity));
    let outbound = Arc::new(BoundedQueue::new(config.message_queue_capacity));

    let consumer_handle = broker::spawn_consumer(&config, Arc::clone(&inbound));
    let producer_handle = broker::spawn_producer(&config, Arc::clone(&outbound));

    let eld_result = ws::run_event_loop(&config.interface, config.port, Arc::clone(&inbound), Arc::clone(&outbound));

    // The event loop only returns once the shutdown flag has been observed
    // (either via a signal or because the WebSocket listener itself
    // failed). `trigger` covers the latter case — a listener failure never
    // raised a signal, so the broker workers would otherwise spin forever
    // against queues nobody will close. Either way, the shutdown protocol
    // below runs unconditionally so the broker workers are always joined
    // and the queues always drained.
    shutdown::trigger();

    inbound.close();
    outbound.close();

    let _ = consumer_handle.join();
    let _ = producer_handle.join();

    eld_result.context("WebSocket event loop failed")?;

    info!("bridge shut down cleanly");
    Ok(())
}
