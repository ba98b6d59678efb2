//! The two broker-facing workers: a consumer thread that feeds the inbound
//! queue and a producer thread that drains the outbound queue. Both absorb
//! their own failures — neither ever propagates an error back across the
//! queue boundary, per the bridge's error taxonomy.

pub mod consumer;
pub mod producer;

pub use consumer::spawn_consumer;
pub use producer::spawn_producer;
