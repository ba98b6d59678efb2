//! The WebSocket side of the bridge: a single-threaded, `mio`-driven event
//! loop (the Event-Loop Dispatcher) plus the per-connection state machine
//! built on `tungstenite`.

pub mod server;

pub use server::run_event_loop;
