//! Event-Loop Dispatcher (ELD): the single-threaded cooperative scheduler
//! that owns the listening socket, every client connection, and the
//! session registry. Nothing here runs concurrently with anything else in
//! this module — all "callbacks" are just match arms on the same thread,
//! so no lock is contended except with the broker workers on the two
//! queues.
//!
//! There is no process-wide singleton pointer the way a C callback-based
//! WebSocket library would need one: this function owns the registry and
//! both queue handles directly, and reaches them via ordinary closures and
//! local variables instead of an opaque per-connection user pointer.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token};
use tungstenite::handshake::{server::NoCallback, HandshakeError, MidHandshake};
use tungstenite::protocol::WebSocket;
use tungstenite::{Message, ServerHandshake};

use crate::error::Result;
use crate::queue::BoundedQueue;
use crate::registry::{Registry, SessionId, DEFAULT_RING_CAPACITY};
use crate::shutdown;

const LISTENER_TOKEN: Token = Token(0);
const SERVICE_QUANTUM: Duration = Duration::from_millis(1);

enum Connection {
    Handshaking(Option<MidHandshake<ServerHandshake<TcpStream, NoCallback>>>),
    Open(WebSocket<TcpStream>),
}

/// Runs the event loop until the shutdown flag is observed. Returns once
/// the loop has exited cleanly; all sessions are dropped (and their rings
/// torn down with them) before this function returns.
pub fn run_event_loop(
    interface: &str,
    port: u16,
    inbound: Arc<BoundedQueue>,
    outbound: Arc<BoundedQueue>,
) -> Result<()> {
    let bind_addr: SocketAddr = format!(
        "{}:{}",
        if interface.is_empty() { "0.0.0.0" } else { interface },
        port
    )
    .parse()
    .map_err(|e| std::io::Error::new(ErrorKind::InvalidInput, format!("bad bind address: {e}")))?;

    let mut listener = TcpListener::bind(bind_addr)?;
    let mut poll = Poll::new()?;
    poll.registry()
        .register(&mut listener, LISTENER_TOKEN, Interest::READABLE)?;

    let registry = Registry::new(DEFAULT_RING_CAPACITY);
    let mut connections: HashMap<Token, Connection> = HashMap::new();
    let mut next_token = 1usize;
    let mut events = Events::with_capacity(256);

    info!("WebSocket server listening on {bind_addr}");

    while !shutdown::is_shutdown() {
        // Step 1: fan inbound broker messages out to every connected session.
        while let Some(payload) = inbound.try_pop() {
            registry.broadcast(&payload);
        }

        // Step 2: one quantum of socket I/O.
        if let Err(err) = poll.poll(&mut events, Some(SERVICE_QUANTUM)) {
            if err.kind() != ErrorKind::Interrupted {
                warn!("poll error: {err}");
            }
            continue;
        }

        for event in events.iter() {
            if event.token() == LISTENER_TOKEN {
                accept_connections(&listener, &poll, &mut connections, &registry, &mut next_token);
                continue;
            }

            let token = event.token();
            let id = token.0 as SessionId;
            let mut close = false;

            if let Some(connection) = connections.get_mut(&token) {
                match connection {
                    Connection::Handshaking(mid) => {
                        let pending = mid.take().expect("mid-handshake state missing");
                        match pending.handshake() {
                            Ok(ws) => {
                                info!("client connected");
                                registry.insert(id);
                                *connection = Connection::Open(ws);
                            }
                            Err(HandshakeError::Interrupted(mid)) => {
                                *connection = Connection::Handshaking(Some(mid));
                            }
                            Err(HandshakeError::Failure(err)) => {
                                warn!("WebSocket handshake failed: {err}");
                                close = true;
                            }
                        }
                    }
                    Connection::Open(ws) => {
                        if event.is_readable() {
                            close |= service_readable(ws, id, &registry, &outbound);
                        }
                        if !close && event.is_writable() {
                            service_writable(ws, id, &registry);
                        }
                    }
                }
            }

            if close {
                if let Some(mut connection) = connections.remove(&token) {
                    deregister(&poll, &mut connection);
                }
                registry.remove(id);
                info!("client disconnected");
            }
        }

        // Step 3 happens implicitly: the `while running...` condition is
        // re-checked at the top of the next iteration.
    }

    Ok(())
}

fn accept_connections(
    listener: &TcpListener,
    poll: &Poll,
    connections: &mut HashMap<Token, Connection>,
    registry: &Registry,
    next_token: &mut usize,
) {
    loop {
        match listener.accept() {
            Ok((mut stream, _addr)) => {
                let token = Token(*next_token);
                *next_token += 1;

                if let Err(err) = poll.registry().register(
                    &mut stream,
                    token,
                    Interest::READABLE | Interest::WRITABLE,
                ) {
                    warn!("failed to register new connection: {err}");
                    continue;
                }

                match tungstenite::accept(stream) {
                    Ok(ws) => {
                        info!("client connected");
                        registry.insert(token.0 as SessionId);
                        connections.insert(token, Connection::Open(ws));
                    }
                    Err(HandshakeError::Interrupted(mid)) => {
                        connections.insert(token, Connection::Handshaking(Some(mid)));
                    }
                    Err(HandshakeError::Failure(err)) => {
                        warn!("WebSocket handshake failed immediately: {err}");
                    }
                }
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => break,
            Err(err) => {
                warn!("accept error: {err}");
                break;
            }
        }
    }
}

/// Reads every frame currently available without blocking. Returns `true`
/// if the connection should be torn down.
fn service_readable(
    ws: &mut WebSocket<TcpStream>,
    id: SessionId,
    registry: &Registry,
    outbound: &BoundedQueue,
) -> bool {
    loop {
        match ws.read() {
            Ok(Message::Text(text)) => on_receive(text.as_bytes(), id, registry, outbound),
            Ok(Message::Binary(data)) => on_receive(&data, id, registry, outbound),
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => {}
            Ok(Message::Close(_)) => return true,
            Err(tungstenite::Error::Io(err)) if err.kind() == ErrorKind::WouldBlock => {
                return false;
            }
            Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => {
                return true;
            }
            Err(err) => {
                warn!("WebSocket read error: {err}");
                return true;
            }
        }
    }
}

/// Receive callback: broadcast to all currently-connected sessions —
/// including the sender, by the simplest reading of the bridge's observed
/// contract — and unconditionally forward the payload to the outbound
/// queue. This is the intended behavior near receive: forward whenever an
/// outbound queue exists, which is always the case in this design.
fn on_receive(payload: &[u8], _id: SessionId, registry: &Registry, outbound: &BoundedQueue) {
    if payload.is_empty() {
        return;
    }
    registry.broadcast(payload);
    if !outbound.push(payload.to_vec()) {
        warn!("failed to forward message to Kafka producer queue");
    }
}

/// Writable callback: write exactly one pending frame, matching the
/// reference's "one frame per writable event" pacing rather than draining
/// the whole ring in a single callback.
fn service_writable(ws: &mut WebSocket<TcpStream>, id: SessionId, registry: &Registry) {
    let Some(frame) = registry.pop_next_frame(id) else {
        return;
    };

    let text = match String::from_utf8(frame) {
        Ok(text) => text,
        Err(err) => {
            warn!("dropping non-UTF-8 frame for session {id}: {err}");
            return;
        }
    };

    match ws.send(Message::Text(text.into())) {
        Ok(()) => {}
        Err(tungstenite::Error::Io(err)) if err.kind() == ErrorKind::WouldBlock => {
            warn!("short write on WebSocket for session {id}");
        }
        Err(err) => {
            warn!("WebSocket write error for session {id}: {err}");
        }
    }
}

fn deregister(poll: &Poll, connection: &mut Connection) {
    let stream = match connection {
        Connection::Open(ws) => ws.get_mut(),
        Connection::Handshaking(_) => return,
    };
    let _ = poll.registry().deregister(stream);
}
