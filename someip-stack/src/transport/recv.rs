//! The receive loop of a datagram transport

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use someip::parser::parse_frames;
use tokio::net::UdpSocket;
use tokio::select;
use tokio::time::interval;
use tracing::{debug, error, trace, warn};

use crate::config::UdpConfig;
use crate::error::StackError;
use crate::tp::Reassembler;
use crate::transport::TransportCallbacks;

/// Handle the receival of SOME/IP datagrams
///
/// Runs until the running flag is cleared or too many consecutive socket
/// errors accumulate. TP segments are fed through the reassembler; the
/// reaper branch visits the reassembly contexts at half the configured
/// timeout.
pub(crate) async fn handle_receive(
    socket: Arc<UdpSocket>,
    config: UdpConfig,
    reassembler: Arc<Reassembler>,
    callbacks: Arc<dyn TransportCallbacks>,
    running: Arc<AtomicBool>,
) {
    let mut buf = vec![0u8; config.receive_buffer_size];
    let mut consecutive_errors = 0u32;
    let mut reaper = interval(reassembler.timeout().div_f32(2.0).max(Duration::from_millis(10)));

    while running.load(Ordering::Relaxed) {
        select! {
            _ = reaper.tick() => {
                for key in reassembler.expire(Instant::now()) {
                    debug!("Reassembly from {} timed out", key.peer);
                    callbacks.on_reassembly_timeout(&key);
                }
            }

            received = socket.recv_from(&mut buf) => {
                let (len, sender) = match received {
                    Ok(received) => received,
                    Err(err) => {
                        consecutive_errors += 1;
                        error!("Error in receiving side: {err}");
                        if consecutive_errors >= config.max_consecutive_errors {
                            callbacks.on_error(StackError::NotReachable);
                            break;
                        }
                        continue;
                    }
                };
                consecutive_errors = 0;

                if len > config.max_message_size {
                    warn!("Dropping {len} byte datagram from {sender} over the configured limit");
                    callbacks.on_error(StackError::MalformedMessage);
                    continue;
                }

                for frame in parse_frames(&buf[..len]) {
                    match frame {
                        Err(err) => {
                            trace!("Could not parse incoming message: {err}");
                            callbacks.on_error(err.into());
                        }
                        Ok(message) if message.is_tp() => {
                            match reassembler.insert(sender, &message) {
                                Ok(Some(reassembled)) => {
                                    callbacks.on_message_received(reassembled, sender);
                                }
                                Ok(None) => {}
                                Err(err) => callbacks.on_error(err),
                            }
                        }
                        Ok(message) => callbacks.on_message_received(message, sender),
                    }
                }
            }
        }
    }
}
