//! The UDP transport

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use someip::definitions::Message;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use crate::config::{TpConfig, UdpConfig};
use crate::tp::{needs_segmentation, segment, Reassembler};
use crate::transport::recv::handle_receive;
use crate::transport::{TransportCallbacks, TransportError};

/// A bound UDP socket speaking SOME/IP
///
/// The socket is owned exclusively by this transport. Receiving happens on
/// a dedicated task started with [UdpTransport::start]; senders may be any
/// task. Messages larger than the TP segment limit are segmented
/// transparently on send and reassembled transparently on receive.
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    udp_config: UdpConfig,
    tp_config: TpConfig,
    reassembler: Arc<Reassembler>,
    running: Arc<AtomicBool>,
    receive_task: Mutex<Option<JoinHandle<()>>>,
    callbacks: Mutex<Option<Arc<dyn TransportCallbacks>>>,
}

impl UdpTransport {
    /// Bind a socket and apply the configurable socket options
    ///
    /// Options the runtime does not expose (`reuse_address`, `reuse_port`,
    /// the exact kernel buffer sizes) are accepted but not applied; the
    /// receive buffer size caps the userspace receive buffer instead.
    #[instrument(skip_all)]
    pub async fn bind(
        addr: SocketAddr,
        udp_config: UdpConfig,
        tp_config: TpConfig,
    ) -> Result<Self, TransportError> {
        info!("Binding SOME/IP UDP transport to {addr}");
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(TransportError::CouldNotBind)?;

        socket
            .set_broadcast(udp_config.enable_broadcast)
            .map_err(TransportError::CouldNotBind)?;
        if addr.is_ipv4() {
            socket
                .set_multicast_ttl_v4(udp_config.multicast_ttl)
                .map_err(TransportError::CouldNotBind)?;
        }

        Ok(Self {
            socket: Arc::new(socket),
            reassembler: Arc::new(Reassembler::new(tp_config.clone())),
            udp_config,
            tp_config,
            running: Arc::new(AtomicBool::new(false)),
            receive_task: Mutex::new(None),
            callbacks: Mutex::new(None),
        })
    }

    /// The bound local address
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.socket.local_addr().map_err(TransportError::Receive)
    }

    /// Join the given multicast group on the configured interface
    pub fn join_multicast(&self, group: Ipv4Addr) -> Result<(), TransportError> {
        self.socket
            .join_multicast_v4(group, self.udp_config.multicast_interface)
            .map_err(TransportError::CouldNotBind)
    }

    /// Send a message, segmenting it transparently when oversize
    pub async fn send_message(
        &self,
        message: &Message,
        destination: SocketAddr,
    ) -> Result<(), TransportError> {
        if needs_segmentation(message, self.tp_config.max_segment_size) {
            debug!(
                "Segmenting {} byte payload for {destination}",
                message.payload.len()
            );
            let segments = segment(message.clone(), self.tp_config.max_segment_size)
                .map_err(|_| TransportError::InvalidConfig)?;
            for frame in segments {
                self.send_frame(&frame, destination).await?;
            }
            Ok(())
        } else {
            self.send_frame(message, destination).await
        }
    }

    async fn send_frame(
        &self,
        message: &Message,
        destination: SocketAddr,
    ) -> Result<(), TransportError> {
        let bytes = message.try_build()?;
        self.socket
            .send_to(&bytes, destination)
            .await
            .map_err(TransportError::Send)?;
        Ok(())
    }

    /// Start the receive loop, reporting everything to `callbacks`
    ///
    /// A second start replaces nothing: the call is ignored while a receive
    /// task is alive.
    #[allow(clippy::unwrap_used)]
    pub fn start(&self, callbacks: Arc<dyn TransportCallbacks>) {
        let mut task = self.receive_task.lock().unwrap();
        if task.is_some() {
            return;
        }

        self.running.store(true, Ordering::Relaxed);
        *self.callbacks.lock().unwrap() = Some(Arc::clone(&callbacks));
        *task = Some(tokio::spawn(handle_receive(
            Arc::clone(&self.socket),
            self.udp_config.clone(),
            Arc::clone(&self.reassembler),
            callbacks,
            Arc::clone(&self.running),
        )));
    }

    /// Stop the receive loop and abandon all outstanding reassemblies
    ///
    /// Every discarded reassembly is reported as timed out to the callbacks
    /// the transport was started with.
    #[allow(clippy::unwrap_used)]
    pub async fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
        let task = self.receive_task.lock().unwrap().take();
        if let Some(task) = task {
            task.abort();
            let _ = task.await;
        }

        let callbacks = self.callbacks.lock().unwrap().take();
        for key in self.reassembler.discard_all() {
            if let Some(callbacks) = &callbacks {
                callbacks.on_reassembly_timeout(&key);
            }
        }
        info!("UDP transport stopped");
    }

    /// The reassembler owned by this transport, for diagnostics
    pub fn reassembler(&self) -> &Reassembler {
        &self.reassembler
    }
}
