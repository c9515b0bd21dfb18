//! The service discovery engine task
//!
//! One task per node owns every offer and find state machine, the peer
//! reboot tracker and the per destination session counters. It talks to the
//! outside world exclusively through channels: SD frames come in tagged
//! with their sender and channel, outgoing frames leave as ready-to-send
//! messages with their destination, and notable observations are published
//! as [SdEvent]s.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use itertools::Itertools;
use someip::definitions::Message;
use someip_sd::{build_sd_frame, parse_sd_message, Entry, EntryKind, SdMessage, SdOption};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};

use crate::config::SdConfig;
use crate::sd::client::{FindState, FireOutcome};
use crate::sd::peer::{PeerTracker, SdChannel, SdSessionCounter};
use crate::sd::server::{initial_delay, OfferState, OfferedService};
use crate::sd::ServiceKey;

/// An SD frame received from the network
#[derive(Debug)]
pub struct SdIncoming {
    /// The parsed SOME/IP frame
    pub message: Message,
    /// Endpoint the frame arrived from
    pub sender: SocketAddr,
    /// Whether the frame arrived on the multicast group or unicast
    pub channel: SdChannel,
}

/// An SD frame the engine wants sent
#[derive(Debug)]
pub struct SdOutgoing {
    /// The ready-to-serialize SOME/IP frame
    pub frame: Message,
    /// Where to send it
    pub destination: SocketAddr,
}

/// Instructions to the engine task
#[derive(Debug)]
pub enum SdCommand {
    /// Start announcing a service instance
    Offer(OfferedService),
    /// Withdraw a service instance with a StopOfferService
    StopOffer(ServiceKey),
    /// Start looking for a service and subscribe to its eventgroups once
    /// it is found
    Find {
        /// The wanted service
        key: ServiceKey,
        /// Major version of the wanted interface
        major_version: u8,
        /// Eventgroups to subscribe to
        eventgroups: Vec<u16>,
        /// Local endpoint announced in subscribe entries
        local_endpoint: Option<SdOption>,
    },
    /// Cancel a search, unsubscribing where necessary
    StopFind(ServiceKey),
    /// Stop the engine, withdrawing all offered services
    Shutdown,
}

/// Observations the engine publishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdEvent {
    /// An offer for a wanted service was seen
    ServiceAvailable {
        /// The wanted service
        key: ServiceKey,
        /// The offering peer
        peer: SocketAddr,
        /// Endpoint options carried by the offer
        endpoints: Vec<SdOption>,
    },
    /// A tracked service was withdrawn or its peer rebooted
    ServiceUnavailable {
        /// The wanted service
        key: ServiceKey,
    },
    /// A subscription was acknowledged
    SubscriptionAcked {
        /// The subscribed service
        key: ServiceKey,
        /// The acknowledged eventgroup
        eventgroup_id: u16,
    },
    /// A subscription was rejected
    SubscriptionNacked {
        /// The subscribed service
        key: ServiceKey,
        /// The rejected eventgroup
        eventgroup_id: u16,
    },
    /// A peer's session counter sequence showed a reboot
    PeerRebooted(SocketAddr),
}

/// Handle to a running engine task
#[derive(Debug)]
pub struct SdEngine {
    commands: mpsc::UnboundedSender<SdCommand>,
    handle: JoinHandle<()>,
}

/// The current instant as seen by the runtime clock
///
/// Routing this through tokio keeps the state machine timing consistent
/// with the `sleep_until` wakeups, including under a paused test clock.
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

impl SdEngine {
    /// Spawn the engine task
    pub fn spawn(
        config: SdConfig,
        incoming: mpsc::UnboundedReceiver<SdIncoming>,
        outgoing: mpsc::UnboundedSender<SdOutgoing>,
        events: mpsc::UnboundedSender<SdEvent>,
    ) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let task = EngineTask {
            multicast_destination: SocketAddr::new(config.multicast_group.into(), config.port),
            config,
            incoming,
            outgoing,
            events,
            commands: command_rx,
            offers: HashMap::new(),
            finds: HashMap::new(),
            tracker: PeerTracker::new(),
            multicast_counter: SdSessionCounter::new(),
            unicast_counters: HashMap::new(),
            subscribers: HashMap::new(),
        };
        Self {
            commands,
            handle: tokio::spawn(task.run()),
        }
    }

    /// Send a command to the engine, ignoring a stopped task
    pub fn send(&self, command: SdCommand) {
        if self.commands.send(command).is_err() {
            warn!("SD engine task is gone, command dropped");
        }
    }

    /// Withdraw everything and wait for the task to finish
    pub async fn shutdown(self) {
        self.send(SdCommand::Shutdown);
        if self.handle.await.is_err() {
            warn!("SD engine task panicked during shutdown");
        }
    }
}

struct Subscriber {
    deadline: Instant,
}

struct EngineTask {
    config: SdConfig,
    multicast_destination: SocketAddr,
    incoming: mpsc::UnboundedReceiver<SdIncoming>,
    outgoing: mpsc::UnboundedSender<SdOutgoing>,
    events: mpsc::UnboundedSender<SdEvent>,
    commands: mpsc::UnboundedReceiver<SdCommand>,
    offers: HashMap<ServiceKey, OfferState>,
    finds: HashMap<ServiceKey, FindState>,
    tracker: PeerTracker,
    multicast_counter: SdSessionCounter,
    unicast_counters: HashMap<SocketAddr, SdSessionCounter>,
    /// Remote subscribers per (service, eventgroup) with their lease
    subscribers: HashMap<(ServiceKey, u16), HashMap<SocketAddr, Subscriber>>,
}

impl EngineTask {
    #[instrument(skip_all)]
    async fn run(mut self) {
        info!("Service discovery engine running");
        loop {
            let sleep_until = self
                .next_deadline()
                .map(tokio::time::Instant::from_std)
                .unwrap_or_else(|| {
                    tokio::time::Instant::now() + Duration::from_secs(3600)
                });

            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        None | Some(SdCommand::Shutdown) => break,
                        Some(command) => self.handle_command(command),
                    }
                }
                received = self.incoming.recv() => {
                    match received {
                        None => break,
                        Some(received) => self.handle_incoming(received),
                    }
                }
                () = tokio::time::sleep_until(sleep_until) => {
                    self.tick(now());
                }
            }
        }
        self.withdraw_everything();
        info!("Service discovery engine stopped");
    }

    fn next_deadline(&self) -> Option<Instant> {
        let offers = self.offers.values().filter_map(OfferState::next_fire);
        let finds = self.finds.values().filter_map(FindState::next_fire);
        let leases = self
            .subscribers
            .values()
            .flat_map(|peers| peers.values().map(|s| s.deadline));
        offers.chain(finds).chain(leases).min()
    }

    fn handle_command(&mut self, command: SdCommand) {
        let now = now();
        match command {
            SdCommand::Offer(service) => {
                debug!("Offering {:?}", service.key);
                let state = self
                    .offers
                    .entry(service.key)
                    .or_insert_with(|| OfferState::new(service));
                state.start(now, initial_delay(&self.config));
            }
            SdCommand::StopOffer(key) => {
                let farewell = self
                    .offers
                    .get_mut(&key)
                    .and_then(|state| state.stop(&self.config));
                if let Some(entry) = farewell {
                    self.send_multicast(vec![entry]);
                }
            }
            SdCommand::Find {
                key,
                major_version,
                eventgroups,
                local_endpoint,
            } => {
                debug!("Looking for {key:?}");
                let state = self.finds.entry(key).or_insert_with(|| {
                    FindState::new(key, major_version, eventgroups, local_endpoint)
                });
                state.start(now, initial_delay(&self.config));
            }
            SdCommand::StopFind(key) => {
                if let Some(mut state) = self.finds.remove(&key) {
                    if let Some((peer, entries)) = state.stop(&self.config) {
                        self.send_unicast(peer, entries);
                    }
                }
            }
            SdCommand::Shutdown => {}
        }
    }

    /// Let every due timer fire and flush what the machines want sent
    fn tick(&mut self, now: Instant) {
        let mut multicast = vec![];
        let mut unicast = vec![];

        for state in self.offers.values_mut() {
            if let Some(entry) = state.fire(&self.config, now) {
                multicast.push(entry);
            }
        }
        for state in self.finds.values_mut() {
            match state.fire(&self.config, now) {
                FireOutcome::Idle => {}
                FireOutcome::Multicast(entry) => multicast.push(entry),
                FireOutcome::Unicast(peer, entries) => {
                    unicast.extend(entries.into_iter().map(|entry| (peer, entry)));
                }
            }
        }

        self.purge_lapsed_subscribers(now);

        self.send_multicast(multicast);
        for (peer, entries) in unicast.into_iter().into_group_map() {
            self.send_unicast(peer, entries);
        }
    }

    fn purge_lapsed_subscribers(&mut self, now: Instant) {
        for ((key, eventgroup), peers) in self.subscribers.iter_mut() {
            peers.retain(|peer, subscriber| {
                let live = subscriber.deadline > now;
                if !live {
                    debug!("Subscription of {peer} to {key:?}/{eventgroup:#06x} lapsed");
                }
                live
            });
        }
        self.subscribers.retain(|_, peers| !peers.is_empty());
    }

    fn handle_incoming(&mut self, received: SdIncoming) {
        let now = now();
        let sd = match parse_sd_message(&received.message) {
            Ok(sd) => sd,
            Err(err) => {
                warn!("Dropping malformed SD frame from {}: {err}", received.sender);
                return;
            }
        };
        trace!("SD frame from {} with {} entries", received.sender, sd.entries.len());

        if self.tracker.observe(
            received.sender,
            received.channel,
            sd.reboot,
            received.message.header.session_id,
        ) {
            self.handle_peer_reboot(received.sender, now);
        }

        // entries are processed strictly in wire order
        for entry in &sd.entries {
            match entry.kind {
                EntryKind::FindService => self.handle_find(received.sender, entry),
                EntryKind::OfferService => self.handle_offer(received.sender, entry, now),
                EntryKind::SubscribeEventgroup => {
                    self.handle_subscribe(received.sender, entry, now);
                }
                EntryKind::SubscribeEventgroupAck => self.handle_subscribe_ack(entry),
                EntryKind::Other(other) => {
                    debug!("Ignoring SD entry of unassigned type {other:#04x}");
                }
            }
        }
    }

    fn handle_peer_reboot(&mut self, peer: SocketAddr, now: Instant) {
        info!("Peer {peer} rebooted, resetting its cached state");
        let mut lost = vec![];
        for (key, state) in self.finds.iter_mut() {
            if state.handle_lost_peer(peer, &self.config, now) {
                lost.push(*key);
            }
        }
        for peers in self.subscribers.values_mut() {
            peers.remove(&peer);
        }
        self.unicast_counters.remove(&peer);

        for key in lost {
            self.publish(SdEvent::ServiceUnavailable { key });
        }
        self.publish(SdEvent::PeerRebooted(peer));
    }

    fn handle_find(&mut self, sender: SocketAddr, entry: &Entry) {
        let replies: Vec<Entry> = self
            .offers
            .values()
            .filter(|state| {
                state
                    .service()
                    .key
                    .matches(entry.service_id, entry.instance_id)
            })
            .filter_map(|state| state.respond_to_find(&self.config))
            .collect();
        if !replies.is_empty() {
            self.send_unicast(sender, replies);
        }
    }

    fn handle_offer(&mut self, sender: SocketAddr, entry: &Entry, now: Instant) {
        if entry.is_stop_offer() {
            let mut lost = vec![];
            for (key, state) in self.finds.iter_mut() {
                if state.handle_lost_peer(sender, &self.config, now) {
                    lost.push(*key);
                }
            }
            for key in lost {
                self.publish(SdEvent::ServiceUnavailable { key });
            }
            return;
        }

        let mut subscribes = vec![];
        let mut available = vec![];
        for (key, state) in self.finds.iter_mut() {
            if let Some(entries) = state.handle_offer(sender, entry, &self.config, now) {
                available.push(*key);
                subscribes.extend(entries);
            }
        }
        for key in available {
            self.publish(SdEvent::ServiceAvailable {
                key,
                peer: sender,
                endpoints: entry.all_options().cloned().collect(),
            });
        }
        if !subscribes.is_empty() {
            self.send_unicast(sender, subscribes);
        }
    }

    fn handle_subscribe(&mut self, sender: SocketAddr, entry: &Entry, now: Instant) {
        let offered = self.offers.values().any(|state| {
            state
                .service()
                .key
                .matches(entry.service_id, entry.instance_id)
                && state.respond_to_find(&self.config).is_some()
        });
        let key = ServiceKey::new(entry.service_id, entry.instance_id);

        if entry.is_stop_subscribe() {
            if let Some(peers) = self.subscribers.get_mut(&(key, entry.eventgroup_id)) {
                peers.remove(&sender);
            }
            return;
        }

        if !offered {
            debug!(
                "Nacking subscribe from {sender} for unoffered {:#06x}/{:#06x}",
                entry.service_id, entry.eventgroup_id
            );
            self.send_unicast(sender, vec![Entry::subscribe_ack(entry, 0)]);
            return;
        }

        self.subscribers
            .entry((key, entry.eventgroup_id))
            .or_default()
            .insert(
                sender,
                Subscriber {
                    deadline: now + Duration::from_secs(u64::from(entry.ttl)),
                },
            );
        self.send_unicast(sender, vec![Entry::subscribe_ack(entry, entry.ttl)]);
    }

    fn handle_subscribe_ack(&mut self, entry: &Entry) {
        let mut events = vec![];
        for (key, state) in self.finds.iter_mut() {
            if let Some(verdict) = state.handle_subscribe_ack(entry) {
                events.push((*key, verdict));
            }
        }
        for (key, verdict) in events {
            use crate::sd::client::SubscribeVerdict;
            self.publish(match verdict {
                SubscribeVerdict::Acked(eventgroup_id) => SdEvent::SubscriptionAcked {
                    key,
                    eventgroup_id,
                },
                SubscribeVerdict::Nacked(eventgroup_id) => SdEvent::SubscriptionNacked {
                    key,
                    eventgroup_id,
                },
            });
        }
    }

    fn withdraw_everything(&mut self) {
        let mut farewell = vec![];
        for state in self.offers.values_mut() {
            if let Some(entry) = state.stop(&self.config) {
                farewell.push(entry);
            }
        }
        self.send_multicast(farewell);

        let keys: Vec<ServiceKey> = self.finds.keys().copied().collect();
        for key in keys {
            if let Some(mut state) = self.finds.remove(&key) {
                if let Some((peer, entries)) = state.stop(&self.config) {
                    self.send_unicast(peer, entries);
                }
            }
        }
    }

    fn send_multicast(&mut self, entries: Vec<Entry>) {
        if entries.is_empty() {
            return;
        }
        let (session_id, reboot) = self.multicast_counter.next();
        self.dispatch(entries, reboot, session_id, self.multicast_destination);
    }

    fn send_unicast(&mut self, peer: SocketAddr, entries: Vec<Entry>) {
        if entries.is_empty() {
            return;
        }
        let (session_id, reboot) = self.unicast_counters.entry(peer).or_default().next();
        self.dispatch(entries, reboot, session_id, peer);
    }

    fn dispatch(
        &self,
        entries: Vec<Entry>,
        reboot: bool,
        session_id: u16,
        destination: SocketAddr,
    ) {
        let message = SdMessage {
            reboot,
            unicast: true,
            entries,
        };
        match build_sd_frame(&message, session_id) {
            Ok(frame) => {
                if self
                    .outgoing
                    .send(SdOutgoing { frame, destination })
                    .is_err()
                {
                    warn!("SD transport is gone, frame dropped");
                }
            }
            Err(err) => warn!("Could not build SD frame: {err}"),
        }
    }

    fn publish(&self, event: SdEvent) {
        if self.events.send(event).is_err() {
            trace!("Nobody listens to SD events");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::net::Ipv4Addr;

    use someip_sd::{build_sd_frame, L4Protocol};

    use super::*;
    use crate::sd::server::OfferedService;

    struct Harness {
        engine: SdEngine,
        incoming: mpsc::UnboundedSender<SdIncoming>,
        outgoing: mpsc::UnboundedReceiver<SdOutgoing>,
        events: mpsc::UnboundedReceiver<SdEvent>,
        config: SdConfig,
    }

    fn harness() -> Harness {
        let config = SdConfig::default();
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let engine = SdEngine::spawn(config.clone(), incoming_rx, outgoing_tx, event_tx);
        Harness {
            engine,
            incoming: incoming_tx,
            outgoing: outgoing_rx,
            events: event_rx,
            config,
        }
    }

    fn endpoint() -> SdOption {
        SdOption::Ipv4Endpoint {
            address: Ipv4Addr::new(192, 168, 1, 10),
            protocol: L4Protocol::Udp,
            port: 30500,
        }
    }

    fn offered() -> OfferedService {
        OfferedService {
            key: ServiceKey::new(0x0100, 0x0001),
            major_version: 1,
            minor_version: 0,
            endpoint: endpoint(),
        }
    }

    fn peer() -> SocketAddr {
        "192.168.1.10:30490".parse().unwrap()
    }

    fn inject(harness: &Harness, entries: Vec<Entry>, session_id: u16, reboot: bool) {
        let message = SdMessage {
            reboot,
            unicast: true,
            entries,
        };
        harness
            .incoming
            .send(SdIncoming {
                message: build_sd_frame(&message, session_id).unwrap(),
                sender: peer(),
                channel: SdChannel::Multicast,
            })
            .unwrap();
    }

    async fn next_sd(
        outgoing: &mut mpsc::UnboundedReceiver<SdOutgoing>,
    ) -> (SdMessage, u16, SocketAddr) {
        let outgoing = outgoing.recv().await.unwrap();
        let session_id = outgoing.frame.header.session_id;
        let parsed = parse_sd_message(&outgoing.frame).unwrap();
        (parsed, session_id, outgoing.destination)
    }

    #[tokio::test(start_paused = true)]
    async fn offer_cycle_walks_to_cyclic_announcements() {
        let mut harness = harness();
        harness.engine.send(SdCommand::Offer(offered()));

        // initial announcement plus the configured repetitions plus two
        // cyclic rounds, all multicast with increasing session ids
        let rounds = 1 + harness.config.repetitions_max + 2;
        for round in 0..rounds {
            let (sd, session_id, destination) = next_sd(&mut harness.outgoing).await;
            assert_eq!(session_id, round as u16 + 1);
            assert_eq!(
                destination,
                SocketAddr::new(harness.config.multicast_group.into(), harness.config.port)
            );
            assert_eq!(sd.entries.len(), 1);
            assert_eq!(sd.entries[0].kind, EntryKind::OfferService);
            assert_eq!(sd.entries[0].service_id, 0x0100);
            assert_eq!(sd.entries[0].ttl, harness.config.offer_ttl);
            assert_eq!(sd.entries[0].options1, vec![endpoint()]);
        }

        harness.engine.send(SdCommand::StopOffer(ServiceKey::new(0x0100, 0x0001)));
        let (sd, _, _) = next_sd(&mut harness.outgoing).await;
        assert!(sd.entries[0].is_stop_offer());
    }

    #[tokio::test(start_paused = true)]
    async fn find_offer_subscribe_handshake() {
        let mut harness = harness();
        harness.engine.send(SdCommand::Find {
            key: ServiceKey::new(0x0100, 0x0001),
            major_version: 1,
            eventgroups: vec![0x0001],
            local_endpoint: Some(SdOption::Ipv4Endpoint {
                address: Ipv4Addr::new(192, 168, 1, 20),
                protocol: L4Protocol::Udp,
                port: 40000,
            }),
        });

        // the search starts multicasting find entries
        let (sd, _, _) = next_sd(&mut harness.outgoing).await;
        assert_eq!(sd.entries[0].kind, EntryKind::FindService);
        assert_eq!(sd.entries[0].ttl, 0xFF_FFFF);

        // a peer answers with an offer; the engine reports the service and
        // subscribes over unicast
        inject(
            &harness,
            vec![Entry::offer(0x0100, 0x0001, 1, 0, 3, vec![endpoint()])],
            1,
            false,
        );

        let event = harness.events.recv().await.unwrap();
        assert_eq!(
            event,
            SdEvent::ServiceAvailable {
                key: ServiceKey::new(0x0100, 0x0001),
                peer: peer(),
                endpoints: vec![endpoint()],
            }
        );

        let (sd, _, destination) = next_sd(&mut harness.outgoing).await;
        assert_eq!(destination, peer());
        assert_eq!(sd.entries[0].kind, EntryKind::SubscribeEventgroup);
        assert_eq!(sd.entries[0].eventgroup_id, 0x0001);
        assert_eq!(sd.entries[0].ttl, harness.config.subscribe_ttl);

        // the ack confirms the subscription
        inject(
            &harness,
            vec![Entry::subscribe_ack(&sd.entries[0], sd.entries[0].ttl)],
            2,
            false,
        );
        let event = harness.events.recv().await.unwrap();
        assert_eq!(
            event,
            SdEvent::SubscriptionAcked {
                key: ServiceKey::new(0x0100, 0x0001),
                eventgroup_id: 0x0001,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn server_answers_finds_and_subscribes() {
        let mut harness = harness();
        harness.engine.send(SdCommand::Offer(offered()));

        // let the initial announcement pass
        let _ = next_sd(&mut harness.outgoing).await;

        inject(&harness, vec![Entry::find(0x0100, 0xFFFF, 1, 0xFF_FFFF)], 1, false);
        let (sd, _, destination) = next_sd(&mut harness.outgoing).await;
        assert_eq!(destination, peer());
        assert_eq!(sd.entries[0].kind, EntryKind::OfferService);

        let subscribe = Entry::subscribe(0x0100, 0x0001, 1, 0x0001, 300, vec![endpoint()]);
        inject(&harness, vec![subscribe], 2, false);
        let (sd, _, destination) = next_sd(&mut harness.outgoing).await;
        assert_eq!(destination, peer());
        assert_eq!(sd.entries[0].kind, EntryKind::SubscribeEventgroupAck);
        assert_eq!(sd.entries[0].ttl, 300);
    }

    #[tokio::test(start_paused = true)]
    async fn subscribe_for_unoffered_service_is_nacked() {
        let mut harness = harness();
        let subscribe = Entry::subscribe(0x0BAD, 0x0001, 1, 0x0001, 300, vec![endpoint()]);
        inject(&harness, vec![subscribe], 1, false);

        let (sd, _, _) = next_sd(&mut harness.outgoing).await;
        assert_eq!(sd.entries[0].kind, EntryKind::SubscribeEventgroupAck);
        assert!(sd.entries[0].is_subscribe_nack());
    }

    #[tokio::test(start_paused = true)]
    async fn counter_rollover_clears_cached_peer_state() {
        let mut harness = harness();
        harness.engine.send(SdCommand::Find {
            key: ServiceKey::new(0x0100, 0x0001),
            major_version: 1,
            eventgroups: vec![],
            local_endpoint: None,
        });
        let _ = next_sd(&mut harness.outgoing).await;

        // track the peer through an offer
        inject(
            &harness,
            vec![Entry::offer(0x0100, 0x0001, 1, 0, 3, vec![endpoint()])],
            0xFFFE,
            false,
        );
        let event = harness.events.recv().await.unwrap();
        assert!(matches!(event, SdEvent::ServiceAvailable { .. }));

        // the counter rolls over with the reboot flag raised
        inject(&harness, vec![], 0xFFFF, false);
        inject(&harness, vec![], 0x0001, true);

        assert_eq!(
            harness.events.recv().await.unwrap(),
            SdEvent::ServiceUnavailable {
                key: ServiceKey::new(0x0100, 0x0001),
            }
        );
        assert_eq!(
            harness.events.recv().await.unwrap(),
            SdEvent::PeerRebooted(peer())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_withdraws_offered_services() {
        let mut harness = harness();
        harness.engine.send(SdCommand::Offer(offered()));
        let _ = next_sd(&mut harness.outgoing).await;

        harness.engine.shutdown().await;
        let (sd, _, _) = next_sd(&mut harness.outgoing).await;
        assert!(sd.entries[0].is_stop_offer());
    }
}
