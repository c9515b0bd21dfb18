//! The client side find and subscribe state machine

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use someip_sd::{Entry, EntryKind, SdOption};
use tracing::debug;

use crate::config::SdConfig;
use crate::sd::ServiceKey;

/// Phase of one service a client looks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindPhase {
    /// The client does not look for the service
    Down,
    /// Waiting the randomized delay before the first find
    InitialWait,
    /// Repeating the find with doubling delays
    Repetition(u32),
    /// An offer was observed; the service is tracked at a peer
    Tracking(SocketAddr),
    /// The search was cancelled
    Stopped,
}

/// State of one requested eventgroup subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubscriptionState {
    Requested,
    Acked,
}

/// Find state machine of one wanted service
///
/// Mirrors the server offer cycle: find entries are multicast with the same
/// initial wait and repetition discipline until an offer arrives, then the
/// machine tracks the offering peer and maintains its eventgroup
/// subscriptions over unicast.
#[derive(Debug)]
pub struct FindState {
    key: ServiceKey,
    major_version: u8,
    /// Endpoint option announced in subscribe entries so the server can
    /// deliver events
    local_endpoint: Option<SdOption>,
    eventgroups: Vec<u16>,
    subscriptions: HashMap<u16, SubscriptionState>,
    phase: FindPhase,
    next_fire: Option<Instant>,
    /// TTL of the tracked offer, bounding the renewal interval
    offer_ttl: u32,
}

impl FindState {
    /// A machine in [FindPhase::Down] for the given service
    pub fn new(
        key: ServiceKey,
        major_version: u8,
        eventgroups: Vec<u16>,
        local_endpoint: Option<SdOption>,
    ) -> Self {
        Self {
            key,
            major_version,
            local_endpoint,
            eventgroups,
            subscriptions: HashMap::new(),
            phase: FindPhase::Down,
            next_fire: None,
            offer_ttl: 0,
        }
    }

    /// The wanted service
    pub fn key(&self) -> ServiceKey {
        self.key
    }

    /// Current phase, mostly of diagnostic interest
    pub fn phase(&self) -> FindPhase {
        self.phase
    }

    /// When the machine wants [FindState::fire] called next
    pub fn next_fire(&self) -> Option<Instant> {
        self.next_fire
    }

    /// Whether the given eventgroup subscription was acknowledged
    pub fn is_subscribed(&self, eventgroup_id: u16) -> bool {
        self.subscriptions.get(&eventgroup_id) == Some(&SubscriptionState::Acked)
    }

    /// Enter the initial wait phase with the given delay
    pub fn start(&mut self, now: Instant, delay: Duration) {
        if matches!(self.phase, FindPhase::Down | FindPhase::Stopped) {
            self.phase = FindPhase::InitialWait;
            self.next_fire = Some(now + delay);
        }
    }

    /// Cancel the search and all subscription upkeep
    ///
    /// When the service is currently tracked, the returned entries
    /// unsubscribe from every requested eventgroup and must be sent unicast
    /// to the returned peer.
    pub fn stop(&mut self, config: &SdConfig) -> Option<(SocketAddr, Vec<Entry>)> {
        let farewell = if let FindPhase::Tracking(peer) = self.phase {
            let mut entries = self.subscribe_entries(config);
            for entry in &mut entries {
                entry.ttl = 0;
            }
            (!entries.is_empty()).then_some((peer, entries))
        } else {
            None
        };

        self.phase = FindPhase::Stopped;
        self.next_fire = None;
        self.subscriptions.clear();
        farewell
    }

    /// Advance on timer expiry
    ///
    /// While searching this yields the find entry to multicast. While
    /// tracking it yields the subscribe entries to renew over unicast to
    /// the tracked peer.
    pub fn fire(&mut self, config: &SdConfig, now: Instant) -> FireOutcome {
        if self.next_fire.map(|at| now < at).unwrap_or(true) {
            return FireOutcome::Idle;
        }

        match self.phase {
            FindPhase::InitialWait => {
                if config.repetitions_max == 0 {
                    // keep searching at the cyclic pace when no repetitions
                    // are configured
                    self.next_fire = Some(now + config.cyclic_offer_delay);
                } else {
                    self.phase = FindPhase::Repetition(0);
                    self.next_fire = Some(now + config.repetitions_base_delay);
                }
                FireOutcome::Multicast(self.find_entry())
            }
            FindPhase::Repetition(sent) => {
                let sent = sent + 1;
                if sent >= config.repetitions_max {
                    // the search stays in its final backoff until an offer
                    // arrives
                    self.next_fire = Some(now + config.cyclic_offer_delay);
                } else {
                    self.phase = FindPhase::Repetition(sent);
                    self.next_fire = Some(now + config.repetitions_base_delay * 2u32.pow(sent));
                }
                FireOutcome::Multicast(self.find_entry())
            }
            FindPhase::Tracking(peer) => {
                self.schedule_renewal(now);
                FireOutcome::Unicast(peer, self.subscribe_entries(config))
            }
            FindPhase::Down | FindPhase::Stopped => FireOutcome::Idle,
        }
    }

    /// React to an offer for this service
    ///
    /// Returns the subscribe entries to send unicast to the offering peer.
    /// A ttl 0 offer withdraws the service instead and falls back to the
    /// search.
    pub fn handle_offer(
        &mut self,
        peer: SocketAddr,
        entry: &Entry,
        config: &SdConfig,
        now: Instant,
    ) -> Option<Vec<Entry>> {
        if entry.kind != EntryKind::OfferService
            || !self.key.matches(entry.service_id, entry.instance_id)
        {
            return None;
        }
        if matches!(self.phase, FindPhase::Down | FindPhase::Stopped) {
            return None;
        }

        if entry.is_stop_offer() {
            self.handle_lost_peer(peer, config, now);
            return None;
        }

        self.phase = FindPhase::Tracking(peer);
        self.offer_ttl = entry.ttl;
        self.schedule_renewal(now);
        for eventgroup in &self.eventgroups {
            self.subscriptions
                .entry(*eventgroup)
                .or_insert(SubscriptionState::Requested);
        }
        Some(self.subscribe_entries(config))
    }

    /// React to a subscription (n)ack from the tracked peer
    pub fn handle_subscribe_ack(&mut self, entry: &Entry) -> Option<SubscribeVerdict> {
        if entry.kind != EntryKind::SubscribeEventgroupAck
            || !self.key.matches(entry.service_id, entry.instance_id)
        {
            return None;
        }

        if entry.is_subscribe_nack() {
            debug!(
                "Subscription to {:#06x}/{:#06x} rejected",
                entry.service_id, entry.eventgroup_id
            );
            self.subscriptions.remove(&entry.eventgroup_id);
            Some(SubscribeVerdict::Nacked(entry.eventgroup_id))
        } else {
            self.subscriptions
                .insert(entry.eventgroup_id, SubscriptionState::Acked);
            Some(SubscribeVerdict::Acked(entry.eventgroup_id))
        }
    }

    /// Fall back to the search after the tracked peer vanished
    ///
    /// Used for StopOfferService entries and detected peer reboots.
    pub fn handle_lost_peer(&mut self, peer: SocketAddr, config: &SdConfig, now: Instant) -> bool {
        if self.phase != FindPhase::Tracking(peer) {
            return false;
        }
        self.subscriptions.clear();
        self.phase = FindPhase::Repetition(0);
        self.next_fire = Some(now + config.repetitions_base_delay);
        true
    }

    fn find_entry(&self) -> Entry {
        Entry::find(
            self.key.service_id,
            self.key.instance_id,
            self.major_version,
            0xFF_FFFF,
        )
    }

    fn subscribe_entries(&self, config: &SdConfig) -> Vec<Entry> {
        let options = self
            .local_endpoint
            .iter()
            .cloned()
            .collect::<Vec<SdOption>>();
        self.subscriptions
            .keys()
            .map(|eventgroup| {
                Entry::subscribe(
                    self.key.service_id,
                    self.key.instance_id,
                    self.major_version,
                    *eventgroup,
                    config.subscribe_ttl,
                    options.clone(),
                )
            })
            .collect()
    }

    /// Renew subscriptions well before the offer lapses
    fn schedule_renewal(&mut self, now: Instant) {
        let ttl = Duration::from_secs(u64::from(self.offer_ttl.max(1)));
        self.next_fire = Some(now + ttl * 3 / 4);
    }
}

/// What a timer expiry of a [FindState] asks the engine to send
#[derive(Debug, PartialEq, Eq)]
pub enum FireOutcome {
    /// Nothing is due
    Idle,
    /// Multicast a find entry
    Multicast(Entry),
    /// Unicast subscribe renewals to the tracked peer
    Unicast(SocketAddr, Vec<Entry>),
}

/// Result of processing a subscribe acknowledgement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeVerdict {
    /// The eventgroup subscription is confirmed
    Acked(u16),
    /// The eventgroup subscription was rejected
    Nacked(u16),
}
