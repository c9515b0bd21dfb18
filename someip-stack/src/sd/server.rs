//! The server side offer state machine

use std::time::{Duration, Instant};

use rand::Rng;
use someip_sd::{Entry, SdOption};

use crate::config::SdConfig;
use crate::sd::ServiceKey;

/// Phase of one offered service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferPhase {
    /// The service is not announced
    Down,
    /// Waiting the randomized delay before the first announcement
    InitialWait,
    /// Repeating the announcement with doubling delays; the counter holds
    /// the number of repetitions already sent
    Repetition(u32),
    /// Announcing cyclically
    Main,
    /// The service was withdrawn with a StopOfferService
    Stopped,
}

/// A service instance the local node announces
#[derive(Debug, Clone)]
pub struct OfferedService {
    /// Identity of the instance
    pub key: ServiceKey,
    /// Major version of the service interface
    pub major_version: u8,
    /// Minor version of the service interface
    pub minor_version: u32,
    /// Endpoint option clients reach the service at
    pub endpoint: SdOption,
}

/// Offer state machine of one service instance
///
/// The machine is driven by [OfferState::fire] on timer expiry and produces
/// the entries to send; it never touches a socket itself.
#[derive(Debug, Clone)]
pub struct OfferState {
    service: OfferedService,
    phase: OfferPhase,
    next_fire: Option<Instant>,
}

/// Random delay within the configured initial wait window
pub fn initial_delay(config: &SdConfig) -> Duration {
    rand::thread_rng().gen_range(config.initial_delay_min..=config.initial_delay_max)
}

impl OfferState {
    /// A machine in [OfferPhase::Down] for the given service
    pub fn new(service: OfferedService) -> Self {
        Self {
            service,
            phase: OfferPhase::Down,
            next_fire: None,
        }
    }

    /// The announced service
    pub fn service(&self) -> &OfferedService {
        &self.service
    }

    /// Current phase, mostly of diagnostic interest
    pub fn phase(&self) -> OfferPhase {
        self.phase
    }

    /// When the machine wants [OfferState::fire] called next
    pub fn next_fire(&self) -> Option<Instant> {
        self.next_fire
    }

    /// Enter the initial wait phase with the given delay
    ///
    /// Only a service that is down or stopped can be started; a second
    /// start of a running machine is ignored.
    pub fn start(&mut self, now: Instant, delay: Duration) {
        if matches!(self.phase, OfferPhase::Down | OfferPhase::Stopped) {
            self.phase = OfferPhase::InitialWait;
            self.next_fire = Some(now + delay);
        }
    }

    /// Advance on timer expiry, returning the offer entry to multicast
    pub fn fire(&mut self, config: &SdConfig, now: Instant) -> Option<Entry> {
        if self.next_fire.map(|at| now < at).unwrap_or(true) {
            return None;
        }

        match self.phase {
            OfferPhase::InitialWait => {
                if config.repetitions_max == 0 {
                    self.phase = OfferPhase::Main;
                    self.next_fire = Some(now + config.cyclic_offer_delay);
                } else {
                    self.phase = OfferPhase::Repetition(0);
                    self.next_fire = Some(now + config.repetitions_base_delay);
                }
                Some(self.offer_entry(config))
            }
            OfferPhase::Repetition(sent) => {
                let sent = sent + 1;
                if sent >= config.repetitions_max {
                    self.phase = OfferPhase::Main;
                    self.next_fire = Some(now + config.cyclic_offer_delay);
                } else {
                    self.phase = OfferPhase::Repetition(sent);
                    // doubling backoff: base, 2*base, 4*base, ...
                    self.next_fire = Some(now + config.repetitions_base_delay * 2u32.pow(sent));
                }
                Some(self.offer_entry(config))
            }
            OfferPhase::Main => {
                self.next_fire = Some(now + config.cyclic_offer_delay);
                Some(self.offer_entry(config))
            }
            OfferPhase::Down | OfferPhase::Stopped => None,
        }
    }

    /// Withdraw the service, returning the StopOfferService entry to send
    pub fn stop(&mut self, config: &SdConfig) -> Option<Entry> {
        let was_announcing = !matches!(self.phase, OfferPhase::Down | OfferPhase::Stopped);
        self.phase = OfferPhase::Stopped;
        self.next_fire = None;
        was_announcing.then(|| {
            let mut entry = self.offer_entry(config);
            entry.ttl = 0;
            entry
        })
    }

    /// The unicast reply to a FindService from a peer, if the service is
    /// already past its initial wait
    pub fn respond_to_find(&self, config: &SdConfig) -> Option<Entry> {
        matches!(self.phase, OfferPhase::Repetition(_) | OfferPhase::Main)
            .then(|| self.offer_entry(config))
    }

    fn offer_entry(&self, config: &SdConfig) -> Entry {
        Entry::offer(
            self.service.key.service_id,
            self.service.key.instance_id,
            self.service.major_version,
            self.service.minor_version,
            config.offer_ttl,
            vec![self.service.endpoint.clone()],
        )
    }
}
