//! Options to configure the pieces of the stack

use std::net::Ipv4Addr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The multicast group service discovery uses by default
pub const SD_MULTICAST_GROUP: Ipv4Addr = Ipv4Addr::new(224, 244, 224, 245);

/// The UDP port service discovery uses by default
pub const SD_PORT: u16 = 30490;

/// Options to configure a UDP transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UdpConfig {
    /// Whether the receive loop blocks on the socket or polls it
    pub blocking: bool,
    /// Size of the receive buffer; also caps the largest datagram the
    /// receive loop accepts
    pub receive_buffer_size: usize,
    /// Requested size of the kernel send buffer
    pub send_buffer_size: usize,
    /// Request SO_REUSEADDR on the socket where the runtime supports it
    pub reuse_address: bool,
    /// Request SO_REUSEPORT on the socket where the runtime supports it
    pub reuse_port: bool,
    /// Allow sending to broadcast addresses
    pub enable_broadcast: bool,
    /// Local interface used for multicast sends and joins
    pub multicast_interface: Ipv4Addr,
    /// TTL of outgoing multicast datagrams
    pub multicast_ttl: u32,
    /// Largest SOME/IP frame accepted on this transport
    pub max_message_size: usize,
    /// Number of consecutive receive failures after which the transport
    /// reports the peer unreachable and shuts down
    pub max_consecutive_errors: u32,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            blocking: true,
            receive_buffer_size: 65_507,
            send_buffer_size: 65_507,
            reuse_address: true,
            reuse_port: false,
            enable_broadcast: false,
            multicast_interface: Ipv4Addr::UNSPECIFIED,
            multicast_ttl: 1,
            max_message_size: 1400,
            max_consecutive_errors: 5,
        }
    }
}

/// Options to configure segmentation and reassembly
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TpConfig {
    /// Largest payload slice carried by a single segment; slices of all
    /// segments except the final one are additionally rounded down to a
    /// multiple of 16 bytes
    pub max_segment_size: usize,
    /// How long an incomplete reassembly may sit idle before it is dropped
    pub reassembly_timeout: Duration,
    /// Cap on the buffered bytes of one reassembly context
    pub max_buffer_per_context: usize,
}

impl Default for TpConfig {
    fn default() -> Self {
        Self {
            max_segment_size: 1388,
            reassembly_timeout: Duration::from_secs(5),
            max_buffer_per_context: 64 * 1024,
        }
    }
}

/// Options to configure the service discovery engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdConfig {
    /// Lower bound of the random delay before the first offer or find
    pub initial_delay_min: Duration,
    /// Upper bound of the random delay before the first offer or find
    pub initial_delay_max: Duration,
    /// Delay before the first repetition; doubled for every further one
    pub repetitions_base_delay: Duration,
    /// Number of repetitions before the cyclic phase starts
    pub repetitions_max: u32,
    /// Interval of the cyclic offer announcements
    pub cyclic_offer_delay: Duration,
    /// Lifetime announced in offer entries
    pub offer_ttl: u32,
    /// Lifetime requested in subscribe entries
    pub subscribe_ttl: u32,
    /// Multicast group the engine announces on
    pub multicast_group: Ipv4Addr,
    /// UDP port the engine announces on
    pub port: u16,
}

impl Default for SdConfig {
    fn default() -> Self {
        Self {
            initial_delay_min: Duration::from_millis(10),
            initial_delay_max: Duration::from_millis(100),
            repetitions_base_delay: Duration::from_millis(200),
            repetitions_max: 3,
            cyclic_offer_delay: Duration::from_secs(1),
            offer_ttl: 3,
            subscribe_ttl: 300,
            multicast_group: SD_MULTICAST_GROUP,
            port: SD_PORT,
        }
    }
}
