//! Hop observation types.

use std::net::IpAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Placeholder written when a hop did not reveal its address.
pub const UNKNOWN_ADDRESS: &str = "N/A";

/// Outcome of a single TTL-limited echo request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum HopStatus {
    /// The destination itself answered.
    Success,
    /// An intermediate router answered (time exceeded in transit).
    TtlExpired,
    /// No reply within the per-hop timeout.
    TimedOut,
    /// The network or host was reported unreachable.
    Unreachable,
    /// Any other failure while sending or receiving.
    OtherError,
}

/// One probe response, ordered by hop distance within a trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HopObservation {
    /// Hop distance, equal to the TTL used for the request (1-based).
    pub hop: u8,
    /// Address that answered, if any.
    pub address: Option<IpAddr>,
    /// Reverse-resolved name of `address` (best effort).
    pub hostname: Option<String>,
    /// Time between sending the request and the reply (or giving up).
    pub latency: Duration,
    /// Reply classification.
    pub status: HopStatus,
}

impl HopObservation {
    /// Create an observation without a resolved name.
    pub fn new(hop: u8, address: Option<IpAddr>, latency: Duration, status: HopStatus) -> Self {
        Self {
            hop,
            address,
            hostname: None,
            latency,
            status,
        }
    }

    /// Attach a resolved host name.
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Latency in whole milliseconds.
    pub fn latency_ms(&self) -> u64 {
        crate::classify::duration_ms(self.latency)
    }

    /// Whether the hop met or exceeded `threshold_ms`.
    pub fn is_slow(&self, threshold_ms: u64) -> bool {
        self.latency_ms() >= threshold_ms
    }

    /// Whether this hop reached the destination.
    pub fn reached_destination(&self) -> bool {
        self.status == HopStatus::Success
    }

    /// Address for display, `N/A` when unknown.
    pub fn address_label(&self) -> String {
        self.address
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| UNKNOWN_ADDRESS.to_string())
    }
}
