//! Core prober traits and types.

use std::net::IpAddr;
use std::time::Duration;

use thiserror::Error;

use super::hop::{HopObservation, HopStatus};

/// Errors that abort the probe of one destination.
///
/// Hop-level failures (timeouts, unreachable routers) are not errors; they
/// are recorded as [`HopStatus`] values on the returned observations.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Probe limits out of range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Destination could not be resolved to an address.
    #[error("failed to resolve '{host}': {source}")]
    Resolve {
        /// Destination as configured.
        host: String,
        /// Underlying resolver error.
        #[source]
        source: std::io::Error,
    },

    /// Probe socket could not be created or used.
    #[error("socket error: {0}")]
    Socket(#[from] std::io::Error),

    /// The probe worker stopped without producing a result.
    #[error("probe worker failed: {0}")]
    Worker(String),
}

/// Hop and time limits for one trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeLimits {
    /// Highest TTL tried.
    pub max_hops: u8,
    /// Wait per hop before recording a timeout.
    pub timeout_per_hop: Duration,
}

impl ProbeLimits {
    /// Create probe limits.
    pub fn new(max_hops: u8, timeout_per_hop: Duration) -> Self {
        Self {
            max_hops,
            timeout_per_hop,
        }
    }

    /// Reject limits that could never yield a hop.
    ///
    /// # Errors
    /// Returns `ProbeError::InvalidParameter` when `max_hops` is 0 or the
    /// timeout is zero.
    pub fn validate(&self) -> Result<(), ProbeError> {
        if self.max_hops < 1 {
            return Err(ProbeError::InvalidParameter(
                "max hops can't be lower than 1".to_string(),
            ));
        }
        if self.timeout_per_hop.is_zero() {
            return Err(ProbeError::InvalidParameter(
                "timeout per hop must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Reply to a single TTL-limited echo request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoReply {
    /// Reply classification.
    pub status: HopStatus,
    /// Address that answered, if any.
    pub responder: Option<IpAddr>,
}

impl EchoReply {
    /// Reply from `responder` with `status`.
    pub fn answered(responder: IpAddr, status: HopStatus) -> Self {
        Self {
            status,
            responder: Some(responder),
        }
    }

    /// No reply (or no usable source address).
    pub fn silent(status: HopStatus) -> Self {
        Self {
            status,
            responder: None,
        }
    }
}

/// Sends one echo request with a fixed TTL.
///
/// Implementations must give up after `timeout` and report
/// [`HopStatus::TimedOut`] rather than block.
#[async_trait::async_trait]
pub trait EchoProbe: Send + Sync + 'static {
    /// Send a single request to `target` with the given TTL.
    ///
    /// # Errors
    /// Returns `ProbeError::Socket` only when the probe cannot be sent at
    /// all (e.g. missing privileges); network-level failures are replies.
    async fn echo(&self, target: IpAddr, ttl: u8, timeout: Duration)
    -> Result<EchoReply, ProbeError>;
}

/// Discovers the hops on the path to one destination.
///
/// Implementations hold no state shared between destinations, so one prober
/// serves every worker of a cycle concurrently.
#[async_trait::async_trait]
pub trait Prober: Send + Sync + 'static {
    /// Trace the route to `destination`.
    ///
    /// On success the returned sequence is non-empty, ordered by hop distance
    /// starting at 1, and no longer than `limits.max_hops`.
    async fn probe(
        &self,
        destination: &str,
        limits: ProbeLimits,
    ) -> Result<Vec<HopObservation>, ProbeError>;
}
