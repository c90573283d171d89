//! Hop-by-hop path probing.
//!
//! A [`Tracer`] walks the TTL from 1 upwards, sending one echo request per
//! hop through an [`EchoProbe`], until the destination answers or the hop
//! limit is exhausted.
//!
//! # Architecture
//!
//! - [`Prober`]: per-destination probe seam used by the orchestrator
//! - [`EchoProbe`]: single TTL-limited echo request (ICMP via [`IcmpEcho`])
//! - [`HopObservation`]: one reply (or silence) per TTL
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use pathwatch::probe::{ProbeLimits, Prober, Tracer};
//!
//! # async fn run() -> Result<(), pathwatch::probe::ProbeError> {
//! let tracer = Tracer::icmp();
//! let hops = tracer
//!     .probe("8.8.8.8", ProbeLimits::new(30, Duration::from_secs(3)))
//!     .await?;
//! for hop in &hops {
//!     println!("{} {}ms {}", hop.hop, hop.latency_ms(), hop.status);
//! }
//! # Ok(())
//! # }
//! ```

mod echo;
mod hop;
mod resolve;
mod tracer;
mod traits;

pub use echo::IcmpEcho;
pub use hop::{HopObservation, HopStatus};
pub use resolve::{resolve_host, reverse_lookup};
pub use tracer::Tracer;
pub use traits::{EchoProbe, EchoReply, ProbeError, ProbeLimits, Prober};
