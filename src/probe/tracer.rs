//! TTL-walking route tracer.

use std::time::Instant;

use super::echo::IcmpEcho;
use super::hop::{HopObservation, HopStatus};
use super::resolve::{resolve_host, reverse_lookup};
use super::traits::{EchoProbe, ProbeError, ProbeLimits, Prober};

/// Route tracer sending one echo request per TTL value.
///
/// Stops at the first hop answered by the destination itself, or after
/// `max_hops` requests. No request is retried.
#[derive(Debug, Clone)]
pub struct Tracer<E = IcmpEcho> {
    echo: E,
    resolve_names: bool,
}

impl Tracer<IcmpEcho> {
    /// Tracer using ICMP echo requests and reverse name resolution.
    pub fn icmp() -> Self {
        Self::new(IcmpEcho::new())
    }
}

impl<E: EchoProbe> Tracer<E> {
    /// Create a tracer over an echo probe.
    pub fn new(echo: E) -> Self {
        Self {
            echo,
            resolve_names: true,
        }
    }

    /// Enable or disable reverse lookup of hop addresses.
    pub fn with_resolve_names(mut self, enabled: bool) -> Self {
        self.resolve_names = enabled;
        self
    }
}

#[async_trait::async_trait]
impl<E: EchoProbe> Prober for Tracer<E> {
    async fn probe(
        &self,
        destination: &str,
        limits: ProbeLimits,
    ) -> Result<Vec<HopObservation>, ProbeError> {
        limits.validate()?;

        let target = resolve_host(destination)
            .await
            .map_err(|source| ProbeError::Resolve {
                host: destination.to_string(),
                source,
            })?;

        let mut hops = Vec::with_capacity(usize::from(limits.max_hops));
        for ttl in 1..=limits.max_hops {
            let start = Instant::now();
            let reply = self.echo.echo(target, ttl, limits.timeout_per_hop).await?;
            let latency = start.elapsed();

            let mut hop = HopObservation::new(ttl, reply.responder, latency, reply.status);
            if self.resolve_names
                && let Some(addr) = reply.responder
                && let Some(name) = reverse_lookup(addr, limits.timeout_per_hop).await
            {
                hop = hop.with_hostname(name);
            }

            tracing::trace!(
                destination = %destination,
                hop = ttl,
                address = %hop.address_label(),
                latency_ms = hop.latency_ms(),
                status = %hop.status,
                "Hop observed"
            );

            let reached = hop.status == HopStatus::Success;
            hops.push(hop);
            if reached {
                break;
            }
        }

        tracing::debug!(
            destination = %destination,
            target = %target,
            hops = hops.len(),
            reached = hops.last().is_some_and(HopObservation::reached_destination),
            "Trace complete"
        );

        Ok(hops)
    }
}
