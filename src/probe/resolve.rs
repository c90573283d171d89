//! Forward and reverse name resolution for probe targets.

use std::net::IpAddr;
use std::time::Duration;

/// Resolve hostname to IP address.
pub async fn resolve_host(host: &str) -> Result<IpAddr, std::io::Error> {
    // First, try to parse as an IP address directly
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }

    // Otherwise, resolve the hostname using tokio's DNS lookup
    let addrs = tokio::net::lookup_host(format!("{host}:0")).await?;
    addrs
        .into_iter()
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses found"))
}

/// Best-effort reverse lookup of a hop address.
///
/// Returns `None` when the lookup fails, times out, or only yields the
/// numeric form of the address.
pub async fn reverse_lookup(addr: IpAddr, limit: Duration) -> Option<String> {
    let lookup = tokio::task::spawn_blocking(move || dns_lookup::lookup_addr(&addr));

    match tokio::time::timeout(limit, lookup).await {
        Ok(Ok(Ok(name))) if name != addr.to_string() => Some(name),
        Ok(Ok(Ok(_))) => None,
        Ok(Ok(Err(e))) => {
            tracing::trace!(address = %addr, error = %e, "No reverse name for hop");
            None
        }
        Ok(Err(e)) => {
            tracing::debug!(address = %addr, error = %e, "Reverse lookup task failed");
            None
        }
        Err(_) => {
            tracing::debug!(address = %addr, "Reverse lookup timed out");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_host_ipv4() {
        let ip = resolve_host("192.0.2.7").await.unwrap();
        assert_eq!(ip, IpAddr::V4(std::net::Ipv4Addr::new(192, 0, 2, 7)));
    }

    #[tokio::test]
    async fn test_resolve_host_ipv6() {
        let ip = resolve_host("::1").await.unwrap();
        assert_eq!(ip, IpAddr::V6(std::net::Ipv6Addr::LOCALHOST));
    }

    #[tokio::test]
    async fn test_reverse_lookup_loopback() {
        let name = reverse_lookup(IpAddr::V4(std::net::Ipv4Addr::LOCALHOST), Duration::from_secs(1))
            .await;
        assert!(name.is_some_and(|n| n != "127.0.0.1"));
    }

    #[tokio::test]
    async fn test_resolve_host_localhost_name() {
        let ip = resolve_host("localhost").await.unwrap();
        assert!(ip.is_loopback());
    }
}
