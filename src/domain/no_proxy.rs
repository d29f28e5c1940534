//! Exclusion list matching (`NO_PROXY` semantics).
//!
//! The pattern is a list of entries separated by commas and/or whitespace:
//!
//! * `*` excludes every host.
//! * `example.com`, `.example.com` and `*.example.com` all exclude
//!   `example.com` and any of its sub-domains (dot-boundary suffix match).
//! * `host:port` restricts the entry to that port.
//! * IP literals (`10.1.2.3`, `::1`, `[::1]:443`) and CIDR blocks
//!   (`10.0.0.0/8`) match hosts written as IP literals. No DNS lookups occur.
//! * `localhost` and loopback addresses are interchangeable.
//!
//! Matching is case-insensitive and short-circuits on the first hit.

use ipnet::IpNet;
use std::net::IpAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry {
    Wildcard,
    Domain { name: String, port: Option<u16> },
    Ip { addr: IpAddr, port: Option<u16> },
    Net(IpNet),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoProxy {
    entries: Vec<Entry>,
}

impl NoProxy {
    /// Parses a pattern list. Entries that cannot be understood are skipped.
    pub fn parse(pattern: &str) -> Self {
        let entries = pattern
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|raw| !raw.is_empty())
            .filter_map(parse_entry)
            .collect();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn matches(&self, host: &str, port: u16) -> bool {
        let host = normalize_host(host);
        let host_ip = host.parse::<IpAddr>().ok();
        let host_loopback = is_loopback(&host, host_ip);

        self.entries.iter().any(|entry| match entry {
            Entry::Wildcard => true,
            Entry::Domain { name, port: wanted } => {
                port_matches(*wanted, port)
                    && (host == *name
                        || host.ends_with(&format!(".{}", name))
                        || (name == "localhost" && host_loopback))
            }
            Entry::Ip { addr, port: wanted } => {
                port_matches(*wanted, port)
                    && (host_ip == Some(*addr) || (addr.is_loopback() && host_loopback))
            }
            Entry::Net(net) => host_ip.map(|ip| net.contains(&ip)).unwrap_or(false),
        })
    }
}

/// Whether `host:port` is exempt from proxying under `pattern`.
pub fn is_excluded(host: &str, port: u16, pattern: &str) -> bool {
    NoProxy::parse(pattern).matches(host, port)
}

fn port_matches(wanted: Option<u16>, port: u16) -> bool {
    wanted.map(|p| p == port).unwrap_or(true)
}

fn normalize_host(host: &str) -> String {
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .trim_end_matches('.')
        .to_ascii_lowercase()
}

fn is_loopback(host: &str, ip: Option<IpAddr>) -> bool {
    match ip {
        Some(ip) => ip.is_loopback(),
        None => host == "localhost",
    }
}

fn parse_entry(raw: &str) -> Option<Entry> {
    if raw == "*" {
        return Some(Entry::Wildcard);
    }

    if raw.contains('/') {
        let net = raw.trim_start_matches('[').replace(']', "");
        return net.parse::<IpNet>().ok().map(Entry::Net);
    }

    // [v6] or [v6]:port
    if let Some(rest) = raw.strip_prefix('[') {
        let (addr, tail) = rest.split_once(']')?;
        let addr = addr.parse::<IpAddr>().ok()?;
        let port = match tail.strip_prefix(':') {
            Some(p) => Some(p.parse().ok()?),
            None if tail.is_empty() => None,
            None => return None,
        };
        return Some(Entry::Ip { addr, port });
    }

    // Bare IPv6 literals cannot carry a port.
    if let Ok(addr) = raw.parse::<IpAddr>() {
        return Some(Entry::Ip { addr, port: None });
    }

    let (host, port) = match raw.rsplit_once(':') {
        Some((host, port)) => (host, Some(port.parse::<u16>().ok()?)),
        None => (raw, None),
    };

    if let Ok(addr) = host.parse::<IpAddr>() {
        return Some(Entry::Ip { addr, port });
    }

    let name = host
        .trim_start_matches('*')
        .trim_start_matches('.')
        .trim_end_matches('.')
        .to_ascii_lowercase();
    if name.is_empty() {
        return None;
    }
    Some(Entry::Domain { name, port })
}
