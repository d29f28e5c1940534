use std::sync::Arc;
use tracing::debug;
use url::Url;

use super::{is_excluded, ProxyConfig, ProxyError, ProxyOption, Result, TargetProtocol, TargetRequest};
use crate::ports::EnvSource;

/// Picks the proxy URL for a target, if any.
///
/// Order: the override hook (authoritative, skips everything else), then the
/// exclusion list, then the per-protocol proxy, then `all_proxy`.
pub struct ProxyUrlResolver {
    config: ProxyConfig,
    env: Arc<dyn EnvSource>,
}

impl ProxyUrlResolver {
    pub fn new(config: ProxyConfig, env: Arc<dyn EnvSource>) -> Self {
        Self { config, env }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub async fn resolve(&self, target: &TargetRequest) -> Result<Option<Url>> {
        if let Some(hook) = &self.config.proxy_for_url {
            let answer = hook.proxy_for_url(target.url.as_str()).resolve().await?;
            let answer = answer
                .map(|proxy| proxy.trim().to_string())
                .filter(|proxy| !proxy.is_empty() && !proxy.eq_ignore_ascii_case("direct"));
            debug!(url = %target.url, proxy = ?answer, "override hook answered");
            return answer.map(|proxy| parse_override(&proxy)).transpose();
        }

        if let Some(pattern) = self.option(ProxyOption::NoProxy) {
            if is_excluded(&target.host(), target.port(), &pattern) {
                debug!(url = %target.url, "target excluded by no_proxy");
                return Ok(None);
            }
        }

        let selected = self
            .option(protocol_option(target.protocol))
            .or_else(|| self.option(ProxyOption::All));

        match selected {
            Some(raw) => parse_configured(&raw, target.protocol).map(Some),
            None => Ok(None),
        }
    }

    /// Explicit value if one was supplied, otherwise the environment, read now.
    fn option(&self, option: ProxyOption) -> Option<String> {
        match self.config.explicit(option) {
            Some(value) => Some(value.trim().to_string()).filter(|v| !v.is_empty()),
            None => self.env.lookup(option.env_name()),
        }
    }
}

fn protocol_option(protocol: TargetProtocol) -> ProxyOption {
    match protocol {
        TargetProtocol::Http => ProxyOption::Http,
        TargetProtocol::Https => ProxyOption::Https,
        TargetProtocol::Ws => ProxyOption::Ws,
        TargetProtocol::Wss => ProxyOption::Wss,
    }
}

fn parse_override(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| ProxyError::Configuration(format!("override returned malformed proxy URL {:?}: {}", raw, e)))?;
    require_host(url, raw)
}

/// Configured values may omit the scheme, in which case the target's is used.
fn parse_configured(raw: &str, protocol: TargetProtocol) -> Result<Url> {
    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("{}://{}", protocol, raw)
    };
    let url = Url::parse(&candidate)
        .map_err(|e| ProxyError::Configuration(format!("malformed proxy URL {:?}: {}", raw, e)))?;
    require_host(url, raw)
}

fn require_host(url: Url, raw: &str) -> Result<Url> {
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(ProxyError::Configuration(format!("proxy URL {:?} has no host", raw))),
    }
}
