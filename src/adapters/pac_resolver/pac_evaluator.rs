use crate::domain::{ProxyError, Result};
use js_sandbox::{JsValue, Script};
use url::Url;

const PAC_UTILS: &str = include_str!("../../pac_utils.js");

/// Evaluate a PAC file and return the proxy URL for a target, `None` meaning direct
pub fn evaluate_pac(pac_file: &str, url: &Url) -> Result<Option<String>> {
    let pac_payload = format!("{}\n{}", pac_file, PAC_UTILS);

    let mut script = Script::from_string(&pac_payload)
        .map_err(|e| ProxyError::ResolutionFailed(format!("PAC script error: {}", e)))?;

    let host = url
        .host_str()
        .ok_or_else(|| ProxyError::InvalidUri("Missing host".into()))?;

    let eval_result: JsValue = script
        .call("FindProxyForURL", (url.to_string(), host.to_string()))
        .map_err(|e| ProxyError::ResolutionFailed(format!("PAC execution error: {}", e)))?;

    let directives = match eval_result {
        JsValue::String(s) => s,
        JsValue::Null => String::new(),
        other => other.to_string(),
    };

    Ok(parse_directives(&directives).into_iter().next().flatten())
}

/// Map a `FindProxyForURL` answer to proxy URLs, one per usable directive
///
/// `DIRECT` becomes `None`. Directives this crate cannot carry are skipped.
pub fn parse_directives(result: &str) -> Vec<Option<String>> {
    result
        .split(';')
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .filter_map(|v| {
            let parts: Vec<&str> = v.split_whitespace().collect();
            let scheme = match parts.first().map(|p| p.to_ascii_uppercase()).as_deref() {
                Some("DIRECT") => return Some(None),
                Some("PROXY") => "http",
                Some("HTTPS") => "https",
                Some("SOCKS") | Some("SOCKS5") => "socks5",
                Some("SOCKS4") => "socks4",
                _ => return None,
            };
            parts.get(1).map(|addr| Some(format!("{}://{}", scheme, addr)))
        })
        .collect()
}
