//! Host extraction from gateway-supplied endpoint strings.

use crate::driver::connection::error::{Error, Result};

/// Returns the host component of `endpoint`.
///
/// Endpoints handed over by the main gateway may carry a scheme, a path, or
/// a port which does not match the port the voice server actually listens
/// on; only the host survives.
pub(crate) fn host(endpoint: &str) -> Result<&str> {
    let rest = endpoint
        .split_once("://")
        .map_or(endpoint, |(_, tail)| tail);
    let rest = rest.split(['/', '?']).next().unwrap_or(rest);

    let host = match rest.rsplit_once(':') {
        Some((head, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) =>
            head,
        _ => rest,
    };

    if host.is_empty() {
        Err(Error::MalformedEndpoint)
    } else {
        Ok(host)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bare_host_passes_through() {
        assert_eq!(host("eu-west42.voice.example.gg").unwrap(), "eu-west42.voice.example.gg");
    }

    #[test]
    fn port_suffix_is_stripped() {
        assert_eq!(host("eu-west42.voice.example.gg:80").unwrap(), "eu-west42.voice.example.gg");
    }

    #[test]
    fn scheme_and_path_are_stripped() {
        assert_eq!(host("wss://eu-west42.voice.example.gg:443/?v=3").unwrap(), "eu-west42.voice.example.gg");
    }

    #[test]
    fn non_numeric_suffix_is_not_a_port() {
        assert_eq!(host("localhost:port").unwrap(), "localhost:port");
    }

    #[test]
    fn empty_host_is_rejected() {
        assert!(matches!(host(""), Err(Error::MalformedEndpoint)));
        assert!(matches!(host("wss://:443"), Err(Error::MalformedEndpoint)));
    }
}
