mod machine;
mod transport;
mod websocket;

pub use machine::{ConnectionState, Effect, FeedConnection, DEFAULT_RECONNECT_DELAY, LIVENESS_PROBE};
pub use transport::{FeedConnector, FeedLink, LinkEvent};
pub use websocket::WsConnector;

use anyhow::{Result, bail};
use reqwest::Url;

pub const DEFAULT_FEED_PATH: &str = "/ws";

/// Derives the feed socket URL from the dashboard origin: `wss` when the
/// origin is served over TLS, `ws` otherwise, same host and port.
pub fn feed_url(origin: &Url, path: &str) -> Result<Url> {
    let scheme = match origin.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => bail!("unsupported dashboard origin scheme '{other}'"),
    };

    let mut url = origin.clone();
    if url.set_scheme(scheme).is_err() {
        bail!("cannot derive feed url from '{origin}'");
    }
    url.set_path(path);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin(s: &str) -> Url {
        s.parse().unwrap()
    }

    #[test]
    fn test_plain_origin_uses_ws() {
        let url = feed_url(&origin("http://127.0.0.1:8000"), DEFAULT_FEED_PATH).unwrap();
        assert_eq!(url.as_str(), "ws://127.0.0.1:8000/ws");
    }

    #[test]
    fn test_secure_origin_uses_wss() {
        let url = feed_url(&origin("https://coast.example.org/dashboard?x=1#top"), "/ws").unwrap();
        assert_eq!(url.as_str(), "wss://coast.example.org/ws");
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(feed_url(&origin("ftp://example.org"), "/ws").is_err());
    }
}
