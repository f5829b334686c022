//! Round-robin selection of the outbound network identity.
//!
//! Spreads provider-bound requests across a configured pool of egress
//! proxies so no single address absorbs all the traffic. With zero or one
//! entries there is nothing to rotate and callers get a direct client.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use reqwest::Client;

/// Entries matching these substrings mean "use the local network path":
/// they stay in rotation but degrade to a direct client when drawn.
const LOCAL_MARKERS: [&str; 2] = ["localhost", "127.0.0.1"];

pub struct EgressRotator {
    queue: Mutex<VecDeque<String>>,
}

impl EgressRotator {
    pub fn new(proxies: Vec<String>) -> Self {
        Self {
            queue: Mutex::new(proxies.into()),
        }
    }

    /// Draw the next egress endpoint, rotating it to the back of the queue.
    /// `None` means "go direct": the pool is too small to rotate or the
    /// drawn entry is a local/bypass marker.
    pub fn next_endpoint(&self) -> Option<String> {
        let mut queue = self.queue.lock().unwrap();
        if queue.len() <= 1 {
            return None;
        }

        let next = queue.pop_front()?;
        queue.push_back(next.clone());

        if LOCAL_MARKERS.iter().any(|m| next.contains(m)) {
            return None;
        }

        Some(next)
    }

    /// Build an HTTP client for one outbound call, routed through the next
    /// endpoint in rotation when one is available.
    pub fn next_client(&self, timeout: Duration) -> Client {
        if let Some(endpoint) = self.next_endpoint() {
            match proxied_client(&endpoint, timeout) {
                Some(client) => {
                    tracing::debug!(endpoint = %endpoint, "routing request through egress proxy");
                    return client;
                }
                None => {
                    tracing::warn!(endpoint = %endpoint, "unusable proxy entry, going direct");
                }
            }
        }

        direct_client(timeout)
    }
}

fn proxied_client(endpoint: &str, timeout: Duration) -> Option<Client> {
    let proxy = reqwest::Proxy::all(endpoint).ok()?;
    Client::builder().proxy(proxy).timeout(timeout).build().ok()
}

/// Plain client with a per-request timeout, no proxy.
pub fn direct_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_round_robin_order() {
        let rotator = EgressRotator::new(vec![
            "http://p1:8080".to_string(),
            "http://p2:8080".to_string(),
            "http://p3:8080".to_string(),
        ]);

        let draws: Vec<_> = (0..4).map(|_| rotator.next_endpoint().unwrap()).collect();
        assert_eq!(
            draws,
            vec![
                "http://p1:8080",
                "http://p2:8080",
                "http://p3:8080",
                "http://p1:8080"
            ]
        );
    }

    #[test]
    fn empty_and_single_pools_go_direct() {
        assert!(EgressRotator::new(vec![]).next_endpoint().is_none());

        let single = EgressRotator::new(vec!["http://p1:8080".to_string()]);
        assert!(single.next_endpoint().is_none());
        assert!(single.next_endpoint().is_none());
    }

    #[test]
    fn local_entries_bypass_but_stay_in_rotation() {
        let rotator = EgressRotator::new(vec![
            "http://localhost:9050".to_string(),
            "http://p2:8080".to_string(),
        ]);

        // Drawing the local entry degrades to direct but keeps rotating.
        assert!(rotator.next_endpoint().is_none());
        assert_eq!(rotator.next_endpoint().as_deref(), Some("http://p2:8080"));
        assert!(rotator.next_endpoint().is_none());
        assert_eq!(rotator.next_endpoint().as_deref(), Some("http://p2:8080"));
    }

    #[test]
    fn next_client_never_panics_on_bad_entries() {
        let rotator = EgressRotator::new(vec![
            "not a url".to_string(),
            "http://p2:8080".to_string(),
        ]);
        let _ = rotator.next_client(Duration::from_secs(5));
        let _ = rotator.next_client(Duration::from_secs(5));
    }
}
