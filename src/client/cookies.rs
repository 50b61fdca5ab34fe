//! Client-side cookie jar.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use axum::http::{HeaderMap, header};

/// A minimal cookie jar for the API client: stores name/value pairs from
/// Set-Cookie headers and replays them on outgoing requests. Attributes
/// other than Max-Age=0 (which removes the cookie) are ignored.
#[derive(Default)]
pub struct CookieJar {
    cookies: Mutex<BTreeMap<String, String>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.cookies.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record every Set-Cookie header from a response. An empty value or
    /// Max-Age=0 removes the cookie.
    pub fn store(&self, headers: &HeaderMap) {
        let mut cookies = self.lock();
        for value in headers.get_all(header::SET_COOKIE) {
            let Ok(raw) = value.to_str() else { continue };
            let mut parts = raw.split(';');
            let Some((name, value)) = parts.next().and_then(|p| p.split_once('=')) else {
                continue;
            };
            let name = name.trim();
            let value = value.trim();

            let expired = parts.any(|attr| {
                attr.trim()
                    .split_once('=')
                    .is_some_and(|(k, v)| k.trim().eq_ignore_ascii_case("max-age") && v.trim() == "0")
            });

            if value.is_empty() || expired {
                cookies.remove(name);
            } else {
                cookies.insert(name.to_string(), value.to_string());
            }
        }
    }

    /// Build the Cookie header for an outgoing request.
    pub fn header(&self) -> Option<String> {
        let cookies = self.lock();
        if cookies.is_empty() {
            return None;
        }
        Some(
            cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Get a single cookie value.
    pub fn get(&self, name: &str) -> Option<String> {
        self.lock().get(name).cloned()
    }

    /// Set a cookie directly (used by tests to inject crafted tokens).
    pub fn set(&self, name: &str, value: &str) {
        self.lock().insert(name.to_string(), value.to_string());
    }

    /// Drop all cookies.
    pub fn clear(&self) {
        self.lock().clear();
    }
}
