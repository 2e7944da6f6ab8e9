//! Client identification utilities
//!
//! Extracts the caller's IP address and User-Agent from HTTP headers.

use axum::http::{HeaderMap, header};
use std::net::IpAddr;

/// Longest User-Agent we keep; matches the storage column width
pub const MAX_USER_AGENT_LEN: usize = 255;

/// Request origin details recorded alongside attempts and tokens
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientContext {
    pub ip: Option<IpAddr>,
    pub user_agent: Option<String>,
}

impl ClientContext {
    pub fn new(ip: Option<IpAddr>, user_agent: Option<String>) -> Self {
        Self { ip, user_agent }
    }

    /// Build from request headers plus the direct peer address
    pub fn from_headers(headers: &HeaderMap, direct_ip: Option<IpAddr>) -> Self {
        Self {
            ip: extract_client_ip(headers, direct_ip),
            user_agent: extract_user_agent(headers),
        }
    }

    /// IP as string (for storage); empty when unknown
    pub fn ip_string(&self) -> String {
        self.ip.map(|ip| ip.to_string()).unwrap_or_default()
    }

    /// User-Agent as string (for storage); empty when absent
    pub fn user_agent_string(&self) -> String {
        self.user_agent.clone().unwrap_or_default()
    }
}

/// Extract the User-Agent header, truncated to [`MAX_USER_AGENT_LEN`] bytes
pub fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    let ua = headers.get(header::USER_AGENT)?.to_str().ok()?.trim();
    if ua.is_empty() {
        return None;
    }

    let mut end = ua.len().min(MAX_USER_AGENT_LEN);
    while !ua.is_char_boundary(end) {
        end -= 1;
    }
    Some(ua[..end].to_string())
}

/// Extract client IP address
///
/// Uses the first entry of X-Forwarded-For when present (reverse proxy
/// setups), otherwise the direct connection IP.
pub fn extract_client_ip(headers: &HeaderMap, direct_ip: Option<IpAddr>) -> Option<IpAddr> {
    if let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first_ip) = xff.split(',').next() {
            if let Ok(ip) = first_ip.trim().parse::<IpAddr>() {
                return Some(ip);
            }
        }
    }
    direct_ip
}
