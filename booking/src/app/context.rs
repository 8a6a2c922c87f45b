use std::net::IpAddr;

/// Who sent a request, as far as the guards care.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Rate-limit identifier (client IP)
    pub client_id: String,
    /// User-Agent header
    pub user_agent: String,
    /// Request path
    pub path: String,
}

impl RequestContext {
    /// Context for a request from `ip`.
    #[must_use]
    pub fn new(ip: IpAddr, user_agent: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            client_id: ip.to_string(),
            user_agent: user_agent.into(),
            path: path.into(),
        }
    }
}
