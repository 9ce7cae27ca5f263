use crate::ComError;
use std::str::FromStr;

/// Which side of the pub/sub link this endpoint plays.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Publish,
    Subscribe,
}

impl FromStr for Role {
    type Err = ComError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PUB" => Ok(Role::Publish),
            "SUB" => Ok(Role::Subscribe),
            other => Err(ComError::Config(format!(
                "unknown socket type {other:?} (expected PUB or SUB)"
            ))),
        }
    }
}

/// Configuration for a message bus endpoint.
#[derive(Clone, Debug)]
pub struct BusConfig {
    endpoint: String,
    role: Role,
    bind: bool,
    subscribe: String,
}

impl BusConfig {
    /// Create a config for the given endpoint and role.
    ///
    /// Defaults: connect (not bind), empty subscription filter (match all).
    pub fn new(endpoint: impl Into<String>, role: Role) -> Self {
        Self {
            endpoint: endpoint.into(),
            role,
            bind: false,
            subscribe: String::new(),
        }
    }

    /// Bind to the endpoint instead of connecting to it.
    pub fn with_bind(mut self, bind: bool) -> Self {
        self.bind = bind;
        self
    }

    /// Set the subscription prefix filter (subscribe role only).
    /// An empty filter matches every message.
    pub fn with_subscribe(mut self, subscribe: impl Into<String>) -> Self {
        self.subscribe = subscribe.into();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn bind(&self) -> bool {
        self.bind
    }

    pub fn subscribe(&self) -> &str {
        &self.subscribe
    }

    /// Resolve the endpoint to a plain TCP address.
    ///
    /// Accepts an optional `tcp://` prefix; any other scheme is rejected.
    pub fn tcp_addr(&self) -> Result<&str, ComError> {
        if let Some(rest) = self.endpoint.strip_prefix("tcp://") {
            return Ok(rest);
        }
        if self.endpoint.contains("://") {
            return Err(ComError::Endpoint(format!(
                "unsupported scheme in {:?} (only tcp:// is supported)",
                self.endpoint
            )));
        }
        Ok(&self.endpoint)
    }
}
