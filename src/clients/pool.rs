//! Client pools: where each attempt is sent.
//!
//! The GraphQL client takes a [`PoolLease`] from its pool at the start of
//! every attempt, and hands it back to [`ClientPool::refresh`] after a
//! transient network failure so the pool can move away from a bad backend.
//!
//! # Overview
//!
//! - [`ClientPool`]: the pool contract
//! - [`PoolLease`]: endpoint, host and transport for one attempt
//! - [`DefaultClientPool`]: a single backend; refresh is a no-op
//! - [`RotatingClientPool`]: several backends, rotated on failure with a
//!   per-backend quarantine
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use gql_transport::clients::{HttpClient, RotatingClientPool};
//! use gql_transport::EndpointUrl;
//!
//! let transport = Arc::new(HttpClient::new(&config)?);
//! let pool = RotatingClientPool::builder()
//!     .backend(EndpointUrl::new("https://10.0.0.1/graphql")?, transport.clone())
//!     .backend(EndpointUrl::new("https://10.0.0.2/graphql")?, transport)
//!     .logical_host("api.internal")
//!     .quarantine(Duration::from_secs(30))
//!     .build()?;
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::clients::errors::PoolExhaustedError;
use crate::clients::http_client::HttpTransport;
use crate::config::EndpointUrl;
use crate::error::ConfigError;

/// The backend chosen for one attempt.
///
/// Endpoint, host and transport always describe the same backend. The
/// generation identifies the pool state the lease was taken from and is
/// handed back to [`ClientPool::refresh`] when the attempt fails.
#[derive(Clone, Debug)]
pub struct PoolLease {
    /// The endpoint URL the request is sent to.
    pub endpoint: String,
    /// The host stamped on the request.
    pub host: String,
    /// The transport that performs the exchange.
    pub transport: Arc<dyn HttpTransport>,
    generation: u64,
}

impl PoolLease {
    /// Creates a lease at generation zero.
    #[must_use]
    pub fn new(
        endpoint: impl Into<String>,
        host: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            host: host.into(),
            transport,
            generation: 0,
        }
    }

    /// Sets the generation the lease was taken at.
    #[must_use]
    pub const fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// Returns the generation the lease was taken at.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

/// Supplies the endpoint, transport and host for each attempt.
pub trait ClientPool: Send + Sync + fmt::Debug {
    /// The logical host stamped on requests.
    fn host(&self) -> String;

    /// The endpoint URL requests are sent to.
    fn endpoint(&self) -> String;

    /// The backend for the next attempt.
    fn acquire(&self) -> PoolLease;

    /// Called after a transient failure on `lease`, with a description of
    /// the failure. A lease from an older generation must not move the pool.
    ///
    /// # Errors
    ///
    /// Returns [`PoolExhaustedError`] if no backend is left to try.
    fn refresh(&self, lease: &PoolLease, reason: &str) -> Result<(), PoolExhaustedError>;
}

/// A pool with a single backend.
///
/// The host is the endpoint's authority unless overridden.
#[derive(Debug)]
pub struct DefaultClientPool {
    endpoint: EndpointUrl,
    transport: Arc<dyn HttpTransport>,
    host: String,
}

impl DefaultClientPool {
    /// Creates a pool for one endpoint.
    #[must_use]
    pub fn new(endpoint: EndpointUrl, transport: Arc<dyn HttpTransport>) -> Self {
        let host = endpoint.authority();
        Self {
            endpoint,
            transport,
            host,
        }
    }

    /// Overrides the host stamped on requests.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }
}

impl ClientPool for DefaultClientPool {
    fn host(&self) -> String {
        self.host.clone()
    }

    fn endpoint(&self) -> String {
        self.endpoint.as_str().to_string()
    }

    fn acquire(&self) -> PoolLease {
        PoolLease::new(
            self.endpoint.as_str(),
            self.host.clone(),
            Arc::clone(&self.transport),
        )
    }

    fn refresh(&self, _lease: &PoolLease, reason: &str) -> Result<(), PoolExhaustedError> {
        tracing::debug!(
            endpoint = %self.endpoint,
            reason,
            "single-backend pool has nothing to rotate to"
        );
        Ok(())
    }
}

#[derive(Debug)]
struct Backend {
    endpoint: EndpointUrl,
    transport: Arc<dyn HttpTransport>,
}

#[derive(Debug)]
struct RotationState {
    current: usize,
    generation: u64,
    quarantined_until: Vec<Option<Instant>>,
}

/// A pool that rotates between backends on failure.
///
/// `refresh` quarantines the backend the failed lease was taken from and
/// moves to the next backend (in insertion order, wrapping) whose quarantine
/// has expired. With a zero quarantine this is plain round robin.
///
/// Every rotation starts a new generation. A failure reported on a lease
/// from an earlier generation has already been acted on, so it leaves the
/// pool untouched and the caller simply retries on the current backend.
#[derive(Debug)]
pub struct RotatingClientPool {
    backends: Vec<Backend>,
    logical_host: Option<String>,
    quarantine: Duration,
    state: Mutex<RotationState>,
}

// Verify RotatingClientPool is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<RotatingClientPool>();
};

impl RotatingClientPool {
    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> RotatingClientPoolBuilder {
        RotatingClientPoolBuilder::default()
    }

    /// Returns the number of backends.
    #[must_use]
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// Returns `true` if the pool has no backends. A built pool always has at
    /// least one.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Returns the index of the backend currently in use.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.state.lock().current
    }

    /// Returns `true` if the backend at `index` is quarantined right now.
    #[must_use]
    pub fn is_quarantined(&self, index: usize) -> bool {
        let now = Instant::now();
        self.state
            .lock()
            .quarantined_until
            .get(index)
            .copied()
            .flatten()
            .is_some_and(|until| until > now)
    }

    fn current(&self) -> &Backend {
        let index = self.state.lock().current;
        &self.backends[index]
    }

    fn host_for(&self, backend: &Backend) -> String {
        self.logical_host
            .clone()
            .unwrap_or_else(|| backend.endpoint.authority())
    }
}

impl ClientPool for RotatingClientPool {
    fn host(&self) -> String {
        self.host_for(self.current())
    }

    fn endpoint(&self) -> String {
        self.current().endpoint.as_str().to_string()
    }

    fn acquire(&self) -> PoolLease {
        let (index, generation) = {
            let state = self.state.lock();
            (state.current, state.generation)
        };
        let backend = &self.backends[index];
        PoolLease::new(
            backend.endpoint.as_str(),
            self.host_for(backend),
            Arc::clone(&backend.transport),
        )
        .with_generation(generation)
    }

    fn refresh(&self, lease: &PoolLease, reason: &str) -> Result<(), PoolExhaustedError> {
        let now = Instant::now();
        let count = self.backends.len();
        let mut state = self.state.lock();

        if lease.generation() != state.generation {
            tracing::debug!(
                endpoint = %lease.endpoint,
                lease_generation = lease.generation(),
                generation = state.generation,
                reason,
                "failure on a backend the pool already rotated away from"
            );
            return Ok(());
        }

        let failed = state.current;
        state.quarantined_until[failed] = Some(now + self.quarantine);

        for offset in 1..=count {
            let candidate = (failed + offset) % count;
            let available = state.quarantined_until[candidate].map_or(true, |until| until <= now);
            if available {
                state.current = candidate;
                state.generation += 1;
                tracing::warn!(
                    from = %self.backends[failed].endpoint,
                    to = %self.backends[candidate].endpoint,
                    reason,
                    "rotating client pool"
                );
                return Ok(());
            }
        }

        tracing::warn!(backends = count, reason, "client pool exhausted");
        Err(PoolExhaustedError {
            backends: count,
            reason: reason.to_string(),
        })
    }
}

/// Builder for [`RotatingClientPool`].
///
/// # Defaults
///
/// - `logical_host`: `None` (each backend's own authority)
/// - `quarantine`: zero (round robin)
#[derive(Debug, Default)]
pub struct RotatingClientPoolBuilder {
    backends: Vec<Backend>,
    logical_host: Option<String>,
    quarantine: Duration,
}

impl RotatingClientPoolBuilder {
    /// Adds a backend. Backends are tried in the order they are added.
    #[must_use]
    pub fn backend(mut self, endpoint: EndpointUrl, transport: Arc<dyn HttpTransport>) -> Self {
        self.backends.push(Backend {
            endpoint,
            transport,
        });
        self
    }

    /// Stamps the same host on requests to every backend.
    #[must_use]
    pub fn logical_host(mut self, host: impl Into<String>) -> Self {
        self.logical_host = Some(host.into());
        self
    }

    /// Sets how long a failed backend is skipped.
    #[must_use]
    pub const fn quarantine(mut self, quarantine: Duration) -> Self {
        self.quarantine = quarantine;
        self
    }

    /// Builds the pool.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequiredField`] if no backend was added.
    pub fn build(self) -> Result<RotatingClientPool, ConfigError> {
        if self.backends.is_empty() {
            return Err(ConfigError::MissingRequiredField { field: "backends" });
        }

        let state = RotationState {
            current: 0,
            generation: 0,
            quarantined_until: vec![None; self.backends.len()],
        };

        Ok(RotatingClientPool {
            backends: self.backends,
            logical_host: self.logical_host,
            quarantine: self.quarantine,
            state: Mutex::new(state),
        })
    }
}
