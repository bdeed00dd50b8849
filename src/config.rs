//! Configuration of the routing table, the query manager and the refresh loop.

use std::time::Duration;

use crate::signal::Signal;

/// K = the default maximum size of a k-bucket.
pub const DEFAULT_K_BUCKET_SIZE: usize = 20;
/// Default liveness check timeout.
pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(10);
/// Default number of ping-eviction checks running at the same time.
pub const DEFAULT_PING_CONCURRENCY: usize = 10;
/// Default number of old contacts pinged when a full bucket receives a new contact.
pub const DEFAULT_NUMBER_OF_NODES_TO_PING: usize = 1;
/// Default protocol pings are sent on.
pub const DEFAULT_PROTOCOL: &str = "/ipfs/kad/1.0.0";

/// Default number of disjoint paths, half the bucket size rounded up.
pub const DEFAULT_DISJOINT_PATHS: usize = DEFAULT_K_BUCKET_SIZE.div_ceil(2);
/// Default number of concurrent calls per path.
pub const DEFAULT_ALPHA: usize = 3;
/// Default timeout of a whole run, when the caller provides no signal.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(60);

/// Default interval between routing table refreshes.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);
/// Default timeout of every lookup issued by a refresh.
pub const DEFAULT_REFRESH_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
/// Routing table configurations
pub struct RoutingTableConfig {
    /// Maximum number of contacts in a k-bucket.
    ///
    /// Defaults to [DEFAULT_K_BUCKET_SIZE]
    pub k_bucket_size: usize,
    /// How long to wait for an old contact to answer a ping before evicting it.
    ///
    /// Defaults to [DEFAULT_PING_TIMEOUT]
    pub ping_timeout: Duration,
    /// Maximum number of eviction checks in flight.
    ///
    /// Defaults to [DEFAULT_PING_CONCURRENCY]
    pub ping_concurrency: usize,
    /// How many of the oldest contacts of a full bucket are pinged
    /// before a new contact can replace them.
    ///
    /// Defaults to [DEFAULT_NUMBER_OF_NODES_TO_PING]
    pub number_of_nodes_to_ping: usize,
    /// Protocol passed to [crate::routing_table::Pinger::ping].
    ///
    /// Defaults to [DEFAULT_PROTOCOL]
    pub protocol: String,
}

impl Default for RoutingTableConfig {
    fn default() -> Self {
        Self {
            k_bucket_size: DEFAULT_K_BUCKET_SIZE,
            ping_timeout: DEFAULT_PING_TIMEOUT,
            ping_concurrency: DEFAULT_PING_CONCURRENCY,
            number_of_nodes_to_ping: DEFAULT_NUMBER_OF_NODES_TO_PING,
            protocol: DEFAULT_PROTOCOL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
/// Query manager configurations
pub struct QueryManagerConfig {
    /// Maximum number of disjoint paths of a single run.
    ///
    /// Defaults to [DEFAULT_DISJOINT_PATHS]
    pub disjoint_paths: usize,
    /// Maximum number of concurrent calls of the query function on each path.
    ///
    /// Defaults to [DEFAULT_ALPHA]
    pub alpha: usize,
    /// Timeout of a run when the caller does not pass its own [Signal].
    ///
    /// Defaults to [DEFAULT_QUERY_TIMEOUT]
    pub query_timeout: Duration,
    /// Timeout of every single call of the query function.
    ///
    /// Defaults to None, where calls are only bound by the run's signal.
    pub query_func_timeout: Option<Duration>,
}

impl Default for QueryManagerConfig {
    fn default() -> Self {
        Self {
            disjoint_paths: DEFAULT_DISJOINT_PATHS,
            alpha: DEFAULT_ALPHA,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            query_func_timeout: None,
        }
    }
}

#[derive(Debug, Clone)]
/// Routing table refresh configurations
pub struct RefreshConfig {
    /// Whether to periodically refresh the routing table at all.
    ///
    /// Defaults to `true`
    pub enabled: bool,
    /// Minimum time between two refreshes of the same common prefix length.
    ///
    /// Defaults to [DEFAULT_REFRESH_INTERVAL]
    pub refresh_interval: Duration,
    /// Timeout of every lookup issued by a refresh.
    ///
    /// Defaults to [DEFAULT_REFRESH_QUERY_TIMEOUT]
    pub refresh_query_timeout: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            refresh_query_timeout: DEFAULT_REFRESH_QUERY_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Default)]
/// [crate::dht::KadDht] configurations
pub struct Config {
    pub routing_table: RoutingTableConfig,
    pub query: QueryManagerConfig,
    pub refresh: RefreshConfig,
}

#[derive(Debug, Clone, Default)]
/// Per run overrides of [QueryManagerConfig].
pub struct RunOptions {
    /// Cancels the run when aborted.
    ///
    /// Defaults to None, where the run is aborted after [QueryManagerConfig::query_timeout].
    pub signal: Option<Signal>,
    /// Overrides [QueryManagerConfig::query_func_timeout] for this run.
    pub query_func_timeout: Option<Duration>,
}

impl RunOptions {
    // === Options ===

    pub fn with_signal(mut self, signal: Signal) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn with_query_func_timeout(mut self, timeout: Duration) -> Self {
        self.query_func_timeout = Some(timeout);
        self
    }
}
