use std::path::PathBuf;
use std::time::Duration;

use derive_setters::Setters;
use libdot11::EthertypeOffset;

/// Bounds and timings shared by the sniffer and its consumers.
///
/// ```
/// use dot11mux::Config;
/// use std::time::Duration;
///
/// let config = Config::default()
///     .max_aps(8)
///     .lock_wait(Duration::from_millis(5));
/// assert_eq!(config.max_aps, 8);
/// ```
#[derive(Debug, Clone, Setters)]
pub struct Config {
    /// Filter subscriptions the registry accepts.
    pub max_filters: usize,
    /// Access point table size.
    pub max_aps: usize,
    /// Global station table size.
    pub max_stations: usize,
    /// Stations tracked under a single access point.
    pub max_stations_per_ap: usize,
    /// Wait for the registry lock on the receive path.
    pub dispatch_wait: Duration,
    /// Wait for every other shared-state lock.
    pub lock_wait: Duration,
    pub ethertype_offset: EthertypeOffset,
    /// Where captured handshakes are written.
    #[setters(into)]
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_filters: 8,
            max_aps: 32,
            max_stations: 64,
            max_stations_per_ap: 16,
            dispatch_wait: Duration::from_millis(10),
            lock_wait: Duration::from_millis(20),
            ethertype_offset: EthertypeOffset::HeaderDerived,
            output_dir: PathBuf::from("."),
        }
    }
}
