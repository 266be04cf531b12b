use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use libdot11::{FrameHeader, FrameType, Subtype};
use log::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::lock::BoundedLock;

/// Lowest and highest channel the receive path can be tuned to.
pub const MIN_CHANNEL: u8 = 1;
pub const MAX_CHANNEL: u8 = 11;

/// Receive metadata delivered with each frame by the radio.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RxMeta {
    /// Length of the frame as received.
    pub sig_len: u16,
    pub channel: u8,
    pub rssi: i8,
    /// Non-zero when the hardware flagged the frame as malformed.
    pub rx_state: u8,
}

/// A frame on its way to the consumers: the decoded header plus receive metadata.
///
/// The buffer belongs to the receive path and is reused once dispatch returns,
/// consumers copy out whatever they need to keep.
#[derive(Clone, Copy, Debug)]
pub struct Packet<'a> {
    pub header: FrameHeader<'a>,
    pub meta: RxMeta,
}

impl<'a> Packet<'a> {
    pub fn bytes(&self) -> &'a [u8] {
        self.header.bytes()
    }

    pub fn frame_type(&self) -> FrameType {
        self.header.frame_type()
    }

    pub fn subtype(&self) -> Subtype {
        self.header.subtype()
    }
}

/// Anything that wants to be handed matching frames.
pub trait PacketConsumer: Send + Sync {
    fn on_packet(&self, packet: &Packet<'_>);
}

impl<F> PacketConsumer for F
where
    F: Fn(&Packet<'_>) + Send + Sync,
{
    fn on_packet(&self, packet: &Packet<'_>) {
        self(packet)
    }
}

/// A filter and the consumer its matches are delivered to.
#[derive(Clone)]
pub struct Subscription {
    pub name: String,
    pub filter: Filter,
    consumer: Arc<dyn PacketConsumer>,
}

impl Subscription {
    pub fn new(name: impl Into<String>, filter: Filter, consumer: Arc<dyn PacketConsumer>) -> Self {
        Subscription {
            name: name.into(),
            filter,
            consumer,
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("name", &self.name)
            .field("filter", &self.filter)
            .finish()
    }
}

/// The promiscuous receive facility. Only one channel can be listened to at a time.
pub trait Radio: Send + Sync {
    fn start(&self, channel: u8) -> Result<()>;
    fn stop(&self) -> Result<()>;
}

/// A radio that doesn't touch any hardware, for replaying captures.
#[derive(Debug, Default)]
pub struct NullRadio;

impl Radio for NullRadio {
    fn start(&self, channel: u8) -> Result<()> {
        debug!("Null radio tuned to channel {channel}");
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct DispatchStats {
    /// Every frame handed to dispatch.
    pub received: AtomicU64,
    /// Frames that matched at least one subscription.
    pub dispatched: AtomicU64,
    /// Consumer callbacks invoked.
    pub deliveries: AtomicU64,
    /// Frames dropped because the registry lock couldn't be taken in time.
    pub dropped_lock: AtomicU64,
    /// Frames dropped as hardware-flagged or too short to decode.
    pub dropped_malformed: AtomicU64,
}

impl DispatchStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            dropped_lock: self.dropped_lock.load(Ordering::Relaxed),
            dropped_malformed: self.dropped_malformed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub received: u64,
    pub dispatched: u64,
    pub deliveries: u64,
    pub dropped_lock: u64,
    pub dropped_malformed: u64,
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Frames: {} | Dispatched: {} | Deliveries: {} | Dropped (lock): {} | Dropped (malformed): {}",
            self.received, self.dispatched, self.deliveries, self.dropped_lock, self.dropped_malformed
        )
    }
}

/// The filter registry and the dispatch engine around it.
///
/// Dispatch holds the registry lock for the whole fan-out of a frame, so a concurrent
/// `add_filter` or `clear_filters` is seen either before or after a frame, never halfway.
pub struct Sniffer {
    registry: BoundedLock<Vec<Subscription>>,
    capture: BoundedLock<()>,
    max_filters: usize,
    dispatch_wait: std::time::Duration,
    radio: Box<dyn Radio>,
    running: AtomicBool,
    channel: AtomicU8,
    stats: DispatchStats,
}

impl Sniffer {
    pub fn new(config: &Config, radio: Box<dyn Radio>) -> Self {
        Sniffer {
            registry: BoundedLock::new("filter registry", config.lock_wait, Vec::new()),
            capture: BoundedLock::new("capture control", config.lock_wait, ()),
            max_filters: config.max_filters,
            dispatch_wait: config.dispatch_wait,
            radio,
            running: AtomicBool::new(false),
            channel: AtomicU8::new(0),
            stats: DispatchStats::default(),
        }
    }

    /// Append a subscription. Duplicates are allowed and each receives its own copy of a frame.
    pub fn add_filter(&self, subscription: Subscription) -> Result<()> {
        let mut registry = self.registry.acquire().map_err(|e| {
            error!("Timeout trying to add filter {}", subscription.name);
            e
        })?;

        if registry.len() >= self.max_filters {
            error!("Filter list full, dropping {}", subscription.name);
            return Err(Error::CapacityExceeded {
                what: "filter registry",
                capacity: self.max_filters,
            });
        }

        info!(
            "Filter {} [{}] added ({}/{})",
            subscription.name,
            subscription.filter,
            registry.len() + 1,
            self.max_filters
        );
        registry.push(subscription);
        Ok(())
    }

    pub fn clear_filters(&self) -> Result<()> {
        let mut registry = self.registry.acquire()?;
        registry.clear();
        info!("Filter list cleared");
        Ok(())
    }

    pub fn filter_count(&self) -> Result<usize> {
        Ok(self.registry.acquire()?.len())
    }

    /// Names of the registered subscriptions, in insertion order.
    pub fn filter_names(&self) -> Result<Vec<String>> {
        Ok(self
            .registry
            .acquire()?
            .iter()
            .map(|subscription| subscription.name.clone())
            .collect())
    }

    /// Start listening on `channel`.
    pub fn launch(&self, channel: u8) -> Result<()> {
        if !(MIN_CHANNEL..=MAX_CHANNEL).contains(&channel) {
            error!("Tried to launch with invalid channel {channel}");
            return Err(Error::InvalidArgument(format!(
                "channel {channel} outside {MIN_CHANNEL}..={MAX_CHANNEL}"
            )));
        }

        let _capture = self.capture.acquire()?;
        if self.running.load(Ordering::SeqCst) {
            error!("Tried to launch but is already running");
            return Err(Error::InvalidState("capture already running".to_string()));
        }

        self.radio.start(channel)?;
        self.channel.store(channel, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);

        info!(
            "Launched on channel {channel} with {}/{} filters",
            self.filter_count().unwrap_or_default(),
            self.max_filters
        );
        Ok(())
    }

    pub fn kill(&self) -> Result<()> {
        let _capture = self.capture.acquire()?;
        if !self.running.load(Ordering::SeqCst) {
            error!("Killed but not running");
            return Err(Error::InvalidState("capture not running".to_string()));
        }

        self.running.store(false, Ordering::SeqCst);
        self.channel.store(0, Ordering::SeqCst);
        info!("Killed");
        self.radio.stop()
    }

    pub fn is_capture_active(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// The channel capture is running on, if any.
    pub fn channel(&self) -> Option<u8> {
        match self.channel.load(Ordering::SeqCst) {
            0 => None,
            channel => Some(channel),
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Deliver one received frame to every matching subscription, exactly once each.
    ///
    /// Returns the number of consumers the frame was delivered to. Frames that can't be
    /// decoded, or that arrive while the registry is busy for longer than the dispatch
    /// wait, are dropped as a whole and counted.
    pub fn dispatch(&self, bytes: &[u8], meta: RxMeta) -> Result<usize> {
        self.stats.received.fetch_add(1, Ordering::Relaxed);

        if meta.rx_state != 0 {
            self.stats.dropped_malformed.fetch_add(1, Ordering::Relaxed);
            return Err(Error::InvalidArgument(format!(
                "malformed frame, rx state {}",
                meta.rx_state
            )));
        }

        let header = match libdot11::decode(bytes) {
            Ok(header) => header,
            Err(e) => {
                self.stats.dropped_malformed.fetch_add(1, Ordering::Relaxed);
                return Err(e.into());
            }
        };
        let packet = Packet { header, meta };

        let registry = match self.registry.acquire_for(self.dispatch_wait) {
            Ok(registry) => registry,
            Err(e) => {
                self.stats.dropped_lock.fetch_add(1, Ordering::Relaxed);
                warn!("Timeout trying to dispatch packet");
                return Err(e);
            }
        };

        let mut delivered = 0;
        for subscription in registry.iter() {
            if subscription.filter.matches(&packet.header) {
                subscription.consumer.on_packet(&packet);
                delivered += 1;
            }
        }
        drop(registry);

        if delivered > 0 {
            self.stats.dispatched.fetch_add(1, Ordering::Relaxed);
            self.stats
                .deliveries
                .fetch_add(delivered as u64, Ordering::Relaxed);
        }
        Ok(delivered)
    }
}
