use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use libdot11::{
    eapol_stage, EthertypeOffset, FrameType, MacAddress, MgmtSubtype, Stage, Subtype,
};
use log::{debug, error, info, trace, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::handshake::{self, CaptureOutcome, CaptureState, CapturedHandshake, HandshakeSink};
use crate::inventory::{ApObservation, ApSummary, Inventory, StationObservation, StationSummary};
use crate::lock::BoundedLock;
use crate::sniffer::{Packet, PacketConsumer, Sniffer, Subscription};

/// Subscription name the logger registers under.
pub const LOGGER_NAME: &str = "mac-logger";

/// Builds the access point and station inventory from beacons, probe responses and data
/// frames, and captures association and 4-way handshake frames per access point.
///
/// Every frame takes the inventory lock at most once. If the lock can't be taken in time
/// the frame is skipped entirely. Completed handshakes are flushed after the lock is
/// released.
pub struct MacLogger {
    inventory: BoundedLock<Inventory>,
    sink: Box<dyn HandshakeSink>,
    ethertype_offset: EthertypeOffset,
    skipped: AtomicU64,
}

impl MacLogger {
    pub fn new(config: &Config, sink: Box<dyn HandshakeSink>) -> Self {
        MacLogger {
            inventory: BoundedLock::new("inventory", config.lock_wait, Inventory::new(config)),
            sink,
            ethertype_offset: config.ethertype_offset,
            skipped: AtomicU64::new(0),
        }
    }

    /// Beacons, probe responses, association requests and responses, and every data frame.
    pub fn filter() -> Filter {
        Filter::new()
            .with_subtype(Subtype::Management(MgmtSubtype::Beacon))
            .with_subtype(Subtype::Management(MgmtSubtype::ProbeResponse))
            .with_subtype(Subtype::Management(MgmtSubtype::AssociationRequest))
            .with_subtype(Subtype::Management(MgmtSubtype::AssociationResponse))
            .with_type(FrameType::Data)
    }

    /// A subscription delivering [MacLogger::filter] matches to this logger,
    /// optionally narrowed to a single access point.
    pub fn subscription(self: &Arc<Self>, ap: Option<MacAddress>) -> Subscription {
        let mut filter = Self::filter();
        filter.ap = ap;
        Subscription::new(LOGGER_NAME, filter, self.clone())
    }

    /// Frames dropped because the inventory lock was busy.
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    /// Apply one frame to the inventory and handshake buffers.
    pub fn process(&self, packet: &Packet<'_>) -> Result<()> {
        let header = &packet.header;
        let stage = eapol_stage(header, self.ethertype_offset);

        let completed = {
            let mut inventory = self.inventory.acquire().map_err(|e| {
                self.skipped.fetch_add(1, Ordering::Relaxed);
                e
            })?;

            let observed = match header.subtype() {
                Subtype::Management(MgmtSubtype::Beacon)
                | Subtype::Management(MgmtSubtype::ProbeResponse) => {
                    Self::observe_ap(&mut inventory, packet)
                }
                Subtype::Data(_) => Self::observe_station(&mut inventory, packet),
                _ => Ok(()),
            };
            // A full station table mustn't keep the handshake from being captured
            if let Err(e) = observed {
                report(&e);
            }

            match stage {
                Some(stage) => self.capture(&mut inventory, packet, stage)?,
                None => None,
            }
        };

        if let Some(handshake) = completed {
            self.flush(&handshake)?;
        }
        Ok(())
    }

    fn observe_ap(inventory: &mut Inventory, packet: &Packet<'_>) -> Result<()> {
        let bssid = match packet.header.bssid() {
            Some(bssid) => bssid,
            None => return Ok(()),
        };

        let ssid = match libdot11::ssid(packet.bytes()) {
            Ok(ssid) => ssid,
            Err(e) => {
                trace!("No usable SSID from {bssid}: {e}");
                None
            }
        };

        match inventory.observe_ap(bssid, ssid, packet.meta.channel, packet.meta.rssi)? {
            ApObservation::Inserted(index) => debug!("{bssid} stored at index {index}"),
            ApObservation::Updated(_) | ApObservation::Ignored => {}
        }
        Ok(())
    }

    fn observe_station(inventory: &mut Inventory, packet: &Packet<'_>) -> Result<()> {
        let (bssid, station) = match (packet.header.bssid(), packet.header.station()) {
            (Some(bssid), Some(station)) => (bssid, station),
            _ => return Ok(()),
        };
        if station == bssid || !station.is_real_device() {
            return Ok(());
        }

        if let StationObservation::Roamed { from } =
            inventory.observe_station(bssid, station, packet.meta.rssi)?
        {
            info!("{station} moved from {from} to {bssid}");
        }
        Ok(())
    }

    fn capture(
        &self,
        inventory: &mut Inventory,
        packet: &Packet<'_>,
        stage: Stage,
    ) -> Result<Option<CapturedHandshake>> {
        let bssid = match packet.header.bssid() {
            Some(bssid) => bssid,
            None => return Ok(None),
        };

        let handle = match inventory.find_ap(&bssid) {
            Some(handle) => handle,
            None => {
                debug!("{stage} for untracked access point {bssid}");
                return Ok(None);
            }
        };
        let ap = inventory.ap_record_mut(handle).ok_or_else(|| {
            Error::InvalidState(format!("lost access point {bssid} at {}", handle.index()))
        })?;

        match handshake::capture(ap, stage, packet.bytes())? {
            CaptureOutcome::Completed(handshake) => Ok(Some(handshake)),
            CaptureOutcome::Stored { .. } | CaptureOutcome::Duplicate(_) => Ok(None),
        }
    }

    fn flush(&self, handshake: &CapturedHandshake) -> Result<()> {
        info!(
            "Handshake for {} ({}) complete, writing",
            handshake.ssid_lossy(),
            handshake.bssid
        );
        self.sink.flush(handshake).map_err(|e| {
            error!("Failed to write handshake for {}: {e}", handshake.ssid_lossy());
            e
        })
    }

    pub fn ap_count(&self) -> Result<usize> {
        Ok(self.inventory.acquire()?.ap_count())
    }

    pub fn station_count(&self) -> Result<usize> {
        Ok(self.inventory.acquire()?.station_count())
    }

    pub fn ap(&self, index: usize) -> Result<ApSummary> {
        self.inventory.acquire()?.ap(index)
    }

    pub fn station_of_ap(&self, ap_index: usize, station_index: usize) -> Result<StationSummary> {
        self.inventory.acquire()?.station_of_ap(ap_index, station_index)
    }

    pub fn capture_state(&self, ap_index: usize) -> Result<CaptureState> {
        self.inventory.acquire()?.capture_state(ap_index)
    }

    /// Every access point currently tracked.
    pub fn aps(&self) -> Result<Vec<ApSummary>> {
        let inventory = self.inventory.acquire()?;
        (0..inventory.ap_count())
            .map(|index| inventory.ap(index))
            .collect()
    }

    /// Channel the access point was first seen on.
    pub fn channel_of(&self, bssid: &MacAddress) -> Result<u8> {
        let inventory = self.inventory.acquire()?;
        inventory
            .find_ap(bssid)
            .and_then(|handle| inventory.ap_record(handle))
            .map(|ap| ap.channel)
            .ok_or_else(|| Error::NotFound(format!("access point {bssid}")))
    }

    pub fn clear(&self) -> Result<()> {
        self.inventory.acquire()?.clear();
        info!("Inventory cleared");
        Ok(())
    }
}

impl PacketConsumer for MacLogger {
    fn on_packet(&self, packet: &Packet<'_>) {
        if let Err(e) = self.process(packet) {
            report(&e);
        }
    }
}

fn report(e: &Error) {
    match e {
        Error::LockTimeout(_) => warn!("Skipped frame: {e}"),
        Error::CapacityExceeded { .. } => debug!("{e}"),
        e if e.is_corruption() => error!("Inventory corrupted: {e}"),
        e => warn!("{e}"),
    }
}

/// Point the sniffer at a single access point.
///
/// Replaces every subscription with one delivering that access point's frames to `logger`,
/// then relaunches capture on the channel the access point was recorded on.
pub fn retarget(sniffer: &Sniffer, logger: &Arc<MacLogger>, ap: MacAddress) -> Result<()> {
    let channel = logger.channel_of(&ap)?;

    sniffer.clear_filters()?;
    sniffer.add_filter(logger.subscription(Some(ap)))?;

    if sniffer.is_capture_active() {
        sniffer.kill()?;
    }
    sniffer.launch(channel)?;
    info!("Retargeted to {ap} on channel {channel}");
    Ok(())
}
