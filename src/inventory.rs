use std::fmt;
use std::marker::PhantomData;

use libdot11::MacAddress;
use log::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::handshake::{CaptureState, HandshakeBuffer};

/// Largest SSID an access point record keeps.
pub const SSID_MAX_LEN: usize = 32;

/// Typed index into a [BoundedTable].
pub struct Handle<T> {
    index: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(index: usize) -> Self {
        Handle {
            index,
            _marker: PhantomData,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for Handle<T> {}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.index)
    }
}

/// Append-only table with a fixed capacity. Entries are only removed all at once.
#[derive(Debug)]
pub struct BoundedTable<T> {
    what: &'static str,
    capacity: usize,
    entries: Vec<T>,
}

impl<T> BoundedTable<T> {
    pub fn new(what: &'static str, capacity: usize) -> Self {
        BoundedTable {
            what,
            capacity,
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn insert(&mut self, value: T) -> Result<Handle<T>> {
        if self.is_full() {
            return Err(Error::CapacityExceeded {
                what: self.what,
                capacity: self.capacity,
            });
        }
        self.entries.push(value);
        Ok(Handle::new(self.entries.len() - 1))
    }

    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        self.entries.get(handle.index)
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.entries.get_mut(handle.index)
    }

    /// Entry by position, failing with [Error::InvalidArgument] past the end.
    pub fn at(&self, index: usize) -> Result<&T> {
        self.entries.get(index).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "{} index {index} out of range (len {})",
                self.what,
                self.entries.len()
            ))
        })
    }

    pub fn position<P>(&self, predicate: P) -> Option<Handle<T>>
    where
        P: FnMut(&T) -> bool,
    {
        self.entries.iter().position(predicate).map(Handle::new)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// An access point seen in a beacon or probe response.
#[derive(Debug)]
pub struct ApRecord {
    pub bssid: MacAddress,
    pub ssid: Vec<u8>,
    pub channel: u8,
    pub rssi: i8,
    pub handshake: HandshakeBuffer,
    stations: Vec<Handle<StationRecord>>,
}

impl ApRecord {
    pub fn new(bssid: MacAddress, ssid: &[u8], channel: u8, rssi: i8) -> Self {
        let len = ssid.len().min(SSID_MAX_LEN);
        ApRecord {
            bssid,
            ssid: ssid[..len].to_vec(),
            channel,
            rssi,
            handshake: HandshakeBuffer::default(),
            stations: Vec::new(),
        }
    }

    pub fn ssid_lossy(&self) -> String {
        String::from_utf8_lossy(&self.ssid).into_owned()
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }
}

/// A client station, with a back-reference to the access point it talks to.
#[derive(Clone, Copy, Debug)]
pub struct StationRecord {
    pub mac: MacAddress,
    pub rssi: i8,
    ap: Handle<ApRecord>,
}

impl StationRecord {
    pub fn ap(&self) -> Handle<ApRecord> {
        self.ap
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApSummary {
    pub ssid: String,
    pub bssid: MacAddress,
    pub channel: u8,
    pub rssi: i8,
    pub capture: CaptureState,
    pub station_count: usize,
}

impl fmt::Display for ApSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<32} {} ch {:>3} {:>4} dBm  hs {:<8} stations {}",
            self.ssid, self.bssid, self.channel, self.rssi, self.capture, self.station_count
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StationSummary {
    pub mac: MacAddress,
    pub rssi: i8,
    pub ap: MacAddress,
}

impl fmt::Display for StationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} {:>4} dBm", self.mac, self.ap, self.rssi)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApObservation {
    Inserted(usize),
    Updated(usize),
    /// Unknown access point without a usable SSID.
    Ignored,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StationObservation {
    Inserted,
    Updated,
    /// Seen before under another access point, now moved.
    Roamed { from: MacAddress },
    /// The access point isn't tracked, so neither is the station.
    UnknownAp,
}

/// Access points and their stations.
///
/// Each station appears in exactly one access point's list, and that access point is the
/// one its back-reference names. Records are never removed one by one, so handles stay
/// valid until [Inventory::clear].
#[derive(Debug)]
pub struct Inventory {
    aps: BoundedTable<ApRecord>,
    stations: BoundedTable<StationRecord>,
    max_stations_per_ap: usize,
}

impl Inventory {
    pub fn new(config: &Config) -> Self {
        Inventory {
            aps: BoundedTable::new("access point table", config.max_aps),
            stations: BoundedTable::new("station table", config.max_stations),
            max_stations_per_ap: config.max_stations_per_ap,
        }
    }

    pub fn find_ap(&self, bssid: &MacAddress) -> Option<Handle<ApRecord>> {
        self.aps.position(|ap| ap.bssid == *bssid)
    }

    pub fn find_station(&self, mac: &MacAddress) -> Option<Handle<StationRecord>> {
        self.stations.position(|station| station.mac == *mac)
    }

    pub fn ap_record(&self, handle: Handle<ApRecord>) -> Option<&ApRecord> {
        self.aps.get(handle)
    }

    pub fn ap_record_mut(&mut self, handle: Handle<ApRecord>) -> Option<&mut ApRecord> {
        self.aps.get_mut(handle)
    }

    /// Record an access point. The first sighting fixes SSID, BSSID and channel;
    /// later ones only refresh the signal strength.
    pub fn observe_ap(
        &mut self,
        bssid: MacAddress,
        ssid: Option<&[u8]>,
        channel: u8,
        rssi: i8,
    ) -> Result<ApObservation> {
        if let Some(handle) = self.find_ap(&bssid) {
            if let Some(ap) = self.aps.get_mut(handle) {
                ap.rssi = rssi;
            }
            return Ok(ApObservation::Updated(handle.index()));
        }

        let ssid = match ssid {
            Some(ssid) if !ssid.is_empty() => ssid,
            _ => return Ok(ApObservation::Ignored),
        };

        let record = ApRecord::new(bssid, ssid, channel, rssi);
        info!(
            "New access point {} ({bssid}) on channel {channel}",
            record.ssid_lossy()
        );
        let handle = self.aps.insert(record)?;
        Ok(ApObservation::Inserted(handle.index()))
    }

    /// Record a station talking to `bssid`, moving it if it was listed under another access point.
    pub fn observe_station(
        &mut self,
        bssid: MacAddress,
        mac: MacAddress,
        rssi: i8,
    ) -> Result<StationObservation> {
        let ap_handle = match self.find_ap(&bssid) {
            Some(handle) => handle,
            None => return Ok(StationObservation::UnknownAp),
        };

        let existing = self.find_station(&mac);
        if let Some(station_handle) = existing {
            let previous = self
                .stations
                .get(station_handle)
                .map(|station| station.ap)
                .ok_or(Error::DanglingReference {
                    from: mac,
                    what: "station",
                    index: station_handle.index(),
                })?;

            if previous == ap_handle {
                if let Some(station) = self.stations.get_mut(station_handle) {
                    station.rssi = rssi;
                }
                return Ok(StationObservation::Updated);
            }

            self.link_station(ap_handle, station_handle)?;
            let from = self.unlink_station(previous, station_handle)?;
            if let Some(station) = self.stations.get_mut(station_handle) {
                station.ap = ap_handle;
                station.rssi = rssi;
            }
            debug!("Station {mac} roamed from {from} to {bssid}");
            return Ok(StationObservation::Roamed { from });
        }

        // Check the per-AP limit before taking a global slot
        self.check_ap_room(ap_handle)?;
        let station_handle = self.stations.insert(StationRecord {
            mac,
            rssi,
            ap: ap_handle,
        })?;
        self.link_station(ap_handle, station_handle)?;
        debug!("New station {mac} under {bssid}");
        Ok(StationObservation::Inserted)
    }

    fn check_ap_room(&self, ap_handle: Handle<ApRecord>) -> Result<()> {
        let ap = self.ap_by_handle(ap_handle)?;
        if ap.stations.len() >= self.max_stations_per_ap {
            return Err(Error::CapacityExceeded {
                what: "access point station list",
                capacity: self.max_stations_per_ap,
            });
        }
        Ok(())
    }

    fn link_station(
        &mut self,
        ap_handle: Handle<ApRecord>,
        station_handle: Handle<StationRecord>,
    ) -> Result<()> {
        self.check_ap_room(ap_handle)?;
        let ap = self.ap_by_handle_mut(ap_handle)?;
        ap.stations.push(station_handle);
        Ok(())
    }

    fn unlink_station(
        &mut self,
        ap_handle: Handle<ApRecord>,
        station_handle: Handle<StationRecord>,
    ) -> Result<MacAddress> {
        let ap = self.ap_by_handle_mut(ap_handle)?;
        ap.stations.retain(|handle| *handle != station_handle);
        Ok(ap.bssid)
    }

    fn ap_by_handle(&self, handle: Handle<ApRecord>) -> Result<&ApRecord> {
        self.aps.get(handle).ok_or(Error::InvalidState(format!(
            "access point handle {} past the end of the table",
            handle.index()
        )))
    }

    fn ap_by_handle_mut(&mut self, handle: Handle<ApRecord>) -> Result<&mut ApRecord> {
        self.aps.get_mut(handle).ok_or(Error::InvalidState(format!(
            "access point handle {} past the end of the table",
            handle.index()
        )))
    }

    pub fn ap_count(&self) -> usize {
        self.aps.len()
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    pub fn ap(&self, index: usize) -> Result<ApSummary> {
        let ap = self.aps.at(index)?;
        Ok(ApSummary {
            ssid: ap.ssid_lossy(),
            bssid: ap.bssid,
            channel: ap.channel,
            rssi: ap.rssi,
            capture: ap.handshake.state(),
            station_count: ap.stations.len(),
        })
    }

    /// The `station_index`-th station listed under the `ap_index`-th access point.
    pub fn station_of_ap(&self, ap_index: usize, station_index: usize) -> Result<StationSummary> {
        let ap = self.aps.at(ap_index)?;
        let handle = *ap.stations.get(station_index).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "station index {station_index} out of range for {} ({} stations)",
                ap.bssid,
                ap.stations.len()
            ))
        })?;

        let dangling = Error::DanglingReference {
            from: ap.bssid,
            what: "station",
            index: handle.index(),
        };
        let station = self.stations.get(handle).ok_or(dangling)?;
        if self.aps.get(station.ap).map(|owner| owner.bssid) != Some(ap.bssid) {
            return Err(Error::DanglingReference {
                from: station.mac,
                what: "access point",
                index: station.ap.index(),
            });
        }

        Ok(StationSummary {
            mac: station.mac,
            rssi: station.rssi,
            ap: ap.bssid,
        })
    }

    pub fn capture_state(&self, ap_index: usize) -> Result<CaptureState> {
        Ok(self.aps.at(ap_index)?.handshake.state())
    }

    pub fn aps(&self) -> impl Iterator<Item = &ApRecord> {
        self.aps.iter()
    }

    pub fn clear(&mut self) {
        self.aps.clear();
        self.stations.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AP1: MacAddress = MacAddress([0x10, 0x20, 0x30, 0x40, 0x50, 0x60]);
    const AP2: MacAddress = MacAddress([0x10, 0x20, 0x30, 0x40, 0x50, 0x61]);
    const STA: MacAddress = MacAddress([0x02, 0x11, 0x22, 0x33, 0x44, 0x55]);

    fn sta(n: u8) -> MacAddress {
        MacAddress([0x02, 0, 0, 0, 0, n])
    }

    fn inventory() -> Inventory {
        Inventory::new(
            &Config::default()
                .max_aps(2)
                .max_stations(4)
                .max_stations_per_ap(2),
        )
    }

    #[test]
    fn test_first_sighting_wins() {
        let mut inventory = inventory();
        assert_eq!(
            inventory.observe_ap(AP1, Some(b"HomeNet"), 6, -40).unwrap(),
            ApObservation::Inserted(0)
        );
        assert_eq!(
            inventory.observe_ap(AP1, Some(b"Renamed"), 11, -70).unwrap(),
            ApObservation::Updated(0)
        );

        let ap = inventory.ap(0).unwrap();
        assert_eq!(inventory.ap_count(), 1);
        assert_eq!(ap.ssid, "HomeNet");
        assert_eq!(ap.channel, 6);
        assert_eq!(ap.rssi, -70);
        assert_eq!(ap.capture, CaptureState::Empty);
    }

    #[test]
    fn test_ap_without_ssid_is_ignored() {
        let mut inventory = inventory();
        assert_eq!(
            inventory.observe_ap(AP1, None, 6, -40).unwrap(),
            ApObservation::Ignored
        );
        assert_eq!(
            inventory.observe_ap(AP1, Some(b""), 6, -40).unwrap(),
            ApObservation::Ignored
        );
        assert_eq!(inventory.ap_count(), 0);
    }

    #[test]
    fn test_ap_capacity() {
        let mut inventory = inventory();
        inventory.observe_ap(AP1, Some(b"one"), 1, -40).unwrap();
        inventory.observe_ap(AP2, Some(b"two"), 1, -40).unwrap();
        let third = MacAddress([0x10, 0x20, 0x30, 0x40, 0x50, 0x62]);
        assert!(matches!(
            inventory.observe_ap(third, Some(b"three"), 1, -40),
            Err(Error::CapacityExceeded { capacity: 2, .. })
        ));
        assert_eq!(inventory.ap_count(), 2);
    }

    #[test]
    fn test_station_tracking() {
        let mut inventory = inventory();
        assert_eq!(
            inventory.observe_station(AP1, STA, -50).unwrap(),
            StationObservation::UnknownAp
        );

        inventory.observe_ap(AP1, Some(b"HomeNet"), 6, -40).unwrap();
        assert_eq!(
            inventory.observe_station(AP1, STA, -50).unwrap(),
            StationObservation::Inserted
        );
        assert_eq!(
            inventory.observe_station(AP1, STA, -55).unwrap(),
            StationObservation::Updated
        );

        let station = inventory.station_of_ap(0, 0).unwrap();
        assert_eq!(station.mac, STA);
        assert_eq!(station.ap, AP1);
        assert_eq!(station.rssi, -55);
        assert_eq!(inventory.station_count(), 1);
    }

    #[test]
    fn test_station_roams() {
        let mut inventory = inventory();
        inventory.observe_ap(AP1, Some(b"one"), 1, -40).unwrap();
        inventory.observe_ap(AP2, Some(b"two"), 6, -40).unwrap();

        inventory.observe_station(AP1, STA, -50).unwrap();
        assert_eq!(
            inventory.observe_station(AP2, STA, -60).unwrap(),
            StationObservation::Roamed { from: AP1 }
        );

        assert_eq!(inventory.ap(0).unwrap().station_count, 0);
        assert_eq!(inventory.ap(1).unwrap().station_count, 1);
        assert_eq!(inventory.station_of_ap(1, 0).unwrap().ap, AP2);
        assert_eq!(inventory.station_count(), 1);
    }

    #[test]
    fn test_station_limits() {
        let mut inventory = inventory();
        inventory.observe_ap(AP1, Some(b"one"), 1, -40).unwrap();
        inventory.observe_ap(AP2, Some(b"two"), 6, -40).unwrap();

        inventory.observe_station(AP1, sta(1), -50).unwrap();
        inventory.observe_station(AP1, sta(2), -50).unwrap();
        assert!(matches!(
            inventory.observe_station(AP1, sta(3), -50),
            Err(Error::CapacityExceeded { capacity: 2, .. })
        ));
        // The per-AP refusal didn't take a global slot
        assert_eq!(inventory.station_count(), 2);

        inventory.observe_station(AP2, sta(3), -50).unwrap();
        inventory.observe_station(AP2, sta(4), -50).unwrap();
        // AP2 is full, so the roam is refused and the station stays put
        assert!(inventory.observe_station(AP2, sta(1), -50).is_err());
        assert_eq!(inventory.station_of_ap(0, 0).unwrap().mac, sta(1));
    }

    #[test]
    fn test_query_out_of_range() {
        let mut inventory = inventory();
        assert!(matches!(inventory.ap(0), Err(Error::InvalidArgument(_))));

        inventory.observe_ap(AP1, Some(b"one"), 1, -40).unwrap();
        assert!(matches!(
            inventory.station_of_ap(0, 0),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            inventory.capture_state(3),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_dangling_station_reference() {
        let mut inventory = inventory();
        inventory.observe_ap(AP1, Some(b"one"), 1, -40).unwrap();
        inventory.aps.entries[0].stations.push(Handle::new(9));

        let error = inventory.station_of_ap(0, 0).unwrap_err();
        assert!(error.is_corruption());
        assert!(matches!(
            error,
            Error::DanglingReference {
                from: AP1,
                index: 9,
                ..
            }
        ));
    }

    #[test]
    fn test_clear() {
        let mut inventory = inventory();
        inventory.observe_ap(AP1, Some(b"one"), 1, -40).unwrap();
        inventory.observe_station(AP1, STA, -50).unwrap();
        inventory.clear();
        assert_eq!(inventory.ap_count(), 0);
        assert_eq!(inventory.station_count(), 0);
        assert_eq!(inventory.find_station(&STA), None);
    }
}
