use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

use libdot11::{FrameControl, FrameType, MacAddress, MgmtSubtype, SequenceControl};
use log::debug;
use parking_lot::Mutex;
use pcap_file::pcap::{PcapHeader, PcapPacket, PcapWriter};
use pcap_file::DataLink;

use crate::error::Result;

/// "Previous authentication no longer valid".
pub const DEFAULT_DEAUTH_REASON: u16 = 2;
pub const DEAUTH_LEN: usize = 26;

const DEAUTH_DURATION: u16 = 314;

const RTH_NO_ACK: [u8; 10] = [
    0x00, 0x00, /* radiotap version and padding */
    0x0a, 0x00, /* radiotap header length */
    0x00, 0x80, 0x00, 0x00, /* bitmap */
    0x28, 0x00, /* tx flags */
];

/// Build a deauthentication frame from `ap` to `station`, or to everyone when no
/// station is given.
pub fn build_deauth(ap: &MacAddress, station: Option<&MacAddress>, reason: u16) -> Vec<u8> {
    let frame_control = FrameControl::new(
        FrameType::Management,
        MgmtSubtype::Deauthentication.bits(),
        0,
    );
    let sequence_control = SequenceControl {
        fragment_number: 0,
        sequence_number: 0x0fff,
    };
    let destination = station.copied().unwrap_or_else(MacAddress::broadcast);

    let mut frame = Vec::with_capacity(DEAUTH_LEN);
    frame.extend(frame_control.encode());
    frame.extend(DEAUTH_DURATION.to_le_bytes());
    frame.extend(destination.encode());
    frame.extend(ap.encode());
    frame.extend(ap.encode());
    frame.extend(sequence_control.encode());
    frame.extend(reason.to_le_bytes());
    frame
}

/// Prefix a frame with the minimal radiotap header used for injection.
pub fn with_radiotap(frame: &[u8]) -> Vec<u8> {
    let mut rth = RTH_NO_ACK.to_vec();
    rth.extend_from_slice(frame);
    rth
}

/// Something that can put a raw 802.11 frame on the air.
pub trait Injector {
    fn inject(&self, frame: &[u8]) -> Result<()>;
}

/// Records injected frames, radiotap-prefixed, into a pcap stream instead of transmitting.
pub struct PcapInjector<W: Write> {
    writer: Mutex<PcapWriter<W>>,
}

impl<W: Write> PcapInjector<W> {
    pub fn new(writer: W) -> Result<Self> {
        let header = PcapHeader {
            datalink: DataLink::IEEE802_11_RADIOTAP,
            ..Default::default()
        };
        Ok(PcapInjector {
            writer: Mutex::new(PcapWriter::with_header(writer, header)?),
        })
    }
}

impl<W: Write> Injector for PcapInjector<W> {
    fn inject(&self, frame: &[u8]) -> Result<()> {
        let data = with_radiotap(frame);
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        self.writer
            .lock()
            .write_packet(&PcapPacket::new(timestamp, data.len() as u32, &data))?;
        debug!("Recorded {} byte frame", frame.len());
        Ok(())
    }
}
