use std::io::Write;
use std::time::UNIX_EPOCH;

use libdot11::{FrameType, MgmtSubtype, Subtype};
use log::error;
use pcap_file::pcap::{PcapHeader, PcapPacket, PcapWriter};
use pcap_file::DataLink;
use strum_macros::{Display, EnumIter, EnumString};

use crate::error::Result;
use crate::filter::Filter;
use crate::queue::OwnedPacket;

/// Which frames a raw dump keeps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum DumpSelector {
    All,
    Management,
    Control,
    Data,
    /// Beacons and probe responses.
    Beacons,
    /// Association frames plus every data frame, enough to recover a handshake.
    Handshake,
}

impl DumpSelector {
    pub fn filter(&self) -> Filter {
        match self {
            DumpSelector::All => Filter::new()
                .with_type(FrameType::Management)
                .with_type(FrameType::Control)
                .with_type(FrameType::Data),
            DumpSelector::Management => Filter::new().with_type(FrameType::Management),
            DumpSelector::Control => Filter::new().with_type(FrameType::Control),
            DumpSelector::Data => Filter::new().with_type(FrameType::Data),
            DumpSelector::Beacons => Filter::new()
                .with_subtype(Subtype::Management(MgmtSubtype::Beacon))
                .with_subtype(Subtype::Management(MgmtSubtype::ProbeResponse)),
            DumpSelector::Handshake => Filter::new()
                .with_subtype(Subtype::Management(MgmtSubtype::AssociationRequest))
                .with_subtype(Subtype::Management(MgmtSubtype::AssociationResponse))
                .with_type(FrameType::Data),
        }
    }
}

/// Writes raw 802.11 frames to a pcap stream. Meant to run behind a
/// [QueuedConsumer](crate::queue::QueuedConsumer) so disk writes stay off the receive path.
pub struct RawDumper<W: Write> {
    writer: PcapWriter<W>,
    written: usize,
}

impl<W: Write> RawDumper<W> {
    pub fn new(writer: W) -> Result<Self> {
        let header = PcapHeader {
            datalink: DataLink::IEEE802_11,
            ..Default::default()
        };
        Ok(RawDumper {
            writer: PcapWriter::with_header(writer, header)?,
            written: 0,
        })
    }

    pub fn write(&mut self, packet: &OwnedPacket) -> Result<()> {
        let timestamp = packet
            .timestamp
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let original_len = packet.data.len().max(packet.meta.sig_len as usize) as u32;
        self.writer
            .write_packet(&PcapPacket::new(timestamp, original_len, &packet.data))?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }

    /// A queue handler writing every frame, logging failures.
    pub fn into_handler(mut self) -> impl FnMut(OwnedPacket) + Send
    where
        W: Send,
    {
        move |packet| {
            if let Err(e) = self.write(&packet) {
                error!("Failed to dump frame: {e}");
            }
        }
    }
}
