use log::trace;
use strum_macros::Display;

use crate::components::FrameHeader;
use crate::frame_types::{FrameType, MgmtSubtype, Subtype};

/// EtherType of 802.1X authentication frames.
pub const EAPOL_ETHERTYPE: [u8; 2] = [0x88, 0x8e];

/// LLC/SNAP prefix in front of the EtherType of an unencrypted data frame body.
const LLC_SNAP_LEN: usize = 6;

/// The frames of a WPA2 association and 4-way handshake, in canonical order.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Display, PartialOrd, Ord)]
pub enum Stage {
    AssocReq,
    AssocRes,
    Eapol1,
    Eapol2,
    Eapol3,
    Eapol4,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::AssocReq,
        Stage::AssocRes,
        Stage::Eapol1,
        Stage::Eapol2,
        Stage::Eapol3,
        Stage::Eapol4,
    ];

    /// Position of the stage in the canonical sequence.
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(index: usize) -> Option<Stage> {
        Stage::ALL.get(index).copied()
    }

    /// Map the (sequence number, to_ds, from_ds) triple of an EAPOL frame to its
    /// message number. Messages 1 and 3 come from the AP, 2 and 4 from the station.
    pub fn from_sequence(sequence_number: u16, to_ds: bool, from_ds: bool) -> Option<Stage> {
        match (sequence_number, to_ds, from_ds) {
            (0, false, true) => Some(Stage::Eapol1),
            (0, true, false) => Some(Stage::Eapol2),
            (1, false, true) => Some(Stage::Eapol3),
            (1, true, false) => Some(Stage::Eapol4),
            _ => None,
        }
    }
}

/// Where to look for the EtherType of a data frame.
///
/// The QoS control field and the fourth address both shift the LLC/SNAP header,
/// so the offset is derived from the actual header length by default.
/// `Fixed(0x20)` reproduces the behaviour of firmware that assumes a three address
/// QoS data header for every frame.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum EthertypeOffset {
    #[default]
    HeaderDerived,
    Fixed(usize),
}

impl EthertypeOffset {
    pub fn resolve(&self, header: &FrameHeader<'_>) -> usize {
        match self {
            EthertypeOffset::HeaderDerived => header.header_len() + LLC_SNAP_LEN,
            EthertypeOffset::Fixed(offset) => *offset,
        }
    }
}

/// Recognize the frames that make up a WPA2 handshake capture.
///
/// Association requests and responses are recognized by subtype alone. EAPOL frames
/// must be data frames longer than the EtherType position plus two, with the EAPOL
/// EtherType at that position, and a sequence number / direction combination that
/// maps to one of the four messages.
pub fn eapol_stage(header: &FrameHeader<'_>, offset: EthertypeOffset) -> Option<Stage> {
    match header.subtype() {
        Subtype::Management(MgmtSubtype::AssociationRequest) => return Some(Stage::AssocReq),
        Subtype::Management(MgmtSubtype::AssociationResponse) => return Some(Stage::AssocRes),
        _ => {}
    }

    if header.frame_type() != FrameType::Data {
        return None;
    }

    let bytes = header.bytes();
    let offset = offset.resolve(header);
    let end = offset.checked_add(2)?;
    if bytes.len() <= end || bytes.get(offset..end)? != EAPOL_ETHERTYPE {
        return None;
    }

    let sequence_number = header.sequence_number()?;
    let stage = Stage::from_sequence(sequence_number, header.to_ds(), header.from_ds());
    if stage.is_none() {
        trace!(
            "EAPOL frame with sequence {sequence_number} (to_ds {}, from_ds {}) matches no stage",
            header.to_ds(),
            header.from_ds()
        );
    }
    stage
}
