use super::{FrameControl, MacAddress, SequenceControl};
use crate::error::Error;
use crate::frame_types::{FrameType, Subtype};
use crate::parsers::{parse_frame_control, parse_sequence_control};

/// Length of the three address header shared by management and data frames.
pub const BASE_HEADER_LEN: usize = 24;
/// Shortest possible control frame: frame control, duration and the receiver address.
pub const CONTROL_MIN_LEN: usize = 10;

const ADDR1_OFFSET: usize = 4;
const ADDR2_OFFSET: usize = 10;
const ADDR3_OFFSET: usize = 16;
const SEQUENCE_OFFSET: usize = 22;
const ADDR4_OFFSET: usize = 24;

/// A view over the MAC header of a received frame.
///
/// Only the frame control field is decoded up front. Every other field is read from
/// the underlying buffer when it's asked for, the header never owns a copy of the frame.
///
/// The meaning of the three address fields depends on the DS flags:
///
/// | to_ds | from_ds | addr1    | addr2    | addr3       |
/// |-------|---------|----------|----------|-------------|
/// | 0     | 0       | DA       | SA       | BSSID       |
/// | 0     | 1       | DA       | BSSID    | SA          |
/// | 1     | 0       | BSSID    | SA       | DA          |
/// | 1     | 1       | RA       | TA       | DA (+ SA in addr4) |
///
/// Management frames always use the first row.
#[derive(Clone, Copy, Debug)]
pub struct FrameHeader<'a> {
    pub frame_control: FrameControl,
    bytes: &'a [u8],
}

impl<'a> FrameHeader<'a> {
    /// Refuses buffers that are shorter than the fixed header of the frame's type.
    pub fn new(bytes: &'a [u8]) -> Result<FrameHeader<'a>, Error> {
        let (_, frame_control) = parse_frame_control(bytes).map_err(|_| Error::TooShort {
            needed: 2,
            actual: bytes.len(),
        })?;

        let header = FrameHeader {
            frame_control,
            bytes,
        };

        let needed = header.min_len();
        if bytes.len() < needed {
            return Err(Error::TooShort {
                needed,
                actual: bytes.len(),
            });
        }

        Ok(header)
    }

    fn min_len(&self) -> usize {
        match self.frame_control.frame_type {
            FrameType::Control => CONTROL_MIN_LEN,
            FrameType::Data if self.frame_control.is_wds() => BASE_HEADER_LEN + 6,
            _ => BASE_HEADER_LEN,
        }
    }

    /// The whole frame this header was decoded from.
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn frame_type(&self) -> FrameType {
        self.frame_control.frame_type
    }

    pub fn subtype(&self) -> Subtype {
        self.frame_control.subtype
    }

    pub fn to_ds(&self) -> bool {
        self.frame_control.to_ds()
    }

    pub fn from_ds(&self) -> bool {
        self.frame_control.from_ds()
    }

    pub fn protected(&self) -> bool {
        self.frame_control.protected()
    }

    /// Length of the MAC header, including the fourth address and QoS control when present.
    pub fn header_len(&self) -> usize {
        match self.frame_control.frame_type {
            FrameType::Control => {
                if self.addr2().is_some() {
                    ADDR2_OFFSET + 6
                } else {
                    CONTROL_MIN_LEN
                }
            }
            FrameType::Data => {
                let mut len = BASE_HEADER_LEN;
                if self.frame_control.is_wds() {
                    len += 6;
                }
                if self.frame_control.subtype.is_qos() {
                    len += 2;
                }
                len
            }
            _ => BASE_HEADER_LEN,
        }
    }

    /// Receiver address, present in every frame.
    pub fn addr1(&self) -> MacAddress {
        MacAddress::from_slice_at(self.bytes, ADDR1_OFFSET).unwrap_or_default()
    }

    /// Transmitter address. Missing in ACK and CTS frames.
    pub fn addr2(&self) -> Option<MacAddress> {
        if let Subtype::Control(subtype) = self.frame_control.subtype {
            if !subtype.has_transmitter() {
                return None;
            }
        }
        MacAddress::from_slice_at(self.bytes, ADDR2_OFFSET)
    }

    /// Third address. Control frames don't have one.
    pub fn addr3(&self) -> Option<MacAddress> {
        if self.frame_control.frame_type == FrameType::Control {
            return None;
        }
        MacAddress::from_slice_at(self.bytes, ADDR3_OFFSET)
    }

    /// The fourth address only exists if both `from_ds` and `to_ds` is set.
    pub fn addr4(&self) -> Option<MacAddress> {
        if self.frame_control.frame_type != FrameType::Data || !self.frame_control.is_wds() {
            return None;
        }
        MacAddress::from_slice_at(self.bytes, ADDR4_OFFSET)
    }

    pub fn sequence_control(&self) -> Option<SequenceControl> {
        if self.frame_control.frame_type == FrameType::Control {
            return None;
        }
        let bytes = self.bytes.get(SEQUENCE_OFFSET..)?;
        parse_sequence_control(bytes).ok().map(|(_, sequence)| sequence)
    }

    /// The 12-bit sequence number. Control frames have none.
    pub fn sequence_number(&self) -> Option<u16> {
        self.sequence_control()
            .map(|sequence| sequence.sequence_number)
    }

    /// QoS control bytes of QoS data frames.
    pub fn qos(&self) -> Option<[u8; 2]> {
        if !self.frame_control.subtype.is_qos() {
            return None;
        }
        let offset = self.header_len() - 2;
        let bytes = self.bytes.get(offset..offset + 2)?;
        Some([bytes[0], bytes[1]])
    }

    /// Everything after the MAC header.
    pub fn body(&self) -> &'a [u8] {
        self.bytes.get(self.header_len()..).unwrap_or(&[])
    }

    /// The BSSID of the network this frame belongs to, derived from the DS flags.
    /// WDS frames and control frames don't carry one.
    pub fn bssid(&self) -> Option<MacAddress> {
        match self.frame_control.frame_type {
            FrameType::Control => None,
            FrameType::Data => match (self.to_ds(), self.from_ds()) {
                (true, false) => Some(self.addr1()),
                (false, true) => self.addr2(),
                (false, false) => self.addr3(),
                (true, true) => None,
            },
            _ => self.addr3(),
        }
    }

    /// The non-AP end of the exchange.
    ///
    /// Data frames use the DS flags: frames towards the AP were sent by the station
    /// (addr2), frames from the AP are addressed to it (addr1).
    /// Management frames use whichever of addr1/addr2 isn't the BSSID.
    pub fn station(&self) -> Option<MacAddress> {
        match self.frame_control.frame_type {
            FrameType::Control => None,
            FrameType::Data => match (self.to_ds(), self.from_ds()) {
                (true, false) => self.addr2(),
                (false, true) => Some(self.addr1()),
                (false, false) => self.addr2(),
                (true, true) => None,
            },
            _ => {
                let bssid = self.addr3();
                let transmitter = self.addr2();
                if transmitter.is_some() && transmitter == bssid {
                    Some(self.addr1())
                } else {
                    transmitter
                }
            }
        }
    }
}
