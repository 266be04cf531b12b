use crate::frame_types::*;

#[inline]
/// Mini helper to check, whether a bit is set or not.
fn flag_is_set(data: u8, bit: u8) -> bool {
    data & (1 << bit) > 0
}

/// The very first two bytes of every frame contain the FrameControl header.
///
/// First byte:
///
/// - **bit_0-1**: Protocol version. Always 0 so far.
/// - **bit_2-3**: [FrameType]
/// - **bit_4-7**: [Subtype], interpreted against the frame type.
///
/// Second byte (Flags):
/// - **bit_0** `to_ds`: Set if the frame is headed to the distribution system.
/// - **bit_1** `from_ds`: Set if the frame comes from the distribution system.
/// - **bit_2** `more_frag`: More fragments of this frame follow.
/// - **bit_3** `retry`: The frame is a retransmission.
/// - **bit_4** `power_mgmt`: Power mode the station will be in after this frame.
/// - **bit_5** `more_data`: The AP has more frames buffered for a dozing station.
/// - **bit_6** `protected`: The frame body is encrypted.
/// - **bit_7** `order`: Strictly ordered service class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameControl {
    pub protocol_version: u8,
    pub frame_type: FrameType,
    pub subtype: Subtype,
    pub flags: u8,
}

impl FrameControl {
    pub fn new(frame_type: FrameType, subtype_bits: u8, flags: u8) -> Self {
        FrameControl {
            protocol_version: 0,
            frame_type,
            subtype: Subtype::new(frame_type, subtype_bits),
            flags,
        }
    }

    pub fn to_ds(&self) -> bool {
        flag_is_set(self.flags, 0)
    }

    pub fn from_ds(&self) -> bool {
        flag_is_set(self.flags, 1)
    }

    pub fn more_frag(&self) -> bool {
        flag_is_set(self.flags, 2)
    }

    pub fn retry(&self) -> bool {
        flag_is_set(self.flags, 3)
    }

    pub fn pwr_mgmt(&self) -> bool {
        flag_is_set(self.flags, 4)
    }

    pub fn more_data(&self) -> bool {
        flag_is_set(self.flags, 5)
    }

    pub fn protected(&self) -> bool {
        flag_is_set(self.flags, 6)
    }

    pub fn order(&self) -> bool {
        flag_is_set(self.flags, 7)
    }

    /// Both DS flags set: a four address (WDS/mesh) frame.
    pub fn is_wds(&self) -> bool {
        self.to_ds() && self.from_ds()
    }

    pub fn encode(&self) -> [u8; 2] {
        let protocol_version_bits = self.protocol_version & 0b11; // 2 bits
        let frame_type_bits = (self.frame_type.bits() & 0b11) << 2; // 2 bits
        let subtype_bits = (self.subtype.bits() & 0b1111) << 4; // 4 bits

        [subtype_bits | frame_type_bits | protocol_version_bits, self.flags]
    }
}
