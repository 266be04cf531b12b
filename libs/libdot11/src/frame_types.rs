use std::fmt;

use strum_macros::Display;

/// Enum with all frame types.
/// The discriminant is the two-bit value found in bits 2-3 of the first frame control byte.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Display)]
pub enum FrameType {
    Management = 0,
    Control = 1,
    Data = 2,
    Extension = 3,
}

impl FrameType {
    pub const ALL: [FrameType; 4] = [
        FrameType::Management,
        FrameType::Control,
        FrameType::Data,
        FrameType::Extension,
    ];

    /// Only the lowest two bits are considered.
    pub fn from_bits(bits: u8) -> FrameType {
        match bits & 0b11 {
            0 => FrameType::Management,
            1 => FrameType::Control,
            2 => FrameType::Data,
            _ => FrameType::Extension,
        }
    }

    pub fn bits(&self) -> u8 {
        *self as u8
    }
}

/// Management frame subtypes.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Display)]
pub enum MgmtSubtype {
    AssociationRequest,
    AssociationResponse,
    ReassociationRequest,
    ReassociationResponse,
    ProbeRequest,
    ProbeResponse,
    TimingAdvertisement,
    Beacon,
    Atim,
    Disassociation,
    Authentication,
    Deauthentication,
    Action,
    ActionNoAck,
    Reserved(u8),
}

impl MgmtSubtype {
    /// Get the subtype from a 4-bit integer (bit 4-7 of the first byte).
    pub fn from_bits(bits: u8) -> MgmtSubtype {
        match bits & 0x0f {
            0 => MgmtSubtype::AssociationRequest,
            1 => MgmtSubtype::AssociationResponse,
            2 => MgmtSubtype::ReassociationRequest,
            3 => MgmtSubtype::ReassociationResponse,
            4 => MgmtSubtype::ProbeRequest,
            5 => MgmtSubtype::ProbeResponse,
            6 => MgmtSubtype::TimingAdvertisement,
            8 => MgmtSubtype::Beacon,
            9 => MgmtSubtype::Atim,
            10 => MgmtSubtype::Disassociation,
            11 => MgmtSubtype::Authentication,
            12 => MgmtSubtype::Deauthentication,
            13 => MgmtSubtype::Action,
            14 => MgmtSubtype::ActionNoAck,
            other => MgmtSubtype::Reserved(other),
        }
    }

    pub fn bits(&self) -> u8 {
        match self {
            MgmtSubtype::AssociationRequest => 0,
            MgmtSubtype::AssociationResponse => 1,
            MgmtSubtype::ReassociationRequest => 2,
            MgmtSubtype::ReassociationResponse => 3,
            MgmtSubtype::ProbeRequest => 4,
            MgmtSubtype::ProbeResponse => 5,
            MgmtSubtype::TimingAdvertisement => 6,
            MgmtSubtype::Beacon => 8,
            MgmtSubtype::Atim => 9,
            MgmtSubtype::Disassociation => 10,
            MgmtSubtype::Authentication => 11,
            MgmtSubtype::Deauthentication => 12,
            MgmtSubtype::Action => 13,
            MgmtSubtype::ActionNoAck => 14,
            MgmtSubtype::Reserved(bits) => *bits & 0x0f,
        }
    }
}

/// Control frame subtypes.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Display)]
pub enum ControlSubtype {
    Trigger,
    Tack,
    BeamformingReportPoll,
    NdpAnnouncement,
    ControlFrameExtension,
    ControlWrapper,
    BlockAckRequest,
    BlockAck,
    PsPoll,
    Rts,
    Cts,
    Ack,
    CfEnd,
    CfEndCfAck,
    Reserved(u8),
}

impl ControlSubtype {
    pub fn from_bits(bits: u8) -> ControlSubtype {
        match bits & 0x0f {
            2 => ControlSubtype::Trigger,
            3 => ControlSubtype::Tack,
            4 => ControlSubtype::BeamformingReportPoll,
            5 => ControlSubtype::NdpAnnouncement,
            6 => ControlSubtype::ControlFrameExtension,
            7 => ControlSubtype::ControlWrapper,
            8 => ControlSubtype::BlockAckRequest,
            9 => ControlSubtype::BlockAck,
            10 => ControlSubtype::PsPoll,
            11 => ControlSubtype::Rts,
            12 => ControlSubtype::Cts,
            13 => ControlSubtype::Ack,
            14 => ControlSubtype::CfEnd,
            15 => ControlSubtype::CfEndCfAck,
            other => ControlSubtype::Reserved(other),
        }
    }

    pub fn bits(&self) -> u8 {
        match self {
            ControlSubtype::Trigger => 2,
            ControlSubtype::Tack => 3,
            ControlSubtype::BeamformingReportPoll => 4,
            ControlSubtype::NdpAnnouncement => 5,
            ControlSubtype::ControlFrameExtension => 6,
            ControlSubtype::ControlWrapper => 7,
            ControlSubtype::BlockAckRequest => 8,
            ControlSubtype::BlockAck => 9,
            ControlSubtype::PsPoll => 10,
            ControlSubtype::Rts => 11,
            ControlSubtype::Cts => 12,
            ControlSubtype::Ack => 13,
            ControlSubtype::CfEnd => 14,
            ControlSubtype::CfEndCfAck => 15,
            ControlSubtype::Reserved(bits) => *bits & 0x0f,
        }
    }

    /// Control frames that carry a transmitter address (addr2) after the receiver address.
    pub fn has_transmitter(&self) -> bool {
        !matches!(
            self,
            ControlSubtype::Cts | ControlSubtype::Ack | ControlSubtype::Reserved(_)
        )
    }
}

/// Data frame subtypes.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Display)]
pub enum DataSubtype {
    Data,
    DataCfAck,
    DataCfPoll,
    DataCfAckCfPoll,
    NullData,
    CfAck,
    CfPoll,
    CfAckCfPoll,
    QosData,
    QosDataCfAck,
    QosDataCfPoll,
    QosDataCfAckCfPoll,
    QosNull,
    QosCfPoll,
    QosCfAckCfPoll,
    Reserved(u8),
}

impl DataSubtype {
    pub fn from_bits(bits: u8) -> DataSubtype {
        match bits & 0x0f {
            0 => DataSubtype::Data,
            1 => DataSubtype::DataCfAck,
            2 => DataSubtype::DataCfPoll,
            3 => DataSubtype::DataCfAckCfPoll,
            4 => DataSubtype::NullData,
            5 => DataSubtype::CfAck,
            6 => DataSubtype::CfPoll,
            7 => DataSubtype::CfAckCfPoll,
            8 => DataSubtype::QosData,
            9 => DataSubtype::QosDataCfAck,
            10 => DataSubtype::QosDataCfPoll,
            11 => DataSubtype::QosDataCfAckCfPoll,
            12 => DataSubtype::QosNull,
            14 => DataSubtype::QosCfPoll,
            15 => DataSubtype::QosCfAckCfPoll,
            other => DataSubtype::Reserved(other),
        }
    }

    pub fn bits(&self) -> u8 {
        match self {
            DataSubtype::Data => 0,
            DataSubtype::DataCfAck => 1,
            DataSubtype::DataCfPoll => 2,
            DataSubtype::DataCfAckCfPoll => 3,
            DataSubtype::NullData => 4,
            DataSubtype::CfAck => 5,
            DataSubtype::CfPoll => 6,
            DataSubtype::CfAckCfPoll => 7,
            DataSubtype::QosData => 8,
            DataSubtype::QosDataCfAck => 9,
            DataSubtype::QosDataCfPoll => 10,
            DataSubtype::QosDataCfAckCfPoll => 11,
            DataSubtype::QosNull => 12,
            DataSubtype::QosCfPoll => 14,
            DataSubtype::QosCfAckCfPoll => 15,
            DataSubtype::Reserved(bits) => *bits & 0x0f,
        }
    }

    /// The QoS subtypes all have bit 3 of the subtype set, which adds
    /// two bytes of QoS control to the header.
    pub fn is_qos(&self) -> bool {
        !matches!(self, DataSubtype::Reserved(_)) && self.bits() & 0b1000 != 0
    }
}

/// The subtype of a frame. Its meaning depends on the [FrameType], so the
/// type is carried along in the variant.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Subtype {
    Management(MgmtSubtype),
    Control(ControlSubtype),
    Data(DataSubtype),
    Extension(u8),
}

impl fmt::Display for Subtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subtype::Management(subtype) => write!(f, "{subtype}"),
            Subtype::Control(subtype) => write!(f, "{subtype}"),
            Subtype::Data(subtype) => write!(f, "{subtype}"),
            Subtype::Extension(bits) => write!(f, "Extension({bits})"),
        }
    }
}

impl Subtype {
    pub fn new(frame_type: FrameType, bits: u8) -> Subtype {
        match frame_type {
            FrameType::Management => Subtype::Management(MgmtSubtype::from_bits(bits)),
            FrameType::Control => Subtype::Control(ControlSubtype::from_bits(bits)),
            FrameType::Data => Subtype::Data(DataSubtype::from_bits(bits)),
            FrameType::Extension => Subtype::Extension(bits & 0x0f),
        }
    }

    pub fn frame_type(&self) -> FrameType {
        match self {
            Subtype::Management(_) => FrameType::Management,
            Subtype::Control(_) => FrameType::Control,
            Subtype::Data(_) => FrameType::Data,
            Subtype::Extension(_) => FrameType::Extension,
        }
    }

    /// The raw 4-bit subtype value.
    pub fn bits(&self) -> u8 {
        match self {
            Subtype::Management(subtype) => subtype.bits(),
            Subtype::Control(subtype) => subtype.bits(),
            Subtype::Data(subtype) => subtype.bits(),
            Subtype::Extension(bits) => *bits & 0x0f,
        }
    }

    pub fn is_qos(&self) -> bool {
        matches!(self, Subtype::Data(subtype) if subtype.is_qos())
    }
}
