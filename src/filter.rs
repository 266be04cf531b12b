use std::fmt;

use libdot11::{FrameHeader, FrameType, MacAddress, Subtype};

use crate::error::{Error, Result};

/// Which frames a subscription wants to see.
///
/// A filter matches a frame iff the frame type is in the type mask, the subtype is in
/// the subtype mask of that type, and every address constraint that is set equals the
/// corresponding field of the frame:
///
/// - `ap` against the BSSID (derived from the DS flags, addr3 for management frames)
/// - `src` against addr2
/// - `dst` against addr1
///
/// A constraint on a field the frame doesn't carry never matches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Filter {
    type_mask: u8,
    subtype_masks: [u16; 4],
    pub ap: Option<MacAddress>,
    pub src: Option<MacAddress>,
    pub dst: Option<MacAddress>,
}

impl Filter {
    /// An empty filter. It doesn't match anything until types are added.
    pub fn new() -> Self {
        Filter::default()
    }

    /// Every management and data frame.
    pub fn all() -> Self {
        Filter::new()
            .with_type(FrameType::Management)
            .with_type(FrameType::Data)
    }

    pub fn with_type(mut self, frame_type: FrameType) -> Self {
        let index = frame_type.bits() as usize;
        self.type_mask |= 1 << index;
        self.subtype_masks[index] = u16::MAX;
        self
    }

    pub fn with_subtype(mut self, subtype: Subtype) -> Self {
        let index = subtype.frame_type().bits() as usize;
        self.type_mask |= 1 << index;
        self.subtype_masks[index] |= 1 << subtype.bits();
        self
    }

    /// Add a type and optionally one subtype given as raw wire values.
    /// Without a subtype every subtype of the type is accepted.
    pub fn with_raw(self, type_bits: u8, subtype_bits: Option<u8>) -> Result<Self> {
        if type_bits > 3 {
            return Err(Error::InvalidArgument(format!(
                "frame type {type_bits} out of range"
            )));
        }
        let frame_type = FrameType::from_bits(type_bits);

        match subtype_bits {
            None => Ok(self.with_type(frame_type)),
            Some(bits) if bits < 16 => Ok(self.with_subtype(Subtype::new(frame_type, bits))),
            Some(bits) => Err(Error::InvalidArgument(format!(
                "subtype {bits} out of range"
            ))),
        }
    }

    pub fn with_ap(mut self, ap: MacAddress) -> Self {
        self.ap = Some(ap);
        self
    }

    pub fn with_src(mut self, src: MacAddress) -> Self {
        self.src = Some(src);
        self
    }

    pub fn with_dst(mut self, dst: MacAddress) -> Self {
        self.dst = Some(dst);
        self
    }

    pub fn accepts_type(&self, frame_type: FrameType) -> bool {
        self.type_mask & (1 << frame_type.bits()) != 0
    }

    pub fn accepts_subtype(&self, subtype: Subtype) -> bool {
        let index = subtype.frame_type().bits() as usize;
        self.accepts_type(subtype.frame_type())
            && self.subtype_masks[index] & (1 << subtype.bits()) != 0
    }

    pub fn matches(&self, header: &FrameHeader<'_>) -> bool {
        if !self.accepts_subtype(header.subtype()) {
            return false;
        }

        if let Some(ap) = self.ap {
            if header.bssid() != Some(ap) {
                return false;
            }
        }

        if let Some(src) = self.src {
            if header.addr2() != Some(src) {
                return false;
            }
        }

        if let Some(dst) = self.dst {
            if header.addr1() != dst {
                return false;
            }
        }

        true
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for frame_type in FrameType::ALL {
            if !self.accepts_type(frame_type) {
                continue;
            }
            if !first {
                write!(f, "|")?;
            }
            first = false;
            let mask = self.subtype_masks[frame_type.bits() as usize];
            if mask == u16::MAX {
                write!(f, "{frame_type}")?;
            } else {
                write!(f, "{frame_type}({mask:#06x})")?;
            }
        }
        if first {
            write!(f, "none")?;
        }

        let fields = [("ap", self.ap), ("src", self.src), ("dst", self.dst)];
        for (name, address) in fields {
            if let Some(address) = address {
                write!(f, " {name}={address}")?;
            }
        }
        Ok(())
    }
}
