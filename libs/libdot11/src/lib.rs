/// Libdot11's own [Error](error::Error) implementation
pub mod error;
/// Header components: frame control, sequence control, addresses and the header view.
pub mod components;
/// Recognition of the association and 4-way handshake frames.
pub mod eapol;
/// Enums representing frame types and frame subtypes.
mod frame_types;
/// [nom] parsers for internal usage.
pub mod parsers;

use crate::error::Error;

// Re-exports for user convenience
pub use crate::components::{FrameControl, FrameHeader, MacAddress, MacParseError, SequenceControl};
pub use crate::eapol::{eapol_stage, EthertypeOffset, Stage};
pub use crate::frame_types::*;
pub use crate::parsers::ssid;

use byteorder::{ByteOrder, LE};
use crc::{Crc, CRC_32_ISO_HDLC};

// CRC algorithm for FCS calculation
const CRC_32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Decode the MAC header of a raw 802.11 frame.
///
/// The returned [FrameHeader] borrows `input`; nothing besides the two frame control
/// bytes is copied.
pub fn decode(input: &[u8]) -> Result<FrameHeader<'_>, Error> {
    FrameHeader::new(input)
}

/// Frame type and subtype of a raw frame.
pub fn classify(input: &[u8]) -> Result<(FrameType, Subtype), Error> {
    let header = decode(input)?;
    Ok((header.frame_type(), header.subtype()))
}

/// `(to_ds, from_ds)` straight from the flags byte. Only the frame control field is needed.
pub fn direction_flags(input: &[u8]) -> Result<(bool, bool), Error> {
    match input.get(1) {
        Some(flags) => Ok((flags & 0x01 != 0, flags & 0x02 != 0)),
        None => Err(Error::TooShort {
            needed: 2,
            actual: input.len(),
        }),
    }
}

/// addr1 to addr4 of a frame. Fields the frame doesn't carry are `None`.
pub type Addresses = (
    MacAddress,
    Option<MacAddress>,
    Option<MacAddress>,
    Option<MacAddress>,
);

pub fn addresses(input: &[u8]) -> Result<Addresses, Error> {
    let header = decode(input)?;
    Ok((header.addr1(), header.addr2(), header.addr3(), header.addr4()))
}

/// Verify the trailing frame check sequence and return the frame without it.
pub fn strip_fcs(input: &[u8]) -> Result<&[u8], Error> {
    if input.len() < 4 {
        return Err(Error::TooShort {
            needed: 4,
            actual: input.len(),
        });
    }

    // Split the input into frame data and FCS
    let (frame_data, fcs_bytes) = input.split_at(input.len() - 4);

    let computed = CRC_32.checksum(frame_data);

    // The FCS is transmitted little endian.
    let received = LE::read_u32(fcs_bytes);

    if computed != received {
        return Err(Error::FcsMismatch { computed, received });
    }

    Ok(frame_data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fcs() {
        let frame = [0xd4, 0x00, 0x00, 0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66];
        let fcs = CRC_32.checksum(&frame).to_le_bytes();

        let mut with_fcs = frame.to_vec();
        with_fcs.extend_from_slice(&fcs);

        assert_eq!(strip_fcs(&with_fcs).unwrap(), &frame[..]);

        // Flip a single payload bit
        with_fcs[4] ^= 0x01;
        assert!(matches!(
            strip_fcs(&with_fcs),
            Err(Error::FcsMismatch { .. })
        ));
    }

    #[test]
    fn test_classify_and_flags() {
        let mut frame = vec![0x88, 0x02, 0x00, 0x00];
        frame.extend_from_slice(&[0x02, 0x11, 0x22, 0x33, 0x44, 0x55]);
        frame.extend_from_slice(&[0x10, 0x20, 0x30, 0x40, 0x50, 0x60]);
        frame.extend_from_slice(&[0x10, 0x20, 0x30, 0x40, 0x50, 0x61]);
        frame.extend_from_slice(&[0x10, 0x00, 0x00, 0x00]);

        assert_eq!(
            classify(&frame).unwrap(),
            (FrameType::Data, Subtype::Data(DataSubtype::QosData))
        );
        assert_eq!(direction_flags(&frame).unwrap(), (false, true));

        let (addr1, addr2, addr3, addr4) = addresses(&frame).unwrap();
        assert_eq!(addr1, MacAddress([0x02, 0x11, 0x22, 0x33, 0x44, 0x55]));
        assert_eq!(addr2, Some(MacAddress([0x10, 0x20, 0x30, 0x40, 0x50, 0x60])));
        assert_eq!(addr3, Some(MacAddress([0x10, 0x20, 0x30, 0x40, 0x50, 0x61])));
        assert_eq!(addr4, None);

        assert!(matches!(
            direction_flags(&[0x88]),
            Err(Error::TooShort { needed: 2, actual: 1 })
        ));
        assert!(matches!(classify(&frame[..20]), Err(Error::TooShort { .. })));
    }

    #[test]
    fn test_strip_fcs_too_short() {
        assert!(matches!(
            strip_fcs(&[1, 2, 3]),
            Err(Error::TooShort {
                needed: 4,
                actual: 3
            })
        ));
    }
}
