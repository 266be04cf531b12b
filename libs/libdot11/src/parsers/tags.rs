use nom::bytes::complete::take;
use nom::number::complete::u8 as byte;
use nom::sequence::tuple;
use nom::IResult;

use crate::error::Error;

/// Longest SSID allowed by the standard.
pub const SSID_MAX_LEN: usize = 32;

/// Beacons and probe responses carry 12 bytes of fixed parameters (timestamp, interval,
/// capabilities) after the header. The SSID is always the first tagged parameter.
const SSID_TAG_OFFSET: usize = 0x24;
const SSID_DATA_OFFSET: usize = 0x26;
const SSID_TAG_ID: u8 = 0;

/// Tag id and length of a tagged parameter.
fn parse_tag_header(input: &[u8]) -> IResult<&[u8], (u8, u8)> {
    tuple((byte, byte))(input)
}

fn parse_tag_body(input: &[u8], len: usize) -> IResult<&[u8], &[u8]> {
    take(len)(input)
}

/// Extract the SSID of a beacon or probe response.
///
/// Returns `Ok(None)` for hidden networks, i.e. a zero length SSID or one made of NUL bytes only.
pub fn ssid(frame: &[u8]) -> Result<Option<&[u8]>, Error> {
    if frame.len() < SSID_DATA_OFFSET {
        return Err(Error::TooShort {
            needed: SSID_DATA_OFFSET,
            actual: frame.len(),
        });
    }

    let (remaining, (tag_id, tag_len)) = parse_tag_header(&frame[SSID_TAG_OFFSET..])?;
    if tag_id != SSID_TAG_ID {
        return Err(Error::InvalidTag(tag_id));
    }
    if tag_len as usize > SSID_MAX_LEN {
        return Err(Error::InvalidTagLength(tag_len));
    }

    let needed = SSID_DATA_OFFSET + tag_len as usize;
    if frame.len() < needed {
        return Err(Error::TooShort {
            needed,
            actual: frame.len(),
        });
    }

    let (_, ssid) = parse_tag_body(remaining, tag_len as usize)?;
    if ssid.iter().all(|b| *b == 0) {
        return Ok(None);
    }

    Ok(Some(ssid))
}
