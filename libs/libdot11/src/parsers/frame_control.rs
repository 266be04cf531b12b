use nom::bits::complete::take;
use nom::error::Error;
use nom::sequence::tuple;
use nom::{bits, IResult};

use crate::components::FrameControl;
use crate::frame_types::*;

/// Parse the frame control of a frame.
/// The format is the same for ALL frames, which makes this part quite unique.
pub fn parse_frame_control(input: &[u8]) -> IResult<&[u8], FrameControl> {
    let (remaining, (subtype, frame_type, protocol_version, flags)) =
        bits::<_, (u8, u8, u8, u8), Error<(&[u8], usize)>, _, _>(tuple((
            take(4usize),
            take(2usize),
            take(2usize),
            take(8usize),
        )))(input)?;

    let frame_type = FrameType::from_bits(frame_type);

    // The subtype bits only get their meaning from the frame type.
    let subtype = Subtype::new(frame_type, subtype);

    Ok((
        remaining,
        FrameControl {
            protocol_version,
            frame_type,
            subtype,
            flags,
        },
    ))
}
