use nom::number::complete::le_u16;
use nom::IResult;

use crate::components::SequenceControl;

/// Parse the [SequenceControl] from the two bytes following the third address.
pub fn parse_sequence_control(input: &[u8]) -> IResult<&[u8], SequenceControl> {
    let (remaining, raw) = le_u16(input)?;

    Ok((
        remaining,
        SequenceControl {
            fragment_number: (raw & 0x000f) as u8,
            sequence_number: raw >> 4,
        },
    ))
}
