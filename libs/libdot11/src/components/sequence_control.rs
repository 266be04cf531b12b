/// The sequence control field, bytes 22-23 of management and data frames.
///
/// It's a little endian u16 with the fragment number in the lowest four bits and
/// the 12-bit sequence number above it. On the wire this means the low nibble of
/// byte 22 is the fragment number, while the sequence number is spread over the
/// high nibble of byte 22 and all of byte 23.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SequenceControl {
    pub fragment_number: u8,
    pub sequence_number: u16,
}

impl SequenceControl {
    pub fn encode(&self) -> [u8; 2] {
        let raw = (self.sequence_number & 0x0fff) << 4 | (self.fragment_number & 0x0f) as u16;
        raw.to_le_bytes()
    }
}
