use std::fmt;

use libdot11::MacAddress;
pub use libdot11::Stage;
use log::{info, warn};

use crate::error::{Error, Result};
use crate::inventory::ApRecord;

/// Largest frame a slot can hold. Longer frames are rejected, never truncated.
pub const SLOT_CAPACITY: usize = 256;
/// AssocReq, AssocRes and the four EAPOL messages.
pub const SLOT_COUNT: usize = 6;

/// Where an access point's capture stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureState {
    Empty,
    /// Number of filled slots, 1 to 5.
    Partial(usize),
    Complete,
    /// Complete, and handed to the sink.
    Flushed,
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureState::Empty => write!(f, "0/{SLOT_COUNT}"),
            CaptureState::Partial(filled) => write!(f, "{filled}/{SLOT_COUNT}"),
            CaptureState::Complete => write!(f, "complete"),
            CaptureState::Flushed => write!(f, "written"),
        }
    }
}

/// Result of writing a frame into a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotWrite {
    /// Stored; `filled` slots are now in use.
    Stored { filled: usize },
    /// The slot already held a frame, which was kept.
    Duplicate,
}

/// Six fixed-size slots, one per [Stage], plus the written-out flag.
///
/// A slot's length is either zero or the exact number of bytes copied into it.
/// Slots are written once; only [HandshakeBuffer::clear] empties them again.
#[derive(Clone)]
pub struct HandshakeBuffer {
    lens: [u16; SLOT_COUNT],
    slots: Box<[[u8; SLOT_CAPACITY]; SLOT_COUNT]>,
    written_out: bool,
}

impl Default for HandshakeBuffer {
    fn default() -> Self {
        HandshakeBuffer {
            lens: [0; SLOT_COUNT],
            slots: Box::new([[0; SLOT_CAPACITY]; SLOT_COUNT]),
            written_out: false,
        }
    }
}

impl fmt::Debug for HandshakeBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandshakeBuffer")
            .field("lens", &self.lens)
            .field("written_out", &self.written_out)
            .finish()
    }
}

impl HandshakeBuffer {
    pub fn write(&mut self, stage: Stage, bytes: &[u8]) -> Result<SlotWrite> {
        if bytes.len() > SLOT_CAPACITY {
            return Err(Error::CapacityExceeded {
                what: "handshake slot",
                capacity: SLOT_CAPACITY,
            });
        }
        if bytes.is_empty() {
            return Err(Error::InvalidArgument(format!("empty {stage} frame")));
        }

        let index = stage.index();
        if self.lens[index] != 0 {
            return Ok(SlotWrite::Duplicate);
        }

        self.slots[index][..bytes.len()].copy_from_slice(bytes);
        self.lens[index] = bytes.len() as u16;
        Ok(SlotWrite::Stored {
            filled: self.filled(),
        })
    }

    pub fn slot(&self, stage: Stage) -> Option<&[u8]> {
        let index = stage.index();
        match self.lens[index] as usize {
            0 => None,
            len => Some(&self.slots[index][..len]),
        }
    }

    pub fn lengths(&self) -> [u16; SLOT_COUNT] {
        self.lens
    }

    pub fn filled(&self) -> usize {
        self.lens.iter().filter(|len| **len != 0).count()
    }

    pub fn is_complete(&self) -> bool {
        self.filled() == SLOT_COUNT
    }

    pub fn written_out(&self) -> bool {
        self.written_out
    }

    /// Set the written-out flag. Returns false if it was already set.
    pub fn mark_written_out(&mut self) -> bool {
        !std::mem::replace(&mut self.written_out, true)
    }

    pub fn state(&self) -> CaptureState {
        if self.written_out {
            return CaptureState::Flushed;
        }
        match self.filled() {
            0 => CaptureState::Empty,
            SLOT_COUNT => CaptureState::Complete,
            filled => CaptureState::Partial(filled),
        }
    }

    /// Copy of the filled bytes of every slot, in canonical order.
    pub fn snapshot(&self) -> [Vec<u8>; SLOT_COUNT] {
        let mut slots: [Vec<u8>; SLOT_COUNT] = Default::default();
        for (index, slot) in slots.iter_mut().enumerate() {
            slot.extend_from_slice(&self.slots[index][..self.lens[index] as usize]);
        }
        slots
    }

    pub fn clear(&mut self) {
        self.lens = [0; SLOT_COUNT];
        self.written_out = false;
    }
}

/// A complete handshake, copied out of the tables so it can be persisted without holding a lock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapturedHandshake {
    pub bssid: MacAddress,
    pub ssid: Vec<u8>,
    pub slots: [Vec<u8>; SLOT_COUNT],
}

impl CapturedHandshake {
    pub fn lengths(&self) -> [u16; SLOT_COUNT] {
        let mut lens = [0u16; SLOT_COUNT];
        for (len, slot) in lens.iter_mut().zip(self.slots.iter()) {
            *len = slot.len() as u16;
        }
        lens
    }

    pub fn ssid_lossy(&self) -> String {
        String::from_utf8_lossy(&self.ssid).into_owned()
    }
}

/// Destination of completed handshakes.
pub trait HandshakeSink: Send + Sync {
    fn flush(&self, handshake: &CapturedHandshake) -> Result<()>;
}

/// What happened to a handshake frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CaptureOutcome {
    Stored { stage: Stage, filled: usize },
    Duplicate(Stage),
    /// This frame completed the handshake. Flush the capture exactly once.
    Completed(CapturedHandshake),
}

/// Write a recognized handshake frame into the buffer of `ap`.
///
/// The first frame for a stage wins. When the last slot is filled the written-out flag is
/// set right away, whether or not the flush that follows succeeds, so a failing sink
/// isn't retried on every retransmission.
pub fn capture(ap: &mut ApRecord, stage: Stage, bytes: &[u8]) -> Result<CaptureOutcome> {
    let ssid = ap.ssid_lossy();
    match ap.handshake.write(stage, bytes)? {
        SlotWrite::Duplicate => {
            warn!("{ssid} -> possibly duplicate {stage}, keeping the first one");
            Ok(CaptureOutcome::Duplicate(stage))
        }
        SlotWrite::Stored { filled } => {
            info!("{ssid} -> {stage} captured ({filled}/{SLOT_COUNT})");
            if filled == SLOT_COUNT && ap.handshake.mark_written_out() {
                return Ok(CaptureOutcome::Completed(CapturedHandshake {
                    bssid: ap.bssid,
                    ssid: ap.ssid.clone(),
                    slots: ap.handshake.snapshot(),
                }));
            }
            Ok(CaptureOutcome::Stored { stage, filled })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ApRecord {
        ApRecord::new(
            MacAddress([0x10, 0x20, 0x30, 0x40, 0x50, 0x60]),
            b"HomeNet",
            6,
            -40,
        )
    }

    #[test]
    fn test_write_once() {
        let mut buffer = HandshakeBuffer::default();
        assert_eq!(
            buffer.write(Stage::Eapol1, &[1; 99]).unwrap(),
            SlotWrite::Stored { filled: 1 }
        );
        assert_eq!(
            buffer.write(Stage::Eapol1, &[2; 120]).unwrap(),
            SlotWrite::Duplicate
        );
        assert_eq!(buffer.slot(Stage::Eapol1), Some(&[1u8; 99][..]));
        assert_eq!(buffer.lengths(), [0, 0, 99, 0, 0, 0]);
        assert_eq!(buffer.state(), CaptureState::Partial(1));
    }

    #[test]
    fn test_slot_capacity() {
        let mut buffer = HandshakeBuffer::default();
        assert!(matches!(
            buffer.write(Stage::AssocReq, &[0; SLOT_CAPACITY + 1]),
            Err(Error::CapacityExceeded { .. })
        ));
        assert_eq!(buffer.state(), CaptureState::Empty);

        buffer.write(Stage::AssocReq, &[7; SLOT_CAPACITY]).unwrap();
        assert_eq!(buffer.slot(Stage::AssocReq).map(|s| s.len()), Some(SLOT_CAPACITY));
    }

    #[test]
    fn test_state_and_clear() {
        let mut buffer = HandshakeBuffer::default();
        for stage in Stage::ALL {
            buffer.write(stage, &[stage.index() as u8 + 1; 10]).unwrap();
        }
        assert_eq!(buffer.state(), CaptureState::Complete);
        assert!(buffer.mark_written_out());
        assert!(!buffer.mark_written_out());
        assert_eq!(buffer.state(), CaptureState::Flushed);

        buffer.clear();
        assert_eq!(buffer.state(), CaptureState::Empty);
        assert!(!buffer.written_out());
        assert_eq!(buffer.slot(Stage::Eapol4), None);
    }

    #[test]
    fn test_capture_completes_once() {
        let mut ap = record();
        let mut completed = 0;

        for stage in Stage::ALL {
            if let CaptureOutcome::Completed(handshake) = capture(&mut ap, stage, &[0xab; 40]).unwrap() {
                completed += 1;
                assert_eq!(handshake.lengths(), [40; SLOT_COUNT]);
                assert_eq!(handshake.ssid_lossy(), "HomeNet");
            }
        }
        // Replays are rejected by the write-once slots
        for stage in Stage::ALL {
            assert_eq!(
                capture(&mut ap, stage, &[0xcd; 40]).unwrap(),
                CaptureOutcome::Duplicate(stage)
            );
        }

        assert_eq!(completed, 1);
        assert_eq!(ap.handshake.state(), CaptureState::Flushed);
    }
}
