//! The `.pkt` handshake file and its conversion to pcap.
//!
//! A `.pkt` file is a 12 byte header holding the six slot lengths as little endian
//! `u16` values (AssocReq, AssocRes, EAPOL 1 to 4), followed by the slot bytes
//! concatenated in the same order. Empty slots contribute nothing to the body.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use byteorder::{ByteOrder, WriteBytesExt, LE};
use log::info;
use pcap_file::pcap::{PcapHeader, PcapPacket, PcapWriter};
use pcap_file::DataLink;

use crate::error::{Error, Result};
use crate::handshake::{CapturedHandshake, HandshakeSink, Stage, SLOT_CAPACITY, SLOT_COUNT};

pub const PKT_HEADER_LEN: usize = SLOT_COUNT * 2;
/// SSID bytes kept in a `.pkt` file name.
pub const FILE_NAME_SSID_LEN: usize = 19;
pub const PKT_EXTENSION: &str = "pkt";

/// Slot contents read back from a `.pkt` file, in canonical order.
pub type PktSlots = [Vec<u8>; SLOT_COUNT];

pub fn encode_pkt(slots: &PktSlots) -> Result<Vec<u8>> {
    let body_len: usize = slots.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(PKT_HEADER_LEN + body_len);

    for slot in slots {
        if slot.len() > SLOT_CAPACITY {
            return Err(Error::CapacityExceeded {
                what: "handshake slot",
                capacity: SLOT_CAPACITY,
            });
        }
        out.write_u16::<LE>(slot.len() as u16)?;
    }
    for slot in slots {
        out.extend_from_slice(slot);
    }
    Ok(out)
}

pub fn decode_pkt(bytes: &[u8]) -> Result<PktSlots> {
    if bytes.len() < PKT_HEADER_LEN {
        return Err(Error::TooShort {
            needed: PKT_HEADER_LEN,
            actual: bytes.len(),
        });
    }

    let mut lens = [0usize; SLOT_COUNT];
    for (index, len) in lens.iter_mut().enumerate() {
        *len = LE::read_u16(&bytes[index * 2..]) as usize;
        if *len > SLOT_CAPACITY {
            return Err(Error::InvalidArgument(format!(
                "slot {index} claims {len} bytes, more than {SLOT_CAPACITY}"
            )));
        }
    }

    let needed = PKT_HEADER_LEN + lens.iter().sum::<usize>();
    if bytes.len() < needed {
        return Err(Error::InvalidArgument(format!(
            "truncated pkt body: header promises {needed} bytes, got {}",
            bytes.len()
        )));
    }
    if bytes.len() > needed {
        return Err(Error::InvalidArgument(format!(
            "{} trailing bytes after pkt body",
            bytes.len() - needed
        )));
    }

    let mut slots: PktSlots = Default::default();
    let mut offset = PKT_HEADER_LEN;
    for (slot, len) in slots.iter_mut().zip(lens) {
        slot.extend_from_slice(&bytes[offset..offset + len]);
        offset += len;
    }
    Ok(slots)
}

pub fn read_pkt(path: &Path) -> Result<PktSlots> {
    decode_pkt(&fs::read(path)?)
}

/// File name for a handshake: the first 19 bytes of the SSID, with anything that isn't
/// an ASCII letter, digit, `-`, `_` or `.` replaced by `_`.
pub fn pkt_file_name(ssid: &[u8]) -> String {
    let len = ssid.len().min(FILE_NAME_SSID_LEN);
    let mut name: String = ssid[..len]
        .iter()
        .map(|b| match *b {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b'.' => *b as char,
            _ => '_',
        })
        .collect();
    if name.is_empty() {
        name.push('_');
    }
    format!("{name}.{PKT_EXTENSION}")
}

/// Writes every completed handshake to `<dir>/<ssid>.pkt`.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileSink { dir: dir.into() }
    }

    pub fn path_for(&self, ssid: &[u8]) -> PathBuf {
        self.dir.join(pkt_file_name(ssid))
    }
}

impl HandshakeSink for FileSink {
    fn flush(&self, handshake: &CapturedHandshake) -> Result<()> {
        let bytes = encode_pkt(&handshake.slots)?;
        let path = self.path_for(&handshake.ssid);

        fs::create_dir_all(&self.dir)?;
        let mut file = BufWriter::new(File::create(&path)?);
        file.write_all(&bytes)?;
        file.flush()?;

        info!(
            "Wrote {} bytes for {} to {}",
            bytes.len(),
            handshake.ssid_lossy(),
            path.display()
        );
        Ok(())
    }
}

/// Write the non-empty slots as a pcap capture with 802.11 link type.
/// Returns the number of records written.
pub fn export_pcap<W: Write>(slots: &PktSlots, writer: W) -> Result<usize> {
    let header = PcapHeader {
        datalink: DataLink::IEEE802_11,
        snaplen: SLOT_CAPACITY as u32,
        ..Default::default()
    };
    let mut pcap = PcapWriter::with_header(writer, header)?;

    // Records are spaced a millisecond apart to keep the stage order visible in viewers
    let start = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let mut written = 0;
    for (stage, slot) in Stage::ALL.iter().zip(slots.iter()) {
        if slot.is_empty() {
            continue;
        }
        let timestamp = start + Duration::from_millis(stage.index() as u64);
        pcap.write_packet(&PcapPacket::new(timestamp, slot.len() as u32, slot))?;
        written += 1;
    }
    Ok(written)
}

/// Convert a `.pkt` file into a pcap file.
pub fn convert(pkt: &Path, pcap: &Path) -> Result<usize> {
    let slots = read_pkt(pkt)?;
    let file = BufWriter::new(File::create(pcap)?);
    export_pcap(&slots, file)
}
