//! dot11mux: decode 802.11 frames once and fan them out to filtered consumers.
//!
//! Frames enter through [Sniffer::dispatch], are matched against every registered
//! [Filter], and are handed to the consumers whose filters match. The [MacLogger]
//! consumer keeps an inventory of access points and stations and captures association
//! and 4-way handshake frames, flushing complete handshakes as `.pkt` files.

pub mod config;
pub mod dumper;
pub mod error;
pub mod filter;
pub mod handshake;
pub mod inventory;
pub mod lock;
pub mod logger;
pub mod pktfile;
pub mod queue;
pub mod sniffer;
pub mod status;
pub mod tx;

pub use crate::config::Config;
pub use crate::error::{Error, Result};
pub use crate::filter::Filter;
pub use crate::handshake::{CaptureState, CapturedHandshake, HandshakeSink};
pub use crate::logger::{retarget, MacLogger};
pub use crate::pktfile::FileSink;
pub use crate::sniffer::{Packet, PacketConsumer, Radio, RxMeta, Sniffer, Subscription};
