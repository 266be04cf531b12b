use std::io;

use libdot11::MacAddress;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Malformed argument: a bad address, a channel out of range, an index past the end.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A bounded table (filters, access points, stations, handshake slot) is full.
    #[error("{what} full ({capacity} entries)")]
    CapacityExceeded { what: &'static str, capacity: usize },

    /// A shared-state lock couldn't be taken within its bounded wait.
    /// The frame or request is dropped, never retried.
    #[error("Timeout waiting for the {0} lock")]
    LockTimeout(&'static str),

    #[error("Frame too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },

    #[error("Not found: {0}")]
    NotFound(String),

    /// A record references another record that doesn't exist. Tables are corrupted.
    #[error("Dangling reference from {from} to {what} index {index}")]
    DanglingReference {
        from: MacAddress,
        what: &'static str,
        index: usize,
    },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Frame decode error: {0}")]
    Frame(libdot11::error::Error),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Pcap(#[from] pcap_file::PcapError),
}

impl From<libdot11::error::Error> for Error {
    fn from(error: libdot11::error::Error) -> Self {
        match error {
            libdot11::error::Error::TooShort { needed, actual } => {
                Error::TooShort { needed, actual }
            }
            other => Error::Frame(other),
        }
    }
}

impl From<libdot11::MacParseError> for Error {
    fn from(error: libdot11::MacParseError) -> Self {
        Error::InvalidArgument(error.to_string())
    }
}

impl Error {
    /// Errors that mean the tables are inconsistent, as opposed to a plain miss.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::DanglingReference { .. })
    }
}
