mod frame_control;
mod sequence_control;
mod tags;

pub use frame_control::parse_frame_control;
pub use sequence_control::parse_sequence_control;
pub use tags::{ssid, SSID_MAX_LEN};
