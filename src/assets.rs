use std::time::Duration;

// connections
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;
pub const RECONNECT_DELAY: Duration = Duration::from_millis(2000);
pub const CHANNEL_CAPACITY: usize = 64;

// statistics
pub const STATS_INTERVAL: Duration = Duration::from_millis(1000);
pub const LATENCY_WINDOW: usize = 10;
pub const FPS_WINDOW: Duration = Duration::from_millis(1000);
/// The log view prints every Nth stats tick at info level
pub const STATS_SUMMARY_EVERY: u64 = 30;

// container
pub const BOX_HEADER_LEN: usize = 8;
pub const MEDIA_BOX_TAG: [u8; 4] = *b"mdat";

// H.264 NAL unit types that make an access unit self-contained
pub const NAL_IDR: u8 = 5;
pub const NAL_SPS: u8 = 7;

// HEVC NAL unit types that start a decodable sequence
pub const HEVC_NAL_IDR_W_RADL: u8 = 19;
pub const HEVC_NAL_IDR_N_LP: u8 = 20;
pub const HEVC_NAL_CRA: u8 = 21;
pub const HEVC_NAL_VPS: u8 = 32;
pub const HEVC_NAL_SPS: u8 = 33;

/// Used when the server's Init carries no codec string: High profile, level 4.2
pub const FALLBACK_CODEC: &str = "avc1.64002a";
