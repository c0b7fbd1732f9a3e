pub mod ad;
pub mod ble;
pub mod psd;

/// BLE channel index (0-39) to RF channel (0-39, ascending frequency).
/// Out-of-range indexes are passed through unchanged.
pub fn channel_to_rf(channel: u8) -> u8 {
    match channel {
        37 => 0,
        38 => 12,
        39 => 39,
        c if c < 11 => c + 1,
        c if c < 37 => c + 2,
        c => c,
    }
}

/// Capture-relative timestamp, split the way pcap record headers want it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timespec {
    pub tv_sec: u64,
    pub tv_nsec: u64,
}

impl Timespec {
    /// Convert fractional microseconds. Negative input clamps to zero.
    pub fn from_micros(us: f64) -> Self {
        if us.is_nan() || us <= 0.0 {
            return Self::default();
        }
        let tv_sec = (us / 1_000_000.0).floor() as u64;
        let usec = (us % 1_000_000.0) as u64;
        Self { tv_sec, tv_nsec: usec * 1000 }
    }

    pub fn tv_usec(&self) -> u32 {
        (self.tv_nsec / 1000) as u32
    }
}
