use chrono::{DateTime, Utc};

/// One frame as stored in the capture, before any decoding.
#[derive(Debug, Clone)]
pub struct RawPacket {
    /// Position in the file, from 1.
    pub frame_number: u64,
    /// Microseconds since the Unix epoch.
    pub timestamp_us: i64,
    pub captured_length: u32,
    pub original_length: u32,
    pub link_type: u16,
    pub data: Vec<u8>,
}

impl RawPacket {
    pub fn new(
        frame_number: u64,
        timestamp_us: i64,
        captured_length: u32,
        original_length: u32,
        link_type: u16,
        data: Vec<u8>,
    ) -> Self {
        Self {
            frame_number,
            timestamp_us,
            captured_length,
            original_length,
            link_type,
            data,
        }
    }

    /// Capture time in UTC; out-of-range stamps map to the epoch.
    pub fn timestamp(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_micros(self.timestamp_us).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_keeps_microseconds() {
        let packet = RawPacket::new(1, 1_672_531_200_000_001, 4, 4, 1, vec![0; 4]);
        assert_eq!(packet.timestamp().timestamp(), 1_672_531_200);
        assert_eq!(packet.timestamp().timestamp_subsec_micros(), 1);

        let before_epoch = RawPacket::new(1, -1, 0, 0, 1, Vec::new());
        assert_eq!(before_epoch.timestamp().timestamp_subsec_micros(), 999_999);
    }
}
