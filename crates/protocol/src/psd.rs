use byteorder::{ByteOrder, LittleEndian};

/// TI SmartRF Packet Sniffer record layout (CC2540/CC2541, BLE):
///
/// ```text
/// 0      info          u8
/// 1..5   packet number u32 LE
/// 5..13  timestamp     u64 LE, 32 MHz ticks
/// 13..15 total length  u16 LE (not used for decoding)
/// 15     payload len   u8
/// 16..   payload, zero padded to RECORD_SIZE
/// ```
pub const RECORD_SIZE: usize = 271;
pub const HEADER_SIZE: usize = 16;
pub const MAX_PAYLOAD: usize = RECORD_SIZE - HEADER_SIZE;

/// One fixed-size record borrowed from the capture buffer
#[derive(Debug, Clone, Copy)]
pub struct PsdRecord<'a> {
    /// 1-based position in the file
    pub index: usize,
    pub info: u8,
    pub packet_num: u32,
    pub timestamp: u64,
    pub total_len: u16,
    /// Declared payload length, as stored
    pub payload_len: u8,
    /// Payload clamped to the record boundary
    pub payload: &'a [u8],
}

impl<'a> PsdRecord<'a> {
    /// Parse a record slot. `chunk` is expected to be RECORD_SIZE bytes; a
    /// shorter chunk still parses, with the payload clamped to what exists.
    /// Returns None only when `chunk` cannot hold the 16-byte header;
    /// nonsense header values are passed through as-is.
    pub fn parse(index: usize, chunk: &'a [u8]) -> Option<Self> {
        if chunk.len() < HEADER_SIZE {
            return None;
        }

        let payload_len = chunk[15];
        let end = (HEADER_SIZE + payload_len as usize).min(chunk.len());
        if end < HEADER_SIZE + payload_len as usize {
            log::debug!(
                "record {}: payload length {} exceeds record, truncated to {}",
                index,
                payload_len,
                end - HEADER_SIZE
            );
        }

        Some(Self {
            index,
            info: chunk[0],
            packet_num: LittleEndian::read_u32(&chunk[1..5]),
            timestamp: LittleEndian::read_u64(&chunk[5..13]),
            total_len: LittleEndian::read_u16(&chunk[13..15]),
            payload_len,
            payload: &chunk[HEADER_SIZE..end],
        })
    }
}

/// Number of complete records in a capture buffer
pub fn record_count(buf: &[u8]) -> usize {
    buf.len() / RECORD_SIZE
}

/// Iterator over the complete records of a capture buffer, in file order.
/// Clone it before iterating (or call [`records`] again) to restart.
#[derive(Debug, Clone)]
pub struct Records<'a> {
    chunks: std::slice::ChunksExact<'a, u8>,
    next_index: usize,
}

/// Slice a capture buffer into records. A trailing partial record is dropped.
pub fn records(buf: &[u8]) -> Records<'_> {
    let chunks = buf.chunks_exact(RECORD_SIZE);
    let tail = chunks.remainder().len();
    if tail > 0 {
        log::debug!("dropping {} trailing bytes (partial record)", tail);
    }
    Records { chunks, next_index: 1 }
}

impl<'a> Iterator for Records<'a> {
    type Item = PsdRecord<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let chunk = self.chunks.next()?;
        let index = self.next_index;
        self.next_index += 1;
        // chunks_exact always yields RECORD_SIZE bytes, which is > HEADER_SIZE
        PsdRecord::parse(index, chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl ExactSizeIterator for Records<'_> {}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build one record slot around `payload`
    pub(crate) fn make_record(packet_num: u32, timestamp: u64, payload: &[u8]) -> Vec<u8> {
        let mut rec = vec![0u8; RECORD_SIZE];
        rec[0] = 0x01;
        rec[1..5].copy_from_slice(&packet_num.to_le_bytes());
        rec[5..13].copy_from_slice(&timestamp.to_le_bytes());
        rec[13..15].copy_from_slice(&((payload.len() + 1) as u16).to_le_bytes());
        rec[15] = payload.len() as u8;
        rec[HEADER_SIZE..HEADER_SIZE + payload.len()].copy_from_slice(payload);
        rec
    }

    #[test]
    fn test_record_count_floor() {
        assert_eq!(record_count(&[]), 0);
        assert_eq!(record_count(&[0u8; 270]), 0);
        assert_eq!(record_count(&[0u8; 271]), 1);
        assert_eq!(record_count(&[0u8; 542]), 2);
        assert_eq!(record_count(&[0u8; 600]), 2);

        assert_eq!(records(&[0u8; 270]).count(), 0);
        assert_eq!(records(&[0u8; 542]).count(), 2);
        assert_eq!(records(&[0u8; 600]).len(), 2);
    }

    #[test]
    fn test_header_fields() {
        let payload = [0xD6, 0xBE, 0x89, 0x8E, 0x00, 0x06];
        let buf = make_record(0x01020304, 0x1122334455667788, &payload);

        let rec = records(&buf).next().unwrap();
        assert_eq!(rec.index, 1);
        assert_eq!(rec.info, 0x01);
        assert_eq!(rec.packet_num, 0x01020304);
        assert_eq!(rec.timestamp, 0x1122334455667788);
        assert_eq!(rec.total_len, 7);
        assert_eq!(rec.payload_len, 6);
        assert_eq!(rec.payload, &payload);
    }

    #[test]
    fn test_file_order_and_restart() {
        let mut buf = make_record(10, 100, &[1, 2, 3, 4]);
        buf.extend(make_record(11, 200, &[5, 6, 7, 8]));
        buf.extend_from_slice(&[0xAA; 17]); // partial tail

        let nums: Vec<u32> = records(&buf).map(|r| r.packet_num).collect();
        assert_eq!(nums, vec![10, 11]);

        // A fresh iterator restarts from the beginning
        let again: Vec<usize> = records(&buf).map(|r| r.index).collect();
        assert_eq!(again, vec![1, 2]);
    }

    #[test]
    fn test_oversized_payload_len_is_clamped() {
        let mut buf = make_record(1, 0, &[]);
        buf[15] = 0xFF;
        let rec = records(&buf).next().unwrap();
        assert_eq!(rec.payload_len, 0xFF);
        assert_eq!(rec.payload.len(), MAX_PAYLOAD);

        // Short slice handed directly to parse
        let short = &buf[..20];
        let rec = PsdRecord::parse(1, short).unwrap();
        assert_eq!(rec.payload.len(), 4);
        assert!(PsdRecord::parse(1, &buf[..10]).is_none());
    }
}
