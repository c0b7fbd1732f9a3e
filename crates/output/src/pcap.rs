use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};
use bt_protocol::ble::{BlePacket, RadioStatus, DEFAULT_RSSI_OFFSET};
use bt_protocol::{channel_to_rf, Timespec};

// Link-layer type constants
pub const DLT_PPI: u32 = 192;
pub const DLT_BLUETOOTH_LE_LL: u32 = 251;
pub const DLT_BLUETOOTH_LE_LL_WITH_PHDR: u32 = 256;

pub const PCAP_MAGIC: u32 = 0xa1b2c3d4;
pub const PCAP_SNAPLEN: u32 = 65535;

// BLE LE header flags
const LE_DEWHITENED: u16 = 0x0001;
const LE_SIGNAL_POWER_VALID: u16 = 0x0002;
const LE_CRC_CHECKED: u16 = 0x0400;
const LE_CRC_VALID: u16 = 0x0800;

// PPI header size (no fields): version(1) + flags(1) + len(2) + dlt(4) = 8
const PPI_HDR_SIZE: usize = 8;
// LE pseudo-header: channel(1) + signal(1) + noise(1) + aa_offenses(1) + ref_aa(4) + flags(2)
const LE_PHDR_SIZE: usize = 10;
// Sniffer payload trailer: RSSI(1) + status(1)
const STATUS_TRAILER: usize = 2;
const BLE_CRC_SIZE: usize = 3;

/// Payloads shorter than an access address are not exported
pub const MIN_EXPORT_PAYLOAD: usize = 4;

/// How each payload is framed inside the pcap file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkType {
    /// Payload written as captured, status trailer included
    #[default]
    BleLl,
    /// 8-byte PPI header carrying DLT_BLUETOOTH_LE_LL, then the payload
    Ppi,
    /// LE pseudo-header with channel and RSSI; status trailer replaced by a zero CRC
    BleLlWithPhdr,
}

impl LinkType {
    pub fn dlt(&self) -> u32 {
        match self {
            LinkType::BleLl => DLT_BLUETOOTH_LE_LL,
            LinkType::Ppi => DLT_PPI,
            LinkType::BleLlWithPhdr => DLT_BLUETOOTH_LE_LL_WITH_PHDR,
        }
    }
}

/// Write PPI header
fn write_ppi_header<W: Write>(w: &mut W, ppi_len: u16, dlt: u32) -> io::Result<()> {
    w.write_u8(0)?; // version
    w.write_u8(0)?; // flags
    w.write_u16::<LittleEndian>(ppi_len)?;
    w.write_u32::<LittleEndian>(dlt)?;
    Ok(())
}

/// PCAP file writer
pub struct PcapWriter<W: Write> {
    writer: W,
    link_type: LinkType,
    /// Timestamp of the first written packet; later packets are relative to it
    base_us: Option<f64>,
    /// Applied to the trailer of packets the decoder left undecoded
    rssi_offset: i32,
    written: u64,
}

impl<W: Write> PcapWriter<W> {
    /// Create a new PCAP file writer and emit the global header.
    pub fn new(mut writer: W, link_type: LinkType) -> io::Result<Self> {
        // PCAP global header
        writer.write_u32::<LittleEndian>(PCAP_MAGIC)?; // magic
        writer.write_u16::<LittleEndian>(2)?; // version_major
        writer.write_u16::<LittleEndian>(4)?; // version_minor
        writer.write_i32::<LittleEndian>(0)?; // thiszone
        writer.write_u32::<LittleEndian>(0)?; // sigfigs
        writer.write_u32::<LittleEndian>(PCAP_SNAPLEN)?; // snaplen
        writer.write_u32::<LittleEndian>(link_type.dlt())?; // network
        Ok(Self {
            writer,
            link_type,
            base_us: None,
            rssi_offset: DEFAULT_RSSI_OFFSET,
            written: 0,
        })
    }

    /// Use the decoder's RSSI calibration for data-channel packets
    pub fn with_rssi_offset(mut self, rssi_offset: i32) -> Self {
        self.rssi_offset = rssi_offset;
        self
    }

    /// Write one decoded packet. Returns false if the payload was skipped.
    pub fn write_ble(&mut self, pkt: &BlePacket) -> io::Result<bool> {
        if pkt.raw.len() < MIN_EXPORT_PAYLOAD {
            log::debug!("record {}: {}-byte payload not exported", pkt.record_num, pkt.raw.len());
            return Ok(false);
        }

        let base = *self.base_us.get_or_insert(pkt.timestamp_us);
        let ts = Timespec::from_micros(pkt.timestamp_us - base);

        match self.link_type {
            LinkType::BleLl => {
                self.write_record_header(&ts, pkt.raw.len())?;
                self.writer.write_all(&pkt.raw)?;
            }
            LinkType::Ppi => {
                self.write_record_header(&ts, PPI_HDR_SIZE + pkt.raw.len())?;
                write_ppi_header(&mut self.writer, PPI_HDR_SIZE as u16, DLT_BLUETOOTH_LE_LL)?;
                self.writer.write_all(&pkt.raw)?;
            }
            LinkType::BleLlWithPhdr => self.write_with_phdr(&ts, pkt)?,
        }

        self.written += 1;
        Ok(true)
    }

    fn write_record_header(&mut self, ts: &Timespec, len: usize) -> io::Result<()> {
        self.writer.write_u32::<LittleEndian>(ts.tv_sec as u32)?;
        self.writer.write_u32::<LittleEndian>(ts.tv_usec())?;
        self.writer.write_u32::<LittleEndian>(len as u32)?; // incl_len
        self.writer.write_u32::<LittleEndian>(len as u32)?; // orig_len
        Ok(())
    }

    fn write_with_phdr(&mut self, ts: &Timespec, pkt: &BlePacket) -> io::Result<()> {
        let body = pkt.raw.len().saturating_sub(STATUS_TRAILER).max(MIN_EXPORT_PAYLOAD);
        let body = &pkt.raw[..body.min(pkt.raw.len())];

        // Data-channel packets are not decoded, so read their trailer here
        let status = if pkt.is_advertising() {
            Some(RadioStatus {
                rssi: pkt.rssi,
                channel: pkt.channel,
                crc_ok: pkt.crc_ok,
            })
        } else {
            RadioStatus::from_trailer(&pkt.raw, self.rssi_offset)
        };

        let mut flags: u16 = LE_DEWHITENED;
        let (rf_channel, rssi) = match status {
            Some(st) => {
                flags |= LE_SIGNAL_POWER_VALID | LE_CRC_CHECKED;
                if st.crc_ok {
                    flags |= LE_CRC_VALID;
                }
                (channel_to_rf(st.channel), st.rssi.clamp(i8::MIN as i32, i8::MAX as i32) as i8)
            }
            None => (0, 0),
        };

        self.write_record_header(ts, LE_PHDR_SIZE + body.len() + BLE_CRC_SIZE)?;

        // BLE LE link-layer header (10 bytes, packed LE)
        self.writer.write_u8(rf_channel)?;
        self.writer.write_i8(rssi)?;
        self.writer.write_i8(0)?; // noise power
        self.writer.write_u8(0)?; // aa_offenses
        self.writer.write_u32::<LittleEndian>(0)?; // ref_aa
        self.writer.write_u16::<LittleEndian>(flags)?;

        // Packet data, CRC not captured by the sniffer
        self.writer.write_all(body)?;
        self.writer.write_all(&[0u8; BLE_CRC_SIZE])?;
        Ok(())
    }

    /// Number of packet records written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flush the writer
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /// Get inner writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}
