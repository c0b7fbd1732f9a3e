use std::fmt;
use std::str::FromStr;

use byteorder::{ByteOrder, LittleEndian};

use crate::ad::{parse_ad_structures, AdStructure, AdSummary};
use crate::psd::{self, PsdRecord};

pub const BLE_ADV_AA: u32 = 0x8E89BED6;

/// Calibration offset of the CC2540 sniffer front end, in dBm
pub const DEFAULT_RSSI_OFFSET: i32 = -73;
/// Timestamp tick rate of the CC2540 sniffer
pub const DEFAULT_CLOCK_MHZ: f64 = 32.0;

/// Smallest payload carrying AA(4) + PDU header(2)
const MIN_PAYLOAD: usize = 6;
const SCAN_REQ_LEN: usize = 18;
const CONNECT_IND_LEN: usize = 40;

/// Decoder parameters tied to the capture hardware
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecoderConfig {
    /// Added to the signed RSSI byte
    pub rssi_offset: i32,
    /// Tick rate of the record timestamp
    pub clock_mhz: f64,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            rssi_offset: DEFAULT_RSSI_OFFSET,
            clock_mhz: DEFAULT_CLOCK_MHZ,
        }
    }
}

/// RSSI and status bytes the sniffer appends in place of the CRC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioStatus {
    pub rssi: i32,
    pub channel: u8,
    pub crc_ok: bool,
}

impl RadioStatus {
    /// Read the last two payload bytes; None if there are fewer than two
    pub fn from_trailer(payload: &[u8], rssi_offset: i32) -> Option<Self> {
        let &[.., rssi, status] = payload else {
            return None;
        };
        Some(Self {
            rssi: rssi as i8 as i32 + rssi_offset,
            channel: status & 0x3F,
            crc_ok: status & 0x80 != 0,
        })
    }
}

/// Advertising channel PDU types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PduType {
    AdvInd,
    AdvDirectInd,
    AdvNonconnInd,
    ScanReq,
    ScanRsp,
    ConnectInd,
    AdvScanInd,
    Unknown(u8),
}

impl PduType {
    pub fn from_bits(bits: u8) -> Self {
        match bits {
            0x00 => PduType::AdvInd,
            0x01 => PduType::AdvDirectInd,
            0x02 => PduType::AdvNonconnInd,
            0x03 => PduType::ScanReq,
            0x04 => PduType::ScanRsp,
            0x05 => PduType::ConnectInd,
            0x06 => PduType::AdvScanInd,
            other => PduType::Unknown(other),
        }
    }

    pub fn code(&self) -> u8 {
        match *self {
            PduType::AdvInd => 0x00,
            PduType::AdvDirectInd => 0x01,
            PduType::AdvNonconnInd => 0x02,
            PduType::ScanReq => 0x03,
            PduType::ScanRsp => 0x04,
            PduType::ConnectInd => 0x05,
            PduType::AdvScanInd => 0x06,
            PduType::Unknown(code) => code,
        }
    }

    /// PDUs whose body is AdvA followed by AD data
    pub fn carries_ad_data(&self) -> bool {
        matches!(
            self,
            PduType::AdvInd | PduType::AdvNonconnInd | PduType::AdvScanInd | PduType::ScanRsp
        )
    }
}

impl fmt::Display for PduType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            PduType::AdvInd => "ADV_IND",
            PduType::AdvDirectInd => "ADV_DIRECT_IND",
            PduType::AdvNonconnInd => "ADV_NONCONN_IND",
            PduType::ScanReq => "SCAN_REQ",
            PduType::ScanRsp => "SCAN_RSP",
            PduType::ConnectInd => "CONNECT_IND",
            PduType::AdvScanInd => "ADV_SCAN_IND",
            PduType::Unknown(code) => return write!(f, "UNKNOWN_0x{:02X}", code),
        };
        f.write_str(name)
    }
}

/// TxAdd bit of the PDU header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddrType {
    Public,
    Random,
}

impl fmt::Display for AddrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddrType::Public => f.write_str("Public"),
            AddrType::Random => f.write_str("Random"),
        }
    }
}

/// Device address as sent on air (least significant byte first).
/// Displays in the usual most-significant-first colon form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BleAddress(pub [u8; 6]);

impl BleAddress {
    /// Read 6 bytes at `offset`; None if the slice is too short
    pub fn from_wire(data: &[u8], offset: usize) -> Option<Self> {
        let bytes: [u8; 6] = data.get(offset..offset + 6)?.try_into().ok()?;
        Some(Self(bytes))
    }
}

impl fmt::Display for BleAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[5], b[4], b[3], b[2], b[1], b[0]
        )
    }
}

/// Error returned when parsing a textual address
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid BLE address '{0}'")]
pub struct ParseAddressError(pub String);

impl FromStr for BleAddress {
    type Err = ParseAddressError;

    /// Accepts `AA:BB:CC:DD:EE:FF` (or `-` separated), any case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseAddressError(s.to_string());
        let parts: Vec<&str> = s.split([':', '-']).collect();
        if parts.len() != 6 {
            return Err(err());
        }
        let mut bytes = [0u8; 6];
        for (i, part) in parts.iter().enumerate() {
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(err());
            }
            bytes[5 - i] = u8::from_str_radix(part, 16).map_err(|_| err())?;
        }
        Ok(Self(bytes))
    }
}

/// Access address classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkKind {
    /// Payload too short to carry an access address and header
    #[default]
    Unclassified,
    Advertising,
    /// Any non-advertising access address; not decoded further
    Data,
}

/// LL data of a CONNECT_IND
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectParams {
    /// As on air; shown most significant byte first
    pub access_address: [u8; 4],
    /// As on air; shown in wire order
    pub crc_init: [u8; 3],
    pub interval_ms: f64,
    pub latency: u16,
    pub timeout_ms: f64,
}

impl ConnectParams {
    /// Parse the 22-byte LLData block
    pub fn parse(ll: &[u8]) -> Option<Self> {
        if ll.len() < 22 {
            return None;
        }
        // ll[7] WinSize, ll[8..10] WinOffset, ll[16..21] ChM, ll[21] Hop/SCA
        Some(Self {
            access_address: ll[0..4].try_into().ok()?,
            crc_init: ll[4..7].try_into().ok()?,
            interval_ms: LittleEndian::read_u16(&ll[10..12]) as f64 * 1.25,
            latency: LittleEndian::read_u16(&ll[12..14]),
            timeout_ms: LittleEndian::read_u16(&ll[14..16]) as f64 * 10.0,
        })
    }

    pub fn access_address_hex(&self) -> String {
        self.access_address.iter().rev().map(|b| format!("{:02x}", b)).collect()
    }

    pub fn crc_init_hex(&self) -> String {
        self.crc_init.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// One decoded sniffer record
#[derive(Debug, Clone, PartialEq)]
pub struct BlePacket {
    pub record_num: usize,
    pub packet_num: u32,
    /// Sniffer clock ticks
    pub timestamp: u64,
    pub timestamp_us: f64,
    pub raw: Vec<u8>,

    pub kind: LinkKind,
    pub access_address: u32,

    pub pdu_type: Option<PduType>,
    pub tx_addr_type: Option<AddrType>,
    pub pdu_length: u8,

    pub adv_address: Option<BleAddress>,
    pub scanner_address: Option<BleAddress>,
    pub initiator_address: Option<BleAddress>,

    pub rssi: i32,
    pub channel: u8,
    pub crc_ok: bool,

    pub ad_structures: Vec<AdStructure>,
    pub ad: AdSummary,

    pub connection: Option<ConnectParams>,
}

impl BlePacket {
    fn empty(record_num: usize, packet_num: u32, timestamp: u64, cfg: &DecoderConfig) -> Self {
        Self {
            record_num,
            packet_num,
            timestamp,
            timestamp_us: timestamp as f64 / cfg.clock_mhz,
            raw: Vec::new(),
            kind: LinkKind::Unclassified,
            access_address: 0,
            pdu_type: None,
            tx_addr_type: None,
            pdu_length: 0,
            adv_address: None,
            scanner_address: None,
            initiator_address: None,
            rssi: 0,
            channel: 0,
            crc_ok: false,
            ad_structures: Vec::new(),
            ad: AdSummary::default(),
            connection: None,
        }
    }

    /// Decode one sniffer record
    pub fn decode(rec: &PsdRecord<'_>, cfg: &DecoderConfig) -> Self {
        decode_payload(rec.payload, rec.index, rec.packet_num, rec.timestamp, cfg)
    }

    pub fn is_advertising(&self) -> bool {
        self.kind == LinkKind::Advertising
    }

    /// The address a packet is attributed to: advertiser, else scanner, else initiator
    pub fn address(&self) -> Option<BleAddress> {
        self.adv_address
            .or(self.scanner_address)
            .or(self.initiator_address)
    }

    /// True if `addr` appears in any address field
    pub fn involves(&self, addr: &BleAddress) -> bool {
        [
            self.adv_address,
            self.scanner_address,
            self.initiator_address,
        ]
        .iter()
        .any(|a| a.as_ref() == Some(addr))
    }
}

/// Decode a sniffer payload: AA(4) + PDU header(2) + body + RSSI(1) + status(1).
/// Never fails; fields the payload cannot support stay empty.
pub fn decode_payload(
    payload: &[u8],
    record_num: usize,
    packet_num: u32,
    timestamp: u64,
    cfg: &DecoderConfig,
) -> BlePacket {
    let mut pkt = BlePacket::empty(record_num, packet_num, timestamp, cfg);
    pkt.raw = payload.to_vec();

    if payload.len() < MIN_PAYLOAD {
        log::trace!("record {}: payload too short ({} bytes)", record_num, payload.len());
        return pkt;
    }

    pkt.access_address = LittleEndian::read_u32(&payload[0..4]);
    if pkt.access_address != BLE_ADV_AA {
        pkt.kind = LinkKind::Data;
        return pkt;
    }
    pkt.kind = LinkKind::Advertising;

    let pdu_type = PduType::from_bits(payload[4] & 0x0F);
    pkt.pdu_type = Some(pdu_type);
    pkt.tx_addr_type = Some(if (payload[4] >> 6) & 1 != 0 {
        AddrType::Random
    } else {
        AddrType::Public
    });
    pkt.pdu_length = payload[5] & 0x3F;

    let len = payload.len();
    if let Some(status) = RadioStatus::from_trailer(payload, cfg.rssi_offset) {
        pkt.rssi = status.rssi;
        pkt.channel = status.channel;
        pkt.crc_ok = status.crc_ok;
    }

    match pdu_type {
        t if t.carries_ad_data() => {
            pkt.adv_address = BleAddress::from_wire(payload, 6);
            if pkt.adv_address.is_some() && len > 14 {
                let (structures, summary) = parse_ad_structures(&payload[12..len - 2]);
                pkt.ad_structures = structures;
                pkt.ad = summary;
            }
        }
        PduType::ScanReq if len >= SCAN_REQ_LEN => {
            pkt.scanner_address = BleAddress::from_wire(payload, 6);
            pkt.adv_address = BleAddress::from_wire(payload, 12);
        }
        PduType::ConnectInd if len >= CONNECT_IND_LEN => {
            pkt.initiator_address = BleAddress::from_wire(payload, 6);
            pkt.adv_address = BleAddress::from_wire(payload, 12);
            pkt.connection = ConnectParams::parse(&payload[18..40]);
        }
        other => {
            log::trace!("record {}: {} not decoded ({} bytes)", record_num, other, len);
        }
    }

    pkt
}

/// Decode every record of a capture buffer, in file order
pub fn decode_capture(buf: &[u8], cfg: &DecoderConfig) -> Vec<BlePacket> {
    psd::records(buf).map(|rec| BlePacket::decode(&rec, cfg)).collect()
}

/// Packets mentioning `addr` in any address field, in file order
pub fn filter_by_address<'a>(packets: &'a [BlePacket], addr: &BleAddress) -> Vec<&'a BlePacket> {
    packets.iter().filter(|p| p.involves(addr)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ad::{AdFlag, AdValue, Company};
    use crate::psd::tests::make_record;

    const ADV_AA: [u8; 4] = [0xD6, 0xBE, 0x89, 0x8E];
    const ADDR_A: [u8; 6] = [0x42, 0x89, 0x18, 0xBC, 0xAB, 0xFA];
    const ADDR_B: [u8; 6] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06];

    /// AA + header + body + rssi + status
    fn adv_payload(header0: u8, body: &[u8], rssi: u8, status: u8) -> Vec<u8> {
        let mut p = ADV_AA.to_vec();
        p.push(header0);
        p.push(body.len() as u8);
        p.extend_from_slice(body);
        p.push(rssi);
        p.push(status);
        p
    }

    fn decode(payload: &[u8]) -> BlePacket {
        decode_payload(payload, 1, 7, 3200, &DecoderConfig::default())
    }

    #[test]
    fn test_aa_constant_matches_wire_bytes() {
        assert_eq!(BLE_ADV_AA.to_le_bytes(), ADV_AA);
    }

    #[test]
    fn test_too_short_payload() {
        let pkt = decode(&[0xD6, 0xBE, 0x89, 0x8E, 0x00]);
        assert_eq!(pkt.kind, LinkKind::Unclassified);
        assert_eq!(pkt.pdu_type, None);
        assert_eq!(pkt.packet_num, 7);
        assert_eq!(pkt.timestamp_us, 100.0);
        assert_eq!(pkt.raw.len(), 5);
    }

    #[test]
    fn test_data_channel_not_decoded() {
        let pkt = decode(&[0x11, 0x22, 0x33, 0x44, 0x01, 0x00, 0xC0, 0x85]);
        assert_eq!(pkt.kind, LinkKind::Data);
        assert_eq!(pkt.access_address, 0x44332211);
        assert_eq!(pkt.pdu_type, None);
        assert_eq!(pkt.rssi, 0);
        assert!(pkt.address().is_none());
    }

    #[test]
    fn test_rssi_boundaries() {
        let pkt = decode(&adv_payload(0x00, &ADDR_A, 0x00, 0x25));
        assert_eq!(pkt.rssi, -73);
        let pkt = decode(&adv_payload(0x00, &ADDR_A, 0x80, 0x25));
        assert_eq!(pkt.rssi, -201);
        let pkt = decode(&adv_payload(0x00, &ADDR_A, 0x7F, 0x25));
        assert_eq!(pkt.rssi, 127 - 73);
        let pkt = decode(&adv_payload(0x00, &ADDR_A, 0xFF, 0x25));
        assert_eq!(pkt.rssi, -74);
    }

    #[test]
    fn test_rssi_offset_configurable() {
        let cfg = DecoderConfig { rssi_offset: -90, ..DecoderConfig::default() };
        let pkt = decode_payload(&adv_payload(0x00, &ADDR_A, 0x10, 0x25), 1, 1, 0, &cfg);
        assert_eq!(pkt.rssi, 16 - 90);
    }

    #[test]
    fn test_status_byte() {
        let pkt = decode(&adv_payload(0x00, &ADDR_A, 0x00, 0xA6));
        assert_eq!(pkt.channel, 0x26);
        assert!(pkt.crc_ok);
        let pkt = decode(&adv_payload(0x00, &ADDR_A, 0x00, 0x27));
        assert_eq!(pkt.channel, 39);
        assert!(!pkt.crc_ok);
    }

    #[test]
    fn test_adv_ind_minimal_record() {
        // One record, 14-byte payload: AA + 00 00 + AdvA + rssi + status
        let mut payload = ADV_AA.to_vec();
        payload.extend_from_slice(&[0x00, 0x00]);
        payload.extend_from_slice(&ADDR_A);
        payload.extend_from_slice(&[0xD0, 0xA5]);
        assert_eq!(payload.len(), 14);

        let buf = make_record(1, 0, &payload);
        let packets = decode_capture(&buf, &DecoderConfig::default());
        assert_eq!(packets.len(), 1);

        let pkt = &packets[0];
        assert_eq!(pkt.pdu_type, Some(PduType::AdvInd));
        assert_eq!(pkt.pdu_type.unwrap().to_string(), "ADV_IND");
        assert_eq!(pkt.tx_addr_type, Some(AddrType::Public));
        assert_eq!(pkt.pdu_length, 0);
        assert!(pkt.ad_structures.is_empty());
        assert_eq!(pkt.adv_address.unwrap().to_string(), "FA:AB:BC:18:89:42");
        assert_eq!(pkt.address(), Some(BleAddress(ADDR_A)));
    }

    #[test]
    fn test_adv_ind_with_ad_data() {
        let mut body = ADDR_A.to_vec();
        body.extend_from_slice(&[0x02, 0x01, 0x06]);
        body.extend_from_slice(&[0x0C, 0x09]);
        body.extend_from_slice(b"INSTAX-1234");
        body.extend_from_slice(&[0x05, 0xFF, 0xD8, 0x04, 0x01, 0x02]);

        let pkt = decode(&adv_payload(0x40, &body, 0x00, 0x25));
        assert_eq!(pkt.tx_addr_type, Some(AddrType::Random));
        assert_eq!(pkt.pdu_length as usize, body.len());
        assert_eq!(pkt.ad_structures.len(), 3);
        assert_eq!(pkt.ad.device_name.as_deref(), Some("INSTAX-1234"));
        assert_eq!(pkt.ad.manufacturer, Some(Company::Fujifilm));
        assert_eq!(pkt.ad.manufacturer_data, vec![0x01, 0x02]);
        assert_eq!(
            pkt.ad.flags,
            vec![AdFlag::LeGeneralDiscoverable, AdFlag::BrEdrNotSupported]
        );
        assert!(matches!(pkt.ad_structures[1].value, AdValue::Name(_)));
    }

    #[test]
    fn test_scan_rsp_and_nonconn() {
        let mut body = ADDR_B.to_vec();
        body.extend_from_slice(&[0x04, 0x09, b'c', b'a', b'm']);

        let pkt = decode(&adv_payload(0x04, &body, 0x00, 0x25));
        assert_eq!(pkt.pdu_type, Some(PduType::ScanRsp));
        assert_eq!(pkt.adv_address, Some(BleAddress(ADDR_B)));
        assert_eq!(pkt.ad.device_name.as_deref(), Some("cam"));

        let pkt = decode(&adv_payload(0x02, &body, 0x00, 0x25));
        assert_eq!(pkt.pdu_type, Some(PduType::AdvNonconnInd));
        assert_eq!(pkt.ad_structures.len(), 1);
    }

    #[test]
    fn test_adv_address_needs_six_bytes() {
        let pkt = decode(&adv_payload(0x00, &[0x01, 0x02], 0x00, 0x25));
        assert_eq!(pkt.pdu_type, Some(PduType::AdvInd));
        assert!(pkt.adv_address.is_none());
    }

    #[test]
    fn test_scan_req() {
        let mut body = ADDR_B.to_vec();
        body.extend_from_slice(&ADDR_A);
        let pkt = decode(&adv_payload(0x03, &body, 0x00, 0x25));
        assert_eq!(pkt.pdu_type, Some(PduType::ScanReq));
        assert_eq!(pkt.scanner_address, Some(BleAddress(ADDR_B)));
        assert_eq!(pkt.adv_address, Some(BleAddress(ADDR_A)));
        assert!(pkt.ad_structures.is_empty());

        // 16 bytes: too short for both addresses
        let pkt = decode(&adv_payload(0x03, &ADDR_B[..4], 0x00, 0x25));
        assert_eq!(pkt.pdu_type, Some(PduType::ScanReq));
        assert!(pkt.scanner_address.is_none());
        assert!(pkt.adv_address.is_none());
    }

    fn connect_ind_payload(interval: u16) -> Vec<u8> {
        let mut body = ADDR_B.to_vec(); // InitA
        body.extend_from_slice(&ADDR_A); // AdvA
        let mut ll = [0u8; 22];
        ll[0..4].copy_from_slice(&[0x78, 0x56, 0x34, 0x12]); // AA
        ll[4..7].copy_from_slice(&[0xAB, 0xCD, 0xEF]); // CRCInit
        ll[10..12].copy_from_slice(&interval.to_le_bytes());
        ll[12..14].copy_from_slice(&4u16.to_le_bytes());
        ll[14..16].copy_from_slice(&200u16.to_le_bytes());
        body.extend_from_slice(&ll);
        adv_payload(0x05, &body, 0xE0, 0x25)
    }

    #[test]
    fn test_connect_ind() {
        let payload = connect_ind_payload(0x0010);
        assert_eq!(payload.len(), 42);

        let pkt = decode(&payload);
        assert_eq!(pkt.pdu_type, Some(PduType::ConnectInd));
        assert_eq!(pkt.initiator_address, Some(BleAddress(ADDR_B)));
        assert_eq!(pkt.adv_address, Some(BleAddress(ADDR_A)));

        let conn = pkt.connection.expect("connection params");
        assert_eq!(conn.interval_ms, 20.0);
        assert_eq!(conn.latency, 4);
        assert_eq!(conn.timeout_ms, 2000.0);
        assert_eq!(conn.access_address_hex(), "12345678");
        assert_eq!(conn.crc_init_hex(), "abcdef");
    }

    #[test]
    fn test_connect_ind_exactly_forty_bytes() {
        // Synthetic 40-byte payload with no RSSI/status trailer
        let mut payload = connect_ind_payload(0x0010);
        payload.truncate(40);
        let pkt = decode(&payload);
        assert_eq!(pkt.connection.map(|c| c.interval_ms), Some(20.0));

        payload.truncate(39);
        let pkt = decode(&payload);
        assert_eq!(pkt.pdu_type, Some(PduType::ConnectInd));
        assert!(pkt.connection.is_none());
        assert!(pkt.initiator_address.is_none());
    }

    #[test]
    fn test_unknown_and_direct_pdu_types() {
        let pkt = decode(&adv_payload(0x07, &ADDR_A, 0x00, 0x25));
        assert_eq!(pkt.pdu_type, Some(PduType::Unknown(7)));
        assert_eq!(pkt.pdu_type.unwrap().to_string(), "UNKNOWN_0x07");
        assert!(pkt.adv_address.is_none());
        assert_eq!(pkt.rssi, -73);

        let pkt = decode(&adv_payload(0x01, &[ADDR_A, ADDR_B].concat(), 0x00, 0x25));
        assert_eq!(pkt.pdu_type, Some(PduType::AdvDirectInd));
        assert!(pkt.adv_address.is_none());
    }

    #[test]
    fn test_radio_status_trailer() {
        let status = RadioStatus::from_trailer(&[0x11, 0x22, 0x10, 0x80 | 37], -73).unwrap();
        assert_eq!(status, RadioStatus { rssi: -57, channel: 37, crc_ok: true });
        assert!(RadioStatus::from_trailer(&[0x10], -73).is_none());
    }

    #[test]
    fn test_decode_is_idempotent() {
        let buf = make_record(3, 64_000, &connect_ind_payload(24));
        let rec = psd::records(&buf).next().unwrap();
        let cfg = DecoderConfig::default();
        let a = BlePacket::decode(&rec, &cfg);
        let b = BlePacket::decode(&rec, &cfg);
        assert_eq!(a, b);
        assert_eq!(a.timestamp_us, 2000.0);
    }

    #[test]
    fn test_address_parse_and_filter() {
        let addr: BleAddress = "fa:ab:bc:18:89:42".parse().unwrap();
        assert_eq!(addr, BleAddress(ADDR_A));
        assert_eq!("FA-AB-BC-18-89-42".parse::<BleAddress>().unwrap(), addr);
        assert!("FA:AB:BC:18:89".parse::<BleAddress>().is_err());
        assert!("FA:AB:BC:18:89:ZZ".parse::<BleAddress>().is_err());
        assert!("+1:02:03:04:05:06".parse::<BleAddress>().is_err());

        let err = "nope".parse::<BleAddress>().unwrap_err();
        assert_eq!(err.to_string(), "invalid BLE address 'nope'");

        let packets = vec![
            decode(&adv_payload(0x00, &ADDR_B, 0x00, 0x25)),
            decode(&connect_ind_payload(24)),
            decode(&adv_payload(0x00, &ADDR_A, 0x00, 0x25)),
        ];
        let hits = filter_by_address(&packets, &addr);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].pdu_type, Some(PduType::ConnectInd));

        let hits = filter_by_address(&packets, &BleAddress(ADDR_B));
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_pdu_type_code_round_trip() {
        for code in 0..16u8 {
            assert_eq!(PduType::from_bits(code).code(), code);
        }
    }
}
