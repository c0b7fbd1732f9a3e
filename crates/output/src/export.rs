//! JSON and plain-text export of decoded packets.

use std::io::Write;

use serde::Serialize;

use bt_protocol::ad::{AdStructure, AdValue};
use bt_protocol::ble::{BleAddress, BlePacket};

use crate::error::Result;
use crate::report::pdu_label;

fn hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02x}", b)).collect()
}

fn addr(a: Option<BleAddress>) -> String {
    a.map(|a| a.to_string()).unwrap_or_default()
}

/// Serialized form of one AD element
#[derive(Debug, Clone, Serialize)]
pub struct AdRecord {
    #[serde(rename = "type")]
    pub ad_type: u8,
    pub type_name: String,
    pub data_hex: String,
    pub length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_power: Option<i8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mfg_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuids: Option<Vec<String>>,
}

impl From<&AdStructure> for AdRecord {
    fn from(ad: &AdStructure) -> Self {
        let mut rec = AdRecord {
            ad_type: ad.ad_type.code(),
            type_name: ad.ad_type.to_string(),
            data_hex: hex(&ad.data),
            length: ad.data.len(),
            flags: None,
            name: None,
            tx_power: None,
            company_id: None,
            company_name: None,
            mfg_data: None,
            uuids: None,
        };
        match &ad.value {
            AdValue::Flags(flags) => rec.flags = Some(flags.iter().map(|f| f.name()).collect()),
            AdValue::Name(name) => rec.name = Some(name.clone()),
            AdValue::TxPower(p) => rec.tx_power = Some(*p),
            AdValue::Manufacturer { company, data } => {
                rec.company_id = Some(company.id());
                rec.company_name = Some(company.to_string());
                rec.mfg_data = Some(hex(data));
            }
            AdValue::Uuid16(uuids) => {
                rec.uuids = Some(uuids.iter().map(|u| format!("0x{:04X}", u)).collect())
            }
            AdValue::Raw => {}
        }
        rec
    }
}

/// Serialized form of one packet; field order is the output order
#[derive(Debug, Clone, Serialize)]
pub struct PacketRecord {
    pub record_num: usize,
    pub packet_num: u32,
    pub timestamp_us: f64,
    pub pdu_type: String,
    pub access_address: String,
    pub tx_addr_type: String,
    pub pdu_length: u8,
    pub adv_address: String,
    pub scanner_address: String,
    pub initiator_address: String,
    pub device_name: String,
    pub manufacturer: String,
    pub manufacturer_data: String,
    pub tx_power: Option<i8>,
    pub flags: Vec<&'static str>,
    pub service_uuids: Vec<String>,
    pub rssi: i32,
    pub channel: u8,
    pub crc_ok: bool,
    pub raw_hex: String,
    pub ad_structures: Vec<AdRecord>,
    pub conn_access_addr: String,
    pub conn_crc_init: String,
    pub conn_interval: f64,
    pub conn_latency: u16,
    pub conn_timeout: f64,
}

impl From<&BlePacket> for PacketRecord {
    fn from(pkt: &BlePacket) -> Self {
        let conn = pkt.connection;
        PacketRecord {
            record_num: pkt.record_num,
            packet_num: pkt.packet_num,
            timestamp_us: pkt.timestamp_us,
            pdu_type: pdu_label(pkt),
            access_address: if pkt.raw.len() >= 4 { hex(&pkt.raw[..4]) } else { String::new() },
            tx_addr_type: pkt.tx_addr_type.map(|t| t.to_string()).unwrap_or_default(),
            pdu_length: pkt.pdu_length,
            adv_address: addr(pkt.adv_address),
            scanner_address: addr(pkt.scanner_address),
            initiator_address: addr(pkt.initiator_address),
            device_name: pkt.ad.device_name.clone().unwrap_or_default(),
            manufacturer: pkt.ad.manufacturer.map(|c| c.to_string()).unwrap_or_default(),
            manufacturer_data: hex(&pkt.ad.manufacturer_data),
            tx_power: pkt.ad.tx_power,
            flags: pkt.ad.flags.iter().map(|f| f.name()).collect(),
            service_uuids: pkt.ad.service_uuids.iter().map(|u| format!("0x{:04X}", u)).collect(),
            rssi: pkt.rssi,
            channel: pkt.channel,
            crc_ok: pkt.crc_ok,
            raw_hex: hex(&pkt.raw),
            ad_structures: pkt.ad_structures.iter().map(AdRecord::from).collect(),
            conn_access_addr: conn.map(|c| c.access_address_hex()).unwrap_or_default(),
            conn_crc_init: conn.map(|c| c.crc_init_hex()).unwrap_or_default(),
            conn_interval: conn.map_or(0.0, |c| c.interval_ms),
            conn_latency: conn.map_or(0, |c| c.latency),
            conn_timeout: conn.map_or(0.0, |c| c.timeout_ms),
        }
    }
}

/// Write packets as a pretty-printed JSON array
pub fn write_json<'a, W: Write>(
    w: W,
    packets: impl IntoIterator<Item = &'a BlePacket>,
) -> Result<()> {
    let records: Vec<PacketRecord> = packets.into_iter().map(PacketRecord::from).collect();
    serde_json::to_writer_pretty(w, &records)?;
    Ok(())
}

/// Write a line-oriented transcript
pub fn write_transcript<'a, W: Write>(
    mut w: W,
    total: usize,
    packets: impl IntoIterator<Item = &'a BlePacket>,
) -> Result<()> {
    let packets: Vec<&BlePacket> = packets.into_iter().collect();

    writeln!(w, "BLE Packet Capture - Detailed Export")?;
    writeln!(w, "{}\n", "=".repeat(70))?;
    writeln!(w, "Total packets: {}", total)?;
    writeln!(w, "Exported packets: {}\n", packets.len())?;

    for pkt in packets {
        writeln!(w, "Packet #{}", pkt.packet_num)?;
        writeln!(w, "  Time: {:.2} us", pkt.timestamp_us)?;
        writeln!(w, "  PDU: {}", pdu_label(pkt))?;
        writeln!(w, "  Address: {}", addr(pkt.address()))?;
        if let Some(name) = pkt.ad.device_name.as_deref().filter(|n| !n.is_empty()) {
            writeln!(w, "  Name: {}", name)?;
        }
        writeln!(w, "  RSSI: {} dBm", pkt.rssi)?;
        writeln!(w, "  Raw: {}", hex(&pkt.raw))?;
        writeln!(w)?;
    }
    w.flush()?;
    Ok(())
}
