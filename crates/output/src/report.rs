//! Capture summaries built on top of decoded packets: device table, PDU
//! histogram, event timeline and connection events.
//!
//! Aggregation across packets lives here, not in the decoder: a device keeps
//! the first non-empty name and manufacturer it was seen with.

use std::collections::{BTreeSet, HashMap};
use std::io::{self, Write};

use bt_protocol::ad::AdValue;
use bt_protocol::ble::{AddrType, BleAddress, BlePacket, LinkKind, PduType};

const RULE_WIDTH: usize = 80;

/// Report label of a packet's PDU
pub fn pdu_label(pkt: &BlePacket) -> String {
    match (pkt.kind, pkt.pdu_type) {
        (LinkKind::Advertising, Some(t)) => t.to_string(),
        (LinkKind::Data, _) => "DATA_CHANNEL".to_string(),
        _ => "TOO_SHORT".to_string(),
    }
}

/// Per-address aggregate
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSummary {
    pub address: BleAddress,
    pub name: Option<String>,
    pub manufacturer: Option<String>,
    pub count: u64,
    pub rssi_sum: i64,
    pub pdu_types: BTreeSet<String>,
    /// Address type of the first packet attributed to this device
    pub addr_type: Option<AddrType>,
    /// Order of first sighting
    first_seen: usize,
}

impl DeviceSummary {
    pub fn mean_rssi(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.rssi_sum as f64 / self.count as f64
        }
    }
}

/// Devices keyed by the address each packet is attributed to
#[derive(Debug, Clone, Default)]
pub struct DeviceTable {
    devices: HashMap<BleAddress, DeviceSummary>,
}

impl DeviceTable {
    pub fn from_packets<'a>(packets: impl IntoIterator<Item = &'a BlePacket>) -> Self {
        let mut table = Self::default();
        for pkt in packets {
            table.add(pkt);
        }
        table
    }

    pub fn add(&mut self, pkt: &BlePacket) {
        let Some(address) = pkt.address() else {
            return;
        };
        let next = self.devices.len();
        let dev = self.devices.entry(address).or_insert_with(|| DeviceSummary {
            address,
            name: None,
            manufacturer: None,
            count: 0,
            rssi_sum: 0,
            pdu_types: BTreeSet::new(),
            addr_type: pkt.tx_addr_type,
            first_seen: next,
        });

        dev.count += 1;
        dev.rssi_sum += pkt.rssi as i64;
        dev.pdu_types.insert(pdu_label(pkt));
        if dev.name.is_none() {
            dev.name = pkt.ad.device_name.clone().filter(|n| !n.is_empty());
        }
        if dev.manufacturer.is_none() {
            dev.manufacturer = pkt.ad.manufacturer.map(|c| c.to_string());
        }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn get(&self, addr: &BleAddress) -> Option<&DeviceSummary> {
        self.devices.get(addr)
    }

    /// Devices by packet count, busiest first; ties keep first-seen order
    pub fn sorted(&self) -> Vec<&DeviceSummary> {
        let mut v: Vec<&DeviceSummary> = self.devices.values().collect();
        v.sort_by(|a, b| b.count.cmp(&a.count).then(a.first_seen.cmp(&b.first_seen)));
        v
    }

    /// Addresses whose device name contains `needle`, case-insensitively
    pub fn select_by_name(&self, needle: &str) -> BTreeSet<BleAddress> {
        let needle = needle.to_uppercase();
        self.devices
            .values()
            .filter(|d| {
                d.name
                    .as_deref()
                    .is_some_and(|n| n.to_uppercase().contains(&needle))
            })
            .map(|d| d.address)
            .collect()
    }
}

/// Packet count per PDU label
#[derive(Debug, Clone, Default)]
pub struct PduHistogram {
    counts: HashMap<String, u64>,
}

impl PduHistogram {
    pub fn from_packets<'a>(packets: impl IntoIterator<Item = &'a BlePacket>) -> Self {
        let mut counts = HashMap::new();
        for pkt in packets {
            *counts.entry(pdu_label(pkt)).or_insert(0) += 1;
        }
        Self { counts }
    }

    pub fn get(&self, label: &str) -> u64 {
        self.counts.get(label).copied().unwrap_or(0)
    }

    /// Labels by count, most frequent first, then alphabetically
    pub fn sorted(&self) -> Vec<(&str, u64)> {
        let mut v: Vec<(&str, u64)> = self.counts.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        v.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        v
    }
}

/// One row of the event timeline
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEvent {
    pub packet_num: u32,
    /// Milliseconds since the first selected packet
    pub rel_ms: f64,
    pub pdu: String,
    pub direction: String,
    pub info: String,
}

fn short_addr(addr: Option<BleAddress>) -> String {
    addr.map(|a| a.to_string()[..8].to_string()).unwrap_or_default()
}

/// Chronological events for `packets`, relative to the first one
pub fn timeline(packets: &[&BlePacket], label: &str) -> Vec<TimelineEvent> {
    let Some(first) = packets.first() else {
        return Vec::new();
    };
    let base = first.timestamp_us;

    packets
        .iter()
        .map(|pkt| {
            let name = pkt.ad.device_name.clone().filter(|n| !n.is_empty());
            let (direction, info) = match pkt.pdu_type {
                Some(PduType::ScanReq) => (
                    format!("{}->{}", short_addr(pkt.scanner_address), label),
                    "Scan Request".to_string(),
                ),
                Some(PduType::ConnectInd) => (
                    format!("{}->{}", short_addr(pkt.initiator_address), label),
                    match pkt.connection {
                        Some(c) => format!("Connect (interval={:.1}ms)", c.interval_ms),
                        None => "Connect".to_string(),
                    },
                ),
                Some(PduType::ScanRsp) => (
                    format!("{}->Scanner", label),
                    name.unwrap_or_else(|| "Scan Response".to_string()),
                ),
                Some(t) if t.carries_ad_data() => (
                    format!("{}->Broadcast", label),
                    name.unwrap_or_else(|| "Advertising".to_string()),
                ),
                _ => ("?".to_string(), String::new()),
            };
            TimelineEvent {
                packet_num: pkt.packet_num,
                rel_ms: (pkt.timestamp_us - base) / 1000.0,
                pdu: pdu_label(pkt),
                direction,
                info,
            }
        })
        .collect()
}

/// Text report over a decoded capture
pub struct Report<'a> {
    pub source: &'a str,
    pub packets: &'a [BlePacket],
    pub devices: DeviceTable,
    pub histogram: PduHistogram,
    /// Packets of interest (address or name selection), file order
    pub selected: Vec<&'a BlePacket>,
    /// Label used for the selected device in the timeline
    pub target_label: String,
    /// Maximum timeline rows
    pub max_events: usize,
}

impl<'a> Report<'a> {
    pub fn new(source: &'a str, packets: &'a [BlePacket]) -> Self {
        Self {
            source,
            packets,
            devices: DeviceTable::from_packets(packets),
            histogram: PduHistogram::from_packets(packets),
            selected: Vec::new(),
            target_label: "TARGET".to_string(),
            max_events: 50,
        }
    }

    /// Select every packet that involves one of `addrs`
    pub fn select(&mut self, addrs: &BTreeSet<BleAddress>) {
        self.selected = self
            .packets
            .iter()
            .filter(|p| addrs.iter().any(|a| p.involves(a)))
            .collect();
    }

    pub fn render<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let rule = "=".repeat(RULE_WIDTH);
        writeln!(w, "{}", rule)?;
        writeln!(w, "TI SmartRF Packet Sniffer - BLE Capture Analysis")?;
        writeln!(w, "{}", rule)?;
        writeln!(w, "\nFile: {}", self.source)?;
        writeln!(w, "Total packets: {}", self.packets.len())?;

        self.render_histogram(w)?;
        self.render_devices(w)?;

        if self.selected.is_empty() {
            return Ok(());
        }
        self.render_selection(w)?;
        self.render_timeline(w)?;
        self.render_ad_details(w)?;
        self.render_connections(w)?;
        Ok(())
    }

    fn render_histogram<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(w, "\n{:=^80}", " PDU Type Distribution ")?;
        for (label, count) in self.histogram.sorted() {
            let bar = "#".repeat((count / 10).min(50) as usize);
            writeln!(w, "  {:<25} {:>5} {}", label, count, bar)?;
        }
        Ok(())
    }

    fn render_devices<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(w, "\n{:=^80}", " Discovered BLE Devices ")?;
        writeln!(
            w,
            "{:<20} {:<22} {:<15} {:>5} {:>6}",
            "Address", "Name", "Manufacturer", "Pkts", "RSSI"
        )?;
        writeln!(w, "{}", "-".repeat(RULE_WIDTH))?;
        for dev in self.devices.sorted() {
            let name: String = dev.name.as_deref().unwrap_or("-").chars().take(21).collect();
            let mfg: String = dev.manufacturer.as_deref().unwrap_or("-").chars().take(14).collect();
            writeln!(
                w,
                "{:<20} {:<22} {:<15} {:>5} {:>6.0}",
                dev.address.to_string(),
                name,
                mfg,
                dev.count,
                dev.mean_rssi()
            )?;
        }
        Ok(())
    }

    fn render_selection<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(w, "\n{:=^80}", " Selected Devices ")?;
        let addrs: BTreeSet<BleAddress> = self.selected.iter().filter_map(|p| p.address()).collect();
        for dev in addrs.iter().filter_map(|a| self.devices.get(a)) {
            writeln!(w, "\n  Device Name: {}", dev.name.as_deref().unwrap_or("Unknown"))?;
            writeln!(w, "  MAC Address: {}", dev.address)?;
            match dev.addr_type {
                Some(t) => writeln!(w, "  Address Type: {}", t)?,
                None => writeln!(w, "  Address Type: Unknown")?,
            }
            writeln!(w, "  Total Packets: {}", dev.count)?;
            let types: Vec<&str> = dev.pdu_types.iter().map(String::as_str).collect();
            writeln!(w, "  PDU Types: {}", types.join(", "))?;
        }
        Ok(())
    }

    fn render_timeline<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(w, "\n{:=^80}", " Communication Timeline ")?;
        writeln!(
            w,
            "{:>4} {:>10} {:<20} {:<20} Info",
            "#", "Time(ms)", "PDU Type", "Direction"
        )?;
        writeln!(w, "{}", "-".repeat(RULE_WIDTH))?;

        let events = timeline(&self.selected, &self.target_label);
        for ev in events.iter().take(self.max_events) {
            writeln!(
                w,
                "{:>4} {:>10.2} {:<20} {:<20} {}",
                ev.packet_num, ev.rel_ms, ev.pdu, ev.direction, ev.info
            )?;
        }
        if events.len() > self.max_events {
            writeln!(w, "... and {} more packets", events.len() - self.max_events)?;
        }
        Ok(())
    }

    fn render_ad_details<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(w, "\n{:=^80}", " Advertising Data Structures ")?;
        let mut shown = BTreeSet::new();
        for pkt in &self.selected {
            if pkt.ad_structures.is_empty() || !shown.insert(pkt.adv_address) {
                continue;
            }
            writeln!(w, "\nPacket #{} ({}):", pkt.packet_num, pdu_label(pkt))?;
            for ad in &pkt.ad_structures {
                writeln!(w, "  [{}]", ad.ad_type)?;
                match &ad.value {
                    AdValue::Name(name) => writeln!(w, "    Name: {}", name)?,
                    AdValue::Manufacturer { company, data } => {
                        writeln!(w, "    Company: {}", company)?;
                        writeln!(w, "    Data: {}", truncated_hex(data, 20))?;
                    }
                    AdValue::Flags(flags) => {
                        let names: Vec<&str> = flags.iter().map(|f| f.name()).collect();
                        writeln!(w, "    Flags: {}", names.join(", "))?;
                    }
                    AdValue::Uuid16(uuids) => {
                        let list: Vec<String> = uuids.iter().map(|u| format!("0x{:04X}", u)).collect();
                        writeln!(w, "    UUIDs: {}", list.join(", "))?;
                    }
                    AdValue::TxPower(p) => writeln!(w, "    TX Power: {} dBm", p)?,
                    AdValue::Raw => writeln!(w, "    Data: {}", truncated_hex(&ad.data, 20))?,
                }
            }
        }
        Ok(())
    }

    fn render_connections<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let conns: Vec<&&BlePacket> = self
            .selected
            .iter()
            .filter(|p| p.pdu_type == Some(PduType::ConnectInd))
            .collect();
        if conns.is_empty() {
            return Ok(());
        }

        writeln!(w, "\n{:=^80}", " Connection Events ")?;
        for pkt in conns {
            let addr = |a: Option<BleAddress>| a.map(|a| a.to_string()).unwrap_or_default();
            writeln!(w, "\n  Packet #{}", pkt.packet_num)?;
            writeln!(w, "    Initiator: {}", addr(pkt.initiator_address))?;
            writeln!(w, "    Target: {}", addr(pkt.adv_address))?;
            if let Some(c) = &pkt.connection {
                writeln!(w, "    Data Access Address: {}", c.access_address_hex())?;
                writeln!(w, "    CRC Init: {}", c.crc_init_hex())?;
                writeln!(w, "    Connection Interval: {:.2} ms", c.interval_ms)?;
                writeln!(w, "    Slave Latency: {}", c.latency)?;
                writeln!(w, "    Supervision Timeout: {:.0} ms", c.timeout_ms)?;
            }
        }
        Ok(())
    }
}

/// Hex of at most `max` bytes, with an ellipsis when cut
fn truncated_hex(data: &[u8], max: usize) -> String {
    let mut s: String = data.iter().take(max).map(|b| format!("{:02x}", b)).collect();
    if data.len() > max {
        s.push_str("...");
    }
    s
}
