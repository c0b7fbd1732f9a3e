//! Advertising data (AD structure) parsing.
//!
//! AD data is a run of `len | type | data[len - 1]` elements. Parsing is
//! forward-tolerant: a zero length or an element that runs past the end of
//! the buffer ends the run and everything before it is kept.

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};

/// AD type codes with a known name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdType {
    Flags,
    Incomplete16BitUuids,
    Complete16BitUuids,
    Incomplete128BitUuids,
    Complete128BitUuids,
    ShortenedLocalName,
    CompleteLocalName,
    TxPowerLevel,
    ServiceData16,
    ManufacturerSpecific,
    Unknown(u8),
}

impl AdType {
    pub fn from_code(code: u8) -> Self {
        match code {
            0x01 => AdType::Flags,
            0x02 => AdType::Incomplete16BitUuids,
            0x03 => AdType::Complete16BitUuids,
            0x06 => AdType::Incomplete128BitUuids,
            0x07 => AdType::Complete128BitUuids,
            0x08 => AdType::ShortenedLocalName,
            0x09 => AdType::CompleteLocalName,
            0x0A => AdType::TxPowerLevel,
            0x16 => AdType::ServiceData16,
            0xFF => AdType::ManufacturerSpecific,
            other => AdType::Unknown(other),
        }
    }

    pub fn code(&self) -> u8 {
        match *self {
            AdType::Flags => 0x01,
            AdType::Incomplete16BitUuids => 0x02,
            AdType::Complete16BitUuids => 0x03,
            AdType::Incomplete128BitUuids => 0x06,
            AdType::Complete128BitUuids => 0x07,
            AdType::ShortenedLocalName => 0x08,
            AdType::CompleteLocalName => 0x09,
            AdType::TxPowerLevel => 0x0A,
            AdType::ServiceData16 => 0x16,
            AdType::ManufacturerSpecific => 0xFF,
            AdType::Unknown(code) => code,
        }
    }
}

impl fmt::Display for AdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            AdType::Flags => "Flags",
            AdType::Incomplete16BitUuids => "Incomplete 16-bit UUIDs",
            AdType::Complete16BitUuids => "Complete 16-bit UUIDs",
            AdType::Incomplete128BitUuids => "Incomplete 128-bit UUIDs",
            AdType::Complete128BitUuids => "Complete 128-bit UUIDs",
            AdType::ShortenedLocalName => "Shortened Local Name",
            AdType::CompleteLocalName => "Complete Local Name",
            AdType::TxPowerLevel => "TX Power Level",
            AdType::ServiceData16 => "Service Data (16-bit)",
            AdType::ManufacturerSpecific => "Manufacturer Specific",
            AdType::Unknown(code) => return write!(f, "Type_0x{:02X}", code),
        };
        f.write_str(name)
    }
}

/// Bits of the Flags AD element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdFlag {
    LeLimitedDiscoverable,
    LeGeneralDiscoverable,
    BrEdrNotSupported,
    LeBrEdrController,
    LeBrEdrHost,
}

impl AdFlag {
    pub const ALL: [AdFlag; 5] = [
        AdFlag::LeLimitedDiscoverable,
        AdFlag::LeGeneralDiscoverable,
        AdFlag::BrEdrNotSupported,
        AdFlag::LeBrEdrController,
        AdFlag::LeBrEdrHost,
    ];

    pub fn bit(&self) -> u8 {
        match self {
            AdFlag::LeLimitedDiscoverable => 0x01,
            AdFlag::LeGeneralDiscoverable => 0x02,
            AdFlag::BrEdrNotSupported => 0x04,
            AdFlag::LeBrEdrController => 0x08,
            AdFlag::LeBrEdrHost => 0x10,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AdFlag::LeLimitedDiscoverable => "LE Limited Discoverable",
            AdFlag::LeGeneralDiscoverable => "LE General Discoverable",
            AdFlag::BrEdrNotSupported => "BR/EDR Not Supported",
            AdFlag::LeBrEdrController => "LE+BR/EDR Controller",
            AdFlag::LeBrEdrHost => "LE+BR/EDR Host",
        }
    }

    /// Every flag set in `byte`, lowest bit first
    pub fn decode(byte: u8) -> Vec<AdFlag> {
        AdFlag::ALL.iter().copied().filter(|f| byte & f.bit() != 0).collect()
    }
}

/// Bluetooth SIG company identifiers we put a name to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Company {
    Microsoft,
    TexasInstruments,
    Apple,
    Mediatek,
    Nordic,
    Samsung,
    Google,
    Fitbit,
    Fujifilm,
    Unknown(u16),
}

impl Company {
    pub fn from_id(id: u16) -> Self {
        match id {
            0x0006 => Company::Microsoft,
            0x000D => Company::TexasInstruments,
            0x004C => Company::Apple,
            0x0046 => Company::Mediatek,
            0x0059 => Company::Nordic,
            0x0075 => Company::Samsung,
            0x00E0 => Company::Google,
            0x02E0 => Company::Fitbit,
            0x04D8 => Company::Fujifilm,
            other => Company::Unknown(other),
        }
    }

    pub fn id(&self) -> u16 {
        match *self {
            Company::Microsoft => 0x0006,
            Company::TexasInstruments => 0x000D,
            Company::Apple => 0x004C,
            Company::Mediatek => 0x0046,
            Company::Nordic => 0x0059,
            Company::Samsung => 0x0075,
            Company::Google => 0x00E0,
            Company::Fitbit => 0x02E0,
            Company::Fujifilm => 0x04D8,
            Company::Unknown(id) => id,
        }
    }
}

impl fmt::Display for Company {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Company::Microsoft => "Microsoft",
            Company::TexasInstruments => "Texas Instruments",
            Company::Apple => "Apple",
            Company::Mediatek => "Mediatek",
            Company::Nordic => "Nordic Semiconductor",
            Company::Samsung => "Samsung",
            Company::Google => "Google",
            Company::Fitbit => "Fitbit",
            Company::Fujifilm => "Fujifilm",
            Company::Unknown(id) => return write!(f, "Company_0x{:04X}", id),
        };
        f.write_str(name)
    }
}

/// Type-specific decode of one AD element
#[derive(Debug, Clone, PartialEq)]
pub enum AdValue {
    Flags(Vec<AdFlag>),
    Name(String),
    TxPower(i8),
    Manufacturer { company: Company, data: Vec<u8> },
    Uuid16(Vec<u16>),
    /// No semantic decode; the raw bytes are in `AdStructure::data`
    Raw,
}

/// One length-prefixed AD element
#[derive(Debug, Clone, PartialEq)]
pub struct AdStructure {
    pub ad_type: AdType,
    pub data: Vec<u8>,
    pub value: AdValue,
}

/// Flattened view over a packet's AD elements.
/// Name and manufacturer keep the first value seen, TX power and flags keep
/// the last, service UUIDs accumulate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdSummary {
    pub device_name: Option<String>,
    pub manufacturer: Option<Company>,
    pub manufacturer_data: Vec<u8>,
    pub tx_power: Option<i8>,
    pub flags: Vec<AdFlag>,
    pub service_uuids: Vec<u16>,
}

impl AdSummary {
    fn absorb(&mut self, value: &AdValue) {
        match value {
            AdValue::Flags(flags) => self.flags = flags.clone(),
            AdValue::Name(name) => {
                if self.device_name.is_none() {
                    self.device_name = Some(name.clone());
                }
            }
            AdValue::TxPower(p) => self.tx_power = Some(*p),
            AdValue::Manufacturer { company, data } => {
                if self.manufacturer.is_none() {
                    self.manufacturer = Some(*company);
                    self.manufacturer_data = data.clone();
                }
            }
            AdValue::Uuid16(uuids) => self.service_uuids.extend_from_slice(uuids),
            AdValue::Raw => {}
        }
    }
}

fn decode_value(ad_type: AdType, data: &[u8]) -> AdValue {
    match ad_type {
        AdType::Flags if !data.is_empty() => AdValue::Flags(AdFlag::decode(data[0])),
        AdType::ShortenedLocalName | AdType::CompleteLocalName if !data.is_empty() => {
            let name = String::from_utf8_lossy(data);
            AdValue::Name(name.trim_end_matches('\0').to_string())
        }
        AdType::TxPowerLevel if !data.is_empty() => AdValue::TxPower(data[0] as i8),
        AdType::ManufacturerSpecific if data.len() >= 2 => AdValue::Manufacturer {
            company: Company::from_id(LittleEndian::read_u16(&data[0..2])),
            data: data[2..].to_vec(),
        },
        AdType::Incomplete16BitUuids | AdType::Complete16BitUuids => AdValue::Uuid16(
            data.chunks_exact(2).map(LittleEndian::read_u16).collect(),
        ),
        _ => AdValue::Raw,
    }
}

/// Parse an AD byte run into its elements plus a flattened summary
pub fn parse_ad_structures(data: &[u8]) -> (Vec<AdStructure>, AdSummary) {
    let mut structures = Vec::new();
    let mut summary = AdSummary::default();

    let mut i = 0usize;
    while i + 1 < data.len() {
        let len = data[i] as usize;
        if len == 0 || i + len >= data.len() {
            if len != 0 {
                log::trace!("AD element at {} overruns buffer ({} + {} >= {})", i, i, len, data.len());
            }
            break;
        }

        let ad_type = AdType::from_code(data[i + 1]);
        let body = &data[i + 2..i + 1 + len];
        let value = decode_value(ad_type, body);
        summary.absorb(&value);

        structures.push(AdStructure {
            ad_type,
            data: body.to_vec(),
            value,
        });
        i += len + 1;
    }

    (structures, summary)
}
