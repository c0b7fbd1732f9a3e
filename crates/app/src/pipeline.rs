use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};

use bt_output::export;
use bt_output::pcap::{LinkType, PcapWriter};
use bt_output::report::Report;
use bt_output::OutputError;
use bt_protocol::ble::{self, BleAddress, BlePacket, DecoderConfig};
use bt_protocol::psd;

/// Everything the CLI decides for one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input: PathBuf,
    pub decoder: DecoderConfig,
    pub pcap: Option<(PathBuf, LinkType)>,
    pub json: Option<PathBuf>,
    pub text: Option<PathBuf>,
    pub address: Option<BleAddress>,
    pub name: Option<String>,
    pub max_events: usize,
    pub print_report: bool,
}

/// Counts reported after a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub records: usize,
    pub advertising: usize,
    pub selected: usize,
    pub pcap_written: u64,
}

fn create(path: &Path) -> Result<BufWriter<File>, OutputError> {
    let file = File::create(path).map_err(|e| OutputError::file(path, e))?;
    Ok(BufWriter::new(file))
}

/// Decode a PSD file, print the report and write the requested outputs.
/// The input is read in full before any output file is created.
pub fn run_file(cfg: &RunConfig) -> Result<RunStats> {
    let start = Instant::now();
    let data = std::fs::read(&cfg.input)
        .with_context(|| format!("failed to read {}", cfg.input.display()))?;

    let records = psd::record_count(&data);
    log::info!("{}: {} bytes, {} records", cfg.input.display(), data.len(), records);

    let packets = ble::decode_capture(&data, &cfg.decoder);
    let advertising = packets.iter().filter(|p| p.is_advertising()).count();
    log::info!(
        "decoded {} packets ({} advertising) in {:.1} ms",
        packets.len(),
        advertising,
        start.elapsed().as_secs_f64() * 1000.0
    );

    let source = cfg.input.display().to_string();
    let mut report = Report::new(&source, &packets);
    report.max_events = cfg.max_events;

    let mut targets: BTreeSet<BleAddress> = BTreeSet::new();
    if let Some(addr) = cfg.address {
        targets.insert(addr);
        report.target_label = addr.to_string()[..8].to_string();
    }
    if let Some(name) = &cfg.name {
        let hits = report.devices.select_by_name(name);
        if hits.is_empty() {
            log::warn!("no device named like '{}' in capture", name);
        }
        targets.extend(hits);
        report.target_label = name.to_uppercase();
    }
    let selecting = cfg.address.is_some() || cfg.name.is_some();
    if selecting {
        report.select(&targets);
        log::info!("{} packets selected for {} device(s)", report.selected.len(), targets.len());
    }

    if cfg.print_report {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        report.render(&mut out).context("failed to write report")?;
        out.flush()?;
    }

    // Exports cover the selection when one was asked for, else every packet
    let exported: Vec<&BlePacket> = if selecting {
        report.selected.clone()
    } else {
        packets.iter().collect()
    };

    if let Some(path) = &cfg.json {
        let mut w = create(path)?;
        export::write_json(&mut w, exported.iter().copied())?;
        w.flush().map_err(|e| OutputError::file(path, e))?;
        log::info!("JSON export: {}", path.display());
    }

    if let Some(path) = &cfg.text {
        let w = create(path)?;
        export::write_transcript(w, packets.len(), exported.iter().copied())?;
        log::info!("text export: {}", path.display());
    }

    let mut pcap_written = 0;
    if let Some((path, link_type)) = &cfg.pcap {
        pcap_written = write_pcap(path, *link_type, cfg.decoder.rssi_offset, &packets)
            .with_context(|| format!("failed to write {}", path.display()))?;
        log::info!("pcap: {} packets to {}", pcap_written, path.display());
    }

    Ok(RunStats {
        records,
        advertising,
        selected: report.selected.len(),
        pcap_written,
    })
}

fn write_pcap(
    path: &Path,
    link_type: LinkType,
    rssi_offset: i32,
    packets: &[BlePacket],
) -> Result<u64, OutputError> {
    let w = create(path)?;
    let mut writer = PcapWriter::new(w, link_type)?.with_rssi_offset(rssi_offset);
    for pkt in packets {
        writer.write_ble(pkt)?;
    }
    writer.flush()?;
    Ok(writer.written())
}
