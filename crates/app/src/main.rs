mod pipeline;

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use bt_output::pcap::LinkType;
use bt_protocol::ble::{BleAddress, DecoderConfig, DEFAULT_CLOCK_MHZ, DEFAULT_RSSI_OFFSET};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LinkArg {
    /// Raw link-layer payload (DLT 251)
    LeLl,
    /// PPI header around the payload (DLT 192)
    Ppi,
    /// LE pseudo-header with RSSI and channel (DLT 256)
    Phdr,
}

impl From<LinkArg> for LinkType {
    fn from(arg: LinkArg) -> Self {
        match arg {
            LinkArg::LeLl => LinkType::BleLl,
            LinkArg::Ppi => LinkType::Ppi,
            LinkArg::Phdr => LinkType::BleLlWithPhdr,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "ble-psd")]
#[command(about = "Decode TI SmartRF Packet Sniffer (.psd) BLE captures")]
struct Cli {
    /// PSD capture file
    file: PathBuf,

    /// PCAP output file
    #[arg(short = 'w', long)]
    write: Option<PathBuf>,

    /// PCAP link type
    #[arg(long, value_enum, default_value = "le-ll")]
    link_type: LinkArg,

    /// JSON export of the selected (or all) packets
    #[arg(long)]
    json: Option<PathBuf>,

    /// Text transcript of the selected (or all) packets
    #[arg(long)]
    text: Option<PathBuf>,

    /// Select packets involving this address (AA:BB:CC:DD:EE:FF)
    #[arg(short = 'a', long)]
    address: Option<BleAddress>,

    /// Select devices whose advertised name contains this text
    #[arg(short = 'n', long)]
    name: Option<String>,

    /// RSSI calibration offset in dB
    #[arg(long, default_value_t = DEFAULT_RSSI_OFFSET, allow_hyphen_values = true)]
    rssi_offset: i32,

    /// Sniffer timestamp clock in MHz
    #[arg(long, default_value_t = DEFAULT_CLOCK_MHZ)]
    clock_mhz: f64,

    /// Maximum rows in the event timeline
    #[arg(long, default_value = "50")]
    events: usize,

    /// Verbose output
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Do not print the report
    #[arg(short = 'q', long)]
    quiet: bool,
}

/// Filter used when RUST_LOG is unset
fn default_log_level(verbose: bool) -> &'static str {
    if verbose {
        "info"
    } else {
        "warn"
    }
}

fn main() {
    let cli = Cli::parse();

    let level = default_log_level(cli.verbose);
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if cli.verbose {
        log::info!("ble-psd starting");
        log::info!("input: {}", cli.file.display());
        log::info!("rssi offset: {} dB, clock: {} MHz", cli.rssi_offset, cli.clock_mhz);
    }

    let cfg = pipeline::RunConfig {
        input: cli.file,
        decoder: DecoderConfig {
            rssi_offset: cli.rssi_offset,
            clock_mhz: cli.clock_mhz,
        },
        pcap: cli.write.map(|path| (path, cli.link_type.into())),
        json: cli.json,
        text: cli.text,
        address: cli.address,
        name: cli.name,
        max_events: cli.events,
        print_report: !cli.quiet,
    };

    match pipeline::run_file(&cfg) {
        Ok(stats) => {
            if cli.verbose {
                log::info!(
                    "done: {} records, {} advertising, {} selected, {} written to pcap",
                    stats.records,
                    stats.advertising,
                    stats.selected,
                    stats.pcap_written,
                );
            }
        }
        Err(e) => {
            eprintln!("error: {:#}", e);
            std::process::exit(1);
        }
    }
}
