pub mod error;
pub mod export;
pub mod pcap;
pub mod report;

pub use error::{OutputError, Result};
