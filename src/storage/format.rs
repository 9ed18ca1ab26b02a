//! Binary format for run results.
//!
//! ## Format Layout
//!
//! ```text
//! +------------------+
//! | Header (32 bytes)|
//! +------------------+
//! | Run record       |
//! | (bincode)        |
//! +------------------+
//! ```
//!
//! ### Header (32 bytes)
//! - Magic number (4 bytes): "CLNR"
//! - Version (2 bytes)
//! - Flags (2 bytes): reserved, 0
//! - Number of maps (4 bytes)
//! - Number of epochs (4 bytes)
//! - Payload length (8 bytes)
//! - Reserved (8 bytes)

use crate::error::{CorrsomError, Result};
use crate::storage::RunRecord;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Magic number for run files.
const MAGIC: &[u8; 4] = b"CLNR";

/// Current format version.
const VERSION: u16 = 1;

/// Header size in bytes.
const HEADER_SIZE: usize = 32;

/// Run file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunHeader {
    /// Format version.
    pub version: u16,
    /// Flags.
    pub flags: u16,
    /// Number of maps in the record.
    pub num_maps: u32,
    /// Number of training epochs in the record.
    pub epochs: u32,
    /// Length of the bincode payload.
    pub payload_len: u64,
}

impl RunHeader {
    /// Creates a header for the current version.
    pub fn new(num_maps: u32, epochs: u32, payload_len: u64) -> Self {
        Self {
            version: VERSION,
            flags: 0,
            num_maps,
            epochs,
            payload_len,
        }
    }

    /// Writes the header to bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(MAGIC);
        bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
        bytes[6..8].copy_from_slice(&self.flags.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.num_maps.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.epochs.to_le_bytes());
        bytes[16..24].copy_from_slice(&self.payload_len.to_le_bytes());
        // Reserved (bytes 24-31)
        bytes
    }

    /// Reads a header from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(CorrsomError::Storage("Header too short".to_string()));
        }
        if &bytes[0..4] != MAGIC {
            return Err(CorrsomError::Storage("Invalid magic number".to_string()));
        }

        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version > VERSION {
            return Err(CorrsomError::Storage(format!(
                "Unsupported format version {} (newest known is {})",
                version, VERSION
            )));
        }

        let mut u32_at = [0u8; 4];
        let mut u64_at = [0u8; 8];
        u32_at.copy_from_slice(&bytes[8..12]);
        let num_maps = u32::from_le_bytes(u32_at);
        u32_at.copy_from_slice(&bytes[12..16]);
        let epochs = u32::from_le_bytes(u32_at);
        u64_at.copy_from_slice(&bytes[16..24]);
        let payload_len = u64::from_le_bytes(u64_at);

        Ok(Self {
            version,
            flags: u16::from_le_bytes([bytes[6], bytes[7]]),
            num_maps,
            epochs,
            payload_len,
        })
    }
}

fn header_count(what: &str, count: usize) -> Result<u32> {
    u32::try_from(count)
        .map_err(|_| CorrsomError::Storage(format!("Too many {} for a run file: {}", what, count)))
}

/// Binary format reader/writer for run files.
pub struct RunFormat;

impl RunFormat {
    /// Writes a run record.
    pub fn write<P: AsRef<Path>>(path: P, record: &RunRecord) -> Result<()> {
        let payload = bincode::serialize(record)?;
        let num_maps = header_count("maps", record.maps.len())?;
        let epochs = header_count("epochs", record.schedule.epochs())?;
        let header = RunHeader::new(num_maps, epochs, payload.len() as u64);

        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(&header.to_bytes())?;
        writer.write_all(&payload)?;
        writer.flush()?;
        Ok(())
    }

    /// Reads only the header of a run file.
    pub fn read_header<P: AsRef<Path>>(path: P) -> Result<RunHeader> {
        let mut reader = Self::open(path.as_ref())?;
        let mut bytes = [0u8; HEADER_SIZE];
        reader.read_exact(&mut bytes)?;
        RunHeader::from_bytes(&bytes)
    }

    /// Reads a run record.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<RunRecord> {
        let mut reader = Self::open(path.as_ref())?;
        let mut bytes = [0u8; HEADER_SIZE];
        reader.read_exact(&mut bytes)?;
        let header = RunHeader::from_bytes(&bytes)?;

        let mut payload = Vec::new();
        reader.read_to_end(&mut payload)?;
        if payload.len() as u64 != header.payload_len {
            return Err(CorrsomError::Storage(format!(
                "Truncated payload: expected {} bytes, found {}",
                header.payload_len,
                payload.len()
            )));
        }

        let record: RunRecord = bincode::deserialize(&payload)?;
        if record.maps.len() != header.num_maps as usize {
            return Err(CorrsomError::Storage(format!(
                "Header lists {} maps but the record holds {}",
                header.num_maps,
                record.maps.len()
            )));
        }
        Ok(record)
    }

    fn open(path: &Path) -> Result<BufReader<File>> {
        if !path.exists() {
            return Err(CorrsomError::FileNotFound(path.to_path_buf()));
        }
        Ok(BufReader::new(File::open(path)?))
    }
}
