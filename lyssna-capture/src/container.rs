//! Capture-file header probing.
//!
//! Only the global header is read here; record parsing stays with the
//! engine. The probe lets a handle or path be rejected before the engine is
//! involved, and exposes the resolution a file was written with.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use lyssna_config::TimestampResolution;
use thiserror::Error;

use crate::packet::LinkType;

pub const PCAP_MAGIC_MICROS: u32 = 0xa1b2_c3d4;
pub const PCAP_MAGIC_NANOS: u32 = 0xa1b2_3c4d;
pub const PCAPNG_MAGIC: u32 = 0x0a0d_0d0a;
const PCAPNG_BYTE_ORDER_MAGIC: u32 = 0x1a2b_3c4d;

/// Length of a classic pcap global header.
pub const FILE_HEADER_LEN: usize = 24;
/// Bytes of a pcapng section header needed to learn byte order and version.
const PCAPNG_PREFIX_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("header truncated after {0} bytes")]
    Truncated(usize),

    #[error("unrecognised magic number {0:#010x}")]
    UnknownMagic(u32),

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    Pcap,
    PcapNg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    fn u16(self, bytes: &[u8]) -> u16 {
        let raw = [bytes[0], bytes[1]];
        match self {
            ByteOrder::Little => u16::from_le_bytes(raw),
            ByteOrder::Big => u16::from_be_bytes(raw),
        }
    }

    fn u32(self, bytes: &[u8]) -> u32 {
        let raw = [bytes[0], bytes[1], bytes[2], bytes[3]];
        match self {
            ByteOrder::Little => u32::from_le_bytes(raw),
            ByteOrder::Big => u32::from_be_bytes(raw),
        }
    }
}

/// Global header of a capture file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub format: ContainerFormat,
    pub byte_order: ByteOrder,
    pub version_major: u16,
    pub version_minor: u16,
    /// Not recorded in a pcapng section header.
    pub snap_length: Option<u32>,
    /// pcapng declares link types per interface, after the section header.
    pub link_type: Option<LinkType>,
    /// Resolution the file was written with, when the header says.
    pub resolution: Option<TimestampResolution>,
}

impl FileHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self, ContainerError> {
        if bytes.len() < 4 {
            return Err(ContainerError::Truncated(bytes.len()));
        }
        let magic = ByteOrder::Little.u32(bytes);

        if magic == PCAPNG_MAGIC {
            return Self::parse_pcapng(bytes);
        }

        let (byte_order, resolution) = match magic {
            PCAP_MAGIC_MICROS => (ByteOrder::Little, TimestampResolution::Microsecond),
            PCAP_MAGIC_NANOS => (ByteOrder::Little, TimestampResolution::Nanosecond),
            m if m == PCAP_MAGIC_MICROS.swap_bytes() => {
                (ByteOrder::Big, TimestampResolution::Microsecond)
            }
            m if m == PCAP_MAGIC_NANOS.swap_bytes() => (ByteOrder::Big, TimestampResolution::Nanosecond),
            other => return Err(ContainerError::UnknownMagic(other)),
        };
        if bytes.len() < FILE_HEADER_LEN {
            return Err(ContainerError::Truncated(bytes.len()));
        }

        // The upper 16 bits of the link-type word carry FCS flags.
        let network = byte_order.u32(&bytes[20..24]) & 0x0000_ffff;
        Ok(Self {
            format: ContainerFormat::Pcap,
            byte_order,
            version_major: byte_order.u16(&bytes[4..6]),
            version_minor: byte_order.u16(&bytes[6..8]),
            snap_length: Some(byte_order.u32(&bytes[16..20])),
            link_type: Some(LinkType(network as i32)),
            resolution: Some(resolution),
        })
    }

    fn parse_pcapng(bytes: &[u8]) -> Result<Self, ContainerError> {
        if bytes.len() < PCAPNG_PREFIX_LEN {
            return Err(ContainerError::Truncated(bytes.len()));
        }
        let bom = ByteOrder::Little.u32(&bytes[8..12]);
        let byte_order = if bom == PCAPNG_BYTE_ORDER_MAGIC {
            ByteOrder::Little
        } else if bom == PCAPNG_BYTE_ORDER_MAGIC.swap_bytes() {
            ByteOrder::Big
        } else {
            return Err(ContainerError::UnknownMagic(bom));
        };
        Ok(Self {
            format: ContainerFormat::PcapNg,
            byte_order,
            version_major: byte_order.u16(&bytes[12..14]),
            version_minor: byte_order.u16(&bytes[14..16]),
            snap_length: None,
            link_type: None,
            resolution: None,
        })
    }

    /// Reads and parses the header from the current position of `reader`.
    pub fn read_from<R: Read>(reader: R) -> Result<Self, ContainerError> {
        let mut buf = Vec::with_capacity(FILE_HEADER_LEN);
        reader.take(FILE_HEADER_LEN as u64).read_to_end(&mut buf)?;
        Self::parse(&buf)
    }
}

/// Probes the header of the capture file at `path`.
pub fn probe_file<P: AsRef<Path>>(path: P) -> Result<FileHeader, ContainerError> {
    FileHeader::read_from(File::open(path)?)
}
