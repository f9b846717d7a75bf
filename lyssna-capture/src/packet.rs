//! Captured packets and the retrieval statuses that carry them.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::device::CaptureDevice;
use crate::error::CaptureError;
use crate::timestamp::Timestamp;

/// Data-link framing of captured records (a libpcap `LINKTYPE_*` value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkType(pub i32);

impl LinkType {
    pub const NULL: LinkType = LinkType(0);
    pub const ETHERNET: LinkType = LinkType(1);
    pub const RAW: LinkType = LinkType(101);
    pub const IEEE802_11: LinkType = LinkType(105);
    pub const LINUX_SLL: LinkType = LinkType(113);

    /// Engine name for this link type, e.g. `EN10MB`.
    pub fn name(self) -> Option<String> {
        pcap::Linktype(self.0).get_name().ok()
    }
}

impl From<pcap::Linktype> for LinkType {
    fn from(linktype: pcap::Linktype) -> Self {
        LinkType(linktype.0)
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({})", name, self.0),
            None => write!(f, "DLT {}", self.0),
        }
    }
}

/// Per-packet metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PacketHeader {
    pub timestamp: Timestamp,
    /// Length of the packet on the wire.
    pub original_length: u32,
    /// Bytes actually captured, at most the snapshot length.
    pub captured_length: u32,
    pub link_type: LinkType,
}

impl PacketHeader {
    pub fn is_truncated(&self) -> bool {
        self.captured_length < self.original_length
    }
}

/// One captured record. Owns its bytes, so it outlives the retrieval call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCapture {
    header: PacketHeader,
    data: Bytes,
}

impl RawCapture {
    pub fn new(header: PacketHeader, data: Bytes) -> Self {
        Self { header, data }
    }

    pub fn header(&self) -> &PacketHeader {
        &self.header
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn into_parts(self) -> (PacketHeader, Bytes) {
        (self.header, self.data)
    }
}

/// Outcome of a single retrieval. Returned, never raised.
#[derive(Debug)]
pub enum Retrieval {
    Packet(RawCapture),
    /// Live read timeout expired with nothing to deliver.
    Timeout,
    /// Replay source exhausted.
    Eof,
    Error(CaptureError),
}

impl Retrieval {
    pub fn is_packet(&self) -> bool {
        matches!(self, Retrieval::Packet(_))
    }

    pub fn into_packet(self) -> Option<RawCapture> {
        match self {
            Retrieval::Packet(capture) => Some(capture),
            _ => None,
        }
    }
}

/// What the capture loop hands to its callback.
#[derive(Debug)]
pub struct PacketCaptureEvent<'a> {
    capture: RawCapture,
    device: &'a CaptureDevice,
}

impl<'a> PacketCaptureEvent<'a> {
    pub(crate) fn new(capture: RawCapture, device: &'a CaptureDevice) -> Self {
        Self { capture, device }
    }

    pub fn capture(&self) -> &RawCapture {
        &self.capture
    }

    pub fn device(&self) -> &'a CaptureDevice {
        self.device
    }

    pub fn into_capture(self) -> RawCapture {
        self.capture
    }

    /// Ends the running loop once this callback returns.
    pub fn stop_capture(&self) -> bool {
        self.device.stop_capture()
    }
}
