//! ---
//! udap_section: "05-networking-external-interfaces"
//! udap_subsection: "module"
//! udap_type: "source"
//! udap_scope: "code"
//! udap_description: "UDP broadcast transport and device operations."
//! udap_version: "v0.1.0"
//! udap_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Sends UDAP requests over UDP broadcast and applies the replies to
//! [`udap_proto::DeviceRecord`]s.

pub mod client;
pub mod transport;

use std::time::Duration;

use udap_proto::{MacAddr, Method, ProtoError};

/// Shared result type for network operations.
pub type Result<T> = std::result::Result<T, NetError>;

/// Failures while exchanging datagrams with a device.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// Socket level failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// A reply buffer could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtoError),
    /// No reply arrived before the deadline.
    #[error("no reply within {0:?}")]
    Timeout(Duration),
    /// The device answered with a different operation.
    #[error("expected {expected:?} reply, got {actual:?}")]
    UnexpectedMethod {
        /// Method of the request.
        expected: Method,
        /// Method carried by the reply.
        actual: Method,
    },
    /// A read-IP reply did not include an IPv4 address.
    #[error("device {0} did not report an IP address")]
    NoAddressReported(MacAddr),
}

pub use client::{ClientConfig, DeviceClient, SaveOutcome};
pub use transport::{BroadcastTransport, Datagram, InMemoryTransport, Transport};
