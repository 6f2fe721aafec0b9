//! Paced UDP replay of a packet-capture project.
//!
//! [`pacing::replay`] drives a [`pcap_store::ProjectReader`] through a
//! bounded queue to a [`transport::UdpTransport`], reproducing the
//! original inter-packet timing at a configurable speed.

pub mod pacing;
pub mod transport;

pub use pacing::{replay, ReplayConfig, ReplayHandle, ReplayReport};
pub use transport::{TransportMode, UdpTransport, MAX_DATAGRAM};
