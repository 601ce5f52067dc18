//! Soft Access Point control for nl80211 devices.
//!
//! This crate is the AP-mode core of a wireless daemon: it builds the
//! Beacon / Probe Response frames the kernel needs, drives the
//! START_AP / STOP_AP command cycle over a generic netlink family, and
//! answers Probe Requests delivered through a management-frame
//! subscription. The daemon supplies the actual netlink connection by
//! implementing [`transport::GenlFamily`] and pumping completions and
//! received frames into the [`ap::ApModule`] from its event loop.
//!
//! The independent [`dpp`] module parses `DPP:` bootstrapping URIs and
//! derives the Wi-Fi Easy Connect authentication keys on NIST P-256.
//!
//! Out of scope here: client association and the 4-way handshake (the
//! kernel and the daemon's supplicant side handle those once beacons are
//! on-air), wiphy capability discovery, and channel survey.

pub mod ap;
pub mod device;
pub mod dpp;
pub mod error;
pub mod frame;
pub mod ie;
pub mod mac;
pub mod nl80211;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use ap::{ApEvent, ApEventHandler, ApModule, ApOptions, RateSet};
pub use device::Device;
pub use error::Error;
pub use mac::MacAddr;
pub use transport::{CmdId, GenlFamily, GenlReply, WatchId};
