//! Typed nl80211 command construction.
//!
//! Only the slice of the family this crate drives: starting and stopping a
//! BSS, transmitting a management frame and subscribing to received ones.
//! Attribute kind numbers follow `enum nl80211_attrs` in the kernel uapi.

use byteorder::{ByteOrder, NativeEndian};
use netlink_packet_generic::GenlHeader;
use netlink_packet_utils::nla::Nla;
use netlink_packet_utils::Emitable;

pub const NL80211_CMD_START_AP: u8 = 15;
pub const NL80211_CMD_STOP_AP: u8 = 16;
pub const NL80211_CMD_REGISTER_FRAME: u8 = 58;
pub const NL80211_CMD_FRAME: u8 = 59;

pub const NL80211_GENL_VERSION: u8 = 1;

pub const NL80211_HIDDEN_SSID_NOT_IN_USE: u32 = 0;
pub const NL80211_WPA_VERSION_2: u32 = 1 << 1;
pub const NL80211_AUTHTYPE_OPEN_SYSTEM: u32 = 0;
pub const NL80211_CHAN_WIDTH_20: u32 = 1;

const NL80211_ATTR_IFINDEX: u16 = 3;
const NL80211_ATTR_MAC: u16 = 6;
const NL80211_ATTR_BEACON_INTERVAL: u16 = 12;
const NL80211_ATTR_DTIM_PERIOD: u16 = 13;
const NL80211_ATTR_BEACON_HEAD: u16 = 14;
const NL80211_ATTR_BEACON_TAIL: u16 = 15;
const NL80211_ATTR_WIPHY_FREQ: u16 = 38;
const NL80211_ATTR_IE: u16 = 42;
const NL80211_ATTR_FRAME: u16 = 51;
const NL80211_ATTR_SSID: u16 = 52;
const NL80211_ATTR_AUTH_TYPE: u16 = 53;
const NL80211_ATTR_CIPHER_SUITES_PAIRWISE: u16 = 73;
const NL80211_ATTR_WPA_VERSIONS: u16 = 75;
const NL80211_ATTR_AKM_SUITES: u16 = 76;
const NL80211_ATTR_FRAME_MATCH: u16 = 91;
const NL80211_ATTR_FRAME_TYPE: u16 = 101;
const NL80211_ATTR_HIDDEN_SSID: u16 = 126;
const NL80211_ATTR_IE_PROBE_RESP: u16 = 127;
const NL80211_ATTR_IE_ASSOC_RESP: u16 = 128;
const NL80211_ATTR_DONT_WAIT_FOR_ACK: u16 = 142;
const NL80211_ATTR_CHANNEL_WIDTH: u16 = 159;

/// The nl80211 attributes this crate emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Nl80211Attr {
    Ifindex(u32),
    Mac([u8; 6]),
    BeaconInterval(u32),
    DtimPeriod(u32),
    BeaconHead(Vec<u8>),
    BeaconTail(Vec<u8>),
    WiphyFreq(u32),
    Ie(Vec<u8>),
    Frame(Vec<u8>),
    Ssid(Vec<u8>),
    AuthType(u32),
    CipherSuitesPairwise(Vec<u32>),
    WpaVersions(u32),
    AkmSuites(u32),
    FrameMatch(Vec<u8>),
    FrameType(u16),
    HiddenSsid(u32),
    IeProbeResp(Vec<u8>),
    IeAssocResp(Vec<u8>),
    DontWaitForAck,
    ChannelWidth(u32),
}

impl Nla for Nl80211Attr {
    fn value_len(&self) -> usize {
        use Nl80211Attr::*;
        match self {
            Ifindex(_) | BeaconInterval(_) | DtimPeriod(_) | WiphyFreq(_) | AuthType(_)
            | WpaVersions(_) | AkmSuites(_) | HiddenSsid(_) | ChannelWidth(_) => 4,
            FrameType(_) => 2,
            Mac(_) => 6,
            CipherSuitesPairwise(suites) => suites.len() * 4,
            BeaconHead(v) | BeaconTail(v) | Ie(v) | Frame(v) | Ssid(v) | FrameMatch(v)
            | IeProbeResp(v) | IeAssocResp(v) => v.len(),
            DontWaitForAck => 0,
        }
    }

    fn kind(&self) -> u16 {
        use Nl80211Attr::*;
        match self {
            Ifindex(_) => NL80211_ATTR_IFINDEX,
            Mac(_) => NL80211_ATTR_MAC,
            BeaconInterval(_) => NL80211_ATTR_BEACON_INTERVAL,
            DtimPeriod(_) => NL80211_ATTR_DTIM_PERIOD,
            BeaconHead(_) => NL80211_ATTR_BEACON_HEAD,
            BeaconTail(_) => NL80211_ATTR_BEACON_TAIL,
            WiphyFreq(_) => NL80211_ATTR_WIPHY_FREQ,
            Ie(_) => NL80211_ATTR_IE,
            Frame(_) => NL80211_ATTR_FRAME,
            Ssid(_) => NL80211_ATTR_SSID,
            AuthType(_) => NL80211_ATTR_AUTH_TYPE,
            CipherSuitesPairwise(_) => NL80211_ATTR_CIPHER_SUITES_PAIRWISE,
            WpaVersions(_) => NL80211_ATTR_WPA_VERSIONS,
            AkmSuites(_) => NL80211_ATTR_AKM_SUITES,
            FrameMatch(_) => NL80211_ATTR_FRAME_MATCH,
            FrameType(_) => NL80211_ATTR_FRAME_TYPE,
            HiddenSsid(_) => NL80211_ATTR_HIDDEN_SSID,
            IeProbeResp(_) => NL80211_ATTR_IE_PROBE_RESP,
            IeAssocResp(_) => NL80211_ATTR_IE_ASSOC_RESP,
            DontWaitForAck => NL80211_ATTR_DONT_WAIT_FOR_ACK,
            ChannelWidth(_) => NL80211_ATTR_CHANNEL_WIDTH,
        }
    }

    fn emit_value(&self, buffer: &mut [u8]) {
        use Nl80211Attr::*;
        match self {
            Ifindex(v) | BeaconInterval(v) | DtimPeriod(v) | WiphyFreq(v) | AuthType(v)
            | WpaVersions(v) | AkmSuites(v) | HiddenSsid(v) | ChannelWidth(v) => {
                NativeEndian::write_u32(buffer, *v)
            }
            FrameType(v) => NativeEndian::write_u16(buffer, *v),
            Mac(addr) => buffer.copy_from_slice(addr),
            CipherSuitesPairwise(suites) => {
                for (i, suite) in suites.iter().enumerate() {
                    NativeEndian::write_u32(&mut buffer[i * 4..], *suite);
                }
            }
            BeaconHead(v) | BeaconTail(v) | Ie(v) | Frame(v) | Ssid(v) | FrameMatch(v)
            | IeProbeResp(v) | IeAssocResp(v) => buffer.copy_from_slice(v),
            DontWaitForAck => {}
        }
    }
}

/// One nl80211 request: the generic netlink command plus its attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenlCmd {
    pub cmd: u8,
    pub attrs: Vec<Nl80211Attr>,
}

impl GenlCmd {
    pub fn new(cmd: u8) -> Self {
        GenlCmd {
            cmd,
            attrs: Vec::new(),
        }
    }

    pub fn attr(mut self, attr: Nl80211Attr) -> Self {
        self.attrs.push(attr);
        self
    }

    /// Finds the first attribute matched by `pick`.
    pub fn find_attr<'a, T>(&'a self, pick: impl Fn(&'a Nl80211Attr) -> Option<T>) -> Option<T> {
        self.attrs.iter().find_map(pick)
    }

    /// Serializes the generic netlink payload: genl header, then the
    /// attribute stream with kernel alignment.
    pub fn emit(&self) -> Vec<u8> {
        let header = GenlHeader {
            cmd: self.cmd,
            version: NL80211_GENL_VERSION,
        };
        let attrs = self.attrs.as_slice();
        let mut buf = vec![0u8; header.buffer_len() + attrs.buffer_len()];
        let split = header.buffer_len();
        header.emit(&mut buf[..split]);
        attrs.emit(&mut buf[split..]);
        buf
    }
}

/// 2.4 GHz channel number to center frequency in MHz.
pub fn channel_to_freq(channel: u8) -> Option<u32> {
    match channel {
        1..=13 => Some(2407 + 5 * channel as u32),
        14 => Some(2484),
        _ => None,
    }
}

/// NL80211_CMD_STOP_AP carries the interface index alone.
pub fn stop_ap(ifindex: u32) -> GenlCmd {
    GenlCmd::new(NL80211_CMD_STOP_AP).attr(Nl80211Attr::Ifindex(ifindex))
}

/// NL80211_CMD_REGISTER_FRAME subscribing to received management frames of
/// one frame-control pattern, with no payload match prefix.
pub fn register_frame(ifindex: u32, frame_type: u16) -> GenlCmd {
    GenlCmd::new(NL80211_CMD_REGISTER_FRAME)
        .attr(Nl80211Attr::Ifindex(ifindex))
        .attr(Nl80211Attr::FrameType(frame_type))
        .attr(Nl80211Attr::FrameMatch(Vec::new()))
}

/// NL80211_CMD_FRAME for a one-shot management frame transmission.
pub fn mgmt_frame(ifindex: u32, freq: u32, frame: Vec<u8>, wait_ack: bool) -> GenlCmd {
    let mut cmd = GenlCmd::new(NL80211_CMD_FRAME)
        .attr(Nl80211Attr::Ifindex(ifindex))
        .attr(Nl80211Attr::WiphyFreq(freq))
        .attr(Nl80211Attr::Frame(frame));
    if !wait_ack {
        cmd = cmd.attr(Nl80211Attr::DontWaitForAck);
    }
    cmd
}
