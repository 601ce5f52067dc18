//! Management frame construction and header parsing.
//!
//! Beacon and Probe Response share one body layout up to the TIM element,
//! which the kernel inserts on its own. `build_beacon_pr_head` covers
//! everything before it, `build_beacon_pr_tail` everything after.

use heapless::Vec;

use crate::ap::options::RateSet;
use crate::error::{EncodeError, FrameError};
use crate::ie::{self, RsnInfo};
use crate::mac::MacAddr;

/// Beacon head and tail bounds handed to NL80211_CMD_START_AP.
pub const BEACON_HEAD_LEN: usize = 256;
pub const BEACON_TAIL_LEN: usize = 256;
/// Probe responses carry head and tail in one buffer.
pub const PROBE_RESP_LEN: usize = 512;

/// Capability Information bits we advertise.
pub const CAP_ESS: u16 = 0x0001;
pub const CAP_PRIVACY: u16 = 0x0010;

/// Management frame subtypes (frame control bits 4..8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MgmtSubtype {
    ProbeRequest = 4,
    ProbeResponse = 5,
    Beacon = 8,
}

/// Frame-type pattern for an NL80211_CMD_REGISTER_FRAME subscription:
/// type Management, subtype Probe Request.
pub const FRAME_TYPE_MGMT_PROBE_REQUEST: u16 = (MgmtSubtype::ProbeRequest as u16) << 4;

/// The fixed 24-byte management MPDU header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MgmtHeader {
    pub frame_control: u16,
    pub duration: u16,
    pub addr1: MacAddr,
    pub addr2: MacAddr,
    pub addr3: MacAddr,
    pub seq_ctrl: u16,
}

impl MgmtHeader {
    pub const LEN: usize = 24;

    /// Splits a raw frame into its header and body.
    pub fn parse(frame: &[u8]) -> Result<(MgmtHeader, &[u8]), FrameError> {
        if frame.len() < Self::LEN {
            return Err(FrameError::Truncated);
        }
        let fc = u16::from_le_bytes([frame[0], frame[1]]);
        // Protocol version 0, type Management.
        if fc & 0x000f != 0 {
            return Err(FrameError::Malformed);
        }
        let hdr = MgmtHeader {
            frame_control: fc,
            duration: u16::from_le_bytes([frame[2], frame[3]]),
            addr1: MacAddr::try_from(&frame[4..10]).map_err(|_| FrameError::Truncated)?,
            addr2: MacAddr::try_from(&frame[10..16]).map_err(|_| FrameError::Truncated)?,
            addr3: MacAddr::try_from(&frame[16..22]).map_err(|_| FrameError::Truncated)?,
            seq_ctrl: u16::from_le_bytes([frame[22], frame[23]]),
        };
        Ok((hdr, &frame[Self::LEN..]))
    }

    pub fn subtype(&self) -> u8 {
        (self.frame_control >> 4 & 0x0f) as u8
    }
}

/// Everything the frame builders need to describe the BSS.
#[derive(Debug, Clone, Copy)]
pub struct BssDescription<'a> {
    pub bssid: MacAddr,
    pub ssid: &'a [u8],
    pub channel: u8,
    pub beacon_interval: u16,
    pub rates: &'a RateSet,
    pub rsn: RsnInfo,
}

/// Builds the Beacon / Probe Response header and body up to the TIM element:
/// MPDU header, zeroed timestamp, beacon interval, capabilities, then the
/// SSID, Supported Rates and DSSS Parameter Set elements.
pub fn build_beacon_pr_head<const N: usize>(
    bss: &BssDescription<'_>,
    subtype: MgmtSubtype,
    dest: MacAddr,
    out: &mut Vec<u8, N>,
) -> Result<(), EncodeError> {
    let fc = (subtype as u16) << 4;
    ie::extend(out, &fc.to_le_bytes())?;
    ie::extend(out, &0u16.to_le_bytes())?; // duration
    ie::extend(out, &dest.octets())?;
    ie::extend(out, &bss.bssid.octets())?; // SA
    ie::extend(out, &bss.bssid.octets())?; // BSSID
    ie::extend(out, &0u16.to_le_bytes())?; // sequence control

    // Timestamp is filled in by the hardware for beacons.
    ie::extend(out, &[0u8; 8])?;
    ie::extend(out, &bss.beacon_interval.to_le_bytes())?;
    ie::extend(out, &(CAP_ESS | CAP_PRIVACY).to_le_bytes())?;

    ie::push(out, ie::IE_TYPE_SSID)?;
    ie::push(out, bss.ssid.len() as u8)?;
    ie::extend(out, bss.ssid)?;

    // At most 8 rates fit a Supported Rates element; the lowest one is the
    // only rate flagged basic.
    ie::push(out, ie::IE_TYPE_SUPPORTED_RATES)?;
    let count = bss.rates.iter().take(8).count();
    if count == 0 {
        return Err(EncodeError::NoRates);
    }
    ie::push(out, count as u8)?;
    for (i, rate) in bss.rates.iter().take(8).enumerate() {
        let flag = if i == 0 { 0x80 } else { 0 };
        ie::push(out, rate | flag)?;
    }

    ie::push(out, ie::IE_TYPE_DSSS_PARAMETER_SET)?;
    ie::push(out, 1)?;
    ie::push(out, bss.channel)?;

    Ok(())
}

/// Builds the portion after the TIM element, currently just the RSNE.
pub fn build_beacon_pr_tail<const N: usize>(
    bss: &BssDescription<'_>,
    out: &mut Vec<u8, N>,
) -> Result<(), EncodeError> {
    // TODO: Country element between the TIM element and the RSNE.
    bss.rsn.build(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ie::{CipherSuite, IeIterator};

    fn rates(list: &[u8]) -> RateSet {
        let mut set = RateSet::new();
        for &r in list {
            set.insert(r);
        }
        set
    }

    fn bss<'a>(ssid: &'a [u8], channel: u8, rate_set: &'a RateSet) -> BssDescription<'a> {
        BssDescription {
            bssid: MacAddr::new([2, 0, 0, 0, 0, 1]),
            ssid,
            channel,
            beacon_interval: 100,
            rates: rate_set,
            rsn: RsnInfo::for_psk(CipherSuite::CCMP),
        }
    }

    #[test]
    fn head_round_trips() {
        for (ssid, channel, rate_list) in [
            (&b"MyAP"[..], 6u8, &[22u8, 2, 11][..]),
            (&b"x"[..], 1, &[2u8][..]),
            (&[0xffu8; 32][..], 14, &[2u8, 4, 11, 12, 22, 24, 36, 44][..]),
        ] {
            let rate_set = rates(rate_list);
            let bss = bss(ssid, channel, &rate_set);
            let mut buf: heapless::Vec<u8, BEACON_HEAD_LEN> = heapless::Vec::new();
            build_beacon_pr_head(&bss, MgmtSubtype::Beacon, MacAddr::BROADCAST, &mut buf)
                .unwrap();

            let (hdr, body) = MgmtHeader::parse(&buf).unwrap();
            assert_eq!(hdr.subtype(), MgmtSubtype::Beacon as u8);
            assert_eq!(hdr.addr1, MacAddr::BROADCAST);
            assert_eq!(hdr.addr2, bss.bssid);
            assert_eq!(hdr.addr3, bss.bssid);
            assert_eq!(hdr.duration, 0);
            assert_eq!(hdr.seq_ctrl, 0);

            assert_eq!(&body[..8], &[0u8; 8]); // timestamp
            assert_eq!(u16::from_le_bytes([body[8], body[9]]), 100);
            assert_eq!(u16::from_le_bytes([body[10], body[11]]), 0x0011);

            let ies: std::vec::Vec<_> = IeIterator::new(&body[12..]).collect();
            assert_eq!(ies[0].0, crate::ie::IE_TYPE_SSID);
            assert_eq!(ies[0].1, ssid);

            assert_eq!(ies[1].0, crate::ie::IE_TYPE_SUPPORTED_RATES);
            let mut expected: std::vec::Vec<u8> = rate_list.to_vec();
            expected.sort_unstable();
            let parsed: std::vec::Vec<u8> =
                ies[1].1.iter().map(|r| r & 0x7f).collect();
            assert_eq!(parsed, expected);
            // Exactly the smallest rate carries the basic flag.
            let basic: std::vec::Vec<u8> = ies[1]
                .1
                .iter()
                .filter(|r| *r & 0x80 != 0)
                .map(|r| r & 0x7f)
                .collect();
            assert_eq!(basic, vec![expected[0]]);

            assert_eq!(ies[2].0, crate::ie::IE_TYPE_DSSS_PARAMETER_SET);
            assert_eq!(ies[2].1, &[channel][..]);
            assert_eq!(ies.len(), 3);
        }
    }

    #[test]
    fn probe_response_subtype_and_dest() {
        let rate_set = rates(&[2, 11, 22]);
        let bss = bss(b"MyAP", 6, &rate_set);
        let dest = MacAddr::new([0xaa, 0xbb, 0xcc, 1, 2, 3]);
        let mut buf: heapless::Vec<u8, PROBE_RESP_LEN> = heapless::Vec::new();
        build_beacon_pr_head(&bss, MgmtSubtype::ProbeResponse, dest, &mut buf).unwrap();

        assert_eq!(u16::from_le_bytes([buf[0], buf[1]]), 0x0050);
        let (hdr, _) = MgmtHeader::parse(&buf).unwrap();
        assert_eq!(hdr.subtype(), MgmtSubtype::ProbeResponse as u8);
        assert_eq!(hdr.addr1, dest);
    }

    #[test]
    fn rates_are_capped_at_eight() {
        let rate_set = rates(&[2, 4, 11, 12, 22, 24, 36, 44, 48, 72]);
        let bss = bss(b"MyAP", 6, &rate_set);
        let mut buf: heapless::Vec<u8, BEACON_HEAD_LEN> = heapless::Vec::new();
        build_beacon_pr_head(&bss, MgmtSubtype::Beacon, MacAddr::BROADCAST, &mut buf)
            .unwrap();
        let (_, body) = MgmtHeader::parse(&buf).unwrap();
        let rates_ie = IeIterator::new(&body[12..])
            .find(|(tag, _)| *tag == crate::ie::IE_TYPE_SUPPORTED_RATES)
            .unwrap();
        assert_eq!(rates_ie.1.len(), 8);
        assert_eq!(rates_ie.1[0], 2 | 0x80);
        assert_eq!(rates_ie.1[7], 44);
    }

    #[test]
    fn tail_is_the_rsne() {
        let rate_set = rates(&[2]);
        let bss = bss(b"MyAP", 6, &rate_set);
        let mut buf: heapless::Vec<u8, BEACON_TAIL_LEN> = heapless::Vec::new();
        build_beacon_pr_tail(&bss, &mut buf).unwrap();
        assert_eq!(buf[0], crate::ie::IE_TYPE_RSN);
        assert_eq!(buf.len(), 2 + buf[1] as usize);
    }

    #[test]
    fn header_parse_rejects_short_and_non_mgmt() {
        assert_eq!(
            MgmtHeader::parse(&[0u8; 10]).unwrap_err(),
            FrameError::Truncated
        );
        // Data frame (type 2)
        let mut frame = [0u8; 24];
        frame[0] = 0x08;
        assert_eq!(
            MgmtHeader::parse(&frame).unwrap_err(),
            FrameError::Malformed
        );
    }
}
