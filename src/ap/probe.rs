//! Probe Request parsing and the reply-decision policy of IEEE 802.11-2016
//! §11.1.4.3.2.

use crate::error::FrameError;
use crate::frame::{MgmtHeader, MgmtSubtype};
use crate::ie::{IeIterator, IE_TYPE_DSSS_PARAMETER_SET, IE_TYPE_SSID, IE_TYPE_SSID_LIST};
use crate::mac::MacAddr;

/// A received Probe Request, reduced to the fields the policy consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeRequest<'a> {
    addr1: MacAddr,
    addr2: MacAddr,
    addr3: MacAddr,
    ssid: Option<&'a [u8]>,
    ssid_list: Option<&'a [u8]>,
    dsss_channel: Option<u8>,
}

impl<'a> ProbeRequest<'a> {
    /// Parses the header and walks the IE body once.
    ///
    /// A DSSS Parameter Set of any length other than one makes the whole
    /// frame invalid.
    pub fn parse(frame: &'a [u8]) -> Result<Self, FrameError> {
        let (hdr, body) = MgmtHeader::parse(frame)?;
        if hdr.subtype() != MgmtSubtype::ProbeRequest as u8 {
            return Err(FrameError::Malformed);
        }

        let mut req = ProbeRequest {
            addr1: hdr.addr1,
            addr2: hdr.addr2,
            addr3: hdr.addr3,
            ssid: None,
            ssid_list: None,
            dsss_channel: None,
        };

        for (tag, value) in IeIterator::new(body) {
            match tag {
                IE_TYPE_SSID => req.ssid = Some(value),
                IE_TYPE_SSID_LIST => req.ssid_list = Some(value),
                IE_TYPE_DSSS_PARAMETER_SET => {
                    if value.len() != 1 {
                        return Err(FrameError::Malformed);
                    }
                    req.dsss_channel = Some(value[0]);
                }
                _ => {}
            }
        }

        Ok(req)
    }

    /// The requester, where a Probe Response would be addressed.
    pub fn source(&self) -> MacAddr {
        self.addr2
    }

    /// Decides whether an AP with the given BSSID, SSID and channel should
    /// reply.
    ///
    /// The addressing tests gate everything; the SSID test accepts a
    /// wildcard, an exact match or an SSID List entry; a present
    /// DSSS Parameter Set on the wrong channel overrides an SSID match.
    /// A malformed SSID List drops the frame.
    pub fn matches(&self, bssid: MacAddr, ssid: &[u8], channel: u8) -> Result<bool, FrameError> {
        if self.addr1 != bssid && !self.addr1.is_broadcast() {
            return Ok(false);
        }
        if self.addr3 != bssid && !self.addr3.is_broadcast() {
            return Ok(false);
        }

        let mut matched = match self.ssid {
            None => true,          // wildcard
            Some([]) => true,      // zero-length wildcard
            Some(s) => s == ssid,
        };

        if !matched {
            if let Some(list) = self.ssid_list {
                for (tag, value) in IeIterator::new(list) {
                    if tag != IE_TYPE_SSID {
                        return Err(FrameError::Malformed);
                    }
                    if value == ssid {
                        matched = true;
                        break;
                    }
                }
            }
        }

        if let Some(dsss) = self.dsss_channel {
            if dsss != channel {
                matched = false;
            }
        }

        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BSSID: MacAddr = MacAddr::new([2, 0, 0, 0, 0, 1]);
    const OTHER: MacAddr = MacAddr::new([4, 4, 4, 4, 4, 4]);
    const STA: MacAddr = MacAddr::new([0xaa, 0xbb, 0xcc, 1, 2, 3]);

    fn probe_req(addr1: MacAddr, addr3: MacAddr, ies: &[u8]) -> Vec<u8> {
        let mut frame = Vec::new();
        frame.extend_from_slice(&0x0040u16.to_le_bytes());
        frame.extend_from_slice(&0u16.to_le_bytes());
        frame.extend_from_slice(&addr1.octets());
        frame.extend_from_slice(&STA.octets());
        frame.extend_from_slice(&addr3.octets());
        frame.extend_from_slice(&0u16.to_le_bytes());
        frame.extend_from_slice(ies);
        frame
    }

    fn ssid_ie(ssid: &[u8]) -> Vec<u8> {
        let mut ie = vec![IE_TYPE_SSID, ssid.len() as u8];
        ie.extend_from_slice(ssid);
        ie
    }

    fn ssid_list_ie(ssids: &[&[u8]]) -> Vec<u8> {
        let mut inner = Vec::new();
        for ssid in ssids {
            inner.extend_from_slice(&ssid_ie(ssid));
        }
        let mut ie = vec![IE_TYPE_SSID_LIST, inner.len() as u8];
        ie.extend_from_slice(&inner);
        ie
    }

    fn dsss_ie(channel: u8) -> Vec<u8> {
        vec![IE_TYPE_DSSS_PARAMETER_SET, 1, channel]
    }

    #[test]
    fn parse_extracts_fields() {
        let mut ies = ssid_ie(b"MyAP");
        ies.extend_from_slice(&dsss_ie(6));
        let frame = probe_req(MacAddr::BROADCAST, BSSID, &ies);
        let req = ProbeRequest::parse(&frame).unwrap();
        assert_eq!(req.source(), STA);
        assert_eq!(req.ssid, Some(&b"MyAP"[..]));
        assert_eq!(req.dsss_channel, Some(6));
        assert_eq!(req.ssid_list, None);
    }

    #[test]
    fn parse_rejects_bad_dsss_length() {
        let frame = probe_req(
            MacAddr::BROADCAST,
            MacAddr::BROADCAST,
            &[IE_TYPE_DSSS_PARAMETER_SET, 2, 6, 0],
        );
        assert_eq!(ProbeRequest::parse(&frame), Err(FrameError::Malformed));
    }

    #[test]
    fn parse_rejects_non_probe_request() {
        let mut frame = probe_req(MacAddr::BROADCAST, BSSID, &[]);
        frame[0] = 0x80; // beacon
        assert_eq!(ProbeRequest::parse(&frame), Err(FrameError::Malformed));
    }

    /// The full §11.1.4.3.2 decision table.
    #[test]
    fn match_truth_table() {
        #[derive(Clone, Copy, Debug, PartialEq)]
        enum SsidCase {
            Absent,
            Empty,
            Match,
            Mismatch,
            ViaList,
        }
        #[derive(Clone, Copy, Debug, PartialEq)]
        enum DsssCase {
            Absent,
            Match,
            Mismatch,
        }

        let addrs = [BSSID, MacAddr::BROADCAST, OTHER];
        let ssids = [
            SsidCase::Absent,
            SsidCase::Empty,
            SsidCase::Match,
            SsidCase::Mismatch,
            SsidCase::ViaList,
        ];
        let dssses = [DsssCase::Absent, DsssCase::Match, DsssCase::Mismatch];

        for addr1 in addrs {
            for addr3 in addrs {
                for ssid in ssids {
                    for dsss in dssses {
                        let mut ies = Vec::new();
                        match ssid {
                            SsidCase::Absent => {}
                            SsidCase::Empty => ies.extend_from_slice(&ssid_ie(b"")),
                            SsidCase::Match => ies.extend_from_slice(&ssid_ie(b"MyAP")),
                            SsidCase::Mismatch => ies.extend_from_slice(&ssid_ie(b"Other")),
                            SsidCase::ViaList => {
                                ies.extend_from_slice(&ssid_ie(b"Elsewhere"));
                                ies.extend_from_slice(&ssid_list_ie(&[b"Third", b"MyAP"]));
                            }
                        }
                        match dsss {
                            DsssCase::Absent => {}
                            DsssCase::Match => ies.extend_from_slice(&dsss_ie(6)),
                            DsssCase::Mismatch => ies.extend_from_slice(&dsss_ie(1)),
                        }

                        let frame = probe_req(addr1, addr3, &ies);
                        let req = ProbeRequest::parse(&frame).unwrap();
                        let got = req.matches(BSSID, b"MyAP", 6).unwrap();

                        let expect = addr1 != OTHER
                            && addr3 != OTHER
                            && ssid != SsidCase::Mismatch
                            && dsss != DsssCase::Mismatch;
                        assert_eq!(
                            got, expect,
                            "addr1={addr1} addr3={addr3} ssid={ssid:?} dsss={dsss:?}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn malformed_ssid_list_drops_frame() {
        // A WPA-vendor tag inside the SSID List is not an SSID.
        let mut list_body = ssid_ie(b"NotIt");
        list_body.extend_from_slice(&[221, 1, 0]);
        let mut ies = ssid_ie(b"Other");
        let mut list = vec![IE_TYPE_SSID_LIST, list_body.len() as u8];
        list.extend_from_slice(&list_body);
        ies.extend_from_slice(&list);

        let frame = probe_req(MacAddr::BROADCAST, BSSID, &ies);
        let req = ProbeRequest::parse(&frame).unwrap();
        assert_eq!(req.matches(BSSID, b"MyAP", 6), Err(FrameError::Malformed));
    }

    #[test]
    fn matched_ssid_skips_list_scan() {
        // The list is only consulted after an SSID mismatch, so a bogus
        // list behind an exact match does not drop the frame.
        let mut ies = ssid_ie(b"MyAP");
        ies.extend_from_slice(&[IE_TYPE_SSID_LIST, 3, 221, 1, 0]);
        let frame = probe_req(MacAddr::BROADCAST, BSSID, &ies);
        let req = ProbeRequest::parse(&frame).unwrap();
        assert_eq!(req.matches(BSSID, b"MyAP", 6), Ok(true));
    }
}
