//! 802.11 information elements.
//!
//! The builders emit into bounded [`heapless::Vec`] buffers; running out of
//! room is an [`EncodeError`], not a panic.

use bitflags::bitflags;
use heapless::Vec;

use crate::error::EncodeError;

pub const IE_TYPE_SSID: u8 = 0;
pub const IE_TYPE_SUPPORTED_RATES: u8 = 1;
pub const IE_TYPE_DSSS_PARAMETER_SET: u8 = 3;
pub const IE_TYPE_RSN: u8 = 48;
pub const IE_TYPE_SSID_LIST: u8 = 84;

/// RSNE version field, the only one defined.
pub const RSN_VERSION: u16 = 1;

const OUI_IEEE80211: [u8; 3] = [0x00, 0x0f, 0xac];

bitflags! {
    /// RSN cipher suites as a bitmap, one bit per 00-0F-AC suite selector.
    ///
    /// Bit order follows selector-type order so that ascending bit iteration
    /// yields suites in ascending selector order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CipherSuite: u16 {
        const USE_GROUP = 0x0001;
        const WEP40 = 0x0002;
        const TKIP = 0x0004;
        const CCMP = 0x0008;
        const WEP104 = 0x0010;
        const BIP = 0x0020;
        /// 00-0F-AC:7, "group addressed traffic not allowed".
        const NO_GROUP_TRAFFIC = 0x0040;
    }
}

impl CipherSuite {
    /// Selector type octet for a single-suite value.
    pub fn suite_type(self) -> Option<u8> {
        match self {
            s if s == CipherSuite::USE_GROUP => Some(0),
            s if s == CipherSuite::WEP40 => Some(1),
            s if s == CipherSuite::TKIP => Some(2),
            s if s == CipherSuite::CCMP => Some(4),
            s if s == CipherSuite::WEP104 => Some(5),
            s if s == CipherSuite::BIP => Some(6),
            s if s == CipherSuite::NO_GROUP_TRAFFIC => Some(7),
            _ => None,
        }
    }

    /// Full 4-byte suite selector for a single-suite value.
    pub fn selector(self) -> Option<[u8; 4]> {
        let t = self.suite_type()?;
        Some([OUI_IEEE80211[0], OUI_IEEE80211[1], OUI_IEEE80211[2], t])
    }

    /// Suite selector packed into a u32 the way nl80211 carries it.
    pub fn to_nl_suite(self) -> Option<u32> {
        let s = self.selector()?;
        Some(u32::from_be_bytes(s))
    }
}

bitflags! {
    /// RSN authentication and key management suites.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AkmSuite: u16 {
        const PSK = 0x0001;
    }
}

impl AkmSuite {
    pub fn selector(self) -> Option<[u8; 4]> {
        if self == AkmSuite::PSK {
            Some([0x00, 0x0f, 0xac, 0x02])
        } else {
            None
        }
    }

    pub fn to_nl_suite(self) -> Option<u32> {
        let s = self.selector()?;
        Some(u32::from_be_bytes(s))
    }
}

/// In-memory view of an RSN element before encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RsnInfo {
    pub akm_suites: AkmSuite,
    pub pairwise_ciphers: CipherSuite,
    pub group_cipher: CipherSuite,
}

impl RsnInfo {
    /// The only profile this AP speaks: PSK authentication, pairwise-only
    /// traffic (group cipher 00-0F-AC:7).
    pub fn for_psk(pairwise: CipherSuite) -> Self {
        RsnInfo {
            akm_suites: AkmSuite::PSK,
            pairwise_ciphers: pairwise,
            group_cipher: CipherSuite::NO_GROUP_TRAFFIC,
        }
    }

    /// Appends the complete tag-48 element.
    pub fn build<const N: usize>(&self, out: &mut Vec<u8, N>) -> Result<(), EncodeError> {
        if self.pairwise_ciphers.is_empty() || self.akm_suites.is_empty() {
            return Err(EncodeError::BadCipherSet);
        }

        let start = out.len();
        push(out, IE_TYPE_RSN)?;
        push(out, 0)?; // length, patched below
        extend(out, &RSN_VERSION.to_le_bytes())?;

        let group = self
            .group_cipher
            .selector()
            .ok_or(EncodeError::BadCipherSet)?;
        extend(out, &group)?;

        extend(out, &(self.pairwise_ciphers.iter().count() as u16).to_le_bytes())?;
        for suite in self.pairwise_ciphers.iter() {
            let sel = suite.selector().ok_or(EncodeError::BadCipherSet)?;
            extend(out, &sel)?;
        }

        extend(out, &(self.akm_suites.iter().count() as u16).to_le_bytes())?;
        for akm in self.akm_suites.iter() {
            let sel = akm.selector().ok_or(EncodeError::BadCipherSet)?;
            extend(out, &sel)?;
        }

        // RSN capabilities
        extend(out, &0u16.to_le_bytes())?;

        let body_len = out.len() - start - 2;
        if body_len > u8::MAX as usize {
            return Err(EncodeError::Overflow);
        }
        out[start + 1] = body_len as u8;
        Ok(())
    }
}

pub(crate) fn push<const N: usize>(out: &mut Vec<u8, N>, byte: u8) -> Result<(), EncodeError> {
    out.push(byte).map_err(|_| EncodeError::Overflow)
}

pub(crate) fn extend<const N: usize>(out: &mut Vec<u8, N>, bytes: &[u8]) -> Result<(), EncodeError> {
    out.extend_from_slice(bytes).map_err(|_| EncodeError::Overflow)
}

/// Single-pass TLV walk over an IE blob.
///
/// Iteration ends at the first element whose declared length runs past the
/// end of the buffer, matching how truncated probe request bodies are
/// tolerated on the air.
pub struct IeIterator<'a> {
    data: &'a [u8],
}

impl<'a> IeIterator<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        IeIterator { data }
    }
}

impl<'a> Iterator for IeIterator<'a> {
    type Item = (u8, &'a [u8]);

    fn next(&mut self) -> Option<(u8, &'a [u8])> {
        if self.data.len() < 2 {
            return None;
        }
        let tag = self.data[0];
        let len = self.data[1] as usize;
        if self.data.len() < 2 + len {
            return None;
        }
        let value = &self.data[2..2 + len];
        self.data = &self.data[2 + len..];
        Some((tag, value))
    }
}
