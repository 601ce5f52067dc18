//! Parser for the DPP bootstrapping URI.
//!
//! A URI is `DPP:` followed by `ID:value` fields separated by `;` and closed
//! by a double `;;` with nothing after it, e.g.
//! `DPP:C:81/1;M:5254005828e5;V:2;K:<base64 SPKI>;;`.

use std::collections::BTreeSet;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use p256::pkcs8::DecodePublicKey;
use p256::PublicKey;
use thiserror::Error;

use crate::mac::MacAddr;

/// Every way a URI can be rejected collapses into this one error, so the
/// caller cannot be used as an oracle on key material.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("malformed DPP URI")]
pub struct UriError;

/// The parsed bootstrapping information.
#[derive(Debug, Clone)]
pub struct DppUriInfo {
    /// `(operating class, channel)` pairs from the `C:` field.
    pub channels: Vec<(u8, u8)>,
    /// The channel list resolved to frequencies in MHz.
    pub freqs: BTreeSet<u32>,
    /// Device MAC from the `M:` field.
    pub mac: Option<MacAddr>,
    /// Protocol version from the `V:` field.
    pub version: Option<u32>,
    /// Free-form information from the `I:` field.
    pub information: Option<String>,
    /// The bootstrapping public key from the mandatory `K:` field.
    pub boot_public: PublicKey,
}

/// Parses a DPP URI, failing on anything the grammar does not allow.
pub fn parse_uri(uri: &str) -> Result<DppUriInfo, UriError> {
    let body = uri
        .strip_prefix("DPP:")
        .and_then(|rest| rest.strip_suffix(";;"))
        .ok_or(UriError)?;

    let mut channels = Vec::new();
    let mut freqs = BTreeSet::new();
    let mut mac = None;
    let mut version = None;
    let mut information = None;
    let mut boot_public = None;

    for field in body.split(';') {
        // An empty field means a stray `;;` before the terminator.
        let (id, value) = field.split_once(':').ok_or(UriError)?;
        match id {
            "C" => {
                for token in value.split(',') {
                    let (class, channel) = parse_channel(token)?;
                    freqs.insert(channel_to_freq(class, channel).ok_or(UriError)?);
                    channels.push((class, channel));
                }
            }
            "I" => information = Some(value.to_owned()),
            "M" => mac = Some(MacAddr::from_plain_hex(value).ok_or(UriError)?),
            "V" => version = Some(value.parse().map_err(|_| UriError)?),
            "K" => {
                let der = BASE64.decode(value).map_err(|_| UriError)?;
                boot_public = Some(PublicKey::from_public_key_der(&der).map_err(|_| UriError)?);
            }
            _ => return Err(UriError),
        }
    }

    Ok(DppUriInfo {
        channels,
        freqs,
        mac,
        version,
        information,
        boot_public: boot_public.ok_or(UriError)?,
    })
}

fn parse_channel(token: &str) -> Result<(u8, u8), UriError> {
    let (class, channel) = token.split_once('/').ok_or(UriError)?;
    let class = class.parse().map_err(|_| UriError)?;
    let channel = channel.parse().map_err(|_| UriError)?;
    Ok((class, channel))
}

/// Maps a global operating class and channel to a center frequency.
///
/// Classes 81/83/84 are the 2.4 GHz 20/40 MHz classes, 82 is channel 14,
/// 115..=130 cover the 5 GHz band.
fn channel_to_freq(class: u8, channel: u8) -> Option<u32> {
    match class {
        81 | 83 | 84 if (1..=13).contains(&channel) => Some(2407 + 5 * channel as u32),
        82 if channel == 14 => Some(2484),
        115..=130 if channel >= 1 => Some(5000 + 5 * channel as u32),
        _ => None,
    }
}
