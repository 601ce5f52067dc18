//! DPP Authentication key derivation for NIST P-256 (ECC group 19) with
//! HKDF-SHA256, responder side.
//!
//! The first and second intermediate keys come from the ECDH shared secrets
//! M = b_R · P_I and N = p_R · P_I; `ke` binds both nonces and both shared
//! secrets; the authenticating tags hash the x-coordinates of the protocol
//! and bootstrapping keys.

use hkdf::Hkdf;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{ecdh, PublicKey, SecretKey};
use sha2::{Digest, Sha256};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Keys and tags are one SHA-256 block wide on P-256.
pub const KEY_LEN: usize = 32;
/// Nonces are half the curve width.
pub const NONCE_LEN: usize = 16;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DppError {
    /// A point operation produced the identity element.
    #[error("point multiplication yielded the identity element")]
    Identity,
    /// The key derivation function refused its parameters.
    #[error("key derivation failed")]
    Kdf,
}

/// x-coordinate of an ECDH product, kept only as long as the handshake
/// needs it and zeroed on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret {
    x: [u8; KEY_LEN],
}

impl SharedSecret {
    pub fn x(&self) -> &[u8; KEY_LEN] {
        &self.x
    }
}

fn ecdh_x(private: &SecretKey, public: &PublicKey) -> SharedSecret {
    // A nonzero scalar times a valid subgroup point cannot reach the
    // identity on a prime-order curve, so this cannot fail.
    let shared = ecdh::diffie_hellman(private.to_nonzero_scalar(), public.as_affine());
    SharedSecret {
        x: (*shared.raw_secret_bytes()).into(),
    }
}

fn hkdf(salt: Option<&[u8]>, ikm: &[u8], info: &[u8]) -> Result<[u8; KEY_LEN], DppError> {
    let hk = Hkdf::<Sha256>::new(salt, ikm);
    let mut okm = [0u8; KEY_LEN];
    hk.expand(info, &mut okm).map_err(|_| DppError::Kdf)?;
    Ok(okm)
}

fn point_x(point: &PublicKey) -> Result<[u8; KEY_LEN], DppError> {
    let encoded = point.to_encoded_point(false);
    let x = encoded.x().ok_or(DppError::Identity)?;
    Ok((*x).into())
}

/// k1 from the initiator's protocol key and the responder's bootstrapping
/// key; also returns M.x for the later `ke` derivation.
pub fn derive_k1(
    i_proto_public: &PublicKey,
    r_boot_private: &SecretKey,
) -> Result<([u8; KEY_LEN], SharedSecret), DppError> {
    let m = ecdh_x(r_boot_private, i_proto_public);
    let k1 = hkdf(None, m.x(), b"first intermediate key")?;
    Ok((k1, m))
}

/// k2 from the two protocol keys; also returns N.x.
pub fn derive_k2(
    i_proto_public: &PublicKey,
    r_proto_private: &SecretKey,
) -> Result<([u8; KEY_LEN], SharedSecret), DppError> {
    let n = ecdh_x(r_proto_private, i_proto_public);
    let k2 = hkdf(None, n.x(), b"second intermediate key")?;
    Ok((k2, n))
}

/// The session key, salted with both nonces over both shared secrets.
pub fn derive_ke(
    i_nonce: &[u8],
    r_nonce: &[u8],
    m: &SharedSecret,
    n: &SharedSecret,
) -> Result<[u8; KEY_LEN], DppError> {
    let mut salt = Vec::with_capacity(i_nonce.len() + r_nonce.len());
    salt.extend_from_slice(i_nonce);
    salt.extend_from_slice(r_nonce);

    let mut ikm = Zeroizing::new([0u8; 2 * KEY_LEN]);
    ikm[..KEY_LEN].copy_from_slice(m.x());
    ikm[KEY_LEN..].copy_from_slice(n.x());

    hkdf(Some(&salt), ikm.as_slice(), b"DPP Key")
}

fn auth_tag(
    nonce_a: &[u8],
    nonce_b: &[u8],
    proto_a: &PublicKey,
    proto_b: &PublicKey,
    r_boot_public: &PublicKey,
    suffix: u8,
) -> Result<[u8; KEY_LEN], DppError> {
    let mut hash = Sha256::new();
    hash.update(nonce_a);
    hash.update(nonce_b);
    hash.update(point_x(proto_a)?);
    hash.update(point_x(proto_b)?);
    hash.update(point_x(r_boot_public)?);
    hash.update([suffix]);
    Ok(hash.finalize().into())
}

/// The responder's authenticating tag:
/// `H(I-nonce | R-nonce | PI.x | PR.x | BR.x | 0)`.
pub fn derive_r_auth(
    i_nonce: &[u8],
    r_nonce: &[u8],
    i_proto_public: &PublicKey,
    r_proto_public: &PublicKey,
    r_boot_public: &PublicKey,
) -> Result<[u8; KEY_LEN], DppError> {
    auth_tag(i_nonce, r_nonce, i_proto_public, r_proto_public, r_boot_public, 0)
}

/// The initiator's tag is the symmetric construction with the nonce and
/// protocol key order swapped and a trailing 1.
pub fn derive_i_auth(
    r_nonce: &[u8],
    i_nonce: &[u8],
    r_proto_public: &PublicKey,
    i_proto_public: &PublicKey,
    r_boot_public: &PublicKey,
) -> Result<[u8; KEY_LEN], DppError> {
    auth_tag(r_nonce, i_nonce, r_proto_public, i_proto_public, r_boot_public, 1)
}
