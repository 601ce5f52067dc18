//! Device Provisioning Protocol (Wi-Fi Easy Connect) utilities.
//!
//! Self-contained: nothing here touches the AP runtime. [`uri`] parses the
//! compact `DPP:` bootstrapping URI scheme; [`crypto`] derives the
//! authentication keys for P-256 responder-only DPP.

pub mod crypto;
pub mod uri;

pub use crypto::{
    derive_i_auth, derive_k1, derive_k2, derive_ke, derive_r_auth, DppError, SharedSecret,
};
pub use uri::{parse_uri, DppUriInfo, UriError};
