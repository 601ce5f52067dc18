use thiserror::Error;

/// Errors returned synchronously by the AP control surface.
///
/// Kernel refusals are not in here: a negative error code in an asynchronous
/// reply moves the AP to its stopped state and is reported through the event
/// handler instead.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An access point is already bound to this device.
    #[error("an access point already exists on this device")]
    AlreadyExists,
    /// No access point is bound to this device.
    #[error("no access point on this device")]
    NoSuchDevice,
    /// The SSID is not 1..=32 bytes.
    #[error("invalid SSID length")]
    InvalidSsid,
    /// The pre-shared key does not fit its buffer.
    #[error("invalid pre-shared key")]
    InvalidPsk,
    /// The channel is outside the 2.4 GHz band.
    #[error("invalid channel")]
    InvalidChannel,
    /// The rate set is empty.
    #[error("no supported rates configured")]
    InvalidRates,
    /// The pairwise cipher set is empty.
    #[error("no pairwise cipher configured")]
    InvalidCiphers,
    /// Frame-watch registration or netlink submission failed.
    #[error("netlink submission failed")]
    Io,
}

/// Frame or information-element encoding failures.
///
/// These poison START_AP rather than surfacing on their own: `start` maps
/// them to [`Error::Io`] after rolling back.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    /// An element does not fit the bounded frame buffer.
    #[error("element does not fit the frame buffer")]
    Overflow,
    /// The cipher bitmap holds no encodable suite.
    #[error("cipher set cannot be encoded")]
    BadCipherSet,
    /// The rate set holds no rates.
    #[error("empty rate set")]
    NoRates,
    /// The channel has no 2.4 GHz frequency mapping.
    #[error("channel outside the 2.4 GHz band")]
    BadChannel,
}

/// Failures while parsing a received management frame.
///
/// Frames that fail to parse are dropped silently; no reply is sent.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// The frame is shorter than its fixed header.
    #[error("frame too short")]
    Truncated,
    /// A field violates the frame's invariants.
    #[error("malformed frame")]
    Malformed,
}

impl From<EncodeError> for Error {
    fn from(_: EncodeError) -> Self {
        Error::Io
    }
}
