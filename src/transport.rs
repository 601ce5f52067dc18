//! Seam between the AP control logic and the process's generic netlink
//! connection.
//!
//! The daemon owns the actual nl80211 socket and event loop; this crate is
//! written against [`GenlFamily`] the way the loop-side code sees it: fire a
//! command, get an id back, have the completion routed into
//! [`ApModule::handle_reply`](crate::ap::ApModule::handle_reply) later.
//! Everything runs on that single loop; completions for commands sent from
//! one AP instance arrive in submission order.

use core::num::NonZeroU32;

use crate::nl80211::GenlCmd;

/// Identifies an in-flight command. The "no command" state is
/// `Option<CmdId>::None` rather than a zero sentinel.
pub type CmdId = NonZeroU32;

/// Identifies a registered management-frame subscription.
pub type WatchId = NonZeroU32;

/// Outcome of a completed command, carrying the kernel's error code verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenlReply {
    Ack,
    /// A negative errno from the kernel.
    Error(i32),
}

impl GenlReply {
    pub fn error(&self) -> i32 {
        match self {
            GenlReply::Ack => 0,
            GenlReply::Error(err) => *err,
        }
    }
}

/// Handle to a resolved nl80211 generic netlink family.
pub trait GenlFamily {
    /// Submits a command. `None` means submission failed and the command was
    /// released; otherwise exactly one completion will be delivered for the
    /// returned id, unless the command is cancelled first.
    fn send(&mut self, cmd: GenlCmd) -> Option<CmdId>;

    /// Cancels an in-flight command. A no-op for completed ids; a cancelled
    /// command's completion must never be delivered.
    fn cancel(&mut self, cmd_id: CmdId);

    /// Registers a management-frame subscription for `frame_type` (the frame
    /// control pattern, e.g. probe requests) on the given interface, with no
    /// payload match prefix.
    fn watch_frames(&mut self, ifindex: u32, frame_type: u16) -> Option<WatchId>;

    /// Drops a frame subscription.
    fn unwatch_frames(&mut self, watch_id: WatchId);
}
