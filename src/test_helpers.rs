//! Shared fixtures for the in-crate test suites: a recording fake of the
//! netlink family, an event log handler, and frame builders.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;
use std::sync::Once;

use crate::ap::{ApEvent, ApEventHandler};
use crate::device::Device;
use crate::ie::{CipherSuite, IE_TYPE_DSSS_PARAMETER_SET, IE_TYPE_SSID};
use crate::mac::MacAddr;
use crate::nl80211::GenlCmd;
use crate::transport::{CmdId, GenlFamily, WatchId};

static INIT: Once = Once::new();

pub fn init_log() {
    INIT.call_once(|| {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .is_test(true)
            .init();
    });
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub sent: Vec<(CmdId, GenlCmd)>,
    pub cancelled: Vec<CmdId>,
    pub watches: Vec<(WatchId, u32, u16)>,
    pub removed_watches: Vec<WatchId>,
    pub fail_send: bool,
    pub fail_watch: bool,
    next_id: u32,
}

impl FakeState {
    fn next_id(&mut self) -> Option<CmdId> {
        self.next_id += 1;
        CmdId::new(self.next_id)
    }
}

/// Fake nl80211 family recording everything the module does to it. Clones
/// share state, so a test can keep a handle while the module owns another.
#[derive(Clone)]
pub struct FakeGenl {
    state: Rc<RefCell<FakeState>>,
}

impl FakeGenl {
    pub fn new() -> Self {
        init_log();
        FakeGenl {
            state: Rc::new(RefCell::new(FakeState::default())),
        }
    }

    pub fn handle(&self) -> FakeGenl {
        self.clone()
    }

    pub fn state(&self) -> Ref<'_, FakeState> {
        self.state.borrow()
    }

    pub fn state_mut(&self) -> RefMut<'_, FakeState> {
        self.state.borrow_mut()
    }

    pub fn last_sent(&self) -> Option<(CmdId, GenlCmd)> {
        self.state().sent.last().cloned()
    }

    pub fn last_sent_id(&self) -> Option<CmdId> {
        self.last_sent().map(|(id, _)| id)
    }
}

impl GenlFamily for FakeGenl {
    fn send(&mut self, cmd: GenlCmd) -> Option<CmdId> {
        let mut state = self.state.borrow_mut();
        if state.fail_send {
            return None;
        }
        let id = state.next_id()?;
        state.sent.push((id, cmd));
        Some(id)
    }

    fn cancel(&mut self, cmd_id: CmdId) {
        self.state.borrow_mut().cancelled.push(cmd_id);
    }

    fn watch_frames(&mut self, ifindex: u32, frame_type: u16) -> Option<WatchId> {
        let mut state = self.state.borrow_mut();
        if state.fail_watch {
            return None;
        }
        let id = state.next_id()?;
        state.watches.push((id, ifindex, frame_type));
        Some(id)
    }

    fn unwatch_frames(&mut self, watch_id: WatchId) {
        self.state.borrow_mut().removed_watches.push(watch_id);
    }
}

pub fn test_device() -> Device {
    Device::new(3, MacAddr::new([2, 0, 0, 0, 0, 1]), CipherSuite::CCMP)
}

/// An event handler that appends into a shared log.
pub fn event_log() -> (ApEventHandler, Rc<RefCell<Vec<ApEvent>>>) {
    let log: Rc<RefCell<Vec<ApEvent>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    let handler = Box::new(move |_device: &Device, event: ApEvent| {
        sink.borrow_mut().push(event);
    });
    (handler, log)
}

/// A well-formed Probe Request with an SSID element and an optional DSSS
/// Parameter Set.
pub fn probe_req_frame(
    addr1: MacAddr,
    source: MacAddr,
    addr3: MacAddr,
    ssid: &[u8],
    dsss_channel: Option<u8>,
) -> Vec<u8> {
    let mut frame = Vec::new();
    frame.extend_from_slice(&0x0040u16.to_le_bytes());
    frame.extend_from_slice(&0u16.to_le_bytes());
    frame.extend_from_slice(&addr1.octets());
    frame.extend_from_slice(&source.octets());
    frame.extend_from_slice(&addr3.octets());
    frame.extend_from_slice(&0u16.to_le_bytes());
    frame.push(IE_TYPE_SSID);
    frame.push(ssid.len() as u8);
    frame.extend_from_slice(ssid);
    if let Some(channel) = dsss_channel {
        frame.extend_from_slice(&[IE_TYPE_DSSS_PARAMETER_SET, 1, channel]);
    }
    frame
}
