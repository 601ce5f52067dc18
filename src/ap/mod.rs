//! Soft AP lifecycle control.
//!
//! One [`ApModule`] per process owns the registry of running AP instances
//! and drives the kernel's START_AP / STOP_AP cycle over the injected
//! [`GenlFamily`]. Everything runs on the daemon's single event loop: the
//! loop feeds command completions into [`ApModule::handle_reply`] and
//! subscribed management frames into [`ApModule::handle_frame`].

pub mod options;
mod probe;

pub use options::{ApOptions, RateSet};
pub use probe::ProbeRequest;

use core::fmt;

use log::{debug, error, info, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::device::Device;
use crate::error::{EncodeError, Error};
use crate::frame::{
    build_beacon_pr_head, build_beacon_pr_tail, BssDescription, MgmtSubtype, BEACON_HEAD_LEN,
    BEACON_TAIL_LEN, FRAME_TYPE_MGMT_PROBE_REQUEST, PROBE_RESP_LEN,
};
use crate::ie::{CipherSuite, RsnInfo};
use crate::mac::MacAddr;
use crate::nl80211::{
    self, channel_to_freq, GenlCmd, Nl80211Attr, NL80211_AUTHTYPE_OPEN_SYSTEM,
    NL80211_CHAN_WIDTH_20, NL80211_CMD_START_AP, NL80211_HIDDEN_SSID_NOT_IN_USE,
    NL80211_WPA_VERSION_2,
};
use crate::transport::{CmdId, GenlFamily, GenlReply, WatchId};

/// Kept constant until the DTIM period becomes configurable.
const AP_DTIM_PERIOD: u32 = 3;

const SSID_MAX_LEN: usize = 32;
const PSK_MAX_LEN: usize = 64;
const MAX_FRAME_WATCHES: usize = 4;

/// Lifecycle notifications delivered through the event handler.
///
/// After a successful `start`, exactly one `Stopped` is delivered, preceded
/// by at most one `Started`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApEvent {
    Started,
    Stopped,
}

pub type ApEventHandler = Box<dyn FnMut(&Device, ApEvent)>;

/// Pre-shared key storage, zeroed before its memory is released.
#[derive(Zeroize, ZeroizeOnDrop)]
pub(crate) struct Psk {
    bytes: [u8; PSK_MAX_LEN],
    len: u8,
}

impl Psk {
    fn new(psk: &[u8]) -> Result<Self, Error> {
        if psk.len() > PSK_MAX_LEN {
            return Err(Error::InvalidPsk);
        }
        let mut bytes = [0u8; PSK_MAX_LEN];
        bytes[..psk.len()].copy_from_slice(psk);
        Ok(Psk {
            bytes,
            len: psk.len() as u8,
        })
    }

    #[allow(dead_code)] // the 4-way handshake consumer lives outside this crate
    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }
}

impl fmt::Debug for Psk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Psk(<{} bytes>)", self.len)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// START_AP submitted, no reply yet.
    Starting,
    /// Beaconing; probe requests are answered.
    Running,
    /// STOP_AP submitted, no reply yet.
    Stopping,
}

/// One AP bound to one device. Exists only while listed in the module
/// registry.
struct Ap {
    device: Device,
    ssid: heapless::Vec<u8, SSID_MAX_LEN>,
    psk: Psk,
    handler: ApEventHandler,
    state: State,
    channel: u8,
    ciphers: CipherSuite,
    beacon_interval: u16,
    rates: RateSet,
    frame_watches: heapless::Vec<WatchId, MAX_FRAME_WATCHES>,
    start_stop_cmd_id: Option<CmdId>,
}

impl Ap {
    fn bss(&self) -> BssDescription<'_> {
        BssDescription {
            bssid: self.device.addr(),
            ssid: &self.ssid,
            channel: self.channel,
            beacon_interval: self.beacon_interval,
            rates: &self.rates,
            rsn: RsnInfo::for_psk(self.ciphers),
        }
    }
}

/// Owner of every AP instance in the process, bound to one nl80211 family
/// handle for its whole life.
pub struct ApModule<G: GenlFamily> {
    genl: G,
    aps: Vec<Ap>,
    /// In-flight probe response transmissions, tracked so their outcome can
    /// be reported.
    frame_cmd_ids: Vec<CmdId>,
}

impl<G: GenlFamily> ApModule<G> {
    pub fn new(genl: G) -> Self {
        ApModule {
            genl,
            aps: Vec::new(),
            frame_cmd_ids: Vec::new(),
        }
    }

    /// The underlying family handle.
    pub fn genl(&self) -> &G {
        &self.genl
    }

    pub fn genl_mut(&mut self) -> &mut G {
        &mut self.genl
    }

    /// Brings up a WPA2-PSK BSS on `device` with default options.
    pub fn start(
        &mut self,
        device: &Device,
        ssid: &str,
        psk: &str,
        handler: ApEventHandler,
    ) -> Result<(), Error> {
        self.start_with(device, ssid, psk, ApOptions::default(), handler)
    }

    /// Brings up a BSS with explicit options.
    ///
    /// Fails synchronously without ever invoking `handler`; once this
    /// returns `Ok`, exactly one terminal [`ApEvent::Stopped`] is guaranteed.
    pub fn start_with(
        &mut self,
        device: &Device,
        ssid: &str,
        psk: &str,
        options: ApOptions,
        handler: ApEventHandler,
    ) -> Result<(), Error> {
        if self.find(device.ifindex()).is_some() {
            return Err(Error::AlreadyExists);
        }

        let ssid = heapless::Vec::from_slice(ssid.as_bytes()).map_err(|_| Error::InvalidSsid)?;
        if ssid.is_empty() {
            return Err(Error::InvalidSsid);
        }
        if channel_to_freq(options.channel).is_none() {
            return Err(Error::InvalidChannel);
        }
        if options.rates.is_empty() {
            return Err(Error::InvalidRates);
        }
        let ciphers = options.ciphers.unwrap_or_else(|| device.pairwise_ciphers());
        if ciphers.is_empty() {
            return Err(Error::InvalidCiphers);
        }

        let mut ap = Ap {
            device: device.clone(),
            ssid,
            psk: Psk::new(psk.as_bytes())?,
            handler,
            state: State::Starting,
            channel: options.channel,
            ciphers,
            beacon_interval: options.beacon_interval,
            rates: options.rates,
            frame_watches: heapless::Vec::new(),
            start_stop_cmd_id: None,
        };

        let Some(watch) = self
            .genl
            .watch_frames(device.ifindex(), FRAME_TYPE_MGMT_PROBE_REQUEST)
        else {
            return Err(Error::Io);
        };
        // Capacity is sized for every subscription an AP takes out.
        if ap.frame_watches.push(watch).is_err() {
            self.genl.unwatch_frames(watch);
            return Err(Error::Io);
        }

        let cmd = match build_cmd_start_ap(&ap) {
            Ok(cmd) => cmd,
            Err(err) => {
                warn!("beacon construction failed: {err}");
                self.release(&mut ap);
                return Err(Error::Io);
            }
        };

        match self.genl.send(cmd) {
            Some(id) => ap.start_stop_cmd_id = Some(id),
            None => {
                self.release(&mut ap);
                return Err(Error::Io);
            }
        }

        self.aps.push(ap);
        Ok(())
    }

    /// Tears the BSS on `device` down.
    ///
    /// Cancels whatever command is still in flight before submitting
    /// STOP_AP, so the start/stop slot only ever moves forward. On a
    /// submission failure the AP stays registered and `stop` may be retried.
    pub fn stop(&mut self, device: &Device) -> Result<(), Error> {
        let Some(idx) = self.find(device.ifindex()) else {
            return Err(Error::NoSuchDevice);
        };

        let cmd = nl80211::stop_ap(device.ifindex());
        let ap = &mut self.aps[idx];
        if let Some(id) = ap.start_stop_cmd_id.take() {
            self.genl.cancel(id);
        }

        match self.genl.send(cmd) {
            Some(id) => {
                ap.start_stop_cmd_id = Some(id);
                ap.state = State::Stopping;
                Ok(())
            }
            None => Err(Error::Io),
        }
    }

    /// Routes a command completion delivered by the event loop.
    pub fn handle_reply(&mut self, cmd_id: CmdId, reply: GenlReply) {
        if let Some(idx) = self
            .aps
            .iter()
            .position(|ap| ap.start_stop_cmd_id == Some(cmd_id))
        {
            let ap = &mut self.aps[idx];
            // Clear the slot before any event fires so a handler-issued
            // command cannot alias it.
            ap.start_stop_cmd_id = None;

            match ap.state {
                State::Starting => {
                    if reply.error() < 0 {
                        error!("START_AP failed: {}", reply.error());
                        self.stopped(idx);
                    } else {
                        info!("START_AP ok");
                        ap.state = State::Running;
                        (ap.handler)(&ap.device, ApEvent::Started);
                    }
                }
                State::Stopping => {
                    if reply.error() < 0 {
                        error!("STOP_AP failed: {}", reply.error());
                    } else {
                        info!("STOP_AP ok");
                    }
                    self.stopped(idx);
                }
                State::Running => {
                    warn!("unexpected completion while running: {cmd_id}");
                }
            }
            return;
        }

        if let Some(pos) = self.frame_cmd_ids.iter().position(|&id| id == cmd_id) {
            self.frame_cmd_ids.swap_remove(pos);
            if reply.error() < 0 {
                error!("probe response not sent: {}", reply.error());
            } else {
                info!("probe response sent");
            }
            return;
        }

        debug!("completion for unknown command {cmd_id}");
    }

    /// Routes a received management frame delivered by the event loop.
    ///
    /// Malformed frames and non-matching probe requests are dropped without
    /// a reply; transmission failures are logged and not retried.
    pub fn handle_frame(&mut self, watch_id: WatchId, frame: &[u8]) {
        let Some(idx) = self
            .aps
            .iter()
            .position(|ap| ap.frame_watches.contains(&watch_id))
        else {
            return;
        };
        let ap = &self.aps[idx];

        let req = match ProbeRequest::parse(frame) {
            Ok(req) => req,
            Err(err) => {
                debug!("dropping probe request: {err}");
                return;
            }
        };
        info!("probe request from {}", req.source());

        match req.matches(ap.device.addr(), &ap.ssid, ap.channel) {
            Ok(true) => {}
            Ok(false) => return,
            Err(err) => {
                debug!("dropping probe request: {err}");
                return;
            }
        }

        let mut resp: heapless::Vec<u8, PROBE_RESP_LEN> = heapless::Vec::new();
        let bss = ap.bss();
        if let Err(err) = build_beacon_pr_head(&bss, MgmtSubtype::ProbeResponse, req.source(), &mut resp)
            .and_then(|()| build_beacon_pr_tail(&bss, &mut resp))
        {
            warn!("probe response construction failed: {err}");
            return;
        }

        let Some(freq) = channel_to_freq(ap.channel) else {
            return;
        };
        let cmd = nl80211::mgmt_frame(ap.device.ifindex(), freq, resp.to_vec(), false);
        match self.genl.send(cmd) {
            Some(id) => self.frame_cmd_ids.push(id),
            None => error!("probe response submission failed"),
        }
    }

    fn find(&self, ifindex: u32) -> Option<usize> {
        self.aps.iter().position(|ap| ap.device.ifindex() == ifindex)
    }

    /// Removes the instance, delivers the terminal event, then frees it.
    fn stopped(&mut self, idx: usize) {
        let mut ap = self.aps.swap_remove(idx);
        (ap.handler)(&ap.device, ApEvent::Stopped);
        self.release(&mut ap);
    }

    /// Teardown of one instance: drop every frame subscription and cancel
    /// anything still in flight. The PSK is zeroed when `ap` drops.
    fn release(&mut self, ap: &mut Ap) {
        while let Some(watch) = ap.frame_watches.pop() {
            self.genl.unwatch_frames(watch);
        }
        if let Some(id) = ap.start_stop_cmd_id.take() {
            self.genl.cancel(id);
        }
    }
}

impl<G: GenlFamily> Drop for ApModule<G> {
    /// Module teardown frees every instance without emitting events.
    fn drop(&mut self) {
        let mut aps = std::mem::take(&mut self.aps);
        for ap in aps.iter_mut() {
            self.release(ap);
        }
    }
}

fn build_cmd_start_ap(ap: &Ap) -> Result<GenlCmd, EncodeError> {
    let mut head: heapless::Vec<u8, BEACON_HEAD_LEN> = heapless::Vec::new();
    let mut tail: heapless::Vec<u8, BEACON_TAIL_LEN> = heapless::Vec::new();
    let bss = ap.bss();
    build_beacon_pr_head(&bss, MgmtSubtype::Beacon, MacAddr::BROADCAST, &mut head)?;
    build_beacon_pr_tail(&bss, &mut tail)?;

    let freq = channel_to_freq(ap.channel).ok_or(EncodeError::BadChannel)?;
    let ciphers: Vec<u32> = ap
        .ciphers
        .iter()
        .filter_map(CipherSuite::to_nl_suite)
        .collect();
    if ciphers.is_empty() {
        return Err(EncodeError::BadCipherSet);
    }
    let akm = crate::ie::AkmSuite::PSK
        .to_nl_suite()
        .ok_or(EncodeError::BadCipherSet)?;

    Ok(GenlCmd::new(NL80211_CMD_START_AP)
        .attr(Nl80211Attr::BeaconHead(head.to_vec()))
        .attr(Nl80211Attr::BeaconTail(tail.to_vec()))
        .attr(Nl80211Attr::Ie(Vec::new()))
        .attr(Nl80211Attr::IeProbeResp(Vec::new()))
        .attr(Nl80211Attr::IeAssocResp(Vec::new()))
        .attr(Nl80211Attr::BeaconInterval(ap.beacon_interval as u32))
        .attr(Nl80211Attr::DtimPeriod(AP_DTIM_PERIOD))
        .attr(Nl80211Attr::Ifindex(ap.device.ifindex()))
        .attr(Nl80211Attr::Ssid(ap.ssid.to_vec()))
        .attr(Nl80211Attr::HiddenSsid(NL80211_HIDDEN_SSID_NOT_IN_USE))
        .attr(Nl80211Attr::CipherSuitesPairwise(ciphers))
        .attr(Nl80211Attr::WpaVersions(NL80211_WPA_VERSION_2))
        .attr(Nl80211Attr::AkmSuites(akm))
        .attr(Nl80211Attr::AuthType(NL80211_AUTHTYPE_OPEN_SYSTEM))
        .attr(Nl80211Attr::WiphyFreq(freq))
        .attr(Nl80211Attr::ChannelWidth(NL80211_CHAN_WIDTH_20)))
}
