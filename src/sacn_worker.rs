use crate::bridge::FrameNotifier;
use crate::dispatcher::{Frame, UNIVERSE_SIZE};
use crate::SharedStateFlag;
use sacn::receive::SacnReceiver;
use std::{
    collections::HashMap,
    net::{Ipv4Addr, SocketAddr},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};
use thiserror::Error;

// Constants for E1.31 reception
pub const SACN_PORT: u16 = 5568;
pub const NETWORK_DATA_LOSS_TIMEOUT: Duration = Duration::from_millis(2500);
const RECV_TIMEOUT: Duration = Duration::from_millis(250); // Also bounds shutdown latency
const NULL_START_CODE: u8 = 0x00;

#[derive(Error, Debug)]
pub enum ReceiverError {
    #[error("sACN receiver error: {0}")]
    Sacn(String),
}

/// Slot data of a DMX universe, or `None` for alternate start code packets.
///
/// Values arrive with the start code in front. Slots the source did not
/// transmit are zero.
pub fn frame_from_values(values: &[u8]) -> Option<Frame> {
    let (&start_code, slots) = values.split_first()?;
    if start_code != NULL_START_CODE {
        return None;
    }
    let count = slots.len().min(UNIVERSE_SIZE);
    let mut frame = [0u8; UNIVERSE_SIZE];
    frame[..count].copy_from_slice(&slots[..count]);
    Some(frame)
}

// Per-universe bookkeeping for change and timeout detection
struct UniverseTrack {
    last: Box<Frame>,
    last_seen: Instant,
    active: bool,
}

/// Change/timeout detection, kept apart from the socket so it can be tested.
#[derive(Default)]
pub(crate) struct UniverseTracker {
    tracks: HashMap<u16, UniverseTrack>,
}

impl UniverseTracker {
    /// Feeds one frame. Notifies on the first frame after silence and on
    /// every change of slot data.
    pub(crate) fn on_frame(
        &mut self,
        universe: u16,
        frame: &Frame,
        now: Instant,
        notifier: &FrameNotifier,
    ) -> bool {
        let track = self.tracks.entry(universe).or_insert_with(|| UniverseTrack {
            last: Box::new([0u8; UNIVERSE_SIZE]),
            last_seen: now,
            active: false,
        });
        track.last_seen = now;

        let changed = !track.active || *track.last != *frame;
        if !track.active {
            log::info!("Receiving universe {}", universe);
        }
        track.active = true;
        if changed {
            *track.last = *frame;
            return notifier.notify_change(universe, frame);
        }
        true
    }

    /// Reports universes that have been silent past the data loss timeout.
    pub(crate) fn sweep(&mut self, now: Instant, notifier: &FrameNotifier) -> bool {
        let mut alive = true;
        for (universe, track) in self.tracks.iter_mut() {
            if track.active && now.duration_since(track.last_seen) >= NETWORK_DATA_LOSS_TIMEOUT {
                track.active = false;
                log::info!("Universe {} timed out", universe);
                alive &= notifier.notify_timeout(*universe);
            }
        }
        alive
    }

    /// Drops what is known about both universes when the watched one changes.
    /// The consumer starts the new universe out as not receiving, so its next
    /// frame must be reported even if the data is the same as before.
    pub(crate) fn retarget(&mut self, previous: u16, next: u16) {
        self.tracks.remove(&previous);
        self.tracks.remove(&next);
    }
}

/// Binds the sACN port and spawns the receiver thread.
///
/// The receiver is bound here so a bind failure reaches the caller. The thread
/// runs until the run flag is cleared or the consumer goes away, then drops
/// the receiver.
pub fn spawn_receiver(
    run_state: SharedStateFlag,
    notifier: FrameNotifier,
) -> Result<JoinHandle<()>, ReceiverError> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, SACN_PORT));
    let receiver =
        SacnReceiver::with_ip(addr, None).map_err(|e| ReceiverError::Sacn(e.to_string()))?;
    log::info!("sACN receiver bound to port {}", SACN_PORT);

    let handle = thread::spawn(move || run_receiver_loop(receiver, run_state, notifier));
    Ok(handle)
}

fn listen(receiver: &mut SacnReceiver, universe: u16) {
    match receiver.listen_universes(&[universe]) {
        Ok(()) => log::info!("Listening to universe {}", universe),
        Err(e) => log::warn!("Failed to listen to universe {}: {}", universe, e),
    }
}

fn run_receiver_loop(mut receiver: SacnReceiver, run_state: SharedStateFlag, notifier: FrameNotifier) {
    log::info!("sACN receiver loop starting.");

    let mut tracker = UniverseTracker::default();
    let mut joined = notifier.watched_universe();
    listen(&mut receiver, joined);

    let (run_lock, _) = &*run_state;

    loop {
        // --- Check Run State ---
        let should_run = match run_lock.lock() {
            Ok(guard) => *guard,
            Err(_) => {
                log::error!("Run state mutex poisoned in receiver loop!");
                false
            }
        };
        if !should_run {
            log::info!("Stop signal received, exiting receiver loop.");
            break;
        }

        // --- Follow universe changes ---
        let watched = notifier.watched_universe();
        if watched != joined {
            if let Err(e) = receiver.mute_universe(joined) {
                log::debug!("Muting universe {} failed: {}", joined, e);
            }
            listen(&mut receiver, watched);
            tracker.retarget(joined, watched);
            joined = watched;
        }

        // --- Receive ---
        let now = Instant::now();
        let alive = match receiver.recv(Some(RECV_TIMEOUT)) {
            Ok(data) => data.iter().all(|dmx| match frame_from_values(&dmx.values) {
                Some(frame) => tracker.on_frame(dmx.universe, &frame, now, &notifier),
                None => true,
            }),
            // Read timeouts land here too.
            Err(e) => {
                log::trace!("sACN receive: {}", e);
                true
            }
        };

        // --- Timeouts ---
        let alive = alive && tracker.sweep(Instant::now(), &notifier);
        if !alive {
            log::info!("Event consumer gone, exiting receiver loop.");
            break;
        }
    }

    log::info!("sACN receiver stopped.");
}
