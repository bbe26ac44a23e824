//! The single ordered event stream consumed by the interactive loop.
//!
//! Producers (the sACN receiver thread, the terminal input thread, the scene
//! worker) only ever send [`Event`]s; all state they report on is written by
//! the consumer after dequeue. The channel is unbounded so a producer never
//! waits on the consumer. The cost is memory: if the consumer stalls for long
//! under a steady frame rate the queue grows instead of dropping events, which
//! keeps ordering intact. At sACN rates (at most ~44 changes per second per
//! universe) this is not expected to matter.

use crate::dispatcher::Frame;
use crate::registry::ActiveScene;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use crossterm::event::KeyEvent;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    WindowResize(u16, u16),
    KeyInput(KeyEvent),
    /// The registry's active scene changed as the result of a channel change.
    SceneChanged(ActiveScene),
    /// Slot data of the watched universe changed.
    Receiving { universe: u16, frame: Box<Frame> },
    /// The watched universe stopped sending.
    TimedOut { universe: u16 },
    /// A scene call or scene listing failed.
    RemoteFailed(String),
    /// Scene identifiers reported by LedFx, sorted.
    ScenesFetched(Vec<String>),
}

/// Consumer end of the stream, plus the universe filter shared with producers.
pub struct EventBridge {
    tx: Sender<Event>,
    rx: Receiver<Event>,
    universe: Arc<AtomicU16>,
}

impl EventBridge {
    pub fn new(universe: u16) -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            universe: Arc::new(AtomicU16::new(universe)),
        }
    }

    /// Handle for the frame receiver. Filters by the watched universe.
    pub fn notifier(&self) -> FrameNotifier {
        FrameNotifier {
            tx: self.tx.clone(),
            universe: self.universe.clone(),
        }
    }

    /// Unfiltered handle for input and worker threads.
    pub fn sender(&self) -> EventSender {
        EventSender {
            tx: self.tx.clone(),
        }
    }

    /// Re-points the producer-side filter after the operator commits a new universe.
    pub fn watch_universe(&self, universe: u16) {
        log::info!("Watching universe {}", universe);
        self.universe.store(universe, Ordering::SeqCst);
    }

    pub fn watched_universe(&self) -> u16 {
        self.universe.load(Ordering::SeqCst)
    }

    /// Queues an event from the consumer side, behind everything already queued.
    pub fn post(&self, event: Event) {
        // The bridge holds a receiver itself, so this cannot fail.
        let _ = self.tx.send(event);
    }

    /// Next event, or `None` if nothing arrived within `timeout`.
    pub fn next_timeout(&self, timeout: Duration) -> Option<Event> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn try_next(&self) -> Option<Event> {
        self.rx.try_recv().ok()
    }
}

/// Producer handle given to the sACN receiver.
#[derive(Clone)]
pub struct FrameNotifier {
    tx: Sender<Event>,
    universe: Arc<AtomicU16>,
}

impl FrameNotifier {
    pub fn watched_universe(&self) -> u16 {
        self.universe.load(Ordering::SeqCst)
    }

    /// Returns `false` only when the consumer is gone.
    pub fn notify_change(&self, universe: u16, frame: &Frame) -> bool {
        if universe != self.watched_universe() {
            return true;
        }
        self.tx
            .send(Event::Receiving {
                universe,
                frame: Box::new(*frame),
            })
            .is_ok()
    }

    pub fn notify_timeout(&self, universe: u16) -> bool {
        if universe != self.watched_universe() {
            return true;
        }
        self.tx.send(Event::TimedOut { universe }).is_ok()
    }
}

#[derive(Clone)]
pub struct EventSender {
    tx: Sender<Event>,
}

impl EventSender {
    pub fn post(&self, event: Event) -> bool {
        self.tx.send(event).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::UNIVERSE_SIZE;
    use std::thread;

    fn frame(value: u8) -> Frame {
        [value; UNIVERSE_SIZE]
    }

    #[test]
    fn test_other_universes_never_enter_queue() {
        let bridge = EventBridge::new(3);
        let notifier = bridge.notifier();

        assert!(notifier.notify_change(4, &frame(1)));
        assert!(notifier.notify_timeout(4));
        assert_eq!(bridge.try_next(), None);

        notifier.notify_timeout(3);
        assert_eq!(bridge.try_next(), Some(Event::TimedOut { universe: 3 }));
    }

    #[test]
    fn test_filter_follows_watched_universe() {
        let bridge = EventBridge::new(1);
        let notifier = bridge.notifier();
        bridge.watch_universe(2);

        notifier.notify_timeout(1);
        notifier.notify_timeout(2);
        assert_eq!(bridge.try_next(), Some(Event::TimedOut { universe: 2 }));
        assert_eq!(bridge.try_next(), None);
    }

    #[test]
    fn test_kinds_are_not_coalesced() {
        let bridge = EventBridge::new(1);
        let notifier = bridge.notifier();

        notifier.notify_change(1, &frame(1));
        notifier.notify_timeout(1);
        notifier.notify_change(1, &frame(1));

        assert!(matches!(bridge.try_next(), Some(Event::Receiving { .. })));
        assert_eq!(bridge.try_next(), Some(Event::TimedOut { universe: 1 }));
        assert!(matches!(bridge.try_next(), Some(Event::Receiving { .. })));
    }

    #[test]
    fn test_order_preserved_across_threads() {
        let bridge = EventBridge::new(1);
        let notifier = bridge.notifier();

        // Each invocation emits, hands the baton on, then keeps running so the
        // invocations overlap in time.
        let (first_tx, mut baton) = unbounded::<()>();
        let mut handles = Vec::new();
        for value in 0..=255u8 {
            let n = notifier.clone();
            let (next_tx, next_rx) = unbounded::<()>();
            let go = baton;
            handles.push(thread::spawn(move || {
                go.recv().unwrap();
                n.notify_change(1, &frame(value));
                next_tx.send(()).unwrap();
                thread::yield_now();
            }));
            baton = next_rx;
        }
        first_tx.send(()).unwrap();
        for handle in handles {
            handle.join().unwrap();
        }

        for expected in 0..=255u8 {
            match bridge.try_next() {
                Some(Event::Receiving { frame, .. }) => assert_eq!(frame[0], expected),
                other => panic!("unexpected event {:?}", other),
            }
        }
    }

    #[test]
    fn test_producer_never_blocks() {
        let bridge = EventBridge::new(1);
        let notifier = bridge.notifier();
        for _ in 0..10_000 {
            assert!(notifier.notify_timeout(1));
        }
        assert_eq!(bridge.rx.len(), 10_000);
    }
}
