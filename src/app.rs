use crate::bridge::{Event, EventBridge, EventSender};
use crate::config::ConfigStore;
use crate::dispatcher::{apply_intent, ChannelDispatcher, Frame, Intent};
use crate::ledfx::SceneQueue;
use crate::registry::SceneRegistry;
use crate::session::{ConfigSession, SessionAction};
use crate::state::RuntimeState;
use crate::{is_running, ui, SharedStateFlag};
use crossterm::event::{self as term, Event as TermEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, stdout, Stdout};
use std::thread;
use std::time::{Duration, Instant};

/// How long the loop waits for an event before animating the receive spinner.
pub const TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Owns every piece of state the interactive loop mutates.
///
/// Nothing here is shared with another thread: producers reach the app only
/// through the [`EventBridge`].
pub struct BridgeApp {
    pub store: ConfigStore,
    pub registry: SceneRegistry,
    pub runtime: RuntimeState,
    pub session: ConfigSession,
    pub size: (u16, u16),
    pub spinner_tick: usize,
    bridge: EventBridge,
    scenes: SceneQueue,
    quit: bool,
}

impl BridgeApp {
    pub fn new(store: ConfigStore, bridge: EventBridge, scenes: SceneQueue) -> Self {
        let registry = SceneRegistry::new(store.data.scenes.clone());
        let session = ConfigSession::new(&store);
        Self {
            store,
            registry,
            runtime: RuntimeState::default(),
            session,
            size: (0, 0),
            spinner_tick: 0,
            bridge,
            scenes,
            quit: false,
        }
    }

    pub fn bridge(&self) -> &EventBridge {
        &self.bridge
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::WindowResize(width, height) => self.size = (width, height),
            Event::KeyInput(key) => {
                let action = self
                    .session
                    .handle_key(key, &mut self.store, &mut self.registry);
                if let Some(action) = action {
                    self.perform(action);
                }
            }
            Event::SceneChanged(scene) => {
                log::info!("{:03} => {}", self.runtime.channel_value, scene);
            }
            Event::Receiving { universe, frame } => self.on_frame(universe, &frame),
            Event::TimedOut { universe } => {
                if universe == self.store.data.universe {
                    self.runtime.receiving = false;
                }
            }
            Event::RemoteFailed(message) => self.session.report_remote_error(message),
            Event::ScenesFetched(names) => self.session.receive_candidates(names),
        }
    }

    /// Advances the receive spinner while frames are arriving and ages the
    /// status line.
    pub fn tick(&mut self) {
        if self.runtime.receiving {
            self.spinner_tick = self.spinner_tick.wrapping_add(1);
        }
        self.session.age_status();
    }

    fn on_frame(&mut self, universe: u16, frame: &Frame) {
        // A notification queued before a universe change can still arrive.
        if universe != self.store.data.universe {
            return;
        }
        self.runtime.receiving = true;

        let intent = ChannelDispatcher::new(&self.store.data, &self.registry).on_sample(
            &mut self.runtime,
            universe,
            frame,
        );
        if let Some(intent) = intent {
            self.apply(intent);
        }
    }

    fn apply(&mut self, intent: Intent) {
        let command = apply_intent(&intent, &mut self.registry);
        if let Err(e) = self.scenes.trigger(&self.store.data.ledfx_host, command) {
            log::error!("Could not queue scene call: {}", e);
            self.session.report_remote_error(e.to_string());
        }
        self.bridge
            .post(Event::SceneChanged(self.registry.active().clone()));
    }

    fn perform(&mut self, action: SessionAction) {
        match action {
            SessionAction::Quit => {
                log::info!("Quit requested.");
                self.quit = true;
            }
            SessionAction::FetchScenes { host } => {
                if let Err(e) = self.scenes.list_scenes(&host) {
                    self.session.report_remote_error(e.to_string());
                }
            }
            SessionAction::UniverseChanged(universe) => {
                self.bridge.watch_universe(universe);
                // Nothing has been heard on the new universe yet.
                self.runtime.receiving = false;
            }
        }
    }

    /// Processes events without a terminal until the run flag is cleared.
    pub fn run_headless(&mut self, run_state: &SharedStateFlag) {
        log::info!(
            "Running headless: universe {}, channel {}, {} scenes",
            self.store.data.universe,
            self.store.data.channel,
            self.registry.scenes().len()
        );
        while is_running(run_state) && !self.quit {
            if let Some(event) = self.bridge.next_timeout(TICK_INTERVAL) {
                self.handle_event(event);
            }
        }
    }

    /// Runs the terminal UI until the operator quits.
    pub fn run_interactive(&mut self) -> io::Result<()> {
        let mut guard = TerminalGuard::enter()?;
        let area = guard.terminal.size()?;
        self.size = (area.width, area.height);
        spawn_input_thread(self.bridge.sender());

        let mut last_tick = Instant::now();
        while !self.quit {
            guard.terminal.draw(|f| ui::draw(f, self))?;
            if let Some(event) = self.bridge.next_timeout(TICK_INTERVAL) {
                self.handle_event(event);
                // Drain whatever queued up behind it before redrawing.
                while let Some(event) = self.bridge.try_next() {
                    self.handle_event(event);
                }
            }
            // Ticks keep their pace under a steady event stream.
            if last_tick.elapsed() >= TICK_INTERVAL {
                self.tick();
                last_tick = Instant::now();
            }
        }
        Ok(())
    }
}

// Restores the terminal even when the loop bails out with an error.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        execute!(stdout(), EnterAlternateScreen)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            log::error!("Failed to leave raw mode: {}", e);
        }
        if let Err(e) = execute!(self.terminal.backend_mut(), LeaveAlternateScreen) {
            log::error!("Failed to leave alternate screen: {}", e);
        }
        let _ = self.terminal.show_cursor();
    }
}

// Feeds terminal input into the bridge. Detached: it blocks in `read` and
// dies with the process.
fn spawn_input_thread(events: EventSender) {
    thread::spawn(move || loop {
        let event = match term::read() {
            Ok(TermEvent::Key(key)) if key.kind != KeyEventKind::Release => Event::KeyInput(key),
            Ok(TermEvent::Resize(width, height)) => Event::WindowResize(width, height),
            Ok(_) => continue,
            Err(e) => {
                log::error!("Terminal input failed: {}", e);
                break;
            }
        };
        if !events.post(event) {
            break;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigData;
    use crate::dispatcher::UNIVERSE_SIZE;
    use crate::ledfx::{SceneAction, SceneCommand, SceneRequest};
    use crate::session::{Mode, STATUS_TICKS};
    use crossbeam_channel::Receiver;
    use crossterm::event::{KeyCode, KeyEvent};

    fn app_with(scenes: &[&str]) -> (BridgeApp, Receiver<SceneRequest>) {
        let mut store = ConfigStore::with_defaults("/nonexistent/config.json");
        store.data = ConfigData {
            universe: 1,
            channel: 1,
            scenes: scenes.iter().map(|s| s.to_string()).collect(),
            ledfx_host: "http://h".into(),
        };
        let bridge = EventBridge::new(store.data.universe);
        let (queue, rx) = SceneQueue::channel();
        (BridgeApp::new(store, bridge, queue), rx)
    }

    fn sample(universe: u16, value: u8) -> Event {
        let mut frame = [0u8; UNIVERSE_SIZE];
        frame[0] = value;
        Event::Receiving {
            universe,
            frame: Box::new(frame),
        }
    }

    fn key(code: KeyCode) -> Event {
        Event::KeyInput(KeyEvent::from(code))
    }

    #[test]
    fn test_red_blue_scenario() {
        let (mut app, calls) = app_with(&["Red", "Blue"]);

        app.handle_event(sample(1, 2));
        assert_eq!(app.registry.active().id(), "Blue");
        assert_eq!(
            calls.try_recv().unwrap(),
            SceneRequest::Trigger {
                host: "http://h".into(),
                command: SceneCommand::new("Blue", SceneAction::Activate),
            }
        );
        assert!(matches!(app.bridge().try_next(), Some(Event::SceneChanged(_))));

        app.handle_event(sample(1, 2));
        assert!(calls.try_recv().is_err());
        assert_eq!(app.bridge().try_next(), None);

        app.handle_event(sample(1, 0));
        assert_eq!(app.registry.active().id(), "OFF");
        assert_eq!(
            calls.try_recv().unwrap(),
            SceneRequest::Trigger {
                host: "http://h".into(),
                command: SceneCommand::new("OFF", SceneAction::Deactivate),
            }
        );
    }

    #[test]
    fn test_receiving_follows_change_and_timeout() {
        let (mut app, _calls) = app_with(&["Red"]);
        assert!(!app.runtime.receiving);

        app.handle_event(sample(1, 0));
        assert!(app.runtime.receiving);

        app.handle_event(Event::TimedOut { universe: 2 });
        assert!(app.runtime.receiving);

        app.handle_event(Event::TimedOut { universe: 1 });
        assert!(!app.runtime.receiving);
    }

    #[test]
    fn test_stale_universe_frames_ignored() {
        let (mut app, calls) = app_with(&["Red"]);
        app.handle_event(sample(5, 1));
        assert!(!app.runtime.receiving);
        assert_eq!(app.runtime.last_observed, 0);
        assert_eq!(app.registry.active().id(), "OFF");
        assert!(calls.try_recv().is_err());
    }

    #[test]
    fn test_staged_edits_invisible_to_dispatcher() {
        let (mut app, calls) = app_with(&["Red", "Blue"]);

        // Open the scene editor and swap Red/Blue without committing.
        for code in [KeyCode::Down, KeyCode::Down, KeyCode::Down, KeyCode::Enter] {
            app.handle_event(key(code));
        }
        app.handle_event(key(KeyCode::Down));
        app.handle_event(key(KeyCode::PageDown));
        assert!(matches!(app.session.mode(), Mode::EditingSceneList(_)));

        app.handle_event(sample(1, 1));
        assert_eq!(app.registry.active().id(), "Red");
        assert!(matches!(
            calls.try_recv().unwrap(),
            SceneRequest::Trigger { command, .. } if command.id == "Red"
        ));
    }

    #[test]
    fn test_universe_commit_repoints_filter() {
        let (mut app, _calls) = app_with(&["Red"]);
        app.handle_event(sample(1, 0));

        app.handle_event(key(KeyCode::Enter));
        app.handle_event(key(KeyCode::Up));
        app.handle_event(key(KeyCode::Enter));

        assert_eq!(app.store.data.universe, 2);
        assert_eq!(app.bridge().watched_universe(), 2);
        assert!(!app.runtime.receiving);
        assert!(app.session.dirty());
    }

    #[test]
    fn test_fetch_request_and_results() {
        let (mut app, calls) = app_with(&["Red"]);
        for code in [KeyCode::Down, KeyCode::Down, KeyCode::Down, KeyCode::Enter, KeyCode::Enter] {
            app.handle_event(key(code));
        }
        assert_eq!(
            calls.try_recv().unwrap(),
            SceneRequest::ListScenes {
                host: "http://h".into()
            }
        );

        app.handle_event(Event::ScenesFetched(vec!["b".into(), "a".into()]));
        assert_eq!(app.session.scene_list().unwrap().candidates, ["a", "b"]);
    }

    #[test]
    fn test_remote_failure_keeps_activation() {
        let (mut app, _calls) = app_with(&["Red"]);
        app.handle_event(sample(1, 1));
        app.handle_event(Event::RemoteFailed("LedFx: down".into()));
        assert_eq!(app.registry.active().id(), "Red");
        assert!(app.session.status().is_some());
    }

    #[test]
    fn test_remote_failure_status_is_transient() {
        let (mut app, _calls) = app_with(&["Red"]);
        app.handle_event(Event::RemoteFailed("LedFx: down".into()));
        for _ in 0..STATUS_TICKS {
            app.tick();
        }
        assert_eq!(app.session.status(), None);
    }

    #[test]
    fn test_switch_away_and_back_resumes_receiving() {
        let (mut app, _calls) = app_with(&["Red"]);
        app.handle_event(sample(1, 1));

        app.perform(SessionAction::UniverseChanged(2));
        app.store.data.universe = 2;
        assert!(!app.runtime.receiving);
        app.perform(SessionAction::UniverseChanged(1));
        app.store.data.universe = 1;
        assert_eq!(app.bridge().watched_universe(), 1);

        // The receiver reports the running stream again after a retarget.
        app.handle_event(sample(1, 1));
        assert!(app.runtime.receiving);
        assert_eq!(app.registry.active().id(), "Red");
    }

    #[test]
    fn test_quit_and_spinner() {
        let (mut app, _calls) = app_with(&[]);
        app.tick();
        assert_eq!(app.spinner_tick, 0);
        app.handle_event(sample(1, 0));
        app.tick();
        assert_eq!(app.spinner_tick, 1);

        app.handle_event(key(KeyCode::Char('q')));
        assert!(app.should_quit());
    }
}
