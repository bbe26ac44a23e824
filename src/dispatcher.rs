use crate::config::ConfigData;
use crate::ledfx::{SceneAction, SceneCommand};
use crate::registry::SceneRegistry;
use crate::state::RuntimeState;

/// Slots in one sACN universe.
pub const UNIVERSE_SIZE: usize = 512;

pub type Frame = [u8; UNIVERSE_SIZE];

/// What a channel change asks the bridge to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Activate(String),
    Deactivate,
}

/// Turns samples of the watched channel into scene intents.
///
/// sACN sources retransmit the same frame continuously, so only a change of
/// the channel value produces an intent. The dispatcher reads the committed
/// configuration only; a staged scene list is invisible to it.
pub struct ChannelDispatcher<'a> {
    config: &'a ConfigData,
    scenes: &'a [String],
}

impl<'a> ChannelDispatcher<'a> {
    pub fn new(config: &'a ConfigData, registry: &'a SceneRegistry) -> Self {
        Self {
            config,
            scenes: registry.scenes(),
        }
    }

    pub fn on_sample(
        &self,
        state: &mut RuntimeState,
        universe: u16,
        frame: &Frame,
    ) -> Option<Intent> {
        if universe != self.config.universe {
            log::trace!("Ignoring sample for universe {}", universe);
            return None;
        }

        let value = *frame.get(self.config.channel_index())?;
        state.channel_value = value;

        if value == state.last_observed {
            return None;
        }
        state.last_observed = value;

        if value == 0 {
            log::debug!("Channel {} -> 0, deactivating", self.config.channel);
            return Some(Intent::Deactivate);
        }

        match self.scenes.get(usize::from(value) - 1) {
            Some(id) => {
                log::debug!("Channel {} -> {}, scene '{}'", self.config.channel, value, id);
                Some(Intent::Activate(id.clone()))
            }
            None => {
                // The desk may sweep through values with no scene behind them.
                log::trace!(
                    "Value {} exceeds the {} configured scenes",
                    value,
                    self.scenes.len()
                );
                None
            }
        }
    }
}

/// Records the intent in the registry and returns the call that announces it.
///
/// The registry is updated first. A failed call later on does not undo it.
pub fn apply_intent(intent: &Intent, registry: &mut SceneRegistry) -> SceneCommand {
    match intent {
        Intent::Activate(id) => {
            registry.activate(id.clone());
            SceneCommand::new(registry.active().id(), SceneAction::Activate)
        }
        Intent::Deactivate => {
            registry.deactivate();
            SceneCommand::new(registry.active().id(), SceneAction::Deactivate)
        }
    }
}
