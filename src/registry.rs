use std::fmt;

/// Display name of the registry when no scene is active.
pub const SCENE_OFF: &str = "OFF";

/// The scene the bridge last asked LedFx to show.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ActiveScene {
    #[default]
    Off,
    Scene(String),
}

impl ActiveScene {
    /// Identifier sent with a scene call; `"OFF"` when nothing is active.
    pub fn id(&self) -> &str {
        match self {
            ActiveScene::Off => SCENE_OFF,
            ActiveScene::Scene(id) => id,
        }
    }
}

impl fmt::Display for ActiveScene {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Committed scene order plus the currently active scene.
///
/// Byte value `n` on the watched channel addresses `scenes()[n - 1]`. The list
/// only changes through [`SceneRegistry::replace_scenes`], which the
/// configuration session calls when the operator commits a staged list.
#[derive(Debug, Clone, Default)]
pub struct SceneRegistry {
    scenes: Vec<String>,
    active: ActiveScene,
}

impl SceneRegistry {
    pub fn new(scenes: Vec<String>) -> Self {
        Self {
            scenes,
            active: ActiveScene::Off,
        }
    }

    // No check against the list; the dispatcher only passes in-range ids.
    pub fn activate(&mut self, id: impl Into<String>) {
        self.active = ActiveScene::Scene(id.into());
    }

    pub fn deactivate(&mut self) {
        self.active = ActiveScene::Off;
    }

    pub fn scenes(&self) -> &[String] {
        &self.scenes
    }

    pub fn replace_scenes(&mut self, new_order: Vec<String>) {
        log::debug!("Scene list replaced: {:?}", new_order);
        self.scenes = new_order;
    }

    pub fn active(&self) -> &ActiveScene {
        &self.active
    }
}
