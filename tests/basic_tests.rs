use sacn_ledfx_bridge::config::{ConfigData, ConfigStore, DEFAULT_LEDFX_HOST};
use sacn_ledfx_bridge::dispatcher::{apply_intent, ChannelDispatcher, Intent, UNIVERSE_SIZE};
use sacn_ledfx_bridge::ledfx::SceneAction;
use sacn_ledfx_bridge::registry::{ActiveScene, SceneRegistry, SCENE_OFF};
use sacn_ledfx_bridge::session::{ConfigSession, EditField, Mode};
use sacn_ledfx_bridge::state::{LinkState, RuntimeState};
use std::fs;

#[test]
fn test_config_data_default() {
    // Test that the default ConfigData is created correctly
    let config = ConfigData::default();

    assert_eq!(config.universe, 1);
    assert_eq!(config.channel, 1);
    assert_eq!(config.scenes.len(), 0);
    assert_eq!(config.ledfx_host, DEFAULT_LEDFX_HOST);
}

#[test]
fn test_missing_config_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let store = ConfigStore::load(dir.path().join("config.json")).unwrap();

    assert_eq!(store.data, ConfigData::default());
    assert!(!store.from_file());

    // Nothing on disk yet, so the session starts out unsaved
    assert!(ConfigSession::new(&store).dirty());
}

#[test]
fn test_malformed_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");

    fs::write(&path, "{ not json").unwrap();
    assert!(ConfigStore::load(&path).is_err());

    fs::write(&path, r#"{"sAcnUniverse": 0, "channel": 1}"#).unwrap();
    assert!(ConfigStore::load(&path).is_err());

    fs::write(&path, r#"{"sAcnUniverse": 1, "channel": 600}"#).unwrap();
    assert!(ConfigStore::load(&path).is_err());
}

#[test]
fn test_config_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");

    let mut store = ConfigStore::with_defaults(&path);
    store.data = ConfigData {
        universe: 7,
        channel: 42,
        scenes: vec!["Red".to_string(), "Blue".to_string()],
        ledfx_host: "http://10.0.0.2:8888".to_string(),
    };
    store.save().unwrap();
    assert!(store.from_file());

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("\"sAcnUniverse\": 7"));
    assert!(text.contains("\"ledfx_host\""));

    let reloaded = ConfigStore::load(&path).unwrap();
    assert_eq!(reloaded.data, store.data);
    assert!(reloaded.from_file());
    assert!(!ConfigSession::new(&reloaded).dirty());
}

#[test]
fn test_registry_lifecycle() {
    let mut registry = SceneRegistry::new(vec!["A".to_string(), "B".to_string()]);
    assert_eq!(*registry.active(), ActiveScene::Off);
    assert_eq!(registry.active().id(), SCENE_OFF);

    registry.activate("B");
    assert_eq!(format!("{}", registry.active()), "B");

    // Replacing the list leaves the active scene alone
    registry.replace_scenes(vec!["C".to_string()]);
    assert_eq!(registry.active().id(), "B");
    assert_eq!(registry.scenes(), ["C"]);

    registry.deactivate();
    assert_eq!(*registry.active(), ActiveScene::Off);
}

#[test]
fn test_runtime_state_default() {
    let state = RuntimeState::default();
    assert_eq!(state.last_observed, 0);
    assert_eq!(state.channel_value, 0);
    assert_eq!(state.link(), LinkState::Idle);
}

#[test]
fn test_channel_drives_scenes() {
    let config = ConfigData {
        universe: 1,
        channel: 1,
        scenes: vec!["Red".to_string(), "Blue".to_string()],
        ..ConfigData::default()
    };
    let mut registry = SceneRegistry::new(config.scenes.clone());
    let mut state = RuntimeState::default();
    let mut frame = [0u8; UNIVERSE_SIZE];

    let mut sample = |value: u8, registry: &mut SceneRegistry, state: &mut RuntimeState| {
        frame[0] = value;
        let intent = ChannelDispatcher::new(&config, registry).on_sample(state, 1, &frame);
        intent.map(|intent| (intent.clone(), apply_intent(&intent, registry)))
    };

    let (intent, command) = sample(2, &mut registry, &mut state).unwrap();
    assert_eq!(intent, Intent::Activate("Blue".to_string()));
    assert_eq!(command.id, "Blue");
    assert_eq!(command.action, SceneAction::Activate);

    // Retransmitted frame
    assert!(sample(2, &mut registry, &mut state).is_none());

    // No scene behind value 9: nothing happens, but the change is remembered
    assert!(sample(9, &mut registry, &mut state).is_none());
    assert_eq!(registry.active().id(), "Blue");

    let (intent, command) = sample(0, &mut registry, &mut state).unwrap();
    assert_eq!(intent, Intent::Deactivate);
    assert_eq!(command.id, SCENE_OFF);
    assert_eq!(command.action, SceneAction::Deactivate);
    assert_eq!(*registry.active(), ActiveScene::Off);
}

#[test]
fn test_session_starts_browsing() {
    let store = ConfigStore::with_defaults("config.json");
    let session = ConfigSession::new(&store);

    assert_eq!(*session.mode(), Mode::Browsing);
    assert_eq!(session.selected(), EditField::Universe);
    assert!(session.status().is_none());
}
