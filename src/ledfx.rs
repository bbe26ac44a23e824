//! LedFx scene API client and the worker thread that issues its calls.
//!
//! Calls are fire-and-forget: nothing is retried and a failure never rolls
//! back the scene registry. Failures are reported back to the interactive loop
//! as [`Event::RemoteFailed`] so they can be shown as a transient status line.

use crate::bridge::{Event, EventSender};
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::thread;
use thiserror::Error;

const SCENES_PATH: &str = "/api/scenes";

/// LedFx call errors
#[derive(Error, Debug)]
pub enum LedFxError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Scene worker is not running")]
    WorkerGone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneAction {
    Activate,
    Deactivate,
}

/// Body of `PUT /api/scenes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneCommand {
    pub id: String,
    pub action: SceneAction,
}

impl SceneCommand {
    pub fn new(id: impl Into<String>, action: SceneAction) -> Self {
        Self {
            id: id.into(),
            action,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScenesResponse {
    #[serde(default)]
    scenes: BTreeMap<String, serde_json::Value>,
}

/// The two operations the bridge needs from the remote effects service.
pub trait SceneService: Send {
    fn set_scene(&self, host: &str, command: &SceneCommand) -> Result<(), LedFxError>;

    /// Scene identifiers known to the service, sorted.
    fn list_scenes(&self, host: &str) -> Result<Vec<String>, LedFxError>;
}

pub fn scenes_url(host: &str) -> String {
    format!("{}{}", host.trim_end_matches('/'), SCENES_PATH)
}

/// Blocking HTTP implementation of [`SceneService`].
pub struct LedFxClient {
    client: reqwest::blocking::Client,
}

impl LedFxClient {
    pub fn new() -> Result<Self, LedFxError> {
        let client = reqwest::blocking::Client::builder().build()?;
        Ok(Self { client })
    }
}

impl SceneService for LedFxClient {
    fn set_scene(&self, host: &str, command: &SceneCommand) -> Result<(), LedFxError> {
        let url = scenes_url(host);
        log::debug!("PUT {} {:?}", url, command);
        self.client
            .put(&url)
            .json(command)
            .send()?
            .error_for_status()?;
        Ok(())
    }

    fn list_scenes(&self, host: &str) -> Result<Vec<String>, LedFxError> {
        let url = scenes_url(host);
        log::debug!("GET {}", url);
        let response: ScenesResponse = self.client.get(&url).send()?.error_for_status()?.json()?;
        // BTreeMap keys come out in lexicographic order.
        Ok(response.scenes.into_keys().collect())
    }
}

/// Work handed to the scene worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneRequest {
    Trigger { host: String, command: SceneCommand },
    ListScenes { host: String },
}

/// Sending half of the scene worker's queue. Never blocks the caller.
#[derive(Clone)]
pub struct SceneQueue {
    tx: Sender<SceneRequest>,
}

impl SceneQueue {
    /// A queue plus its receiving end, for a worker or a test to drain.
    pub fn channel() -> (Self, Receiver<SceneRequest>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }

    pub fn trigger(&self, host: &str, command: SceneCommand) -> Result<(), LedFxError> {
        self.submit(SceneRequest::Trigger {
            host: host.to_string(),
            command,
        })
    }

    pub fn list_scenes(&self, host: &str) -> Result<(), LedFxError> {
        self.submit(SceneRequest::ListScenes {
            host: host.to_string(),
        })
    }

    fn submit(&self, request: SceneRequest) -> Result<(), LedFxError> {
        self.tx.send(request).map_err(|_| LedFxError::WorkerGone)
    }
}

/// Spawns the thread that executes scene requests one at a time, in order.
///
/// The thread ends once every [`SceneQueue`] clone is dropped. It is not
/// joined on shutdown: an in-flight call is left to finish or die with the
/// process.
pub fn spawn_scene_worker(service: Box<dyn SceneService>, events: EventSender) -> SceneQueue {
    let (queue, rx) = SceneQueue::channel();
    thread::spawn(move || {
        log::info!("Scene worker started.");
        run_scene_worker(service.as_ref(), &rx, &events);
        log::info!("Scene worker finished.");
    });
    queue
}

pub(crate) fn run_scene_worker(
    service: &dyn SceneService,
    rx: &Receiver<SceneRequest>,
    events: &EventSender,
) {
    for request in rx.iter() {
        match request {
            SceneRequest::Trigger { host, command } => {
                if let Err(e) = service.set_scene(&host, &command) {
                    log::warn!("Scene call for '{}' failed: {}", command.id, e);
                    events.post(Event::RemoteFailed(format!(
                        "LedFx: scene '{}' failed: {}",
                        command.id, e
                    )));
                }
            }
            SceneRequest::ListScenes { host } => match service.list_scenes(&host) {
                Ok(names) => {
                    log::info!("LedFx reports {} scenes", names.len());
                    events.post(Event::ScenesFetched(names));
                }
                Err(e) => {
                    log::warn!("Listing scenes failed: {}", e);
                    events.post(Event::RemoteFailed(format!("LedFx: listing scenes failed: {}", e)));
                }
            },
        }
    }
}
