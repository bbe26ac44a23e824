// Export modules for testing
pub mod about;
pub mod app;
pub mod bridge;
pub mod config;
pub mod dispatcher;
pub mod ledfx;
pub mod registry;
pub mod sacn_worker;
pub mod session;
pub mod state;
pub mod ui;
pub mod util;

// Re-export main types for testing
pub use crate::app::BridgeApp;
pub use crate::bridge::{Event, EventBridge};
pub use crate::config::{ConfigData, ConfigStore};
pub use crate::registry::SceneRegistry;
pub use crate::session::ConfigSession;
pub use crate::state::RuntimeState;

// Constants
pub const PROGRAM_TITLE: &str = "sACN LedFx Bridge";

// Type aliases for shared state
use std::sync::{Arc, Condvar, Mutex};
pub type SharedStateFlag = Arc<(Mutex<bool>, Condvar)>;

// Args struct for command line parsing
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Run without the terminal UI
    #[arg(short, long, default_value_t = false)]
    pub daemon: bool,

    /// Config file path
    #[arg(short, long, default_value = config::DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Write log output to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// A run flag in the running state.
pub fn new_run_flag() -> SharedStateFlag {
    Arc::new((Mutex::new(true), Condvar::new()))
}

// Get the current run status
pub fn is_running(run_state: &SharedStateFlag) -> bool {
    let (lock, _) = &**run_state;
    match lock.lock() {
        Ok(guard) => *guard,
        Err(_) => false, // Return false if the mutex is poisoned
    }
}

// Signal worker threads to stop
pub fn request_stop(run_state: &SharedStateFlag) {
    let (lock, cvar) = &**run_state;
    match lock.lock() {
        Ok(mut running) => {
            *running = false;
            log::info!("Signaling worker threads to stop.");
        }
        Err(_) => {
            log::error!("Run state mutex poisoned during shutdown!");
        }
    }
    cvar.notify_all();
}
