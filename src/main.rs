use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use sacn_ledfx_bridge::bridge::EventBridge;
use sacn_ledfx_bridge::config::ConfigStore;
use sacn_ledfx_bridge::ledfx::{spawn_scene_worker, LedFxClient};
use sacn_ledfx_bridge::sacn_worker::spawn_receiver;
use sacn_ledfx_bridge::{new_run_flag, request_stop, Args, BridgeApp, PROGRAM_TITLE};
use std::fs::File;
use std::io::{stdout, IsTerminal};
use std::path::Path;

// Log records would tear the terminal UI apart, so an interactive session only
// logs when it has a file to write to.
fn init_logging(interactive: bool, log_file: Option<&Path>) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Cannot open log file {}", path.display()))?;
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        None if interactive => {
            builder.filter_level(LevelFilter::Off);
        }
        None => {}
    }
    builder.init();
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let interactive = !args.daemon && stdout().is_terminal();
    init_logging(interactive, args.log_file.as_deref())?;

    log::info!("Starting {}", PROGRAM_TITLE);

    let store = ConfigStore::load(args.config.clone())
        .with_context(|| format!("Cannot load configuration from {}", args.config.display()))?;

    let run_state = new_run_flag();
    let bridge = EventBridge::new(store.data.universe);
    let receiver = spawn_receiver(run_state.clone(), bridge.notifier())
        .context("Cannot start the sACN receiver")?;
    let client = LedFxClient::new().context("Cannot create the LedFx client")?;
    let scenes = spawn_scene_worker(Box::new(client), bridge.sender());

    let mut app = BridgeApp::new(store, bridge, scenes);

    let result = if interactive {
        app.run_interactive().context("Terminal UI failed")
    } else {
        let handler_state = run_state.clone();
        ctrlc::set_handler(move || request_stop(&handler_state))
            .context("Cannot install the Ctrl+C handler")?;
        app.run_headless(&run_state);
        Ok(())
    };

    request_stop(&run_state);
    if receiver.join().is_err() {
        log::error!("sACN receiver thread panicked.");
    }
    log::info!("{} stopped.", PROGRAM_TITLE);
    result
}
