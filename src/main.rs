#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod gui;

use anyhow::Result;
use customfps::{log_error, log_info, log_warn, AdapterSnapshot, LoopExit, SessionConfig, SessionError, StateManager};
use std::sync::Arc;

fn main() -> Result<()> {
    let result = run_app();
    let _ = customfps::logger::finalize_logs();
    result
}

fn run_app() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let stream_logs = args.iter().any(|a| a == "--stream-logs");

    let state = Arc::new(StateManager::new()?);

    let log_retention = state.read(|s| s.log_retention_count);
    customfps::logger::init_logger(state.log_dir(), "customfps", log_retention, stream_logs)?;

    log_info!("=== CustomFPS Starting ===");
    if let Some(log_path) = customfps::logger::get_log_path() {
        log_info!("Log file: {}", log_path.display());
    }
    if stream_logs {
        log_info!("Streaming mode enabled via --stream-logs");
    } else {
        log_info!("Buffered mode - logs will be written to file on exit");
    }

    let mut last_error: Option<String> = None;

    loop {
        let snapshot = match enumerate_adapters() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log_error!("Adapter enumeration failed: {:#}", e);
                last_error = Some(format!("Adapter enumeration failed: {:#}", e));
                AdapterSnapshot::default()
            }
        };
        log_snapshot(&snapshot);

        let Some(config) = gui::show_settings(Arc::clone(&state), snapshot, last_error.take())? else {
            log_info!("Settings closed - exiting");
            break;
        };

        match run_session(&config) {
            Ok(LoopExit::Closed) => log_info!("Render window closed - back to settings"),
            Ok(LoopExit::ReturnToSettings) => log_info!("Returning to settings"),
            Ok(LoopExit::Failed(e)) => {
                let message = format!("{:#}", anyhow::Error::new(e));
                log_error!("Session failed: {}", message);
                last_error = Some(format!("Session stopped: {}", message));
            }
            Err(e) => {
                let message = format!("{:#}", anyhow::Error::new(e));
                log_error!("Session start failed: {}", message);
                last_error = Some(format!("Could not start session: {}", message));
            }
        }
    }

    Ok(())
}

fn log_snapshot(snapshot: &AdapterSnapshot) {
    if snapshot.is_empty() {
        log_warn!("No adapters found");
    }
    for adapter in snapshot.adapters() {
        log_info!(
            "Adapter {}: {} ({} MB, LUID {:#x})",
            adapter.index,
            adapter.name,
            adapter.dedicated_video_memory >> 20,
            adapter.luid
        );
        for output in &adapter.outputs {
            log_info!("  Output {}: {} ({})", output.index, output.device_name, output.bounds.extent());
        }
    }
}

#[cfg(windows)]
fn enumerate_adapters() -> Result<AdapterSnapshot> {
    customfps::adapters::enumerate()
}

#[cfg(not(windows))]
fn enumerate_adapters() -> Result<AdapterSnapshot> {
    Ok(AdapterSnapshot::default())
}

/// The window comes first so the swap chain has something to bind to, and
/// outlives the session, which is torn down when the loop returns.
#[cfg(windows)]
fn run_session(config: &SessionConfig) -> Result<LoopExit, SessionError> {
    use customfps::gpu::d3d11::D3D11Gpu;
    use customfps::window::RenderWindow;
    use customfps::{RenderLoop, RenderSession};

    let mut window = RenderWindow::create(config)?;
    let gpu = D3D11Gpu::new(window.hwnd()).map_err(SessionError::Backend)?;
    let session = RenderSession::start(gpu, config)?;

    Ok(RenderLoop::new(session, config.target_fps).run(&mut window))
}

#[cfg(not(windows))]
fn run_session(_config: &SessionConfig) -> Result<LoopExit, SessionError> {
    Err(SessionError::Backend("Direct3D 11 is only available on Windows".into()))
}
