use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use crate::adapters::AdapterSelection;
use crate::gpu::Extent;
use crate::settings::{RenderSettings, WindowMode};

const SCHEMA_VERSION: i32 = 1;
const APP_DIR_NAME: &str = "CustomFPS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppState {
    /// LUID of the adapter last used for rendering.
    pub render_adapter_luid: Option<i64>,
    /// Device name of the last output, e.g. `\\.\DISPLAY1`.
    pub display_output: Option<String>,
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
    #[serde(default)]
    pub window_mode: WindowMode,
    #[serde(default = "default_log_retention_count")]
    pub log_retention_count: usize,
}

fn default_log_retention_count() -> usize {
    10
}

impl Default for AppState {
    fn default() -> Self {
        let settings = RenderSettings::default();
        Self {
            render_adapter_luid: None,
            display_output: None,
            width: settings.size.width,
            height: settings.size.height,
            target_fps: settings.target_fps,
            window_mode: settings.mode,
            log_retention_count: default_log_retention_count(),
        }
    }
}

impl AppState {
    /// Last confirmed settings; not re-validated, the form does that.
    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            size: Extent::new(self.width, self.height),
            target_fps: self.target_fps,
            mode: self.window_mode,
        }
    }

    pub fn remember(&mut self, selection: &AdapterSelection, settings: &RenderSettings) {
        self.render_adapter_luid = Some(selection.render().luid);
        self.display_output = Some(selection.output().device_name.clone());
        self.width = settings.size.width;
        self.height = settings.size.height;
        self.target_fps = settings.target_fps;
        self.window_mode = settings.mode;
    }
}

enum WriteCommand {
    Update(AppState),
    Shutdown,
}

pub struct StateManager {
    app_data_dir: PathBuf,
    state: Arc<RwLock<AppState>>,
    write_sender: Sender<WriteCommand>,
    write_thread: Option<thread::JoinHandle<()>>,
}

impl StateManager {
    /// Opens the store under `%APPDATA%\CustomFPS`.
    pub fn new() -> Result<Self> {
        let app_data = std::env::var("APPDATA")
            .or_else(|_| std::env::var("HOME"))
            .context("Failed to get APPDATA environment variable")?;

        Self::open(PathBuf::from(app_data).join(APP_DIR_NAME))
    }

    pub fn open(app_data_dir: impl Into<PathBuf>) -> Result<Self> {
        let app_data_dir = app_data_dir.into();
        let db_path = app_data_dir.join("state.db");

        std::fs::create_dir_all(&app_data_dir)
            .context("Failed to create app data directory")?;

        let conn = Connection::open(&db_path).context("Failed to open database")?;
        Self::init_database(&conn)?;

        let initial_state = Self::load_state(&conn)?;
        drop(conn);
        let state = Arc::new(RwLock::new(initial_state));

        let (write_sender, write_receiver): (Sender<WriteCommand>, Receiver<WriteCommand>) = unbounded();

        let write_thread = thread::Builder::new()
            .name("state-writer".to_string())
            .spawn(move || Self::write_worker(db_path, write_receiver))
            .context("Failed to spawn state writer thread")?;

        Ok(Self {
            app_data_dir,
            state,
            write_sender,
            write_thread: Some(write_thread),
        })
    }

    fn init_database(conn: &Connection) -> Result<()> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;

        let current_version: Option<i32> = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
            .ok();

        if current_version.is_none() {
            conn.execute("INSERT INTO schema_version (version) VALUES (?1)", params![SCHEMA_VERSION])?;
        }

        Ok(())
    }

    fn load_state(conn: &Connection) -> Result<AppState> {
        let json_str: Option<String> = conn
            .query_row("SELECT value FROM state WHERE key = 'app_state'", [], |row| row.get(0))
            .ok();

        match json_str {
            Some(json) => match serde_json::from_str(&json) {
                Ok(state) => Ok(state),
                Err(e) => {
                    // Settings from an incompatible build; start fresh rather than refuse to launch
                    crate::log_warn!("Discarding unreadable saved settings: {}", e);
                    Ok(AppState::default())
                }
            },
            None => Ok(AppState::default()),
        }
    }

    fn write_worker(db_path: PathBuf, receiver: Receiver<WriteCommand>) {
        let conn = match Connection::open(&db_path) {
            Ok(c) => c,
            Err(e) => {
                crate::log_error!("Failed to open database in write worker: {}", e);
                return;
            }
        };

        let _ = conn.pragma_update(None, "journal_mode", "WAL");
        let _ = conn.pragma_update(None, "synchronous", "NORMAL");

        while let Ok(cmd) = receiver.recv() {
            match cmd {
                WriteCommand::Update(state) => match serde_json::to_string(&state) {
                    Ok(json) => {
                        if let Err(e) = conn.execute(
                            "INSERT OR REPLACE INTO state (key, value) VALUES ('app_state', ?1)",
                            params![json],
                        ) {
                            crate::log_error!("Failed to write state: {}", e);
                        }
                    }
                    Err(e) => crate::log_error!("Failed to serialize state: {}", e),
                },
                WriteCommand::Shutdown => break,
            }
        }

        let _ = conn.pragma_update(None, "wal_checkpoint", "TRUNCATE");
    }

    pub fn log_dir(&self) -> PathBuf {
        self.app_data_dir.join("logs")
    }

    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&AppState) -> R,
    {
        f(&self.state.read())
    }

    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut AppState),
    {
        let mut state = self.state.write();
        f(&mut state);
        let _ = self.write_sender.send(WriteCommand::Update(state.clone()));
    }
}

impl Drop for StateManager {
    fn drop(&mut self) {
        let _ = self.write_sender.send(WriteCommand::Shutdown);
        if let Some(handle) = self.write_thread.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::tests::hybrid_laptop;
    use crate::adapters::OutputRef;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("customfps_state_{}_{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn empty_store_yields_defaults() {
        let dir = scratch_dir("defaults");
        let manager = StateManager::open(&dir).unwrap();
        assert_eq!(manager.read(|s| s.clone()), AppState::default());
        assert_eq!(manager.read(|s| s.render_settings()), RenderSettings::default());
        assert_eq!(manager.log_dir(), dir.join("logs"));
        drop(manager);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn updates_survive_reopen() {
        let dir = scratch_dir("reopen");
        let selection = hybrid_laptop().select(1, OutputRef { adapter: 0, output: 0 }).unwrap();
        let settings = RenderSettings {
            size: Extent::new(1280, 720),
            target_fps: 144,
            mode: WindowMode::Borderless,
        };

        {
            let manager = StateManager::open(&dir).unwrap();
            manager.update(|s| s.remember(&selection, &settings));
        }

        let manager = StateManager::open(&dir).unwrap();
        let state = manager.read(|s| s.clone());
        assert_eq!(state.render_adapter_luid, Some(selection.render().luid));
        assert_eq!(state.display_output.as_deref(), Some("\\\\.\\DISPLAY1"));
        assert_eq!(state.render_settings(), settings);
        drop(manager);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn older_json_without_new_fields_still_loads() {
        let json = r#"{"render_adapter_luid":null,"display_output":null,"width":640,"height":480,"target_fps":30}"#;
        let state: AppState = serde_json::from_str(json).unwrap();
        assert_eq!(state.window_mode, WindowMode::Windowed);
        assert_eq!(state.log_retention_count, 10);
        assert_eq!(state.render_settings().size, Extent::new(640, 480));
    }
}
