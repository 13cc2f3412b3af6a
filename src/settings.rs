use crate::error::SettingsError;
use crate::gpu::Extent;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const MIN_WIDTH: u32 = 100;
pub const MAX_WIDTH: u32 = 3840;
pub const MIN_HEIGHT: u32 = 100;
pub const MAX_HEIGHT: u32 = 2160;
pub const MIN_FPS: u32 = 1;
pub const MAX_FPS: u32 = 240;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WindowMode {
    #[default]
    Windowed,
    /// Popup window covering the output bounds; requested size is ignored.
    Borderless,
}

impl WindowMode {
    pub fn label(self) -> &'static str {
        match self {
            WindowMode::Windowed => "Windowed",
            WindowMode::Borderless => "Borderless fullscreen",
        }
    }
}

/// Validated settings a render session can start from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSettings {
    pub size: Extent,
    pub target_fps: u32,
    pub mode: WindowMode,
}

impl RenderSettings {
    pub fn frame_interval(&self) -> Duration {
        frame_interval(self.target_fps)
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            size: Extent::new(800, 600),
            target_fps: 60,
            mode: WindowMode::Windowed,
        }
    }
}

pub fn frame_interval(fps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / fps.max(1) as f64)
}

/// Pulls a live fps change into the range the settings dialog accepts.
pub fn clamp_fps(fps: u32) -> u32 {
    fps.clamp(MIN_FPS, MAX_FPS)
}

/// Pulls a live size change into the range the settings dialog accepts.
pub fn clamp_size(size: Extent) -> Extent {
    Extent::new(
        size.width.clamp(MIN_WIDTH, MAX_WIDTH),
        size.height.clamp(MIN_HEIGHT, MAX_HEIGHT),
    )
}

/// Raw text of the settings dialog fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsForm {
    pub width: String,
    pub height: String,
    pub fps: String,
    pub mode: WindowMode,
}

impl Default for SettingsForm {
    fn default() -> Self {
        Self::from_settings(&RenderSettings::default())
    }
}

impl SettingsForm {
    pub fn from_settings(settings: &RenderSettings) -> Self {
        Self {
            width: settings.size.width.to_string(),
            height: settings.size.height.to_string(),
            fps: settings.target_fps.to_string(),
            mode: settings.mode,
        }
    }

    pub fn validate(&self) -> Result<RenderSettings, SettingsError> {
        let width = parse_field(&self.width, "Width", MIN_WIDTH, MAX_WIDTH)?;
        let height = parse_field(&self.height, "Height", MIN_HEIGHT, MAX_HEIGHT)?;
        let target_fps = parse_field(&self.fps, "Target FPS", MIN_FPS, MAX_FPS)?;

        Ok(RenderSettings {
            size: Extent::new(width, height),
            target_fps,
            mode: self.mode,
        })
    }
}

fn parse_field(text: &str, field: &'static str, min: u32, max: u32) -> Result<u32, SettingsError> {
    let value: u32 = text
        .trim()
        .parse()
        .map_err(|_| SettingsError::NotANumber { field })?;

    if !(min..=max).contains(&value) {
        return Err(SettingsError::OutOfRange { field, value, min, max });
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(width: &str, height: &str, fps: &str) -> SettingsForm {
        SettingsForm {
            width: width.to_string(),
            height: height.to_string(),
            fps: fps.to_string(),
            mode: WindowMode::Windowed,
        }
    }

    #[test]
    fn accepts_valid_fields() {
        let settings = form("1920", " 1080 ", "144").validate().unwrap();
        assert_eq!(settings.size, Extent::new(1920, 1080));
        assert_eq!(settings.target_fps, 144);
        assert_eq!(settings.mode, WindowMode::Windowed);
    }

    #[test]
    fn rejects_malformed_numbers() {
        assert_eq!(
            form("80O", "600", "60").validate(),
            Err(SettingsError::NotANumber { field: "Width" })
        );
        assert_eq!(
            form("800", "", "60").validate(),
            Err(SettingsError::NotANumber { field: "Height" })
        );
        assert_eq!(
            form("800", "600", "-5").validate(),
            Err(SettingsError::NotANumber { field: "Target FPS" })
        );
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert_eq!(
            form("99", "600", "60").validate(),
            Err(SettingsError::OutOfRange { field: "Width", value: 99, min: MIN_WIDTH, max: MAX_WIDTH })
        );
        assert_eq!(
            form("800", "2161", "60").validate(),
            Err(SettingsError::OutOfRange { field: "Height", value: 2161, min: MIN_HEIGHT, max: MAX_HEIGHT })
        );
        assert_eq!(
            form("800", "600", "0").validate(),
            Err(SettingsError::OutOfRange { field: "Target FPS", value: 0, min: MIN_FPS, max: MAX_FPS })
        );
    }

    #[test]
    fn frame_interval_is_reciprocal_of_fps() {
        let settings = RenderSettings { target_fps: 60, ..Default::default() };
        let interval = settings.frame_interval().as_secs_f64();
        assert!((interval - 1.0 / 60.0).abs() < 1e-9);
        assert_eq!(frame_interval(1), Duration::from_secs(1));
    }

    #[test]
    fn live_changes_clamp_to_dialog_ranges() {
        assert_eq!(clamp_fps(0), MIN_FPS);
        assert_eq!(clamp_fps(500), MAX_FPS);
        assert_eq!(clamp_fps(75), 75);
        assert_eq!(clamp_size(Extent::new(50, 5000)), Extent::new(MIN_WIDTH, MAX_HEIGHT));
        assert_eq!(clamp_size(Extent::new(1280, 720)), Extent::new(1280, 720));
    }

    #[test]
    fn form_round_trips_defaults() {
        let form = SettingsForm::default();
        assert_eq!(form.width, "800");
        assert_eq!(form.height, "600");
        assert_eq!(form.fps, "60");
        assert_eq!(form.validate().unwrap(), RenderSettings::default());
    }
}
