use crate::overlay::settings::OverlaySettings;
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

pub const OVERLAY_SETTINGS_FILE_NAME: &str = "overlay_settings.json";

pub fn settings_path_from_exe_path(exe_path: &Path) -> Result<PathBuf> {
    let parent = exe_path
        .parent()
        .ok_or_else(|| anyhow!("executable path has no parent: {}", exe_path.display()))?;
    Ok(parent.join(OVERLAY_SETTINGS_FILE_NAME))
}

pub fn resolve_settings_path() -> Result<PathBuf> {
    let exe_path = std::env::current_exe().context("resolve current executable")?;
    settings_path_from_exe_path(&exe_path)
}

pub fn load() -> Result<OverlaySettings> {
    load_from_path(&resolve_settings_path()?)
}

/// Like [`load`], but falls back to defaults with a warning.
pub fn load_or_default() -> OverlaySettings {
    match load() {
        Ok(settings) => settings,
        Err(err) => {
            tracing::warn!(error = %err, "falling back to default overlay settings");
            OverlaySettings::default()
        }
    }
}

pub fn save(settings: &OverlaySettings) -> Result<PathBuf> {
    let path = resolve_settings_path()?;
    save_to_path(&path, settings)?;
    Ok(path)
}

pub fn load_from_path(settings_path: &Path) -> Result<OverlaySettings> {
    if !settings_path.exists() {
        return Ok(OverlaySettings::default());
    }

    let content = std::fs::read_to_string(settings_path)
        .with_context(|| format!("read overlay settings file {}", settings_path.display()))?;

    if content.trim().is_empty() {
        return Ok(OverlaySettings::default());
    }

    let mut loaded: OverlaySettings = serde_json::from_str(&content)
        .with_context(|| format!("deserialize overlay settings file {}", settings_path.display()))?;
    loaded.sanitize();
    Ok(loaded)
}

pub fn save_to_path(settings_path: &Path, settings: &OverlaySettings) -> Result<()> {
    if let Some(parent) = settings_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create overlay settings parent folder {}", parent.display()))?;
    }

    let mut sanitized = settings.clone();
    sanitized.sanitize();
    let json = serde_json::to_string_pretty(&sanitized).context("serialize overlay settings")?;
    std::fs::write(settings_path, json)
        .with_context(|| format!("write overlay settings file {}", settings_path.display()))
}

#[cfg(test)]
mod tests {
    use super::{load_from_path, save_to_path, settings_path_from_exe_path, OVERLAY_SETTINGS_FILE_NAME};
    use crate::overlay::settings::{OverlaySettings, Theme};
    use std::path::Path;

    #[test]
    fn settings_path_is_resolved_next_to_executable() {
        let exe = Path::new("/tmp/charts/bin/overlay_replay");
        let path = settings_path_from_exe_path(exe).expect("path");
        assert_eq!(path, Path::new("/tmp/charts/bin").join(OVERLAY_SETTINGS_FILE_NAME));
    }

    #[test]
    fn missing_or_blank_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(OVERLAY_SETTINGS_FILE_NAME);
        assert_eq!(load_from_path(&path).expect("missing"), OverlaySettings::default());

        std::fs::write(&path, "  \n").expect("write blank");
        assert_eq!(load_from_path(&path).expect("blank"), OverlaySettings::default());
    }

    #[test]
    fn store_roundtrip_serialization() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join(OVERLAY_SETTINGS_FILE_NAME);

        let settings = OverlaySettings {
            theme: Theme::Light,
            magnet_mode: true,
            snap_threshold_px: 12.0,
            ..OverlaySettings::default()
        };

        save_to_path(&path, &settings).expect("save settings");
        let loaded = load_from_path(&path).expect("load settings");
        assert_eq!(loaded, settings);
    }

    #[test]
    fn invalid_json_reports_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(OVERLAY_SETTINGS_FILE_NAME);
        std::fs::write(&path, "{ not json").expect("write");
        let err = load_from_path(&path).expect_err("invalid json");
        assert!(format!("{err:#}").contains(OVERLAY_SETTINGS_FILE_NAME));
    }

    #[test]
    fn loaded_values_are_sanitized() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(OVERLAY_SETTINGS_FILE_NAME);
        std::fs::write(&path, r#"{"line_hit_tolerance_px": -3}"#).expect("write");
        let loaded = load_from_path(&path).expect("load");
        assert_eq!(loaded.line_hit_tolerance_px, 8.0);
    }
}
