// ============================================================================
// APP SETTINGS — persisted key=value configuration
// ============================================================================

use std::path::PathBuf;

use crate::viewport::{MAX_BLINK_PERIOD_MS, MIN_BLINK_PERIOD_MS};

/// User-tunable settings, stored as a flat key=value file. Unknown keys and
/// corrupt values fall back to their defaults on load.
#[derive(Clone, Debug, PartialEq)]
pub struct AppSettings {
    /// Dark UI theme (the comparison viewport is always dark).
    pub dark_theme: bool,
    /// Blink mode flip interval in milliseconds (100–1000).
    pub blink_period_ms: u64,
    /// JPEG re-encode quality for the ELA engine (1–100).
    pub ela_quality: u8,
    /// Residual amplification factor for the ELA engine.
    pub ela_scale: u32,
    /// Gemini API key for the AI analyzer panel. Empty = feature disabled.
    pub gemini_api_key: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            dark_theme: true,
            blink_period_ms: 500,
            ela_quality: crate::ops::ela::DEFAULT_QUALITY,
            ela_scale: crate::ops::ela::DEFAULT_SCALE,
            gemini_api_key: String::new(),
        }
    }
}

impl AppSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/comparefe/comparefe_settings.cfg  (XDG respected)
    /// On Windows: %APPDATA%\CompareFE\comparefe_settings.cfg
    /// On macOS:   ~/Library/Application Support/CompareFE/comparefe_settings.cfg
    /// Fallback:   same directory as the executable.
    pub(crate) fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
                    PathBuf::from(home).join(".config")
                })
                .join("comparefe");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join("comparefe_settings.cfg"));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .unwrap_or_default();
            let config_dir = PathBuf::from(appdata).join("CompareFE");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join("comparefe_settings.cfg"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
            let config_dir = PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("CompareFE");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join("comparefe_settings.cfg"));
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|d| d.join("comparefe_settings.cfg")))
        }
    }

    /// Save settings to disk. Failures are silent — settings are a comfort,
    /// not a requirement.
    pub fn save(&self) {
        let Some(path) = Self::settings_path() else { return };
        let content = format!(
            "dark_theme={}\n\
             blink_period_ms={}\n\
             ela_quality={}\n\
             ela_scale={}\n\
             gemini_api_key={}\n",
            self.dark_theme,
            self.blink_period_ms,
            self.ela_quality,
            self.ela_scale,
            self.gemini_api_key,
        );
        let _ = std::fs::write(path, content);
    }

    /// Load settings from disk (default if the file is missing or corrupt).
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else { return Self::default() };
        let Ok(content) = std::fs::read_to_string(&path) else { return Self::default() };
        Self::parse(&content)
    }

    fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            match key {
                "dark_theme" => s.dark_theme = val == "true",
                "blink_period_ms" => {
                    s.blink_period_ms = val
                        .parse()
                        .unwrap_or(500u64)
                        .clamp(MIN_BLINK_PERIOD_MS, MAX_BLINK_PERIOD_MS);
                }
                "ela_quality" => {
                    s.ela_quality = val
                        .parse()
                        .unwrap_or(crate::ops::ela::DEFAULT_QUALITY)
                        .clamp(1, 100);
                }
                "ela_scale" => {
                    s.ela_scale = val.parse().unwrap_or(crate::ops::ela::DEFAULT_SCALE).max(1);
                }
                "gemini_api_key" => s.gemini_api_key = val.to_string(),
                _ => {}
            }
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_through_the_config_format() {
        let s = AppSettings {
            dark_theme: false,
            blink_period_ms: 250,
            ela_quality: 75,
            ela_scale: 20,
            gemini_api_key: "abc123".to_string(),
        };
        let content = format!(
            "dark_theme={}\nblink_period_ms={}\nela_quality={}\nela_scale={}\ngemini_api_key={}\n",
            s.dark_theme, s.blink_period_ms, s.ela_quality, s.ela_scale, s.gemini_api_key
        );
        assert_eq!(AppSettings::parse(&content), s);
    }

    #[test]
    fn corrupt_values_fall_back_to_defaults() {
        let parsed = AppSettings::parse("blink_period_ms=fast\nela_quality=200\njunk line\n");
        assert_eq!(parsed.blink_period_ms, 500);
        assert_eq!(parsed.ela_quality, 100); // 200 parses, then clamps
        assert_eq!(parsed.ela_scale, AppSettings::default().ela_scale);
    }

    #[test]
    fn out_of_range_blink_period_clamps() {
        let parsed = AppSettings::parse("blink_period_ms=5\n");
        assert_eq!(parsed.blink_period_ms, MIN_BLINK_PERIOD_MS);
    }
}
