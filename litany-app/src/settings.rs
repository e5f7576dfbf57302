//! Persistent host settings (JSON file in the user data directory).

use std::fs;
use std::path::{Path, PathBuf};

use litany_core::{MatchConfig, ScoringMode, StrategyKind};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TARGET_PHRASE: &str = "Je suis mort et ressuscité avec Christ";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct AppSettings {
    pub target_phrase: String,
    pub match_config: MatchConfig,
    /// Recorded recognizer events to replay (JSON lines).
    pub script_path: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            target_phrase: DEFAULT_TARGET_PHRASE.into(),
            match_config: MatchConfig::default(),
            script_path: None,
        }
    }
}

impl AppSettings {
    pub fn normalize(&mut self) {
        self.target_phrase = match self.target_phrase.trim() {
            "" => DEFAULT_TARGET_PHRASE.into(),
            phrase => phrase.to_string(),
        };
        self.match_config.normalize();
        self.script_path = self
            .script_path
            .take()
            .filter(|p| !p.as_os_str().is_empty());
    }

    /// Switch strategy, moving an untouched fuzzy ratio to the new preset.
    pub fn set_strategy(&mut self, strategy: StrategyKind) {
        let rolling = MatchConfig::default().max_fuzzy_ratio;
        let segmented = MatchConfig::segmented().max_fuzzy_ratio;
        let ratio = &mut self.match_config.max_fuzzy_ratio;
        match strategy {
            StrategyKind::Segmented if *ratio == rolling => *ratio = segmented,
            StrategyKind::Rolling if *ratio == segmented => *ratio = rolling,
            _ => {}
        }
        self.match_config.strategy = strategy;
    }

    /// `LITANY_*` variables win over the settings file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(phrase) = std::env::var("LITANY_TARGET_PHRASE") {
            self.target_phrase = phrase;
        }
        if let Ok(language) = std::env::var("LITANY_LANGUAGE") {
            self.match_config.language = language;
        }
        if let Some(strategy) = std::env::var("LITANY_STRATEGY")
            .ok()
            .and_then(|raw| parse_strategy(&raw))
        {
            self.set_strategy(strategy);
        }
    }
}

pub fn parse_strategy(raw: &str) -> Option<StrategyKind> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "rolling" | "continuous" => Some(StrategyKind::Rolling),
        "segmented" | "segment" | "silence" => Some(StrategyKind::Segmented),
        _ => None,
    }
}

pub fn parse_mode(raw: &str) -> Option<ScoringMode> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "exact" => Some(ScoringMode::Exact),
        "contains" => Some(ScoringMode::Contains),
        "fuzzy" => Some(ScoringMode::Fuzzy),
        _ => None,
    }
}

pub fn default_settings_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Litany")
            .join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".local")
                    .join("share")
            })
            .join("litany")
            .join("settings.json")
    }
}

/// Missing or unreadable files fall back to defaults.
pub fn load_settings(path: &Path) -> AppSettings {
    let mut settings = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<AppSettings>(&raw).ok())
        .unwrap_or_default();
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
    fs::write(path, json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_restores_empty_phrase_and_script() {
        let mut settings = AppSettings {
            target_phrase: "   ".into(),
            script_path: Some(PathBuf::new()),
            ..AppSettings::default()
        };
        settings.normalize();
        assert_eq!(settings.target_phrase, DEFAULT_TARGET_PHRASE);
        assert!(settings.script_path.is_none());
    }

    #[test]
    fn strategy_switch_follows_preset_ratio() {
        let mut settings = AppSettings::default();
        settings.set_strategy(StrategyKind::Segmented);
        assert_eq!(settings.match_config.max_fuzzy_ratio, 0.24);
        settings.set_strategy(StrategyKind::Rolling);
        assert_eq!(settings.match_config.max_fuzzy_ratio, 0.22);

        settings.match_config.max_fuzzy_ratio = 0.3;
        settings.set_strategy(StrategyKind::Segmented);
        assert_eq!(settings.match_config.max_fuzzy_ratio, 0.3);
    }

    #[test]
    fn parses_aliases() {
        assert_eq!(parse_strategy(" Segmented "), Some(StrategyKind::Segmented));
        assert_eq!(parse_strategy("continuous"), Some(StrategyKind::Rolling));
        assert_eq!(parse_strategy("nope"), None);
        assert_eq!(parse_mode("FUZZY"), Some(ScoringMode::Fuzzy));
        assert_eq!(parse_mode(""), None);
    }

    #[test]
    fn save_then_load_keeps_values() {
        let dir = std::env::temp_dir().join(format!("litany-settings-{}", std::process::id()));
        let path = dir.join("settings.json");
        let mut settings = AppSettings {
            target_phrase: "Amen".into(),
            ..AppSettings::default()
        };
        settings.set_strategy(StrategyKind::Segmented);
        save_settings(&path, &settings).expect("save settings");

        let loaded = load_settings(&path);
        assert_eq!(loaded.target_phrase, "Amen");
        assert_eq!(loaded.match_config.strategy, StrategyKind::Segmented);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn unreadable_file_falls_back_to_defaults() {
        let loaded = load_settings(Path::new("/nonexistent/litany/settings.json"));
        assert_eq!(loaded.target_phrase, DEFAULT_TARGET_PHRASE);
    }
}
