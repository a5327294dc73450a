use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, anyhow};
use tracing::{debug, info, warn};

use crate::filter::Filter;

pub const RC_ENV_VAR: &str = "TICKLISTRC";
const RC_FILE_NAME: &str = ".ticklistrc";
const DATA_DIR_NAME: &str = ".ticklist";

/// Settings read from the rc file and command-line overrides. Values are
/// parsed when they are set, so a bad value fails at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// `None` means `~/.ticklist`.
    pub data_location: Option<PathBuf>,
    pub default_command: String,
    pub default_filter: Filter,
    pub color: bool,
    pub save_debounce: Duration,
    pub confirmation: bool,

    pub source: Option<PathBuf>,
    pub unknown_keys: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_location: None,
            default_command: "list".to_string(),
            default_filter: Filter::All,
            color: true,
            save_debounce: Duration::from_millis(25),
            confirmation: true,
            source: None,
            unknown_keys: vec![],
        }
    }
}

impl Config {
    /// Defaults, then the first rc file found: `rc_override`, `$TICKLISTRC`
    /// (`/dev/null` disables), `~/.ticklistrc`.
    #[tracing::instrument(skip(rc_override))]
    pub fn load(rc_override: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = Config::default();
        match locate_rc(rc_override) {
            Some(path) => {
                info!(rc = %path.display(), "loading ticklistrc");
                cfg.read_rc(&path)?;
            }
            None => debug!("no ticklistrc; using defaults"),
        }
        Ok(cfg)
    }

    /// Applies one setting. A leading `rc.` on the key is ignored.
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let key = key.strip_prefix("rc.").unwrap_or(key);
        match key {
            "data.location" => self.data_location = Some(expand_home(value)),
            "default.command" => self.default_command = value.to_string(),
            "default.filter" => self.default_filter = Filter::parse_lenient(value),
            "color" => self.color = parse_switch(key, value)?,
            "confirmation" => self.confirmation = parse_switch(key, value)?,
            "save.debounce" => {
                let millis = value
                    .parse::<u64>()
                    .map_err(|_| anyhow!("save.debounce expects milliseconds, got: {value}"))?;
                self.save_debounce = Duration::from_millis(millis);
            }
            other => {
                warn!(key = %other, "unknown config key; ignored");
                self.unknown_keys.push(other.to_string());
            }
        }
        Ok(())
    }

    pub fn apply_overrides<I>(&mut self, overrides: I) -> anyhow::Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in overrides {
            debug!(key = %key, value = %value, "applying override");
            self.set(&key, &value)
                .with_context(|| format!("invalid override {key}={value}"))?;
        }
        Ok(())
    }

    /// Directory holding the saved todos, created if missing. `override_dir`
    /// (from `--data`) beats `data.location`.
    #[tracing::instrument(skip(self))]
    pub fn data_dir(&self, override_dir: Option<&Path>) -> anyhow::Result<PathBuf> {
        let dir = match override_dir.or(self.data_location.as_deref()) {
            Some(dir) => dir.to_path_buf(),
            None => dirs::home_dir()
                .map(|home| home.join(DATA_DIR_NAME))
                .ok_or_else(|| anyhow!("cannot determine home directory"))?,
        };

        if !dir.exists() {
            info!(dir = %dir.display(), "creating data directory");
            fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(dir)
    }

    fn read_rc(&mut self, path: &Path) -> anyhow::Result<()> {
        let text =
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            let (key, value) = split_assignment(line).ok_or_else(|| {
                anyhow!("{}:{}: expected key = value, got: {raw}", path.display(), idx + 1)
            })?;
            self.set(key, value)
                .with_context(|| format!("{}:{}", path.display(), idx + 1))?;
        }

        self.source = Some(path.to_path_buf());
        Ok(())
    }
}

/// Splits `key=value` around the first `=`, trimming both sides.
pub fn split_assignment(s: &str) -> Option<(&str, &str)> {
    let (key, value) = s.split_once('=')?;
    let key = key.trim();
    (!key.is_empty()).then(|| (key, value.trim()))
}

fn locate_rc(override_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = override_path {
        return Some(path.to_path_buf());
    }
    match std::env::var(RC_ENV_VAR) {
        Ok(path) if path == "/dev/null" => None,
        Ok(path) => Some(expand_home(&path)),
        Err(_) => dirs::home_dir()
            .map(|home| home.join(RC_FILE_NAME))
            .filter(|candidate| candidate.is_file()),
    }
}

fn expand_home(raw: &str) -> PathBuf {
    match (raw.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(raw),
    }
}

fn parse_switch(key: &str, value: &str) -> anyhow::Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "yes" | "true" | "1" => Ok(true),
        "off" | "no" | "false" | "0" => Ok(false),
        _ => Err(anyhow!("{key} expects on/off, got: {value}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rc_with(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let temp = tempfile::tempdir().expect("tempdir");
        let rc = temp.path().join("ticklistrc");
        fs::write(&rc, contents).expect("write rc");
        (temp, rc)
    }

    #[test]
    fn typed_settings_are_parsed_at_load() {
        let (_temp, rc) = rc_with(
            "# settings\ndefault.filter = done  # trailing\nsave.debounce=0\nconfirmation = off\n",
        );

        let cfg = Config::load(Some(&rc)).expect("load");
        assert_eq!(cfg.default_filter, Filter::Done);
        assert_eq!(cfg.save_debounce, Duration::ZERO);
        assert!(!cfg.confirmation);
        assert!(cfg.color);
        assert_eq!(cfg.source.as_deref(), Some(rc.as_path()));
        assert!(cfg.unknown_keys.is_empty());
    }

    #[test]
    fn malformed_line_reports_location() {
        let (_temp, rc) = rc_with("color = on\nnope\n");
        let err = Config::load(Some(&rc)).expect_err("should fail");
        assert!(err.to_string().contains(":2:"));
    }

    #[test]
    fn bad_value_fails_at_load() {
        let (_temp, rc) = rc_with("color = purple\n");
        let err = Config::load(Some(&rc)).expect_err("should fail");
        assert!(format!("{err:#}").contains("color expects on/off"));
    }

    #[test]
    fn unknown_keys_are_collected() {
        let (_temp, rc) = rc_with("colour = on\ninclude = other.rc\n");
        let cfg = Config::load(Some(&rc)).expect("load");
        assert_eq!(cfg.unknown_keys, vec!["colour".to_string(), "include".to_string()]);
    }

    #[test]
    fn overrides_strip_rc_prefix() {
        let mut cfg = Config::default();
        cfg.apply_overrides([("rc.default.filter".to_string(), "active".to_string())])
            .expect("override");
        assert_eq!(cfg.default_filter, Filter::Active);

        assert!(
            cfg.apply_overrides([("save.debounce".to_string(), "soon".to_string())])
                .is_err()
        );
    }

    #[test]
    fn data_dir_prefers_command_line_and_creates_it() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut cfg = Config::default();
        cfg.set("data.location", &temp.path().join("cfg").display().to_string())
            .expect("set");

        let flag = temp.path().join("flag");
        assert_eq!(cfg.data_dir(Some(&flag)).expect("dir"), flag);
        assert!(flag.is_dir());
        assert_eq!(cfg.data_dir(None).expect("dir"), temp.path().join("cfg"));
    }

    #[test]
    fn split_assignment_requires_a_key() {
        assert_eq!(split_assignment(" a.b = c "), Some(("a.b", "c")));
        assert_eq!(split_assignment("=c"), None);
        assert_eq!(split_assignment("novalue"), None);
    }
}
