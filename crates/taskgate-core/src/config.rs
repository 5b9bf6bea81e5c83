use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, anyhow};
use tracing::{debug, info, trace};

use crate::notice::DEFAULT_NOTICE_WINDOW;

/// Settings from `~/.taskgaterc`: `key = value` lines, `#` starts a comment.
#[derive(Debug, Clone)]
pub struct Config {
    map: HashMap<String, String>,
    pub loaded_files: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let mut map = HashMap::new();
        map.insert("data.location".to_string(), "~/.taskgate".to_string());
        map.insert("default.command".to_string(), "dashboard".to_string());
        map.insert("color".to_string(), "on".to_string());
        map.insert(
            "notice.seconds".to_string(),
            DEFAULT_NOTICE_WINDOW.as_secs().to_string(),
        );
        Self {
            map,
            loaded_files: vec![],
        }
    }
}

impl Config {
    #[tracing::instrument(skip(rc_override))]
    pub fn load(rc_override: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = Config::default();

        match resolve_rc_path(rc_override)? {
            Some(path) => {
                info!(rc = %path.display(), "loading rc file");
                cfg.load_file(&path)?;
            }
            None => debug!("no rc file found; using defaults"),
        }

        Ok(cfg)
    }

    /// Applies `key=value` pairs on top of the file settings. An `rc.` prefix
    /// on the key is ignored.
    #[tracing::instrument(skip(self, overrides))]
    pub fn apply_overrides<I>(&mut self, overrides: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (k, v) in overrides {
            let key = k.strip_prefix("rc.").unwrap_or(&k).to_string();
            debug!(key = %key, value = %v, "applying override");
            self.map.insert(key, v);
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.map.get(key).map(|v| parse_bool(v))
    }

    pub fn notice_window(&self) -> anyhow::Result<Duration> {
        match self.map.get("notice.seconds") {
            None => Ok(DEFAULT_NOTICE_WINDOW),
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .with_context(|| format!("invalid notice.seconds: {raw}")),
        }
    }

    #[tracing::instrument(skip(self))]
    fn load_file(&mut self, path: &Path) -> anyhow::Result<()> {
        let path = expand_tilde(path);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        self.loaded_files.push(path.clone());

        for (line_num, raw_line) in text.lines().enumerate() {
            let line = match raw_line.split_once('#') {
                Some((before, _)) => before.trim(),
                None => raw_line.trim(),
            };
            if line.is_empty() {
                continue;
            }

            let (k, v) = line.split_once('=').ok_or_else(|| {
                anyhow!(
                    "invalid config line {}:{}: {}",
                    path.display(),
                    line_num + 1,
                    raw_line
                )
            })?;

            let key = k.trim().to_string();
            let value = v.trim().to_string();
            trace!(key = %key, value = %value, "loaded config key");
            self.map.insert(key, value);
        }

        Ok(())
    }
}

#[tracing::instrument(skip(cfg, override_dir))]
pub fn resolve_data_dir(cfg: &Config, override_dir: Option<&Path>) -> anyhow::Result<PathBuf> {
    let dir = if let Some(path) = override_dir {
        path.to_path_buf()
    } else if let Some(cfg_value) = cfg.get("data.location") {
        expand_tilde(Path::new(&cfg_value))
    } else {
        home_dir()?.join(".taskgate")
    };

    if !dir.exists() {
        info!(dir = %dir.display(), "creating data directory");
        fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }

    Ok(dir)
}

fn resolve_rc_path(override_path: Option<&Path>) -> anyhow::Result<Option<PathBuf>> {
    if let Some(path) = override_path {
        return Ok(Some(path.to_path_buf()));
    }

    if let Ok(rc_env) = std::env::var("TASKGATERC") {
        if rc_env == "/dev/null" {
            return Ok(None);
        }
        return Ok(Some(PathBuf::from(rc_env)));
    }

    let candidate = home_dir()?.join(".taskgaterc");
    if candidate.exists() {
        return Ok(Some(candidate));
    }

    Ok(None)
}

fn home_dir() -> anyhow::Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| anyhow!("cannot determine home directory"))
}

fn expand_tilde(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    if let Some(rest) = text.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "1" | "y" | "yes" | "on" | "true"
    )
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::Duration;

    use tempfile::tempdir;

    use super::{Config, resolve_data_dir};

    #[test]
    fn file_values_and_overrides_layer_on_defaults() {
        let temp = tempdir().expect("tempdir");
        let rc = temp.path().join("taskgaterc");
        fs::write(
            &rc,
            "# comment\ncolor = off\nnotice.seconds = 5 # trailing\n\n",
        )
        .unwrap();

        let mut cfg = Config::load(Some(&rc)).expect("load config");
        assert_eq!(cfg.get_bool("color"), Some(false));
        assert_eq!(cfg.notice_window().unwrap(), Duration::from_secs(5));
        assert_eq!(cfg.get("default.command").as_deref(), Some("dashboard"));
        assert_eq!(cfg.loaded_files, vec![rc.clone()]);

        cfg.apply_overrides([("rc.color".to_string(), "on".to_string())]);
        assert_eq!(cfg.get_bool("color"), Some(true));
    }

    #[test]
    fn malformed_line_is_an_error() {
        let temp = tempdir().expect("tempdir");
        let rc = temp.path().join("taskgaterc");
        fs::write(&rc, "color\n").expect("write rc");
        assert!(Config::load(Some(&rc)).is_err());
    }

    #[test]
    fn data_dir_override_is_created() {
        let temp = tempdir().expect("tempdir");
        let dir = temp.path().join("nested").join("data");
        let resolved = resolve_data_dir(&Config::default(), Some(&dir)).expect("resolve data dir");
        assert_eq!(resolved, dir);
        assert!(dir.is_dir());
    }

    #[test]
    fn bad_notice_window_is_reported() {
        let mut cfg = Config::default();
        cfg.apply_overrides([("notice.seconds".to_string(), "soon".to_string())]);
        assert!(cfg.notice_window().is_err());
    }
}
