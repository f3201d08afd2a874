//! Configuration Vault – reads/writes `~/.voxbot/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use voxbot_transport::TransportConfig;

/// Persisted user configuration stored in `~/.voxbot/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Remote execution service (`ws://`/`wss://` for WebSocket, otherwise HTTP).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Bound on one remote call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// HTTP attempts per call.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Pause between HTTP attempts, in seconds.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Base URL of the OpenAI-compatible model server.
    #[serde(default = "default_llm_url")]
    pub llm_url: String,

    /// Model name (e.g. "llama3", "gpt-4o").
    #[serde(default = "default_model")]
    pub model: String,

    /// API key for hosted model servers (stored as plain text – the file is
    /// written owner-only).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key: String,

    /// Conversation turns kept as context.
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("endpoint", &self.endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .field("retry_attempts", &self.retry_attempts)
            .field("retry_delay_secs", &self.retry_delay_secs)
            .field("llm_url", &self.llm_url)
            .field("model", &self.model)
            .field(
                "api_key",
                if self.api_key.is_empty() { &"<not set>" } else { &"<redacted>" },
            )
            .field("max_turns", &self.max_turns)
            .finish()
    }
}

fn default_endpoint() -> String {
    voxbot_transport::config::DEFAULT_ENDPOINT.to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_delay_secs() -> u64 {
    2
}
fn default_llm_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_model() -> String {
    "llama3".to_string()
}
fn default_max_turns() -> usize {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            retry_attempts: default_retry_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
            llm_url: default_llm_url(),
            model: default_model(),
            api_key: String::new(),
            max_turns: default_max_turns(),
        }
    }
}

impl Config {
    /// Transport settings derived from this config.  Duplex tuning keeps its
    /// defaults.
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig::new(self.endpoint.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_retries(
                self.retry_attempts.max(1),
                Duration::from_secs(self.retry_delay_secs),
            )
    }
}

/// Return the path to `~/.voxbot/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".voxbot").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config = toml::from_str(&raw)
        .map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `VOXBOT_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `VOXBOT_ENDPOINT` | `endpoint` |
/// | `VOXBOT_TIMEOUT` | `timeout_secs` |
/// | `VOXBOT_LLM_URL` | `llm_url` |
/// | `VOXBOT_MODEL` | `model` |
/// | `VOXBOT_API_KEY` | `api_key` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("VOXBOT_ENDPOINT") {
        cfg.endpoint = v;
    }
    if let Ok(v) = std::env::var("VOXBOT_TIMEOUT")
        && let Ok(secs) = v.parse::<u64>()
    {
        cfg.timeout_secs = secs;
    }
    if let Ok(v) = std::env::var("VOXBOT_LLM_URL") {
        cfg.llm_url = v;
    }
    if let Ok(v) = std::env::var("VOXBOT_MODEL") {
        cfg.model = v;
    }
    if let Ok(v) = std::env::var("VOXBOT_API_KEY") {
        cfg.api_key = v;
    }
}

/// Save the config to disk, creating `~/.voxbot/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Env-var tests mutate process state; run them one at a time.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn config_debug_redacts_api_key() {
        let cfg = Config {
            api_key: "sk-super-secret".to_string(),
            ..Config::default()
        };
        let debug_str = format!("{:?}", cfg);
        assert!(!debug_str.contains("sk-super-secret"));
        assert!(debug_str.contains("<redacted>"));
        assert!(format!("{:?}", Config::default()).contains("<not set>"));
    }

    #[cfg(unix)]
    #[test]
    fn config_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&Config::default(), &path).expect("save");

        let file_mode = std::fs::metadata(&path).expect("file metadata").permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        let dir_mode = std::fs::metadata(path.parent().unwrap())
            .expect("dir metadata")
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(dir_mode, 0o700);
    }

    #[test]
    fn roundtrip_default_config() {
        let _env = ENV_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&Config::default(), &path).expect("save");
        let loaded = load_from(&path).expect("load ok").expect("some");

        assert_eq!(loaded.endpoint, "ws://localhost:8765");
        assert_eq!(loaded.timeout_secs, 30);
        assert_eq!(loaded.model, "llama3");
        assert!(loaded.api_key.is_empty());
    }

    #[test]
    fn missing_fields_take_defaults() {
        let _env = ENV_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "endpoint = \"http://svc:8000/actions\"\n").unwrap();

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.endpoint, "http://svc:8000/actions");
        assert_eq!(loaded.retry_attempts, 3);
        assert_eq!(loaded.max_turns, 10);
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn config_path_points_to_voxbot_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".voxbot"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn transport_config_carries_timing() {
        let cfg = Config {
            timeout_secs: 5,
            retry_attempts: 0,
            retry_delay_secs: 1,
            ..Config::default()
        };
        let t = cfg.transport_config();
        assert_eq!(t.endpoint, "ws://localhost:8765");
        assert_eq!(t.timeout, Duration::from_secs(5));
        assert_eq!(t.retry_attempts, 1);
        assert_eq!(t.retry_delay, Duration::from_secs(1));
    }

    #[test]
    fn apply_env_overrides_changes_endpoint_and_model() {
        let _env = ENV_LOCK.lock().unwrap();
        // SAFETY: serialised by ENV_LOCK.
        unsafe {
            std::env::set_var("VOXBOT_ENDPOINT", "wss://svc.example/actions");
            std::env::set_var("VOXBOT_MODEL", "gpt-4o");
        }
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.endpoint, "wss://svc.example/actions");
        assert_eq!(cfg.model, "gpt-4o");
        unsafe {
            std::env::remove_var("VOXBOT_ENDPOINT");
            std::env::remove_var("VOXBOT_MODEL");
        }
    }

    #[test]
    fn apply_env_overrides_ignores_invalid_timeout() {
        let _env = ENV_LOCK.lock().unwrap();
        // SAFETY: serialised by ENV_LOCK.
        unsafe { std::env::set_var("VOXBOT_TIMEOUT", "soon") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.timeout_secs, 30);

        unsafe { std::env::set_var("VOXBOT_TIMEOUT", "12") };
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.timeout_secs, 12);
        unsafe { std::env::remove_var("VOXBOT_TIMEOUT") };
    }
}
