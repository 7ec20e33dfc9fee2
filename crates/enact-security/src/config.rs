//! Persistent verification-policy configuration
//!
//! The policy pair `(allowLocalUnsigned, minimumSignatures)` lives as JSON
//! at `<root>/security/config.json`. Loads always succeed: a missing file
//! yields (and persists) the defaults, an unparsable file degrades to the
//! defaults, and fields absent from the file merge with their defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

const SECURITY_DIR: &str = "security";
const CONFIG_FILE: &str = "config.json";

fn default_allow_local_unsigned() -> bool {
    true
}

fn default_minimum_signatures() -> u32 {
    1
}

/// The verification policy a trusted host enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityConfig {
    /// Accept documents that carry no signatures at all.
    #[serde(default = "default_allow_local_unsigned")]
    pub allow_local_unsigned: bool,
    /// How many valid signatures a signed document must carry.
    #[serde(default = "default_minimum_signatures")]
    pub minimum_signatures: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allow_local_unsigned: default_allow_local_unsigned(),
            minimum_signatures: default_minimum_signatures(),
        }
    }
}

/// Partial policy for shallow merges via [`ConfigStore::update`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityConfigUpdate {
    pub allow_local_unsigned: Option<bool>,
    pub minimum_signatures: Option<u32>,
}

/// File-backed policy store rooted at a host directory.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    root: PathBuf,
}

impl ConfigStore {
    /// Open a store rooted at an explicit directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Open the store at the default host root.
    #[must_use]
    pub fn open_default() -> Self {
        Self::new(crate::default_root())
    }

    /// Path of the config file this store reads and writes.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.root.join(SECURITY_DIR).join(CONFIG_FILE)
    }

    /// Ensure a config file exists, writing defaults if absent, and return
    /// the current policy.
    pub fn initialize(&self) -> SecurityConfig {
        if !self.path().exists() {
            let defaults = SecurityConfig::default();
            self.save(&defaults);
            return defaults;
        }
        self.load()
    }

    /// Load the policy, merged with defaults.
    ///
    /// A missing file persists and returns the defaults; an unreadable or
    /// unparsable file returns the defaults without overwriting it.
    pub fn load(&self) -> SecurityConfig {
        let path = self.path();
        if !path.exists() {
            let defaults = SecurityConfig::default();
            self.save(&defaults);
            return defaults;
        }
        match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|error| {
                tracing::warn!(path = %path.display(), %error, "unparsable security config, using defaults");
                SecurityConfig::default()
            }),
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "unreadable security config, using defaults");
                SecurityConfig::default()
            }
        }
    }

    /// Persist a policy. Returns whether the write succeeded; a failure is
    /// logged rather than raised.
    pub fn save(&self, config: &SecurityConfig) -> bool {
        let path = self.path();
        let written = ensure_dir(&self.root.join(SECURITY_DIR))
            .and_then(|()| serde_json::to_string_pretty(config).map_err(std::io::Error::other))
            .and_then(|text| write_world_readable(&path, text.as_bytes()));
        match written {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "failed to save security config");
                false
            }
        }
    }

    /// Shallow-merge a partial policy over the stored one and persist.
    pub fn update(&self, update: &SecurityConfigUpdate) -> SecurityConfig {
        let mut config = self.load();
        if let Some(allow) = update.allow_local_unsigned {
            config.allow_local_unsigned = allow;
        }
        if let Some(minimum) = update.minimum_signatures {
            config.minimum_signatures = minimum;
        }
        self.save(&config);
        config
    }

    /// Overwrite the stored policy with the defaults.
    pub fn reset(&self) -> SecurityConfig {
        let defaults = SecurityConfig::default();
        self.save(&defaults);
        defaults
    }

    /// Structural validation of an arbitrary JSON value: every present
    /// field must have the right type, with `minimumSignatures` a
    /// non-negative integer.
    #[must_use]
    pub fn validate(value: &Value) -> bool {
        let Some(map) = value.as_object() else {
            return false;
        };
        if let Some(allow) = map.get("allowLocalUnsigned") {
            if !allow.is_boolean() {
                return false;
            }
        }
        if let Some(minimum) = map.get("minimumSignatures") {
            if !minimum.is_u64() {
                return false;
            }
        }
        true
    }

    /// Adopt a policy from an external file, persisting it on success.
    #[must_use]
    pub fn import(&self, path: &Path) -> Option<SecurityConfig> {
        let raw = fs::read_to_string(path).ok()?;
        let value: Value = serde_json::from_str(&raw).ok()?;
        if !Self::validate(&value) {
            return None;
        }
        let config: SecurityConfig = serde_json::from_value(value).ok()?;
        self.save(&config).then_some(config)
    }

    /// Write the current policy to an external file. Returns whether the
    /// write succeeded.
    pub fn export(&self, path: &Path) -> bool {
        let config = self.load();
        let Ok(text) = serde_json::to_string_pretty(&config) else {
            return false;
        };
        match fs::write(path, text) {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "failed to export security config");
                false
            }
        }
    }
}

fn ensure_dir(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(dir, fs::Permissions::from_mode(0o755));
    }
    Ok(())
}

fn write_world_readable(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    fs::write(path, contents)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o644))?;
    }
    Ok(())
}
