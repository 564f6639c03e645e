//! XDG Base Directory support.

use std::path::PathBuf;

/// XDG directory paths for Satchel.
pub struct XdgDirs {
    /// Config directory (~/.config/satchel or XDG_CONFIG_HOME/satchel)
    pub config: PathBuf,
    /// Data directory (~/.local/share/satchel or XDG_DATA_HOME/satchel)
    pub data: PathBuf,
    /// Cache directory (~/.cache/satchel or XDG_CACHE_HOME/satchel)
    pub cache: PathBuf,
    /// State directory (~/.local/state/satchel or XDG_STATE_HOME/satchel)
    pub state: PathBuf,
}

impl XdgDirs {
    /// Get XDG directories, respecting environment variables.
    pub fn new() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));

        Self {
            config: std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| home.join(".config"))
                .join("satchel"),
            data: std::env::var("XDG_DATA_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| home.join(".local/share"))
                .join("satchel"),
            cache: std::env::var("XDG_CACHE_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| home.join(".cache"))
                .join("satchel"),
            state: std::env::var("XDG_STATE_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| home.join(".local/state"))
                .join("satchel"),
        }
    }

    /// Ensure all directories exist.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [&self.config, &self.data, &self.cache, &self.state] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Default settings file location.
    pub fn settings_file(&self) -> PathBuf {
        self.config.join("settings.json")
    }
}

impl Default for XdgDirs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    /// Helper to temporarily set environment variables for testing.
    /// Returns a guard that restores the original values on drop.
    struct EnvGuard {
        vars: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new(vars: &[(&str, &str)]) -> Self {
            let mut saved = Vec::new();
            for (key, value) in vars {
                saved.push((key.to_string(), env::var(key).ok()));
                env::set_var(key, value);
            }
            Self { vars: saved }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, original) in &self.vars {
                match original {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }

    #[test]
    fn test_xdg_dirs_end_with_satchel() {
        let dirs = XdgDirs::new();
        assert!(dirs.config.ends_with("satchel"));
        assert!(dirs.data.ends_with("satchel"));
        assert!(dirs.cache.ends_with("satchel"));
        assert!(dirs.state.ends_with("satchel"));
    }

    #[test]
    fn test_xdg_env_override() {
        let tmp = TempDir::new().unwrap();
        let _guard = EnvGuard::new(&[("XDG_CONFIG_HOME", tmp.path().to_str().unwrap())]);

        let dirs = XdgDirs::new();
        assert!(dirs.config.starts_with(tmp.path()));
        assert!(dirs.config.ends_with("satchel"));
    }

    #[test]
    fn test_ensure_dirs_creates_all() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path();
        let _guard = EnvGuard::new(&[
            ("XDG_CONFIG_HOME", base.join("cfg").to_str().unwrap()),
            ("XDG_DATA_HOME", base.join("data").to_str().unwrap()),
            ("XDG_CACHE_HOME", base.join("cache").to_str().unwrap()),
            ("XDG_STATE_HOME", base.join("state").to_str().unwrap()),
        ]);

        let dirs = XdgDirs::new();
        dirs.ensure_dirs().unwrap();

        assert!(dirs.config.is_dir());
        assert!(dirs.data.is_dir());
        assert!(dirs.cache.is_dir());
        assert!(dirs.state.is_dir());
    }

    #[test]
    fn test_settings_file_under_config() {
        let dirs = XdgDirs::new();
        let file = dirs.settings_file();
        assert!(file.starts_with(&dirs.config));
        assert_eq!(file.file_name().unwrap(), "settings.json");
    }
}
