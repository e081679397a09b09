//! Configuration loading and validation

mod schema;

pub use schema::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Example configuration written by `airkeys init`
pub const EXAMPLE_CONFIG: &str = include_str!("../../airkeys.example.yaml");

/// Load configuration from a YAML file
pub fn load_config(path: &Path) -> Result<KeyboardConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let config: KeyboardConfig = serde_yaml::from_str(&contents)
        .with_context(|| format!("failed to parse config file {:?}", path))?;
    config.validate()?;
    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to defaults
pub fn load_or_default(path: &Path) -> Result<KeyboardConfig> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(KeyboardConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::ScaleName;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_minimal_config() {
        let yaml = r#"
audio:
  sample_rate: 48000

voice:
  release_ms: 600
"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.audio.sample_rate, 48000);
        assert_eq!(config.voice.release_ms, 600.0);
        assert_eq!(config.voice.attack_ms, 100.0);
    }

    #[test]
    fn test_example_config_is_valid() {
        let config: KeyboardConfig = serde_yaml::from_str(EXAMPLE_CONFIG).unwrap();
        config.validate().unwrap();
        assert_eq!(config.controller.scale, ScaleName::BMajor);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"voice:\n  level: 3.0\n").unwrap();
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_or_default(&dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config.audio.sample_rate, 44100);
        assert!(load_config(&dir.path().join("absent.yaml")).is_err());
    }
}
