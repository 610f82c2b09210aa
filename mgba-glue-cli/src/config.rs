//! Run configuration from an optional TOML file.
//!
//! CLI flags always override config file values.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use mgba_glue::AdapterConfig;
use serde::Deserialize;
use tracing::debug;

/// Top-level config file structure.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Core module (`.wasm` or `.wat`).
    pub core: Option<PathBuf>,
    /// ROM URL (`http(s)://` or `file://`).
    pub rom: Option<String>,
    /// Filename under `/roms`; the adapter default when unset.
    pub rom_name: Option<String>,
    /// Frames to run after loading.
    pub frames: u32,
    /// JSON-lines sensor log replayed while running.
    pub sensor_log: Option<PathBuf>,
    /// Where to write the core's serialized state after the run.
    pub save_state: Option<PathBuf>,
    pub adapter: AdapterConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            core: None,
            rom: None,
            rom_name: None,
            frames: default_frames(),
            sensor_log: None,
            save_state: None,
            adapter: AdapterConfig::default(),
        }
    }
}

fn default_frames() -> u32 {
    60
}

/// Values given on the command line.
#[derive(Debug, Default)]
pub struct Overrides {
    pub core: Option<PathBuf>,
    pub rom: Option<String>,
    pub rom_name: Option<String>,
    pub fs_root: Option<PathBuf>,
    pub frames: Option<u32>,
    pub sensor_log: Option<PathBuf>,
    pub save_state: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config at {}", path.display()))?;

        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn apply(&mut self, overrides: Overrides) {
        let Overrides {
            core,
            rom,
            rom_name,
            fs_root,
            frames,
            sensor_log,
            save_state,
        } = overrides;

        self.core = core.or(self.core.take());
        self.rom = rom.or(self.rom.take());
        self.rom_name = rom_name.or(self.rom_name.take());
        self.adapter.fs_root = fs_root.or(self.adapter.fs_root.take());
        self.frames = frames.unwrap_or(self.frames);
        self.sensor_log = sensor_log.or(self.sensor_log.take());
        self.save_state = save_state.or(self.save_state.take());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mgba_glue::UnknownImports;

    #[test]
    fn default_config_values() {
        let cfg = Config::default();
        assert_eq!(cfg.frames, 60);
        assert!(cfg.core.is_none());
        assert!(cfg.rom.is_none());
        assert_eq!(cfg.adapter.default_rom_name, "rom.gba");
        assert_eq!(cfg.adapter.unknown_imports, UnknownImports::Trap);
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
core = "cores/mgba_libretro.wasm"
rom = "https://roms.example/advance.gba"
rom_name = "advance.gba"
frames = 600
save_state = "out/advance.state"

[adapter]
fs_root = "/tmp/mgba-fs"
unknown_imports = "reject"
inherit_stdio = true
"#;
        let cfg: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.core, Some(PathBuf::from("cores/mgba_libretro.wasm")));
        assert_eq!(cfg.rom.as_deref(), Some("https://roms.example/advance.gba"));
        assert_eq!(cfg.rom_name.as_deref(), Some("advance.gba"));
        assert_eq!(cfg.frames, 600);
        assert_eq!(cfg.save_state, Some(PathBuf::from("out/advance.state")));
        assert_eq!(cfg.adapter.fs_root, Some(PathBuf::from("/tmp/mgba-fs")));
        assert_eq!(cfg.adapter.unknown_imports, UnknownImports::Reject);
        assert!(cfg.adapter.inherit_stdio);
    }

    #[test]
    fn parse_partial_toml_config() {
        let cfg: Config = toml::from_str("core = \"core.wat\"\n").unwrap();
        assert_eq!(cfg.core, Some(PathBuf::from("core.wat")));
        assert_eq!(cfg.frames, 60); // default
        assert_eq!(cfg.adapter.default_rom_name, "rom.gba"); // default
    }

    #[test]
    fn flags_override_file_values() {
        let mut cfg: Config = toml::from_str(
            r#"
core = "from-file.wasm"
rom = "https://file/rom.gba"
frames = 10

[adapter]
fs_root = "/file/root"
"#,
        )
        .unwrap();

        cfg.apply(Overrides {
            core: Some("from-flag.wasm".into()),
            frames: Some(3),
            fs_root: Some("/flag/root".into()),
            ..Overrides::default()
        });

        assert_eq!(cfg.core, Some(PathBuf::from("from-flag.wasm")));
        assert_eq!(cfg.rom.as_deref(), Some("https://file/rom.gba"));
        assert_eq!(cfg.frames, 3);
        assert_eq!(cfg.adapter.fs_root, Some(PathBuf::from("/flag/root")));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read config"));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mgba.toml");
        std::fs::write(&path, "frames = 5\n").unwrap();
        assert_eq!(Config::load(&path).unwrap().frames, 5);
    }
}
