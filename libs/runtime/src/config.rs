use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::paths::home_dir::resolve_home_dir;

/// Directory created under the platform home when `client.home_dir` is unset.
pub const DEFAULT_HOME_SUBDIR: &str = ".rankflow";

/// Environment overlay prefix: `APP__CLIENT__HOME_DIR=/x` sets `client.home_dir`.
pub const ENV_PREFIX: &str = "APP__";

/// Top-level client configuration: typed global sections plus a per-module bag.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub client: ClientConfig,
    /// `None` until a file or the environment provides it.
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
    /// Extra `<module>.yaml` files merged into `modules`.
    #[serde(default)]
    pub modules_dir: Option<String>,
    #[serde(default)]
    pub modules: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Holds the session record and logs. Absolute after `AppConfig::load`.
    #[serde(default)]
    pub home_dir: String,
}

/// Target name → settings. The "default" key is the catch-all.
pub type LoggingConfig = HashMap<String, Section>;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Section {
    pub console_level: String,
    /// Log file path, relative to the home dir. Empty disables the file layer.
    #[serde(default)]
    pub file: String,
    /// Empty means "same as console_level".
    #[serde(default)]
    pub file_level: String,
    #[serde(default)]
    pub max_backups: Option<usize>,
    #[serde(default)]
    pub max_size_mb: Option<u64>,
}

/// Quiet console, debug-level JSON file under `<home>/logs`.
pub fn default_logging_config() -> LoggingConfig {
    LoggingConfig::from([(
        "default".to_string(),
        Section {
            console_level: "warn".into(),
            file: "logs/rankflow.log".into(),
            file_level: "debug".into(),
            max_backups: Some(3),
            max_size_mb: Some(20),
        },
    )])
}

/// Command line arguments relevant to configuration.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config: Option<String>,
    pub print_config: bool,
    pub verbose: u8,
}

impl AppConfig {
    /// Defaults, then the YAML file (if given), then `APP__` environment variables.
    ///
    /// A given path must exist. The home dir is resolved and created, and
    /// `modules_dir` files are folded into the module bag.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));
        if let Some(path) = config_path {
            if !path.is_file() {
                bail!("Configuration file not found: {}", path.display());
            }
            figment = figment.merge(Yaml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let mut config: AppConfig = figment
            .extract()
            .context("Failed to assemble configuration")?;
        config.resolve_home_dir()?;
        if let Some(dir) = config.modules_dir.clone() {
            merge_module_files(&mut config.modules, Path::new(&dir))?;
        }
        Ok(config)
    }

    fn resolve_home_dir(&mut self) -> Result<()> {
        let configured = Some(self.client.home_dir.trim())
            .filter(|raw| !raw.is_empty())
            .map(str::to_string);
        let resolved = resolve_home_dir(configured, DEFAULT_HOME_SUBDIR, true)
            .context("Failed to resolve client.home_dir")?;
        self.client.home_dir = resolved.to_string_lossy().into_owned();
        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config to YAML")
    }

    /// Typed view of `modules.<name>`; a missing entry yields the module's defaults.
    pub fn module_config<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T> {
        self.modules
            .get(name)
            .map(|raw| {
                serde_json::from_value(raw.clone())
                    .with_context(|| format!("Invalid configuration for module '{name}'"))
            })
            .unwrap_or_else(|| Ok(T::default()))
    }

    pub fn home_dir(&self) -> PathBuf {
        PathBuf::from(&self.client.home_dir)
    }

    /// Logging sections to install, falling back to the built-in defaults.
    pub fn logging_or_default(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_else(default_logging_config)
    }

    /// `-v` raises the default console level to info, `-vv` debug, `-vvv` trace.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        let level = match args.verbose {
            0 => return,
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        let logging = self.logging.get_or_insert_with(default_logging_config);
        if let Some(section) = logging.get_mut("default") {
            section.console_level = level.to_string();
        }
    }
}

fn merge_module_files(bag: &mut HashMap<String, serde_json::Value>, dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list modules_dir {}", dir.display()))?;

    for path in entries.filter_map(|e| e.ok()).map(|e| e.path()) {
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if !is_yaml || !path.is_file() {
            continue;
        }

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read module config {}", path.display()))?;
        let value: serde_yaml::Value = serde_yaml::from_str(&raw)
            .with_context(|| format!("Invalid YAML in {}", path.display()))?;
        bag.insert(name.to_string(), serde_json::to_value(value)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct ProbeConfig {
        #[serde(default)]
        backend_url: String,
        #[serde(default)]
        retries: u32,
    }

    fn yaml_path(p: &Path) -> String {
        // Windows paths need forward slashes inside YAML
        p.to_string_lossy().replace('\\', "/")
    }

    #[test]
    fn test_file_sections_are_parsed() {
        let tmp = tempdir().unwrap();
        let home = tmp.path().join("home");
        let cfg_path = tmp.path().join("cfg.yaml");
        fs::write(
            &cfg_path,
            format!(
                r#"
client:
  home_dir: "{}"

logging:
  default:
    console_level: debug
    file: "logs/default.log"

modules:
  identity_session:
    backend_url: "http://backend.local"
    retries: 2
"#,
                yaml_path(&home)
            ),
        )
        .unwrap();

        let config = AppConfig::load(Some(cfg_path.as_path())).unwrap();

        assert!(config.home_dir().is_absolute());
        assert!(home.is_dir(), "home_dir must be created on load");
        let def = &config.logging.as_ref().unwrap()["default"];
        assert_eq!(def.console_level, "debug");
        assert_eq!(def.file, "logs/default.log");
        let probe: ProbeConfig = config.module_config("identity_session").unwrap();
        assert_eq!(
            probe,
            ProbeConfig {
                backend_url: "http://backend.local".into(),
                retries: 2
            }
        );
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let tmp = tempdir().unwrap();
        let err = AppConfig::load(Some(tmp.path().join("absent.yaml").as_path())).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_minimal_file_leaves_optional_sections_empty() {
        let tmp = tempdir().unwrap();
        let cfg_path = tmp.path().join("cfg.yaml");
        fs::write(
            &cfg_path,
            format!("client:\n  home_dir: \"{}\"\n", yaml_path(tmp.path())),
        )
        .unwrap();

        let config = AppConfig::load(Some(cfg_path.as_path())).unwrap();

        assert!(config.logging.is_none());
        assert_eq!(config.logging_or_default()["default"].console_level, "warn");
        let probe: ProbeConfig = config.module_config("identity_session").unwrap();
        assert_eq!(probe, ProbeConfig::default());
    }

    #[test]
    fn test_modules_dir_is_merged() {
        let tmp = tempdir().unwrap();
        let modules_dir = tmp.path().join("modules");
        fs::create_dir_all(&modules_dir).unwrap();
        fs::write(
            modules_dir.join("identity_session.yaml"),
            "backend_url: \"http://from-dir\"\nretries: 5\n",
        )
        .unwrap();
        fs::write(modules_dir.join("notes.txt"), "ignored").unwrap();

        let cfg_path = tmp.path().join("cfg.yaml");
        fs::write(
            &cfg_path,
            format!(
                "client:\n  home_dir: \"{}\"\nmodules_dir: \"{}\"\n",
                yaml_path(tmp.path()),
                yaml_path(&modules_dir)
            ),
        )
        .unwrap();

        let config = AppConfig::load(Some(cfg_path.as_path())).unwrap();

        assert_eq!(config.modules.len(), 1);
        let probe: ProbeConfig = config.module_config("identity_session").unwrap();
        assert_eq!(probe.backend_url, "http://from-dir");
        assert_eq!(probe.retries, 5);
    }

    #[test]
    fn test_invalid_module_config_names_the_module() {
        let mut config = AppConfig::default();
        config.modules.insert(
            "identity_session".into(),
            serde_json::json!({ "retries": "many" }),
        );

        let err = config
            .module_config::<ProbeConfig>("identity_session")
            .unwrap_err();
        assert!(err.to_string().contains("identity_session"));
    }

    #[test]
    fn test_cli_verbose_levels_matrix() {
        for (verbose, expected) in [(0, "warn"), (1, "info"), (2, "debug"), (3, "trace")] {
            let mut config = AppConfig {
                logging: Some(default_logging_config()),
                ..AppConfig::default()
            };
            config.apply_cli_overrides(&CliArgs {
                verbose,
                ..CliArgs::default()
            });

            assert_eq!(config.logging_or_default()["default"].console_level, expected);
        }
    }

    #[test]
    fn test_yaml_output_parses_back() {
        let config = AppConfig {
            logging: Some(default_logging_config()),
            ..AppConfig::default()
        };
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("client:"));
        assert!(yaml.contains("logging:"));

        let parsed: AppConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.logging_or_default()["default"].file, "logs/rankflow.log");
    }

    #[test]
    fn test_unknown_top_level_field_is_rejected() {
        let invalid_yaml = r#"
client:
  home_dir: "/tmp/x"
server:
  port: 8087
"#;
        let result: Result<AppConfig, _> = serde_yaml::from_str(invalid_yaml);
        assert!(result.is_err());
    }
}
