use anyhow::Result;
use clap::ArgMatches;
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use quill_core::Settings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "./quill.toml";

/// Complete configuration that merges CLI args, env vars, config files, and defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct QuillConfig {
    /// Where pages come from and how the preview server runs
    pub run: RunConfig,
    /// Site settings (from quill-core)
    #[serde(flatten)]
    pub settings: Settings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunConfig {
    /// Directory of pre-rendered `.html` pages
    pub content: String,
    /// Static files served next to the pages
    pub assets: String,
    /// Configuration file path
    pub config: String,
    /// Host for the preview server
    pub host: String,
    /// Port for the preview server
    pub port: u16,
    /// Open browser automatically
    pub open: bool,
    /// Reload open pages when content changes
    pub live_reload: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            content: "./pages".to_string(),
            assets: "./public".to_string(),
            config: DEFAULT_CONFIG_FILE.to_string(),
            host: "127.0.0.1".to_string(),
            port: 3000,
            open: false,
            live_reload: true,
        }
    }
}

impl QuillConfig {
    /// Load configuration with cascading precedence:
    /// 1. CLI arguments (highest priority)
    /// 2. Environment variables (QUILL_*)
    /// 3. Configuration file
    /// 4. Defaults (lowest priority)
    pub fn load(args: &ArgMatches) -> Result<Self> {
        let config_file = args
            .try_get_one::<String>("config")
            .unwrap_or(None)
            .cloned()
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

        let mut builder = ConfigBuilder::builder();

        let defaults = Self::default();
        builder = builder.add_source(ConfigBuilder::try_from(&defaults)?);

        if Path::new(&config_file).exists() {
            tracing::debug!("reading settings from {}", config_file);
            builder = builder.add_source(File::new(&config_file, FileFormat::Toml));
        } else {
            tracing::debug!("{} not found, using defaults", config_file);
        }

        builder = builder.add_source(
            Environment::with_prefix("QUILL")
                .prefix_separator("_")
                .separator("__") // Use double underscore for nested keys
                .try_parsing(true),
        );

        // Only override with CLI args that are actually defined for this command
        builder = builder.set_override("run.config", config_file.clone())?;
        if let Some(content) = args.try_get_one::<String>("content").unwrap_or(None) {
            builder = builder.set_override("run.content", content.clone())?;
        }
        if let Some(assets) = args.try_get_one::<String>("assets").unwrap_or(None) {
            builder = builder.set_override("run.assets", assets.clone())?;
        }
        if let Some(host) = args.try_get_one::<String>("host").unwrap_or(None) {
            builder = builder.set_override("run.host", host.clone())?;
        }
        if let Some(port) = args.try_get_one::<u16>("port").unwrap_or(None) {
            builder = builder.set_override("run.port", i64::from(*port))?;
        }
        if args.try_get_one::<bool>("open").unwrap_or(None) == Some(&true) {
            builder = builder.set_override("run.open", true)?;
        }
        if args.try_get_one::<bool>("no-live-reload").unwrap_or(None) == Some(&true) {
            builder = builder.set_override("run.live_reload", false)?;
        }

        let config = builder.build()?;
        let quill_config: QuillConfig = config.try_deserialize()?;
        quill_config.settings.validate()?;

        Ok(quill_config)
    }

    pub fn content_dir(&self) -> PathBuf {
        PathBuf::from(&self.run.content)
    }

    pub fn assets_dir(&self) -> PathBuf {
        PathBuf::from(&self.run.assets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{Arg, Command};
    use quill_core::NavEntry;

    fn command() -> Command {
        Command::new("test")
            .arg(Arg::new("content").long("content").value_name("DIR"))
            .arg(Arg::new("config").long("config").value_name("FILE"))
            .arg(
                Arg::new("port")
                    .long("port")
                    .value_parser(clap::value_parser!(u16)),
            )
    }

    #[test]
    fn test_default_config() {
        let config = QuillConfig::default();
        assert_eq!(config.run.content, "./pages");
        assert_eq!(config.run.assets, "./public");
        assert_eq!(config.run.port, 3000);
        assert!(config.run.live_reload);
        assert_eq!(config.settings.sitename, "Quill");
    }

    #[test]
    fn test_cli_args_override() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("quill.toml");
        let matches = command()
            .try_get_matches_from(vec![
                "test",
                "--content",
                "/custom/pages",
                "--port",
                "8080",
                "--config",
                missing.to_str().unwrap(),
            ])
            .unwrap();

        let config = QuillConfig::load(&matches).unwrap();
        assert_eq!(config.run.content, "/custom/pages");
        assert_eq!(config.run.port, 8080);
        // Should still have defaults for non-overridden values
        assert_eq!(config.run.assets, "./public");
        assert_eq!(config.settings.default_page, "Main Page");
    }

    #[test]
    fn test_settings_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quill.toml");
        std::fs::write(
            &path,
            r#"
sitename = "Tea Wiki"
logo_position = "right"
nav_links = ["search", ["Home", "?page=Main Page"]]

[run]
content = "./wiki"
"#,
        )
        .unwrap();

        let matches = command()
            .try_get_matches_from(vec!["test", "--config", path.to_str().unwrap()])
            .unwrap();
        let config = QuillConfig::load(&matches).unwrap();

        assert_eq!(config.settings.sitename, "Tea Wiki");
        assert_eq!(config.settings.logo_position, "right");
        assert_eq!(
            config.settings.nav_links,
            vec![NavEntry::Search, NavEntry::link("Home", "?page=Main Page")]
        );
        assert_eq!(config.run.content, "./wiki");
        assert_eq!(config.settings.admin_details.name, "Administrator");
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quill.toml");
        std::fs::write(&path, "logo_position = \"center\"\n").unwrap();

        let matches = command()
            .try_get_matches_from(vec!["test", "--config", path.to_str().unwrap()])
            .unwrap();
        let err = QuillConfig::load(&matches).unwrap_err();
        assert!(err.to_string().contains("center"));
    }
}
