use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Recognised embed type names. Compared case-insensitively.
    pub embed_types: Vec<String>,
    pub view_modes: Vec<String>,
    /// Bundles whose entities may host embeds.
    pub content_types: Vec<String>,
    /// Field names that may host embeds.
    pub fields: Vec<String>,
    /// Field storage types that may host embeds.
    pub field_types: Vec<String>,
    /// Upper bound on conversions in one field value.
    pub max_conversions: usize,
    /// JSON site file used by the command-line tool.
    pub site: Option<PathBuf>,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            embed_types: strings(&["shard"]),
            view_modes: strings(&["full", "teaser"]),
            content_types: strings(&["article", "page"]),
            fields: strings(&["body"]),
            field_types: strings(&["text_long", "text_with_summary"]),
            max_conversions: 256,
            site: None,
        }
    }
}

#[derive(Default, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn embed_types<S: Into<String>>(mut self, types: impl IntoIterator<Item = S>) -> Self {
        self.config.embed_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn view_modes<S: Into<String>>(mut self, modes: impl IntoIterator<Item = S>) -> Self {
        self.config.view_modes = modes.into_iter().map(Into::into).collect();
        self
    }

    pub fn content_types<S: Into<String>>(mut self, bundles: impl IntoIterator<Item = S>) -> Self {
        self.config.content_types = bundles.into_iter().map(Into::into).collect();
        self
    }

    pub fn fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.config.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn field_types<S: Into<String>>(mut self, types: impl IntoIterator<Item = S>) -> Self {
        self.config.field_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn max_conversions(mut self, limit: usize) -> Self {
        self.config.max_conversions = limit;
        self
    }

    pub fn site(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.site = Some(path.into());
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

const CANDIDATE_NAMES: &[&str] = &[".shard.toml", "shard.toml"];

fn parse_config_str(s: &str, path: &Path) -> io::Result<Config> {
    let mut config = toml::from_str::<Config>(s).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid config {}: {e}", path.display()),
        )
    })?;
    // A relative site path is relative to the config file.
    if let Some(site) = config.site.as_mut()
        && site.is_relative()
        && let Some(dir) = path.parent()
    {
        *site = dir.join(&*site);
    }
    Ok(config)
}

fn read_config(path: &Path) -> io::Result<Config> {
    log::debug!("Reading config from: {}", path.display());
    let s = fs::read_to_string(path)?;
    let config = parse_config_str(&s, path)?;
    log::info!("Loaded config from: {}", path.display());
    Ok(config)
}

fn find_in_tree(start_dir: &Path) -> Option<PathBuf> {
    for dir in start_dir.ancestors() {
        for name in CANDIDATE_NAMES {
            let p = dir.join(name);
            if p.is_file() {
                return Some(p);
            }
        }
    }
    None
}

fn xdg_config_path() -> Option<PathBuf> {
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        let p = Path::new(&xdg).join("shard").join("config.toml");
        if p.is_file() {
            return Some(p);
        }
    }
    if let Ok(home) = env::var("HOME") {
        let p = Path::new(&home)
            .join(".config")
            .join("shard")
            .join("config.toml");
        if p.is_file() {
            return Some(p);
        }
    }
    None
}

/// Load configuration with precedence:
/// 1) explicit path (error if unreadable/invalid)
/// 2) walk up from start_dir: .shard.toml, shard.toml
/// 3) XDG: $XDG_CONFIG_HOME/shard/config.toml or ~/.config/shard/config.toml
/// 4) default config
pub fn load(explicit: Option<&Path>, start_dir: &Path) -> io::Result<(Config, Option<PathBuf>)> {
    if let Some(path) = explicit {
        let cfg = read_config(path)?;
        return Ok((cfg, Some(path.to_path_buf())));
    }

    if let Some(p) = find_in_tree(start_dir)
        && let Ok(cfg) = read_config(&p)
    {
        return Ok((cfg, Some(p)));
    }

    if let Some(p) = xdg_config_path()
        && let Ok(cfg) = read_config(&p)
    {
        return Ok((cfg, Some(p)));
    }

    log::debug!("No config file found, using defaults");
    Ok((Config::default(), None))
}
