use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};
use serde::Deserialize;

pub const MIN_COLUMNS: usize = 1;
pub const MAX_COLUMNS: usize = 10;
pub const GRID_PAGE_SIZE_RANGE: (usize, usize, usize) = (100, 1000, 100);
pub const ANNOTATION_PAGE_SIZE_RANGE: (usize, usize, usize) = (50, 1000, 50);

/// Defaults for the sidebar controls, read from `config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ViewerConfig {
    /// Offer the natural sort toggle.
    #[serde(default)]
    pub natural_sort: bool,

    #[serde(default = "default_num_columns")]
    pub num_columns: usize,

    #[serde(default = "default_imgs_per_page")]
    pub imgs_per_page: usize,

    /// TrueType font for box labels; system fonts are tried when unset.
    #[serde(default)]
    pub font_path: Option<PathBuf>,
}

fn default_num_columns() -> usize {
    3
}

fn default_imgs_per_page() -> usize {
    100
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            natural_sort: false,
            num_columns: default_num_columns(),
            imgs_per_page: default_imgs_per_page(),
            font_path: None,
        }
    }
}

impl ViewerConfig {
    /// Loads `custom_path` or the per-user config file, falling back to
    /// defaults when neither can be read.
    pub fn load(custom_path: Option<&Path>) -> Self {
        let path = match custom_path {
            Some(path) => path.to_path_buf(),
            None => match config_file_path() {
                Some(path) => path,
                None => return Self::default(),
            },
        };

        if !path.exists() {
            info!("Config file not found at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::from_file(&path) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            }
            Err(err) => {
                warn!("{err:#}; using default config");
                Self::default()
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str::<Self>(text)?)
    }

    pub fn columns(&self) -> usize {
        self.num_columns.clamp(MIN_COLUMNS, MAX_COLUMNS)
    }

    pub fn grid_page_size(&self) -> usize {
        clamp_page_size(self.imgs_per_page, GRID_PAGE_SIZE_RANGE)
    }

    pub fn annotation_page_size(&self) -> usize {
        clamp_page_size(self.imgs_per_page, ANNOTATION_PAGE_SIZE_RANGE)
    }
}

pub fn clamp_page_size(value: usize, (min, max, _step): (usize, usize, usize)) -> usize {
    value.clamp(min, max)
}

pub fn config_file_path() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        return env::var_os("APPDATA")
            .map(PathBuf::from)
            .map(|base| base.join("sharingan").join("config.yaml"));
    }

    #[cfg(target_os = "macos")]
    {
        return env::var_os("HOME").map(PathBuf::from).map(|home| {
            home.join("Library")
                .join("Application Support")
                .join("sharingan")
                .join("config.yaml")
        });
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = env::var_os("XDG_CONFIG_HOME") {
            return Some(PathBuf::from(xdg).join("sharingan").join("config.yaml"));
        }
        env::var_os("HOME")
            .map(PathBuf::from)
            .map(|home| home.join(".config").join("sharingan").join("config.yaml"))
    }
}
