//! craftpress: content backend for a Minecraft community site
//!
//! This crate serves Markdown-backed articles and patch notes over a JSON
//! API, alongside live game-server status and maintenance-window lookups.

pub mod commands;
pub mod config;
pub mod content;
pub mod maintenance;
pub mod server;
pub mod status;

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Site configuration file name
pub const CONFIG_FILE: &str = "craftpress.yml";

/// The main application: configuration plus resolved directories
#[derive(Clone)]
pub struct Site {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Content directory
    pub content_dir: PathBuf,
    /// Public (static assets) directory
    pub public_dir: PathBuf,
}

impl Site {
    /// Create a new Site instance from a directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join(CONFIG_FILE);

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };

        let content_dir = base_dir.join(&config.content_dir);
        let public_dir = base_dir.join(&config.public_dir);

        Ok(Self {
            config,
            base_dir,
            content_dir,
            public_dir,
        })
    }

    /// Open a content store over the content directory. Stores are cheap;
    /// every request reads fresh so edits show up without a restart.
    pub fn store(&self) -> content::ContentStore {
        content::ContentStore::new(&self.content_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_site_defaults_without_config_file() {
        let dir = tempdir().unwrap();
        let site = Site::new(dir.path()).unwrap();
        assert_eq!(site.content_dir, dir.path().join("content"));
        assert_eq!(site.public_dir, dir.path().join("public"));
        assert_eq!(site.config.server.port, 4000);
    }

    #[test]
    fn test_site_reads_config_file() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "content_dir: data\nserver:\n  port: 8080\n",
        )
        .unwrap();

        let site = Site::new(dir.path()).unwrap();
        assert_eq!(site.content_dir, dir.path().join("data"));
        assert_eq!(site.config.server.port, 8080);
    }

    #[test]
    fn test_site_rejects_malformed_config() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "server: [not, a, map]\n").unwrap();
        assert!(Site::new(dir.path()).is_err());
    }
}
