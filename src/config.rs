use std::path::PathBuf;
use std::str::FromStr;

use log::warn;
use serde::{Deserialize, Serialize};

/// Server configuration, read from `NOVEL_*` environment variables
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    pub bind_addr: String,
    /// SQLite database file
    pub database_path: PathBuf,
    /// Directory holding compressed chapter bodies
    pub blob_dir: PathBuf,
    /// Decompressed chapters kept in memory (0 disables the cache)
    pub cache_capacity: usize,
    /// Load the sample catalogue into an empty database
    pub seed: bool,
    /// Directory served under `/static`
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            database_path: PathBuf::from("./data/novels.db"),
            blob_dir: PathBuf::from("./data/chapters"),
            cache_capacity: 256,
            seed: false,
            static_dir: PathBuf::from("./static"),
        }
    }
}

fn parse_or<T: FromStr>(name: &str, raw: &str, fallback: T) -> T {
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!("Ignoring invalid value {:?} for {}", raw, name);
            fallback
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("NOVEL_BIND") {
            config.bind_addr = addr;
        }
        if let Some(path) = lookup("NOVEL_DATABASE") {
            config.database_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup("NOVEL_BLOB_DIR") {
            config.blob_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup("NOVEL_CACHE_CAPACITY") {
            config.cache_capacity = parse_or("NOVEL_CACHE_CAPACITY", &raw, config.cache_capacity);
        }
        if let Some(raw) = lookup("NOVEL_SEED") {
            config.seed = parse_flag(&raw).unwrap_or_else(|| {
                warn!("Ignoring invalid value {:?} for NOVEL_SEED", raw);
                false
            });
        }
        if let Some(dir) = lookup("NOVEL_STATIC_DIR") {
            config.static_dir = PathBuf::from(dir);
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = ServerConfig::from_lookup(lookup(&[]));
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("NOVEL_BIND", "0.0.0.0:9000"),
            ("NOVEL_DATABASE", "/tmp/n.db"),
            ("NOVEL_CACHE_CAPACITY", "0"),
            ("NOVEL_SEED", "yes"),
        ]));
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.database_path, PathBuf::from("/tmp/n.db"));
        assert_eq!(config.cache_capacity, 0);
        assert!(config.seed);
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("NOVEL_CACHE_CAPACITY", "lots"),
            ("NOVEL_SEED", "maybe"),
        ]));
        assert_eq!(config.cache_capacity, 256);
        assert!(!config.seed);
    }
}
