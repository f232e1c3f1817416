use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::env;
use std::sync::RwLock;
use uuid::Uuid;

pub static GLOBAL_CONFIG: Lazy<Config> = Lazy::new(Config::new);

const DEFAULT_NODE_PORT: &str = "5000";
const DEFAULT_SNAPSHOT_FILE: &str = "blockchain.json";

const NODE_NAME_KEY: &str = "NODE_NAME";
const NODE_PORT_KEY: &str = "NODE_PORT";
const SNAPSHOT_FILE_KEY: &str = "SNAPSHOT_FILE";

pub struct Config {
    inner: RwLock<HashMap<String, String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Config {
        let mut map = HashMap::new();

        // A fresh name per process unless one is pinned via environment
        let node_name = env::var(NODE_NAME_KEY)
            .unwrap_or_else(|_| format!("node-{}", &Uuid::new_v4().simple().to_string()[..8]));
        map.insert(String::from(NODE_NAME_KEY), node_name);

        let node_port =
            env::var(NODE_PORT_KEY).unwrap_or_else(|_| String::from(DEFAULT_NODE_PORT));
        map.insert(String::from(NODE_PORT_KEY), node_port);

        let snapshot_file =
            env::var(SNAPSHOT_FILE_KEY).unwrap_or_else(|_| String::from(DEFAULT_SNAPSHOT_FILE));
        map.insert(String::from(SNAPSHOT_FILE_KEY), snapshot_file);

        Config {
            inner: RwLock::new(map),
        }
    }

    pub fn get_node_name(&self) -> String {
        let inner = self
            .inner
            .read()
            .expect("Failed to acquire read lock on config - this should never happen");
        inner
            .get(NODE_NAME_KEY)
            .expect("Node name should always be present in config")
            .clone()
    }

    pub fn set_node_name(&self, name: String) {
        let mut inner = self
            .inner
            .write()
            .expect("Failed to acquire write lock on config - this should never happen");
        inner.insert(String::from(NODE_NAME_KEY), name);
    }

    pub fn get_node_port(&self) -> u16 {
        let inner = self
            .inner
            .read()
            .expect("Failed to acquire read lock on config - this should never happen");
        inner
            .get(NODE_PORT_KEY)
            .and_then(|port| port.parse().ok())
            .unwrap_or(5000)
    }

    pub fn set_node_port(&self, port: u16) {
        let mut inner = self
            .inner
            .write()
            .expect("Failed to acquire write lock on config - this should never happen");
        inner.insert(String::from(NODE_PORT_KEY), port.to_string());
    }

    pub fn get_snapshot_file(&self) -> String {
        let inner = self
            .inner
            .read()
            .expect("Failed to acquire read lock on config - this should never happen");
        inner
            .get(SNAPSHOT_FILE_KEY)
            .expect("Snapshot file should always be present in config")
            .clone()
    }

    pub fn set_snapshot_file(&self, path: String) {
        let mut inner = self
            .inner
            .write()
            .expect("Failed to acquire write lock on config - this should never happen");
        inner.insert(String::from(SNAPSHOT_FILE_KEY), path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_present() {
        let config = Config::new();
        assert!(config.get_node_name().starts_with("node-"));
        assert!(!config.get_snapshot_file().is_empty());
    }

    #[test]
    fn test_setters_override_defaults() {
        let config = Config::new();
        config.set_node_name("miner-1".to_string());
        config.set_node_port(6000);
        config.set_snapshot_file("custom.json".to_string());

        assert_eq!(config.get_node_name(), "miner-1");
        assert_eq!(config.get_node_port(), 6000);
        assert_eq!(config.get_snapshot_file(), "custom.json");
    }
}
