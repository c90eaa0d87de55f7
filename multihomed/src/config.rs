//! The interface → custom-table mapping and its two sources: repeated
//! `--network` options and `NETWORK`/`NETWORK1..5` configuration-file
//! keys.

use std::{fs, num::ParseIntError, path::Path};

use rustc_hash::FxHashMap;
use thiserror::Error;

/// Lowest custom table id, inclusive.
pub const TABLE_MIN: u32 = 1000;
/// Highest custom table id, exclusive. Keeps the custom range well clear
/// of the kernel's reserved tables (`main` = 254, `local` = 255).
pub const TABLE_MAX: u32 = 30_000;

/// Highest numbered `NETWORK<n>` configuration key recognised.
const MAX_NETWORK_KEY: u32 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration file {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("network mapping '{0}' is missing a ':' separator")]
    MissingSeparator(String),
    #[error("network mapping '{0}' has an empty interface name")]
    EmptyInterface(String),
    #[error("network mapping '{spec}' has an unparsable table id: {source}")]
    BadTable { spec: String, source: ParseIntError },
    #[error("table id {0} is outside the custom table range [1000, 30000)")]
    TableOutOfRange(u32),
    #[error("interface '{0}' is mapped twice")]
    DuplicateInterface(String),
}

/// The immutable mapping from managed interface name to custom routing
/// table. Loaded once at startup.
#[derive(Debug, Default, Clone)]
pub struct TableMap {
    tables: FxHashMap<String, u32>,
}

impl TableMap {
    /// Build the mapping from the command line and an optional
    /// configuration file, command line first. Duplicates across the two
    /// sources are an error.
    pub fn load(cli_specs: &[String], file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut map = Self::default();
        for spec in cli_specs {
            map.add_spec(spec)?;
        }
        if let Some(path) = file {
            let contents = fs::read_to_string(path)
                .map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;
            map.merge_file(&contents)?;
        }
        Ok(map)
    }

    /// Add one `interface:table` mapping. The rightmost `:` splits name
    /// from decimal table id; surrounding double quotes are stripped.
    pub fn add_spec(&mut self, spec: &str) -> Result<(), ConfigError> {
        let trimmed = spec.trim().trim_matches('"');
        let Some((name, table)) = trimmed.rsplit_once(':') else {
            return Err(ConfigError::MissingSeparator(spec.to_string()));
        };
        if name.is_empty() {
            return Err(ConfigError::EmptyInterface(spec.to_string()));
        }
        let table: u32 = table
            .parse()
            .map_err(|source| ConfigError::BadTable { spec: spec.to_string(), source })?;
        if !(TABLE_MIN..TABLE_MAX).contains(&table) {
            return Err(ConfigError::TableOutOfRange(table));
        }
        if self.tables.insert(name.to_string(), table).is_some() {
            return Err(ConfigError::DuplicateInterface(name.to_string()));
        }
        Ok(())
    }

    fn merge_file(&mut self, contents: &str) -> Result<(), ConfigError> {
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            // Lines without '=' and unknown keys are ignored.
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            if is_network_key(key.trim()) {
                self.add_spec(value.trim())?;
            }
        }
        Ok(())
    }

    /// The custom table of a managed interface.
    pub fn table_for(&self, name: &str) -> Option<u32> {
        self.tables.get(name).copied()
    }

    /// Whether `table` is one of the managed custom tables.
    pub fn contains_table(&self, table: u32) -> bool {
        self.tables.values().any(|&t| t == table)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

fn is_network_key(key: &str) -> bool {
    match key.strip_prefix("NETWORK") {
        Some("") => true,
        Some(n) => n.parse::<u32>().is_ok_and(|n| (1..=MAX_NETWORK_KEY).contains(&n)),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rightmost_colon_splits_the_spec() {
        let mut map = TableMap::default();
        map.add_spec("eth0:1000").unwrap();
        assert_eq!(map.table_for("eth0"), Some(1000));
        assert!(map.contains_table(1000));
        assert!(!map.contains_table(254));
    }

    #[test]
    fn quotes_are_stripped() {
        let mut map = TableMap::default();
        map.add_spec("\"wan0:2500\"").unwrap();
        assert_eq!(map.table_for("wan0"), Some(2500));
    }

    #[test]
    fn bad_specs_are_rejected() {
        let mut map = TableMap::default();
        assert!(matches!(map.add_spec("eth0"), Err(ConfigError::MissingSeparator(_))));
        assert!(matches!(map.add_spec(":1000"), Err(ConfigError::EmptyInterface(_))));
        assert!(matches!(map.add_spec("eth0:junk"), Err(ConfigError::BadTable { .. })));
        assert!(matches!(map.add_spec("eth0:254"), Err(ConfigError::TableOutOfRange(254))));
        assert!(matches!(map.add_spec("eth0:30000"), Err(ConfigError::TableOutOfRange(30000))));
    }

    #[test]
    fn duplicates_are_rejected_across_sources() {
        let mut map = TableMap::default();
        map.add_spec("eth0:1000").unwrap();
        assert!(matches!(
            map.merge_file("NETWORK=eth0:2000"),
            Err(ConfigError::DuplicateInterface(_))
        ));
    }

    #[test]
    fn file_keys_and_noise_lines() {
        let mut map = TableMap::default();
        map.merge_file(concat!(
            "NETWORK=\"eth0:1000\"\n",
            "\n",
            "not a key value line\n",
            "HOSTNAME=router\n",
            "NETWORK1=eth1:1001\n",
            "NETWORK5 = eth5:1005\n",
            "NETWORK6=eth6:1006\n",
        ))
        .unwrap();
        assert_eq!(map.table_for("eth0"), Some(1000));
        assert_eq!(map.table_for("eth1"), Some(1001));
        assert_eq!(map.table_for("eth5"), Some(1005));
        // NETWORK6 is beyond the recognised key range.
        assert_eq!(map.table_for("eth6"), None);
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn cli_specs_load_before_the_file() {
        let specs = vec!["eth0:1000".to_string(), "eth1:1001".to_string()];
        let map = TableMap::load(&specs, None).unwrap();
        assert_eq!(map.len(), 2);
    }
}
