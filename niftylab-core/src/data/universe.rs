//! Symbol universe: named groups of instrument keys loaded from TOML.
//!
//! ```toml
//! [groups]
//! nifty_bank = ["HDFCBANK.NS", "ICICIBANK.NS"]
//! nifty_it = ["TCS.NS", "INFY.NS"]
//! ```
//!
//! Keys are opaque to everything downstream.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("read universe file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("parse universe TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize universe: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("unknown universe group '{0}'")]
    UnknownGroup(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Universe {
    pub groups: BTreeMap<String, Vec<String>>,
}

impl Universe {
    pub fn from_file(path: &Path) -> Result<Self, UniverseError> {
        let content = std::fs::read_to_string(path).map_err(|source| UniverseError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, UniverseError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, UniverseError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Every symbol across all groups, first occurrence order, no duplicates.
    pub fn all_symbols(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.groups
            .values()
            .flatten()
            .filter(|s| seen.insert(s.as_str()))
            .cloned()
            .collect()
    }

    pub fn group(&self, name: &str) -> Result<&[String], UniverseError> {
        self.groups
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| UniverseError::UnknownGroup(name.to_string()))
    }

    pub fn group_names(&self) -> Vec<&str> {
        self.groups.keys().map(String::as_str).collect()
    }

    pub fn symbol_count(&self) -> usize {
        self.all_symbols().len()
    }

    /// Liquid NSE large caps grouped by sector index.
    pub fn default_nse() -> Self {
        let group = |symbols: &[&str]| symbols.iter().map(|s| s.to_string()).collect();
        let mut groups = BTreeMap::new();
        groups.insert(
            "nifty_bank".into(),
            group(&[
                "HDFCBANK.NS",
                "ICICIBANK.NS",
                "SBIN.NS",
                "KOTAKBANK.NS",
                "AXISBANK.NS",
                "INDUSINDBK.NS",
            ]),
        );
        groups.insert(
            "nifty_it".into(),
            group(&["TCS.NS", "INFY.NS", "HCLTECH.NS", "WIPRO.NS", "TECHM.NS"]),
        );
        groups.insert(
            "nifty_energy".into(),
            group(&["RELIANCE.NS", "ONGC.NS", "NTPC.NS", "POWERGRID.NS"]),
        );
        groups.insert(
            "nifty_fmcg".into(),
            group(&["HINDUNILVR.NS", "ITC.NS", "NESTLEIND.NS", "BRITANNIA.NS"]),
        );
        groups.insert(
            "nifty_auto".into(),
            group(&["MARUTI.NS", "M&M.NS", "TATAMOTORS.NS", "BAJAJ-AUTO.NS"]),
        );
        groups.insert("indices".into(), group(&["^NSEI", "^NSEBANK"]));
        Self { groups }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_universe_has_groups() {
        let u = Universe::default_nse();
        assert!(u.group_names().contains(&"nifty_bank"));
        assert!(u.symbol_count() > 20);
    }

    #[test]
    fn toml_roundtrip() {
        let u = Universe::default_nse();
        let parsed = Universe::from_toml(&u.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, u);
    }

    #[test]
    fn all_symbols_deduplicates_in_order() {
        let u = Universe::from_toml(
            r#"
            [groups]
            a = ["TCS.NS", "INFY.NS"]
            b = ["INFY.NS", "SBIN.NS"]
            "#,
        )
        .unwrap();
        assert_eq!(u.all_symbols(), vec!["TCS.NS", "INFY.NS", "SBIN.NS"]);
    }

    #[test]
    fn unknown_group_is_an_error() {
        let u = Universe::default_nse();
        assert!(u.group("nifty_it").unwrap().contains(&"TCS.NS".to_string()));
        assert!(matches!(u.group("nasdaq"), Err(UniverseError::UnknownGroup(_))));
    }
}
