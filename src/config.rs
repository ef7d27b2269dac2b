use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::balboa::Accessory;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read spa configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse spa configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which accessories a spa has installed, e.g. `{"pump1": true, "light1": true, "blower": false}`.
/// Accessories missing from the map are not installed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct SpaConfiguration(BTreeMap<Accessory, bool>);

impl SpaConfiguration {
    pub fn new(installed: impl IntoIterator<Item = Accessory>) -> Self {
        Self(installed.into_iter().map(|a| (a, true)).collect())
    }

    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path)?;
        Self::from_json(&input)
    }

    pub fn has(&self, accessory: Accessory) -> bool {
        self.0.get(&accessory).copied().unwrap_or(false)
    }

    /// Installed accessories, in panel order
    pub fn installed(&self) -> impl Iterator<Item = Accessory> + '_ {
        self.0
            .iter()
            .filter(|&(_, &installed)| installed)
            .map(|(&accessory, _)| accessory)
    }
}

impl Default for SpaConfiguration {
    // The most common two-pump, single-light layout
    fn default() -> Self {
        Self::new([Accessory::Pump1, Accessory::Pump2, Accessory::Light1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let config = SpaConfiguration::from_json(
            r#"{"pump1": true, "pump3": true, "light1": true, "blower": false, "aux2": true}"#,
        )
        .unwrap();

        assert!(config.has(Accessory::Pump1));
        assert!(!config.has(Accessory::Pump2));
        assert!(!config.has(Accessory::Blower));
        assert_eq!(
            config.installed().collect::<Vec<_>>(),
            vec![
                Accessory::Pump1,
                Accessory::Pump3,
                Accessory::Light1,
                Accessory::Aux2
            ]
        );
    }

    #[test]
    fn test_unknown_accessory() {
        let err = SpaConfiguration::from_json(r#"{"jets": true}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_default() {
        let config = SpaConfiguration::default();
        assert_eq!(config.installed().count(), 3);
        assert!(config.has(Accessory::Light1));
        assert!(!config.has(Accessory::Light2));
    }
}
