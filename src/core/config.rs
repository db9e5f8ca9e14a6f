use crate::error::{MappingError, Result};
use serde::{Deserialize, Serialize};

pub const CORE_PROFILE_BASE: &str = "http://hl7.org/fhir/StructureDefinition/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Prefix turning a data type code into its core profile URL.
    pub core_profile_base: String,
    /// Bound on nested data-type expansion during tree building.
    pub max_expansion_depth: usize,
    pub cache_config: CacheConfig,
    pub validation: ValidationPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Collapse concurrent first-time builds of the same profile.
    pub guard_concurrent_builds: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationPolicy {
    /// Treat warning-severity issues as failures.
    pub fail_on_warnings: bool,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            core_profile_base: CORE_PROFILE_BASE.to_string(),
            max_expansion_depth: 16,
            cache_config: CacheConfig::default(),
            validation: ValidationPolicy::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            guard_concurrent_builds: true,
        }
    }
}

impl MapperConfig {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_expansion_depth == 0 {
            return Err(MappingError::Configuration {
                message: "max_expansion_depth must be at least 1".to_string(),
            });
        }
        if !self.core_profile_base.ends_with('/') {
            return Err(MappingError::Configuration {
                message: format!(
                    "core_profile_base '{}' must end with '/'",
                    self.core_profile_base
                ),
            });
        }
        Ok(())
    }

    /// Core profile URL for a data type code.
    pub fn core_profile(&self, type_code: &str) -> String {
        format!("{}{}", self.core_profile_base, type_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config = MapperConfig::from_json_str(r#"{ "max_expansion_depth": 4 }"#).unwrap();
        assert_eq!(config.max_expansion_depth, 4);
        assert_eq!(config.core_profile_base, CORE_PROFILE_BASE);
        assert!(config.cache_config.enabled);
        assert!(!config.validation.fail_on_warnings);
    }

    #[test]
    fn test_zero_depth_is_rejected() {
        let result = MapperConfig::from_json_str(r#"{ "max_expansion_depth": 0 }"#);
        assert!(matches!(result, Err(MappingError::Configuration { .. })));
    }

    #[test]
    fn test_core_profile_url() {
        assert_eq!(
            MapperConfig::default().core_profile("HumanName"),
            "http://hl7.org/fhir/StructureDefinition/HumanName"
        );
    }
}
