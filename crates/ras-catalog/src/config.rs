//! Catalog build configuration.
//!
//! Loaded from YAML with `${VAR}` / `${VAR:-default}` substitution, then
//! overridden by `CATALOG_*` environment variables. Every field has a default,
//! so an empty document (or no file at all) is a valid configuration.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use catalog_common::{CatalogError, CatalogResult};
use storage::RetryPolicy;

/// Everything that shapes one catalog build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Root catalog id; also names the output directory
    pub catalog_id: String,
    pub catalog_title: String,
    pub catalog_description: String,
    pub models_collection_title: String,
    pub models_collection_description: String,

    /// Bucket holding the model corpus
    pub bucket: String,
    /// Prefix under which `{model}{plan_suffix}` objects are discovered
    pub models_prefix: String,
    /// Prefix of per-simulation run outputs: `{runs_prefix}/{s}/...`.
    /// A `{realization}` placeholder is replaced by the realization index.
    pub runs_prefix: String,
    pub plan_suffix: String,
    pub geometry_suffix: String,

    /// Realization indices to catalog
    pub realizations: Vec<u32>,
    /// Exclusive upper bound of simulation indices; simulations run `1..simulations`
    pub simulations: u32,
    /// Depth grids taken per simulation listing
    pub max_depth_grids: usize,

    pub storage_platform: String,
    pub storage_region: String,
    /// Reported when the store does not expose a storage class
    pub storage_tier: String,

    /// Deduplicate results metadata only when at least this many assets qualify
    pub dedup_min_assets: usize,
    pub max_concurrent_models: usize,
    pub footprint_cache_size: usize,

    pub retry: RetryPolicy,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            catalog_id: "kanawha-models".to_string(),
            catalog_title: "Kanawha Models".to_string(),
            catalog_description: "Models for the Kanawha produced under an FFRD pilot project"
                .to_string(),
            models_collection_title: "HEC-RAS Models".to_string(),
            models_collection_description: "HEC-RAS Models for the Kanawha".to_string(),
            bucket: "kanawha-pilot".to_string(),
            models_prefix: "FFRD_Kanawha_Compute/ras".to_string(),
            runs_prefix: "FFRD_Kanawha_Compute/runs".to_string(),
            plan_suffix: ".p01.hdf".to_string(),
            geometry_suffix: ".g01.hdf".to_string(),
            realizations: vec![1],
            simulations: 100,
            max_depth_grids: 100,
            storage_platform: "AWS".to_string(),
            storage_region: "us-east-1".to_string(),
            storage_tier: "STANDARD".to_string(),
            dedup_min_assets: 1,
            max_concurrent_models: 1,
            footprint_cache_size: 64,
            retry: RetryPolicy::default(),
        }
    }
}

impl CatalogConfig {
    /// Id of the collection holding every model collection.
    pub fn models_collection_id(&self) -> String {
        format!("{}-ras", self.catalog_id)
    }

    /// Parse YAML after expanding environment variables.
    pub fn from_yaml_str(content: &str) -> CatalogResult<Self> {
        let expanded = expand_env_vars(content)?;
        if expanded.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&expanded)
            .map_err(|e| CatalogError::InvalidConfig(format!("Failed to parse config YAML: {}", e)))
    }

    /// Load a YAML file, apply environment overrides and validate.
    pub fn load<P: AsRef<Path>>(path: P) -> CatalogResult<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            CatalogError::InvalidConfig(format!(
                "Failed to read config from {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let mut config = Self::from_yaml_str(&content)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, for runs without a config file.
    pub fn from_env() -> CatalogResult<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from `CATALOG_*` variables when they are set.
    pub fn apply_env_overrides(&mut self) -> CatalogResult<()> {
        override_string(&mut self.catalog_id, "CATALOG_ID");
        override_string(&mut self.bucket, "CATALOG_BUCKET");
        override_string(&mut self.models_prefix, "CATALOG_MODELS_PREFIX");
        override_string(&mut self.runs_prefix, "CATALOG_RUNS_PREFIX");
        override_string(&mut self.storage_region, "CATALOG_STORAGE_REGION");
        override_string(&mut self.storage_tier, "CATALOG_STORAGE_TIER");
        override_parsed(&mut self.simulations, "CATALOG_SIMULATIONS")?;
        override_parsed(&mut self.max_depth_grids, "CATALOG_MAX_DEPTH_GRIDS")?;
        override_parsed(&mut self.max_concurrent_models, "CATALOG_MAX_CONCURRENT_MODELS")?;

        if let Ok(list) = env::var("CATALOG_REALIZATIONS") {
            self.realizations = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<u32>().map_err(|_| {
                        CatalogError::InvalidConfig(format!("CATALOG_REALIZATIONS: '{}' is not a number", s))
                    })
                })
                .collect::<CatalogResult<_>>()?;
        }
        Ok(())
    }

    pub fn validate(&self) -> CatalogResult<()> {
        let invalid = |msg: &str| Err(CatalogError::InvalidConfig(msg.to_string()));

        if self.catalog_id.is_empty() {
            return invalid("catalog_id cannot be empty");
        }
        if self.catalog_id.contains('/') {
            return invalid("catalog_id cannot contain '/'");
        }
        if self.plan_suffix.is_empty() || self.geometry_suffix.is_empty() {
            return invalid("plan_suffix and geometry_suffix cannot be empty");
        }
        if self.realizations.is_empty() {
            return invalid("at least one realization is required");
        }
        if self.realizations.iter().any(|r| *r == 0 || *r > 9999) {
            return invalid("realization indices must be in 1..=9999");
        }
        if self.simulations > 10000 {
            return invalid("simulations must be at most 10000");
        }
        if self.max_concurrent_models == 0 {
            return invalid("max_concurrent_models must be at least 1");
        }
        if self.footprint_cache_size == 0 {
            return invalid("footprint_cache_size must be at least 1");
        }
        Ok(())
    }
}

fn override_string(field: &mut String, var: &str) {
    if let Ok(value) = env::var(var) {
        if !value.is_empty() {
            *field = value;
        }
    }
}

fn override_parsed<T: std::str::FromStr>(field: &mut T, var: &str) -> CatalogResult<()> {
    if let Ok(value) = env::var(var) {
        *field = value
            .trim()
            .parse()
            .map_err(|_| CatalogError::InvalidConfig(format!("{}: '{}' is not a valid value", var, value)))?;
    }
    Ok(())
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand `${VAR}` and `${VAR:-default}` in config text.
fn expand_env_vars(content: &str) -> CatalogResult<String> {
    let mut result = String::new();
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();

            let mut var_expr = String::new();
            let mut brace_count = 1;

            while brace_count > 0 {
                match chars.next() {
                    Some('{') => {
                        brace_count += 1;
                        var_expr.push('{');
                    }
                    Some('}') => {
                        brace_count -= 1;
                        if brace_count > 0 {
                            var_expr.push('}');
                        }
                    }
                    Some(c) => var_expr.push(c),
                    None => {
                        return Err(CatalogError::InvalidConfig(format!(
                            "Unclosed variable substitution: ${{{}",
                            var_expr
                        )))
                    }
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

fn resolve_var_expr(expr: &str) -> CatalogResult<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        env::var(expr.trim()).map_err(|_| {
            CatalogError::InvalidConfig(format!("Environment variable {} not set", expr))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CatalogConfig::default();
        assert_eq!(config.models_collection_id(), "kanawha-models-ras");
        assert_eq!(config.realizations, vec![1]);
        assert_eq!(config.simulations, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(CatalogConfig::from_yaml_str("").unwrap(), CatalogConfig::default());
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = "catalog_id: elk-models\nrealizations: [1, 2]\nsimulations: 3\nretry:\n  max_retries: 1\n";
        let config = CatalogConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.catalog_id, "elk-models");
        assert_eq!(config.realizations, vec![1, 2]);
        assert_eq!(config.simulations, 3);
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.plan_suffix, ".p01.hdf");
    }

    #[test]
    fn test_bad_yaml() {
        assert!(matches!(
            CatalogConfig::from_yaml_str("simulations: many"),
            Err(CatalogError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_expand_env_vars_with_default() {
        let result = expand_env_vars("bucket: ${RAS_CATALOG_UNSET_VAR:-kanawha-pilot}").unwrap();
        assert_eq!(result, "bucket: kanawha-pilot");
    }

    #[test]
    fn test_expand_env_vars_missing_required() {
        assert!(expand_env_vars("${RAS_CATALOG_REQUIRED_UNSET_VAR}").is_err());
        assert!(expand_env_vars("${UNCLOSED").is_err());
    }

    #[test]
    fn test_validate() {
        let mut config = CatalogConfig::default();
        config.realizations.clear();
        assert!(config.validate().is_err());

        let mut config = CatalogConfig::default();
        config.catalog_id = "a/b".to_string();
        assert!(config.validate().is_err());

        let mut config = CatalogConfig::default();
        config.max_concurrent_models = 0;
        assert!(config.validate().is_err());
    }
}
