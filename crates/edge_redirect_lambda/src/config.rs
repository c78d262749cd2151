//! Deployment-time configuration.
//!
//! Lambda@Edge functions cannot read environment variables, so every setting
//! can also be baked into the binary at build time under the same name. A
//! value present in the runtime environment wins over the baked one.

pub const BUCKET_VAR: &str = "DIRECTORY_REDIRECT_BUCKET";
pub const REGION_VAR: &str = "DIRECTORY_REDIRECT_REGION";

const BAKED_BUCKET: Option<&str> = option_env!("DIRECTORY_REDIRECT_BUCKET");
const BAKED_REGION: Option<&str> = option_env!("DIRECTORY_REDIRECT_REGION");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectConfig {
    pub bucket: String,
    /// `None` defers to the SDK's default region chain.
    pub region: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    message: String,
}

impl ConfigError {
    fn missing(name: &str) -> Self {
        Self {
            message: format!("{name} must be configured (runtime environment or build time)"),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ConfigError {}

impl RedirectConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(
            std::env::var(BUCKET_VAR).ok(),
            BAKED_BUCKET,
            std::env::var(REGION_VAR).ok(),
            BAKED_REGION,
        )
    }

    fn resolve(
        runtime_bucket: Option<String>,
        baked_bucket: Option<&str>,
        runtime_region: Option<String>,
        baked_region: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let bucket =
            pick(runtime_bucket, baked_bucket).ok_or_else(|| ConfigError::missing(BUCKET_VAR))?;
        Ok(Self {
            bucket,
            region: pick(runtime_region, baked_region),
        })
    }
}

fn pick(runtime: Option<String>, baked: Option<&str>) -> Option<String> {
    runtime
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .or_else(|| {
            baked
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_value_wins_over_baked_value() {
        let config = RedirectConfig::resolve(
            Some("runtime-bucket".to_string()),
            Some("baked-bucket"),
            None,
            Some("us-east-1"),
        )
        .expect("bucket is configured");

        assert_eq!(config.bucket, "runtime-bucket");
        assert_eq!(config.region.as_deref(), Some("us-east-1"));
    }

    #[test]
    fn blank_runtime_value_falls_back_to_baked_value() {
        let config =
            RedirectConfig::resolve(Some("  ".to_string()), Some("baked-bucket"), None, None)
                .expect("baked bucket applies");

        assert_eq!(config.bucket, "baked-bucket");
        assert_eq!(config.region, None);
    }

    #[test]
    fn missing_bucket_is_an_error() {
        let error = RedirectConfig::resolve(None, None, Some("eu-west-1".to_string()), None)
            .expect_err("bucket is required");

        assert!(error.to_string().contains(BUCKET_VAR));
    }
}
