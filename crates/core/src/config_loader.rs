use crate::config::ScanConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads screener configuration by merging defaults, TOML, and
    /// environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load() -> Result<ScanConfig> {
        let config: ScanConfig = Figment::from(Serialized::defaults(ScanConfig::default()))
            .merge(Toml::file("config/WheelScan.toml"))
            .merge(Env::prefixed("WHEEL_SCAN_").split("__"))
            .extract()?;

        Ok(config)
    }

    /// Loads configuration with a profile-specific TOML overlay.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load_with_profile(profile: &str) -> Result<ScanConfig> {
        let config: ScanConfig = Figment::from(Serialized::defaults(ScanConfig::default()))
            .merge(Toml::file("config/WheelScan.toml"))
            .merge(Toml::file(format!("config/WheelScan.{profile}.toml")))
            .merge(Env::prefixed("WHEEL_SCAN_").split("__"))
            .extract()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_falls_back_to_defaults_without_files() {
        // No config/ directory in the test cwd; defaults must still extract.
        let config = ConfigLoader::load().unwrap();
        assert_eq!(config.budget.concurrency, 5);
        assert_eq!(config.cache.quote_ttl_secs, 60);
    }
}
