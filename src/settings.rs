use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct PayauthSettings {
    pub request_codes: RequestCodeSettings,
    pub challenge: ChallengeSettings,
    pub logging: LoggingSettings,
}

/// Correlation request codes distinguishing the three attempt kinds
///
/// Purely a demultiplexing key for result delivery; the three codes must be
/// distinct but their values are otherwise host policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestCodeSettings {
    pub payment: u32,
    pub setup: u32,
    pub source: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChallengeSettings {
    /// Bounded challenge timeout in minutes; the 3DS2 protocol allows 5-99
    pub timeout_minutes: u8,
    /// Delay between the preparing indicator and the challenge UI hand-off
    pub ui_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for RequestCodeSettings {
    fn default() -> Self {
        Self {
            payment: 50_000,
            setup: 50_001,
            source: 50_002,
        }
    }
}

impl Default for ChallengeSettings {
    fn default() -> Self {
        Self {
            timeout_minutes: 5,
            ui_delay_ms: 2000,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ChallengeSettings {
    #[must_use]
    pub fn ui_delay(&self) -> Duration {
        Duration::from_millis(self.ui_delay_ms)
    }
}

impl PayauthSettings {
    /// Load settings from configuration files and environment variables
    ///
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables
    /// 2. Settings.toml in `PAYAUTH_SECRETS_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    ///
    /// # Errors
    ///
    /// Returns an error if a settings file cannot be read, TOML parsing
    /// fails, or the resulting settings do not validate.
    pub fn load() -> anyhow::Result<Self> {
        Self::initialize_environment();

        let mut settings = Self::load_base_settings()?;
        Self::apply_env_overrides(&mut settings);
        settings.validate()?;

        Ok(settings)
    }

    /// Initialize logging; safe to call more than once
    fn initialize_environment() {
        let _ = env_logger::try_init();
    }

    /// Load base settings from TOML file(s) or use defaults
    fn load_base_settings() -> anyhow::Result<Self> {
        let mut settings = Self::default();

        let default_config_path = std::path::PathBuf::from("Settings.toml");
        if default_config_path.exists() {
            let toml_content = fs::read_to_string(&default_config_path)
                .with_context(|| format!("reading {}", default_config_path.display()))?;
            settings = basic_toml::from_str(&toml_content)
                .with_context(|| format!("parsing {}", default_config_path.display()))?;
        }

        if let Ok(secrets_dir) = std::env::var("PAYAUTH_SECRETS_DIR") {
            let secrets_path = std::path::Path::new(&secrets_dir).join("Settings.toml");
            if secrets_path.exists() {
                let secrets_toml_content = fs::read_to_string(&secrets_path)
                    .with_context(|| format!("reading {}", secrets_path.display()))?;
                settings = basic_toml::from_str(&secrets_toml_content)
                    .with_context(|| format!("parsing {}", secrets_path.display()))?;
            }
        }

        Ok(settings)
    }

    /// Apply environment variable overrides to settings
    fn apply_env_overrides(settings: &mut Self) {
        Self::apply_request_code_env_overrides(&mut settings.request_codes);
        Self::apply_challenge_env_overrides(&mut settings.challenge);
        Self::apply_logging_env_overrides(&mut settings.logging);
    }

    fn apply_request_code_env_overrides(codes: &mut RequestCodeSettings) {
        Self::apply_u32_env_override("PAYAUTH_PAYMENT_REQUEST_CODE", &mut codes.payment);
        Self::apply_u32_env_override("PAYAUTH_SETUP_REQUEST_CODE", &mut codes.setup);
        Self::apply_u32_env_override("PAYAUTH_SOURCE_REQUEST_CODE", &mut codes.source);
    }

    fn apply_challenge_env_overrides(challenge: &mut ChallengeSettings) {
        if let Ok(value_str) = std::env::var("PAYAUTH_CHALLENGE_TIMEOUT_MINUTES") {
            if let Ok(value) = value_str.parse::<u8>() {
                challenge.timeout_minutes = value;
            }
        }
        if let Ok(value_str) = std::env::var("PAYAUTH_CHALLENGE_UI_DELAY_MS") {
            if let Ok(value) = value_str.parse::<u64>() {
                challenge.ui_delay_ms = value;
            }
        }
    }

    fn apply_logging_env_overrides(logging: &mut LoggingSettings) {
        if let Ok(level) = std::env::var("PAYAUTH_LOG_LEVEL") {
            logging.level = level;
        }
    }

    /// Helper function to apply u32 environment variable overrides
    fn apply_u32_env_override(env_var: &str, target: &mut u32) {
        if let Ok(value_str) = std::env::var(env_var) {
            if let Ok(value) = value_str.parse::<u32>() {
                *target = value;
            }
        }
    }

    /// Validate cross-field constraints
    ///
    /// # Errors
    ///
    /// Returns an error when the challenge timeout is outside the 5-99
    /// minute protocol range or the request codes are not distinct.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(5..=99).contains(&self.challenge.timeout_minutes) {
            bail!(
                "challenge timeout must be between 5 and 99 minutes, got {}",
                self.challenge.timeout_minutes
            );
        }

        let codes = &self.request_codes;
        if codes.payment == codes.setup
            || codes.payment == codes.source
            || codes.setup == codes.source
        {
            bail!("request codes must be distinct to demultiplex result delivery");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for var in [
            "PAYAUTH_SECRETS_DIR",
            "PAYAUTH_PAYMENT_REQUEST_CODE",
            "PAYAUTH_SETUP_REQUEST_CODE",
            "PAYAUTH_SOURCE_REQUEST_CODE",
            "PAYAUTH_CHALLENGE_TIMEOUT_MINUTES",
            "PAYAUTH_CHALLENGE_UI_DELAY_MS",
            "PAYAUTH_LOG_LEVEL",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let settings = PayauthSettings::load().unwrap();

        assert_eq!(settings.request_codes.payment, 50_000);
        assert_eq!(settings.request_codes.setup, 50_001);
        assert_eq!(settings.request_codes.source, 50_002);
        assert_eq!(settings.challenge.timeout_minutes, 5);
        assert_eq!(settings.challenge.ui_delay(), Duration::from_millis(2000));
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    #[serial]
    fn test_secrets_dir_toml_overrides_defaults() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Settings.toml"),
            r#"
[request_codes]
payment = 61000
setup = 61001
source = 61002

[challenge]
timeout_minutes = 10
ui_delay_ms = 0

[logging]
level = "debug"
"#,
        )
        .unwrap();
        std::env::set_var("PAYAUTH_SECRETS_DIR", dir.path());

        let settings = PayauthSettings::load().unwrap();
        clear_env();

        assert_eq!(settings.request_codes.payment, 61_000);
        assert_eq!(settings.challenge.timeout_minutes, 10);
        assert_eq!(settings.challenge.ui_delay(), Duration::ZERO);
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    #[serial]
    fn test_env_overrides_beat_files() {
        clear_env();
        std::env::set_var("PAYAUTH_CHALLENGE_TIMEOUT_MINUTES", "15");
        std::env::set_var("PAYAUTH_SETUP_REQUEST_CODE", "70001");
        std::env::set_var("PAYAUTH_LOG_LEVEL", "trace");

        let settings = PayauthSettings::load().unwrap();
        clear_env();

        assert_eq!(settings.challenge.timeout_minutes, 15);
        assert_eq!(settings.request_codes.setup, 70_001);
        assert_eq!(settings.logging.level, "trace");
    }

    #[test]
    #[serial]
    fn test_unparseable_env_value_is_ignored() {
        clear_env();
        std::env::set_var("PAYAUTH_CHALLENGE_TIMEOUT_MINUTES", "not-a-number");

        let settings = PayauthSettings::load().unwrap();
        clear_env();

        assert_eq!(settings.challenge.timeout_minutes, 5);
    }

    fn settings_with_timeout(timeout_minutes: u8) -> PayauthSettings {
        PayauthSettings {
            challenge: ChallengeSettings {
                timeout_minutes,
                ..ChallengeSettings::default()
            },
            ..PayauthSettings::default()
        }
    }

    #[test]
    fn test_validate_rejects_out_of_range_timeout() {
        assert!(settings_with_timeout(4).validate().is_err());
        assert!(settings_with_timeout(100).validate().is_err());
        assert!(settings_with_timeout(5).validate().is_ok());
        assert!(settings_with_timeout(99).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_colliding_request_codes() {
        let settings = PayauthSettings {
            request_codes: RequestCodeSettings {
                payment: 50_000,
                setup: 50_000,
                source: 50_002,
            },
            ..PayauthSettings::default()
        };
        assert!(settings.validate().is_err());
    }
}
