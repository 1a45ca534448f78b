//! Run configuration loaded from YAML.
//!
//! Every field has a default, so an empty document (or no file at all) is a
//! valid configuration apart from the login URL.
//!
//! ```yaml
//! portal:
//!   name: utility
//!   login:
//!     url: https://portal.example/login
//! wait:
//!   timeout_ms: 120000
//! browser:
//!   headless: true
//! mail:
//!   smtp_host: smtp.gmail.com
//! ```

use crate::auth::LoginConfig;
use crate::browser::BrowserConfig;
use crate::locator::PortalSelectors;
use crate::result::{PayError, PayResult};
use crate::wait::{WaitOptions, Waiter};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name used in messages when none is configured
pub const DEFAULT_PORTAL_NAME: &str = "utility";

/// SMTP relay used when none is configured
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";

/// Which portal is being driven
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalSection {
    /// Name used in notification text, e.g. "utility" -> "Utility bill"
    pub name: String,
    /// Login form
    pub login: LoginConfig,
}

impl Default for PortalSection {
    fn default() -> Self {
        Self {
            name: DEFAULT_PORTAL_NAME.to_string(),
            login: LoginConfig::default(),
        }
    }
}

/// Outgoing mail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// Implicit-TLS SMTP relay
    pub smtp_host: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_host: DEFAULT_SMTP_HOST.to_string(),
        }
    }
}

/// Complete run configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Portal identity and login
    pub portal: PortalSection,
    /// UI contract
    pub selectors: PortalSelectors,
    /// Wait bounds
    pub wait: WaitOptions,
    /// Browser launch options
    pub browser: BrowserConfig,
    /// Outgoing mail
    pub mail: MailConfig,
}

impl PortalConfig {
    /// Parse a YAML document
    pub fn from_yaml(yaml: &str) -> PayResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Load from a YAML file
    pub fn load(path: &Path) -> PayResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| PayError::config(format!("cannot read {}: {e}", path.display())))?;
        let config = Self::from_yaml(&text)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Set the login URL
    #[must_use]
    pub fn with_login_url(mut self, url: impl Into<String>) -> Self {
        self.portal.login = self.portal.login.with_url(url);
        self
    }

    /// Set wait bounds
    #[must_use]
    pub const fn with_wait(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }

    /// Waiter configured with these bounds
    #[must_use]
    pub const fn waiter(&self) -> Waiter {
        Waiter::with_options(self.wait)
    }

    /// Reject configurations that cannot work
    pub fn validate(&self) -> PayResult<()> {
        if self.portal.login.url.trim().is_empty() {
            return Err(PayError::config("portal.login.url is required"));
        }
        if self.portal.name.trim().is_empty() {
            return Err(PayError::config("portal.name must not be empty"));
        }
        if self.mail.smtp_host.trim().is_empty() {
            return Err(PayError::config("mail.smtp_host must not be empty"));
        }
        if self.wait.poll_interval_ms == 0 {
            return Err(PayError::config("wait.poll_interval_ms must be positive"));
        }
        if self.selectors.due_amount_variants.is_empty() {
            return Err(PayError::config(
                "selectors.due_amount_variants needs at least one selector",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::locator::Selector;
    use crate::wait::DEFAULT_WAIT_TIMEOUT_MS;

    #[test]
    fn test_empty_document_is_all_defaults() {
        let config = PortalConfig::from_yaml("{}").unwrap();
        assert_eq!(config, PortalConfig::default());
        assert_eq!(config.portal.name, "utility");
        assert_eq!(config.wait.timeout_ms, DEFAULT_WAIT_TIMEOUT_MS);
        assert_eq!(config.mail.smtp_host, DEFAULT_SMTP_HOST);
    }

    #[test]
    fn test_mail_section() {
        let config = PortalConfig::from_yaml("mail:\n  smtp_host: smtp.example.com\n")
            .unwrap()
            .with_login_url("https://portal.example/login");
        assert_eq!(config.mail.smtp_host, "smtp.example.com");
        assert!(config.validate().is_ok());

        let blank = PortalConfig::from_yaml("mail:\n  smtp_host: ' '\n")
            .unwrap()
            .with_login_url("https://portal.example/login");
        assert!(blank.validate().unwrap_err().to_string().contains("mail.smtp_host"));
    }

    #[test]
    fn test_nested_overrides() {
        let yaml = "\
portal:
  name: water
  login:
    url: https://portal.example/login
wait:
  timeout_ms: 5000
selectors:
  express_pay:
    by: css
    value: a.express
browser:
  headless: false
";
        let config = PortalConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.portal.name, "water");
        assert_eq!(config.portal.login.url, "https://portal.example/login");
        assert_eq!(config.wait.timeout_ms, 5000);
        assert_eq!(config.wait.poll_interval_ms, 250);
        assert_eq!(config.selectors.express_pay, Selector::css("a.express"));
        assert!(!config.browser.headless);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_selector_kind_rejected() {
        let yaml = "selectors:\n  express_pay:\n    by: xpath\n    value: //a\n";
        assert!(matches!(
            PortalConfig::from_yaml(yaml),
            Err(PayError::Yaml(_))
        ));
    }

    #[test]
    fn test_validate_requires_login_url() {
        let err = PortalConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("portal.login.url"));
        assert!(PortalConfig::default()
            .with_login_url("https://portal.example/login")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_poll_interval() {
        let config = PortalConfig::default()
            .with_login_url("https://portal.example/login")
            .with_wait(WaitOptions::new().with_poll_interval(0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("autopay.yaml");
        std::fs::write(&path, "portal:\n  name: gas\n").unwrap();

        let config = PortalConfig::load(&path).unwrap();
        assert_eq!(config.portal.name, "gas");
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let err = PortalConfig::load(Path::new("/nonexistent/autopay.yaml")).unwrap_err();
        assert!(matches!(err, PayError::Config { .. }));
    }

    #[test]
    fn test_waiter_uses_wait_section() {
        let config = PortalConfig::default().with_wait(WaitOptions::new().with_timeout(10));
        assert_eq!(config.waiter().options().timeout_ms, 10);
    }
}
