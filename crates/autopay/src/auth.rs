//! Portal login and logout.
//!
//! The payment core only needs an [`Authenticator`]; [`FormAuthenticator`]
//! is the stock implementation that fills a username/password form whose
//! selectors come from configuration.

use crate::driver::PortalDriver;
use crate::locator::Selector;
use crate::result::{PayError, PayResult};
use crate::wait::Waiter;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Portal account credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Account username
    pub username: String,
    password: String,
}

impl Credentials {
    /// Create credentials
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Account password
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Logs a session in and out of the portal
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Establish an authenticated session
    async fn login(&self, driver: &mut dyn PortalDriver, credentials: &Credentials) -> PayResult<()>;

    /// End the session
    async fn logout(&self, driver: &mut dyn PortalDriver) -> PayResult<()>;
}

/// Where the login form lives and how to fill it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginConfig {
    /// Login page URL
    pub url: String,
    /// Username input
    pub username_field: Selector,
    /// Password input
    pub password_field: Selector,
    /// Submit control
    pub submit: Selector,
    /// Sign-out control on the dashboard
    pub logout: Selector,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            username_field: Selector::css("input[name=username]"),
            password_field: Selector::css("input[type=password]"),
            submit: Selector::css("button[type=submit]"),
            logout: Selector::css("a[title=Logout]"),
        }
    }
}

impl LoginConfig {
    /// Set login URL
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

/// Fills the configured login form
#[derive(Debug, Clone)]
pub struct FormAuthenticator {
    config: LoginConfig,
    waiter: Waiter,
}

impl FormAuthenticator {
    /// Create an authenticator for the given form
    #[must_use]
    pub const fn new(config: LoginConfig, waiter: Waiter) -> Self {
        Self { config, waiter }
    }

    async fn submit_form(&self, driver: &mut dyn PortalDriver, credentials: &Credentials) -> PayResult<()> {
        if self.config.url.is_empty() {
            return Err(PayError::config("login url is not set"));
        }
        driver.navigate(&self.config.url).await?;
        self.waiter
            .until_visible(&*driver, &self.config.username_field)
            .await?;
        driver
            .type_text(&self.config.username_field, &credentials.username)
            .await?;
        driver
            .type_text(&self.config.password_field, credentials.password())
            .await?;
        self.waiter
            .until_clickable(&*driver, &self.config.submit)
            .await?;
        driver.click(&self.config.submit).await
    }

    async fn click_logout(&self, driver: &mut dyn PortalDriver) -> PayResult<()> {
        self.waiter
            .until_clickable(&*driver, &self.config.logout)
            .await?;
        driver.click(&self.config.logout).await
    }
}

#[async_trait]
impl Authenticator for FormAuthenticator {
    async fn login(&self, driver: &mut dyn PortalDriver, credentials: &Credentials) -> PayResult<()> {
        tracing::info!(username = %credentials.username, url = %self.config.url, "logging in");
        self.submit_form(driver, credentials)
            .await
            .map_err(|e| match e {
                PayError::Config { .. } | PayError::Authentication { .. } => e,
                other => PayError::authentication(format!("login failed: {other}")),
            })
    }

    async fn logout(&self, driver: &mut dyn PortalDriver) -> PayResult<()> {
        self.click_logout(driver)
            .await
            .map_err(|e| PayError::authentication(format!("logout failed: {e}")))?;
        tracing::info!("logged out");
        Ok(())
    }
}
