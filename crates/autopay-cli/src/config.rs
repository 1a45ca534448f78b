//! CLI configuration: verbosity and the resolved portal configuration

use crate::commands::Cli;
use crate::error::{CliError, CliResult};
use autopay::PortalConfig;

/// Verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Quiet - warnings and errors only
    Quiet,
    /// Normal - default output
    #[default]
    Normal,
    /// Verbose - extra output
    Verbose,
    /// Debug - maximum output
    Debug,
}

impl Verbosity {
    /// Derive from the `-q` flag and the `-v` count
    #[must_use]
    pub const fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Debug,
        }
    }

    /// Check if verbose or higher
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }

    /// Log level for this crate and the library
    #[must_use]
    pub const fn level(self) -> &'static str {
        match self {
            Self::Quiet => "warn",
            Self::Normal => "info",
            Self::Verbose => "debug",
            Self::Debug => "trace",
        }
    }

    /// `EnvFilter` directive used when `RUST_LOG` is unset
    ///
    /// Third-party crates stay at `warn` so CDP chatter does not drown the run log.
    #[must_use]
    pub fn filter_directive(self) -> String {
        let level = self.level();
        format!("warn,autopay={level},autopay_cli={level}")
    }
}

/// Build the portal configuration for this invocation
///
/// Loads `--config` when given, applies the command-line overrides, then
/// validates the result.
pub fn resolve_portal_config(cli: &Cli) -> CliResult<PortalConfig> {
    let mut config = match &cli.config {
        Some(path) => PortalConfig::load(path)?,
        None => PortalConfig::default(),
    };

    if let Some(url) = &cli.login_url {
        config = config.with_login_url(url.clone());
    }
    if let Some(path) = &cli.browser_path {
        let path = path
            .to_str()
            .ok_or_else(|| CliError::invalid_argument("browser path is not valid UTF-8"))?;
        config.browser = config.browser.with_chromium_path(path);
    }
    if let Some(host) = &cli.smtp_host {
        config.mail.smtp_host.clone_from(host);
    }
    if cli.headful {
        config.browser = config.browser.with_headless(false);
    }

    config.validate()?;
    Ok(config)
}
