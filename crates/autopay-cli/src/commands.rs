//! CLI argument definitions

use crate::config::Verbosity;
use clap::Parser;
use std::fmt;
use std::path::PathBuf;

/// Autopay: pay the utility bill that is due, and email the outcome
#[derive(Parser)]
#[command(name = "autopay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Portal account username
    pub portal_username: String,

    /// Portal account password
    pub portal_password: String,

    /// Mail account used to send the outcome
    pub mail_username: String,

    /// Mail account password
    pub mail_password: String,

    /// Address that receives the outcome
    pub to_address: String,

    /// Chromium executable (auto-detected when omitted)
    pub browser_path: Option<PathBuf>,

    /// YAML configuration file
    #[arg(short, long, env = "AUTOPAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Portal login page (overrides the configuration file)
    #[arg(long, env = "AUTOPAY_LOGIN_URL")]
    pub login_url: Option<String>,

    /// SMTP relay (overrides the configuration file)
    #[arg(long, env = "AUTOPAY_SMTP_HOST")]
    pub smtp_host: Option<String>,

    /// Write notifications as JSON documents into this directory instead of mailing them
    #[arg(long, conflicts_with = "log_only")]
    pub outbox: Option<PathBuf>,

    /// Only log notifications; nothing is mailed
    #[arg(long)]
    pub log_only: bool,

    /// Show the browser window
    #[arg(long)]
    pub headful: bool,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (warnings and errors only)
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Verbosity selected by `-q` / `-v`
    #[must_use]
    pub const fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}

impl fmt::Debug for Cli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cli")
            .field("portal_username", &self.portal_username)
            .field("portal_password", &"<redacted>")
            .field("mail_username", &self.mail_username)
            .field("mail_password", &"<redacted>")
            .field("to_address", &self.to_address)
            .field("browser_path", &self.browser_path)
            .field("config", &self.config)
            .field("login_url", &self.login_url)
            .field("smtp_host", &self.smtp_host)
            .field("outbox", &self.outbox)
            .field("log_only", &self.log_only)
            .field("headful", &self.headful)
            .field("json", &self.json)
            .field("log_json", &self.log_json)
            .field("verbose", &self.verbose)
            .field("quiet", &self.quiet)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod cli_tests {
        use super::*;

        const ARGS: [&str; 6] = ["autopay", "alice", "pw", "bot@example.com", "mailpw", "me@example.com"];

        #[test]
        fn test_parse_required_positionals() {
            let cli = Cli::parse_from(ARGS);
            assert_eq!(cli.portal_username, "alice");
            assert_eq!(cli.portal_password, "pw");
            assert_eq!(cli.mail_username, "bot@example.com");
            assert_eq!(cli.mail_password, "mailpw");
            assert_eq!(cli.to_address, "me@example.com");
            assert!(cli.browser_path.is_none());
            assert_eq!(cli.verbosity(), Verbosity::Normal);
        }

        #[test]
        fn test_parse_optional_browser_path() {
            let mut args = ARGS.to_vec();
            args.push("/opt/chromium/chrome");
            let cli = Cli::parse_from(args);
            assert_eq!(cli.browser_path, Some(PathBuf::from("/opt/chromium/chrome")));
        }

        #[test]
        fn test_four_positionals_is_an_error() {
            let err = Cli::try_parse_from(&ARGS[..5]).unwrap_err();
            assert!(err.use_stderr());
        }

        #[test]
        fn test_flags() {
            let mut args = ARGS.to_vec();
            args.extend(["--outbox", "/tmp/out", "--headful", "-vv", "--json"]);
            let cli = Cli::parse_from(args);
            assert_eq!(cli.outbox, Some(PathBuf::from("/tmp/out")));
            assert!(cli.headful);
            assert!(cli.json);
            assert_eq!(cli.verbosity(), Verbosity::Debug);
        }

        #[test]
        fn test_outbox_and_log_only_conflict() {
            let mut args = ARGS.to_vec();
            args.extend(["--outbox", "/tmp/out", "--log-only"]);
            assert!(Cli::try_parse_from(args).is_err());
        }

        #[test]
        fn test_debug_redacts_passwords() {
            let cli = Cli::parse_from(ARGS);
            let shown = format!("{cli:?}");
            assert!(shown.contains("alice"));
            assert!(!shown.contains("mailpw"));
            assert!(!shown.contains("\"pw\""));
            assert!(shown.contains("smtp_host"));
        }
    }
}
