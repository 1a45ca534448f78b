//! Autopay CLI: pay the due utility bill and report the outcome
//!
//! ## Usage
//!
//! ```bash
//! autopay <portal-user> <portal-pass> <mail-user> <mail-pass> <to-address> [browser-path] \
//!     --config autopay.yaml
//! ```
//!
//! The outcome is mailed through `mail.smtp_host` by default; `--outbox DIR`
//! writes it to a directory instead and `--log-only` just logs it.
//!
//! Exits 1 when the arguments or configuration are unusable or the browser
//! cannot be started. Once a portal session starts the outcome is reported by
//! notification and the exit code is 0.

use autopay::{PortalConfig, RunSummary};
use autopay_cli::{init_tracing, resolve_portal_config, Cli, CliError, CliResult};
use clap::Parser;
use std::process::ExitCode;
use tracing::error;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version land here too
            let code = if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
            let _ = e.print();
            return code;
        }
    };

    init_tracing(cli.verbosity(), cli.log_json);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "autopay could not start");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> CliResult<()> {
    let config = resolve_portal_config(cli)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let summary = runtime.block_on(execute(cli, config))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}

#[cfg(feature = "browser")]
async fn execute(cli: &Cli, config: PortalConfig) -> CliResult<RunSummary> {
    use autopay::{ChromiumDriver, Credentials, FormAuthenticator, MailAccount, SessionController};
    use autopay_cli::Delivery;

    let account = MailAccount::new(
        cli.mail_username.clone(),
        cli.mail_password.clone(),
        cli.to_address.clone(),
    );
    if account.to_address.trim().is_empty() {
        return Err(CliError::invalid_argument("to-address must not be empty"));
    }
    let credentials = Credentials::new(cli.portal_username.clone(), cli.portal_password.clone());
    let notifier = Delivery::select(cli, &config).notifier(&account)?;

    let mut driver = ChromiumDriver::launch(config.browser.clone()).await?;

    let authenticator = FormAuthenticator::new(config.portal.login.clone(), config.waiter());
    let controller =
        SessionController::new(config, authenticator, notifier, account.to_address.clone());

    let summary = controller.run(&mut driver, &credentials).await;
    tracing::info!(
        status = ?summary.status,
        notified = summary.notified,
        evidence = summary.evidence_captured,
        "run finished"
    );
    Ok(summary)
}

#[cfg(not(feature = "browser"))]
async fn execute(_cli: &Cli, _config: PortalConfig) -> CliResult<RunSummary> {
    Err(CliError::config(
        "autopay was built without the `browser` feature",
    ))
}
