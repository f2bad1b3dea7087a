//! Maps validated CLI arguments to the action the binary runs.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{ARG_DSN, ARG_PORT, auth};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(3000);
    let dsn = matches.get_one::<String>(ARG_DSN).cloned();

    let signing_secret = matches
        .get_one::<String>(auth::ARG_SIGNING_SECRET)
        .cloned()
        .map(SecretString::from);

    let token_ttl_seconds = matches
        .get_one::<u64>(auth::ARG_TOKEN_TTL_SECONDS)
        .copied()
        .context("missing required argument: --token-ttl-seconds")?;

    let frontend_base_url = matches
        .get_one::<String>(auth::ARG_FRONTEND_BASE_URL)
        .cloned()
        .context("missing required argument: --frontend-base-url")?;

    Ok(Action::Server(Args {
        port,
        dsn,
        signing_secret,
        token_ttl_seconds,
        frontend_base_url,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn server_action_from_args() -> Result<()> {
        let matches = crate::cli::commands::new().try_get_matches_from(vec![
            "tokengate",
            "--port",
            "4000",
            "--signing-secret",
            "s3cr3t",
            "--frontend-base-url",
            "https://app.tokengate.dev",
        ])?;

        let Action::Server(args) = handler(&matches)?;
        assert_eq!(args.port, 4000);
        assert_eq!(args.dsn, None);
        assert_eq!(
            args.signing_secret
                .as_ref()
                .map(|secret| secret.expose_secret().to_string()),
            Some("s3cr3t".to_string())
        );
        assert_eq!(args.token_ttl_seconds, 3600);
        assert_eq!(args.frontend_base_url, "https://app.tokengate.dev");
        Ok(())
    }

    #[test]
    fn debug_output_hides_secret() -> Result<()> {
        let matches = crate::cli::commands::new().try_get_matches_from(vec![
            "tokengate",
            "--signing-secret",
            "do-not-print",
        ])?;
        let action = handler(&matches)?;
        assert!(!format!("{action:?}").contains("do-not-print"));
        Ok(())
    }
}
