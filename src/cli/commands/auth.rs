use clap::{Arg, Command};

pub const ARG_SIGNING_SECRET: &str = "signing-secret";
pub const ARG_TOKEN_TTL_SECONDS: &str = "token-ttl-seconds";
pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SIGNING_SECRET)
                .long(ARG_SIGNING_SECRET)
                .help("HMAC secret used to sign session tokens")
                .long_help(
                    "HMAC secret used to sign session tokens. When unset a random secret is generated at startup, so tokens do not survive a restart.",
                )
                .env("TOKENGATE_SIGNING_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_TOKEN_TTL_SECONDS)
                .long(ARG_TOKEN_TTL_SECONDS)
                .help("Session token and cookie lifetime in seconds")
                .env("TOKENGATE_TOKEN_TTL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Frontend origin allowed by CORS; https enables Secure cookies")
                .env("TOKENGATE_FRONTEND_BASE_URL")
                .default_value("http://localhost:4200"),
        )
}
