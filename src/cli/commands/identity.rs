use crate::api::identity::DEFAULT_SESSION_COOKIE;
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_IDENTITY_URL: &str = "identity-url";
pub const ARG_IDENTITY_SECRET_KEY: &str = "identity-secret-key";
pub const ARG_IDENTITY_TIMEOUT_SECONDS: &str = "identity-timeout-seconds";
pub const ARG_SESSION_COOKIE: &str = "session-cookie";
pub const ARG_IDENTITY_STATIC_USER: &str = "identity-static-user";
pub const ARG_IDENTITY_STATIC_ORG: &str = "identity-static-org";

/// Where sessions come from.
#[derive(Debug, Clone)]
pub enum Source {
    Remote {
        url: String,
        secret_key: Option<SecretString>,
        timeout_seconds: u64,
    },
    Static {
        user_id: String,
        organization_id: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct Options {
    pub source: Source,
    pub session_cookie: String,
}

impl Options {
    /// Parse identity provider arguments from matches.
    ///
    /// # Errors
    /// Returns an error if neither a provider URL nor a static user is configured.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let read = |id: &str| -> Option<String> {
            matches
                .get_one::<String>(id)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let source = if let Some(user_id) = read(ARG_IDENTITY_STATIC_USER) {
            Source::Static {
                user_id,
                organization_id: read(ARG_IDENTITY_STATIC_ORG),
            }
        } else {
            Source::Remote {
                url: read(ARG_IDENTITY_URL).ok_or_else(|| {
                    anyhow::anyhow!("missing required argument: --{ARG_IDENTITY_URL}")
                })?,
                secret_key: read(ARG_IDENTITY_SECRET_KEY).map(SecretString::from),
                timeout_seconds: matches
                    .get_one::<u64>(ARG_IDENTITY_TIMEOUT_SECONDS)
                    .copied()
                    .unwrap_or(5),
            }
        };

        Ok(Self {
            source,
            session_cookie: read(ARG_SESSION_COOKIE)
                .unwrap_or_else(|| DEFAULT_SESSION_COOKIE.to_string()),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_IDENTITY_URL)
                .long(ARG_IDENTITY_URL)
                .help("Identity provider session endpoint")
                .env("FLEETGATE_IDENTITY_URL")
                .required_unless_present(ARG_IDENTITY_STATIC_USER),
        )
        .arg(
            Arg::new(ARG_IDENTITY_SECRET_KEY)
                .long(ARG_IDENTITY_SECRET_KEY)
                .help("Secret key sent to the identity provider as a bearer token")
                .env("FLEETGATE_IDENTITY_SECRET_KEY")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_IDENTITY_TIMEOUT_SECONDS)
                .long(ARG_IDENTITY_TIMEOUT_SECONDS)
                .help("Timeout for identity provider requests")
                .env("FLEETGATE_IDENTITY_TIMEOUT_SECONDS")
                .default_value("5")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_SESSION_COOKIE)
                .long(ARG_SESSION_COOKIE)
                .help("Name of the cookie carrying the session token")
                .env("FLEETGATE_SESSION_COOKIE")
                .default_value(DEFAULT_SESSION_COOKIE),
        )
        .arg(
            Arg::new(ARG_IDENTITY_STATIC_USER)
                .long(ARG_IDENTITY_STATIC_USER)
                .help("Treat every request as signed in by this user (local development only)")
                .env("FLEETGATE_IDENTITY_STATIC_USER")
                .conflicts_with(ARG_IDENTITY_URL),
        )
        .arg(
            Arg::new(ARG_IDENTITY_STATIC_ORG)
                .long(ARG_IDENTITY_STATIC_ORG)
                .help("Organization of the static user")
                .env("FLEETGATE_IDENTITY_STATIC_ORG")
                .requires(ARG_IDENTITY_STATIC_USER)
                .conflicts_with(ARG_IDENTITY_URL),
        )
}
