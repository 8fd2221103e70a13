use crate::cli::{
    actions::{server, Action},
    commands::{
        identity, ARG_DEFAULT_SCHEME, ARG_PORT, ARG_REDIRECT_SIGNED_IN, ARG_SITE_DIR,
        ARG_TRUST_FORWARDED_HEADERS,
    },
};
use crate::api::gate::DEFAULT_SCHEME;
use anyhow::Result;
use std::path::PathBuf;

/// Build the action from parsed arguments.
///
/// # Errors
/// Returns an error if the identity provider is not configured.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    Ok(Action::Server(server::Args {
        port: matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080),
        site_dir: matches
            .get_one::<String>(ARG_SITE_DIR)
            .map_or_else(|| PathBuf::from("public"), PathBuf::from),
        default_scheme: matches
            .get_one::<String>(ARG_DEFAULT_SCHEME)
            .cloned()
            .unwrap_or_else(|| DEFAULT_SCHEME.to_string()),
        redirect_signed_in: matches.get_flag(ARG_REDIRECT_SIGNED_IN),
        trust_forwarded_headers: matches.get_flag(ARG_TRUST_FORWARDED_HEADERS),
        identity: identity::Options::parse(matches)?,
    }))
}
