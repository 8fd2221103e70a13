use crate::{
    access::Session,
    api::{
        self,
        identity::{
            IdentityConfig, IdentityProvider, RemoteIdentityProvider, StaticIdentityProvider,
        },
        GateState,
    },
    cli::commands::identity::{Options, Source},
};
use anyhow::{Context, Result};
use axum::Router;
use std::{path::PathBuf, sync::Arc, time::Duration};
use tower_http::services::ServeDir;
use tracing::{info, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub site_dir: PathBuf,
    pub default_scheme: String,
    pub redirect_signed_in: bool,
    pub trust_forwarded_headers: bool,
    pub identity: Options,
}

fn identity_provider(options: Options) -> Result<Arc<dyn IdentityProvider>> {
    match options.source {
        Source::Remote {
            url,
            secret_key,
            timeout_seconds,
        } => {
            let config = IdentityConfig::new(url)
                .with_secret_key(secret_key)
                .with_session_cookie(options.session_cookie)
                .with_timeout(Duration::from_secs(timeout_seconds));
            info!(endpoint = config.endpoint(), "Using remote identity provider");
            let provider =
                RemoteIdentityProvider::new(config).context("Failed to build identity provider")?;
            Ok(Arc::new(provider))
        }
        Source::Static {
            user_id,
            organization_id,
        } => {
            warn!(user_id = %user_id, "Every request is treated as signed in");
            Ok(Arc::new(StaticIdentityProvider::new(Session::signed_in(
                user_id,
                organization_id,
            ))))
        }
    }
}

/// Serve the site directory behind the gate.
///
/// # Errors
/// Returns an error if the identity provider cannot be built or the server fails.
pub async fn execute(args: Args) -> Result<()> {
    if !args.site_dir.is_dir() {
        warn!(site_dir = %args.site_dir.display(), "Site directory not found");
    }

    let gate = GateState::new(identity_provider(args.identity)?)
        .with_default_scheme(args.default_scheme)
        .with_redirect_signed_in(args.redirect_signed_in)
        .with_trust_forwarded_headers(args.trust_forwarded_headers);

    let content = Router::new().fallback_service(
        ServeDir::new(&args.site_dir).append_index_html_on_directories(true),
    );

    api::new(args.port, api::router(content, gate)).await
}
