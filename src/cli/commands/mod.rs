pub mod identity;
pub mod logging;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

pub const ARG_PORT: &str = "port";
pub const ARG_SITE_DIR: &str = "site-dir";
pub const ARG_DEFAULT_SCHEME: &str = "default-scheme";
pub const ARG_REDIRECT_SIGNED_IN: &str = "redirect-signed-in";
pub const ARG_TRUST_FORWARDED_HEADERS: &str = "trust-forwarded-headers";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("fleetgate")
        .about("Access-control gate for fleet management")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("FLEETGATE_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_SITE_DIR)
                .long(ARG_SITE_DIR)
                .help("Directory served behind the gate")
                .env("FLEETGATE_SITE_DIR")
                .default_value("public"),
        )
        .arg(
            Arg::new(ARG_DEFAULT_SCHEME)
                .long(ARG_DEFAULT_SCHEME)
                .help("Scheme for redirect URLs when X-Forwarded-Proto is absent")
                .env("FLEETGATE_DEFAULT_SCHEME")
                .default_value("https")
                .value_parser(["http", "https"]),
        )
        .arg(
            Arg::new(ARG_REDIRECT_SIGNED_IN)
                .long(ARG_REDIRECT_SIGNED_IN)
                .help("Redirect signed-in users away from the sign-in and sign-up pages")
                .env("FLEETGATE_REDIRECT_SIGNED_IN")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_TRUST_FORWARDED_HEADERS)
                .long(ARG_TRUST_FORWARDED_HEADERS)
                .help("Trust X-Forwarded-Host/Proto for redirect URLs (behind a proxy)")
                .env("FLEETGATE_TRUST_FORWARDED_HEADERS")
                .action(clap::ArgAction::SetTrue),
        );

    let command = identity::with_args(command);
    logging::with_args(command)
}
