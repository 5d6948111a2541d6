//! CLI argument definitions for shipquote.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rates` | Quote a shipment across every configured carrier |
//!
//! # Environment
//!
//! Carrier credentials and tuning come from `SHIPQUOTE_*` variables, optionally
//! loaded from a `.env` file. `RUST_LOG` controls diagnostics on stderr.
//!
//! # Examples
//!
//! ```bash
//! # Offline quote against the built-in rate card
//! shipquote rates --offline \
//!   --origin-street "500 W 2nd St" --origin-city Austin --origin-state TX --origin-postal 78701 \
//!   --destination-street "1437 Bannock St" --destination-city Denver --destination-state CO \
//!   --destination-postal 80202 --package 4.5:12x9x6 --package 2 --pretty
//! ```

use clap::{Args, Parser, Subcommand};
use shipquote_core::{Address, Package, RateRequest, ServiceLevel};

/// Multi-carrier shipping rate quotes.
#[derive(Debug, Parser)]
#[command(
    name = "shipquote",
    author,
    version,
    about = "Multi-carrier shipping rate quotes",
    long_about = "shipquote asks every configured carrier for rates in parallel and prints \
one normalized JSON document. Carriers that fail are listed under `failures` \
without hiding the quotes of carriers that succeeded.\n\
\n\
Exit codes: 0 ok, 2 invalid input, 3 some carriers failed, 4 configuration error."
)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch normalized rate quotes for a shipment.
    ///
    /// # Examples
    ///
    ///   shipquote rates --offline --origin-postal 78701 ... --package 5
    ///   shipquote rates ... --package 4.5:12x9x6 --service two_day
    Rates(RatesArgs),
}

/// Arguments for the `rates` command.
#[derive(Debug, Args)]
pub struct RatesArgs {
    /// Origin street line; repeat for up to three lines.
    #[arg(long = "origin-street", required = true)]
    pub origin_street: Vec<String>,
    #[arg(long)]
    pub origin_city: String,
    /// Two-letter state or province code.
    #[arg(long)]
    pub origin_state: String,
    #[arg(long)]
    pub origin_postal: String,
    #[arg(long, default_value = "US")]
    pub origin_country: String,

    /// Destination street line; repeat for up to three lines.
    #[arg(long = "destination-street", required = true)]
    pub destination_street: Vec<String>,
    #[arg(long)]
    pub destination_city: String,
    #[arg(long)]
    pub destination_state: String,
    #[arg(long)]
    pub destination_postal: String,
    #[arg(long, default_value = "US")]
    pub destination_country: String,

    /// Package as WEIGHT or WEIGHT:LxWxH; repeat for multi-piece shipments.
    #[arg(long = "package", required = true)]
    pub packages: Vec<Package>,

    /// Restrict quotes to one service level (ground, three_day, two_day, overnight).
    #[arg(long)]
    pub service: Option<ServiceLevel>,

    /// Quote against the built-in rate card instead of live carriers.
    #[arg(long, default_value_t = false)]
    pub offline: bool,
}

impl RatesArgs {
    pub fn to_request(&self) -> RateRequest {
        let origin = Address::new(
            self.origin_street.clone(),
            &self.origin_city,
            &self.origin_state,
            &self.origin_postal,
            &self.origin_country,
        );
        let destination = Address::new(
            self.destination_street.clone(),
            &self.destination_city,
            &self.destination_state,
            &self.destination_postal,
            &self.destination_country,
        );

        let request = RateRequest::new(origin, destination, self.packages.clone());
        match self.service {
            Some(level) => request.with_service_level(level),
            None => request,
        }
    }
}
