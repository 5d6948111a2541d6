mod rates;

use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use crate::cli::{Cli, Command};
use crate::error::CliError;

/// Rendered command output plus whether some carriers failed.
pub struct CommandResult {
    pub document: Value,
    pub partial: bool,
}

pub async fn run(cli: &Cli) -> Result<CommandResult, CliError> {
    let request_id = Uuid::new_v4();

    match &cli.command {
        Command::Rates(args) => {
            rates::run(args, request_id)
                .instrument(tracing::info_span!("rates", %request_id))
                .await
        }
    }
}
