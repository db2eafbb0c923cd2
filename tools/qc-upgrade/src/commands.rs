//! Subcommand execution against any [`UpgradeApi`].

use shared_types::{AppVersion, ValidatorAddress};
use thiserror::Error;
use tracing::info;

use crate::api::{ApiError, UpgradeApi};
use crate::output::{format_pending, format_tally, format_tx};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("`{0}` submits a transaction and needs --from <address>")]
    MissingSigner(&'static str),
}

/// One CLI invocation, already parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Tally { version: AppVersion },
    Pending,
    Signal { version: AppVersion },
    TryUpgrade,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Tally { .. } => "tally",
            Command::Pending => "pending",
            Command::Signal { .. } => "signal",
            Command::TryUpgrade => "try-upgrade",
        }
    }

    /// Runs the command and returns the text to print.
    pub async fn run(
        &self,
        api: &dyn UpgradeApi,
        from: Option<ValidatorAddress>,
    ) -> Result<String, CommandError> {
        match self {
            Command::Tally { version } => {
                let tally = api.version_tally(*version).await?;
                Ok(format_tally(*version, &tally))
            }
            Command::Pending => {
                let upgrade = api.pending_upgrade().await?;
                Ok(format_pending(upgrade.as_ref()))
            }
            Command::Signal { version } => {
                let signer = from.ok_or(CommandError::MissingSigner(self.name()))?;
                info!(%signer, version = *version, "Submitting version signal");
                let response = api.signal_version(signer, *version).await?;
                Ok(format_tx(&response))
            }
            Command::TryUpgrade => {
                let signer = from.ok_or(CommandError::MissingSigner(self.name()))?;
                info!(%signer, "Submitting try-upgrade");
                let response = api.try_upgrade(signer).await?;
                Ok(format_tx(&response))
            }
        }
    }
}
