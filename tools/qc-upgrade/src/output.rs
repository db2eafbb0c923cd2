//! Plain-text rendering of command results.

use qc_signal::rpc::TxResponse;
use qc_signal::{PendingUpgrade, VersionTally};
use shared_types::AppVersion;

pub fn format_tally(version: AppVersion, tally: &VersionTally) -> String {
    let quorum = if tally.has_quorum() { "reached" } else { "not reached" };
    format!(
        "version:            {version}\n\
         voting power:       {}\n\
         threshold:          {}\n\
         total voting power: {}\n\
         quorum:             {quorum}",
        tally.voting_power, tally.threshold, tally.total_voting_power
    )
}

pub fn format_pending(upgrade: Option<&PendingUpgrade>) -> String {
    match upgrade {
        Some(upgrade) => format!(
            "target version:     {}\nactivation height:  {}",
            upgrade.app_version, upgrade.activation_height
        ),
        None => "none".to_string(),
    }
}

pub fn format_tx(response: &TxResponse) -> String {
    if response.log.is_empty() {
        format!("code: {}", response.code)
    } else {
        format!("code: {}\nlog:  {}", response.code, response.log)
    }
}
