//! One beacon trigger: load contacts → snapshot directory → fan out.

use crate::dispatcher::Dispatcher;
use crate::resolver::DirectoryIndex;
use beacon_core::error::{BeaconError, BeaconResult};
use beacon_core::{FanoutOutcome, TriggerContext};
use beacon_provider::{AccountDirectory, ContactStore};

/// Runs a full trigger for `ctx.user_id`.
///
/// Contact store or directory failures abort with
/// [`BeaconError::Reachability`]; an unavailable collaborator must not look
/// like "nobody to notify". Per-contact failures are part of the outcome.
pub async fn trigger(
    ctx: &TriggerContext,
    contacts: &dyn ContactStore,
    directory: &dyn AccountDirectory,
    dispatcher: &Dispatcher,
) -> BeaconResult<FanoutOutcome> {
    tracing::info!(user_id = %ctx.user_id, "beacon triggered");

    let list = contacts.list(&ctx.user_id).await.map_err(|e| {
        tracing::error!(user_id = %ctx.user_id, error = %e, "failed to load contacts");
        BeaconError::Reachability(format!("contacts unavailable: {e}"))
    })?;

    if list.is_empty() {
        tracing::warn!(user_id = %ctx.user_id, "no contacts saved, nothing to notify");
        return Ok(FanoutOutcome::default());
    }

    let accounts = directory.lookup_all().await.map_err(|e| {
        tracing::error!(error = %e, "failed to load account directory");
        BeaconError::Reachability(format!("account directory unavailable: {e}"))
    })?;

    let index = DirectoryIndex::build(accounts);
    Ok(dispatcher.dispatch(&list, &ctx.display_name, &index).await)
}
