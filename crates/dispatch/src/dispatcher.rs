//! Fan-out dispatcher.
//!
//! Classifies every contact (resolve → eligibility) up front, then sends
//! one push per eligible account. A failed or timed-out send only marks its
//! own contact unreachable. Every send runs on its own task, so a
//! panicking gateway is recorded against that contact alone. With
//! `max_concurrent > 1` sends run on a `JoinSet` throttled by a semaphore;
//! attempts are always returned in contact-list order.

use crate::eligibility;
use crate::resolver::DirectoryIndex;
use beacon_core::error::BeaconResult;
use beacon_core::{
    Contact, DispatchConfig, Eligibility, FanoutOutcome, NotificationAttempt, PushMessage,
    UnreachableReason,
};
use beacon_provider::PushGateway;
use std::sync::Arc;
use std::time::Duration;

const TASK_PANICKED: &str = "worker task panicked";

/// Sends beacon notifications through a [`PushGateway`].
///
/// ```ignore
/// let dispatcher = Dispatcher::new(Arc::new(gateway), DispatchConfig::default())?;
/// let outcome = dispatcher.dispatch(&contacts, "me@x.com", &index).await;
/// ```
pub struct Dispatcher {
    gateway: Arc<dyn PushGateway>,
    config: DispatchConfig,
}

/// A contact that passed resolution and eligibility.
struct PlannedSend {
    slot: usize,
    account_id: String,
    message: PushMessage,
}

impl Dispatcher {
    pub fn new(gateway: Arc<dyn PushGateway>, config: DispatchConfig) -> BeaconResult<Self> {
        config.validate()?;
        Ok(Self { gateway, config })
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Notifies every reachable contact. Never fails as a whole: each
    /// contact ends up delivered or unreachable.
    pub async fn dispatch(
        &self,
        contacts: &[Contact],
        sender: &str,
        index: &DirectoryIndex,
    ) -> FanoutOutcome {
        let body = self.config.render_body(sender);
        let mut slots: Vec<Option<NotificationAttempt>> = vec![None; contacts.len()];
        let mut planned = Vec::new();

        for (slot, contact) in contacts.iter().enumerate() {
            let Some(account) = index.resolve(contact) else {
                tracing::debug!(contact = %contact.name, "no registered account");
                slots[slot] = Some(NotificationAttempt::unreachable(
                    contact.clone(),
                    UnreachableReason::Unresolved,
                ));
                continue;
            };

            match eligibility::check(account, &self.config.token_prefix) {
                Eligibility::Ineligible(reason) => {
                    tracing::debug!(
                        contact = %contact.name,
                        account_id = %account.account_id,
                        reason = reason.as_str(),
                        "account not eligible"
                    );
                    slots[slot] = Some(NotificationAttempt::unreachable(
                        contact.clone(),
                        UnreachableReason::Ineligible(reason),
                    ));
                }
                Eligibility::Eligible(token) => {
                    planned.push(PlannedSend {
                        slot,
                        account_id: account.account_id.clone(),
                        message: PushMessage {
                            token: token.to_string(),
                            title: self.config.title.clone(),
                            body: body.clone(),
                        },
                    });
                }
            }
        }

        tracing::info!(
            contacts = contacts.len(),
            eligible = planned.len(),
            concurrency = self.config.max_concurrent,
            "fanning out"
        );

        let sends = if self.config.max_concurrent <= 1 {
            self.send_sequential(planned).await
        } else {
            self.send_concurrent(planned).await
        };

        for (slot, account_id, result) in sends {
            let contact = contacts[slot].clone();
            slots[slot] = Some(match result {
                Ok(()) => NotificationAttempt::delivered(contact, account_id),
                Err(msg) => {
                    tracing::warn!(contact = %contact.name, %account_id, error = %msg, "push failed");
                    NotificationAttempt::unreachable(contact, UnreachableReason::DeliveryFailed(msg))
                }
            });
        }

        // A slot is only empty if its pooled worker task died.
        let attempts: Vec<NotificationAttempt> = slots
            .into_iter()
            .zip(contacts)
            .map(|(attempt, contact)| {
                attempt.unwrap_or_else(|| {
                    NotificationAttempt::unreachable(
                        contact.clone(),
                        UnreachableReason::DeliveryFailed(TASK_PANICKED.into()),
                    )
                })
            })
            .collect();

        let outcome = FanoutOutcome::new(attempts);
        tracing::info!(
            delivered = outcome.delivered_count(),
            unreachable = outcome.unreachable_count(),
            "fan-out done"
        );
        outcome
    }

    async fn send_sequential(
        &self,
        planned: Vec<PlannedSend>,
    ) -> Vec<(usize, String, Result<(), String>)> {
        let timeout = self.config.timeout();
        let mut results = Vec::with_capacity(planned.len());
        for p in planned {
            let gateway = self.gateway.clone();
            let message = p.message;
            let handle =
                tokio::spawn(async move { deliver(gateway.as_ref(), &message, timeout).await });
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!(error = %e, "push task panicked");
                    Err(TASK_PANICKED.to_string())
                }
            };
            results.push((p.slot, p.account_id, result));
        }
        results
    }

    async fn send_concurrent(
        &self,
        planned: Vec<PlannedSend>,
    ) -> Vec<(usize, String, Result<(), String>)> {
        let timeout = self.config.timeout();
        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.config.max_concurrent));
        let mut tasks = tokio::task::JoinSet::new();
        let total = planned.len();

        for p in planned {
            let gateway = self.gateway.clone();
            let sem = semaphore.clone();
            tasks.spawn(async move {
                let result = match sem.acquire_owned().await {
                    Ok(_permit) => deliver(gateway.as_ref(), &p.message, timeout).await,
                    Err(e) => Err(format!("worker pool closed: {e}")),
                };
                (p.slot, p.account_id, result)
            });
        }

        let mut results = Vec::with_capacity(total);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(r) => results.push(r),
                Err(e) => tracing::warn!(error = %e, "push task panicked"),
            }
        }
        results
    }
}

/// One gateway call bounded by `timeout`. Errors are flattened to text.
async fn deliver(
    gateway: &dyn PushGateway,
    message: &PushMessage,
    timeout: Duration,
) -> Result<(), String> {
    match tokio::time::timeout(timeout, gateway.send(message)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("timed out after {}ms", timeout.as_millis())),
    }
}
