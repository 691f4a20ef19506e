//! Push eligibility of a resolved account. Pure, no I/O.

use beacon_core::{AccountRecord, Eligibility, IneligibleReason};

/// Eligible iff the account has not opted out and carries a token starting
/// with `token_prefix`. Opt-out is reported first when both fail. An
/// eligible verdict borrows the checked token.
pub fn check<'a>(account: &'a AccountRecord, token_prefix: &str) -> Eligibility<'a> {
    if !account.notifications_enabled() {
        return Eligibility::Ineligible(IneligibleReason::OptedOut);
    }
    match account.push_token.as_deref() {
        None => Eligibility::Ineligible(IneligibleReason::MissingToken),
        Some(token) if token.starts_with(token_prefix) => Eligibility::Eligible(token),
        Some(_) => Eligibility::Ineligible(IneligibleReason::MalformedToken),
    }
}

#[inline]
pub fn is_eligible(account: &AccountRecord, token_prefix: &str) -> bool {
    check(account, token_prefix).is_eligible()
}
