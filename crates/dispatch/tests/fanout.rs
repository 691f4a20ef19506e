//! End-to-end trigger behavior against in-memory collaborators.

use async_trait::async_trait;
use beacon_core::error::{BeaconError, BeaconResult};
use beacon_core::{
    AccountRecord, Contact, DispatchConfig, IneligibleReason, PushMessage, ReasonCategory,
    TriggerContext, UnreachableReason,
};
use beacon_dispatch::{trigger, DirectoryIndex, Dispatcher, Report};
use beacon_provider::{
    AccountDirectory, ContactStore, InMemoryContactStore, InMemoryDirectory, PushGateway,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const USER: &str = "me";

/// Records every token it is asked to deliver. Tokens listed in `fail`
/// error out, tokens listed in `hang` never finish in time and tokens
/// listed in `panic` crash the send.
#[derive(Default)]
struct ScriptedGateway {
    sent: Mutex<Vec<String>>,
    fail: Vec<String>,
    hang: Vec<String>,
    panic: Vec<String>,
}

impl ScriptedGateway {
    fn failing(tokens: &[&str]) -> Self {
        Self {
            fail: tokens.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    fn hanging(tokens: &[&str]) -> Self {
        Self {
            hang: tokens.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    fn panicking(tokens: &[&str]) -> Self {
        Self {
            panic: tokens.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushGateway for ScriptedGateway {
    async fn send(&self, message: &PushMessage) -> BeaconResult<()> {
        self.sent.lock().unwrap().push(message.token.clone());
        if self.hang.contains(&message.token) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if self.panic.contains(&message.token) {
            panic!("gateway bug");
        }
        if self.fail.contains(&message.token) {
            return Err(BeaconError::Gateway("connection reset".into()));
        }
        Ok(())
    }
}

struct DownDirectory;

#[async_trait]
impl AccountDirectory for DownDirectory {
    async fn lookup_all(&self) -> BeaconResult<Vec<AccountRecord>> {
        Err(BeaconError::Directory("connection refused".into()))
    }

    async fn lookup_by_id(&self, _account_id: &str) -> BeaconResult<Option<AccountRecord>> {
        Err(BeaconError::Directory("connection refused".into()))
    }
}

struct DownStore;

#[async_trait]
impl ContactStore for DownStore {
    async fn list(&self, _user_id: &str) -> BeaconResult<Vec<Contact>> {
        Err(BeaconError::ContactStore("quota exceeded".into()))
    }
}

fn token(name: &str) -> String {
    format!("ExponentPushToken[{name}]")
}

/// The five reference scenarios: Alice delivered, Bob unresolved, Cara
/// without a token, Dan opted out, Eve whose push fails. Frank comes after
/// Eve to prove processing continues.
async fn scenario() -> (InMemoryContactStore, InMemoryDirectory) {
    let store = InMemoryContactStore::new();
    for (name, value) in [
        ("Alice", "alice@x.com"),
        ("Bob", "555-1234"),
        ("Cara", "cara@x.com"),
        ("Dan", "dan@x.com"),
        ("Eve", "eve@x.com"),
        ("Frank", "frank@x.com"),
    ] {
        store
            .add(USER, Contact::new(name, value).unwrap())
            .await
            .unwrap();
    }

    let directory = InMemoryDirectory::with_accounts(vec![
        AccountRecord::new("alice")
            .with_email("alice@x.com")
            .with_push_token(token("alice"))
            .with_notifications(true),
        AccountRecord::new("cara").with_email("cara@x.com"),
        AccountRecord::new("dan")
            .with_email("dan@x.com")
            .with_push_token(token("dan"))
            .with_notifications(false),
        AccountRecord::new("eve")
            .with_email("eve@x.com")
            .with_push_token(token("eve")),
        AccountRecord::new("frank")
            .with_email("FRANK@x.com")
            .with_push_token(token("frank")),
    ]);

    (store, directory)
}

fn dispatcher(gateway: Arc<ScriptedGateway>, max_concurrent: usize) -> Dispatcher {
    let config = DispatchConfig {
        max_concurrent,
        timeout_ms: 200,
        ..Default::default()
    };
    Dispatcher::new(gateway, config).unwrap()
}

fn ctx() -> TriggerContext {
    TriggerContext::new(USER, "me@x.com")
}

#[tokio::test]
async fn reference_scenarios_sequential() {
    let (store, directory) = scenario().await;
    let gateway = Arc::new(ScriptedGateway::failing(&[token("eve").as_str()]));
    let d = dispatcher(gateway.clone(), 1);

    let outcome = trigger(&ctx(), &store, &directory, &d).await.unwrap();

    let names: Vec<&str> = outcome.attempts.iter().map(|a| a.contact.name.as_str()).collect();
    assert_eq!(names, ["Alice", "Bob", "Cara", "Dan", "Eve", "Frank"]);

    let a = &outcome.attempts;
    assert!(a[0].is_delivered());
    assert_eq!(a[1].reason(), Some(&UnreachableReason::Unresolved));
    assert_eq!(
        a[2].reason(),
        Some(&UnreachableReason::Ineligible(IneligibleReason::MissingToken))
    );
    assert_eq!(
        a[3].reason(),
        Some(&UnreachableReason::Ineligible(IneligibleReason::OptedOut))
    );
    assert!(matches!(
        a[4].reason(),
        Some(UnreachableReason::DeliveryFailed(msg)) if msg.contains("connection reset")
    ));
    assert!(a[5].is_delivered(), "processing continues after a failure");

    // Only eligible accounts reach the gateway, in list order.
    assert_eq!(
        gateway.sent(),
        vec![token("alice"), token("eve"), token("frank")]
    );
    assert_eq!(outcome.delivered_count(), 2);
    assert_eq!(outcome.unreachable_count(), 4);
}

#[tokio::test]
async fn concurrent_dispatch_matches_sequential() {
    let (store, directory) = scenario().await;
    let gateway = Arc::new(ScriptedGateway::failing(&[token("eve").as_str()]));
    let d = dispatcher(gateway.clone(), 4);

    let outcome = trigger(&ctx(), &store, &directory, &d).await.unwrap();

    let delivered: Vec<&str> = outcome.delivered().map(|a| a.contact.name.as_str()).collect();
    assert_eq!(delivered, ["Alice", "Frank"]);

    let unreachable: Vec<&str> = outcome.unreachable().map(|(c, _)| c.name.as_str()).collect();
    assert_eq!(unreachable, ["Bob", "Cara", "Dan", "Eve"]);

    let mut sent = gateway.sent();
    sent.sort();
    assert_eq!(sent, vec![token("alice"), token("eve"), token("frank")]);
}

#[tokio::test]
async fn partition_is_total_and_disjoint() {
    for concurrency in [1, 3] {
        let store = InMemoryContactStore::new();
        let mut accounts = Vec::new();
        for i in 0..25 {
            store
                .add(USER, Contact::new(&format!("c{i}"), &format!("c{i}@x.com")).unwrap())
                .await
                .unwrap();
            // Every third contact has no account, every fifth push fails.
            if i % 3 != 0 {
                accounts.push(
                    AccountRecord::new(format!("u{i}"))
                        .with_email(format!("c{i}@x.com"))
                        .with_push_token(token(&i.to_string())),
                );
            }
        }
        let failing: Vec<String> = (0..25)
            .filter(|i| i % 5 == 0)
            .map(|i| token(&i.to_string()))
            .collect();
        let failing: Vec<&str> = failing.iter().map(String::as_str).collect();
        let gateway = Arc::new(ScriptedGateway::failing(&failing));
        let directory = InMemoryDirectory::with_accounts(accounts);

        let outcome = trigger(&ctx(), &store, &directory, &dispatcher(gateway, concurrency))
            .await
            .unwrap();

        assert_eq!(outcome.len(), 25);
        assert_eq!(outcome.delivered_count() + outcome.unreachable_count(), 25);

        let mut ids: Vec<&str> = outcome
            .delivered()
            .map(|a| a.contact.id.as_str())
            .chain(outcome.unreachable().map(|(c, _)| c.id.as_str()))
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 25, "each contact appears exactly once");
    }
}

#[tokio::test]
async fn slow_gateway_call_times_out() {
    let (store, directory) = scenario().await;
    let gateway = Arc::new(ScriptedGateway::hanging(&[token("alice").as_str()]));
    let d = dispatcher(gateway.clone(), 1);

    let outcome = trigger(&ctx(), &store, &directory, &d).await.unwrap();

    assert!(matches!(
        outcome.attempts[0].reason(),
        Some(UnreachableReason::DeliveryFailed(msg)) if msg.contains("timed out")
    ));
    assert!(outcome.attempts[5].is_delivered());
}

#[tokio::test]
async fn panicking_send_only_fails_its_contact() {
    for concurrency in [1, 4] {
        let (store, directory) = scenario().await;
        let gateway = Arc::new(ScriptedGateway::panicking(&[token("eve").as_str()]));
        let d = dispatcher(gateway.clone(), concurrency);

        let outcome = trigger(&ctx(), &store, &directory, &d).await.unwrap();

        assert_eq!(outcome.len(), 6, "concurrency {concurrency}");
        assert!(matches!(
            outcome.attempts[4].reason(),
            Some(UnreachableReason::DeliveryFailed(msg)) if msg.contains("panicked")
        ));
        assert!(outcome.attempts[0].is_delivered());
        assert!(
            outcome.attempts[5].is_delivered(),
            "Frank is still notified at concurrency {concurrency}"
        );
        assert_eq!(outcome.delivered_count(), 2);
        assert_eq!(outcome.unreachable_count(), 4);
    }
}

#[tokio::test]
async fn directory_outage_aborts_trigger() {
    let (store, _) = scenario().await;
    let gateway = Arc::new(ScriptedGateway::default());
    let err = trigger(&ctx(), &store, &DownDirectory, &dispatcher(gateway.clone(), 1))
        .await
        .unwrap_err();

    assert!(matches!(err, BeaconError::Reachability(_)));
    assert!(err.to_string().contains("connection refused"));
    assert!(gateway.sent().is_empty());
}

#[tokio::test]
async fn contact_store_outage_aborts_trigger() {
    let (_, directory) = scenario().await;
    let gateway = Arc::new(ScriptedGateway::default());
    let err = trigger(&ctx(), &DownStore, &directory, &dispatcher(gateway, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, BeaconError::Reachability(_)));
}

#[tokio::test]
async fn no_contacts_is_empty_outcome() {
    let (_, directory) = scenario().await;
    let store = InMemoryContactStore::new();
    let gateway = Arc::new(ScriptedGateway::default());
    let outcome = trigger(&ctx(), &store, &directory, &dispatcher(gateway, 1))
        .await
        .unwrap();
    assert!(outcome.is_empty());
}

#[tokio::test]
async fn phone_contact_resolves_by_phone() {
    let contacts = vec![Contact::new("Bob", " 555-1234 ").unwrap()];
    let index = DirectoryIndex::build(vec![AccountRecord::new("bob")
        .with_phone("555-1234")
        .with_push_token(token("bob"))]);
    let gateway = Arc::new(ScriptedGateway::default());

    let outcome = dispatcher(gateway.clone(), 1)
        .dispatch(&contacts, "me@x.com", &index)
        .await;

    assert!(outcome.attempts[0].is_delivered());
    assert_eq!(gateway.sent(), vec![token("bob")]);
}

#[tokio::test]
async fn report_summarizes_scenario() {
    let (store, directory) = scenario().await;
    let gateway = Arc::new(ScriptedGateway::failing(&[token("eve").as_str()]));
    let outcome = trigger(&ctx(), &store, &directory, &dispatcher(gateway, 2))
        .await
        .unwrap();

    let report = Report::build(&ctx(), &outcome, Duration::from_millis(3));
    assert_eq!(report.delivered.len(), 2);
    assert_eq!(report.count(ReasonCategory::Unresolved), 1);
    assert_eq!(report.count(ReasonCategory::Ineligible), 2);
    assert_eq!(report.count(ReasonCategory::DeliveryFailed), 1);

    let (summary, rows) = report.to_rows(&outcome);
    assert_eq!(summary.total_contacts, 6);
    assert_eq!(rows.len(), 6);
}
