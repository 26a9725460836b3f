//! End-to-end tests for the save-timeseries node with mock collaborators

#![allow(clippy::disallowed_methods)] // Integration test - unwrap is acceptable

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;
use uuid::Uuid;

use telemetry_ingest::{
    IngestError, NodeContext, PersistenceSettingsConfig, SaveDecision, TelemetryService,
    TenantProfile, TenantProfileProvider, TimeseriesNode, TimeseriesNodeConfig,
    TimeseriesSaveRequest,
};
use telemetry_model::{
    CustomerId, DecodedTelemetry, EntityId, JsonTelemetryDecoder, MsgMetadata, MsgType, RuleMsg,
    TelemetryDecoder, TenantId, METADATA_TS_KEY, METADATA_TTL_KEY,
};

/// Terminal outcome captured from the node context
enum Outcome {
    Success(RuleMsg),
    Failure(RuleMsg, IngestError),
}

struct MockContext {
    tenant_id: TenantId,
    outcomes: Mutex<Vec<Outcome>>,
}

impl MockContext {
    fn new() -> Self {
        Self {
            tenant_id: TenantId::random(),
            outcomes: Mutex::new(Vec::new()),
        }
    }

    async fn wait_for_outcomes(&self, count: usize) {
        for _ in 0..200 {
            if self.outcomes.lock().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!(
            "expected {count} outcomes, saw {}",
            self.outcomes.lock().len()
        );
    }
}

impl NodeContext for MockContext {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    fn tell_success(&self, msg: RuleMsg) {
        self.outcomes.lock().push(Outcome::Success(msg));
    }

    fn tell_failure(&self, msg: RuleMsg, error: IngestError) {
        self.outcomes.lock().push(Outcome::Failure(msg, error));
    }
}

struct MockTelemetryService {
    requests: Mutex<Vec<TimeseriesSaveRequest>>,
    fail: AtomicBool,
}

impl MockTelemetryService {
    fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl TelemetryService for MockTelemetryService {
    async fn save_timeseries(&self, request: TimeseriesSaveRequest) -> anyhow::Result<()> {
        self.requests.lock().push(request);
        if self.fail.load(Ordering::SeqCst) {
            Err(anyhow!("storage unavailable"))
        } else {
            Ok(())
        }
    }
}

struct MockProfiles {
    sender: watch::Sender<TenantProfile>,
}

impl MockProfiles {
    fn with_ttl_days(days: u64) -> Self {
        let (sender, _) = watch::channel(TenantProfile {
            default_storage_ttl_days: days,
        });
        Self { sender }
    }
}

impl TenantProfileProvider for MockProfiles {
    fn watch_profile(&self, _tenant_id: TenantId) -> watch::Receiver<TenantProfile> {
        self.sender.subscribe()
    }
}

/// Decoder wrapper counting invocations, for short-circuit assertions
struct CountingDecoder {
    inner: JsonTelemetryDecoder,
    calls: AtomicUsize,
}

impl CountingDecoder {
    fn new() -> Self {
        Self {
            inner: JsonTelemetryDecoder::new(),
            calls: AtomicUsize::new(0),
        }
    }
}

impl TelemetryDecoder for CountingDecoder {
    fn decode(&self, payload: &str, default_ts: i64) -> telemetry_model::Result<DecodedTelemetry> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.decode(payload, default_ts)
    }
}

struct Harness {
    ctx: Arc<MockContext>,
    telemetry: Arc<MockTelemetryService>,
    decoder: Arc<CountingDecoder>,
    node: TimeseriesNode<MockContext>,
}

fn harness_with(config: TimeseriesNodeConfig, tenant_ttl_days: u64) -> Harness {
    let ctx = Arc::new(MockContext::new());
    let telemetry = Arc::new(MockTelemetryService::new());
    let decoder = Arc::new(CountingDecoder::new());
    let profiles = MockProfiles::with_ttl_days(tenant_ttl_days);
    let node = TimeseriesNode::new(
        Arc::clone(&ctx),
        telemetry.clone() as Arc<dyn TelemetryService>,
        &profiles,
        decoder.clone() as Arc<dyn TelemetryDecoder>,
        config,
    );
    Harness {
        ctx,
        telemetry,
        decoder,
        node,
    }
}

fn harness() -> Harness {
    harness_with(TimeseriesNodeConfig::default(), 1)
}

fn telemetry_msg(payload: &str, metadata: &[(&str, &str)]) -> RuleMsg {
    let mut md = MsgMetadata::default();
    for (key, value) in metadata {
        md.put(*key, *value);
    }
    RuleMsg {
        id: Uuid::new_v4(),
        msg_type: MsgType::PostTelemetryRequest,
        originator: EntityId::random(),
        customer_id: CustomerId::random(),
        tenant_id: TenantId::random(),
        metadata: md,
        data: payload.to_string(),
        ts: 1_700_000_000_000,
    }
}

#[tokio::test]
async fn saves_telemetry_with_message_ttl_override() {
    let h = harness();
    let msg = telemetry_msg(
        r#"{"temperature": 21.5, "humidity": 40}"#,
        &[(METADATA_TTL_KEY, "5"), (METADATA_TS_KEY, "123456")],
    );
    let originator = msg.originator;

    h.node.on_msg(msg);
    h.ctx.wait_for_outcomes(1).await;

    assert!(matches!(h.ctx.outcomes.lock()[0], Outcome::Success(_)));
    let requests = h.telemetry.requests.lock();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.entity_id, originator);
    assert_eq!(request.ttl, 5);
    assert_eq!(request.decision, SaveDecision::SAVE_ALL);
    assert_eq!(request.entries.len(), 2);
    // Samples carry the metadata timestamp
    assert!(request.entries.iter().all(|e| e.ts == 123_456));
}

#[tokio::test]
async fn node_default_ttl_applies_without_override() {
    let h = harness_with(
        TimeseriesNodeConfig {
            default_ttl: 30,
            ..Default::default()
        },
        1,
    );
    h.node.on_msg(telemetry_msg(r#"{"a": 1}"#, &[]));
    h.ctx.wait_for_outcomes(1).await;
    assert_eq!(h.telemetry.requests.lock()[0].ttl, 30);
}

#[tokio::test]
async fn zero_ttl_defers_to_tenant_default() {
    // Node default 0, tenant default 1 day
    let h = harness_with(TimeseriesNodeConfig::default(), 1);
    h.node.on_msg(telemetry_msg(r#"{"a": 1}"#, &[]));
    h.ctx.wait_for_outcomes(1).await;
    assert_eq!(h.telemetry.requests.lock()[0].ttl, 86_400);

    // An explicit "0" override behaves the same
    let h = harness_with(
        TimeseriesNodeConfig {
            default_ttl: 30,
            ..Default::default()
        },
        1,
    );
    h.node.on_msg(telemetry_msg(r#"{"a": 1}"#, &[(METADATA_TTL_KEY, "0")]));
    h.ctx.wait_for_outcomes(1).await;
    assert_eq!(h.telemetry.requests.lock()[0].ttl, 86_400);
}

#[tokio::test]
async fn malformed_ttl_fails_the_message() {
    let h = harness();
    h.node
        .on_msg(telemetry_msg(r#"{"a": 1}"#, &[(METADATA_TTL_KEY, "soon")]));
    h.ctx.wait_for_outcomes(1).await;
    assert!(matches!(
        h.ctx.outcomes.lock()[0],
        Outcome::Failure(_, IngestError::MalformedTtl { .. })
    ));
    assert!(h.telemetry.requests.lock().is_empty());
}

#[tokio::test]
async fn unsupported_msg_type_fails_the_message() {
    let h = harness();
    let mut msg = telemetry_msg(r#"{"a": 1}"#, &[]);
    msg.msg_type = MsgType::PostAttributesRequest;

    h.node.on_msg(msg);
    h.ctx.wait_for_outcomes(1).await;

    assert!(matches!(
        h.ctx.outcomes.lock()[0],
        Outcome::Failure(_, IngestError::UnsupportedMsgType(_))
    ));
    assert_eq!(h.decoder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_body_fails_when_persistence_required() {
    let h = harness();
    h.node.on_msg(telemetry_msg("{}", &[]));
    h.ctx.wait_for_outcomes(1).await;
    assert!(matches!(
        h.ctx.outcomes.lock()[0],
        Outcome::Failure(_, IngestError::EmptyBody(_))
    ));
    assert!(h.telemetry.requests.lock().is_empty());
}

#[tokio::test]
async fn suppressed_message_short_circuits_before_decoding() {
    let h = harness_with(
        TimeseriesNodeConfig {
            persistence_settings: PersistenceSettingsConfig::Deduplicate {
                deduplication_interval_secs: 60,
            },
            ..Default::default()
        },
        1,
    );
    let first = telemetry_msg(r#"{"a": 1}"#, &[(METADATA_TS_KEY, "1000")]);
    let mut second = telemetry_msg("{}", &[(METADATA_TS_KEY, "2000")]);
    second.originator = first.originator;

    h.node.on_msg(first);
    h.ctx.wait_for_outcomes(1).await;
    assert_eq!(h.decoder.calls.load(Ordering::SeqCst), 1);

    // Inside the window: acknowledged without decoding, even though the
    // payload would otherwise fail as an empty body.
    h.node.on_msg(second);
    h.ctx.wait_for_outcomes(2).await;
    assert!(matches!(h.ctx.outcomes.lock()[1], Outcome::Success(_)));
    assert_eq!(h.decoder.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.telemetry.requests.lock().len(), 1);
}

#[tokio::test]
async fn downstream_failure_is_forwarded() {
    let h = harness();
    h.telemetry.fail.store(true, Ordering::SeqCst);
    h.node.on_msg(telemetry_msg(r#"{"a": 1}"#, &[]));
    h.ctx.wait_for_outcomes(1).await;
    assert!(matches!(
        h.ctx.outcomes.lock()[0],
        Outcome::Failure(_, IngestError::Persistence(_))
    ));
}

#[tokio::test]
async fn web_sockets_only_submits_without_persistence_flags() {
    let h = harness_with(
        TimeseriesNodeConfig {
            persistence_settings: PersistenceSettingsConfig::WebSocketsOnly,
            ..Default::default()
        },
        1,
    );
    h.node.on_msg(telemetry_msg(r#"{"a": 1}"#, &[]));
    h.ctx.wait_for_outcomes(1).await;
    assert_eq!(h.telemetry.requests.lock()[0].decision, SaveDecision::WS_ONLY);
}

#[tokio::test]
async fn server_ts_overrides_metadata_timestamp() {
    let h = harness_with(
        TimeseriesNodeConfig {
            use_server_ts: true,
            ..Default::default()
        },
        1,
    );
    let before = chrono::Utc::now().timestamp_millis();
    h.node.on_msg(telemetry_msg(
        r#"{"a": 1}"#,
        &[(METADATA_TS_KEY, "123456")],
    ));
    h.ctx.wait_for_outcomes(1).await;
    let after = chrono::Utc::now().timestamp_millis();

    let requests = h.telemetry.requests.lock();
    let ts = requests[0].entries[0].ts;
    // Samples carry processing wall-clock time, not the metadata timestamp
    assert_ne!(ts, 123_456);
    assert!((before..=after).contains(&ts), "ts {ts} outside [{before}, {after}]");
}

#[tokio::test]
async fn multi_timestamp_payload_flattens_in_order() {
    let h = harness();
    h.node.on_msg(telemetry_msg(
        r#"[
            {"ts": 2000, "values": {"b": 2}},
            {"ts": 1000, "values": {"a": 1, "c": 3}}
        ]"#,
        &[],
    ));
    h.ctx.wait_for_outcomes(1).await;

    let requests = h.telemetry.requests.lock();
    let entries = &requests[0].entries;
    assert_eq!(entries.len(), 3);
    // Buckets ordered by timestamp, insertion order within a bucket
    assert_eq!(entries[0].ts, 1_000);
    assert_eq!(entries[0].entry.key, "a");
    assert_eq!(entries[1].entry.key, "c");
    assert_eq!(entries[2].ts, 2_000);
    assert_eq!(entries[2].entry.key, "b");
}

#[tokio::test]
async fn node_built_from_persisted_document() {
    let ctx = Arc::new(MockContext::new());
    let telemetry = Arc::new(MockTelemetryService::new());
    let profiles = MockProfiles::with_ttl_days(1);
    let document = serde_json::json!({
        "persistenceSettings": {"type": "ON_EVERY_MESSAGE"},
        "defaultTTL": 7,
        "useServerTs": false,
    });

    let node = TimeseriesNode::from_document(
        Arc::clone(&ctx),
        telemetry.clone() as Arc<dyn TelemetryService>,
        &profiles,
        &document,
    )
    .unwrap();

    node.on_msg(telemetry_msg(r#"{"a": 1}"#, &[]));
    ctx.wait_for_outcomes(1).await;
    assert_eq!(telemetry.requests.lock()[0].ttl, 7);
    node.shutdown();
}
