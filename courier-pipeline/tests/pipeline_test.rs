//! End-to-end tests for the delivery pipeline: events in, scripted server
//! exchanges out, driven through the real engine and processor.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use courier_core::config::CourierConfig;
use courier_core::errors::{CourierError, PayloadError};
use courier_core::traits::{IHitProcessor, IHitQueue};
use courier_core::{ConsentStatus, Event, Hit, HitResult, QueueEntry, RequestContext, ResultEvent};
use courier_pipeline::{CompletionCallback, EdgeEngine, EdgeHitProcessor};
use test_fixtures::{
    consent_event, xdm_event, CapturingEventSink, MemoryHitQueue, MemoryKeyValueStore,
    ScriptedExchange, ScriptedTransport,
};

// ─── Helpers ───────────────────────────────────────────────

struct Pipeline {
    kv: Arc<MemoryKeyValueStore>,
    queue: Arc<MemoryHitQueue>,
    sink: Arc<CapturingEventSink>,
    transport: Arc<ScriptedTransport>,
    engine: EdgeEngine,
    processor: Arc<EdgeHitProcessor>,
}

fn pipeline() -> Pipeline {
    pipeline_on(Arc::new(MemoryKeyValueStore::new()))
}

fn pipeline_on(kv: Arc<MemoryKeyValueStore>) -> Pipeline {
    let queue = Arc::new(MemoryHitQueue::new());
    let sink = Arc::new(CapturingEventSink::new());
    let transport = Arc::new(ScriptedTransport::new());
    let engine = EdgeEngine::new(
        CourierConfig::default(),
        kv.clone(),
        queue.clone(),
        sink.clone(),
        transport.clone(),
    );
    let processor = engine.processor();
    Pipeline {
        kv,
        queue,
        sink,
        transport,
        engine,
        processor,
    }
}

fn context() -> RequestContext {
    RequestContext::new("config-1")
}

fn event_from(data: Value) -> Event {
    match data {
        Value::Object(map) => Event::new(map),
        _ => panic!("event data must be an object"),
    }
}

/// A completion callback writing its handles into the returned slot.
fn capture() -> (Arc<Mutex<Option<Vec<Value>>>>, CompletionCallback) {
    let slot: Arc<Mutex<Option<Vec<Value>>>> = Arc::new(Mutex::new(None));
    let writer = slot.clone();
    let callback: CompletionCallback = Box::new(move |handles| {
        *writer.lock().unwrap() = Some(handles);
    });
    (slot, callback)
}

// ─── Delivery and result routing ───────────────────────────

#[test]
fn test_delivered_batch_retires_and_attributes_results() {
    let p = pipeline();
    let first = xdm_event("commerce.purchases");
    let second = xdm_event("web.webpagedetails.pageViews");
    let first_id = first.id;
    let second_id = second.id;

    p.transport.push(ScriptedExchange::delivered(vec![json!({
        "handle": [
            { "type": "personalization:decisions", "payload": [{"scope": "__view__"}], "eventIndex": 1 },
            { "type": "identity:result", "payload": [{"id": "ecid-1"}] }
        ]
    })]));

    let (handles, callback) = capture();
    p.engine
        .submit_experience(vec![first, second], context(), Some(callback))
        .unwrap();
    assert_eq!(p.queue.drain(&*p.processor), 1);

    assert_eq!(p.queue.count(), 0);
    assert_eq!(p.transport.requests().len(), 1);

    let results = p.sink.results();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].event_id(), Some(second_id));
    assert_eq!(results[1].event_id(), Some(first_id));

    // The completion was registered for the first event; only handles
    // attributed to it are collected.
    let collected = handles.lock().unwrap().take().unwrap();
    assert_eq!(
        collected,
        vec![json!({ "type": "identity:result", "payload": [{"id": "ecid-1"}] })]
    );
}

#[test]
fn test_no_content_fires_completion_with_no_handles() {
    let p = pipeline();
    p.transport.push(ScriptedExchange::no_content());

    let (handles, callback) = capture();
    p.engine
        .submit_experience(vec![xdm_event("ping")], context(), Some(callback))
        .unwrap();
    assert_eq!(p.queue.drain(&*p.processor), 1);

    assert_eq!(handles.lock().unwrap().take(), Some(Vec::new()));
    assert!(p.sink.results().is_empty());
}

#[test]
fn test_interact_url_carries_config_and_request_id() {
    let p = pipeline();
    p.transport.push(ScriptedExchange::no_content());
    p.engine
        .submit_experience(vec![xdm_event("ping")], context(), None)
        .unwrap();
    p.queue.drain(&*p.processor);

    let url = p.transport.requests()[0].url.clone();
    assert!(url.starts_with(
        "https://edge.courier-data.net/ee/v1/interact?configId=config-1&requestId="
    ));
}

#[test]
fn test_store_handle_feeds_state_into_next_request() {
    let p = pipeline();
    p.transport.push(ScriptedExchange::delivered(vec![json!({
        "handle": [{
            "type": "state:store",
            "payload": [
                { "key": "kndctr_cluster", "value": "or2", "maxAge": 1800 },
                { "key": "kndctr_consent", "value": "in", "maxAge": 7200 }
            ]
        }]
    })]));
    p.transport.push(ScriptedExchange::no_content());

    p.engine
        .submit_experience(vec![xdm_event("first")], context(), None)
        .unwrap();
    p.engine
        .submit_experience(vec![xdm_event("second")], context(), None)
        .unwrap();
    assert_eq!(p.queue.drain(&*p.processor), 2);

    let requests = p.transport.requests();
    assert!(requests[0].body.pointer("/meta/state").is_none());
    let entries = requests[1].body.pointer("/meta/state/entries").unwrap();
    assert_eq!(entries.as_array().unwrap().len(), 2);
    assert_eq!(entries[0]["key"], "kndctr_cluster");
    assert_eq!(entries[0]["maxAge"], 1800);
}

#[test]
fn test_location_hint_routes_subsequent_requests() {
    let p = pipeline();
    p.transport.push(ScriptedExchange::delivered(vec![json!({
        "handle": [{
            "type": "locationHint:result",
            "payload": [
                { "scope": "EdgeNetwork", "hint": "or2", "ttlSeconds": 1800 },
                { "scope": "Target", "hint": "35", "ttlSeconds": 1800 }
            ]
        }]
    })]));
    p.transport.push(ScriptedExchange::no_content());

    p.engine
        .submit_experience(vec![xdm_event("first")], context(), None)
        .unwrap();
    assert_eq!(p.queue.drain(&*p.processor), 1);

    assert_eq!(p.engine.location_hint().unwrap(), Some("or2".to_string()));
    assert_eq!(p.sink.hints(), vec![Some("or2".to_string())]);

    p.engine
        .submit_experience(vec![xdm_event("second")], context(), None)
        .unwrap();
    assert_eq!(p.queue.drain(&*p.processor), 1);
    assert!(p.transport.requests()[1].url.contains("/ee/or2/v1/interact"));
}

#[test]
fn test_empty_server_hint_clears_routing() {
    let p = pipeline();
    p.engine.set_location_hint(Some("or2"), 1800).unwrap();

    p.transport.push(ScriptedExchange::delivered(vec![json!({
        "handle": [{
            "type": "locationHint:result",
            "payload": [{ "scope": "EdgeNetwork", "hint": "", "ttlSeconds": 1800 }]
        }]
    })]));
    p.engine
        .submit_experience(vec![xdm_event("ping")], context(), None)
        .unwrap();
    assert_eq!(p.queue.drain(&*p.processor), 1);

    assert_eq!(p.engine.location_hint().unwrap(), None);
    assert_eq!(p.sink.hints(), vec![Some("or2".to_string()), None]);

    // The next request goes out without a hint segment.
    p.transport.push(ScriptedExchange::no_content());
    p.engine
        .submit_experience(vec![xdm_event("after")], context(), None)
        .unwrap();
    assert_eq!(p.queue.drain(&*p.processor), 1);
    assert!(p.transport.requests()[1].url.contains("/ee/v1/interact"));
}

#[test]
fn test_second_batch_handles_land_in_both_caches() {
    let p = pipeline();
    p.transport.push(ScriptedExchange::no_content());
    p.transport.push(ScriptedExchange::delivered(vec![json!({
        "handle": [
            {
                "type": "state:store",
                "payload": [{ "key": "kndctr_session", "value": "s1", "maxAge": 60 }]
            },
            {
                "type": "locationHint:result",
                "payload": [{ "scope": "EdgeNetwork", "hint": "or2", "ttlSeconds": 1800 }]
            }
        ]
    })]));

    p.engine
        .submit_experience(vec![xdm_event("first")], context(), None)
        .unwrap();
    p.engine
        .submit_experience(vec![xdm_event("second")], context(), None)
        .unwrap();
    assert_eq!(p.queue.drain(&*p.processor), 2);

    assert_eq!(p.engine.location_hint().unwrap(), Some("or2".to_string()));

    // A third request echoes exactly the one store entry while it lives.
    p.transport.push(ScriptedExchange::no_content());
    p.engine
        .submit_experience(vec![xdm_event("third")], context(), None)
        .unwrap();
    assert_eq!(p.queue.drain(&*p.processor), 1);
    let entries = p.transport.requests()[2]
        .body
        .pointer("/meta/state/entries")
        .unwrap()
        .as_array()
        .unwrap()
        .clone();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["key"], "kndctr_session");
    assert_eq!(entries[0]["maxAge"], 60);
}

#[test]
fn test_host_hint_override_publishes_once_per_change() {
    let p = pipeline();
    p.engine.set_location_hint(Some("va6"), 1800).unwrap();
    p.engine.set_location_hint(Some("va6"), 1800).unwrap();
    assert_eq!(p.engine.location_hint().unwrap(), Some("va6".to_string()));
    assert_eq!(p.sink.hints(), vec![Some("va6".to_string())]);

    p.engine.set_location_hint(None, 0).unwrap();
    assert_eq!(p.sink.hints(), vec![Some("va6".to_string()), None]);
    assert_eq!(p.engine.location_hint().unwrap(), None);
}

#[test]
fn test_location_hint_survives_engine_restart() {
    let p = pipeline();
    p.engine.set_location_hint(Some("irl1"), 1800).unwrap();

    let restarted = pipeline_on(p.kv.clone());
    assert_eq!(
        restarted.engine.location_hint().unwrap(),
        Some("irl1".to_string())
    );
}

// ─── Retry ─────────────────────────────────────────────────

#[test]
fn test_recoverable_failure_keeps_head_and_honours_server_delay() {
    let p = pipeline();
    p.transport
        .push(ScriptedExchange::retry(Duration::from_secs(30)));
    p.transport.push(ScriptedExchange::no_content());

    let (handles, callback) = capture();
    p.engine
        .submit_experience(vec![xdm_event("ping")], context(), Some(callback))
        .unwrap();

    assert_eq!(
        p.queue.process_next(&*p.processor),
        Some(HitResult::Retry {
            after: Duration::from_secs(30)
        })
    );
    assert_eq!(p.queue.count(), 1);
    let entry = p.queue.entries()[0].clone();
    assert_eq!(p.processor.retry_interval(&entry), Duration::from_secs(30));
    assert!(handles.lock().unwrap().is_none());

    assert_eq!(p.queue.process_next(&*p.processor), Some(HitResult::Done));
    assert_eq!(p.queue.count(), 0);
    assert_eq!(handles.lock().unwrap().take(), Some(Vec::new()));

    // Each attempt goes out under a fresh request id.
    let requests = p.transport.requests();
    assert_eq!(requests.len(), 2);
    assert_ne!(requests[0].url, requests[1].url);

    // Retired entries fall back to the default interval.
    assert_eq!(p.processor.retry_interval(&entry), Duration::from_secs(5));
}

#[test]
fn test_unrecoverable_failure_retires_entry_and_surfaces_error() {
    let p = pipeline();
    p.transport.push(ScriptedExchange::failed(json!({
        "errors": [{ "status": 400, "title": "Invalid datastream", "eventIndex": 0 }]
    })));

    let event = xdm_event("ping");
    let event_id = event.id;
    let (handles, callback) = capture();
    p.engine
        .submit_experience(vec![event], context(), Some(callback))
        .unwrap();
    assert_eq!(p.queue.drain(&*p.processor), 1);

    assert_eq!(p.queue.count(), 0);
    let results = p.sink.results();
    assert_eq!(results.len(), 1);
    match &results[0] {
        ResultEvent::Error {
            warning,
            event_id: attributed,
            ..
        } => {
            assert!(!*warning);
            assert_eq!(*attributed, Some(event_id));
        }
        other => panic!("expected error result, got {other:?}"),
    }
    assert_eq!(handles.lock().unwrap().take(), Some(Vec::new()));
}

#[test]
fn test_server_warnings_attribute_by_report_index() {
    let p = pipeline();
    p.transport.push(ScriptedExchange::delivered(vec![json!({
        "warnings": [{ "title": "Profile not found", "report": { "eventIndex": 1 } }]
    })]));

    let first = xdm_event("a");
    let second = xdm_event("b");
    let second_id = second.id;
    p.engine
        .submit_experience(vec![first, second], context(), None)
        .unwrap();
    assert_eq!(p.queue.drain(&*p.processor), 1);

    let results = p.sink.results();
    assert_eq!(results.len(), 1);
    match &results[0] {
        ResultEvent::Error {
            warning, event_id, ..
        } => {
            assert!(*warning);
            assert_eq!(*event_id, Some(second_id));
        }
        other => panic!("expected warning result, got {other:?}"),
    }
}

// ─── Consent gating ────────────────────────────────────────

#[test]
fn test_bootstrap_without_authority_opens_the_gate() {
    let p = pipeline();
    p.engine.bootstrap(false).unwrap();
    assert!(!p.queue.is_suspended());
    assert_eq!(p.engine.consent_status().unwrap(), ConsentStatus::Yes);
}

#[test]
fn test_pending_consent_suspends_until_preferences_arrive() {
    let p = pipeline();
    p.engine.bootstrap(true).unwrap();
    assert!(p.queue.is_suspended());
    assert_eq!(p.engine.consent_status().unwrap(), ConsentStatus::Pending);

    p.engine
        .submit_experience(vec![xdm_event("held")], context(), None)
        .unwrap();
    assert_eq!(p.engine.pending_hits(), 1);
    assert_eq!(p.queue.process_next(&*p.processor), None);

    p.transport.push(ScriptedExchange::no_content());
    p.transport.push(ScriptedExchange::no_content());
    p.engine
        .update_consent(consent_event("y"), context())
        .unwrap();
    assert!(!p.queue.is_suspended());
    assert_eq!(p.queue.drain(&*p.processor), 2);

    let requests = p.transport.requests();
    assert!(requests[0].url.contains("/v1/interact"));
    assert!(requests[1].url.contains("/v1/privacy/set-consent"));
}

#[test]
fn test_denied_consent_clears_queue_and_refuses_new_events() {
    let p = pipeline();
    p.engine.bootstrap(false).unwrap();
    p.engine
        .submit_experience(vec![xdm_event("doomed")], context(), None)
        .unwrap();
    assert_eq!(p.queue.count(), 1);

    p.engine
        .update_consent(consent_event("n"), context())
        .unwrap();
    assert_eq!(p.engine.consent_status().unwrap(), ConsentStatus::No);
    // Only the consent update itself is still queued.
    let entries = p.queue.entries();
    assert_eq!(entries.len(), 1);
    assert!(matches!(entries[0].hit().unwrap(), Hit::Consent { .. }));

    // New experience events are refused at the door, completing empty.
    let (handles, callback) = capture();
    p.engine
        .submit_experience(vec![xdm_event("refused")], context(), Some(callback))
        .unwrap();
    assert_eq!(p.queue.count(), 1);
    assert_eq!(handles.lock().unwrap().take(), Some(Vec::new()));

    // The consent update still goes out.
    p.transport.push(ScriptedExchange::no_content());
    assert_eq!(p.queue.drain(&*p.processor), 1);
    assert_eq!(p.transport.requests().len(), 1);
}

#[test]
fn test_regranted_consent_reopens_the_gate() {
    let p = pipeline();
    p.engine.bootstrap(true).unwrap();
    p.engine
        .update_consent(consent_event("n"), context())
        .unwrap();
    p.engine
        .update_consent(consent_event("y"), context())
        .unwrap();
    assert_eq!(p.engine.consent_status().unwrap(), ConsentStatus::Yes);

    p.transport.push(ScriptedExchange::no_content());
    p.transport.push(ScriptedExchange::no_content());
    p.transport.push(ScriptedExchange::no_content());
    p.engine
        .submit_experience(vec![xdm_event("flows-again")], context(), None)
        .unwrap();
    // Both consent updates and the new event all go out.
    assert_eq!(p.queue.drain(&*p.processor), 3);
}

#[test]
fn test_consent_update_without_preferences_is_rejected() {
    let p = pipeline();
    p.engine.bootstrap(false).unwrap();
    let err = p
        .engine
        .update_consent(xdm_event("not-consent"), context())
        .unwrap_err();
    assert!(matches!(
        err,
        CourierError::Payload(PayloadError::MissingConsents)
    ));
    assert_eq!(p.queue.count(), 0);
    assert_eq!(p.engine.consent_status().unwrap(), ConsentStatus::Yes);
}

// ─── Dropped hits ──────────────────────────────────────────

#[test]
fn test_empty_batch_is_rejected_up_front() {
    let p = pipeline();
    let err = p
        .engine
        .submit_experience(Vec::new(), context(), None)
        .unwrap_err();
    assert!(matches!(
        err,
        CourierError::Payload(PayloadError::EmptyBatch)
    ));
}

#[test]
fn test_invalid_custom_path_drops_hit_before_send() {
    let p = pipeline();
    let event = event_from(json!({
        "xdm": { "eventType": "media.ping" },
        "request": { "path": "va/v1/sessionstart" }
    }));
    let (handles, callback) = capture();
    p.engine
        .submit_experience(vec![event], context(), Some(callback))
        .unwrap();

    assert_eq!(p.queue.drain(&*p.processor), 1);
    assert!(p.transport.requests().is_empty());
    assert_eq!(handles.lock().unwrap().take(), Some(Vec::new()));
}

#[test]
fn test_blank_config_id_drops_hit_before_send() {
    let p = pipeline();
    let (handles, callback) = capture();
    p.engine
        .submit_experience(
            vec![xdm_event("ping")],
            RequestContext::new("   "),
            Some(callback),
        )
        .unwrap();

    assert_eq!(p.queue.drain(&*p.processor), 1);
    assert!(p.transport.requests().is_empty());
    assert_eq!(handles.lock().unwrap().take(), Some(Vec::new()));
}

#[test]
fn test_poison_entry_never_blocks_the_queue() {
    let p = pipeline();
    assert!(p.queue.enqueue(QueueEntry {
        id: Uuid::new_v4().to_string(),
        timestamp: Utc::now(),
        payload: b"{ not json".to_vec(),
    }));
    p.engine
        .submit_experience(vec![xdm_event("after")], context(), None)
        .unwrap();

    p.transport.push(ScriptedExchange::no_content());
    assert_eq!(p.queue.drain(&*p.processor), 2);
    assert_eq!(p.transport.requests().len(), 1);
}

// ─── Routing overrides ─────────────────────────────────────

#[test]
fn test_custom_request_path_reroutes_the_batch() {
    let p = pipeline();
    p.transport.push(ScriptedExchange::no_content());
    let event = event_from(json!({
        "xdm": { "eventType": "media.sessionStart" },
        "request": { "path": "/va/v1/sessionstart" }
    }));
    p.engine
        .submit_experience(vec![event], context(), None)
        .unwrap();
    assert_eq!(p.queue.drain(&*p.processor), 1);

    let url = p.transport.requests()[0].url.clone();
    assert!(url.contains("/ee/va/v1/sessionstart?configId="));
}

#[test]
fn test_datastream_override_swaps_config_id_and_records_original() {
    let p = pipeline();
    p.transport.push(ScriptedExchange::no_content());
    let event = event_from(json!({
        "xdm": { "eventType": "ping" },
        "config": {
            "datastreamIdOverride": "override-id",
            "datastreamConfigOverride": {
                "com_adobe_analytics": { "reportSuites": ["rs-override"] }
            }
        }
    }));
    p.engine
        .submit_experience(vec![event], context(), None)
        .unwrap();
    assert_eq!(p.queue.drain(&*p.processor), 1);

    let request = &p.transport.requests()[0];
    assert!(request.url.contains("configId=override-id"));
    assert_eq!(
        request
            .body
            .pointer("/meta/sdkConfig/datastream/original")
            .unwrap(),
        "config-1"
    );
    assert_eq!(
        request
            .body
            .pointer("/meta/configOverrides/com_adobe_analytics/reportSuites/0")
            .unwrap(),
        "rs-override"
    );
}

// ─── Identity reset ────────────────────────────────────────

#[test]
fn test_identity_reset_clears_cached_store_state() {
    let p = pipeline();
    p.transport.push(ScriptedExchange::delivered(vec![json!({
        "handle": [{
            "type": "state:store",
            "payload": [{ "key": "kndctr_identity", "value": "abc", "maxAge": 34128000 }]
        }]
    })]));
    p.engine
        .submit_experience(vec![xdm_event("first")], context(), None)
        .unwrap();
    assert_eq!(p.queue.drain(&*p.processor), 1);

    p.engine.submit_identity_reset(Utc::now()).unwrap();
    assert_eq!(p.queue.drain(&*p.processor), 1);

    p.transport.push(ScriptedExchange::no_content());
    p.engine
        .submit_experience(vec![xdm_event("second")], context(), None)
        .unwrap();
    assert_eq!(p.queue.drain(&*p.processor), 1);

    // The post-reset request carries no state echo.
    assert!(p.transport.requests()[1]
        .body
        .pointer("/meta/state")
        .is_none());
}
