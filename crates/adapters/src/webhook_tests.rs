// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use yare::parameterized;

fn note(kind: EventKind, severity: Severity) -> Notification {
    Notification {
        program_name: "game-server".to_string(),
        kind,
        details: "details here".to_string(),
        severity,
    }
}

#[parameterized(
    discord = { "https://discord.com/api/webhooks/1/abc", true },
    discord_upper = { "https://DISCORD.com/api/webhooks/1/abc", true },
    plain = { "https://hooks.example.com/notify", false },
)]
fn discord_detection(url: &str, expected: bool) {
    assert_eq!(is_discord_url(url), expected);
}

#[test]
fn discord_payload_has_embed_fields() {
    let payload = discord_payload(&note(EventKind::Crash, Severity::Error), "2026-01-01T00:00:00Z", None);

    assert_eq!(payload["content"], "Program crashed");
    let embed = &payload["embeds"][0];
    assert_eq!(embed["title"], "Program crashed");
    assert_eq!(embed["color"], 15_158_332);
    assert_eq!(embed["fields"][0]["name"], "Details");
    assert_eq!(embed["fields"][1]["value"], "2026-01-01T00:00:00Z");
    assert_eq!(embed["fields"][2]["value"], "ERROR");
    assert!(payload.get("thread_name").is_none());
}

#[test]
fn first_send_carries_thread_name() {
    let payload = discord_payload(
        &note(EventKind::Start, Severity::Success),
        "2026-01-01T00:00:00Z",
        Some("game-server"),
    );
    assert_eq!(payload["thread_name"], "game-server");
    assert_eq!(payload["embeds"][0]["color"], 3_066_993);
}

#[test]
fn empty_details_render_as_dash() {
    let mut n = note(EventKind::Stop, Severity::Warning);
    n.details.clear();
    let payload = discord_payload(&n, "t", None);
    assert_eq!(payload["embeds"][0]["fields"][0]["value"], "-");
}

#[test]
fn generic_payload_is_flat() {
    let payload = generic_payload(&note(EventKind::Stop, Severity::Warning), "2026-01-01T00:00:00Z");
    assert_eq!(
        payload,
        json!({
            "program_name": "game-server",
            "event_type": "stop",
            "status": "warning",
            "details": "details here",
            "timestamp": "2026-01-01T00:00:00Z",
            "message": "Program 'game-server' - stop",
        })
    );
}

#[parameterized(
    thread_id = { json!({"thread": {"id": "111"}}), Some("111") },
    channel_id = { json!({"channel_id": "222"}), Some("222") },
    bare_id = { json!({"id": "333"}), Some("333") },
    numeric_id = { json!({"id": 444}), Some("444") },
    prefers_thread = { json!({"thread": {"id": "1"}, "channel_id": "2", "id": "3"}), Some("1") },
    nothing = { json!({"ok": true}), None },
)]
fn thread_id_extraction(body: serde_json::Value, expected: Option<&str>) {
    assert_eq!(extract_thread_id(&body).as_deref(), expected);
}

#[test]
fn append_query_handles_existing_query() {
    assert_eq!(append_query("http://x/hook", "thread_id", "9"), "http://x/hook?thread_id=9");
    assert_eq!(
        append_query("http://x/hook?wait=true", "thread_id", "9"),
        "http://x/hook?wait=true&thread_id=9"
    );
}

#[tokio::test]
async fn test_against_unreachable_destination_reports_failure() {
    let dir = tempfile::tempdir().unwrap();
    let notifier = WebhookNotifier::new(std::sync::Arc::new(ThreadBindings::new(
        dir.path().join("threads.json"),
    )))
    .unwrap();

    // Reserved TEST-NET-1 address; connection is refused or times out.
    let (ok, message) = notifier.test("http://192.0.2.1:9/hook").await;
    assert!(!ok);
    assert!(!message.is_empty());
}
