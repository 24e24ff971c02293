//! 세션 재연결/하트비트/라우팅 통합 테스트.
//!
//! 가짜 트랜스포트 + 멈춘 가상 시간으로 타이머 동작을 결정적으로 검증한다.

mod common;

use assert_matches::assert_matches;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{ConnectOutcome, MockTransport};
use hublink_core::config::SessionTuning;
use hublink_core::error::SendError;
use hublink_core::models::message::{Envelope, Inbound, Outbound};
use hublink_core::models::role::Role;
use hublink_core::models::session::ConnectionStatus;
use hublink_network::session::SessionClient;

const LIMIT: Duration = Duration::from_secs(10);

fn session_for(role: Role, transport: Arc<MockTransport>) -> SessionClient {
    let url = format!("ws://localhost:7070{}", role.path());
    SessionClient::with_transport(url, role, SessionTuning::default(), transport).unwrap()
}

async fn wait_status(session: &SessionClient, want: ConnectionStatus, limit: Duration) {
    let mut rx = session.watch_status();
    let result = tokio::time::timeout(limit, async {
        loop {
            if *rx.borrow_and_update() == want {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    })
    .await;
    assert!(
        result.is_ok(),
        "상태 {want:?} 대기 시간 초과 (현재 {:?})",
        session.status()
    );
}

// ---- 시나리오 A: connect → JOIN → USER_LIST_UPDATE 라우팅 ----

#[tokio::test(start_paused = true)]
async fn scenario_a_join_then_user_list() {
    let transport = MockTransport::new();
    let session = session_for(Role::Chat, Arc::clone(&transport));
    let mut users_rx = session.router().subscribe("USER_LIST_UPDATE");

    session.connect("alice").await;
    wait_status(&session, ConnectionStatus::Connected, LIMIT).await;

    let link = transport.wait_for_link(0, LIMIT).await;
    let join = link.next_sent(LIMIT).await.expect("JOIN 미전송");
    let join: serde_json::Value = serde_json::from_str(&join).unwrap();
    assert_eq!(
        join,
        serde_json::json!({"type": "JOIN", "payload": {"username": "alice"}})
    );

    link.push_text(r#"{"type":"USER_LIST_UPDATE","payload":{"users":["alice"]}}"#)
        .await;

    let msg = tokio::time::timeout(LIMIT, users_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        msg,
        Inbound::UserListUpdate {
            users: vec!["alice".into()]
        }
    );
}

// ---- 시나리오 B: 비계획 종료(1006) 후 같은 URL/identity로 재연결 ----

#[tokio::test(start_paused = true)]
async fn scenario_b_reconnect_preserves_url_and_identity() {
    let transport = MockTransport::new();
    let session = session_for(Role::Chat, Arc::clone(&transport));

    session.connect("alice").await;
    let link0 = transport.wait_for_link(0, LIMIT).await;
    assert!(link0.next_sent(LIMIT).await.unwrap().contains("JOIN"));

    link0.push_close(1006).await;
    wait_status(&session, ConnectionStatus::Reconnecting, LIMIT).await;

    // 첫 재시도는 1초 백오프 뒤
    let link1 = transport.wait_for_link(1, LIMIT).await;
    let times = transport.connect_times();
    let delta = times[1] - times[0];
    assert!(
        delta >= Duration::from_millis(1_000) && delta <= Duration::from_millis(1_600),
        "백오프 이탈: {delta:?}"
    );

    assert_eq!(link1.url, link0.url);
    let join = link1.next_sent(LIMIT).await.expect("재연결 JOIN 미전송");
    assert!(join.contains(r#""username":"alice""#));
    wait_status(&session, ConnectionStatus::Connected, LIMIT).await;
}

// ---- 시나리오 C: 미연결 상태의 send는 NotConnected, 트랜스포트 무접촉 ----

#[tokio::test(start_paused = true)]
async fn scenario_c_send_while_disconnected() {
    let transport = MockTransport::new();
    let session = session_for(Role::Chat, Arc::clone(&transport));

    let result = session
        .send(&Outbound::from(Envelope::message("hi")))
        .await;
    assert_matches!(result, Err(SendError::NotConnected));
    assert_eq!(transport.connect_count(), 0);
}

// ---- 백오프 수열 + 시도 한도 소진 ----

#[tokio::test(start_paused = true)]
async fn exhaustion_after_six_failed_retries() {
    let transport = MockTransport::new();
    transport.script(&[ConnectOutcome::Refuse; 7]);
    let session = session_for(Role::Chat, Arc::clone(&transport));

    session.connect("alice").await;
    wait_status(&session, ConnectionStatus::Failed, Duration::from_secs(120)).await;

    // 최초 1회 + 재시도 6회, 7번째 재시도는 예약되지 않는다
    assert_eq!(transport.connect_count(), 7);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(transport.connect_count(), 7);

    // 대기 시간 수열: 1s, 2s, 4s, 8s, 16s, 30s (상한)
    let times = transport.connect_times();
    let expected = [1_000u64, 2_000, 4_000, 8_000, 16_000, 30_000];
    for (i, want_ms) in expected.iter().enumerate() {
        let delta = times[i + 1] - times[i];
        let want = Duration::from_millis(*want_ms);
        assert!(
            delta >= want && delta <= want + Duration::from_millis(200),
            "{}번째 재시도 대기 이탈: {delta:?} (기대 {want:?})",
            i + 1
        );
    }

    let error = session.last_error().unwrap_or_default();
    assert!(error.contains("최대 재연결"), "터미널 에러 미노출: {error}");
}

// ---- 성공하면 시도 카운터가 0으로 돌아간다 ----

#[tokio::test(start_paused = true)]
async fn successful_open_resets_attempt_counter() {
    let transport = MockTransport::new();
    let session = session_for(Role::Chat, Arc::clone(&transport));

    session.connect("alice").await;
    let link0 = transport.wait_for_link(0, LIMIT).await;

    link0.push_close(1006).await;
    let link1 = transport.wait_for_link(1, LIMIT).await;
    wait_status(&session, ConnectionStatus::Connected, LIMIT).await;
    assert_eq!(session.snapshot().reconnect_attempt, 0);

    // 다시 끊겨도 1초부터 다시 시작한다 (이어서 2초가 아니라)
    link1.push_close(1006).await;
    transport.wait_for_link(2, LIMIT).await;
    let times = transport.connect_times();
    let delta = times[2] - times[1];
    assert!(
        delta >= Duration::from_millis(1_000) && delta <= Duration::from_millis(1_600),
        "리셋 실패 — 두 번째 끊김의 첫 재시도 대기: {delta:?}"
    );
}

// ---- 명시적 disconnect는 예약된 재연결을 이긴다 ----

#[tokio::test(start_paused = true)]
async fn disconnect_suppresses_pending_reconnect() {
    let transport = MockTransport::new();
    let session = session_for(Role::Chat, Arc::clone(&transport));

    session.connect("alice").await;
    let link0 = transport.wait_for_link(0, LIMIT).await;

    link0.push_close(1006).await;
    wait_status(&session, ConnectionStatus::Reconnecting, LIMIT).await;

    // 백오프 타이머가 걸려 있는 동안 끊는다
    session.disconnect().await;
    assert_eq!(session.status(), ConnectionStatus::Disconnected);

    // 최대 지연 + 여유만큼 지나도 새 연결 시도가 없어야 한다
    tokio::time::sleep(Duration::from_secs(35)).await;
    assert_eq!(transport.connect_count(), 1);
    assert_eq!(session.status(), ConnectionStatus::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn disconnect_wins_close_race() {
    let transport = MockTransport::new();
    let session = session_for(Role::Chat, Arc::clone(&transport));

    session.connect("alice").await;
    let link0 = transport.wait_for_link(0, LIMIT).await;
    wait_status(&session, ConnectionStatus::Connected, LIMIT).await;

    // disconnect 직후에 close 이벤트가 도착하는 경쟁
    session.disconnect().await;
    link0.push_close(1006).await;

    tokio::time::sleep(Duration::from_secs(35)).await;
    assert_eq!(transport.connect_count(), 1);
    assert!(link0.closed.load(Ordering::SeqCst), "sink 미종료");
}

// ---- 하트비트: Connected인 동안만, 역할이 요구할 때만 ----

#[tokio::test(start_paused = true)]
async fn registry_heartbeat_every_25s() {
    let transport = MockTransport::new();
    let session = session_for(Role::Registry, Arc::clone(&transport));

    session.connect("Dashboard-User").await;
    let link = transport.wait_for_link(0, LIMIT).await;

    let handshake = link.next_sent(LIMIT).await.unwrap();
    assert!(handshake.contains("DASHBOARD_CONNECT"));

    // 25초 주기 PING 두 번
    let ping = link.next_sent(Duration::from_secs(26)).await.unwrap();
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&ping).unwrap()["type"],
        "PING"
    );
    let ping = link.next_sent(Duration::from_secs(26)).await.unwrap();
    assert!(ping.contains("PING"));

    // PONG은 조용히 소비된다 — 상태 변화 없음
    link.push_text(r#"{"type":"PONG"}"#).await;
    assert_eq!(session.status(), ConnectionStatus::Connected);

    // disconnect 후에는 어떤 하트비트도 없다
    session.disconnect().await;
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(link.drain_sent().await.is_empty(), "종료 후 하트비트 발생");
}

#[tokio::test(start_paused = true)]
async fn chat_role_never_heartbeats() {
    let transport = MockTransport::new();
    let session = session_for(Role::Chat, Arc::clone(&transport));

    session.connect("alice").await;
    let link = transport.wait_for_link(0, LIMIT).await;
    let _join = link.next_sent(LIMIT).await.unwrap();

    tokio::time::sleep(Duration::from_secs(90)).await;
    assert!(link.drain_sent().await.is_empty(), "채팅 역할이 PING 전송");
}

// ---- 프레임/에러 회복력 ----

#[tokio::test(start_paused = true)]
async fn malformed_frame_does_not_drop_connection() {
    let transport = MockTransport::new();
    let session = session_for(Role::Chat, Arc::clone(&transport));
    let mut all_rx = session.router().subscribe_all();

    session.connect("alice").await;
    wait_status(&session, ConnectionStatus::Connected, LIMIT).await;
    let link = transport.wait_for_link(0, LIMIT).await;

    link.push_text("이건 JSON이 아님 {{{").await;
    link.push_text(r#"{"no_type": true}"#).await;
    link.push_text(r#"{"type":"USER_LIST_UPDATE","payload":{"users":["bob"]}}"#)
        .await;

    // 깨진 프레임 두 개는 버려지고, 유효한 프레임은 그대로 도착한다
    let msg = tokio::time::timeout(LIMIT, all_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(msg.kind(), "USER_LIST_UPDATE");
    assert_eq!(session.status(), ConnectionStatus::Connected);
}

#[tokio::test(start_paused = true)]
async fn transport_error_is_advisory_only() {
    let transport = MockTransport::new();
    let session = session_for(Role::Chat, Arc::clone(&transport));

    session.connect("alice").await;
    wait_status(&session, ConnectionStatus::Connected, LIMIT).await;
    let link = transport.wait_for_link(0, LIMIT).await;

    link.push_error("TLS handshake hiccup").await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    // 에러는 관찰 가능하지만 연결은 유지된다
    assert_eq!(session.status(), ConnectionStatus::Connected);
    assert!(session.last_error().unwrap().contains("hiccup"));
    assert_eq!(transport.connect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn send_failure_keeps_connection() {
    let transport = MockTransport::new();
    let session = session_for(Role::Chat, Arc::clone(&transport));

    session.connect("alice").await;
    wait_status(&session, ConnectionStatus::Connected, LIMIT).await;
    let link = transport.wait_for_link(0, LIMIT).await;
    let _join = link.next_sent(LIMIT).await;

    // 송신만 망가뜨린다
    link.closed.store(true, Ordering::SeqCst);
    let result = session.send(&Outbound::from(Envelope::message("hi"))).await;
    assert_matches!(result, Err(SendError::Failed(_)));

    // 전송 실패만으로는 연결을 닫지 않는다
    assert_eq!(session.status(), ConnectionStatus::Connected);
}

// ---- 알 수 없는 태그는 버리지 않고 전달 ----

#[tokio::test(start_paused = true)]
async fn unknown_tag_reaches_subscribers() {
    let transport = MockTransport::new();
    let session = session_for(Role::Registry, Arc::clone(&transport));
    let mut rx = session.router().subscribe("TASK_QUEUE_DEPTH");

    session.connect("Dashboard-User").await;
    let link = transport.wait_for_link(0, LIMIT).await;

    link.push_text(r#"{"type":"TASK_QUEUE_DEPTH","payload":{"depth":42}}"#)
        .await;

    let msg = tokio::time::timeout(LIMIT, rx.recv()).await.unwrap().unwrap();
    match msg {
        Inbound::Unknown { kind, raw } => {
            assert_eq!(kind, "TASK_QUEUE_DEPTH");
            assert_eq!(raw["payload"]["depth"], 42);
        }
        other => panic!("예상 밖 메시지: {other:?}"),
    }
}

// ---- connect 재호출은 기존 연결을 먼저 철거한다 ----

#[tokio::test(start_paused = true)]
async fn reconnect_call_tears_down_previous_link() {
    let transport = MockTransport::new();
    let session = session_for(Role::Chat, Arc::clone(&transport));

    session.connect("alice").await;
    let link0 = transport.wait_for_link(0, LIMIT).await;
    wait_status(&session, ConnectionStatus::Connected, LIMIT).await;

    session.connect("alice2").await;
    let link1 = transport.wait_for_link(1, LIMIT).await;
    wait_status(&session, ConnectionStatus::Connected, LIMIT).await;

    assert!(link0.closed.load(Ordering::SeqCst), "이전 연결 미철거");
    let join = link1.next_sent(LIMIT).await.unwrap();
    assert!(join.contains("alice2"));
}
