// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use rcc_core::{Checker, ErrorKind, Event, MemoryBindings, MemoryClient, Notification, Waiter};
use rcc_ipc::WaiterId;
use yare::parameterized;

use super::*;

const CTX: &str = "rpc_alice_hs1_";

fn opts() -> ClientCreationOpts {
    ClientCreationOpts::new("http://hs1", "@alice:hs1", "pw")
}

fn server() -> Server {
    let mut registry = BindingsRegistry::new();
    registry.register(Arc::new(MemoryBindings::new()));
    Server::new(registry)
}

fn create(server: &Server) -> Response {
    server.handle(Request::CreateClient {
        opts: opts(),
        lang: Lang::Memory,
        context_id: CTX.to_string(),
    })
}

fn ready_server() -> Server {
    let server = server();
    assert_eq!(create(&server), Response::Ok);
    assert_eq!(server.handle(Request::Login { opts: opts() }), Response::Ok);
    assert_eq!(
        server.handle(Request::StartSyncing {
            context_id: CTX.to_string()
        }),
        Response::Ok
    );
    server
}

fn error_kind(response: Response) -> (ErrorKind, String) {
    match response {
        Response::Error { kind, message } => (kind, message),
        other => unreachable!("expected error, got {:?}", other),
    }
}

fn send(server: &Server, room_id: &str, text: &str) -> String {
    match server.handle(Request::SendMessage {
        context_id: CTX.to_string(),
        room_id: room_id.to_string(),
        text: text.to_string(),
    }) {
        Response::EventId { event_id } => event_id,
        other => unreachable!("expected event id, got {:?}", other),
    }
}

fn wait_for(server: &Server, room_id: &str, timeout_ms: u64) -> WaiterId {
    let Response::WaiterId { waiter_id } = server.handle(Request::WaitUntilEvent {
        context_id: CTX.to_string(),
        room_id: room_id.to_string(),
    }) else {
        unreachable!("expected waiter id");
    };
    let started = server.handle(Request::WaitStart {
        context_id: CTX.to_string(),
        waiter_id,
        room_id: room_id.to_string(),
        message: format!("waiting in {}", room_id),
        timeout_ms,
    });
    assert_eq!(started, Response::Ok);
    waiter_id
}

fn poll_texts(server: &Server, waiter_id: WaiterId, n: usize) -> Vec<String> {
    let mut texts = Vec::new();
    for _ in 0..200 {
        if texts.len() >= n {
            break;
        }
        match server.handle(Request::WaitPoll { waiter_id }) {
            Response::Events { events } => {
                texts.extend(events.into_iter().filter_map(|e| e.text));
            }
            other => unreachable!("expected events, got {:?}", other),
        }
        thread::sleep(Duration::from_millis(5));
    }
    texts
}

#[test]
fn ping_and_hello() {
    let server = server();
    assert_eq!(server.handle(Request::Ping), Response::Pong);
    assert_eq!(
        server.handle(Request::Hello {
            version: "0.0.0".to_string()
        }),
        Response::Hello {
            version: PROTOCOL_VERSION.to_string()
        }
    );
}

#[test]
fn status_reports_client_and_waiters() {
    let server = ready_server();
    wait_for(&server, "!a:hs1", 1000);
    let Response::Status(status) = server.handle(Request::Status) else {
        unreachable!("expected status");
    };
    assert_eq!(status.pid, std::process::id());
    assert!(status.has_client);
    assert_eq!(status.waiters, 1);
}

#[parameterized(
    login = { Request::Login { opts: opts() } },
    send = { Request::SendMessage { context_id: CTX.to_string(), room_id: "!a:hs1".to_string(), text: "x".to_string() } },
    wait = { Request::WaitUntilEvent { context_id: CTX.to_string(), room_id: "!a:hs1".to_string() } },
    user_id = { Request::UserId },
    close = { Request::Close { context_id: CTX.to_string() } },
    stop = { Request::StopSyncing { context_id: CTX.to_string() } },
)]
fn calls_without_client_are_protocol_errors(request: Request) {
    let server = server();
    let (kind, message) = error_kind(server.handle(request));
    assert_eq!(kind, ErrorKind::Protocol);
    assert!(message.contains("no active client"), "{}", message);
}

#[test]
fn second_create_client_is_rejected() {
    let server = server();
    assert_eq!(create(&server), Response::Ok);
    let (kind, message) = error_kind(create(&server));
    assert_eq!(kind, ErrorKind::Protocol);
    assert!(message.contains("already have an active client"));
}

#[test]
fn create_client_stays_rejected_after_close() {
    let server = ready_server();
    assert_eq!(
        server.handle(Request::Close {
            context_id: CTX.to_string()
        }),
        Response::Ok
    );
    let (kind, _) = error_kind(create(&server));
    assert_eq!(kind, ErrorKind::Protocol);
}

#[test]
fn unknown_bindings_are_rejected() {
    let server = server();
    let (kind, message) = error_kind(server.handle(Request::CreateClient {
        opts: opts(),
        lang: Lang::Rust,
        context_id: CTX.to_string(),
    }));
    assert_eq!(kind, ErrorKind::Protocol);
    assert!(message.contains("unknown language bindings rust"));
    // A failed create does not use up the one allowed create.
    assert_eq!(create(&server), Response::Ok);
}

#[test]
fn domain_errors_pass_through_verbatim() {
    let server = server();
    create(&server);
    let mut bad = opts();
    bad.password = String::new();
    let (kind, message) = error_kind(server.handle(Request::Login { opts: bad }));
    assert_eq!(kind, ErrorKind::Domain);
    assert_eq!(message, "login failed: M_FORBIDDEN: invalid password");
}

#[test]
fn send_and_wait_for_ping() {
    let server = ready_server();
    let waiter = wait_for(&server, "!r:hs1", 5000);
    send(&server, "!r:hs1", "ping");
    assert_eq!(poll_texts(&server, waiter, 1), vec!["ping"]);
}

#[test]
fn waiters_are_scoped_to_rooms() {
    let server = ready_server();
    let a = wait_for(&server, "!a:hs1", 5000);
    let b = wait_for(&server, "!b:hs1", 5000);
    send(&server, "!a:hs1", "a1");
    send(&server, "!b:hs1", "b1");
    send(&server, "!a:hs1", "a2");
    assert_eq!(poll_texts(&server, a, 2), vec!["a1", "a2"]);
    assert_eq!(poll_texts(&server, b, 1), vec!["b1"]);
}

#[test]
fn poll_unstarted_waiter_is_a_protocol_error() {
    let server = ready_server();
    let Response::WaiterId { waiter_id } = server.handle(Request::WaitUntilEvent {
        context_id: CTX.to_string(),
        room_id: "!a:hs1".to_string(),
    }) else {
        unreachable!("expected waiter id");
    };
    let (kind, _) = error_kind(server.handle(Request::WaitPoll { waiter_id }));
    assert_eq!(kind, ErrorKind::Protocol);
    let (kind, message) = error_kind(server.handle(Request::WaitPoll { waiter_id: 99 }));
    assert_eq!(kind, ErrorKind::Protocol);
    assert!(message.contains("unknown waiter id 99"));
}

#[test]
fn poll_after_deadline_times_out() {
    let server = ready_server();
    let waiter = wait_for(&server, "!a:hs1", 30);
    send(&server, "!a:hs1", "late");
    thread::sleep(Duration::from_millis(60));
    let (kind, message) = error_kind(server.handle(Request::WaitPoll { waiter_id: waiter }));
    assert_eq!(kind, ErrorKind::Timeout);
    assert!(message.contains("waiting in !a:hs1"));
}

#[test]
fn stop_syncing_without_start_fails() {
    let server = server();
    create(&server);
    let (kind, message) = error_kind(server.handle(Request::StopSyncing {
        context_id: CTX.to_string(),
    }));
    assert_eq!(kind, ErrorKind::Protocol);
    assert!(message.contains("StartSyncing wasn't called"));
}

#[test]
fn calls_after_close_fail() {
    let server = ready_server();
    assert_eq!(
        server.handle(Request::ForceClose {
            context_id: CTX.to_string()
        }),
        Response::Ok
    );
    let (_, message) = error_kind(server.handle(Request::UserId));
    assert_eq!(message, "client is closed");
    let Response::Status(status) = server.handle(Request::Status) else {
        unreachable!("expected status");
    };
    assert!(!status.has_client);
}

#[test]
fn accessors_describe_the_client() {
    let server = ready_server();
    assert_eq!(
        server.handle(Request::UserId),
        Response::UserId {
            user_id: "@alice:hs1".to_string()
        }
    );
    assert_eq!(
        server.handle(Request::ClientType),
        Response::ClientType { lang: Lang::Memory }
    );
    assert_eq!(server.handle(Request::Opts), Response::Opts { opts: opts() });
    assert_eq!(
        server.handle(Request::Logf {
            message: "hello".to_string()
        }),
        Response::Ok
    );
}

#[test]
fn backup_round_trip() {
    let server = ready_server();
    let Response::RecoveryKey { recovery_key } = server.handle(Request::BackupKeys {
        context_id: CTX.to_string(),
    }) else {
        unreachable!("expected recovery key");
    };
    assert_eq!(
        server.handle(Request::LoadBackup { recovery_key }),
        Response::Ok
    );
}

#[test]
fn event_lookups() {
    let server = ready_server();
    let event_id = send(&server, "!a:hs1", "hi alice");
    let Response::Event { event } = server.handle(Request::GetEvent {
        context_id: CTX.to_string(),
        room_id: "!a:hs1".to_string(),
        event_id: event_id.clone(),
    }) else {
        unreachable!("expected event");
    };
    assert_eq!(event.text.as_deref(), Some("hi alice"));

    let Response::Notification { notification } = server.handle(Request::GetNotification {
        room_id: "!a:hs1".to_string(),
        event_id,
    }) else {
        unreachable!("expected notification");
    };
    assert!(notification.has_mentions);
    assert_eq!(
        server.handle(Request::IsRoomEncrypted {
            room_id: "!a:hs1".to_string()
        }),
        Response::Bool { value: true }
    );
}

/// Memory client whose sync handle records that it was stopped.
struct TrackedClient {
    inner: MemoryClient,
    stopped: Arc<AtomicBool>,
}

impl Client for TrackedClient {
    fn close(&self) -> Result<()> {
        self.inner.close()
    }
    fn force_close(&self) -> Result<()> {
        self.inner.force_close()
    }
    fn delete_persistent_storage(&self) -> Result<()> {
        self.inner.delete_persistent_storage()
    }
    fn login(&self, opts: &ClientCreationOpts) -> Result<()> {
        self.inner.login(opts)
    }
    fn start_syncing(&self) -> Result<StopSyncing> {
        let stop = self.inner.start_syncing()?;
        let stopped = Arc::clone(&self.stopped);
        Ok(StopSyncing::new(move || {
            stop.stop();
            stopped.store(true, Ordering::SeqCst);
        }))
    }
    fn current_access_token(&self) -> Result<String> {
        self.inner.current_access_token()
    }
    fn is_room_encrypted(&self, room_id: &str) -> Result<bool> {
        self.inner.is_room_encrypted(room_id)
    }
    fn send_message(&self, room_id: &str, text: &str) -> Result<String> {
        self.inner.send_message(room_id, text)
    }
    fn wait_until_event_in_room(
        &self,
        room_id: &str,
        checker: Checker,
    ) -> Result<Box<dyn Waiter>> {
        self.inner.wait_until_event_in_room(room_id, checker)
    }
    fn backpaginate(&self, room_id: &str, count: usize) -> Result<()> {
        self.inner.backpaginate(room_id, count)
    }
    fn get_event(&self, room_id: &str, event_id: &str) -> Result<Event> {
        self.inner.get_event(room_id, event_id)
    }
    fn get_notification(&self, room_id: &str, event_id: &str) -> Result<Notification> {
        self.inner.get_notification(room_id, event_id)
    }
    fn backup_keys(&self) -> Result<String> {
        self.inner.backup_keys()
    }
    fn load_backup(&self, recovery_key: &str) -> Result<()> {
        self.inner.load_backup(recovery_key)
    }
    fn logf(&self, message: &str) {
        self.inner.logf(message)
    }
    fn user_id(&self) -> String {
        self.inner.user_id()
    }
    fn client_type(&self) -> Lang {
        self.inner.client_type()
    }
    fn opts(&self) -> ClientCreationOpts {
        self.inner.opts()
    }
}

struct TrackedBindings {
    stopped: Arc<AtomicBool>,
}

impl LanguageBindings for TrackedBindings {
    fn lang(&self) -> Lang {
        Lang::Memory
    }
    fn pre_test_run(&self, _context_id: &str) {}
    fn post_test_run(&self, _context_id: &str) {}
    fn create_client(&self, opts: &ClientCreationOpts) -> Result<Box<dyn Client>> {
        Ok(Box::new(TrackedClient {
            inner: MemoryClient::new(opts.clone())?,
            stopped: Arc::clone(&self.stopped),
        }))
    }
}

#[parameterized(
    close = { Request::Close { context_id: CTX.to_string() } },
    force_close = { Request::ForceClose { context_id: CTX.to_string() } },
)]
fn closing_stops_a_syncing_client(request: Request) {
    let stopped = Arc::new(AtomicBool::new(false));
    let mut registry = BindingsRegistry::new();
    registry.register(Arc::new(TrackedBindings {
        stopped: Arc::clone(&stopped),
    }));
    let server = Server::new(registry);
    assert_eq!(create(&server), Response::Ok);
    assert_eq!(server.handle(Request::Login { opts: opts() }), Response::Ok);
    assert_eq!(
        server.handle(Request::StartSyncing {
            context_id: CTX.to_string()
        }),
        Response::Ok
    );
    assert!(!stopped.load(Ordering::SeqCst));

    assert_eq!(server.handle(request), Response::Ok);
    assert!(stopped.load(Ordering::SeqCst));
}
