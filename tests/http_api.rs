// Talks to a one-shot HTTP server on localhost.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use taskdeck::Error;
use taskdeck::api::{HttpTaskApi, Session, SessionProvider, TaskApi};
use taskdeck::task::{Priority, TaskDraft, TaskStatus};

struct Fixed;

impl SessionProvider for Fixed {
    fn current(&self) -> Option<Session> {
        Some(Session {
            user_id: "u-42".into(),
            token: "secret-token".into(),
        })
    }
}

struct Captured {
    request_line: String,
    headers: Vec<String>,
    body: String,
}

/// Accepts one connection, answers with `status` and `body`, returns what it saw.
fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();
        let mut headers = Vec::new();
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let line = line.trim_end().to_string();
            if line.is_empty() {
                break;
            }
            if let Some(v) = line.to_lowercase().strip_prefix("content-length:") {
                content_length = v.trim().parse().unwrap();
            }
            headers.push(line);
        }
        let mut buf = vec![0u8; content_length];
        reader.read_exact(&mut buf).unwrap();

        let mut stream = stream;
        write!(
            stream,
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        )
        .unwrap();
        stream.flush().unwrap();

        Captured {
            request_line: request_line.trim_end().to_string(),
            headers,
            body: String::from_utf8(buf).unwrap(),
        }
    });
    (base, handle)
}

fn api(base: &str) -> HttpTaskApi {
    HttpTaskApi::new(base, Arc::new(Fixed)).unwrap()
}

fn has_header(c: &Captured, name: &str, value: &str) -> bool {
    c.headers
        .iter()
        .any(|h| h.to_lowercase() == format!("{}: {}", name, value).to_lowercase())
}

const TASK_JSON: &str = r#"{"id":3,"user_id":"u-42","title":"Buy milk","description":null,"status":"completed","priority":"high","due_date":"2024-03-10","reminder_time":"2024-03-10T09:00:00","is_reminded":false,"created_at":"2024-03-01T10:00:00.123456","updated_at":null}"#;

#[test]
fn complete_sends_patch_with_bearer() {
    let (base, server) = serve_once("200 OK", TASK_JSON);
    let task = api(&base).complete(3).unwrap();
    let seen = server.join().unwrap();

    assert_eq!(seen.request_line, "PATCH /api/u-42/tasks/3/complete HTTP/1.1");
    assert!(has_header(&seen, "authorization", "Bearer secret-token"));
    assert_eq!(task.id, 3);
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.priority, Priority::High);
    assert!(task.reminder_time.is_some());
    assert!(task.created_at.is_some());
}

#[test]
fn list_with_status_filter() {
    let body: &'static str = Box::leak(format!("[{}]", TASK_JSON).into_boxed_str());
    let (base, server) = serve_once("200 OK", body);
    let tasks = api(&base).list(Some(TaskStatus::Pending)).unwrap();
    let seen = server.join().unwrap();

    assert_eq!(seen.request_line, "GET /api/u-42/tasks?status_filter=pending HTTP/1.1");
    assert_eq!(tasks.len(), 1);
}

#[test]
fn create_posts_json_draft() {
    let (base, server) = serve_once("201 Created", TASK_JSON);
    api(&base)
        .create(&TaskDraft::new("Buy milk").priority(Priority::High))
        .unwrap();
    let seen = server.join().unwrap();

    assert_eq!(seen.request_line, "POST /api/u-42/tasks HTTP/1.1");
    let sent: serde_json::Value = serde_json::from_str(&seen.body).unwrap();
    assert_eq!(sent["title"], "Buy milk");
    assert_eq!(sent["priority"], "high");
    assert!(sent.get("due_date").is_none());
}

#[test]
fn delete_accepts_no_content() {
    let (base, server) = serve_once("204 No Content", "");
    api(&base).delete(3).unwrap();
    let seen = server.join().unwrap();
    assert_eq!(seen.request_line, "DELETE /api/u-42/tasks/3 HTTP/1.1");
}

#[test]
fn error_detail_is_surfaced() {
    let (base, server) = serve_once("404 Not Found", r#"{"detail":"Task with ID 9 not found"}"#);
    let err = api(&base).get(9).unwrap_err();
    server.join().unwrap();
    match err {
        Error::Remote { status, detail } => {
            assert_eq!(status, 404);
            assert_eq!(detail, "Task with ID 9 not found");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn unreachable_server_is_a_transport_error() {
    let port = {
        let l = TcpListener::bind("127.0.0.1:0").unwrap();
        l.local_addr().unwrap().port()
    };
    let err = api(&format!("http://127.0.0.1:{port}")).list(None).unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
}
