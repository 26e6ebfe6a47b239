use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};

use loaner_kernel::form::{FormController, SubmitError};
use loaner_kernel::store::{LoanStore, RemoteSheetStore, ServiceCredentials, StoreError};
use loaner_kernel::validate::{validate, RawEntry};
use serde_json::{json, Value};

/// One request as seen by the scripted responder.
#[derive(Debug)]
struct Seen {
    request_line: String,
    headers: String,
    body: String,
}

/// Serve `script` in order, one connection per response, then stop.
fn serve(script: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<Seen>>) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let base = format!("http://{}", listener.local_addr().expect("addr"));

    let handle = thread::spawn(move || {
        let mut seen = Vec::new();
        for (status, body) in script {
            let (mut stream, _) = listener.accept().expect("accept");
            seen.push(read_request(&mut stream));
            let response = format!(
                "HTTP/1.1 {status} Scripted\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).expect("respond");
        }
        seen
    });

    (base, handle)
}

fn read_request(stream: &mut impl Read) -> Seen {
    let mut buf = Vec::new();
    let mut chunk = [0_u8; 1024];
    let header_end = loop {
        let n = stream.read(&mut chunk).expect("read");
        assert!(n > 0, "connection closed before headers");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).expect("read body");
        assert!(n > 0, "connection closed before body");
        buf.extend_from_slice(&chunk[..n]);
    }

    let (request_line, headers) = head.split_once("\r\n").expect("request line");
    Seen {
        request_line: request_line.to_string(),
        headers: headers.to_ascii_lowercase(),
        body: String::from_utf8_lossy(&buf[header_end..header_end + content_length]).to_string(),
    }
}

fn credentials(base: &str) -> ServiceCredentials {
    ServiceCredentials {
        client_email: "loans@school.example".into(),
        client_secret: "s3cret".into(),
        token_uri: format!("{base}/token"),
        api_base: format!("{base}/v1/"),
    }
}

#[test]
fn connect_then_append_sends_one_ordered_row() {
    let (base, server) = serve(vec![
        (200, r#"{"access_token":"tok-1"}"#),
        (200, r#"{"id":"sheet-9"}"#),
        (200, r#"{"updates":1}"#),
    ]);

    let mut store = RemoteSheetStore::connect_with(&credentials(&base), "Loaners").expect("connect");
    assert_eq!(store.sheet_id(), "sheet-9");
    assert_eq!(store.location(), "sheet 'Loaners'");

    let record = validate(&RawEntry::new("Jane", "Doe", "1042", "09-01-2025")).expect("valid");
    store.append(&record).expect("append");

    let seen = server.join().expect("server");
    assert_eq!(seen.len(), 3);

    assert!(seen[0].request_line.starts_with("POST /token "));
    let auth: Value = serde_json::from_str(&seen[0].body).expect("json");
    assert_eq!(auth["client_email"], "loans@school.example");
    assert_eq!(auth["scope"], "spreadsheets.readwrite");

    assert!(seen[1].request_line.starts_with("GET /v1/spreadsheets?title=Loaners "));
    assert!(seen[1].headers.contains("authorization: bearer tok-1"));

    assert!(seen[2]
        .request_line
        .starts_with("POST /v1/spreadsheets/sheet-9/values:append "));
    assert!(seen[2].headers.contains("authorization: bearer tok-1"));
    let body: Value = serde_json::from_str(&seen[2].body).expect("json");
    assert_eq!(body, json!({ "values": [["Jane", "Doe", 1042, "09-01-2025"]] }));
}

#[test]
fn rejected_credentials_fail_fast() {
    let (base, server) = serve(vec![(401, r#"{"error":"bad secret"}"#)]);

    let err = RemoteSheetStore::connect_with(&credentials(&base), "Loaners").unwrap_err();

    assert!(matches!(err, StoreError::Connection(ref msg) if msg.contains("401")));
    assert_eq!(server.join().expect("server").len(), 1);
}

#[test]
fn unknown_sheet_is_a_connection_error() {
    let (base, server) = serve(vec![
        (200, r#"{"access_token":"tok-1"}"#),
        (404, r#"{"error":"no such sheet"}"#),
    ]);

    let err = RemoteSheetStore::connect_with(&credentials(&base), "Missing").unwrap_err();

    assert!(matches!(err, StoreError::Connection(ref msg) if msg.contains("sheet lookup")));
    server.join().expect("server");
}

#[test]
fn denied_append_keeps_form_inputs() {
    let (base, server) = serve(vec![
        (200, r#"{"access_token":"tok-1"}"#),
        (200, r#"{"id":"sheet-9"}"#),
        (403, r#"{"error":"permission denied"}"#),
    ]);

    let store = RemoteSheetStore::connect_with(&credentials(&base), "Loaners").expect("connect");
    let mut form = FormController::new(store);
    let entry = RawEntry::new("Jane", "Doe", "1042", "09-01-2025");
    *form.inputs_mut() = entry.clone();

    let err = form.submit().expect_err("append must fail");

    assert!(matches!(err, SubmitError::NotSaved(StoreError::RemoteWrite(_))));
    assert_eq!(form.inputs(), &entry);
    assert!(form.status().contains("403"));
    assert_eq!(server.join().expect("server").len(), 3);
}

/// Address of a port that was bound and released, so nothing listens there.
fn closed_base() -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{addr}")
}

#[test]
fn unreachable_service_is_a_connection_error() {
    let base = closed_base();

    let err = RemoteSheetStore::connect_with(&credentials(&base), "Loaners").unwrap_err();

    assert!(
        matches!(err, StoreError::Connection(ref msg) if msg.contains("authentication failed")),
        "unexpected error: {err}"
    );
}

#[test]
fn network_failure_on_append_keeps_form_inputs() {
    let (base, server) = serve(vec![
        (200, r#"{"access_token":"tok-1"}"#),
        (200, r#"{"id":"sheet-9"}"#),
    ]);

    let store = RemoteSheetStore::connect_with(&credentials(&base), "Loaners").expect("connect");
    // responder has served its script and released the port
    assert_eq!(server.join().expect("server").len(), 2);

    let mut form = FormController::new(store);
    let entry = RawEntry::new("Jane", "Doe", "1042", "09-01-2025");
    *form.inputs_mut() = entry.clone();

    let err = form.submit().expect_err("append must fail");

    assert!(matches!(err, SubmitError::NotSaved(StoreError::RemoteWrite(_))));
    assert_eq!(form.inputs(), &entry);
    assert!(form.status().starts_with("FATAL ERROR: Could not save data."));
}
