//! Minimal HTTP/1.1 server implementing the multipart upload API for
//! integration tests: the three JSON control endpoints plus the pre-signed
//! part PUT target, all on one listener.
//!
//! Failure knobs let tests refuse session creation, fail a chosen part,
//! omit the ETag header, or stall PUTs so an abort can land mid-flight.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default)]
pub struct MultipartServerOptions {
    /// If true, POST /multipart_uploads returns 503.
    pub fail_create: bool,
    /// Return 500 for this part number's PUT.
    pub fail_part: Option<u32>,
    /// If true, successful PUTs omit the ETag header.
    pub omit_etag: bool,
    /// Sleep this long before answering each PUT.
    pub stall_put: Option<Duration>,
}

#[derive(Default)]
struct Upload {
    object_key: String,
    /// part number -> (etag without quotes, stored bytes)
    parts: HashMap<u32, (String, Vec<u8>)>,
}

#[derive(Default)]
struct ServerState {
    uploads: HashMap<String, Upload>,
    next_upload: u64,
    puts_started: usize,
    concurrent_puts: usize,
    max_concurrent_puts: usize,
    /// Each completions call's (part number, etag) sequence as received.
    completions: Vec<Vec<(u32, String)>>,
}

/// Running test server plus accessors over its recorded state.
pub struct MultipartServer {
    /// Control-plane base, e.g. `http://127.0.0.1:12345/api/`.
    pub base_url: String,
    state: Arc<Mutex<ServerState>>,
}

impl MultipartServer {
    pub fn start() -> Self {
        Self::start_with_options(MultipartServerOptions::default())
    }

    /// Starts the server in a background thread. It runs until process exit.
    pub fn start_with_options(opts: MultipartServerOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(Mutex::new(ServerState::default()));
        let accept_state = Arc::clone(&state);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let state = Arc::clone(&accept_state);
                thread::spawn(move || handle(stream, &state, opts, port));
            }
        });
        MultipartServer {
            base_url: format!("http://127.0.0.1:{}/api/", port),
            state,
        }
    }

    /// Number of completions calls received.
    pub fn completions(&self) -> usize {
        self.state.lock().unwrap().completions.len()
    }

    /// Part sequence of the first completions call, in received order.
    pub fn completion_parts(&self) -> Option<Vec<(u32, String)>> {
        self.state.lock().unwrap().completions.first().cloned()
    }

    /// Number of part PUTs the server started serving.
    pub fn puts_started(&self) -> usize {
        self.state.lock().unwrap().puts_started
    }

    /// Peak number of simultaneously active part PUTs.
    pub fn max_concurrent_puts(&self) -> usize {
        self.state.lock().unwrap().max_concurrent_puts
    }

    /// Stored part count of the first (usually only) upload.
    pub fn part_count(&self) -> usize {
        let state = self.state.lock().unwrap();
        state
            .uploads
            .values()
            .next()
            .map(|u| u.parts.len())
            .unwrap_or(0)
    }

    /// Reassembles the first upload's parts in part-number order.
    pub fn object_bytes(&self) -> Option<Vec<u8>> {
        let state = self.state.lock().unwrap();
        let upload = state.uploads.values().next()?;
        let mut numbers: Vec<u32> = upload.parts.keys().copied().collect();
        numbers.sort_unstable();
        let mut out = Vec::new();
        for n in numbers {
            out.extend_from_slice(&upload.parts[&n].1);
        }
        Some(out)
    }
}

fn handle(mut stream: TcpStream, state: &Arc<Mutex<ServerState>>, opts: MultipartServerOptions, port: u16) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(10)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(10)));

    let Some((head, mut body)) = read_head(&mut stream) else {
        return;
    };
    let (method, path, headers) = parse_head(&head);
    let path = path.split('?').next().unwrap_or(path).to_string();

    let is_part_put = method.eq_ignore_ascii_case("PUT") && path.starts_with("/parts/");
    if is_part_put {
        let mut st = state.lock().unwrap();
        st.puts_started += 1;
        st.concurrent_puts += 1;
        st.max_concurrent_puts = st.max_concurrent_puts.max(st.concurrent_puts);
    }

    // curl sends Expect: 100-continue for larger bodies and waits for the
    // interim response before transmitting.
    if headers
        .get("expect")
        .map(|v| v.eq_ignore_ascii_case("100-continue"))
        .unwrap_or(false)
    {
        let _ = stream.write_all(b"HTTP/1.1 100 Continue\r\n\r\n");
    }

    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let mut tmp = [0u8; 8192];
    while body.len() < content_length {
        match stream.read(&mut tmp) {
            Ok(0) | Err(_) => break,
            Ok(n) => body.extend_from_slice(&tmp[..n]),
        }
    }

    if is_part_put {
        handle_part_put(&mut stream, state, opts, &path, body);
        let mut st = state.lock().unwrap();
        st.concurrent_puts -= 1;
        return;
    }

    match (method.as_str(), path.as_str()) {
        ("POST", "/api/multipart_uploads") => handle_create(&mut stream, state, opts, &body),
        ("POST", p) if p.starts_with("/api/multipart_uploads/") && p.ends_with("/part_url") => {
            handle_part_url(&mut stream, state, p, &body, port)
        }
        ("POST", p) if p.starts_with("/api/multipart_uploads/") && p.ends_with("/completions") => {
            handle_completions(&mut stream, state, p, &body)
        }
        _ => respond(&mut stream, "404 Not Found", &[], b"not found"),
    }
}

fn handle_create(
    stream: &mut TcpStream,
    state: &Arc<Mutex<ServerState>>,
    opts: MultipartServerOptions,
    body: &[u8],
) {
    if opts.fail_create {
        respond(stream, "503 Service Unavailable", &[], b"storage unavailable");
        return;
    }
    let parsed: serde_json::Value = serde_json::from_slice(body).unwrap_or_default();
    let filename = parsed
        .get("filename")
        .and_then(|f| f.as_str())
        .unwrap_or("unnamed.bin")
        .to_string();

    let mut st = state.lock().unwrap();
    st.next_upload += 1;
    let upload_id = format!("upload-{}", st.next_upload);
    let object_key = format!("datasets/{:08x}/{}", st.next_upload.wrapping_mul(0x9e37), filename);
    st.uploads.insert(
        upload_id.clone(),
        Upload {
            object_key: object_key.clone(),
            parts: HashMap::new(),
        },
    );
    drop(st);

    let payload = serde_json::json!({ "uploadId": upload_id, "fileKey": object_key });
    respond_json(stream, "201 Created", &payload);
}

fn handle_part_url(
    stream: &mut TcpStream,
    state: &Arc<Mutex<ServerState>>,
    path: &str,
    body: &[u8],
    port: u16,
) {
    let upload_id = match path_segment(path, 3) {
        Some(id) => id.to_string(),
        None => return respond(stream, "400 Bad Request", &[], b"bad path"),
    };
    if !state.lock().unwrap().uploads.contains_key(&upload_id) {
        return respond(stream, "404 Not Found", &[], b"unknown upload");
    }
    let parsed: serde_json::Value = serde_json::from_slice(body).unwrap_or_default();
    let part_number = parsed.get("partNumber").and_then(|n| n.as_u64()).unwrap_or(0);

    let signed_url = format!(
        "http://127.0.0.1:{}/parts/{}/{}?X-Local-Signature=test",
        port, upload_id, part_number
    );
    respond_json(stream, "200 OK", &serde_json::json!({ "signedUrl": signed_url }));
}

fn handle_part_put(
    stream: &mut TcpStream,
    state: &Arc<Mutex<ServerState>>,
    opts: MultipartServerOptions,
    path: &str,
    body: Vec<u8>,
) {
    let (upload_id, part_number) = match (path_segment(path, 2), path_segment(path, 3)) {
        (Some(id), Some(n)) => match n.parse::<u32>() {
            Ok(n) => (id.to_string(), n),
            Err(_) => return respond(stream, "400 Bad Request", &[], b"bad part number"),
        },
        _ => return respond(stream, "400 Bad Request", &[], b"bad path"),
    };

    if let Some(stall) = opts.stall_put {
        thread::sleep(stall);
    }
    if opts.fail_part == Some(part_number) {
        return respond(stream, "500 Internal Server Error", &[], b"part rejected");
    }

    let etag = format!("etag-{}-{}", upload_id, part_number);
    {
        let mut st = state.lock().unwrap();
        let Some(upload) = st.uploads.get_mut(&upload_id) else {
            return respond(stream, "404 Not Found", &[], b"unknown upload");
        };
        upload.parts.insert(part_number, (etag.clone(), body));
    }

    if opts.omit_etag {
        respond(stream, "200 OK", &[], b"");
    } else {
        let header = format!("ETag: \"{}\"", etag);
        respond(stream, "200 OK", &[&header], b"");
    }
}

fn handle_completions(
    stream: &mut TcpStream,
    state: &Arc<Mutex<ServerState>>,
    path: &str,
    body: &[u8],
) {
    let upload_id = match path_segment(path, 3) {
        Some(id) => id.to_string(),
        None => return respond(stream, "400 Bad Request", &[], b"bad path"),
    };
    let parsed: serde_json::Value = serde_json::from_slice(body).unwrap_or_default();
    let requested: Vec<(u32, String)> = parsed
        .get("parts")
        .and_then(|p| p.as_array())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| {
                    Some((
                        p.get("PartNumber")?.as_u64()? as u32,
                        p.get("ETag")?.as_str()?.to_string(),
                    ))
                })
                .collect()
        })
        .unwrap_or_default();

    let mut st = state.lock().unwrap();
    let Some(upload) = st.uploads.get(&upload_id) else {
        return respond(stream, "404 Not Found", &[], b"unknown upload");
    };
    // Every stored part must be claimed with a matching tag.
    let all_match = upload.parts.len() == requested.len()
        && requested
            .iter()
            .all(|(n, tag)| upload.parts.get(n).map(|(t, _)| t == tag).unwrap_or(false));
    let object_key = upload.object_key.clone();
    st.completions.push(requested);
    drop(st);

    if !all_match {
        return respond(stream, "400 Bad Request", &[], b"part set mismatch");
    }
    let payload = serde_json::json!({
        "response": {
            "Location": format!("https://test-bucket.local/{}", object_key),
            "Key": object_key,
            "Bucket": "test-bucket",
            "ETag": "\"final-etag\"",
        }
    });
    respond_json(stream, "200 OK", &payload);
}

/// Reads until the end of the header block; returns (head text, body bytes
/// already received past the blank line).
fn read_head(stream: &mut TcpStream) -> Option<(String, Vec<u8>)> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 8192];
    loop {
        if let Some(pos) = find_blank_line(&buf) {
            let head = String::from_utf8_lossy(&buf[..pos]).to_string();
            let body = buf[pos + 4..].to_vec();
            return Some((head, body));
        }
        match stream.read(&mut tmp) {
            Ok(0) | Err(_) => return None,
            Ok(n) => buf.extend_from_slice(&tmp[..n]),
        }
    }
}

fn find_blank_line(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Returns (method, path, lowercase header map).
fn parse_head(head: &str) -> (String, &str, HashMap<String, String>) {
    let mut lines = head.lines();
    let request_line = lines.next().unwrap_or("");
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("").to_string();
    let path = parts.next().unwrap_or("/");
    let mut headers = HashMap::new();
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_lowercase(), value.trim().to_string());
        }
    }
    (method, path, headers)
}

/// Nth slash-separated segment of `path` (segment 0 is empty).
fn path_segment(path: &str, n: usize) -> Option<&str> {
    path.split('/').nth(n).filter(|s| !s.is_empty())
}

fn respond(stream: &mut TcpStream, status: &str, extra_headers: &[&str], body: &[u8]) {
    let mut head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        status,
        body.len()
    );
    for h in extra_headers {
        head.push_str(h);
        head.push_str("\r\n");
    }
    head.push_str("\r\n");
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
}

fn respond_json(stream: &mut TcpStream, status: &str, payload: &serde_json::Value) {
    let body = serde_json::to_vec(payload).unwrap();
    respond(
        stream,
        status,
        &["Content-Type: application/json"],
        &body,
    );
}
