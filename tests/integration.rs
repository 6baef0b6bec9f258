//! End-to-end tests for the marcus CLI
//!
//! Each test writes markdown fixtures into a temporary directory, serves a
//! small JSON API from a stub server on 127.0.0.1, and runs the real binary
//! against it.

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use serde_json::json;

/// Test context with a fixture directory and a running stub server
struct TestContext {
    /// Temporary directory holding the markdown fixtures
    dir: tempfile::TempDir,
    /// Isolated config home so no user config leaks in
    config_home: PathBuf,
    server: StubServer,
}

impl TestContext {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config_home = dir.path().join(".config");
        std::fs::create_dir_all(&config_home).expect("Failed to create config dir");

        Self {
            dir,
            config_home,
            server: StubServer::start(),
        }
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Write a fixture, replacing `{{server}}` with the stub server base URL
    fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create fixture dir");
        }
        let content = content.replace("{{server}}", &self.server.url());
        std::fs::write(&path, content).expect("Failed to write fixture");
        path
    }

    /// Run marcus with the given arguments
    fn run(&self, args: &[&str]) -> MarcusOutput {
        let output = Command::new(env!("CARGO_BIN_EXE_marcus"))
            .args(args)
            .current_dir(self.dir.path())
            .env("XDG_CONFIG_HOME", &self.config_home)
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to run marcus");

        MarcusOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
        }
    }

    fn run_path(&self, path: &Path, extra: &[&str]) -> MarcusOutput {
        let path = path.to_str().expect("Non UTF-8 temp path");
        let mut args = extra.to_vec();
        args.push(path);
        self.run(&args)
    }
}

/// Output from a marcus run
#[derive(Debug)]
struct MarcusOutput {
    stdout: String,
    stderr: String,
    success: bool,
}

impl MarcusOutput {
    fn assert_success(&self) -> &Self {
        assert!(
            self.success,
            "marcus failed:\nstdout: {}\nstderr: {}",
            self.stdout, self.stderr
        );
        self
    }

    fn assert_failure(&self) -> &Self {
        assert!(
            !self.success,
            "marcus unexpectedly passed:\nstdout: {}",
            self.stdout
        );
        self
    }

    fn assert_contains(&self, needle: &str) -> &Self {
        assert!(
            self.stdout.contains(needle),
            "Expected {:?} in output:\n{}",
            needle,
            self.stdout
        );
        self
    }

    fn assert_not_contains(&self, needle: &str) -> &Self {
        assert!(
            !self.stdout.contains(needle),
            "Did not expect {:?} in output:\n{}",
            needle,
            self.stdout
        );
        self
    }
}

// ============== Stub server ==============

/// A tiny HTTP/1.1 server answering one request per connection
struct StubServer {
    addr: SocketAddr,
}

struct StubRequest {
    method: String,
    path: String,
    headers: BTreeMap<String, String>,
    body: String,
}

impl StubServer {
    fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind stub server");
        let addr = listener.local_addr().expect("Stub server has no address");
        let job_polls = Arc::new(AtomicUsize::new(0));

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                let job_polls = job_polls.clone();
                thread::spawn(move || handle_connection(stream, &job_polls));
            }
        });

        Self { addr }
    }

    fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

fn handle_connection(stream: TcpStream, job_polls: &AtomicUsize) {
    let Some(request) = read_request(&stream) else {
        return;
    };
    let (status, body) = route(&request, job_polls);
    let reason = match status {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        _ => "Not Found",
    };

    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let mut stream = stream;
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

fn read_request(stream: &TcpStream) -> Option<StubRequest> {
    let mut reader = BufReader::new(stream.try_clone().ok()?);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let mut headers = BTreeMap::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).ok()? == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let length = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let mut body = vec![0; length];
    reader.read_exact(&mut body).ok()?;

    Some(StubRequest {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&body).to_string(),
    })
}

fn route(request: &StubRequest, job_polls: &AtomicUsize) -> (u16, String) {
    let user = json!({"json": {"id": 7, "name": "ada"}});
    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/ping") => (200, json!({"ok": true}).to_string()),
        ("POST", "/users") => (201, user.to_string()),
        ("GET", "/users/7") => (200, user.to_string()),
        ("GET", "/headers") => (200, json!({"headers": request.headers}).to_string()),
        ("POST", "/echo") => (
            200,
            json!({
                "body": request.body,
                "content_type": request.headers.get("content-type"),
            })
            .to_string(),
        ),
        ("GET", "/jobs/1") => {
            if job_polls.fetch_add(1, Ordering::SeqCst) < 2 {
                (202, json!({"state": "pending"}).to_string())
            } else {
                (200, json!({"state": "done"}).to_string())
            }
        }
        ("GET", "/token") => (200, json!({"token": "aGVsbG8="}).to_string()),
        _ => (404, json!({"error": "not found"}).to_string()),
    }
}

// ============== Tests ==============

#[test]
fn test_single_file_passes() {
    let ctx = TestContext::new();
    let file = ctx.write(
        "ping.md",
        "# Ping\n\n## Ping responds\nGET {{server}}/ping\n\nAssert:\n- Status is 200\n- Field `ok` equals `true`\n- Duration less than 5s\n",
    );

    ctx.run_path(&file, &[])
        .assert_success()
        .assert_contains(&format!("{} (1 tests)", file.display()))
        .assert_contains("  ✓ Ping responds")
        .assert_contains("1 passed in ");
}

#[test]
fn test_status_failure_reports_preview() {
    let ctx = TestContext::new();
    let file = ctx.write(
        "users.md",
        "## Missing user\nGET {{server}}/users/99\n\nAssert:\n- Status is 200\n",
    );

    ctx.run_path(&file, &[])
        .assert_failure()
        .assert_contains("  ✗ Missing user")
        .assert_contains("    → status assertion failed: expected 200, got 404")
        .assert_contains("       Response: {\"error\":\"not found\"}")
        .assert_contains("0 passed, 1 failed in ");
}

#[test]
fn test_quiet_hides_passes_and_preview() {
    let ctx = TestContext::new();
    let file = ctx.write(
        "mixed.md",
        "## Good\nGET {{server}}/ping\nAssert:\n- Status is 200\n\n## Bad\nGET {{server}}/nowhere\nAssert:\n- Status is 200\n",
    );

    ctx.run_path(&file, &["--quiet"])
        .assert_failure()
        .assert_not_contains("✓ Good")
        .assert_contains("✗ Bad")
        .assert_contains("expected 200, got 404")
        .assert_not_contains("Response:")
        .assert_contains("1 passed, 1 failed in ");
}

#[test]
fn test_saved_variables_flow_to_later_tests() {
    let ctx = TestContext::new();
    let file = ctx.write(
        "flow.md",
        r#"---
root: {{server}}/
---

## Create user
POST /users

```json
{"name": "ada"}
```

Assert:
- Status is 201

Save:
- Field `json.id` as `user_id`

## Fetch user
GET /users/{{user_id}}

Assert:
- Status is 200
- Field `json.name` equals `"ada"`
- Body partially matches:
```json
{
>>  "json.id": 7,
    "ignored": true
}
```
"#,
    );

    ctx.run_path(&file, &[])
        .assert_success()
        .assert_contains("✓ Create user")
        .assert_contains("✓ Fetch user")
        .assert_contains("2 passed in ");
}

#[test]
fn test_parallel_jobs_do_not_share_variables() {
    let ctx = TestContext::new();
    let file = ctx.write(
        "flow.md",
        "## Create user\nPOST {{server}}/users\nSave:\n- Field `json.id` as `user_id`\n\n## Fetch user\nGET {{server}}/users/{{user_id}}\nAssert:\n- Status is 200\n",
    );

    ctx.run_path(&file, &["--parallel", "--workers", "2"])
        .assert_failure()
        .assert_contains("✓ Create user")
        .assert_contains("✗ Fetch user")
        .assert_contains("1 passed, 1 failed in ");
}

#[test]
fn test_directory_run_groups_by_file() {
    let ctx = TestContext::new();
    ctx.write("api/b.md", "## Token\nGET {{server}}/token\nAssert:\n- Field `token | base64` equals `hello`\n- Body contains `token`\n");
    ctx.write(
        "api/a.md",
        "## Ping one\nGET {{server}}/ping\n\n## Ping two\nGET {{server}}/ping\n",
    );
    ctx.write("api/README.md", "# Notes only\n");

    let output = ctx.run(&["--parallel", "api"]);
    output
        .assert_success()
        .assert_contains("api (2 files, 3 tests)")
        .assert_contains("3 passed in ");

    let a = output.stdout.find("a.md").expect("a.md listed");
    let b = output.stdout.find("b.md").expect("b.md listed");
    assert!(a < b, "files out of order:\n{}", output.stdout);
    let one = output.stdout.find("✓ Ping one").unwrap();
    let two = output.stdout.find("✓ Ping two").unwrap();
    assert!(one < two);
}

#[test]
fn test_wait_until_status_polls() {
    let ctx = TestContext::new();
    let file = ctx.write(
        "jobs.md",
        "## Job completes\nGET {{server}}/jobs/1\n- Wait until status is 200\n- Retry 5 times every 10ms\n\nAssert:\n- Field `state` equals `done`\n",
    );

    ctx.run_path(&file, &[])
        .assert_success()
        .assert_contains("✓ Job completes");
}

#[test]
fn test_wait_timeout_message() {
    let ctx = TestContext::new();
    let file = ctx.write(
        "jobs.md",
        "## Job never completes\nGET {{server}}/jobs/1\n- Wait until field `state` equals `done`\n- Retry 2 times every 10ms\n",
    );

    ctx.run_path(&file, &[])
        .assert_failure()
        .assert_contains("wait for field `state` equals `done` failed: got `pending` after 2 attempts");
}

#[test]
fn test_headers_form_and_file_bodies() {
    let ctx = TestContext::new();
    ctx.write("payloads/expected.json", "{\n  \"ok\": true\n}\n");
    ctx.write("payloads/user.json", "{\"name\": \"ada\"}");
    let file = ctx.write(
        "bodies.md",
        r#"---
root: {{server}}
headers:
  X-Api-Key: secret
---

## Default headers are sent
GET /headers

Assert:
- Field `headers.x-api-key` equals `secret`

## Form bodies are encoded
POST /echo

```form
b=2
a=hello world
```

Assert:
- Field `body` equals `a=hello+world&b=2`
- Field `content_type` equals `application/x-www-form-urlencoded`

## File bodies are loaded
POST /echo

```json
FILE: payloads/user.json
```

Assert:
- Field `body` equals `{"name": "ada"}`

## Body matches file
GET /ping

Assert:
- Body matches file `payloads/expected.json`
"#,
    );

    ctx.run_path(&file, &[])
        .assert_success()
        .assert_contains("4 passed in ");
}

#[test]
fn test_only_runs_one_test() {
    let ctx = TestContext::new();
    let file = ctx.write(
        "many.md",
        "## First\nGET {{server}}/ping\n\n## Second\nGET {{server}}/token\n\n## Third\nGET {{server}}/nowhere\nAssert:\n- Status is 200\n",
    );

    ctx.run_path(&file, &["--only", "2"])
        .assert_success()
        .assert_contains("(1 tests)")
        .assert_contains("✓ Second")
        .assert_not_contains("First")
        .assert_contains("1 passed in ");

    let output = ctx.run_path(&file, &["--only", "9"]);
    output.assert_failure();
    assert!(output.stderr.contains("--only 9 is out of range: found 3 tests"));
}

#[test]
fn test_config_file_sets_retry_defaults() {
    let ctx = TestContext::new();
    let config = ctx.write("marcus.toml", "[retry]\ndelay_ms = 5\nmax_attempts = 1\n");
    let file = ctx.write(
        "jobs.md",
        "## Job\nGET {{server}}/jobs/1\n- Wait until status is 200\n",
    );

    ctx.run_path(&file, &["--config", config.to_str().unwrap()])
        .assert_failure()
        .assert_contains("wait for status 200 failed: got 202 after 1 attempts");
}

#[test]
fn test_empty_targets() {
    let ctx = TestContext::new();
    std::fs::create_dir_all(ctx.path("empty")).unwrap();
    ctx.run(&["empty"])
        .assert_success()
        .assert_contains("No test files found.");

    ctx.write("prose/notes.md", "# Just notes\n\nNothing to run here.\n");
    ctx.run(&["prose"])
        .assert_success()
        .assert_contains("No tests found.");
}

#[test]
fn test_missing_target_is_an_error() {
    let ctx = TestContext::new();
    let output = ctx.run(&["does-not-exist"]);
    output.assert_failure();
    assert!(
        output.stderr.contains("Error: cannot access 'does-not-exist'"),
        "stderr: {}",
        output.stderr
    );
}
