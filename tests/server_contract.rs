//! Endpoint contract tests against a spawned `storybot serve` process.
//!
//! Each server binds port 0 and the test reads the resolved address from
//! the child's stdout, so suites never collide with each other or with
//! anything else on the host.
//!
//! Vendor API keys are stripped from the child's environment, so these
//! tests also pin the degraded behavior: `/chat` answers with the fallback
//! line, `/generate-image` fails with `vendor_error`.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn storybot_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop();
    path.pop();
    path.push("storybot");
    path
}

struct ServerGuard {
    child: Child,
}

impl Drop for ServerGuard {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn spawn_server(with_index: bool) -> (TempDir, ServerGuard, String) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();

    if with_index {
        fs::create_dir_all(root.join("data")).unwrap();
        fs::write(
            root.join("data/story-index.json"),
            r#"{"embeddings": [[1.0, 0.0], [0.0, 1.0]], "texts": ["east", "north"]}"#,
        )
        .unwrap();
    }

    let config_path = root.join("storybot.toml");
    fs::write(
        &config_path,
        format!(
            "[index]\npath = \"{}/data/story-index.json\"\n\n[server]\nbind = \"127.0.0.1:0\"\n",
            root.display(),
        ),
    )
    .unwrap();

    let mut child = Command::new(storybot_binary())
        .arg("--config")
        .arg(&config_path)
        .arg("serve")
        .env_remove("GEMINI_API_KEY")
        .env_remove("STABILITY_API_KEY")
        .stdout(Stdio::piped())
        .spawn()
        .expect("failed to spawn storybot serve");

    let base = read_bound_address(&mut child);
    wait_until_healthy(&base);

    (tmp, ServerGuard { child }, base)
}

/// The server reports its resolved address on stdout once bound.
fn read_bound_address(child: &mut Child) -> String {
    let stdout = child.stdout.take().expect("child stdout not piped");
    let mut reader = BufReader::new(stdout);
    let mut line = String::new();
    loop {
        line.clear();
        let n = reader.read_line(&mut line).expect("read from child stdout");
        if n == 0 {
            let _ = child.kill();
            panic!("server exited before reporting its address");
        }
        if let Some(addr) = line.trim().strip_prefix("Story backend listening on ") {
            return addr.to_string();
        }
    }
}

fn wait_until_healthy(base: &str) {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(1))
        .build()
        .unwrap();
    let deadline = Instant::now() + Duration::from_secs(15);
    loop {
        if let Ok(resp) = client.get(format!("{}/health", base)).send() {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server at {} never became healthy", base);
        }
        std::thread::sleep(Duration::from_millis(100));
    }
}

fn client() -> reqwest::blocking::Client {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

#[test]
fn test_health_and_index_endpoints() {
    let (_tmp, _guard, base) = spawn_server(true);
    let client = client();

    let health: serde_json::Value = client
        .get(format!("{}/health", base))
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert!(health["version"].is_string());

    let index: serde_json::Value = client
        .get(format!("{}/api/pdf-index", base))
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(index["texts"], serde_json::json!(["east", "north"]));
    assert_eq!(index["embeddings"][0][0], 1.0);
}

#[test]
fn test_pdf_index_404_when_unbuilt() {
    let (_tmp, _guard, base) = spawn_server(false);

    let resp = client()
        .get(format!("{}/api/pdf-index", base))
        .send()
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
    let body: serde_json::Value = resp.json().unwrap();
    assert_eq!(body["error"]["code"], "not_found");
}

#[test]
fn test_chat_validation_and_fallback() {
    let (_tmp, _guard, base) = spawn_server(true);
    let client = client();

    // Empty question -> 400 with the error contract body
    let resp = client
        .post(format!("{}/chat", base))
        .json(&serde_json::json!({ "question": "   " }))
        .send()
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: serde_json::Value = resp.json().unwrap();
    assert_eq!(body["error"]["code"], "bad_request");

    // No vendor key -> still 200, with the canned fallback answer
    let resp = client
        .post(format!("{}/chat", base))
        .json(&serde_json::json!({ "question": "tell me about dragons" }))
        .send()
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: serde_json::Value = resp.json().unwrap();
    let answer = body["answer"].as_str().unwrap();
    assert!(answer.contains("tripped over my own feet"), "got: {}", answer);
}

#[test]
fn test_generate_image_validation_and_vendor_error() {
    let (_tmp, _guard, base) = spawn_server(true);
    let client = client();

    let resp = client
        .post(format!("{}/generate-image", base))
        .json(&serde_json::json!({ "prompt": "" }))
        .send()
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    // No vendor key -> 502 vendor_error (clients swallow this into "no image")
    let resp = client
        .post(format!("{}/generate-image", base))
        .json(&serde_json::json!({ "prompt": "a friendly dragon" }))
        .send()
        .unwrap();
    assert_eq!(resp.status().as_u16(), 502);
    let body: serde_json::Value = resp.json().unwrap();
    assert_eq!(body["error"]["code"], "vendor_error");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("STABILITY_API_KEY"));
}
