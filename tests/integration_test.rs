use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Cursor;
use std::process::{Child, Command};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

// Use atomic counter to give each test a unique port
static PORT_COUNTER: AtomicU16 = AtomicU16::new(9500);

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
#[serde(rename_all = "camelCase")]
struct StepTiming {
    name: String,
    time_ms: u64,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
#[serde(rename_all = "camelCase")]
struct ProcessResponse {
    width: u32,
    height: u32,
    channels: u8,
    equalizer: Option<String>,
    original_histogram: HashMap<String, Vec<u32>>,
    processed_histogram: HashMap<String, Vec<u32>>,
    normalized_histogram: HashMap<String, Vec<f32>>,
    steps: Vec<StepTiming>,
    total_time_ms: u64,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct ErrorResponse {
    error: String,
    code: String,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Capabilities {
    #[serde(rename = "adaptiveEqualization")]
    adaptive_equalization: bool,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct InfoResponse {
    version: String,
    backend: String,
    ready: bool,
    last_error: Option<String>,
    capabilities: Option<Capabilities>,
    max_file_size_bytes: usize,
    live_buffers: u64,
    has_image: bool,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct FrameSummary {
    index: usize,
    key: String,
    title: String,
    explanation: String,
    note: Option<String>,
    width: u32,
    height: u32,
    channels: u8,
}

#[derive(Debug, Deserialize)]
struct ExplainResponse {
    frames: Vec<FrameSummary>,
}

struct TestServer {
    child: Child,
    port: u16,
}

impl TestServer {
    fn start() -> Self {
        Self::start_with(&[])
    }

    fn start_with(extra_args: &[&str]) -> Self {
        let port = PORT_COUNTER.fetch_add(1, Ordering::SeqCst);

        let child = Command::new(env!("CARGO_BIN_EXE_vision-lab-server"))
            .args(["--host", "127.0.0.1", "--port", &port.to_string()])
            .args(extra_args)
            .spawn()
            .expect("Failed to start server");

        // Wait for server to be ready
        std::thread::sleep(Duration::from_secs(2));

        Self { child, port }
    }

    fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
    }
}

fn encode_png(image: DynamicImage) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("Failed to encode PNG");
    bytes.into_inner()
}

fn gradient_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    encode_png(DynamicImage::ImageRgb8(img))
}

async fn upload(
    client: &reqwest::Client,
    base_url: &str,
    file_bytes: Vec<u8>,
    options: Option<&str>,
) -> reqwest::Response {
    let part = Part::bytes(file_bytes)
        .file_name("upload.png")
        .mime_str("image/png")
        .unwrap();

    let mut form = Form::new().part("file", part);
    if let Some(options) = options {
        form = form.text("options", options.to_string());
    }

    client
        .post(format!("{}/image", base_url))
        .multipart(form)
        .send()
        .await
        .expect("Failed to send request")
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = TestServer::start();
    let client = reqwest::Client::new();

    let response: HealthResponse = client
        .get(format!("{}/health", server.base_url()))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");

    assert_eq!(response.status, "ok");
}

#[tokio::test]
async fn test_info_reports_ready_runtime() {
    let server = TestServer::start();
    let client = reqwest::Client::new();

    let response: InfoResponse = client
        .get(format!("{}/info", server.base_url()))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");

    assert!(!response.version.is_empty());
    assert_eq!(response.backend, "native");
    assert!(response.ready);
    assert_eq!(response.last_error, None);
    assert!(response.capabilities.is_some());
    assert!(!response.has_image);
}

#[tokio::test]
async fn test_flat_image_with_clahe() {
    let server = TestServer::start();
    let client = reqwest::Client::new();

    let flat = encode_png(DynamicImage::ImageLuma8(GrayImage::from_pixel(
        100,
        100,
        Luma([128]),
    )));
    let response = upload(
        &client,
        &server.base_url(),
        flat,
        Some(r#"{"clahe": true, "claheClipLimit": 2.0, "claheTileSize": 8}"#),
    )
    .await;
    assert!(response.status().is_success());

    let result: ProcessResponse = response.json().await.expect("Failed to parse response");
    assert_eq!((result.width, result.height, result.channels), (100, 100, 1));
    let expected = if cfg!(feature = "clahe") { "adaptive" } else { "global" };
    assert_eq!(result.equalizer.as_deref(), Some(expected));

    let gray = &result.processed_histogram["gray"];
    assert_eq!(gray.iter().filter(|&&count| count > 0).count(), 1);
    assert_eq!(gray.iter().sum::<u32>(), 100 * 100);
}

#[tokio::test]
async fn test_resize_then_update_options() {
    let server = TestServer::start();
    let client = reqwest::Client::new();

    let response = upload(
        &client,
        &server.base_url(),
        gradient_png(120, 45),
        Some(r#"{"resize": {"width": 50, "height": 50}}"#),
    )
    .await;
    let result: ProcessResponse = response.json().await.expect("Failed to parse response");
    assert_eq!((result.width, result.height), (50, 50));
    assert_eq!(result.channels, 3);
    assert_eq!(result.original_histogram["red"].iter().sum::<u32>(), 120 * 45);

    let result: ProcessResponse = client
        .put(format!("{}/options", server.base_url()))
        .body(r#"{"rotation": 90, "sobel": true}"#)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!((result.width, result.height), (45, 120));
    assert_eq!(result.channels, 1);
    let names: Vec<&str> = result.steps.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["rotate", "sobel"]);

    let png = client
        .get(format!("{}/image/processed", server.base_url()))
        .send()
        .await
        .expect("Failed to send request")
        .bytes()
        .await
        .expect("Failed to read body");
    let decoded = image::load_from_memory(&png).expect("Failed to decode PNG");
    assert_eq!((decoded.width(), decoded.height()), (45, 120));
}

#[tokio::test]
async fn test_failed_update_keeps_previous_image() {
    let server = TestServer::start();
    let client = reqwest::Client::new();

    let tiny = encode_png(DynamicImage::ImageLuma8(GrayImage::new(1, 1)));
    let response = upload(&client, &server.base_url(), tiny, None).await;
    assert!(response.status().is_success());

    let response = client
        .put(format!("{}/options", server.base_url()))
        .body(r#"{"centerCrop": true}"#)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let error: ErrorResponse = response.json().await.expect("Failed to parse response");
    assert_eq!(error.code, "PROCESSING_ERROR");
    assert!(error.error.starts_with("Error processing image"));

    let response = client
        .get(format!("{}/image/processed", server.base_url()))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
}

#[tokio::test]
async fn test_disabled_clahe_falls_back() {
    let server = TestServer::start_with(&["--disable-clahe"]);
    let client = reqwest::Client::new();

    let response = upload(
        &client,
        &server.base_url(),
        gradient_png(64, 64),
        Some(r#"{"colorClahe": true}"#),
    )
    .await;
    let result: ProcessResponse = response.json().await.expect("Failed to parse response");

    assert_eq!(result.equalizer.as_deref(), Some("global"));
    assert_eq!(result.channels, 3);
}

#[tokio::test]
async fn test_explain_mode() {
    let server = TestServer::start();
    let client = reqwest::Client::new();

    upload(&client, &server.base_url(), gradient_png(64, 48), None).await;

    let response: ExplainResponse = client
        .post(format!("{}/explain", server.base_url()))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");

    assert_eq!(response.frames.len(), 6);
    assert_eq!(response.frames[0].key, "original");
    assert_eq!(response.frames[0].channels, 3);
    assert!(response.frames.iter().all(|f| !f.explanation.is_empty()));

    let frame = client
        .get(format!("{}/explain/2", server.base_url()))
        .send()
        .await
        .expect("Failed to send request");
    assert!(frame.status().is_success());
    assert_eq!(
        frame.headers()[reqwest::header::CONTENT_TYPE],
        "image/png"
    );
}

#[tokio::test]
async fn test_rejects_missing_file_and_garbage() {
    let server = TestServer::start();
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/image", server.base_url()))
        .multipart(Form::new().text("options", "{}"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let error: ErrorResponse = response.json().await.expect("Failed to parse response");
    assert_eq!(error.code, "MISSING_FILE");

    let response = upload(&client, &server.base_url(), b"not an image".to_vec(), None).await;
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let error: ErrorResponse = response.json().await.expect("Failed to parse response");
    assert_eq!(error.code, "DECODE_ERROR");
}

#[tokio::test]
async fn test_upload_size_limit() {
    let server = TestServer::start_with(&["--max-file-size", "1000"]);
    let client = reqwest::Client::new();

    let mut state: u32 = 0x9e37_79b9;
    let noisy = RgbImage::from_fn(64, 64, |_, _| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let [r, g, b, _] = state.to_le_bytes();
        Rgb([r, g, b])
    });
    let bytes = encode_png(DynamicImage::ImageRgb8(noisy));
    assert!(bytes.len() > 1000);

    let response = upload(&client, &server.base_url(), bytes, None).await;
    assert_eq!(response.status(), reqwest::StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_clear_releases_session() {
    let server = TestServer::start();
    let client = reqwest::Client::new();

    upload(&client, &server.base_url(), gradient_png(16, 16), None).await;

    let response = client
        .delete(format!("{}/image", server.base_url()))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), reqwest::StatusCode::NO_CONTENT);

    let info: InfoResponse = client
        .get(format!("{}/info", server.base_url()))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert!(!info.has_image);
    assert_eq!(info.live_buffers, 0);

    let response = client
        .get(format!("{}/image/original", server.base_url()))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), reqwest::StatusCode::CONFLICT);
}
