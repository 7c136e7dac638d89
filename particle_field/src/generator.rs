//! Prompt-to-shape generation.
//!
//! A [`ShapeGenerator`] turns a text prompt into a flat list of coordinates.
//! Network calls block, so they run on a [`GenerationWorker`] thread; the
//! render loop hands it `(token, prompt)` requests and drains finished
//! [`GenerationOutcome`]s once per tick.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use serde_json::{json, Value};
use thiserror::Error;

use cloud_shapes::{parse_points_payload, CloudError};

// ════════════════════════════════════════════════════════════════════════════
// Errors
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("no API key (set GEMINI_API_KEY or API_KEY)")]
    MissingApiKey,

    #[error("request failed: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("bad points payload: {0}")]
    Payload(#[from] CloudError),

    #[error("generation worker has stopped")]
    WorkerGone,
}

// ════════════════════════════════════════════════════════════════════════════
// ShapeGenerator trait
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can answer a prompt with `[x1, y1, z1, x2, …]`.
pub trait ShapeGenerator: Send + 'static {
    fn generate(&self, prompt: &str) -> Result<Vec<f32>, GenerationError>;
}

/// Instruction sent with every prompt.
pub const GEOMETRY_INSTRUCTION: &str = "\
You generate 3D point clouds. Reply with a JSON object holding one key, \
\"points\": a flat array of numbers [x1, y1, z1, x2, y2, z2, ...]. \
Use between 2000 and 3000 points. Keep every coordinate roughly within \
[-4, 4] and place the points on the surface of the described object so \
its silhouette is recognisable.";

fn checked_prompt(prompt: &str) -> Result<&str, GenerationError> {
    match prompt.trim() {
        "" => Err(GenerationError::EmptyPrompt),
        p  => Ok(p),
    }
}

fn transport_error(e: ureq::Error) -> GenerationError {
    match e {
        ureq::Error::Status(code, resp) => {
            let body = resp.into_string().unwrap_or_default();
            GenerationError::Transport(format!("HTTP {}: {}", code, body.trim()))
        }
        other => GenerationError::Transport(other.to_string()),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GeminiGenerator
// ════════════════════════════════════════════════════════════════════════════

pub const DEFAULT_MODEL:    &str = "gemini-3-flash-preview";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeminiConfig {
    pub api_key:  Option<String>,
    pub model:    String,
    pub base_url: String,
    pub timeout:  Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            api_key:  None,
            model:    DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout:  Duration::from_secs(90),
        }
    }
}

impl GeminiConfig {
    /// Defaults, with the key from `GEMINI_API_KEY` (or `API_KEY`) and the
    /// model from `PARTICLE_FIELD_MODEL` when set.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        GeminiConfig {
            api_key: var("GEMINI_API_KEY").or_else(|| var("API_KEY")),
            model:   var("PARTICLE_FIELD_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            ..GeminiConfig::default()
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url.trim_end_matches('/'), self.model)
    }
}

/// Client for the Gemini `generateContent` REST call, constrained to a JSON
/// response with a numeric `points` array.
pub struct GeminiGenerator {
    cfg: GeminiConfig,
}

impl GeminiGenerator {
    pub fn new(cfg: GeminiConfig) -> Self { GeminiGenerator { cfg } }

    pub fn request_body(prompt: &str) -> Value {
        json!({
            "systemInstruction": { "parts": [{ "text": GEOMETRY_INSTRUCTION }] },
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "points": { "type": "ARRAY", "items": { "type": "NUMBER" } }
                    },
                    "required": ["points"]
                }
            }
        })
    }
}

impl ShapeGenerator for GeminiGenerator {
    fn generate(&self, prompt: &str) -> Result<Vec<f32>, GenerationError> {
        let prompt = checked_prompt(prompt)?;
        let key = self.cfg.api_key.as_deref().ok_or(GenerationError::MissingApiKey)?;

        let reply: Value = ureq::post(&self.cfg.endpoint())
            .timeout(self.cfg.timeout)
            .set("x-goog-api-key", key)
            .send_json(Self::request_body(prompt))
            .map_err(transport_error)?
            .into_json()
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;

        extract_gemini_points(&reply)
    }
}

/// Pull the points out of a `generateContent` reply.
pub fn extract_gemini_points(reply: &Value) -> Result<Vec<f32>, GenerationError> {
    if let Some(msg) = reply.pointer("/error/message").and_then(Value::as_str) {
        return Err(GenerationError::Transport(msg.to_string()));
    }
    let text = reply
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .ok_or_else(|| GenerationError::Malformed("reply has no candidate text".into()))?;
    Ok(parse_points_payload(strip_code_fence(text))?)
}

/// Drop a surrounding Markdown code fence, if the model added one.
fn strip_code_fence(text: &str) -> &str {
    let t = text.trim();
    match t.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphabetic());
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => t,
    }
}

// ════════════════════════════════════════════════════════════════════════════
// EndpointGenerator: any service speaking {"prompt"} → {"points"}
// ════════════════════════════════════════════════════════════════════════════

pub struct EndpointGenerator {
    pub url:     String,
    pub timeout: Duration,
}

impl EndpointGenerator {
    pub fn new(url: impl Into<String>) -> Self {
        EndpointGenerator { url: url.into(), timeout: Duration::from_secs(90) }
    }
}

impl ShapeGenerator for EndpointGenerator {
    fn generate(&self, prompt: &str) -> Result<Vec<f32>, GenerationError> {
        let prompt = checked_prompt(prompt)?;
        let body = ureq::post(&self.url)
            .timeout(self.timeout)
            .send_json(json!({ "prompt": prompt }))
            .map_err(transport_error)?
            .into_string()
            .map_err(|e| GenerationError::Transport(e.to_string()))?;
        Ok(parse_points_payload(&body)?)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GeneratorChoice: configuration
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GeneratorChoice {
    Gemini(GeminiConfig),
    Endpoint { url: String },
}

impl Default for GeneratorChoice {
    fn default() -> Self { GeneratorChoice::Gemini(GeminiConfig::default()) }
}

impl GeneratorChoice {
    pub fn build(&self) -> Box<dyn ShapeGenerator> {
        match self {
            GeneratorChoice::Gemini(cfg)      => Box::new(GeminiGenerator::new(cfg.clone())),
            GeneratorChoice::Endpoint { url } => Box::new(EndpointGenerator::new(url.clone())),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            GeneratorChoice::Gemini(cfg) if cfg.api_key.is_none() =>
                format!("Gemini {} (no API key set)", cfg.model),
            GeneratorChoice::Gemini(cfg)      => format!("Gemini {}", cfg.model),
            GeneratorChoice::Endpoint { url } => format!("endpoint {}", url),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GenerationWorker: the request thread
// ════════════════════════════════════════════════════════════════════════════

/// A finished request.
#[derive(Debug)]
pub struct GenerationOutcome {
    pub token:  u64,
    pub result: Result<Vec<f32>, GenerationError>,
}

/// Handle to the generation thread.  Dropping it ends the thread once the
/// request in progress (if any) returns.
pub struct GenerationWorker {
    req_tx:    Sender<(u64, String)>,
    result_rx: Receiver<GenerationOutcome>,
}

impl GenerationWorker {
    pub fn spawn(generator: Box<dyn ShapeGenerator>) -> Self {
        let (req_tx, req_rx) = mpsc::channel::<(u64, String)>();
        let (result_tx, result_rx) = mpsc::channel::<GenerationOutcome>();

        thread::spawn(move || worker_thread(generator, req_rx, result_tx));

        GenerationWorker { req_tx, result_rx }
    }

    pub fn request(&self, token: u64, prompt: String) -> Result<(), GenerationError> {
        self.req_tx.send((token, prompt)).map_err(|_| GenerationError::WorkerGone)
    }

    /// Drain finished requests (non-blocking).
    pub fn drain(&self) -> Vec<GenerationOutcome> {
        let mut out = Vec::new();
        while let Ok(o) = self.result_rx.try_recv() { out.push(o); }
        out
    }
}

fn worker_thread(
    generator: Box<dyn ShapeGenerator>,
    req_rx:    Receiver<(u64, String)>,
    result_tx: Sender<GenerationOutcome>,
) {
    for (token, prompt) in req_rx {
        log::info!("request {}: generating {:?}", token, prompt);
        let result = generator.generate(&prompt);
        match &result {
            Ok(points) => log::info!("request {}: {} values", token, points.len()),
            Err(e)     => log::warn!("request {}: {}", token, e),
        }
        if result_tx.send(GenerationOutcome { token, result }).is_err() {
            log::debug!("request {}: session closed, result dropped", token);
            return;
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
