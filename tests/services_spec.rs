mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::NaiveDate;
use common::*;
use om_coach::config::{CertificateConfig, OpenAiConfig, ProviderKind};
use om_coach::services::{
    pdf::looks_like_pdf, CertificateChain, CertificateProvider, CertificateRequest,
    DialogueService, LocalCertificate, NarrationService, OpenAiClient, RemoteReportAgent, Sampling,
    ServiceError,
};
use om_core::{Intent, SessionConfig, Transcript, Turn};
use serde_json::{json, Value};

/// Requests seen by the mock upstream.
#[derive(Clone, Default)]
struct Captured {
    bodies: Arc<Mutex<Vec<Value>>>,
    auth: Arc<Mutex<Vec<String>>>,
}

impl Captured {
    fn last_body(&self) -> Value {
        self.bodies.lock().unwrap().last().cloned().unwrap_or(Value::Null)
    }
}

async fn chat(State(captured): State<Captured>, headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    captured.auth.lock().unwrap().push(auth);
    captured.bodies.lock().unwrap().push(body);
    Json(json!({ "choices": [{ "message": { "content": "  Breathe in slowly.  " } }] }))
}

async fn speech(State(captured): State<Captured>, Json(body): Json<Value>) -> impl IntoResponse {
    captured.bodies.lock().unwrap().push(body);
    ([(header::CONTENT_TYPE, "audio/mpeg")], b"ID3audio".to_vec())
}

async fn report(State(captured): State<Captured>, Json(body): Json<Value>) -> impl IntoResponse {
    captured.bodies.lock().unwrap().push(body);
    ([(header::CONTENT_TYPE, "application/pdf")], b"%PDF-1.4 agent".to_vec())
}

async fn report_as_html() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/html")], "<html>maintenance</html>")
}

async fn overloaded() -> impl IntoResponse {
    (StatusCode::SERVICE_UNAVAILABLE, "overloaded")
}

/// Serve a mock upstream on an ephemeral port and return its base URL.
async fn spawn_upstream() -> (String, Captured) {
    let captured = Captured::default();
    let app = Router::new()
        .route("/v1/chat/completions", post(chat))
        .route("/v1/audio/speech", post(speech))
        .route("/report", post(report))
        .route("/report/html", post(report_as_html))
        .route("/down/chat/completions", post(overloaded))
        .route("/down/report", post(overloaded))
        .with_state(captured.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock upstream");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    (format!("http://{addr}"), captured)
}

fn openai(base_url: String, api_key: Option<&str>) -> OpenAiClient {
    OpenAiClient::from_config(&OpenAiConfig {
        api_key: api_key.map(str::to_string),
        base_url,
        timeout_secs: 5,
        ..OpenAiConfig::default()
    })
}

fn request() -> CertificateRequest {
    let config = SessionConfig::from_keys("sage_arjun", Intent::Resilience, None, 15).unwrap();
    let mut transcript = Transcript::new();
    transcript.push_assistant("Welcome. Settle in.", Some("Opening & Intention"));
    transcript.push_user("I am here");
    CertificateRequest::new(&config, &transcript, 12, NaiveDate::from_ymd_opt(2026, 10, 19).unwrap())
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

mod openai_client {
    use super::*;

    #[tokio::test]
    async fn sends_system_and_turns_and_trims_the_reply() {
        let (base, captured) = spawn_upstream().await;
        let client = openai(format!("{base}/v1"), Some("test-key"));

        let reply = client
            .reply("Be kind.", &[Turn::user("hello")], None)
            .await
            .unwrap();
        assert_eq!(reply, "Breathe in slowly.");
        assert_eq!(captured.auth.lock().unwrap()[0], "Bearer test-key");

        let body = captured.last_body();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 400);
        assert_eq!(body["messages"][0], json!({ "role": "system", "content": "Be kind." }));
        assert_eq!(body["messages"][1], json!({ "role": "user", "content": "hello" }));
    }

    #[tokio::test]
    async fn honours_sampling_overrides() {
        let (base, captured) = spawn_upstream().await;
        let client = openai(format!("{base}/v1"), Some("test-key"));

        client
            .reply(
                "s",
                &[],
                Some(Sampling {
                    temperature: 0.7,
                    max_tokens: 650,
                }),
            )
            .await
            .unwrap();
        let body = captured.last_body();
        assert_eq!(body["max_tokens"], 650);
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[tokio::test]
    async fn synthesizes_speech_with_the_requested_voice() {
        let (base, captured) = spawn_upstream().await;
        let client = openai(format!("{base}/v1"), Some("test-key"));

        let audio = client.synthesize("Breathe.", "coral").await.unwrap();
        assert_eq!(audio, b"ID3audio".to_vec());
        let body = captured.last_body();
        assert_eq!(body["voice"], "coral");
        assert_eq!(body["model"], "gpt-4o-mini-tts");
        assert_eq!(body["input"], "Breathe.");
    }

    #[tokio::test]
    async fn reports_upstream_errors_as_unavailable() {
        let (base, _) = spawn_upstream().await;
        let client = openai(format!("{base}/down"), Some("test-key"));

        let err = client.reply("s", &[Turn::user("hi")], None).await.unwrap_err();
        match err {
            ServiceError::Unavailable { message, .. } => assert!(message.contains("503")),
            other => panic!("unexpected error: {other}"),
        }
    }
}

mod report_agent {
    use super::*;

    #[tokio::test]
    async fn posts_the_session_summary_and_returns_the_pdf() {
        let (base, captured) = spawn_upstream().await;
        let agent = RemoteReportAgent::new(format!("{base}/report"), Duration::from_secs(5));

        let pdf = agent.render(&request()).await.unwrap();
        assert!(looks_like_pdf(&pdf));

        let body = captured.last_body();
        assert_eq!(body["persona_label"], "Sage Arjun");
        assert_eq!(body["intent"], "resilience");
        assert_eq!(body["mantra"], "I can meet this.");
        assert_eq!(body["minutes"], 15);
        assert_eq!(body["format"], "pdf");
        assert_eq!(
            body["chat"],
            json!([
                { "role": "assistant", "content": "Welcome. Settle in." },
                { "role": "user", "content": "I am here" }
            ])
        );
    }

    #[tokio::test]
    async fn rejects_responses_that_are_not_pdf() {
        let (base, _) = spawn_upstream().await;
        let agent = RemoteReportAgent::new(format!("{base}/report/html"), Duration::from_secs(5));
        assert!(agent.render(&request()).await.is_err());

        let agent = RemoteReportAgent::new(format!("{base}/down/report"), Duration::from_secs(5));
        assert!(agent.render(&request()).await.is_err());
    }
}

mod local_certificate {
    use super::*;

    #[tokio::test]
    async fn writes_the_note_with_certificate_sampling() {
        let dialogue = Arc::new(FakeDialogue::default());
        let local = LocalCertificate::new(
            dialogue.clone(),
            Sampling {
                temperature: 0.7,
                max_tokens: 650,
            },
        );

        let pdf = local.render(&request()).await.unwrap();
        assert!(looks_like_pdf(&pdf));
        assert!(contains(&pdf, b"(Om - Participation Certificate) Tj"));

        let call = &dialogue.calls()[0];
        assert!(call.system.starts_with("You are Sage Arjun"));
        assert_eq!(call.sampling.unwrap().max_tokens, 650);
        assert!(call.turns[0].content.contains("- Duration: 15 minutes"));
    }

    #[tokio::test]
    async fn falls_back_to_a_fixed_note() {
        let local = LocalCertificate::new(
            Arc::new(FakeDialogue::failing()),
            Sampling {
                temperature: 0.7,
                max_tokens: 650,
            },
        );
        let note = local.write_note(&request()).await;
        assert!(note.starts_with("Dear friend,"));
        assert!(note.contains("\"I can meet this.\""));
        assert!(note.ends_with("Sage Arjun"));
    }
}

mod chain {
    use super::*;

    #[tokio::test]
    async fn prefers_the_agent_when_it_answers() {
        let (base, _) = spawn_upstream().await;
        let config = CertificateConfig {
            agent_url: Some(format!("{base}/report")),
            ..CertificateConfig::default()
        };
        let chain = CertificateChain::from_config(&config, Arc::new(FakeDialogue::default()));

        let rendered = chain.render(&request()).await.unwrap();
        assert_eq!(rendered.provider, "report agent");
        assert_eq!(rendered.pdf, b"%PDF-1.4 agent".to_vec());
        assert!(rendered.warnings.is_empty());
    }

    #[tokio::test]
    async fn falls_back_to_the_local_certificate_with_a_warning() {
        let (base, _) = spawn_upstream().await;
        let config = CertificateConfig {
            agent_url: Some(format!("{base}/down/report")),
            ..CertificateConfig::default()
        };
        let chain = CertificateChain::from_config(&config, Arc::new(FakeDialogue::failing()));

        let rendered = chain.render(&request()).await.unwrap();
        assert_eq!(rendered.provider, "local certificate");
        assert!(looks_like_pdf(&rendered.pdf));
        assert!(contains(&rendered.pdf, b"(Dear friend,) Tj"));
        assert_eq!(rendered.warnings.len(), 1);
        assert!(rendered.warnings[0].starts_with("report agent unavailable"));
    }

    #[tokio::test]
    async fn fails_when_every_provider_fails() {
        let config = CertificateConfig {
            providers: vec![ProviderKind::Agent],
            agent_url: Some("http://127.0.0.1:9/report".to_string()),
            agent_timeout_secs: 1,
            ..CertificateConfig::default()
        };
        let chain = CertificateChain::from_config(&config, Arc::new(FakeDialogue::default()));
        assert!(matches!(
            chain.render(&request()).await,
            Err(ServiceError::Unavailable { .. })
        ));
    }
}

// Trait objects are what sessions hold; make sure the real client fits.
#[test]
fn openai_client_serves_both_roles() {
    let client = Arc::new(openai("http://127.0.0.1:9".to_string(), None));
    let _dialogue: Arc<dyn DialogueService> = client.clone();
    let _narration: Arc<dyn NarrationService> = client;
}
