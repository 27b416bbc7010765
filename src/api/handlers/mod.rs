use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use om_core::{Intent, Persona, SessionConfig, SessionConfigInput, SessionDraft};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::{SessionError, SessionRegistry, SessionSnapshot};

type ApiResult<T> = Result<T, (StatusCode, String)>;

// ============================================================
// Error Handling
// ============================================================

/// Map a session error to a response. Setup mistakes are shown to the
/// client as-is; service failures are logged in full and summarized.
fn session_error(e: SessionError) -> (StatusCode, String) {
    match e {
        SessionError::NotFound => (StatusCode::NOT_FOUND, e.to_string()),
        SessionError::Setup(_) => {
            tracing::warn!("Validation error: {}", e);
            (StatusCode::BAD_REQUEST, e.to_string())
        }
        SessionError::CertificateNotReady => (StatusCode::CONFLICT, e.to_string()),
        SessionError::Certificate(inner) => {
            tracing::error!("Certificate error: {}", inner);
            (
                StatusCode::BAD_GATEWAY,
                "Certificate service unavailable".to_string(),
            )
        }
    }
}

fn bad_request(e: impl std::fmt::Display) -> (StatusCode, String) {
    let msg = e.to_string();
    tracing::warn!("Validation error: {}", msg);
    (StatusCode::BAD_REQUEST, msg)
}

/// Run `f` against the session's setup draft and return the new snapshot.
async fn with_draft<F>(registry: &SessionRegistry, id: Uuid, f: F) -> ApiResult<Json<SessionSnapshot>>
where
    F: FnOnce(&mut SessionDraft) -> Result<(), om_core::CoreError>,
{
    let shared = registry.get(id).map_err(session_error)?;
    let mut session = shared.lock().await;
    f(session.draft_mut()).map_err(|e| session_error(e.into()))?;
    Ok(Json(session.snapshot(registry.now())))
}

// ============================================================
// Health & Catalog
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn list_personas() -> Json<Vec<Persona>> {
    Json(Persona::catalog())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IntentView {
    pub intent: Intent,
    pub default_mantra: String,
}

pub async fn list_intents() -> Json<Vec<IntentView>> {
    Json(
        Intent::ALL
            .iter()
            .map(|intent| IntentView {
                intent: *intent,
                default_mantra: intent.default_mantra().to_string(),
            })
            .collect(),
    )
}

// ============================================================
// Sessions
// ============================================================

pub async fn create_session(
    State(registry): State<SessionRegistry>,
) -> ApiResult<(StatusCode, Json<SessionSnapshot>)> {
    let (_, shared) = registry.create();
    let snapshot = shared.lock().await.snapshot(registry.now());
    Ok((StatusCode::CREATED, Json(snapshot)))
}

pub async fn get_session(
    State(registry): State<SessionRegistry>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SessionSnapshot>> {
    let shared = registry.get(id).map_err(session_error)?;
    let snapshot = shared.lock().await.snapshot(registry.now());
    Ok(Json(snapshot))
}

pub async fn delete_session(
    State(registry): State<SessionRegistry>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if registry.remove(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(session_error(SessionError::NotFound))
    }
}

// ============================================================
// Setup
// ============================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct PersonaInput {
    pub persona: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IntentInput {
    /// New intent label. Omit to keep the current one.
    #[serde(default)]
    pub intent: Option<String>,
    /// Continue to the duration step afterwards.
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MantraInput {
    pub mantra: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DurationInput {
    pub minutes: u32,
}

pub async fn select_persona(
    State(registry): State<SessionRegistry>,
    Path(id): Path<Uuid>,
    Json(input): Json<PersonaInput>,
) -> ApiResult<Json<SessionSnapshot>> {
    with_draft(&registry, id, |draft| draft.select_persona(&input.persona)).await
}

pub async fn set_intent(
    State(registry): State<SessionRegistry>,
    Path(id): Path<Uuid>,
    Json(input): Json<IntentInput>,
) -> ApiResult<Json<SessionSnapshot>> {
    let intent = input
        .intent
        .as_deref()
        .map(Intent::parse)
        .transpose()
        .map_err(bad_request)?;

    with_draft(&registry, id, |draft| {
        if let Some(intent) = intent {
            draft.set_intent(intent)?;
        }
        if input.confirm {
            draft.confirm_intent()?;
        }
        Ok(())
    })
    .await
}

pub async fn set_mantra(
    State(registry): State<SessionRegistry>,
    Path(id): Path<Uuid>,
    Json(input): Json<MantraInput>,
) -> ApiResult<Json<SessionSnapshot>> {
    with_draft(&registry, id, |draft| draft.set_mantra(&input.mantra)).await
}

pub async fn set_duration(
    State(registry): State<SessionRegistry>,
    Path(id): Path<Uuid>,
    Json(input): Json<DurationInput>,
) -> ApiResult<Json<SessionSnapshot>> {
    with_draft(&registry, id, |draft| draft.set_minutes(input.minutes)).await
}

pub async fn draft_back(
    State(registry): State<SessionRegistry>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SessionSnapshot>> {
    with_draft(&registry, id, |draft| {
        draft.back();
        Ok(())
    })
    .await
}

// ============================================================
// Running
// ============================================================

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StartInput {
    /// Start with this config instead of the setup draft.
    #[serde(default)]
    pub config: Option<SessionConfigInput>,
}

pub async fn start_session(
    State(registry): State<SessionRegistry>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> ApiResult<Json<SessionSnapshot>> {
    let input: StartInput = if body.iter().all(u8::is_ascii_whitespace) {
        StartInput::default()
    } else {
        serde_json::from_slice(&body).map_err(bad_request)?
    };
    let config = input
        .config
        .map(SessionConfig::try_from)
        .transpose()
        .map_err(bad_request)?;

    registry
        .start(id, config)
        .await
        .map(Json)
        .map_err(session_error)
}

pub async fn advance_session(
    State(registry): State<SessionRegistry>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SessionSnapshot>> {
    let shared = registry.get(id).map_err(session_error)?;
    let mut session = shared.lock().await;
    session.advance().await;
    Ok(Json(session.snapshot(registry.now())))
}

/// Run one phase check now instead of waiting for the periodic tick.
pub async fn tick_session(
    State(registry): State<SessionRegistry>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SessionSnapshot>> {
    let shared = registry.get(id).map_err(session_error)?;
    let mut session = shared.lock().await;
    let now = registry.now();
    session.tick(now).await;
    Ok(Json(session.snapshot(now)))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageInput {
    pub text: String,
}

pub async fn send_message(
    State(registry): State<SessionRegistry>,
    Path(id): Path<Uuid>,
    Json(input): Json<MessageInput>,
) -> ApiResult<Json<SessionSnapshot>> {
    let shared = registry.get(id).map_err(session_error)?;
    let mut session = shared.lock().await;
    session.send_message(&input.text).await;
    Ok(Json(session.snapshot(registry.now())))
}

pub async fn repeat_narration(
    State(registry): State<SessionRegistry>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SessionSnapshot>> {
    let shared = registry.get(id).map_err(session_error)?;
    let mut session = shared.lock().await;
    session.repeat();
    Ok(Json(session.snapshot(registry.now())))
}

/// Next narrated clip in playback order, or 204 when the queue is empty.
pub async fn next_audio(
    State(registry): State<SessionRegistry>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let shared = registry.get(id).map_err(session_error)?;
    let clip = shared.lock().await.next_clip();

    Ok(match clip {
        Some(clip) => (
            [
                (header::CONTENT_TYPE, HeaderValue::from_static(clip.mime_type)),
                (
                    header::HeaderName::from_static("x-clip-sequence"),
                    HeaderValue::from(clip.sequence),
                ),
            ],
            clip.bytes,
        )
            .into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

pub async fn get_certificate(
    State(registry): State<SessionRegistry>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let shared = registry.get(id).map_err(session_error)?;
    let today = registry.now().date_naive();
    let pdf = shared
        .lock()
        .await
        .certificate(today)
        .await
        .map_err(session_error)?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"om-certificate.pdf\"",
            ),
        ],
        pdf.as_ref().clone(),
    )
        .into_response())
}
