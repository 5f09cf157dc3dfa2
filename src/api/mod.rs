use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::limit::RequestBodyLimitLayer;

use crate::config::Credentials;
use crate::document::{is_pdf_file_name, UploadedDocument};
use crate::error::QaError;
use crate::session::SessionStore;
use crate::workflow::{Outcome, QaWorkflow, ServiceFactory, SubmitForm};

pub mod page;

use page::{render_page, PageView, SavedKeys};

pub const SESSION_COOKIE: &str = "docqa_session";

const MAX_CONCURRENT_REQUESTS: usize = 32;

pub struct AppState<F: ServiceFactory> {
    workflow: Arc<QaWorkflow<F>>,
    sessions: SessionStore,
    defaults: Arc<Credentials>,
}

impl<F: ServiceFactory> Clone for AppState<F> {
    fn clone(&self) -> Self {
        Self {
            workflow: self.workflow.clone(),
            sessions: self.sessions.clone(),
            defaults: self.defaults.clone(),
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    sessions: usize,
}

/// Fields posted by the form.
#[derive(Default)]
struct PostedForm {
    credentials: Credentials,
    query: String,
    upload: Option<(String, Vec<u8>)>,
}

/// Create and configure the web form router.
///
/// `defaults` stay on the server: blank key fields in a submit fall back to
/// the keys saved in the session, then to these.
pub fn create_api<F: ServiceFactory + 'static>(
    workflow: QaWorkflow<F>,
    defaults: Credentials,
    max_upload_bytes: usize,
    session_idle: Duration,
) -> Router {
    let state = AppState {
        workflow: Arc::new(workflow),
        sessions: SessionStore::new(session_idle),
        defaults: Arc::new(defaults),
    };

    Router::new()
        .route("/", get(form_handler::<F>).post(submit_handler::<F>))
        .route("/health", get(health_check::<F>))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
        .with_state(state)
}

pub fn session_id(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().trim().to_string())
        .filter(|value| !value.is_empty())
}

fn session_cookie(session_id: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Renders the empty form. Never starts a session or sets a cookie.
async fn form_handler<F: ServiceFactory + 'static>(
    State(state): State<AppState<F>>,
    jar: CookieJar,
) -> Response {
    let (credentials, document_name) = match state.sessions.get(session_id(&jar).as_deref()).await {
        Some(session) => {
            let session = session.lock().await;
            (
                session.credentials.clone().or(&state.defaults),
                session.upload.as_ref().map(|doc| doc.file_name().to_string()),
            )
        }
        None => (state.defaults.as_ref().clone(), None),
    };

    Html(render_page(&PageView {
        index_name: &credentials.index_name,
        saved_keys: SavedKeys::of(&credentials),
        query: "",
        document_name: document_name.as_deref(),
        outcome: None,
    }))
    .into_response()
}

async fn read_form(mut multipart: Multipart) -> anyhow::Result<PostedForm> {
    let mut form = PostedForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);

        match name.as_str() {
            "source_doc" => {
                let bytes = field.bytes().await?;
                match file_name {
                    Some(file_name) if !file_name.is_empty() && !bytes.is_empty() => {
                        form.upload = Some((file_name, bytes.to_vec()));
                    }
                    _ => {}
                }
            }
            "groq_api_key" => form.credentials.llm_api_key = field.text().await?.trim().to_string(),
            "cohere_api_key" => {
                form.credentials.embedding_api_key = field.text().await?.trim().to_string()
            }
            "pinecone_api_key" => {
                form.credentials.vector_store_api_key = field.text().await?.trim().to_string()
            }
            "pinecone_index" => form.credentials.index_name = field.text().await?.trim().to_string(),
            "query" => form.query = field.text().await?,
            other => warn!("Ignoring unknown form field '{}'", other),
        }
    }

    Ok(form)
}

async fn submit_handler<F: ServiceFactory + 'static>(
    State(state): State<AppState<F>>,
    jar: CookieJar,
    multipart: Multipart,
) -> Response {
    let (session_id, session) = state
        .sessions
        .get_or_create(session_id(&jar).as_deref())
        .await;
    let jar = jar.add(session_cookie(session_id.clone()));
    let mut session = session.lock().await;

    let posted = match read_form(multipart).await {
        Ok(posted) => posted,
        Err(e) => {
            warn!("Could not read submitted form: {:#}", e);
            let outcome = Outcome::Error(QaError::from(e).banner());
            let credentials = session.credentials.clone().or(&state.defaults);
            let body = render_page(&PageView {
                index_name: &credentials.index_name,
                saved_keys: SavedKeys::of(&credentials),
                query: "",
                document_name: session.upload.as_ref().map(|doc| doc.file_name()),
                outcome: Some(&outcome),
            });
            return (jar, Html(body)).into_response();
        }
    };

    session.credentials = posted.credentials.or(&session.credentials);
    let credentials = session.credentials.clone().or(&state.defaults);

    let rejected = match posted.upload {
        Some((file_name, _)) if !is_pdf_file_name(&file_name) => Some(Outcome::Warning(format!(
            "'{}' is not a PDF file. Please upload a .pdf document.",
            file_name
        ))),
        Some((file_name, bytes)) => {
            info!("Session {} uploaded '{}' ({} bytes)", session_id, file_name, bytes.len());
            session.upload = Some(UploadedDocument::new(file_name, bytes));
            None
        }
        None => None,
    };

    let outcome = match rejected {
        Some(outcome) => outcome,
        None => {
            let form = SubmitForm::new(credentials.clone(), session.upload.clone(), posted.query.clone());
            state.workflow.submit(&mut session.cache, &form).await
        }
    };

    let body = render_page(&PageView {
        index_name: &credentials.index_name,
        saved_keys: SavedKeys::of(&credentials),
        query: &posted.query,
        document_name: session.upload.as_ref().map(|doc| doc.file_name()),
        outcome: Some(&outcome),
    });
    (jar, Html(body)).into_response()
}

async fn health_check<F: ServiceFactory + 'static>(State(state): State<AppState<F>>) -> Response {
    state.sessions.prune_idle_at(Utc::now()).await;
    Json(HealthResponse {
        status: "Server is running and healthy".to_string(),
        sessions: state.sessions.len().await,
    })
    .into_response()
}
