//! Server-rendered form front end
//!
//! One page with upload, chat and end-chat forms. The conversation lives
//! in a hidden `history` field that every form round-trips; the server
//! keeps no per-user state.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    response::Html,
    Form,
};
use serde::Deserialize;
use tracing::{info, warn};

use super::sessions::deleted_message;
use super::upload::{UploadForm, UPLOAD_SUCCESS};
use crate::AppState;
use lumina_common::conversation::History;
use lumina_common::errors::AppError;

type Page = (StatusCode, Html<String>);

/// Status line shown above the conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatForm {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub history: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryForm {
    #[serde(default)]
    pub history: String,
}

pub async fn index() -> Html<String> {
    Html(render_page(None, &History::new()))
}

pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Page {
    let form = match multipart {
        Ok(multipart) => UploadForm::read(multipart, state.config.server.max_upload_bytes).await,
        Err(_) => Err(AppError::MissingFile),
    };
    let form = match form {
        Ok(form) => form,
        Err(e) => return failure(e, &History::new()),
    };

    let history = History::decode(&form.history);
    let document = match form.document() {
        Ok(document) => document,
        Err(e) => return failure(e, &history),
    };

    match state.ingestion.ingest_pdf(document).await {
        Ok(report) => {
            info!(chunks = report.chunks_stored, "Document uploaded from form");
            page(StatusCode::OK, Notice::Info(UPLOAD_SUCCESS.to_string()), &history)
        }
        Err(e) => failure(e, &history),
    }
}

pub async fn chat(State(state): State<AppState>, Form(form): Form<ChatForm>) -> Page {
    let mut history = History::decode(&form.history);

    match state.answers.answer(&form.query).await {
        Ok(answer) => {
            history.push(form.query, answer.response);
            (StatusCode::OK, Html(render_page(None, &history)))
        }
        Err(e) => failure(e, &history),
    }
}

/// Ending the chat also clears the conversation
pub async fn end_chat(State(state): State<AppState>, Form(form): Form<HistoryForm>) -> Page {
    let collection = &state.collection;
    match collection.delete().await {
        Ok(()) => page(
            StatusCode::OK,
            Notice::Info(deleted_message(collection.name())),
            &History::new(),
        ),
        Err(e) => failure(e, &History::decode(&form.history)),
    }
}

fn page(status: StatusCode, notice: Notice, history: &History) -> Page {
    (status, Html(render_page(Some(&notice), history)))
}

fn failure(err: AppError, history: &History) -> Page {
    let status = err.status_code();
    let notice = if err.is_informational() {
        info!(error = %err, "Form request");
        Notice::Info(err.to_string())
    } else {
        warn!(error = %err, status = status.as_u16(), "Form request failed");
        Notice::Error(err.to_string())
    };
    page(status, notice, history)
}

/// Render the whole page
pub fn render_page(notice: Option<&Notice>, history: &History) -> String {
    let notice = match notice {
        Some(Notice::Info(text)) => format!(r#"<p class="notice">{}</p>"#, escape_html(text)),
        Some(Notice::Error(text)) => format!(r#"<p class="notice error">{}</p>"#, escape_html(text)),
        None => String::new(),
    };

    let turns: String = history
        .turns()
        .iter()
        .map(|turn| {
            format!(
                r#"<div class="turn"><p class="user"><strong>You:</strong> {}</p><p class="assistant"><strong>Assistant:</strong> {}</p></div>"#,
                escape_html(&turn.question),
                escape_html(&turn.answer)
            )
        })
        .collect();

    let history_field = format!(
        r#"<input type="hidden" name="history" value="{}">"#,
        escape_html(&history.encode())
    );

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Lumina: Your HR Policy Assistant</title>
<style>
body {{ font-family: sans-serif; max-width: 48rem; margin: 2rem auto; }}
.notice {{ padding: .5rem; background: #eef6ee; }}
.error {{ background: #f8e8e8; }}
.turn {{ border-bottom: 1px solid #ddd; }}
</style>
</head>
<body>
<h1>Lumina: Your HR Policy Assistant</h1>
{notice}
<section>
<h2>Upload a policy document</h2>
<form action="/ui/upload" method="post" enctype="multipart/form-data">
{history_field}
<input type="file" name="file" accept="application/pdf">
<button type="submit">Upload</button>
</form>
</section>
<section>
<h2>Chat</h2>
{turns}
<form action="/ui/chat" method="post">
{history_field}
<input type="text" name="query" size="60" placeholder="Ask a question about the policy">
<button type="submit">Send</button>
</form>
<form action="/ui/end_chat" method="post">
{history_field}
<button type="submit">End chat</button>
</form>
</section>
</body>
</html>
"#
    )
}

/// Escape text for element content and double-quoted attributes
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
