use axum::{
    Json, Router,
    body::Body,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::{Local, NaiveDate};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use uuid::Uuid;

use crate::config::{MailSettings, Settings};
use crate::error::{MailError, OrderError, SessionError, UploadError};
use crate::export;
use crate::lookup::LookupTable;
use crate::mailer::Mailer;
use crate::order::{Column, LineItem, OrderHeader, OrderRow};
use crate::session::OrderSession;
use crate::uploads;

const SESSION_COOKIE: &str = "order_session";
const SESSION_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

struct SessionEntry {
    session: OrderSession,
    expires_at: SystemTime,
}

/// Shared server state: the lookup table plus one `OrderSession` per
/// browser session.
pub struct AppState {
    settings: Settings,
    lookup: Arc<LookupTable>,
    lookup_warning: Option<String>,
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl AppState {
    pub fn new(settings: Settings, lookup: LookupTable, lookup_warning: Option<String>) -> Self {
        AppState {
            settings,
            lookup: Arc::new(lookup),
            lookup_warning,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, SessionEntry>> {
        // Sessions stay usable after a handler panic
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn new_entry(&self, now: SystemTime) -> SessionEntry {
        SessionEntry {
            session: OrderSession::new(
                Arc::clone(&self.lookup),
                self.settings.order_defaults.clone(),
            ),
            expires_at: now + SESSION_DURATION,
        }
    }

    /// Run `f` against the caller's session, creating one (and its cookie)
    /// when the request carries none or an expired one.
    fn with_session<T>(
        &self,
        jar: CookieJar,
        f: impl FnOnce(&mut OrderSession) -> T,
    ) -> (CookieJar, T) {
        let now = SystemTime::now();
        let mut sessions = self.sessions();

        let existing = jar
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|id| sessions.get(id).is_some_and(|e| e.expires_at > now));

        let (jar, id) = match existing {
            Some(id) => (jar, id),
            None => {
                sessions.retain(|_, e| e.expires_at > now);
                let id = Uuid::new_v4().to_string();
                sessions.insert(id.clone(), self.new_entry(now));
                info!("started order session {}", id);
                let cookie = Cookie::build((SESSION_COOKIE, id.clone()))
                    .path("/")
                    .http_only(true);
                (jar.add(cookie), id)
            }
        };

        let entry = sessions.entry(id).or_insert_with(|| self.new_entry(now));
        (jar, f(&mut entry.session))
    }
}

/// A failed user action, rendered as `{status: "error", message}`.
struct ApiError(OrderError);

impl<E: Into<OrderError>> From<E> for ApiError {
    fn from(e: E) -> Self {
        ApiError(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            OrderError::Session(SessionError::IndexOutOfRange { .. }) => StatusCode::NOT_FOUND,
            OrderError::Session(_) => StatusCode::BAD_REQUEST,
            OrderError::Upload(UploadError::InvalidName(_) | UploadError::Multipart(_)) => {
                StatusCode::BAD_REQUEST
            }
            OrderError::Mail(MailError::Address(_)) => StatusCode::BAD_REQUEST,
            OrderError::Mail(_) => StatusCode::BAD_GATEWAY,
            OrderError::MailNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            OrderError::Lookup(_) | OrderError::Export(_) | OrderError::Upload(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            error!("{}", self.0);
        }
        (status, Json(StatusResponse::error(self.0.to_string()))).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: Option<String>,
}

impl StatusResponse {
    fn ok(message: impl Into<String>) -> Self {
        StatusResponse {
            status: "ok".to_string(),
            message: Some(message.into()),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        StatusResponse {
            status: "error".to_string(),
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LookupResponse {
    pub partners: Vec<String>,
    pub descriptions: Vec<String>,
    pub warning: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionView {
    pub line_items: Vec<LineItemView>,
    pub columns: Vec<String>,
    pub orders: Vec<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LineItemView {
    pub description: String,
    pub quantity: u32,
    pub product_code: String,
}

impl From<&LineItem> for LineItemView {
    fn from(item: &LineItem) -> Self {
        LineItemView {
            description: item.description().to_string(),
            quantity: item.quantity(),
            product_code: item.product_code().to_string(),
        }
    }
}

impl SessionView {
    fn of(session: &OrderSession) -> Self {
        SessionView {
            line_items: session.line_items().iter().map(LineItemView::from).collect(),
            columns: Column::headers().into_iter().map(String::from).collect(),
            orders: session.orders().rows().iter().map(OrderRow::values).collect(),
        }
    }
}

#[derive(Deserialize)]
struct DescriptionUpdate {
    description: String,
}

#[derive(Deserialize)]
struct QuantityUpdate {
    quantity: i64,
}

#[derive(Deserialize)]
struct SubmitRequest {
    business_partner: String,
    order_date: NaiveDate,
    document_type: Option<String>,
    warehouse: Option<String>,
}

#[derive(Deserialize, Default)]
struct EmailRequest {
    recipient: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub appended: usize,
    pub session: SessionView,
}

/// Outcome of the export-and-email action. The file and the email are
/// reported separately since one can succeed while the other fails.
#[derive(Debug, Serialize, Deserialize)]
pub struct EmailResponse {
    pub file: StatusResponse,
    pub email: StatusResponse,
}

/// Build the router over a prepared state.
pub fn build_router(state: Arc<AppState>) -> Router {
    let upload_dir = state.settings.upload_dir.clone();
    Router::new()
        .route("/", get(serve_order_form))
        .route("/api/lookup", get(get_lookup))
        .route("/api/session", get(get_session))
        .route("/api/items", post(add_line_item))
        .route("/api/items/:index/description", post(set_description))
        .route("/api/items/:index/quantity", post(set_quantity))
        .route("/api/submit", post(submit_order))
        .route("/api/clear", post(clear_session))
        .route("/api/export", get(export_csv))
        .route("/api/export/xlsx", get(export_xlsx))
        .route("/api/email", post(email_export))
        .route("/api/uploads", get(list_uploads).post(upload_file))
        .nest_service("/uploads", ServeDir::new(upload_dir))
        .with_state(state)
}

pub async fn run(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let (lookup, warning) =
        LookupTable::load_or_empty(&settings.lookup_path, &settings.lookup_columns);
    if settings.mail.is_none() {
        warn!("mail relay not configured; emailing exports is disabled");
    }

    let bind_addr = settings.bind_addr.clone();
    let app = build_router(Arc::new(AppState::new(settings, lookup, warning)));

    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_order_form() -> Html<&'static str> {
    Html(include_str!("./static/order_form.html"))
}

async fn get_lookup(State(state): State<Arc<AppState>>) -> Json<LookupResponse> {
    Json(LookupResponse {
        partners: state.lookup.partners().iter().cloned().collect(),
        descriptions: state
            .lookup
            .descriptions()
            .into_iter()
            .map(String::from)
            .collect(),
        warning: state.lookup_warning.clone(),
    })
}

async fn get_session(State(state): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    let (jar, view) = state.with_session(jar, |s| SessionView::of(s));
    (jar, Json(view))
}

async fn add_line_item(State(state): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    let (jar, view) = state.with_session(jar, |s| {
        s.add_blank_line_item();
        SessionView::of(s)
    });
    (jar, Json(view))
}

async fn set_description(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(index): Path<usize>,
    Json(payload): Json<DescriptionUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let (jar, result) = state.with_session(jar, |s| {
        s.set_line_item_description(index, payload.description)
            .map(LineItemView::from)
    });
    Ok((jar, Json(result?)))
}

async fn set_quantity(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(index): Path<usize>,
    Json(payload): Json<QuantityUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let (jar, result) = state.with_session(jar, |s| {
        s.set_line_item_quantity(index, payload.quantity)
            .map(LineItemView::from)
    });
    Ok((jar, Json(result?)))
}

async fn submit_order(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<SubmitRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let defaults = &state.settings.order_defaults;
    let header = OrderHeader {
        business_partner: payload.business_partner,
        order_date: payload.order_date,
        document_type: payload
            .document_type
            .unwrap_or_else(|| defaults.document_type.clone()),
        warehouse: payload
            .warehouse
            .unwrap_or_else(|| defaults.warehouse.clone()),
    };

    let (jar, result) = state.with_session(jar, |s| {
        s.submit_header(header).map(|appended| SubmitResponse {
            appended,
            session: SessionView::of(s),
        })
    });
    Ok((jar, Json(result?)))
}

async fn clear_session(State(state): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    let (jar, ()) = state.with_session(jar, OrderSession::clear);
    (jar, Json(StatusResponse::ok("session cleared")))
}

fn export_name(settings: &Settings) -> String {
    export::export_file_name(settings.timestamp_exports, Local::now().naive_local())
}

fn attachment_response(content_type: &str, file_name: &str, bytes: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        Body::from(bytes),
    )
        .into_response()
}

async fn export_csv(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let (jar, csv) = state.with_session(jar, |s| s.export_csv());
    let name = export_name(&state.settings);
    Ok((jar, attachment_response("text/csv; charset=utf-8", &name, csv?)))
}

async fn export_xlsx(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let (jar, xlsx) = state.with_session(jar, |s| export::to_xlsx(s.orders()));
    let name = export_name(&state.settings).replace(".csv", ".xlsx");
    Ok((
        jar,
        attachment_response(
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            &name,
            xlsx?,
        ),
    ))
}

/// Write the session's CSV to the output folder, then email it.
async fn email_export(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    payload: Option<Json<EmailRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let mail = state.settings.mail.clone().ok_or(OrderError::MailNotConfigured)?;
    let recipient = payload
        .recipient
        .filter(|r| !r.trim().is_empty())
        .or_else(|| mail.default_recipient.clone())
        .ok_or_else(|| SessionError::Validation("recipient is required".to_string()))?;

    // Snapshot the CSV and release the session before any slow I/O
    let (jar, csv) = state.with_session(jar, |s| s.export_csv());
    let csv = csv?;
    let name = export_name(&state.settings);

    let file = match export::save_export(&state.settings.output_dir, &name, &csv) {
        Ok(path) => StatusResponse::ok(path.display().to_string()),
        Err(e) => {
            error!("{}", e);
            StatusResponse::error(e.to_string())
        }
    };

    let email = match send_in_background(mail, recipient, csv, name).await {
        Ok(recipient) => StatusResponse::ok(format!("sent to {}", recipient)),
        Err(e) => StatusResponse::error(e.to_string()),
    };

    Ok((jar, Json(EmailResponse { file, email })))
}

async fn send_in_background(
    mail: MailSettings,
    recipient: String,
    csv: Vec<u8>,
    name: String,
) -> Result<String, MailError> {
    tokio::task::spawn_blocking(move || -> Result<String, MailError> {
        let mailer = Mailer::new(&mail)?;
        mailer.send_email(&recipient, &mail.subject, &mail.body, csv, &name)?;
        Ok(recipient)
    })
    .await
    .map_err(|e| MailError::Send(format!("mail task failed: {}", e)))?
}

async fn list_uploads(State(state): State<Arc<AppState>>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(uploads::list_uploads(&state.settings.upload_dir)?))
}

async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Vec<String>>, ApiError> {
    let mut saved = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(UploadError::from)? {
        let Some(file_name) = field.file_name().map(String::from) else {
            continue;
        };
        // Nothing is written unless the whole part arrived
        let bytes = field.bytes().await.map_err(UploadError::from)?;
        let path: PathBuf = uploads::save_upload(&state.settings.upload_dir, &file_name, &bytes)?;
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            saved.push(name.to_string());
        }
    }

    Ok(Json(saved))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn test_settings(dir: &TempDir) -> Settings {
        Settings {
            output_dir: dir.path().join("exports"),
            upload_dir: dir.path().join("uploads"),
            timestamp_exports: false,
            ..Settings::default()
        }
    }

    fn test_app(dir: &TempDir) -> Router {
        app_with(test_settings(dir))
    }

    fn app_with(settings: Settings) -> Router {
        let lookup = LookupTable::from_rows([
            ("Acme", "W1", "Widget A"),
            ("Globex", "W2", "Widget B"),
        ]);
        build_router(Arc::new(AppState::new(settings, lookup, None)))
    }

    fn session_cookie(response: &Response) -> String {
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("session cookie")
            .to_str()
            .unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    fn post_json(uri: &str, cookie: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header(header::COOKIE, cookie)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn lookup_lists_vocabularies() {
        let dir = TempDir::new().unwrap();
        let response = test_app(&dir)
            .oneshot(Request::get("/api/lookup").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let lookup: LookupResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(lookup.partners, vec!["Acme", "Globex"]);
        assert_eq!(lookup.descriptions, vec!["Widget A", "Widget B"]);
        assert!(lookup.warning.is_none());
    }

    #[tokio::test]
    async fn order_flow_through_session_cookie() {
        let dir = TempDir::new().unwrap();
        let app = test_app(&dir);

        let response = app
            .clone()
            .oneshot(Request::post("/api/items").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = session_cookie(&response);

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/items/0/description",
                &cookie,
                serde_json::json!({ "description": "Widget A" }),
            ))
            .await
            .unwrap();
        let item: LineItemView = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(item.product_code, "W1");

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/items/0/quantity",
                &cookie,
                serde_json::json!({ "quantity": 2 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/submit",
                &cookie,
                serde_json::json!({ "business_partner": "Acme", "order_date": "2024-01-01" }),
            ))
            .await
            .unwrap();
        let submitted: SubmitResponse =
            serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(submitted.appended, 1);
        assert_eq!(submitted.session.orders.len(), 1);

        let response = app
            .clone()
            .oneshot(
                Request::get("/api/export")
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"order_data.csv\""
        );
        let csv = String::from_utf8(body_bytes(response).await).unwrap();
        assert_eq!(
            csv.lines().nth(1).unwrap(),
            format!("2024-01-01,Acme,,,W1,Widget A,2{}", ",".repeat(14))
        );
    }

    #[tokio::test]
    async fn validation_errors_are_reported() {
        let dir = TempDir::new().unwrap();
        let app = test_app(&dir);

        let response = app
            .clone()
            .oneshot(Request::post("/api/items").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let cookie = session_cookie(&response);

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/items/0/quantity",
                &cookie,
                serde_json::json!({ "quantity": 0 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/items/5/description",
                &cookie,
                serde_json::json!({ "description": "Widget A" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/submit",
                &cookie,
                serde_json::json!({ "business_partner": "", "order_date": "2024-01-01" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let status: StatusResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(status.status, "error");
    }

    #[tokio::test]
    async fn email_without_relay_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let response = test_app(&dir)
            .oneshot(post_json(
                "/api/email",
                "",
                serde_json::json!({ "recipient": "buyer@example.com" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn uploads_are_saved_and_listed() {
        let dir = TempDir::new().unwrap();
        let app = test_app(&dir);

        let boundary = "XBOUNDARY";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"lookup.csv\"\r\n\
             Content-Type: text/csv\r\n\r\nBP Name\r\n--{b}--\r\n",
            b = boundary
        );
        let response = app
            .clone()
            .oneshot(
                Request::post("/api/uploads")
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={}", boundary),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::get("/api/uploads").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let files: Vec<String> = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(files, vec!["lookup.csv"]);
        assert_eq!(
            std::fs::read(dir.path().join("uploads").join("lookup.csv")).unwrap(),
            b"BP Name"
        );
    }

    #[tokio::test]
    async fn truncated_upload_is_rejected_and_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let uploads_dir = dir.path().join("uploads");
        std::fs::create_dir_all(&uploads_dir).unwrap();
        std::fs::write(uploads_dir.join("lookup.csv"), b"BP Name").unwrap();

        let boundary = "XBOUNDARY";
        // Part body with no closing boundary
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"lookup.csv\"\r\n\
             Content-Type: text/csv\r\n\r\nBP Na",
            b = boundary
        );
        let response = test_app(&dir)
            .oneshot(
                Request::post("/api/uploads")
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={}", boundary),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let status: StatusResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(status.status, "error");
        assert_eq!(
            std::fs::read(uploads_dir.join("lookup.csv")).unwrap(),
            b"BP Name"
        );
    }

    fn dead_relay() -> MailSettings {
        // Bind then drop to get a local port nothing listens on
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        MailSettings {
            host: "127.0.0.1".to_string(),
            port,
            username: "orders@example.com".to_string(),
            password: "secret".to_string(),
            from: "orders@example.com".to_string(),
            timeout_secs: 2,
            ..MailSettings::default()
        }
    }

    async fn post_email(app: Router) -> EmailResponse {
        let response = app
            .oneshot(post_json(
                "/api/email",
                "",
                serde_json::json!({ "recipient": "buyer@example.com" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    #[tokio::test]
    async fn saved_file_survives_a_failed_email() {
        let dir = TempDir::new().unwrap();
        let settings = Settings {
            mail: Some(dead_relay()),
            ..test_settings(&dir)
        };

        let outcome = post_email(app_with(settings)).await;

        assert_eq!(outcome.file.status, "ok");
        let saved = dir.path().join("exports").join("order_data.csv");
        let csv = std::fs::read_to_string(&saved).unwrap();
        assert_eq!(csv.lines().next().unwrap(), Column::headers().join(","));

        assert_eq!(outcome.email.status, "error");
        let message = outcome.email.message.unwrap();
        assert!(message.starts_with("could not connect to mail relay"), "{message}");
    }

    #[tokio::test]
    async fn email_is_attempted_when_the_file_cannot_be_written() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, b"x").unwrap();
        let settings = Settings {
            output_dir: blocker.join("exports"),
            mail: Some(dead_relay()),
            ..test_settings(&dir)
        };

        let outcome = post_email(app_with(settings)).await;

        assert_eq!(outcome.file.status, "error");
        assert_eq!(outcome.email.status, "error");
        let message = outcome.email.message.unwrap();
        assert!(message.starts_with("could not connect to mail relay"), "{message}");
    }
}
