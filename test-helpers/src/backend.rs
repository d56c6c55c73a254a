//! An in-process stand-in for the portal's REST backend.
//!
//! Records are kept as JSON objects per collection so one set of handlers
//! serves every resource. The backend records each request it receives and
//! can be told to fail particular paths, which is what the client and hook
//! tests assert against.

use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use actix_multipart::Multipart;
use actix_web::dev::Server;
use actix_web::http::{StatusCode, header};
use actix_web::{App, HttpRequest, HttpResponse, HttpServer, Scope, web};
use futures::StreamExt;
use jiff::Timestamp;
use payloads::requests::LoginCredentials;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use uuid::Uuid;

/// Every collection the backend serves, by url path.
pub const COLLECTIONS: &[&str] = &[
    "permits",
    "users",
    "companies",
    "payments",
    "personnel",
    "jv",
    "localcontent/plans",
    "documents",
    "inspections",
    "notifications",
];

/// Fields that list searches look at.
const SEARCHABLE: &[&str] =
    &["title", "name", "reference", "email", "fileName", "facility"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: String,
    pub authorization: Option<String>,
}

struct InjectedFailure {
    path_prefix: String,
    status: StatusCode,
    message: String,
}

struct Account {
    email: String,
    password: String,
    user_id: String,
}

struct StoredFile {
    content_type: String,
    bytes: Vec<u8>,
}

pub struct MockBackend {
    collections: Mutex<HashMap<&'static str, Vec<Value>>>,
    files: Mutex<HashMap<String, StoredFile>>,
    accounts: Mutex<Vec<Account>>,
    /// Issued bearer tokens, mapped to the user id they belong to.
    tokens: Mutex<HashMap<String, String>>,
    requests: Mutex<Vec<RecordedRequest>>,
    failures: Mutex<Vec<InjectedFailure>>,
    sequence: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn now() -> Value {
    Value::String(Timestamp::now().to_string())
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Test controls
impl MockBackend {
    pub fn new() -> Self {
        let collections = COLLECTIONS
            .iter()
            .map(|collection| (*collection, Vec::new()))
            .collect();
        Self {
            collections: Mutex::new(collections),
            files: Mutex::new(HashMap::new()),
            accounts: Mutex::new(Vec::new()),
            tokens: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
            sequence: AtomicU64::new(0),
        }
    }

    /// Register a login and the user record behind it.
    pub fn add_account(&self, email: &str, password: &str, user: Value) {
        let mut user = user;
        if let Some(fields) = user.as_object_mut() {
            fields.insert("email".into(), email.into());
        }
        let user = self.insert("users", user);
        lock(&self.accounts).push(Account {
            email: email.to_string(),
            password: password.to_string(),
            user_id: record_id(&user),
        });
    }

    /// Insert a record directly, filling server-side fields like the API
    /// would.
    pub fn seed(&self, collection: &str, record: Value) -> Value {
        self.insert(collection, record)
    }

    pub fn records(&self, collection: &str) -> Vec<Value> {
        lock(&self.collections)
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }

    pub fn clear_requests(&self) {
        lock(&self.requests).clear();
    }

    /// Answer every request whose path starts with `path_prefix` (e.g.
    /// `/api/payments`) with `status` and a JSON error message.
    pub fn fail_path(&self, path_prefix: &str, status: u16, message: &str) {
        lock(&self.failures).push(InjectedFailure {
            path_prefix: path_prefix.to_string(),
            status: StatusCode::from_u16(status)
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            message: message.to_string(),
        });
    }

    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
    }

    /// Invalidate every issued token, as if the sessions timed out.
    pub fn expire_tokens(&self) {
        lock(&self.tokens).clear();
    }
}

/// Internals shared by the handlers
impl MockBackend {
    fn next_reference(&self, prefix: &str) -> String {
        let n = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{prefix}-{n:05}")
    }

    /// Fields the server always owns.
    fn server_fields(&self, collection: &str) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("id".into(), Uuid::new_v4().to_string().into());
        match collection {
            "permits" => {
                let reference = self.next_reference("PRM");
                fields.insert("reference".into(), reference.into());
                fields.insert("submittedAt".into(), now());
                fields.insert("updatedAt".into(), now());
            }
            "payments" => {
                let reference = self.next_reference("PAY");
                fields.insert("reference".into(), reference.into());
                fields.insert("createdAt".into(), now());
            }
            "documents" => {
                fields.insert("uploadedAt".into(), now());
            }
            _ => {
                fields.insert("createdAt".into(), now());
            }
        }
        fields
    }

    /// Fields filled in only when the client left them out.
    fn default_fields(collection: &str) -> Value {
        match collection {
            "permits" => json!({ "status": "pending" }),
            "users" => json!({ "active": true }),
            "payments" => json!({ "status": "pending", "currency": "USD" }),
            "personnel" => json!({ "expatriate": false }),
            "jv" => json!({ "partnerIds": [] }),
            "localcontent/plans" => json!({ "status": "draft" }),
            "inspections" => json!({ "status": "scheduled" }),
            "notifications" => json!({
                "read": false,
                "acknowledged": false,
                "priority": "normal",
            }),
            _ => json!({}),
        }
    }

    fn insert(&self, collection: &str, record: Value) -> Value {
        let mut fields = match record {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        fields.remove("password");
        if let Value::Object(defaults) = Self::default_fields(collection) {
            for (key, value) in defaults {
                fields.entry(key).or_insert(value);
            }
        }
        fields.extend(self.server_fields(collection));

        let record = Value::Object(fields);
        if let Some(records) = lock(&self.collections).get_mut(collection) {
            records.push(record.clone());
        }
        record
    }

    fn find(&self, collection: &str, id: &str) -> Option<Value> {
        lock(&self.collections)
            .get(collection)?
            .iter()
            .find(|record| record_id(record) == id)
            .cloned()
    }

    /// Apply `change` to a stored record, returning the updated copy.
    fn modify(
        &self,
        collection: &str,
        id: &str,
        change: impl FnOnce(&mut Map<String, Value>),
    ) -> Option<Value> {
        let mut collections = lock(&self.collections);
        let record = collections
            .get_mut(collection)?
            .iter_mut()
            .find(|record| record_id(record) == id)?;
        if let Value::Object(fields) = record {
            change(fields);
            if fields.contains_key("updatedAt") {
                fields.insert("updatedAt".into(), now());
            }
        }
        Some(record.clone())
    }

    fn remove(&self, collection: &str, id: &str) -> bool {
        let mut collections = lock(&self.collections);
        let Some(records) = collections.get_mut(collection) else {
            return false;
        };
        let before = records.len();
        records.retain(|record| record_id(record) != id);
        records.len() != before
    }

    /// Record the request, then apply injected failures and, unless the
    /// route is public, the bearer token check.
    fn admit(
        &self,
        req: &HttpRequest,
        public: bool,
    ) -> Result<(), HttpResponse> {
        let authorization = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        lock(&self.requests).push(RecordedRequest {
            method: req.method().to_string(),
            path: req.path().to_string(),
            query: req.query_string().to_string(),
            authorization: authorization.clone(),
        });

        if let Some(failure) = lock(&self.failures)
            .iter()
            .find(|failure| req.path().starts_with(&failure.path_prefix))
        {
            return Err(error_response(failure.status, &failure.message));
        }
        if public {
            return Ok(());
        }

        let token = authorization
            .as_deref()
            .and_then(|value| value.strip_prefix("Bearer "));
        match token {
            Some(token) if lock(&self.tokens).contains_key(token) => Ok(()),
            _ => Err(error_response(
                StatusCode::UNAUTHORIZED,
                "Authentication required",
            )),
        }
    }
}

fn record_id(record: &Value) -> String {
    record["id"].as_str().unwrap_or_default().to_string()
}

fn error_response(status: StatusCode, message: &str) -> HttpResponse {
    HttpResponse::build(status)
        .json(json!({ "success": false, "message": message }))
}

fn envelope(status: StatusCode, data: Value) -> HttpResponse {
    HttpResponse::build(status).json(json!({ "success": true, "data": data }))
}

fn not_found(collection: &str) -> HttpResponse {
    let message = format!("No such record in {collection}");
    error_response(StatusCode::NOT_FOUND, &message)
}

fn decimal(value: &Value) -> Decimal {
    let text = match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    text.parse().unwrap_or_default()
}

fn has_status(record: &Value, status: &str) -> bool {
    record["status"].as_str() == Some(status)
}

#[derive(Debug, Deserialize)]
struct ListParams {
    page: Option<usize>,
    limit: Option<usize>,
    status: Option<String>,
    search: Option<String>,
}

async fn list(
    req: HttpRequest,
    state: web::Data<MockBackend>,
    query: web::Query<ListParams>,
    collection: &'static str,
) -> HttpResponse {
    if let Err(response) = state.admit(&req, false) {
        return response;
    }

    let search = query.search.as_deref().map(str::to_lowercase);
    let matching: Vec<Value> = state
        .records(collection)
        .into_iter()
        .filter(|record| match &query.status {
            Some(status) => has_status(record, status),
            None => true,
        })
        .filter(|record| match &search {
            Some(search) => SEARCHABLE.iter().any(|field| {
                record[*field]
                    .as_str()
                    .is_some_and(|text| text.to_lowercase().contains(search))
            }),
            None => true,
        })
        .collect();

    let total = matching.len();
    let page: Vec<Value> = match query.limit {
        Some(limit) => {
            let page = query.page.unwrap_or(1).max(1);
            matching
                .into_iter()
                .skip((page - 1) * limit)
                .take(limit)
                .collect()
        }
        None => matching,
    };

    HttpResponse::Ok().json(json!({
        "success": true,
        "data": page,
        "total": total,
    }))
}

async fn get_record(
    req: HttpRequest,
    state: web::Data<MockBackend>,
    id: web::Path<String>,
    collection: &'static str,
) -> HttpResponse {
    if let Err(response) = state.admit(&req, false) {
        return response;
    }
    match state.find(collection, &id) {
        Some(record) => envelope(StatusCode::OK, record),
        None => not_found(collection),
    }
}

async fn create(
    req: HttpRequest,
    state: web::Data<MockBackend>,
    body: web::Json<Value>,
    collection: &'static str,
) -> HttpResponse {
    if let Err(response) = state.admit(&req, false) {
        return response;
    }
    if !body.is_object() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Expected a JSON object",
        );
    }
    let record = state.insert(collection, body.into_inner());
    envelope(StatusCode::CREATED, record)
}

async fn update(
    req: HttpRequest,
    state: web::Data<MockBackend>,
    id: web::Path<String>,
    body: web::Json<Value>,
    collection: &'static str,
) -> HttpResponse {
    if let Err(response) = state.admit(&req, false) {
        return response;
    }
    let Value::Object(changes) = body.into_inner() else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Expected a JSON object",
        );
    };
    let updated = state.modify(collection, &id, |fields| {
        for (key, value) in changes {
            if key != "id" && key != "password" {
                fields.insert(key, value);
            }
        }
    });
    match updated {
        Some(record) => envelope(StatusCode::OK, record),
        None => not_found(collection),
    }
}

async fn delete(
    req: HttpRequest,
    state: web::Data<MockBackend>,
    id: web::Path<String>,
    collection: &'static str,
) -> HttpResponse {
    if let Err(response) = state.admit(&req, false) {
        return response;
    }
    if state.remove(collection, &id) {
        envelope(StatusCode::OK, Value::Null)
    } else {
        not_found(collection)
    }
}

async fn change_status(
    req: HttpRequest,
    state: web::Data<MockBackend>,
    id: web::Path<String>,
    body: web::Json<Value>,
    collection: &'static str,
) -> HttpResponse {
    if let Err(response) = state.admit(&req, false) {
        return response;
    }
    let Some(status) = body["status"].as_str().map(str::to_string) else {
        return error_response(StatusCode::BAD_REQUEST, "status is required");
    };
    let comment = body.get("comment").cloned().unwrap_or(Value::Null);
    let updated = state.modify(collection, &id, |fields| {
        fields.insert("status".into(), status.into());
        fields.insert("comment".into(), comment);
    });
    match updated {
        Some(record) => envelope(StatusCode::OK, record),
        None => not_found(collection),
    }
}

async fn login(
    req: HttpRequest,
    state: web::Data<MockBackend>,
    credentials: web::Json<LoginCredentials>,
) -> HttpResponse {
    if let Err(response) = state.admit(&req, true) {
        return response;
    }
    let user_id = lock(&state.accounts)
        .iter()
        .find(|account| {
            account.email == credentials.email
                && account.password == credentials.password
        })
        .map(|account| account.user_id.clone());
    let Some(user) = user_id.and_then(|id| state.find("users", &id)) else {
        return error_response(
            StatusCode::UNAUTHORIZED,
            "Invalid email or password",
        );
    };

    let token = Uuid::new_v4().simple().to_string();
    lock(&state.tokens).insert(token.clone(), record_id(&user));
    envelope(StatusCode::OK, json!({ "token": token, "user": user }))
}

async fn notification_action(
    req: HttpRequest,
    state: web::Data<MockBackend>,
    path: web::Path<(String, String)>,
) -> HttpResponse {
    if let Err(response) = state.admit(&req, false) {
        return response;
    }
    let (id, action) = path.into_inner();
    let change: fn(&mut Map<String, Value>) = match action.as_str() {
        "read" => |fields| {
            fields.insert("read".into(), true.into());
        },
        "unread" => |fields| {
            fields.insert("read".into(), false.into());
        },
        "acknowledge" => |fields| {
            fields.insert("read".into(), true.into());
            fields.insert("acknowledged".into(), true.into());
        },
        _ => {
            return error_response(
                StatusCode::NOT_FOUND,
                &format!("Unknown notification action {action}"),
            );
        }
    };
    match state.modify("notifications", &id, change) {
        Some(record) => envelope(StatusCode::OK, record),
        None => not_found("notifications"),
    }
}

async fn upload_document(
    req: HttpRequest,
    state: web::Data<MockBackend>,
    mut payload: Multipart,
) -> Result<HttpResponse, actix_web::Error> {
    if let Err(response) = state.admit(&req, false) {
        return Ok(response);
    }

    let mut file = None;
    let mut category = None;
    while let Some(field) = payload.next().await {
        let mut field = field?;
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field
            .content_disposition()
            .and_then(|disposition| disposition.get_filename())
            .map(str::to_string);
        let content_type = field
            .content_type()
            .map(|mime| mime.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            bytes.extend_from_slice(&chunk?);
        }

        match name.as_str() {
            "file" => {
                let file_name = file_name.unwrap_or_else(|| "upload".into());
                file = Some((file_name, content_type, bytes));
            }
            "category" => {
                category = Some(String::from_utf8_lossy(&bytes).into_owned());
            }
            _ => {}
        }
    }

    let Some((file_name, content_type, bytes)) = file else {
        return Ok(error_response(
            StatusCode::BAD_REQUEST,
            "A file part is required",
        ));
    };
    let record = state.insert(
        "documents",
        json!({
            "fileName": file_name,
            "contentType": content_type,
            "size": bytes.len(),
            "category": category,
        }),
    );
    lock(&state.files).insert(
        record_id(&record),
        StoredFile {
            content_type,
            bytes,
        },
    );
    Ok(envelope(StatusCode::CREATED, record))
}

async fn download_document(
    req: HttpRequest,
    state: web::Data<MockBackend>,
    id: web::Path<String>,
) -> HttpResponse {
    if let Err(response) = state.admit(&req, false) {
        return response;
    }
    match lock(&state.files).get(id.as_str()) {
        Some(file) => HttpResponse::Ok()
            .content_type(file.content_type.as_str())
            .body(file.bytes.clone()),
        None => not_found("documents"),
    }
}

async fn dashboard_overview(
    req: HttpRequest,
    state: web::Data<MockBackend>,
) -> HttpResponse {
    if let Err(response) = state.admit(&req, false) {
        return response;
    }
    let permits = state.records("permits");
    let count = |status: &str| {
        permits.iter().filter(|p| has_status(p, status)).count()
    };
    let payments_collected: Decimal = state
        .records("payments")
        .iter()
        .filter(|payment| has_status(payment, "paid"))
        .map(|payment| decimal(&payment["amount"]))
        .sum();
    let scheduled_inspections = state
        .records("inspections")
        .iter()
        .filter(|inspection| has_status(inspection, "scheduled"))
        .count();

    envelope(
        StatusCode::OK,
        json!({
            "totalPermits": permits.len(),
            "pendingPermits": count("pending"),
            "approvedPermits": count("approved"),
            "rejectedPermits": count("rejected"),
            "registeredCompanies": state.records("companies").len(),
            "scheduledInspections": scheduled_inspections,
            "paymentsCollected": payments_collected,
        }),
    )
}

async fn dashboard_alerts(
    req: HttpRequest,
    state: web::Data<MockBackend>,
) -> HttpResponse {
    if let Err(response) = state.admit(&req, false) {
        return response;
    }
    let pending_permits = state
        .records("permits")
        .into_iter()
        .filter(|permit| has_status(permit, "pending"))
        .map(|permit| {
            json!({
                "level": "warning",
                "message": format!(
                    "Permit {} is awaiting review",
                    permit["reference"].as_str().unwrap_or_default()
                ),
                "createdAt": permit["submittedAt"],
            })
        });
    let failed_payments = state
        .records("payments")
        .into_iter()
        .filter(|payment| has_status(payment, "failed"))
        .map(|payment| {
            json!({
                "level": "critical",
                "message": format!(
                    "Payment {} failed",
                    payment["reference"].as_str().unwrap_or_default()
                ),
                "createdAt": payment["createdAt"],
            })
        });
    let alerts: Vec<Value> = pending_permits.chain(failed_payments).collect();
    envelope(StatusCode::OK, Value::Array(alerts))
}

async fn dashboard_badges(
    req: HttpRequest,
    state: web::Data<MockBackend>,
) -> HttpResponse {
    if let Err(response) = state.admit(&req, false) {
        return response;
    }
    let pending = |collection: &str| {
        state
            .records(collection)
            .iter()
            .filter(|record| has_status(record, "pending"))
            .count()
    };
    let unread_notifications = state
        .records("notifications")
        .iter()
        .filter(|notification| notification["read"] == Value::Bool(false))
        .count();
    envelope(
        StatusCode::OK,
        json!({
            "pendingPermits": pending("permits"),
            "pendingPayments": pending("payments"),
            "unreadNotifications": unread_notifications,
        }),
    )
}

/// List, create, get, update, delete and status routes for one collection.
fn collection_routes(scope: Scope, collection: &'static str) -> Scope {
    let base = format!("/{collection}");
    let item = format!("/{collection}/{{id}}");
    let status = format!("/{collection}/{{id}}/status");

    scope
        .route(
            &base,
            web::get().to(
                move |req: HttpRequest,
                      state: web::Data<MockBackend>,
                      query: web::Query<ListParams>| {
                    list(req, state, query, collection)
                },
            ),
        )
        .route(
            &base,
            web::post().to(
                move |req: HttpRequest,
                      state: web::Data<MockBackend>,
                      body: web::Json<Value>| {
                    create(req, state, body, collection)
                },
            ),
        )
        .route(
            &item,
            web::get().to(
                move |req: HttpRequest,
                      state: web::Data<MockBackend>,
                      id: web::Path<String>| {
                    get_record(req, state, id, collection)
                },
            ),
        )
        .route(
            &item,
            web::put().to(
                move |req: HttpRequest,
                      state: web::Data<MockBackend>,
                      id: web::Path<String>,
                      body: web::Json<Value>| {
                    update(req, state, id, body, collection)
                },
            ),
        )
        .route(
            &item,
            web::delete().to(
                move |req: HttpRequest,
                      state: web::Data<MockBackend>,
                      id: web::Path<String>| {
                    delete(req, state, id, collection)
                },
            ),
        )
        .route(
            &status,
            web::patch().to(
                move |req: HttpRequest,
                      state: web::Data<MockBackend>,
                      id: web::Path<String>,
                      body: web::Json<Value>| {
                    change_status(req, state, id, body, collection)
                },
            ),
        )
}

pub fn api_services() -> Scope {
    let scope = web::scope("/api")
        .route("/auth/login", web::post().to(login))
        .route("/documents/upload", web::post().to(upload_document))
        .route("/documents/{id}/download", web::get().to(download_document))
        .route(
            "/notifications/{id}/{action}",
            web::patch().to(notification_action),
        )
        .route("/dashboard/overview", web::get().to(dashboard_overview))
        .route("/dashboard/alerts", web::get().to(dashboard_alerts))
        .route("/dashboard/badges", web::get().to(dashboard_badges));

    COLLECTIONS
        .iter()
        .fold(scope, |scope, collection| collection_routes(scope, *collection))
}

pub struct Config {
    /// set to "0.0.0.0" for public access, "127.0.0.1" for local dev
    pub ip: String,
    /// set to 0 to get an os-assigned port
    pub port: u16,
}

impl Config {
    /// Read `IP_ADDRESS` and `PORT`, defaulting to `127.0.0.1:5000`, the
    /// address the client's default base url points at.
    pub fn from_env() -> anyhow::Result<Self> {
        use std::env::var;

        let ip = var("IP_ADDRESS").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = match var("PORT") {
            Ok(port) => port
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid PORT {port:?}: {e}"))?,
            Err(_) => 5000,
        };
        Ok(Config { ip, port })
    }
}

/// Build the server, but not await it.
///
/// Returns the port that the server has bound to by modifying the config.
pub fn build(
    config: &mut Config,
    backend: web::Data<MockBackend>,
) -> std::io::Result<Server> {
    // OS assigns the port if binding to 0
    let listener = TcpListener::bind(format!("{}:{}", config.ip, config.port))?;
    config.port = listener.local_addr()?.port();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(backend.clone())
            .service(api_services())
    })
    .workers(1)
    .listen(listener)?
    .run();
    Ok(server)
}
