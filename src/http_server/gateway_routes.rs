//! Gateway HTTP Routes
//!
//! Health, table creation, row insertion, queries and bulk upload.

use std::sync::Arc;

use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, QueryRejection},
        Multipart, Query, State,
    },
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::database::RowSet;
use crate::gateway::{GatewayError, GatewayResult, GatewayService, Health, UploadedFile};

/// Upload target when the request names no table
pub const DEFAULT_UPLOAD_TABLE: &str = "data";

// ==================
// Request/Response Types
// ==================

#[derive(Debug, Deserialize)]
pub struct CreateTableParams {
    pub table_name: Option<String>,
    pub columns: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InsertRequest {
    #[serde(default)]
    pub table_name: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct QueryParams {
    pub query: Option<String>,
    pub table_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawQueryRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub table_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct RawQueryResponse {
    pub status: &'static str,
    pub data: RowSet,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub rows_inserted: usize,
}

// ==================
// Gateway Routes
// ==================

/// Create gateway routes
pub fn gateway_routes(service: Arc<GatewayService>) -> Router {
    Router::new()
        .route("/", get(health_handler))
        .route("/create_table/", post(create_table_handler))
        .route("/insert/", post(insert_handler))
        .route("/query/", get(query_handler))
        .route("/raw_query/", post(raw_query_handler))
        .route("/upload/", post(upload_handler))
        .with_state(service)
}

/// Run a service call on the blocking pool; the engine and the decoders are synchronous.
async fn blocking<T, F>(service: &Arc<GatewayService>, f: F) -> GatewayResult<T>
where
    T: Send + 'static,
    F: FnOnce(&GatewayService) -> GatewayResult<T> + Send + 'static,
{
    let service = Arc::clone(service);
    tokio::task::spawn_blocking(move || f(&service)).await?
}

// ==================
// Handlers
// ==================

async fn health_handler(State(service): State<Arc<GatewayService>>) -> Json<Health> {
    Json(service.health())
}

async fn create_table_handler(
    State(service): State<Arc<GatewayService>>,
    params: Result<Query<CreateTableParams>, QueryRejection>,
) -> GatewayResult<Json<MessageResponse>> {
    let Query(params) = params?;
    let table = params
        .table_name
        .ok_or_else(|| GatewayError::bad_request("Missing required parameter: table_name"))?;
    let columns = params
        .columns
        .ok_or_else(|| GatewayError::bad_request("Missing required parameter: columns"))?;

    let message = format!("Table '{}' created successfully.", table);
    blocking(&service, move |svc| svc.create_table(&table, &columns)).await?;

    Ok(Json(MessageResponse { message }))
}

async fn insert_handler(
    State(service): State<Arc<GatewayService>>,
    body: Result<Json<InsertRequest>, JsonRejection>,
) -> GatewayResult<Json<MessageResponse>> {
    let Json(request) = body?;
    let row = match request.data {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(map),
        Some(_) => return Err(GatewayError::bad_request("'data' must be a JSON object")),
    };

    let table = request.table_name;
    let message = format!(
        "Data inserted into '{}' successfully.",
        table.as_deref().unwrap_or_default()
    );
    blocking(&service, move |svc| svc.insert(table.as_deref(), row)).await?;

    Ok(Json(MessageResponse { message }))
}

async fn query_handler(
    State(service): State<Arc<GatewayService>>,
    params: Result<Query<QueryParams>, QueryRejection>,
) -> GatewayResult<Json<RowSet>> {
    let Query(params) = params?;
    let rows = blocking(&service, move |svc| {
        svc.query(params.query.as_deref(), params.table_name.as_deref())
    })
    .await?;

    Ok(Json(rows))
}

async fn raw_query_handler(
    State(service): State<Arc<GatewayService>>,
    body: Result<Json<RawQueryRequest>, JsonRejection>,
) -> GatewayResult<Json<RawQueryResponse>> {
    let Json(request) = body?;
    let data = blocking(&service, move |svc| svc.raw_query(&request.query, request.params)).await?;

    Ok(Json(RawQueryResponse {
        status: "success",
        data,
    }))
}

async fn upload_handler(
    State(service): State<Arc<GatewayService>>,
    params: Result<Query<UploadParams>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> GatewayResult<Json<UploadResponse>> {
    let Query(params) = params?;
    let mut multipart = multipart?;
    let table = params
        .table_name
        .unwrap_or_else(|| DEFAULT_UPLOAD_TABLE.to_string());

    let file = read_upload(&mut multipart).await?;
    let rows_inserted = blocking(&service, move |svc| svc.upload(&table, file)).await?;

    Ok(Json(UploadResponse {
        message: "Data uploaded successfully".to_string(),
        rows_inserted,
    }))
}

/// Take the `file` field, or failing that the first field carrying a file name.
async fn read_upload(multipart: &mut Multipart) -> GatewayResult<UploadedFile> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") && field.file_name().is_none() {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let contents = field.bytes().await?;
        return Ok(UploadedFile::new(file_name, contents));
    }

    Err(GatewayError::bad_request(
        "No file uploaded. Send a multipart field named 'file'.",
    ))
}
