//! Axum HTTP server: maps path segments and JSON bodies onto the registry
//! and object store operations.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, patch, post, put};
use axum::{Json, Router};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::dto::{
    CreateTypeRequest, DeleteResponse, GetQuery, InstanceResponse, ListQuery, ListResponse,
    SingleResponse, TypeResponse,
};
use super::errors::{RestError, RestResult};
use crate::config::Settings;
use crate::engine::{Document, FindOptions, ObjectId};
use crate::registry::{TypePatch, TypeRegistry};
use crate::store::{HistoryRecord, NewInstance, ObjectStore};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Type registry
    pub registry: Arc<TypeRegistry>,
    /// Versioned object store
    pub store: ObjectStore,
}

/// Builds the application router.
pub fn router(state: AppState, settings: &Settings) -> Router {
    Router::new()
        .route("/register_type/", post(create_type).get(list_types))
        .route("/register_type/{id}", get(get_type))
        .route("/register_type/{id}", put(update_type))
        .route("/register_type/{id}", delete(delete_type))
        .route("/register/{slug}/", post(insert_object).get(list_objects))
        .route("/register/{slug}/{object_id}", get(get_object))
        .route("/register/{slug}/{object_id}", patch(update_object))
        .route("/register/{slug}/{object_id}", delete(delete_object))
        .route(
            "/register/{slug}/{object_id}/deactivate",
            post(deactivate_object),
        )
        .route(
            "/register/{slug}/{object_id}/history/{history_id}",
            get(get_history_record),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(TimeoutLayer::new(settings.request_timeout())),
        )
        .with_state(state)
}

fn parse_id(raw: &str) -> RestResult<ObjectId> {
    ObjectId::parse(raw).ok_or_else(|| RestError::InvalidIdentifier(raw.to_string()))
}

// ----------------------------------------------------------------------
// Type registry routes
// ----------------------------------------------------------------------

async fn create_type(
    State(state): State<AppState>,
    Json(body): Json<CreateTypeRequest>,
) -> RestResult<(StatusCode, Json<TypeResponse>)> {
    let created = state.registry.create(body.into())?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

async fn list_types(
    State(state): State<AppState>,
) -> RestResult<Json<ListResponse<TypeResponse>>> {
    let types: Vec<TypeResponse> = state
        .registry
        .list()?
        .into_iter()
        .map(TypeResponse::from)
        .collect();
    Ok(Json(ListResponse::new(types)))
}

async fn get_type(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> RestResult<Json<TypeResponse>> {
    let id = parse_id(&id)?;
    let def = state
        .registry
        .find_by_id(&id)?
        .ok_or_else(|| crate::error::Error::not_found(format!("register type '{id}' not found")))
        .map_err(RestError::from)?;
    Ok(Json(def.into()))
}

async fn update_type(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<TypePatch>,
) -> RestResult<Json<TypeResponse>> {
    let id = parse_id(&id)?;
    let updated = state.registry.update(&id, patch)?;
    Ok(Json(updated.into()))
}

async fn delete_type(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> RestResult<StatusCode> {
    let id = parse_id(&id)?;
    state.registry.delete(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ----------------------------------------------------------------------
// Object store routes
// ----------------------------------------------------------------------

async fn insert_object(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(body): Json<NewInstance>,
) -> RestResult<(StatusCode, Json<SingleResponse<InstanceResponse>>)> {
    let created = state.store.insert_one(&slug, body)?;
    Ok((StatusCode::CREATED, Json(SingleResponse::new(created))))
}

async fn list_objects(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<ListQuery>,
) -> RestResult<Json<ListResponse<InstanceResponse>>> {
    let options = FindOptions {
        skip: query.skip,
        limit: query.limit,
        exclude: vec!["history".to_string()],
        ..Default::default()
    };
    let instances: Vec<InstanceResponse> = state
        .store
        .find(&slug, &Document::new(), &options)?
        .collect();
    Ok(Json(ListResponse::new(instances)))
}

async fn get_object(
    State(state): State<AppState>,
    Path((slug, object_id)): Path<(String, String)>,
    Query(query): Query<GetQuery>,
) -> RestResult<Json<SingleResponse<InstanceResponse>>> {
    let id = parse_id(&object_id)?;
    let exclude: &[&str] = if query.include_history { &[] } else { &["history"] };
    let instance = state
        .store
        .find_one_by_id(&slug, &id, exclude)?
        .ok_or_else(|| {
            crate::error::Error::not_found(format!("object '{id}' not found in '{slug}'"))
        })
        .map_err(RestError::from)?;
    Ok(Json(SingleResponse::new(instance)))
}

async fn update_object(
    State(state): State<AppState>,
    Path((slug, object_id)): Path<(String, String)>,
    Json(patch): Json<Document>,
) -> RestResult<Json<SingleResponse<InstanceResponse>>> {
    let id = parse_id(&object_id)?;
    let updated = state.store.update_one(&slug, &id, patch)?;
    Ok(Json(SingleResponse::new(updated)))
}

async fn deactivate_object(
    State(state): State<AppState>,
    Path((slug, object_id)): Path<(String, String)>,
) -> RestResult<Json<SingleResponse<InstanceResponse>>> {
    let id = parse_id(&object_id)?;
    let updated = state.store.deactivate(&slug, &id)?;
    Ok(Json(SingleResponse::new(updated)))
}

async fn get_history_record(
    State(state): State<AppState>,
    Path((slug, object_id, history_id)): Path<(String, String, String)>,
) -> RestResult<Json<SingleResponse<HistoryRecord>>> {
    let id = parse_id(&object_id)?;
    let history_id = parse_id(&history_id)?;
    let record = state.store.get_history_record(&slug, &id, &history_id)?;
    Ok(Json(SingleResponse::new(record)))
}

async fn delete_object(
    State(state): State<AppState>,
    Path((slug, object_id)): Path<(String, String)>,
) -> RestResult<Json<DeleteResponse>> {
    let id = parse_id(&object_id)?;
    let deleted = state.store.delete_one_by_id(&slug, &id)?;
    if !deleted {
        return Err(RestError::Core(crate::error::Error::not_found(format!(
            "object '{id}' not found in '{slug}'"
        ))));
    }
    Ok(Json(DeleteResponse { deleted }))
}
