use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use api_observatory::handlers::AppError;

use super::catalog::{Catalog, Prefs, Product, User};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub prefs: Option<Prefs>,
}

fn default_role() -> String {
    "viewer".into()
}

// ─── GET /api/users/:id ──────────────────────────────────────────

pub async fn get_user(
    State(catalog): State<Arc<Catalog>>,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    catalog
        .user(&id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("user '{id}' not found")))
}

// ─── POST /api/users ─────────────────────────────────────────────

pub async fn create_user(
    State(catalog): State<Arc<Catalog>>,
    Json(req): Json<CreateUserRequest>,
) -> (StatusCode, Json<User>) {
    let user = catalog.insert_user(req.name, req.email, req.role, req.prefs);
    (StatusCode::CREATED, Json(user))
}

// ─── GET /api/products/:id ───────────────────────────────────────

pub async fn get_product(
    State(catalog): State<Arc<Catalog>>,
    Path(id): Path<String>,
) -> Result<Json<Product>, AppError> {
    catalog
        .product(&id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product '{id}' not found")))
}
