use axum::{
    extract::{Path, State},
    Json,
};

use super::{pattern_from_tail, AppError, ItemEnvelope, ListEnvelope};
use crate::schema::EndpointSchema;
use crate::Observatory;

pub async fn list_schemas(State(obs): State<Observatory>) -> Json<ListEnvelope<EndpointSchema>> {
    let schemas = obs.schemas().map(|s| s.get_schemas()).unwrap_or_default();
    Json(ListEnvelope::new(schemas))
}

pub async fn endpoint_schema(
    State(obs): State<Observatory>,
    Path((method, tail)): Path<(String, String)>,
) -> Result<Json<ItemEnvelope<EndpointSchema>>, AppError> {
    let pattern = pattern_from_tail(&tail);
    obs.schemas()
        .and_then(|s| s.get_endpoint_schema(&method, &pattern))
        .map(|schema| Json(ItemEnvelope::new(schema)))
        .ok_or_else(|| AppError::NotFound("Endpoint schema not found".into()))
}
