use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;

use crate::errors::ServiceError;
use crate::services::catalog::{CatalogItem, CustomerRecord, MasterUnitInfo};
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub struct WarehouseQuery {
    pub site: String,
}

#[derive(Debug, Deserialize)]
pub struct LocationQuery {
    pub site: String,
    pub warehouse: String,
}

#[derive(Debug, Deserialize)]
pub struct CustomerLookupQuery {
    pub name: String,
}

/// GET /api/v1/catalog/items
pub async fn list_items(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CatalogItem>>>, ServiceError> {
    let items = state.services.catalog.items().await?;
    Ok(Json(ApiResponse::success(items)))
}

/// GET /api/v1/catalog/sites
pub async fn list_sites(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<String>>>, ServiceError> {
    Ok(Json(ApiResponse::success(state.services.catalog.sites())))
}

/// GET /api/v1/catalog/warehouses?site=
pub async fn list_warehouses(
    State(state): State<AppState>,
    Query(query): Query<WarehouseQuery>,
) -> Result<Json<ApiResponse<Vec<String>>>, ServiceError> {
    let warehouses = state.services.catalog.warehouses(&query.site).await?;
    Ok(Json(ApiResponse::success(warehouses)))
}

/// GET /api/v1/catalog/locations?site=&warehouse=
pub async fn list_locations(
    State(state): State<AppState>,
    Query(query): Query<LocationQuery>,
) -> Result<Json<ApiResponse<Vec<String>>>, ServiceError> {
    let locations = state
        .services
        .catalog
        .locations(&query.site, &query.warehouse)
        .await?;
    Ok(Json(ApiResponse::success(locations)))
}

/// GET /api/v1/catalog/units
pub async fn list_units(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<String>>>, ServiceError> {
    let units = state.services.catalog.units().await?;
    Ok(Json(ApiResponse::success(units)))
}

/// GET /api/v1/catalog/items/{item}/master-units
pub async fn master_units(
    State(state): State<AppState>,
    Path(item): Path<String>,
) -> Result<Json<ApiResponse<MasterUnitInfo>>, ServiceError> {
    let info = state.services.catalog.master_units(&item).await?;
    Ok(Json(ApiResponse::success(info)))
}

/// GET /api/v1/customers/lookup?name=
pub async fn customer_lookup(
    State(state): State<AppState>,
    Query(query): Query<CustomerLookupQuery>,
) -> Result<Json<ApiResponse<CustomerRecord>>, ServiceError> {
    let customer = state
        .services
        .catalog
        .customer_by_name(&query.name)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Customer not found".to_string()))?;
    Ok(Json(ApiResponse::success(customer)))
}
