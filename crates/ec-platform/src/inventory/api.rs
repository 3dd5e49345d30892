//! Inventory API
//!
//! Admin medicine management and the read-only listing for patients.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::inventory::entity::Medicine;
use crate::inventory::repository::MedicineRepository;
use crate::shared::api_common::{lenient, non_empty, ok, parse_date_input, ApiResponse, CreatedResponse, JsonBody};
use crate::shared::error::{ClinicError, Result};
use crate::shared::middleware::Authenticated;

/// Create medicine request. Numbers may be sent as strings.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMedicineRequest {
    pub name: Option<String>,
    pub generic_name: Option<String>,
    pub form: Option<String>,
    pub strength: Option<String>,
    pub batch_number: Option<String>,
    pub manufacturer: Option<String>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub unit_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub stock: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub threshold: Option<f64>,
    /// YYYY-MM-DD
    pub expiry_date: Option<String>,
    pub notes: Option<String>,
}

impl CreateMedicineRequest {
    fn into_medicine(self) -> Result<Medicine> {
        let name = non_empty(self.name).ok_or_else(|| ClinicError::validation("Name is required"))?;

        let expiry_date = match non_empty(self.expiry_date) {
            Some(value) => {
                Some(parse_date_input(&value).ok_or_else(|| ClinicError::validation("Invalid expiry date"))?)
            }
            None => None,
        };

        Ok(Medicine {
            generic_name: self.generic_name.unwrap_or_default().trim().to_string(),
            form: self.form.unwrap_or_default().trim().to_string(),
            strength: self.strength.unwrap_or_default().trim().to_string(),
            batch_number: self.batch_number.unwrap_or_default().trim().to_string(),
            manufacturer: self.manufacturer.unwrap_or_default().trim().to_string(),
            unit_price: self.unit_price.unwrap_or(0.0),
            stock: self.stock.unwrap_or(0.0),
            threshold: self.threshold.unwrap_or(0.0),
            expiry_date,
            notes: self.notes.unwrap_or_default(),
            ..Medicine::new(name)
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MedicineResponse {
    pub id: String,
    pub name: String,
    pub generic_name: String,
    pub form: String,
    pub strength: String,
    pub batch_number: String,
    pub manufacturer: String,
    pub unit_price: f64,
    pub stock: f64,
    pub threshold: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<DateTime<Utc>>,
    pub notes: String,
    pub low_stock: bool,
    /// Stock relative to threshold, 0 to 100
    pub stock_level: u8,
    pub created_at: DateTime<Utc>,
}

impl From<Medicine> for MedicineResponse {
    fn from(m: Medicine) -> Self {
        let low_stock = m.is_low_stock();
        let stock_level = m.stock_level_percent();
        Self {
            id: m.id,
            name: m.name,
            generic_name: m.generic_name,
            form: m.form,
            strength: m.strength,
            batch_number: m.batch_number,
            manufacturer: m.manufacturer,
            unit_price: m.unit_price,
            stock: m.stock,
            threshold: m.threshold,
            expiry_date: m.expiry_date,
            notes: m.notes,
            low_stock,
            stock_level,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MedicineListResponse {
    pub medicines: Vec<MedicineResponse>,
}

#[derive(Clone)]
pub struct InventoryState {
    pub medicines: Arc<dyn MedicineRepository>,
}

/// List all medicines, newest first
#[utoipa::path(
    get,
    path = "/admin/inventory",
    tag = "inventory",
    operation_id = "getApiAdminInventory",
    responses(
        (status = 200, description = "All medicines with low-stock flags", body = MedicineListResponse),
        (status = 403, description = "Not an admin")
    ),
    security(("cookie_auth" = []))
)]
pub async fn list_inventory(
    State(state): State<InventoryState>,
    auth: Authenticated,
) -> Result<Json<ApiResponse<MedicineListResponse>>> {
    auth.require_admin()?;

    let medicines = state.medicines.list_recent().await?;
    Ok(ok(MedicineListResponse {
        medicines: medicines.into_iter().map(Into::into).collect(),
    }))
}

/// Add a medicine
#[utoipa::path(
    post,
    path = "/admin/inventory",
    tag = "inventory",
    operation_id = "postApiAdminInventory",
    request_body = CreateMedicineRequest,
    responses(
        (status = 201, description = "Medicine created", body = CreatedResponse),
        (status = 400, description = "Missing name or malformed field"),
        (status = 403, description = "Not an admin")
    ),
    security(("cookie_auth" = []))
)]
pub async fn create_medicine(
    State(state): State<InventoryState>,
    auth: Authenticated,
    JsonBody(req): JsonBody<CreateMedicineRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedResponse>>)> {
    auth.require_admin()?;

    let medicine = req.into_medicine()?;
    state.medicines.insert(&medicine).await?;

    info!(medicine_id = %medicine.id, name = %medicine.name, stock = medicine.stock, "Medicine added");

    Ok((StatusCode::CREATED, ok(CreatedResponse::new(medicine.id))))
}

/// Medicines available to patients, by name
#[utoipa::path(
    get,
    path = "/inventory",
    tag = "inventory",
    operation_id = "getApiInventory",
    responses(
        (status = 200, description = "Medicines sorted by name", body = MedicineListResponse),
        (status = 401, description = "Not authenticated")
    ),
    security(("cookie_auth" = []))
)]
pub async fn list_inventory_for_patients(
    State(state): State<InventoryState>,
    _auth: Authenticated,
) -> Result<Json<ApiResponse<MedicineListResponse>>> {
    let medicines = state.medicines.list_by_name().await?;
    Ok(ok(MedicineListResponse {
        medicines: medicines.into_iter().map(Into::into).collect(),
    }))
}

pub fn inventory_router(state: InventoryState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_inventory, create_medicine))
        .routes(routes!(list_inventory_for_patients))
        .with_state(state)
}
