use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// One inbound order submission: a customer plus its line items. The order
/// exists only for the duration of one intake run; nothing here is persisted
/// as a unit.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SubmitOrderRequest {
    #[validate]
    pub customer: CustomerInfo,

    #[validate]
    pub items: Vec<LineItem>,
}

/// Business identifiers for billing and shipping. Immutable once received.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CustomerInfo {
    #[validate(length(min = 1, message = "Customer account is required"))]
    pub customer_account: String,

    #[serde(default)]
    pub customer_name: String,

    #[serde(default)]
    pub delivery_address: String,

    /// Purchase-order reference supplied by the customer.
    #[serde(default)]
    pub purch_order_ref: String,

    pub requested_date: Option<NaiveDate>,

    #[serde(default)]
    pub site: String,

    #[serde(default)]
    pub warehouse: String,
}

/// One line item. Each item drives exactly one complete write cycle:
/// header, line, inventory transaction.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct LineItem {
    #[validate(length(min = 1, message = "Item number is required"))]
    pub item_number: String,

    #[serde(default)]
    pub item_name: String,

    pub quantity: f64,

    #[serde(default)]
    pub unit: String,

    pub packing_unit: Option<String>,
    pub packing_unit_qty: Option<f64>,
    pub master_unit: Option<String>,
    pub master_unit_qty: Option<String>,

    #[serde(default)]
    pub site: String,

    #[serde(default)]
    pub warehouse: String,

    #[serde(default)]
    pub location: String,
}

/// Where an item's write cycle ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Header, line and inventory transaction all written.
    Completed,
    /// An identifier could not be allocated; nothing written for this item.
    AllocationFailed,
    /// The header insert affected zero rows or raised; item abandoned.
    HeaderFailed,
    /// Header written, line insert failed; header stays.
    LineFailed,
    /// Header and line written, inventory transaction failed; both stay.
    InventoryTransFailed,
}

impl ItemStatus {
    /// A header row exists for this item, so its order code is part of the
    /// returned list.
    pub fn header_written(self) -> bool {
        !matches!(self, ItemStatus::AllocationFailed | ItemStatus::HeaderFailed)
    }
}

/// Per-item report accumulated by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemOutcome {
    /// Zero-based position in the submitted item list.
    pub line: usize,
    pub item_number: String,
    pub order_number: Option<String>,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Response body for an order submission. Always success-shaped for a
/// structurally valid request: callers detect partial failure by comparing
/// `order_numbers` against the submitted item count, or by reading `items`
/// when the compatibility mode leaves it in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSubmissionResponse {
    pub message: String,
    pub order_numbers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<ItemOutcome>>,
}
