use crate::config::{AllocationMode, IntakeConfig, WriteDefaults};
use crate::db::Gateway;
use crate::errors::ServiceError;
use crate::models::{CustomerInfo, ItemOutcome, ItemStatus, LineItem, SubmitOrderRequest};
use crate::services::rec_ids::RecordIdAllocator;
use crate::services::reference::ReferenceResolver;
use crate::services::sequences::{format_invent_trans_id, SequenceAllocator};
use chrono::Utc;
use sea_orm::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

const SALES_TABLE: &str = "SALESTABLE";
const SALES_LINE: &str = "SALESLINE";
const INVENT_TRANS: &str = "INVENTTRANS";

const HEADER_INSERT: &str = "INSERT INTO SALESTABLE \
     (RECID, SALESID, SALESNAME, CUSTACCOUNT, DELIVERYADDRESS, PURCHORDERFORMNUM, \
      RECEIPTDATEREQUESTED, INVENTSITEID, INVENTLOCATIONID, CURRENCYCODE, DLVMODE, \
      LANGUAGEID, SALESRESPONSIBLE, DATAAREAID, CREATEDDATETIME) \
     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

const LINE_INSERT: &str = "INSERT INTO SALESLINE \
     (RECID, SALESID, ITEMID, NAME, SALESQTY, SALESUNIT, PACKINGUNIT, PACKINGUNITQTY, \
      MASTERUNIT, MASTERUNITQTY, INVENTTRANSID, INVENTDIMID, CUSTACCOUNT, CUSTGROUP, \
      INVENTSITEID, INVENTLOCATIONID, WMSLOCATIONID, DATAAREAID, CREATEDDATETIME) \
     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

const TRANS_INSERT: &str = "INSERT INTO INVENTTRANS \
     (RECID, INVENTTRANSID, ITEMID, CUSTVENDAC, QTY, INVENTDIMID, DATAAREAID, DATEPHYSICAL) \
     VALUES (?, ?, ?, ?, ?, ?, ?, ?)";

/// What one intake run produced: the generated order codes, in submission
/// order, plus the per-item report.
#[derive(Debug, Clone)]
pub struct OrderIntakeOutcome {
    pub order_numbers: Vec<String>,
    pub items: Vec<ItemOutcome>,
}

/// The order write pipeline. Per line item, strictly in sequence: allocate
/// an order number and header record id, insert the header, then allocate
/// and resolve the line attributes, insert the line, and insert the
/// inventory transaction. Every failure is contained to its item; there is
/// no transaction around the triplet, so a header without its line (or a
/// line without its inventory transaction) is an accepted, observable
/// outcome.
#[derive(Clone)]
pub struct OrderIntakeService {
    gateway: Gateway,
    sequences: SequenceAllocator,
    rec_ids: RecordIdAllocator,
    resolver: ReferenceResolver,
    intake: IntakeConfig,
    defaults: WriteDefaults,
    /// Held across one item's allocate+insert cycle in serialized mode.
    guard: Option<Arc<Mutex<()>>>,
}

impl OrderIntakeService {
    pub fn new(gateway: Gateway, intake: IntakeConfig, defaults: WriteDefaults) -> Self {
        let sequences = SequenceAllocator::new(
            gateway.clone(),
            defaults.data_area_id.clone(),
            intake.allocation_mode,
        );
        let rec_ids = RecordIdAllocator::new(gateway.clone());
        let resolver = ReferenceResolver::new(gateway.clone(), defaults.data_area_id.clone());
        let guard = (intake.allocation_mode == AllocationMode::Serialized)
            .then(|| Arc::new(Mutex::new(())));

        Self {
            gateway,
            sequences,
            rec_ids,
            resolver,
            intake,
            defaults,
            guard,
        }
    }

    /// Processes one submission, one item at a time, in submission order.
    /// Never fails as a whole: callers read the outcome to see how far each
    /// item got.
    #[instrument(
        skip(self, order),
        fields(customer = %order.customer.customer_account, item_count = order.items.len())
    )]
    pub async fn process_order(&self, order: &SubmitOrderRequest) -> OrderIntakeOutcome {
        let mut order_numbers = Vec::with_capacity(order.items.len());
        let mut items = Vec::with_capacity(order.items.len());

        for (line, item) in order.items.iter().enumerate() {
            let _serialized = match &self.guard {
                Some(guard) => Some(guard.lock().await),
                None => None,
            };

            let outcome = self.write_item(line, &order.customer, item).await;

            if outcome.status.header_written() {
                if let Some(code) = &outcome.order_number {
                    order_numbers.push(code.clone());
                }
            }
            if outcome.status != ItemStatus::Completed {
                warn!(
                    line,
                    item = %item.item_number,
                    status = ?outcome.status,
                    detail = outcome.detail.as_deref().unwrap_or(""),
                    "line item did not complete"
                );
            }
            items.push(outcome);
        }

        info!(
            created = order_numbers.len(),
            submitted = order.items.len(),
            "order intake completed"
        );

        OrderIntakeOutcome {
            order_numbers,
            items,
        }
    }

    async fn write_item(
        &self,
        line: usize,
        customer: &CustomerInfo,
        item: &LineItem,
    ) -> ItemOutcome {
        // Step 1: mint the human-facing order code.
        let order_number = match self.sequences.allocate(&self.intake.order_sequence).await {
            Ok(number) => format!("{}{}", self.intake.order_code_prefix, number),
            Err(e) => {
                error!(line, "order-number allocation failed: {}", e);
                return self.outcome(line, item, None, ItemStatus::AllocationFailed, e);
            }
        };

        // Step 2: header record id.
        let header_rec_id = match self.rec_ids.next_id(SALES_TABLE).await {
            Ok(id) => id,
            Err(e) => {
                error!(line, "header record-id allocation failed: {}", e);
                return self.outcome(line, item, None, ItemStatus::AllocationFailed, e);
            }
        };

        // Step 3: header insert. Zero affected rows abandons the item.
        match self
            .insert_header(header_rec_id, &order_number, customer)
            .await
        {
            Ok(affected) if affected > 0 => {}
            Ok(_) => {
                error!(line, order_number = %order_number, "header insert affected zero rows");
                return self.outcome(
                    line,
                    item,
                    None,
                    ItemStatus::HeaderFailed,
                    ServiceError::WriteError("header insert affected zero rows".into()),
                );
            }
            Err(e) => {
                error!(line, order_number = %order_number, "header insert failed: {}", e);
                return self.outcome(line, item, None, ItemStatus::HeaderFailed, e);
            }
        }

        // Step 4: line attributes. The header is committed; a failure from
        // here on leaves it in place and still yields the order code.
        let line_rec_id = match self.rec_ids.next_id(SALES_LINE).await {
            Ok(id) => id,
            Err(e) => {
                error!(line, "line record-id allocation failed: {}", e);
                return self.outcome(
                    line,
                    item,
                    Some(order_number),
                    ItemStatus::LineFailed,
                    e,
                );
            }
        };

        let customer_group = self
            .resolver
            .customer_group(&customer.customer_account)
            .await;

        let invent_trans_id = match self
            .sequences
            .allocate(&self.intake.invent_trans_sequence)
            .await
        {
            Ok(raw) => format_invent_trans_id(
                raw,
                self.intake.invent_trans_width,
                &self.intake.invent_trans_suffix,
            ),
            Err(e) => {
                error!(line, "inventory-transaction id allocation failed: {}", e);
                return self.outcome(
                    line,
                    item,
                    Some(order_number),
                    ItemStatus::LineFailed,
                    e,
                );
            }
        };

        let dimension_id = self
            .resolver
            .inventory_dimension(&item.site, &item.warehouse, &item.location)
            .await;

        // Step 5: line insert.
        match self
            .insert_line(
                line_rec_id,
                &order_number,
                customer,
                item,
                &customer_group,
                &invent_trans_id,
                &dimension_id,
            )
            .await
        {
            Ok(affected) if affected > 0 => {}
            Ok(_) => {
                error!(line, order_number = %order_number, "line insert affected zero rows");
                return self.outcome(
                    line,
                    item,
                    Some(order_number),
                    ItemStatus::LineFailed,
                    ServiceError::WriteError("line insert affected zero rows".into()),
                );
            }
            Err(e) => {
                error!(line, order_number = %order_number, "line insert failed: {}", e);
                return self.outcome(line, item, Some(order_number), ItemStatus::LineFailed, e);
            }
        }

        // Step 6: inventory transaction referencing the same id.
        let trans_rec_id = match self.rec_ids.next_id(INVENT_TRANS).await {
            Ok(id) => id,
            Err(e) => {
                error!(line, "inventory-transaction record-id allocation failed: {}", e);
                return self.outcome(
                    line,
                    item,
                    Some(order_number),
                    ItemStatus::InventoryTransFailed,
                    e,
                );
            }
        };

        match self
            .insert_transaction(trans_rec_id, &invent_trans_id, customer, item, &dimension_id)
            .await
        {
            Ok(affected) if affected > 0 => {}
            Ok(_) => {
                error!(line, order_number = %order_number, "inventory transaction insert affected zero rows");
                return self.outcome(
                    line,
                    item,
                    Some(order_number),
                    ItemStatus::InventoryTransFailed,
                    ServiceError::WriteError("inventory transaction insert affected zero rows".into()),
                );
            }
            Err(e) => {
                error!(line, order_number = %order_number, "inventory transaction insert failed: {}", e);
                return self.outcome(
                    line,
                    item,
                    Some(order_number),
                    ItemStatus::InventoryTransFailed,
                    e,
                );
            }
        }

        info!(line, order_number = %order_number, item = %item.item_number, "line item written");

        ItemOutcome {
            line,
            item_number: item.item_number.clone(),
            order_number: Some(order_number),
            status: ItemStatus::Completed,
            detail: None,
        }
    }

    // Header attributes come from the customer block; per-item site and
    // warehouse only ever land on the line.
    async fn insert_header(
        &self,
        rec_id: i64,
        order_number: &str,
        customer: &CustomerInfo,
    ) -> Result<u64, ServiceError> {
        self.gateway
            .execute(
                HEADER_INSERT,
                vec![
                    Value::from(rec_id),
                    Value::from(order_number),
                    Value::from(customer.customer_name.as_str()),
                    Value::from(customer.customer_account.as_str()),
                    Value::from(customer.delivery_address.as_str()),
                    Value::from(customer.purch_order_ref.as_str()),
                    customer.requested_date.into(),
                    Value::from(customer.site.as_str()),
                    Value::from(customer.warehouse.as_str()),
                    Value::from(self.defaults.currency_code.as_str()),
                    Value::from(self.defaults.delivery_mode.as_str()),
                    Value::from(self.defaults.language_id.as_str()),
                    Value::from(self.defaults.sales_responsible.as_str()),
                    Value::from(self.defaults.data_area_id.as_str()),
                    Value::from(Utc::now()),
                ],
            )
            .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn insert_line(
        &self,
        rec_id: i64,
        order_number: &str,
        customer: &CustomerInfo,
        item: &LineItem,
        customer_group: &str,
        invent_trans_id: &str,
        dimension_id: &str,
    ) -> Result<u64, ServiceError> {
        self.gateway
            .execute(
                LINE_INSERT,
                vec![
                    Value::from(rec_id),
                    Value::from(order_number),
                    Value::from(item.item_number.as_str()),
                    Value::from(item.item_name.as_str()),
                    Value::from(item.quantity),
                    Value::from(item.unit.as_str()),
                    Value::from(item.packing_unit.clone()),
                    Value::from(item.packing_unit_qty),
                    Value::from(item.master_unit.clone()),
                    Value::from(item.master_unit_qty.clone()),
                    Value::from(invent_trans_id),
                    Value::from(dimension_id),
                    Value::from(customer.customer_account.as_str()),
                    Value::from(customer_group),
                    Value::from(item.site.as_str()),
                    Value::from(item.warehouse.as_str()),
                    Value::from(item.location.as_str()),
                    Value::from(self.defaults.data_area_id.as_str()),
                    Value::from(Utc::now()),
                ],
            )
            .await
    }

    async fn insert_transaction(
        &self,
        rec_id: i64,
        invent_trans_id: &str,
        customer: &CustomerInfo,
        item: &LineItem,
        dimension_id: &str,
    ) -> Result<u64, ServiceError> {
        self.gateway
            .execute(
                TRANS_INSERT,
                vec![
                    Value::from(rec_id),
                    Value::from(invent_trans_id),
                    Value::from(item.item_number.as_str()),
                    Value::from(customer.customer_account.as_str()),
                    Value::from(item.quantity),
                    Value::from(dimension_id),
                    Value::from(self.defaults.data_area_id.as_str()),
                    Value::from(Utc::now()),
                ],
            )
            .await
    }

    fn outcome(
        &self,
        line: usize,
        item: &LineItem,
        order_number: Option<String>,
        status: ItemStatus,
        error: ServiceError,
    ) -> ItemOutcome {
        ItemOutcome {
            line,
            item_number: item.item_number.clone(),
            order_number,
            status,
            detail: Some(error.to_string()),
        }
    }
}
