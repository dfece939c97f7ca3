use crate::config::WriteDefaults;
use crate::db::Gateway;
use crate::errors::ServiceError;
use sea_orm::Value;
use serde::{Deserialize, Serialize};
use tracing::instrument;

const ITEMS_SELECT: &str = "SELECT ITEMID, ITEMNAME FROM INVENTTABLE \
     WHERE DATAAREAID = ? AND DIMENSION2_ = ? LIMIT 10";

const WAREHOUSES_SELECT: &str = "SELECT DISTINCT INVENTLOCATIONID FROM INVENTDIM \
     WHERE INVENTSITEID = ? AND INVENTLOCATIONID <> ' '";

const LOCATIONS_SELECT: &str = "SELECT DISTINCT WMSLOCATIONID FROM INVENTDIM \
     WHERE INVENTSITEID = ? AND INVENTLOCATIONID = ? AND LTRIM(RTRIM(WMSLOCATIONID)) <> ''";

const UNITS_SELECT: &str = "SELECT DISTINCT SALESUNIT FROM SALESLINE WHERE SALESUNIT <> ' '";

const MASTER_UNITS_SELECT: &str = "SELECT DISTINCT MASTERUNIT, MASTERUNITQTY FROM SALESLINE \
     WHERE ITEMID = ? AND MASTERUNIT <> ' '";

const CUSTOMER_SELECT: &str =
    "SELECT ACCOUNTNUM, ADDRESS FROM CUSTTABLE WHERE NAME = ? LIMIT 1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    pub item_number: String,
    pub item_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterUnitInfo {
    pub master_units: Vec<String>,
    pub master_qty: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub customer_account: String,
    pub delivery_address: String,
}

/// Read-only dropdown lookups feeding the order-entry front end. Simple
/// glue over the reference tables; none of the intake invariants live here.
#[derive(Clone)]
pub struct CatalogService {
    gateway: Gateway,
    defaults: WriteDefaults,
}

impl CatalogService {
    pub fn new(gateway: Gateway, defaults: WriteDefaults) -> Self {
        Self { gateway, defaults }
    }

    /// Top sellable items for the owning data area.
    #[instrument(skip(self))]
    pub async fn items(&self) -> Result<Vec<CatalogItem>, ServiceError> {
        self.gateway
            .query(
                ITEMS_SELECT,
                vec![
                    Value::from(self.defaults.data_area_id.as_str()),
                    Value::from(self.defaults.item_dimension_code.as_str()),
                ],
                |row| {
                    Ok(CatalogItem {
                        item_number: row.try_get::<String>("", "ITEMID")?,
                        item_name: row.try_get::<String>("", "ITEMNAME")?,
                    })
                },
            )
            .await
    }

    /// Selectable sites. Configured, not queried.
    pub fn sites(&self) -> Vec<String> {
        self.defaults.sites.clone()
    }

    #[instrument(skip(self))]
    pub async fn warehouses(&self, site: &str) -> Result<Vec<String>, ServiceError> {
        self.gateway
            .query(WAREHOUSES_SELECT, vec![Value::from(site)], |row| {
                row.try_get::<String>("", "INVENTLOCATIONID")
            })
            .await
    }

    #[instrument(skip(self))]
    pub async fn locations(
        &self,
        site: &str,
        warehouse: &str,
    ) -> Result<Vec<String>, ServiceError> {
        self.gateway
            .query(
                LOCATIONS_SELECT,
                vec![Value::from(site), Value::from(warehouse)],
                |row| row.try_get::<String>("", "WMSLOCATIONID"),
            )
            .await
    }

    #[instrument(skip(self))]
    pub async fn units(&self) -> Result<Vec<String>, ServiceError> {
        self.gateway
            .query(UNITS_SELECT, vec![], |row| {
                row.try_get::<String>("", "SALESUNIT")
            })
            .await
    }

    /// Master units for an item, plus the first non-empty conversion
    /// quantity seen.
    #[instrument(skip(self))]
    pub async fn master_units(&self, item_number: &str) -> Result<MasterUnitInfo, ServiceError> {
        let rows = self
            .gateway
            .query(
                MASTER_UNITS_SELECT,
                vec![Value::from(item_number)],
                |row| {
                    Ok((
                        row.try_get::<String>("", "MASTERUNIT")?,
                        row.try_get::<Option<String>>("", "MASTERUNITQTY")?,
                    ))
                },
            )
            .await?;

        let mut master_units = Vec::new();
        let mut master_qty = String::new();
        for (unit, qty) in rows {
            if !unit.is_empty() {
                master_units.push(unit);
            }
            if master_qty.is_empty() {
                if let Some(qty) = qty.filter(|q| !q.is_empty()) {
                    master_qty = qty;
                }
            }
        }

        Ok(MasterUnitInfo {
            master_units,
            master_qty,
        })
    }

    /// Account and delivery address for a customer, by exact name.
    #[instrument(skip(self))]
    pub async fn customer_by_name(
        &self,
        name: &str,
    ) -> Result<Option<CustomerRecord>, ServiceError> {
        self.gateway
            .query_one(CUSTOMER_SELECT, vec![Value::from(name)], |row| {
                Ok(CustomerRecord {
                    customer_account: row.try_get::<String>("", "ACCOUNTNUM")?,
                    delivery_address: row.try_get::<String>("", "ADDRESS")?,
                })
            })
            .await
    }
}
