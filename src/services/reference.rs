use crate::db::Gateway;
use crate::errors::ServiceError;
use sea_orm::Value;
use tracing::{debug, instrument, warn};

const DIMENSION_SELECT: &str = "SELECT INVENTDIMID FROM INVENTDIM \
     WHERE DATAAREAID = ? AND INVENTSITEID = ? AND INVENTLOCATIONID = ? AND WMSLOCATIONID = ?";

const CUSTOMER_GROUP_SELECT: &str =
    "SELECT CUSTGROUP FROM CUSTTABLE WHERE DATAAREAID = ? AND ACCOUNTNUM = ?";

/// Read-only translation of business keys into the codes the writes need.
/// A miss (or a failed lookup) yields an empty code, never an error: the
/// pipeline writes the blank attribute and carries on.
#[derive(Clone)]
pub struct ReferenceResolver {
    gateway: Gateway,
    data_area: String,
}

impl ReferenceResolver {
    pub fn new(gateway: Gateway, data_area: impl Into<String>) -> Self {
        Self {
            gateway,
            data_area: data_area.into(),
        }
    }

    /// Inventory dimension id for a (site, warehouse, location) triple.
    /// First match wins when several rows qualify.
    #[instrument(skip(self))]
    pub async fn inventory_dimension(
        &self,
        site: &str,
        warehouse: &str,
        location: &str,
    ) -> String {
        let result = self
            .gateway
            .query_one(
                DIMENSION_SELECT,
                vec![
                    Value::from(self.data_area.as_str()),
                    Value::from(site),
                    Value::from(warehouse),
                    Value::from(location),
                ],
                |row| row.try_get::<String>("", "INVENTDIMID"),
            )
            .await;

        self.unwrap_or_empty(result, "inventory dimension")
    }

    /// Customer group classification for an account.
    #[instrument(skip(self))]
    pub async fn customer_group(&self, account: &str) -> String {
        let result = self
            .gateway
            .query_one(
                CUSTOMER_GROUP_SELECT,
                vec![
                    Value::from(self.data_area.as_str()),
                    Value::from(account),
                ],
                |row| row.try_get::<String>("", "CUSTGROUP"),
            )
            .await;

        self.unwrap_or_empty(result, "customer group")
    }

    fn unwrap_or_empty(&self, result: Result<Option<String>, ServiceError>, what: &str) -> String {
        match result {
            Ok(Some(code)) => code,
            Ok(None) => {
                debug!("{} lookup matched nothing; writing blank attribute", what);
                String::new()
            }
            Err(e) => {
                warn!("{} lookup failed, substituting blank attribute: {}", what, e);
                String::new()
            }
        }
    }
}
