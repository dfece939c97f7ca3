use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, Response},
    routing::get,
    Router,
};
use sea_orm::{ConnectionTrait, DatabaseBackend, Statement};
use serde_json::Value;
use tower::ServiceExt;

use salesdesk_api::{config::AppConfig, db, AppState};

/// Harness for spinning up application state over an in-memory SQLite
/// database. The production schema is pre-existing and externally owned;
/// the tests own a copy of it.
///
/// SALESTABLE carries a CHECK constraint rejecting the `CUST-REJECT`
/// account so header-insert failure paths can be exercised.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

const SCHEMA: &[&str] = &[
    "CREATE TABLE NUMBERSEQUENCETABLE (
         DATAAREAID TEXT NOT NULL,
         SEQUENCENAME TEXT NOT NULL,
         NEXTVAL TEXT NOT NULL
     )",
    "CREATE TABLE SALESTABLE (
         RECID INTEGER NOT NULL,
         SALESID TEXT,
         SALESNAME TEXT,
         CUSTACCOUNT TEXT CHECK (CUSTACCOUNT <> 'CUST-REJECT'),
         DELIVERYADDRESS TEXT,
         PURCHORDERFORMNUM TEXT,
         RECEIPTDATEREQUESTED TEXT,
         INVENTSITEID TEXT,
         INVENTLOCATIONID TEXT,
         CURRENCYCODE TEXT,
         DLVMODE TEXT,
         LANGUAGEID TEXT,
         SALESRESPONSIBLE TEXT,
         DATAAREAID TEXT,
         CREATEDDATETIME TEXT
     )",
    "CREATE TABLE SALESLINE (
         RECID INTEGER NOT NULL,
         SALESID TEXT,
         ITEMID TEXT,
         NAME TEXT,
         SALESQTY REAL,
         SALESUNIT TEXT,
         PACKINGUNIT TEXT,
         PACKINGUNITQTY REAL,
         MASTERUNIT TEXT,
         MASTERUNITQTY TEXT,
         INVENTTRANSID TEXT,
         INVENTDIMID TEXT,
         CUSTACCOUNT TEXT,
         CUSTGROUP TEXT,
         INVENTSITEID TEXT,
         INVENTLOCATIONID TEXT,
         WMSLOCATIONID TEXT,
         DATAAREAID TEXT,
         CREATEDDATETIME TEXT
     )",
    "CREATE TABLE INVENTTRANS (
         RECID INTEGER NOT NULL,
         INVENTTRANSID TEXT,
         ITEMID TEXT,
         CUSTVENDAC TEXT,
         QTY REAL,
         INVENTDIMID TEXT,
         DATAAREAID TEXT,
         DATEPHYSICAL TEXT
     )",
    "CREATE TABLE INVENTDIM (
         INVENTDIMID TEXT NOT NULL,
         INVENTSITEID TEXT,
         INVENTLOCATIONID TEXT,
         WMSLOCATIONID TEXT,
         DATAAREAID TEXT
     )",
    "CREATE TABLE CUSTTABLE (
         ACCOUNTNUM TEXT NOT NULL,
         NAME TEXT,
         ADDRESS TEXT,
         CUSTGROUP TEXT,
         DATAAREAID TEXT
     )",
    "CREATE TABLE INVENTTABLE (
         ITEMID TEXT NOT NULL,
         ITEMNAME TEXT,
         DIMENSION2_ TEXT,
         DATAAREAID TEXT
     )",
];

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Construct a test application, letting the caller adjust the config
    /// before the services are built.
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            0,
            "test".to_string(),
        );
        // One connection keeps the in-memory database alive and shared.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        adjust(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");

        for ddl in SCHEMA {
            pool.execute(Statement::from_string(
                DatabaseBackend::Sqlite,
                ddl.to_string(),
            ))
            .await
            .expect("failed to create test schema");
        }

        let state = AppState::new(Arc::new(pool), cfg);
        let router = Router::new()
            .route("/health", get(salesdesk_api::health_check))
            .nest("/api/v1", salesdesk_api::api_v1_routes())
            .with_state(state.clone());

        Self { router, state }
    }

    pub async fn exec(&self, sql: &str) {
        self.state
            .db
            .execute(Statement::from_string(
                DatabaseBackend::Sqlite,
                sql.to_string(),
            ))
            .await
            .expect("statement failed");
    }

    /// Seeds a named counter for the owning data area.
    pub async fn seed_sequence(&self, name: &str, value: &str) {
        self.exec(&format!(
            "INSERT INTO NUMBERSEQUENCETABLE (DATAAREAID, SEQUENCENAME, NEXTVAL) \
             VALUES ('mrp', '{}', '{}')",
            name, value
        ))
        .await;
    }

    pub async fn seed_dimension(&self, dim_id: &str, site: &str, warehouse: &str, location: &str) {
        self.exec(&format!(
            "INSERT INTO INVENTDIM (INVENTDIMID, INVENTSITEID, INVENTLOCATIONID, WMSLOCATIONID, DATAAREAID) \
             VALUES ('{}', '{}', '{}', '{}', 'mrp')",
            dim_id, site, warehouse, location
        ))
        .await;
    }

    pub async fn seed_customer(&self, account: &str, name: &str, address: &str, group: &str) {
        self.exec(&format!(
            "INSERT INTO CUSTTABLE (ACCOUNTNUM, NAME, ADDRESS, CUSTGROUP, DATAAREAID) \
             VALUES ('{}', '{}', '{}', '{}', 'mrp')",
            account, name, address, group
        ))
        .await;
    }

    pub async fn count(&self, table: &str) -> i64 {
        self.scalar_i64(&format!("SELECT COUNT(*) AS V FROM {}", table))
            .await
            .expect("count query returned no row")
    }

    pub async fn scalar_i64(&self, sql: &str) -> Option<i64> {
        self.state
            .db
            .query_one(Statement::from_string(
                DatabaseBackend::Sqlite,
                sql.to_string(),
            ))
            .await
            .expect("query failed")
            .map(|row| row.try_get::<i64>("", "V").expect("not an integer"))
    }

    pub async fn scalar_text(&self, sql: &str) -> Option<String> {
        self.state
            .db
            .query_one(Statement::from_string(
                DatabaseBackend::Sqlite,
                sql.to_string(),
            ))
            .await
            .expect("query failed")
            .map(|row| row.try_get::<String>("", "V").expect("not text"))
    }

    pub async fn sequence_value(&self, name: &str) -> Option<String> {
        self.scalar_text(&format!(
            "SELECT NEXTVAL AS V FROM NUMBERSEQUENCETABLE \
             WHERE DATAAREAID = 'mrp' AND SEQUENCENAME = '{}'",
            name
        ))
        .await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> Response<Body> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("failed to build request");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("request failed")
    }

    pub async fn post_empty(&self, uri: &str) -> Response<Body> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::empty())
            .expect("failed to build request");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("request failed")
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .expect("failed to build request");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("request failed")
    }
}

/// Reads a response body into JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("parse response body")
}
