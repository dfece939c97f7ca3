pub mod catalog;
pub mod orders;
pub mod rec_ids;
pub mod reference;
pub mod sequences;

use crate::config::AppConfig;
use crate::db::Gateway;
use std::sync::Arc;

/// Services shared by the HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub intake: Arc<orders::OrderIntakeService>,
    pub catalog: Arc<catalog::CatalogService>,
}

impl AppServices {
    pub fn new(gateway: Gateway, config: &AppConfig) -> Self {
        Self {
            intake: Arc::new(orders::OrderIntakeService::new(
                gateway.clone(),
                config.intake.clone(),
                config.write_defaults.clone(),
            )),
            catalog: Arc::new(catalog::CatalogService::new(
                gateway,
                config.write_defaults.clone(),
            )),
        }
    }
}
