use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::services::phone_lookup::PhoneLookupService;
use crate::services::sms::SmsGateway;
use crate::services::verification::VerificationStore;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub verification: Arc<VerificationStore>,
    pub sms: Arc<SmsGateway>,
    pub phone_lookup: Arc<PhoneLookupService>,
}

impl AppState {
    /// Build the shared services described by `config` around an open connection.
    pub fn new(db: DatabaseConnection, config: AppConfig) -> anyhow::Result<Self> {
        let verification = Arc::new(VerificationStore::new(&config.verification));
        let sms = Arc::new(SmsGateway::new(&config.sms)?);
        let phone_lookup = Arc::new(PhoneLookupService::from_config(&config.phone_lookup)?);

        Ok(Self {
            db,
            config,
            verification,
            sms,
            phone_lookup,
        })
    }
}
