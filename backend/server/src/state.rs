use std::sync::Arc;

use tracing::{info, warn};

use super::{
    config::Config,
    crypto::FieldCipher,
    database::{Database, DatabaseError, init_redis},
};

pub struct State {
    pub config: Config,
    pub database: Database,
    pub cipher: FieldCipher,
}

impl State {
    pub async fn new(config: Config) -> Result<Arc<Self>, DatabaseError> {
        let database = match &config.redis_url {
            Some(redis_url) => {
                info!("Connecting to Redis...");
                Database::Redis(init_redis(redis_url).await?)
            }
            None => {
                warn!("REDIS_URL not set, keeping data in memory");
                Database::memory()
            }
        };

        database.init_creches().await?;

        Ok(Arc::new(Self {
            cipher: FieldCipher::new(&config.secret_key),
            config,
            database,
        }))
    }
}
