use std::{env, thread::available_parallelism};

use sha2::{Digest, Sha256};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::api::ApiClient;

pub const SEPARATOR: &str = "|";

/// SHA-256 over `|`-joined device properties, lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFingerprint(String);

impl DeviceFingerprint {
    pub fn from_properties<I, S>(properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut hasher = Sha256::new();

        for (index, property) in properties.into_iter().enumerate() {
            if index > 0 {
                hasher.update(SEPARATOR.as_bytes());
            }
            hasher.update(property.as_ref().as_bytes());
        }

        Self(hex::encode(hasher.finalize()))
    }

    /// Properties this process can see: user agent, platform, locale, timezone, cores.
    pub fn local(user_agent: &str) -> Self {
        let cores = available_parallelism()
            .map(|cores| cores.get().to_string())
            .unwrap_or_default();

        Self::from_properties([
            user_agent.to_string(),
            env::consts::OS.to_string(),
            env::consts::ARCH.to_string(),
            env::var("LANG").unwrap_or_default(),
            env::var("TZ").unwrap_or_default(),
            cores,
        ])
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Posts the fingerprint without waiting, failures are only logged.
    pub fn send_in_background(&self, api: &ApiClient) -> JoinHandle<()> {
        let api = api.clone();
        let fingerprint = self.0.clone();

        tokio::spawn(async move {
            if let Err(e) = api.dispositivo(&fingerprint).await {
                debug!("Fingerprint not recorded: {e}");
            }
        })
    }
}
