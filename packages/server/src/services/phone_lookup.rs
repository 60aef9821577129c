//! Carrier / region lookup for mobile numbers.
//!
//! Lookups go through an in-process LRU first, then the configured
//! providers in order. The database row written by the handler acts as the
//! second, persistent cache level.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::PhoneLookupConfig;
use crate::utils::phone::is_valid_mobile;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("invalid phone number: {0}")]
    InvalidNumber(String),
    #[error("lookup request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected lookup response: {0}")]
    InvalidResponse(String),
    #[error("no provider could resolve {0}")]
    Unresolved(String),
}

/// What a provider knows about a number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CarrierInfo {
    pub carrier: String,
    pub province: Option<String>,
    pub city: Option<String>,
    /// Name of the provider that produced this record.
    pub source: String,
}

#[async_trait]
pub trait PhoneLookupProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn lookup(&self, phone: &str) -> Result<CarrierInfo, LookupError>;
}

pub const CHINA_MOBILE: &str = "中国移动";
pub const CHINA_UNICOM: &str = "中国联通";
pub const CHINA_TELECOM: &str = "中国电信";
pub const CHINA_BROADNET: &str = "中国广电";
pub const VIRTUAL_OPERATOR: &str = "虚拟运营商";

/// Number-segment table. Only the carrier can be derived offline.
const SEGMENTS: &[(&str, &[&str])] = &[
    (
        CHINA_MOBILE,
        &[
            "134", "135", "136", "137", "138", "139", "147", "148", "150", "151", "152", "157",
            "158", "159", "172", "178", "182", "183", "184", "187", "188", "195", "197", "198",
        ],
    ),
    (
        CHINA_UNICOM,
        &[
            "130", "131", "132", "145", "146", "155", "156", "166", "171", "175", "176", "185",
            "186", "196",
        ],
    ),
    (
        CHINA_TELECOM,
        &[
            "133", "149", "153", "173", "174", "177", "180", "181", "189", "190", "191", "193",
            "199",
        ],
    ),
    (CHINA_BROADNET, &["192"]),
    (VIRTUAL_OPERATOR, &["162", "165", "167", "170"]),
];

/// Offline provider backed by the number-segment table.
pub struct PrefixLookupProvider;

impl PrefixLookupProvider {
    pub fn carrier_for(phone: &str) -> Option<&'static str> {
        let prefix = phone.get(..3)?;
        SEGMENTS
            .iter()
            .find(|(_, prefixes)| prefixes.contains(&prefix))
            .map(|(carrier, _)| *carrier)
    }
}

#[async_trait]
impl PhoneLookupProvider for PrefixLookupProvider {
    fn name(&self) -> &'static str {
        "prefix"
    }

    async fn lookup(&self, phone: &str) -> Result<CarrierInfo, LookupError> {
        let carrier =
            Self::carrier_for(phone).ok_or_else(|| LookupError::Unresolved(phone.to_string()))?;
        Ok(CarrierInfo {
            carrier: carrier.to_string(),
            province: None,
            city: None,
            source: self.name().to_string(),
        })
    }
}

#[derive(Deserialize)]
struct RemoteResponse {
    carrier: Option<String>,
    province: Option<String>,
    city: Option<String>,
}

/// Provider calling `GET {url}?phone=...`, expecting `{carrier, province, city}`.
pub struct HttpLookupProvider {
    client: reqwest::Client,
    url: String,
}

impl HttpLookupProvider {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, LookupError> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl PhoneLookupProvider for HttpLookupProvider {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn lookup(&self, phone: &str) -> Result<CarrierInfo, LookupError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("phone", phone)])
            .send()
            .await?
            .error_for_status()?;

        let body: RemoteResponse = response.json().await?;
        let carrier = body
            .carrier
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| LookupError::InvalidResponse("missing carrier".into()))?;

        Ok(CarrierInfo {
            carrier,
            province: body.province.filter(|p| !p.is_empty()),
            city: body.city.filter(|c| !c.is_empty()),
            source: self.name().to_string(),
        })
    }
}

/// What the in-process cache remembers about a number: provider data plus
/// the operator's note from the stored row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedNumber {
    pub info: CarrierInfo,
    pub note: Option<String>,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    number: CachedNumber,
    stored_at: DateTime<Utc>,
}

pub struct PhoneLookupService {
    providers: Vec<Arc<dyn PhoneLookupProvider>>,
    cache: Mutex<LruCache<String, CacheEntry>>,
    ttl: chrono::Duration,
}

impl PhoneLookupService {
    pub fn new(
        providers: Vec<Arc<dyn PhoneLookupProvider>>,
        capacity: usize,
        ttl: chrono::Duration,
    ) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            providers,
            cache: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Remote provider (when configured) followed by the prefix table.
    pub fn from_config(config: &PhoneLookupConfig) -> Result<Self, LookupError> {
        let mut providers: Vec<Arc<dyn PhoneLookupProvider>> = Vec::new();
        if let Some(url) = config.provider_url.as_deref().filter(|u| !u.trim().is_empty()) {
            providers.push(Arc::new(HttpLookupProvider::new(
                url,
                Duration::from_secs(config.timeout_secs),
            )?));
        }
        providers.push(Arc::new(PrefixLookupProvider));

        Ok(Self::new(
            providers,
            config.cache_capacity,
            chrono::Duration::days(config.cache_ttl_days),
        ))
    }

    /// Whether a record stored at `stored_at` is still fresh.
    pub fn is_fresh(&self, stored_at: DateTime<Utc>) -> bool {
        Utc::now() - stored_at < self.ttl
    }

    pub async fn cached(&self, phone: &str) -> Option<CachedNumber> {
        let mut cache = self.cache.lock().await;
        let hit = cache
            .get(phone)
            .map(|entry| (self.is_fresh(entry.stored_at), entry.number.clone()));
        match hit {
            Some((true, number)) => Some(number),
            Some((false, _)) => {
                cache.pop(phone);
                None
            }
            None => None,
        }
    }

    pub async fn remember(&self, phone: &str, number: CachedNumber, stored_at: DateTime<Utc>) {
        self.cache
            .lock()
            .await
            .put(phone.to_string(), CacheEntry { number, stored_at });
    }

    pub async fn invalidate(&self, phone: &str) {
        self.cache.lock().await.pop(phone);
    }

    /// Ask each provider in turn, returning the first answer.
    pub async fn resolve(&self, phone: &str) -> Result<CarrierInfo, LookupError> {
        if !is_valid_mobile(phone) {
            return Err(LookupError::InvalidNumber(phone.to_string()));
        }

        for provider in &self.providers {
            match provider.lookup(phone).await {
                Ok(info) => {
                    debug!(provider = provider.name(), "Resolved carrier");
                    return Ok(info);
                }
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "Carrier lookup failed");
                }
            }
        }

        Err(LookupError::Unresolved(phone.to_string()))
    }
}
