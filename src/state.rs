use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::database::DocumentStore;
use crate::gateway::{HttpGateway, MessagingGateway};
use crate::meta::{AdsPlatform, AdsSyncService, HttpAdsPlatform, SyncSettings, TokenRefresher};
use crate::notify::{
    HttpPushDispatcher, HttpQueuePublisher, LogQueuePublisher, PushDispatcher, QueuePublisher,
};
use crate::services::{CompanyService, LeadService, NotificationService, SessionService, WhatsAppService};

/// Shared handles every handler and job works from
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DocumentStore>,
    pub platform: Arc<dyn AdsPlatform>,
    pub gateway: Arc<dyn MessagingGateway>,
    pub queue: Arc<dyn QueuePublisher>,
    pub push: Arc<dyn PushDispatcher>,
}

impl AppState {
    /// Wire the HTTP-backed collaborators from configuration.
    pub fn from_config(config: AppConfig, store: Arc<dyn DocumentStore>) -> anyhow::Result<Self> {
        let platform = HttpAdsPlatform::new(&config.meta)?;
        let gateway = HttpGateway::new(&config.gateway)?;
        let timeout = Duration::from_secs(config.gateway.request_timeout_secs);

        let queue: Arc<dyn QueuePublisher> = match config.notifications.queue_url.as_deref() {
            Some(url) => Arc::new(HttpQueuePublisher::new(url, timeout)?),
            None => Arc::new(LogQueuePublisher),
        };
        let push = HttpPushDispatcher::new(config.notifications.push_url.clone(), timeout)?;

        Ok(Self {
            config: Arc::new(config),
            store,
            platform: Arc::new(platform),
            gateway: Arc::new(gateway),
            queue,
            push: Arc::new(push),
        })
    }

    pub fn companies(&self) -> CompanyService {
        CompanyService::new(self.store.clone())
    }

    pub fn leads(&self) -> LeadService {
        LeadService::new(self.store.clone(), self.queue.clone())
    }

    pub fn whatsapp(&self) -> WhatsAppService {
        WhatsAppService::new(self.store.clone(), self.gateway.clone(), self.queue.clone())
    }

    pub fn notifications(&self) -> NotificationService {
        NotificationService::new(self.store.clone(), self.push.clone())
    }

    pub fn sessions(&self) -> SessionService {
        SessionService::new(self.store.clone(), self.config.sessions.idle_ttl_secs)
    }

    pub fn ads_sync(&self) -> AdsSyncService {
        AdsSyncService::new(
            self.store.clone(),
            self.platform.clone(),
            SyncSettings::from(&self.config.meta),
        )
    }

    pub fn token_refresher(&self) -> TokenRefresher {
        TokenRefresher::new(
            self.store.clone(),
            self.platform.clone(),
            self.config.meta.refresh_threshold_secs,
        )
    }
}
