use std::sync::Arc;

use pushgate_config::Settings;
use pushgate_services::{
    auth::AuthService,
    gateway::{PushGateway, SubjectResolver},
    push::{DeliveryEngine, PushSender},
    store::SubscriptionStore,
};

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub auth: Arc<AuthService>,
    pub store: Arc<dyn SubscriptionStore>,
    pub gateway: Arc<PushGateway>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        store: Arc<dyn SubscriptionStore>,
        sender: Arc<dyn PushSender>,
        resolver: Arc<dyn SubjectResolver>,
    ) -> Self {
        let auth = Arc::new(AuthService::new(settings.auth.clone()));
        let engine = DeliveryEngine::new(store.clone(), sender, settings.delivery.clone());
        let gateway = Arc::new(PushGateway::new(store.clone(), engine, resolver));

        Self {
            settings,
            auth,
            store,
            gateway,
        }
    }
}
