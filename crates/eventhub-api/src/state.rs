//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use eventhub_auth::jwt::{JwtDecoder, JwtEncoder};
use eventhub_auth::password::{PasswordHasher, PasswordValidator};
use eventhub_cache::CacheManager;
use eventhub_core::config::AppConfig;
use eventhub_database::StoreManager;
use eventhub_service::{EventCache, EventService, RegistrationService, UserService};

/// Shared application state, cloned into every handler.
///
/// All fields are cheap to clone (`Arc` or `Arc`-backed).
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Inventory and user stores.
    pub stores: StoreManager,
    /// Cache manager.
    pub cache: Arc<CacheManager>,
    /// JWT decoder used by the `AuthUser` extractor.
    pub jwt_decoder: Arc<JwtDecoder>,
    /// Event catalogue.
    pub event_service: Arc<EventService>,
    /// Seat reservations.
    pub registration_service: Arc<RegistrationService>,
    /// Accounts and login.
    pub user_service: Arc<UserService>,
}

impl AppState {
    /// Wire every service over already-initialised stores and cache.
    pub fn new(config: AppConfig, stores: StoreManager, cache: Arc<CacheManager>) -> Self {
        let event_cache = EventCache::new(Arc::clone(&cache), &config.cache);

        let event_service = Arc::new(EventService::new(stores.inventory(), event_cache.clone()));
        let registration_service = Arc::new(RegistrationService::new(
            stores.inventory(),
            stores.users(),
            event_cache,
        ));
        let user_service = Arc::new(UserService::new(
            stores.users(),
            Arc::new(PasswordHasher::new()),
            Arc::new(PasswordValidator::new(&config.auth)),
            Arc::new(JwtEncoder::new(&config.auth)),
        ));
        let jwt_decoder = Arc::new(JwtDecoder::new(&config.auth));

        Self {
            config: Arc::new(config),
            stores,
            cache,
            jwt_decoder,
            event_service,
            registration_service,
            user_service,
        }
    }
}
