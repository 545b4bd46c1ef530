//! Application state shared across commands.

use std::sync::Arc;

use crate::auth::AuthStore;
use crate::backend::BackendClient;
use crate::cart::CartStore;
use crate::config::StorefrontConfig;
use crate::error::AppError;
use crate::identity::IdentityClient;
use crate::services::CatalogService;
use crate::storage::{FileStorage, LocalStorage, StorageError};

/// Local storage shared by the cart and auth stores.
pub type SharedStorage = Arc<dyn LocalStorage>;

/// Application state.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// backend clients, the catalog cache and local storage.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    backend: BackendClient,
    identity: IdentityClient,
    catalog: CatalogService,
    storage: SharedStorage,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Create the state with file storage under `config.state_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, AppError> {
        let storage: SharedStorage = Arc::new(FileStorage::new(config.state_dir.clone()));
        Self::with_storage(config, storage)
    }

    /// Create the state with a caller-supplied storage (tests, embedding).
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn with_storage(config: StorefrontConfig, storage: SharedStorage) -> Result<Self, AppError> {
        let backend = BackendClient::new(&config.backend)?;
        let identity = IdentityClient::new(&config.backend)?;
        let catalog = CatalogService::new(backend.clone(), config.catalog_cache_ttl);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                identity,
                catalog,
                storage,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// The anonymous row API client.
    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    #[must_use]
    pub fn identity(&self) -> &IdentityClient {
        &self.inner.identity
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    /// Open the persisted cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the saved cart cannot be read.
    pub fn cart_store(&self) -> Result<CartStore<SharedStorage>, StorageError> {
        CartStore::load(Arc::clone(&self.inner.storage))
    }

    /// A signed-out auth store over the shared storage. Call
    /// [`AuthStore::load_user`] to restore the saved session.
    #[must_use]
    pub fn auth_store(&self) -> AuthStore<SharedStorage> {
        AuthStore::new(
            Arc::clone(&self.inner.storage),
            self.inner.identity.clone(),
            self.inner.backend.clone(),
        )
    }
}
