use std::sync::Arc;

use axum::Router;
use tracing::info;

use crate::config::AppointmentsConfig;
use crate::contract::client::AppointmentsApi;
use crate::domain::repo::AppointmentsRepository;
use crate::domain::service::Service;
use crate::gateways::local::AppointmentsLocalClient;
use crate::infra::storage::{
    InMemoryAppointmentsRepository, SqliteAppointmentsRepository, SqliteOptions,
};

/// Where the appointments collection lives.
#[derive(Debug, Clone)]
pub enum StorageBackend {
    /// Process-local, lost on exit.
    Memory,
    Sqlite { dsn: String, options: SqliteOptions },
}

impl StorageBackend {
    /// Pick a backend from a database URL: `memory://` or any `sqlite:` DSN.
    pub fn from_url(url: &str, options: SqliteOptions) -> anyhow::Result<Self> {
        if url == "memory://" || url == "memory" {
            Ok(Self::Memory)
        } else if url.starts_with("sqlite:") {
            Ok(Self::Sqlite {
                dsn: url.to_string(),
                options,
            })
        } else {
            anyhow::bail!("unsupported database url '{url}': expected memory:// or sqlite:...")
        }
    }
}

/// The appointments module: owns the executor and exposes its REST routes
/// and typed client.
#[derive(Clone)]
pub struct Appointments {
    service: Arc<Service>,
}

impl Appointments {
    pub fn new(repo: Arc<dyn AppointmentsRepository>) -> Self {
        Self {
            service: Arc::new(Service::new(repo)),
        }
    }

    /// Open the configured backend and build the module over it.
    pub async fn init(config: &AppointmentsConfig, backend: StorageBackend) -> anyhow::Result<Self> {
        let repo: Arc<dyn AppointmentsRepository> = match backend {
            StorageBackend::Memory => {
                info!(collection = %config.collection, "Using in-memory appointment store");
                Arc::new(InMemoryAppointmentsRepository::new())
            }
            StorageBackend::Sqlite { dsn, options } => Arc::new(
                SqliteAppointmentsRepository::connect(&dsn, &config.collection, options).await?,
            ),
        };
        Ok(Self::new(repo))
    }

    pub fn service(&self) -> Arc<Service> {
        self.service.clone()
    }

    pub fn client(&self) -> Arc<dyn AppointmentsApi> {
        Arc::new(AppointmentsLocalClient::new(self.service.clone()))
    }

    pub fn register_rest(&self, router: Router) -> Router {
        crate::api::rest::routes::register_routes(router, self.service.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_is_chosen_by_url_scheme() {
        assert!(matches!(
            StorageBackend::from_url("memory://", SqliteOptions::default()),
            Ok(StorageBackend::Memory)
        ));
        assert!(matches!(
            StorageBackend::from_url("sqlite://database/appointments.db", SqliteOptions::default()),
            Ok(StorageBackend::Sqlite { .. })
        ));
        assert!(StorageBackend::from_url("mongodb://localhost", SqliteOptions::default()).is_err());
    }

    #[tokio::test]
    async fn init_rejects_invalid_collection_for_sqlite() {
        let cfg = AppointmentsConfig {
            collection: "bad name".into(),
        };
        let backend = StorageBackend::Sqlite {
            dsn: "sqlite::memory:".into(),
            options: SqliteOptions::default(),
        };
        assert!(Appointments::init(&cfg, backend).await.is_err());
    }
}
