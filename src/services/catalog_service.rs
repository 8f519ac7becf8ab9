use crate::error::{AppError, Result};
use crate::models::Service;
use crate::repositories::{DbPool, ServiceRepository};

/// Read-only access to the service catalogue.
#[derive(Debug, Clone)]
pub struct CatalogService {
    service_repo: ServiceRepository,
}

impl CatalogService {
    pub fn new(pool: DbPool) -> Self {
        Self {
            service_repo: ServiceRepository::new(pool),
        }
    }

    pub async fn list_services(&self) -> Result<Vec<Service>> {
        self.service_repo.list().await
    }

    /// Finds a service, failing with `ServiceNotFound` if absent.
    pub async fn get_service(&self, id: i32) -> Result<Service> {
        self.service_repo
            .find_by_id(id)
            .await?
            .ok_or(AppError::ServiceNotFound(id))
    }
}
