use crate::error::Result;
use crate::models::Service;
use crate::repositories::Database;

/// Read access to the service catalogue.
#[derive(Debug, Clone)]
pub struct ServiceRepository {
    db: Database,
}

impl ServiceRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Finds a service by its ID.
    pub async fn find_by_id(&self, id: i32) -> Result<Option<Service>> {
        Ok(self.db.read().await.services.get(&id).cloned())
    }

    /// Lists all services ordered by ID.
    pub async fn list(&self) -> Result<Vec<Service>> {
        Ok(self.db.read().await.services.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_find_and_list() {
        let repo = ServiceRepository::new(Database::seeded());

        let service = repo.find_by_id(3).await.unwrap().unwrap();
        assert_eq!(service.name, "Gaming+ Catalogue");
        assert!(repo.find_by_id(99).await.unwrap().is_none());

        let ids: Vec<i32> = repo.list().await.unwrap().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }
}
