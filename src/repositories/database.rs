use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::models::{Service, Subscription};

/// Rows held by the in-memory store.
#[derive(Debug, Default)]
pub struct Tables {
    pub services: BTreeMap<i32, Service>,
    pub subscriptions: Vec<Subscription>,
    next_subscription_id: i32,
}

impl Tables {
    pub fn next_subscription_id(&mut self) -> i32 {
        self.next_subscription_id += 1;
        self.next_subscription_id
    }
}

/// In-memory database shared by all repositories.
///
/// Cloning yields another handle to the same tables. Writers hold the lock
/// for the whole check-and-modify sequence.
#[derive(Debug, Clone, Default)]
pub struct Database {
    tables: Arc<RwLock<Tables>>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    /// A database pre-populated with the service catalogue.
    pub fn seeded() -> Self {
        Self::with_services(Service::seed_catalogue())
    }

    pub fn with_services(services: impl IntoIterator<Item = Service>) -> Self {
        let tables = Tables {
            services: services.into_iter().map(|s| (s.id, s)).collect(),
            ..Tables::default()
        };
        Self {
            tables: Arc::new(RwLock::new(tables)),
        }
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().await
    }
}
