//! Application Context
//!
//! A read-only view of the application handed to components during
//! Initialize. Components use it to find their peers; they cannot register
//! components or drive lifecycle transitions through it.

use crate::component::{Component, ComponentInfo, ComponentKind, ComponentRegistry};
use crate::lifecycle::{AppState, StateObserver};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::{Arc, Weak};
use uuid::Uuid;

/// State shared between an application and the contexts it hands out
pub(crate) struct AppShared {
    pub(crate) name: String,
    pub(crate) version: String,
    pub(crate) instance_id: Uuid,
    pub(crate) registry: RwLock<ComponentRegistry>,
    pub(crate) observer: Arc<StateObserver>,
    pub(crate) started_at: Mutex<Option<DateTime<Utc>>>,
}

impl AppShared {
    pub(crate) fn new(name: String, version: String) -> Self {
        Self {
            observer: Arc::new(StateObserver::new(name.clone())),
            name,
            version,
            instance_id: Uuid::new_v4(),
            registry: RwLock::new(ComponentRegistry::new()),
            started_at: Mutex::new(None),
        }
    }

    pub(crate) fn status(&self) -> AppStatus {
        AppStatus {
            id: self.instance_id,
            name: self.name.clone(),
            version: self.version.clone(),
            state: self.observer.state(),
            started_at: *self.started_at.lock(),
            components: self.registry.read().describe(),
        }
    }
}

/// Point-in-time status of an application
#[derive(Debug, Clone, Serialize)]
pub struct AppStatus {
    pub id: Uuid,
    pub name: String,
    pub version: String,
    pub state: AppState,
    pub started_at: Option<DateTime<Utc>>,
    pub components: Vec<ComponentInfo>,
}

/// Read-only facade over an application's registry and state
///
/// Holds the application weakly, so a component may keep its context
/// without keeping the application alive. Once the application is dropped
/// lookups come back empty and [`status`](Self::status) returns `None`.
#[derive(Clone)]
pub struct AppContext {
    name: Arc<str>,
    version: Arc<str>,
    instance_id: Uuid,
    observer: Arc<StateObserver>,
    shared: Weak<AppShared>,
}

impl AppContext {
    pub(crate) fn new(shared: &Arc<AppShared>) -> Self {
        Self {
            name: Arc::from(shared.name.as_str()),
            version: Arc::from(shared.version.as_str()),
            instance_id: shared.instance_id,
            observer: Arc::clone(&shared.observer),
            shared: Arc::downgrade(shared),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Unique id of this application instance
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Component>> {
        self.shared.upgrade()?.registry.read().get(name)
    }

    /// Look up a peer by name and downcast it to its concrete type.
    pub fn get_as<T: Component>(&self, name: &str) -> Option<Arc<T>> {
        self.shared.upgrade()?.registry.read().get_as::<T>(name)
    }

    pub fn get_by_kind(&self, kind: ComponentKind) -> Option<Arc<dyn Component>> {
        self.shared.upgrade()?.registry.read().get_by_kind(kind)
    }

    pub fn list_by_kind(&self, kind: ComponentKind) -> Vec<Arc<dyn Component>> {
        self.shared
            .upgrade()
            .map(|shared| shared.registry.read().list_by_kind(kind))
            .unwrap_or_default()
    }

    pub fn state(&self) -> AppState {
        self.observer.state()
    }

    /// Status snapshot; `None` once the application has been dropped.
    pub fn status(&self) -> Option<AppStatus> {
        self.shared.upgrade().map(|shared| shared.status())
    }

    /// Subscribe to application state transitions.
    pub fn register_listener<F>(&self, listener: F)
    where
        F: Fn(&str, AppState, AppState) + Send + Sync + 'static,
    {
        self.observer.register_listener(listener);
    }
}
