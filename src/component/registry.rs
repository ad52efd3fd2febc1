use super::{Component, ComponentInfo, ComponentKind};
use crate::context::AppContext;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use strum::IntoEnumIterator;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
struct Entry {
    component: Arc<dyn Component>,
    // Same allocation as `component`, kept for typed downcasts.
    instance: Arc<dyn Any + Send + Sync>,
}

/// A component registered under a key other than its own name
///
/// Reports the key as its name so that ordering, status output and errors
/// all agree with what [`ComponentRegistry::get`] accepts.
struct Aliased {
    name: String,
    inner: Arc<dyn Component>,
}

#[async_trait]
impl Component for Aliased {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ComponentKind {
        self.inner.kind()
    }

    async fn initialize(&self, ctx: &CancellationToken, app: &AppContext) -> anyhow::Result<()> {
        self.inner.initialize(ctx, app).await
    }

    async fn start(&self, ctx: &CancellationToken) -> anyhow::Result<()> {
        self.inner.start(ctx).await
    }

    async fn stop(&self, ctx: &CancellationToken) -> anyhow::Result<()> {
        self.inner.stop(ctx).await
    }
}

/// Components indexed by unique name and by kind
///
/// Kind buckets keep registration order, so [`startup_order`] is fully
/// determined by the kinds and the order of `register` calls.
///
/// [`startup_order`]: ComponentRegistry::startup_order
///
/// # Example
///
/// ```rust,ignore
/// let mut registry = ComponentRegistry::new();
/// registry.register(Arc::new(ConfigService::new()))?;
/// registry.register(Arc::new(MemoryCache::new("cache")))?;
///
/// let cache = registry.get_as::<MemoryCache>("cache").unwrap();
/// ```
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    by_name: HashMap<String, Entry>,
    by_kind: HashMap<ComponentKind, Vec<Arc<dyn Component>>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component under its own name.
    pub fn register<C: Component>(&mut self, component: Arc<C>) -> Result<()> {
        let name = component.name().to_string();
        self.register_named(name, component)
    }

    /// Register a component under an explicit name.
    ///
    /// Fails with [`AppError::DuplicateName`] without touching the registry
    /// if the name is taken. When `name` differs from the component's own
    /// name, lookups and lifecycle reporting use `name`; [`get_as`] still
    /// yields the original component.
    ///
    /// [`get_as`]: ComponentRegistry::get_as
    pub fn register_named<C: Component>(
        &mut self,
        name: impl Into<String>,
        component: Arc<C>,
    ) -> Result<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(AppError::InvalidName);
        }
        if self.by_name.contains_key(&name) {
            return Err(AppError::DuplicateName { name });
        }

        let kind = component.kind();
        let managed: Arc<dyn Component> = if component.name() == name {
            component.clone() as Arc<dyn Component>
        } else {
            Arc::new(Aliased {
                name: name.clone(),
                inner: component.clone(),
            })
        };
        let entry = Entry {
            component: managed,
            instance: component,
        };
        self.by_kind
            .entry(kind)
            .or_default()
            .push(Arc::clone(&entry.component));
        self.by_name.insert(name, entry);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Component>> {
        self.by_name.get(name).map(|e| Arc::clone(&e.component))
    }

    /// Look up a component by name and downcast it to its concrete type.
    pub fn get_as<T: Component>(&self, name: &str) -> Option<Arc<T>> {
        let entry = self.by_name.get(name)?;
        Arc::clone(&entry.instance).downcast::<T>().ok()
    }

    /// First registered component of `kind`
    pub fn get_by_kind(&self, kind: ComponentKind) -> Option<Arc<dyn Component>> {
        self.by_kind
            .get(&kind)
            .and_then(|bucket| bucket.first())
            .cloned()
    }

    /// Components of `kind` in registration order
    pub fn list_by_kind(&self, kind: ComponentKind) -> Vec<Arc<dyn Component>> {
        self.by_kind.get(&kind).cloned().unwrap_or_default()
    }

    /// Kind buckets in kind order; registration order within a kind.
    pub fn startup_order(&self) -> Vec<Arc<dyn Component>> {
        ComponentKind::iter()
            .filter_map(|kind| self.by_kind.get(&kind))
            .flat_map(|bucket| bucket.iter().cloned())
            .collect()
    }

    /// Exact reverse of [`startup_order`](Self::startup_order)
    pub fn shutdown_order(&self) -> Vec<Arc<dyn Component>> {
        let mut order = self.startup_order();
        order.reverse();
        order
    }

    /// Detached copy of the name index
    pub fn snapshot(&self) -> HashMap<String, Arc<dyn Component>> {
        self.by_name
            .iter()
            .map(|(name, entry)| (name.clone(), Arc::clone(&entry.component)))
            .collect()
    }

    /// Name and kind of every component, in startup order
    pub fn describe(&self) -> Vec<ComponentInfo> {
        self.startup_order()
            .iter()
            .map(|c| ComponentInfo {
                name: c.name().to_string(),
                kind: c.kind(),
            })
            .collect()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.by_name.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
