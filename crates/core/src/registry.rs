//! Project-scoped component directory.
//!
//! The `Registry` hands out one instance of each component kind per project,
//! creating it on first access. Everything handed out is an `Arc`, so callers
//! on any thread share the same instance until the project is cleared.
//!
//! Use [`Registry::global`] for the process-wide directory, or build an
//! isolated one with [`Registry::new`] for injection and tests.

use crate::audit::{AuditSink, MemoryAuditLog};
use crate::event_bus::EventBus;
use crate::feedback::FeedbackManager;
use crate::realtime::{Hub, StatusBroadcaster};
use crate::state::PipelineController;
use sl_protocol::config_models::Settings;
use std::any::{Any, TypeId};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use tracing::debug;

static GLOBAL: OnceLock<Registry> = OnceLock::new();

type Slot = (TypeId, String);

pub struct Registry {
    settings: Settings,
    hub: Arc<Hub>,
    components: Mutex<HashMap<Slot, Arc<dyn Any + Send + Sync>>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl Registry {
    pub fn new(settings: Settings) -> Self {
        Self {
            hub: Arc::new(Hub::new(settings.realtime.channel_capacity)),
            settings,
            components: Mutex::new(HashMap::new()),
        }
    }

    /// The process-wide registry, created with default settings on first use.
    pub fn global() -> &'static Registry {
        GLOBAL.get_or_init(Registry::default)
    }

    /// Install the process-wide registry with `settings`.
    ///
    /// # Returns
    ///
    /// `false` when the global registry already exists; it is left as is.
    pub fn init_global(settings: Settings) -> bool {
        GLOBAL.set(Registry::new(settings)).is_ok()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Notification hub every controller from this registry broadcasts to.
    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// The instance of `T` for `project`, created by `factory` on first access.
    ///
    /// `factory` runs under the registry lock and must not call back into
    /// the registry.
    pub fn get_or_insert_with<T, F>(&self, project: &str, factory: F) -> Arc<T>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        let mut components = self.components();
        let slot = (TypeId::of::<T>(), project.to_string());

        if let Some(existing) = components.get(&slot) {
            if let Ok(component) = Arc::clone(existing).downcast::<T>() {
                return component;
            }
        }

        debug!(project, component = std::any::type_name::<T>(), "Creating component");
        let component = Arc::new(factory());
        components.insert(slot, component.clone() as Arc<dyn Any + Send + Sync>);
        component
    }

    /// The instance of `T` for `project`, if one has been created.
    pub fn get<T: Any + Send + Sync>(&self, project: &str) -> Option<Arc<T>> {
        let slot = (TypeId::of::<T>(), project.to_string());
        self.components()
            .get(&slot)
            .and_then(|c| Arc::clone(c).downcast::<T>().ok())
    }

    pub fn get_event_bus(&self, project: &str) -> Arc<EventBus> {
        let capacity = self.settings.event_bus.capacity;
        self.get_or_insert_with(project, || EventBus::with_capacity(project, capacity))
    }

    /// The project's controller, publishing to the project bus and the hub.
    pub fn get_pipeline_controller(&self, project: &str) -> Arc<PipelineController> {
        if let Some(controller) = self.get::<PipelineController>(project) {
            return controller;
        }
        let event_bus = self.get_event_bus(project);
        let hub: Arc<dyn StatusBroadcaster> = self.hub.clone();
        self.get_or_insert_with(project, move || {
            PipelineController::with_event_bus(project, event_bus).with_broadcaster(hub)
        })
    }

    /// The feedback manager owned by the project's controller.
    pub fn get_feedback_manager(&self, project: &str) -> Arc<FeedbackManager> {
        Arc::clone(self.get_pipeline_controller(project).feedback_manager())
    }

    pub fn get_audit_log(&self, project: &str) -> Arc<dyn AuditSink> {
        self.get_or_insert_with(project, || MemoryAuditLog::new(project))
    }

    /// Every project with at least one live component, sorted.
    pub fn projects(&self) -> Vec<String> {
        let names: BTreeSet<String> = self
            .components()
            .keys()
            .map(|(_, project)| project.clone())
            .collect();
        names.into_iter().collect()
    }

    /// Drop every component of `project`. Holders of the old `Arc`s keep
    /// them; the next access creates fresh instances.
    pub fn clear_project(&self, project: &str) {
        self.components().retain(|(_, name), _| name != project);
        self.hub.remove_project(project);
        debug!(project, "Cleared project components");
    }

    pub fn clear_all(&self) {
        self.components().clear();
        self.hub.clear();
    }

    fn components(&self) -> MutexGuard<'_, HashMap<Slot, Arc<dyn Any + Send + Sync>>> {
        self.components
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::FeedbackRequest;
    use crate::state::pipeline_fn;
    use serde_json::Value;
    use sl_protocol::ipc::Notification;
    use std::time::Duration;

    #[test]
    fn test_same_instance_per_project() {
        let registry = Registry::default();
        let a = registry.get_event_bus("noir");
        let b = registry.get_event_bus("noir");
        let other = registry.get_event_bus("epic");

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &other));
        assert_eq!(a.capacity(), 100);
    }

    #[test]
    fn test_settings_applied() {
        let mut settings = Settings::default();
        settings.event_bus.capacity = 7;
        let registry = Registry::new(settings);
        assert_eq!(registry.get_event_bus("noir").capacity(), 7);
    }

    #[test]
    fn test_feedback_manager_is_the_controllers() {
        let registry = Registry::default();
        let controller = registry.get_pipeline_controller("noir");
        let manager = registry.get_feedback_manager("noir");
        assert!(Arc::ptr_eq(controller.feedback_manager(), &manager));

        controller.inject_feedback(FeedbackRequest::new("editor", "tighten"));
        assert_eq!(manager.get_stats().total, 1);
    }

    #[test]
    fn test_controller_uses_project_bus() {
        let registry = Registry::default();
        let controller = registry.get_pipeline_controller("noir");
        assert!(Arc::ptr_eq(controller.event_bus(), &registry.get_event_bus("noir")));
    }

    #[test]
    fn test_controller_broadcasts_to_hub() {
        let registry = Registry::default();
        let mut subscription = registry.hub().subscribe("noir");
        let controller = registry.get_pipeline_controller("noir");

        controller
            .start_pipeline(pipeline_fn(|_ctx| async { Ok(Value::Null) }), "noop", 1)
            .unwrap();
        controller.wait_until_finished(Duration::from_secs(5));

        let mut statuses = Vec::new();
        while let Some(notification) = subscription.try_recv() {
            if let Notification::PipelineStatus { snapshot, .. } = notification {
                statuses.push(snapshot.status);
            }
        }
        assert_eq!(
            statuses.last().copied(),
            Some(sl_protocol::process_models::PipelineStatus::Completed)
        );
    }

    #[test]
    fn test_clear_project_creates_fresh_instances() {
        let registry = Registry::default();
        let before = registry.get_event_bus("noir");
        registry.get_audit_log("noir");
        registry.get_event_bus("epic");

        registry.clear_project("noir");
        assert_eq!(registry.projects(), vec!["epic"]);

        let after = registry.get_event_bus("noir");
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(registry.projects(), vec!["epic", "noir"]);
    }

    #[test]
    fn test_clear_all() {
        let registry = Registry::default();
        registry.get_event_bus("noir");
        registry.get_pipeline_controller("epic");
        registry.clear_all();
        assert!(registry.projects().is_empty());
    }

    #[test]
    fn test_custom_component() {
        struct GraphStore {
            nodes: usize,
        }

        let registry = Registry::default();
        let store = registry.get_or_insert_with("noir", || GraphStore { nodes: 3 });
        let again = registry.get_or_insert_with("noir", || GraphStore { nodes: 99 });
        assert_eq!(again.nodes, 3);
        assert!(Arc::ptr_eq(&store, &again));
        assert!(registry.get::<GraphStore>("epic").is_none());
    }

    #[test]
    fn test_global_is_shared() {
        let a = Registry::global() as *const Registry;
        let b = Registry::global() as *const Registry;
        assert_eq!(a, b);
    }
}
