// Feature modules: descriptors with explicit lifecycle hooks held in one registry

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

pub mod healthcare;
pub mod todos;

/// Lifecycle hook. Hooks are plain functions so a module is data, not a type.
pub type ModuleHook = fn() -> anyhow::Result<()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    Members,
    Providers,
    PortalDetection,
    Todos,
    Dashboard,
}

#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub version: &'static str,
    pub capabilities: &'static [Capability],
    pub enabled: bool,
    pub init: Option<ModuleHook>,
    pub teardown: Option<ModuleHook>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "state", content = "reason")]
pub enum ModuleStatus {
    Registered,
    Active,
    Failed(String),
    Stopped,
}

#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("Module already registered: {0}")]
    Duplicate(&'static str),

    #[error("Module not found: {0}")]
    NotFound(String),
}

/// What `GET /api/modules` reports per module
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub version: &'static str,
    pub capabilities: &'static [Capability],
    pub enabled: bool,
    pub status: ModuleStatus,
}

struct ModuleEntry {
    descriptor: ModuleDescriptor,
    status: ModuleStatus,
}

impl ModuleEntry {
    fn info(&self) -> ModuleInfo {
        let d = &self.descriptor;
        ModuleInfo {
            id: d.id,
            name: d.name,
            description: d.description,
            version: d.version,
            capabilities: d.capabilities,
            enabled: d.enabled,
            status: self.status.clone(),
        }
    }

    fn start(&mut self) {
        if !self.descriptor.enabled || self.status == ModuleStatus::Active {
            return;
        }
        self.status = match self.descriptor.init.map(|init| init()).unwrap_or(Ok(())) {
            Ok(()) => {
                info!("Module {} initialized", self.descriptor.id);
                ModuleStatus::Active
            }
            Err(err) => {
                error!("Module {} failed to initialize: {}", self.descriptor.id, err);
                ModuleStatus::Failed(err.to_string())
            }
        };
    }

    fn stop(&mut self) {
        if self.status != ModuleStatus::Active {
            return;
        }
        if let Some(Err(err)) = self.descriptor.teardown.map(|teardown| teardown()) {
            error!("Module {} teardown failed: {}", self.descriptor.id, err);
        }
        info!("Module {} stopped", self.descriptor.id);
        self.status = ModuleStatus::Stopped;
    }
}

/// Registry keyed by module id. The server builds one at startup and shares
/// it through the application state.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: RwLock<BTreeMap<&'static str, ModuleEntry>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the modules that ship with the server
    pub fn with_builtins() -> Self {
        Self::from_descriptors([healthcare::descriptor(), todos::descriptor()])
    }

    /// Registers each descriptor in order. A repeated id is logged and the
    /// first registration kept.
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = ModuleDescriptor>) -> Self {
        let registry = Self::new();
        for descriptor in descriptors {
            if let Err(err) = registry.register(descriptor) {
                error!("Skipping module registration: {}", err);
            }
        }
        registry
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<&'static str, ModuleEntry>> {
        self.modules.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<&'static str, ModuleEntry>> {
        self.modules.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn register(&self, descriptor: ModuleDescriptor) -> Result<(), ModuleError> {
        let mut modules = self.write();
        if modules.contains_key(descriptor.id) {
            return Err(ModuleError::Duplicate(descriptor.id));
        }
        modules.insert(
            descriptor.id,
            ModuleEntry {
                descriptor,
                status: ModuleStatus::Registered,
            },
        );
        Ok(())
    }

    /// Run the init hook of every enabled module not yet active
    pub fn init_all(&self) {
        for entry in self.write().values_mut() {
            entry.start();
        }
    }

    /// Run the teardown hook of every active module
    pub fn teardown_all(&self) {
        for entry in self.write().values_mut().rev() {
            entry.stop();
        }
    }

    /// Enable or disable a module, running the matching hook
    pub fn set_enabled(&self, id: &str, enabled: bool) -> Result<ModuleInfo, ModuleError> {
        let mut modules = self.write();
        let entry = modules
            .get_mut(id)
            .ok_or_else(|| ModuleError::NotFound(id.to_string()))?;
        if enabled {
            entry.descriptor.enabled = true;
            entry.start();
        } else {
            entry.stop();
            entry.descriptor.enabled = false;
        }
        Ok(entry.info())
    }

    pub fn get(&self, id: &str) -> Option<ModuleInfo> {
        self.read().get(id).map(ModuleEntry::info)
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.read()
            .get(id)
            .is_some_and(|entry| entry.status == ModuleStatus::Active)
    }

    pub fn list(&self) -> Vec<ModuleInfo> {
        self.read().values().map(ModuleEntry::info).collect()
    }

    pub fn with_capability(&self, capability: Capability) -> Vec<ModuleInfo> {
        self.read()
            .values()
            .filter(|entry| entry.descriptor.capabilities.contains(&capability))
            .map(ModuleEntry::info)
            .collect()
    }
}
