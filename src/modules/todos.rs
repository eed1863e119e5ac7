use tracing::info;

use super::{Capability, ModuleDescriptor};

pub const MODULE_ID: &str = "todos";

pub fn descriptor() -> ModuleDescriptor {
    ModuleDescriptor {
        id: MODULE_ID,
        name: "Todos",
        description: "Shared family task list",
        version: env!("CARGO_PKG_VERSION"),
        capabilities: &[Capability::Todos, Capability::Dashboard],
        enabled: true,
        init: Some(init),
        teardown: None,
    }
}

fn init() -> anyhow::Result<()> {
    info!("Todos module ready");
    Ok(())
}
