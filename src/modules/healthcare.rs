use tracing::info;

use super::{Capability, ModuleDescriptor};
use crate::database::models::Specialty;

pub const MODULE_ID: &str = "healthcare";

pub fn descriptor() -> ModuleDescriptor {
    ModuleDescriptor {
        id: MODULE_ID,
        name: "Healthcare",
        description: "Patient portal links for every family member",
        version: env!("CARGO_PKG_VERSION"),
        capabilities: &[Capability::Members, Capability::Providers, Capability::PortalDetection],
        enabled: true,
        init: Some(init),
        teardown: Some(teardown),
    }
}

fn init() -> anyhow::Result<()> {
    info!("Healthcare module ready with {} specialties", Specialty::ALL.len());
    Ok(())
}

fn teardown() -> anyhow::Result<()> {
    info!("Healthcare module shut down");
    Ok(())
}
