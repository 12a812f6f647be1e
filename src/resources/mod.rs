//! Built-in resources and resource templates.

pub mod docs;
pub mod profile;
pub mod system;

pub use docs::DocsResource;
pub use profile::{UserProfile, UserProfileResource};
pub use system::SystemInfoResource;

use crate::error::RegistryResult;
use crate::registry::RegistryBuilder;

pub fn register(builder: &mut RegistryBuilder) -> RegistryResult<()> {
    builder
        .register_resource(SystemInfoResource::descriptor(), SystemInfoResource::new())?
        .register_resource_template(UserProfileResource::descriptor(), UserProfileResource)?
        .register_resource_template(DocsResource::descriptor(), DocsResource)?;
    Ok(())
}
