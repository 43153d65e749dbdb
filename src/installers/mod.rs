// One installer per module kind. Each implements `module_installer::Module`;
// the orchestrator never needs to know which kind it is driving.

/// Vendor-page artifacts: scrape, download, unpack, overlay, hook.
pub(crate) mod generic;

/// Global Node.js packages through `npm install -g`.
pub(crate) mod npm;

/// Global PHP packages through `composer global require`.
pub(crate) mod composer;

use crate::libs::module_installer::Module;
use crate::schemas::module_spec::{ModuleKind, ModuleSpec};

/// Wraps a validated spec in the installer for its kind.
pub fn build_module(spec: ModuleSpec) -> Box<dyn Module> {
    match spec.kind.clone() {
        ModuleKind::Generic(source) => Box::new(generic::GenericModule::new(spec, source)),
        ModuleKind::Npm => Box::new(npm::NpmModule::new(spec)),
        ModuleKind::Composer { namespace, package } => {
            Box::new(composer::ComposerModule::new(spec, namespace, package))
        }
    }
}
