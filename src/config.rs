use crate::{variant::VariantProbe, Error, Result};

/// The static method called at the start of the game's initialization.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct HookDescriptor {
    owner: String,
    name: String,
    descriptor: String,
}
impl HookDescriptor {
    /// Creates a new hook descriptor. The owner is an internal name, e.g. `com/example/Hooks`.
    ///
    /// Hooks take no arguments and return nothing, so any descriptor other than `()V` is
    /// rejected.
    pub fn new(owner: &str, name: &str, descriptor: &str) -> Result<Self> {
        if descriptor != "()V" {
            return Err(Error::message(format!(
                "Hook {}.{}{} must take no arguments and return void.",
                owner, name, descriptor
            )));
        }
        if owner.is_empty() || name.is_empty() {
            return Err(Error::message("Hook owner and method name must not be empty."));
        }
        Ok(HookDescriptor {
            owner: owner.replace('.', "/"),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }
}
impl Default for HookDescriptor {
    fn default() -> Self {
        HookDescriptor {
            owner: "io/github/pseudodistant/provider/services/MiniHooks".to_string(),
            name: "init".to_string(),
            descriptor: "()V".to_string(),
        }
    }
}

/// A method named by its name and descriptor.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct MethodSpec {
    pub name: String,
    pub descriptor: String,
}
impl MethodSpec {
    pub fn new(name: &str, descriptor: &str) -> Self {
        MethodSpec {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        }
    }
    pub fn matches(&self, name: &str, descriptor: &str) -> bool {
        self.name == name && self.descriptor == descriptor
    }
}

/// Everything the locator, patcher and version probe need to know about the game.
#[derive(Clone, Debug)]
pub struct PatchConfig {
    /// Candidate main classes, in priority order.
    pub entrypoints: Vec<String>,
    /// Only entrypoints in these packages are patched.
    pub patchable_prefixes: Vec<String>,
    /// A class that, when present, holds the initialization method instead of the main class.
    pub initializer_class: String,
    pub initializer_method: MethodSpec,
    /// The initialization method of the main class.
    pub init_method: MethodSpec,
    pub hook: HookDescriptor,
    pub variant_probes: Vec<VariantProbe>,
    /// Types constructed with the version string as their first argument end with this.
    pub version_holder_suffix: String,
    /// The name of the static field holding the version.
    pub version_field: String,
    pub default_version: String,
}
impl Default for PatchConfig {
    fn default() -> Self {
        PatchConfig {
            entrypoints: vec![
                "com.mojang.ld22.Game".to_string(),
                "com.mojang.ld22.GameControl".to_string(),
                "minicraft.core.Game".to_string(),
                "minicraft.Game".to_string(),
            ],
            patchable_prefixes: vec!["com.mojang.".to_string(), "minicraft.".to_string()],
            initializer_class: "minicraft.core.Initializer".to_string(),
            initializer_method: MethodSpec::new("run", "()V"),
            init_method: MethodSpec::new("init", "()V"),
            hook: HookDescriptor::default(),
            variant_probes: VariantProbe::defaults(),
            version_holder_suffix: "/Version".to_string(),
            version_field: "VERSION".to_string(),
            default_version: "0.0.0".to_string(),
        }
    }
}
impl PatchConfig {
    pub fn with_hook(mut self, hook: HookDescriptor) -> Self {
        self.hook = hook;
        self
    }

    pub fn is_patchable(&self, entrypoint: &str) -> bool {
        self.patchable_prefixes.iter().any(|x| entrypoint.starts_with(x.as_str()))
    }
}
