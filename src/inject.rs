use crate::{config::HookDescriptor, Error, Result};
use minipatch_classfile::{Instruction, MethodModel};
use tracing::debug;

/// Builds the call instruction for a hook.
pub fn hook_call(hook: &HookDescriptor) -> Instruction {
    Instruction::invokestatic(hook.owner(), hook.name(), hook.descriptor())
}

/// Inserts a call to `hook` before the first instruction of `method`.
///
/// Nothing checks whether the hook call is already present; injecting twice calls the hook twice.
pub fn inject_hook(method: &mut MethodModel, hook: &HookDescriptor) -> Result<()> {
    let name = format!("{}{}", method.name, method.descriptor);
    match method.instructions_mut() {
        Some(insns) => {
            debug!("Patching init method {}", name);
            insns.prepend(hook_call(hook));
            Ok(())
        }
        None => Err(Error::message(format!("Method {} has no code to inject into.", name))),
    }
}
