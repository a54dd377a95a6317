use minipatch_classfile::{ClassModel, MethodModel};

/// Returns the first method of `class`, in declaration order, for which `filter(name, descriptor)`
/// holds.
pub fn find_method<'a>(
    class: &'a ClassModel,
    mut filter: impl FnMut(&str, &str) -> bool,
) -> Option<&'a MethodModel> {
    class.methods.iter().find(|x| filter(&x.name, &x.descriptor))
}

/// Like [`find_method`], but returns the method mutably so it can be patched.
pub fn find_method_mut<'a>(
    class: &'a mut ClassModel,
    mut filter: impl FnMut(&str, &str) -> bool,
) -> Option<&'a mut MethodModel> {
    class.methods.iter_mut().find(|x| filter(&x.name, &x.descriptor))
}
