use crate::{
    archive::{class_entry, ArchiveReader, ClassSource, JarArchive},
    config::PatchConfig,
    inject::inject_hook,
    locate::find_method_mut,
    Error, Result,
};
use minipatch_classfile::ClassModel;
use std::io::{Read, Seek, Write};
use tracing::{debug, info};
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

/// Returns the first configured entrypoint class present in the archive.
pub fn find_entrypoint<A: ArchiveReader + ?Sized>(
    archive: &A,
    config: &PatchConfig,
) -> Option<String> {
    config.entrypoints.iter().find(|x| archive.has_entry(&class_entry(x))).cloned()
}

/// A class with the hook injected, ready to replace the original.
#[derive(Clone, Debug)]
pub struct PatchedClass {
    /// The dotted name of the class.
    pub name: String,
    pub class: ClassModel,
}
impl PatchedClass {
    /// The archive entry this class replaces.
    pub fn entry(&self) -> String {
        class_entry(&self.name)
    }

    pub fn to_vec(&mut self) -> Result<Vec<u8>> {
        self.class.to_vec().map_err(|e| Error::class_format(&self.name, e))
    }
}

/// Injects the hook into the game's initialization method.
pub struct EntrypointPatch<'a> {
    config: &'a PatchConfig,
}
impl<'a> EntrypointPatch<'a> {
    pub fn new(config: &'a PatchConfig) -> Self {
        EntrypointPatch { config }
    }

    /// Patches the initialization method reached from `entrypoint`.
    ///
    /// If the initializer class exists, its initializer method is patched. Otherwise, the init
    /// method of the entrypoint class itself is. Entrypoints outside the patchable packages are
    /// left alone.
    pub fn process<S: ClassSource + ?Sized>(
        &self,
        source: &S,
        entrypoint: &str,
    ) -> Result<Option<PatchedClass>> {
        let config = self.config;
        if !config.is_patchable(entrypoint) {
            debug!("Not patching {}, it is not in a known package", entrypoint);
            return Ok(None);
        }

        let (name, mut class, method) = match source.load_class(&config.initializer_class)? {
            Some(class) => (config.initializer_class.as_str(), class, &config.initializer_method),
            None => match source.load_class(entrypoint)? {
                Some(class) => (entrypoint, class, &config.init_method),
                None => {
                    return Err(Error::message(format!(
                        "Could not find entrypoint class {}!",
                        entrypoint
                    )))
                }
            },
        };

        let target = find_method_mut(&mut class, |n, d| method.matches(n, d))
            .ok_or_else(|| Error::method_not_found(name, &method.name, &method.descriptor))?;
        debug!("Found init method: {} -> {}", entrypoint, name);
        inject_hook(target, &config.hook)?;

        Ok(Some(PatchedClass {
            name: name.to_string(),
            class,
        }))
    }
}

fn is_signature_file(name: &str) -> bool {
    let upper = name.to_uppercase();
    upper.starts_with("META-INF/")
        && [".SF", ".RSA", ".DSA", ".EC"].iter().any(|x| upper.ends_with(x))
}

/// Copies a jar, replacing the entries of the patched classes.
///
/// Jar signatures are dropped, since they no longer match the patched classes.
pub fn patch_archive<R: Read + Seek, W: Write + Seek>(
    jar: &JarArchive<R>,
    output: W,
    patched: &mut [PatchedClass],
) -> Result<()> {
    let mut replacements = Vec::with_capacity(patched.len());
    for class in patched.iter_mut() {
        replacements.push((class.entry(), class.to_vec()?));
    }

    let mut zip = jar.zip();
    let mut out = ZipWriter::new(output);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut replaced = 0;
    for i in 0..zip.len() {
        let file = zip.by_index(i).map_err(|e| Error::archive_read(jar.path(), e))?;
        let name = file.name().to_string();

        if is_signature_file(&name) {
            debug!("Dropping signature file {}", name);
        } else if let Some((_, data)) = replacements.iter().find(|x| x.0 == name) {
            debug!("Replacing {}", name);
            out.start_file(name.as_str(), options)?;
            out.write_all(data)?;
            replaced += 1;
        } else {
            out.raw_copy_file(file)?;
        }
    }
    out.finish()?;
    patch_assert!(
        replaced == replacements.len(),
        "{} patched class(es) had no entry in {}",
        replacements.len() - replaced,
        jar.path().display()
    );

    info!("Patched {} class(es) from {}", replacements.len(), jar.path().display());
    Ok(())
}
