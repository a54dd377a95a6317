use crate::{
    archive::JarArchive,
    arguments::Arguments,
    config::PatchConfig,
    entrypoint::{find_entrypoint, patch_archive, EntrypointPatch},
    variant::{GameMetadata, Variant},
    version::{probe_version, GameVersion},
    Error, Result,
};
use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

/// A game jar that has been located and probed.
pub struct LocatedGame {
    jar: JarArchive,
    config: PatchConfig,
    pub entrypoint: String,
    pub variant: Variant,
    pub version: GameVersion,
    pub arguments: Arguments,
}
impl LocatedGame {
    /// Opens the game jar and identifies it. Returns `None` if the jar has no known entrypoint.
    pub fn locate(
        jar: impl AsRef<Path>,
        mut arguments: Arguments,
        config: PatchConfig,
    ) -> Result<Option<LocatedGame>> {
        let path = jar.as_ref();
        if !path.exists() {
            return Err(Error::message(format!("Game jar {} doesn't exist", path.display())));
        }
        let jar = JarArchive::open(path)?;

        let entrypoint = match find_entrypoint(&jar, &config) {
            Some(x) => x,
            None => {
                info!("No entrypoint found in {}", path.display());
                return Ok(None);
            }
        };
        debug!("Found entrypoint {}", entrypoint);

        let game_dir = arguments.ensure_game_dir()?;
        info!("Launch directory is {}", game_dir.display());

        let probe = probe_version(&jar, &config)?;
        let version = match probe.version.as_deref().map(GameVersion::parse) {
            Some(Ok(version)) => version,
            Some(Err(e)) => {
                warn!("{}, using {}", e, config.default_version);
                GameVersion::parse(&config.default_version)?
            }
            None => GameVersion::parse(&config.default_version)?,
        };

        Ok(Some(LocatedGame {
            jar,
            config,
            entrypoint,
            variant: probe.variant,
            version,
            arguments,
        }))
    }

    pub fn jar_path(&self) -> &Path {
        self.jar.path()
    }
    pub fn game_dir(&self) -> PathBuf {
        self.arguments.game_dir().to_path_buf()
    }

    pub fn metadata(&self) -> GameMetadata {
        self.variant.metadata()
    }

    /// Injects the hook and writes the patched jar to `output`, which must not be the game jar.
    pub fn patch(&self, output: impl AsRef<Path>) -> Result<()> {
        let output = output.as_ref();
        if let (Ok(out), Ok(jar)) = (output.canonicalize(), self.jar_path().canonicalize()) {
            if out == jar {
                return Err(Error::message(format!(
                    "Cannot write the patched jar over the game jar {}",
                    jar.display()
                )));
            }
        }

        let patched = EntrypointPatch::new(&self.config).process(&self.jar, &self.entrypoint)?;
        let mut patched: Vec<_> = patched.into_iter().collect();

        let file = File::create(output)?;
        patch_archive(&self.jar, BufWriter::new(file), &mut patched)?;
        info!("Wrote {}", output.display());
        Ok(())
    }

    /// The arguments to launch the game with.
    pub fn launch_arguments(&self, sanitize: bool) -> Vec<String> {
        self.arguments.launch_arguments(sanitize)
    }
}
