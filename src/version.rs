use crate::{
    archive::ArchiveReader,
    config::PatchConfig,
    variant::{classify, Variant},
    Error, Result,
};
use minipatch_classfile::{ClassModel, Instruction, Opcode};
use std::fmt::{Display, Formatter};
use tracing::debug;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum ScanState {
    /// Looking for a version holder construction or a string constant.
    Searching,
    /// A version holder was constructed; the next string constant is the version.
    ExpectingVersion,
}

/// Recovers the version string of a game class.
///
/// A string constant in the static field named by `config.version_field` wins. Failing that, the
/// static initializer is scanned for either a version holder construction followed by a string
/// constant, or a string constant that is later stored into the version field.
pub fn scan_version(class: &ClassModel, config: &PatchConfig) -> Option<String> {
    let constant = class
        .fields
        .iter()
        .filter(|x| x.name == config.version_field)
        .find_map(|x| x.constant_value.as_ref().and_then(|x| x.as_str()));
    if let Some(version) = constant {
        return Some(version.to_string());
    }

    let clinit = class.methods.iter().find(|x| x.name == "<clinit>")?;
    scan_initializer(clinit.instructions()?.iter(), config)
}

fn scan_initializer<'a>(
    insns: impl Iterator<Item = &'a Instruction>,
    config: &PatchConfig,
) -> Option<String> {
    let mut state = ScanState::Searching;
    let mut last_string: Option<&str> = None;

    for insn in insns {
        match (state, insn) {
            (ScanState::Searching, Instruction::Type { opcode, class })
                if *opcode == Opcode::new && class.ends_with(&config.version_holder_suffix) =>
            {
                state = ScanState::ExpectingVersion;
            }
            (ScanState::ExpectingVersion, Instruction::Ldc(constant)) => {
                if let Some(version) = constant.as_str() {
                    return Some(version.to_string());
                }
            }
            (ScanState::Searching, Instruction::Ldc(constant)) => {
                if let Some(string) = constant.as_str() {
                    last_string = Some(string);
                }
            }
            (_, Instruction::Field { opcode, field })
                if *opcode == Opcode::putstatic && field.name == config.version_field =>
            {
                if let Some(version) = last_string {
                    return Some(version.to_string());
                }
            }
            _ => {}
        }
    }
    None
}

/// The outcome of probing an archive for its variant and version.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VersionProbeResult {
    pub variant: Variant,
    /// The recovered version string, or `None` if it could not be determined.
    pub version: Option<String>,
}

/// Classifies the archive, then scans the class that identified it for a version.
///
/// An archive that matches no probe is reported as the default variant with no version.
pub fn probe_version<A: ArchiveReader + ?Sized>(
    archive: &A,
    config: &PatchConfig,
) -> Result<VersionProbeResult> {
    let classification = match classify(&config.variant_probes, |x| archive.has_entry(x)) {
        Some(x) => x,
        None => {
            debug!("Archive does not match any known variant");
            return Ok(VersionProbeResult {
                variant: Variant::default(),
                version: None,
            });
        }
    };
    debug!("Detected {} from {}", classification.variant, classification.version_holder);

    let holder = &classification.version_holder;
    let version = match archive.read_entry(holder)? {
        Some(data) => {
            let class = ClassModel::parse(&data).map_err(|e| Error::class_format(holder, e))?;
            scan_version(&class, config)
        }
        None => None,
    };
    match &version {
        Some(version) => debug!("Captured version {:?}", version),
        None => debug!("No version found in {}", holder),
    }

    Ok(VersionProbeResult {
        variant: classification.variant,
        version,
    })
}

/// A semantic version: dot separated numeric components, with optional pre-release and build
/// suffixes.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct SemanticVersion {
    pub components: Vec<u32>,
    pub prerelease: Option<String>,
    pub build: Option<String>,
}
impl SemanticVersion {
    fn parse(version: &str) -> Option<SemanticVersion> {
        let (rest, build) = match version.split_once('+') {
            Some((rest, build)) => (rest, Some(build)),
            None => (version, None),
        };
        let (core, prerelease) = match rest.split_once('-') {
            Some((core, prerelease)) => (core, Some(prerelease)),
            None => (rest, None),
        };

        let is_ident = |x: &str| {
            !x.is_empty()
                && x.split('.').all(|part| {
                    !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
                })
        };
        if !prerelease.map_or(true, is_ident) || !build.map_or(true, is_ident) {
            return None;
        }

        let mut components = Vec::new();
        for part in core.split('.') {
            if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            if part.len() > 1 && part.starts_with('0') {
                return None;
            }
            components.push(part.parse().ok()?);
        }

        Some(SemanticVersion {
            components,
            prerelease: prerelease.map(str::to_string),
            build: build.map(str::to_string),
        })
    }
}
impl Display for SemanticVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (i, component) in self.components.iter().enumerate() {
            if i != 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", component)?;
        }
        if let Some(prerelease) = &self.prerelease {
            write!(f, "-{}", prerelease)?;
        }
        if let Some(build) = &self.build {
            write!(f, "+{}", build)?;
        }
        Ok(())
    }
}

/// The version of a located game.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum GameVersion {
    Semantic(SemanticVersion),
    /// A version that does not follow semantic versioning, kept verbatim.
    Opaque(String),
}
impl GameVersion {
    /// Parses a version string. Only empty strings are rejected.
    pub fn parse(version: &str) -> Result<GameVersion> {
        if version.trim().is_empty() {
            return Err(Error::version_unparseable(version));
        }
        Ok(match SemanticVersion::parse(version) {
            Some(semver) => GameVersion::Semantic(semver),
            None => GameVersion::Opaque(version.to_string()),
        })
    }

    pub fn is_semantic(&self) -> bool {
        matches!(self, GameVersion::Semantic(_))
    }
}
impl Display for GameVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            GameVersion::Semantic(v) => Display::fmt(v, f),
            GameVersion::Opaque(v) => f.write_str(v),
        }
    }
}
