use crate::{Error, Result};
use minipatch_classfile::ClassModel;
use std::{
    cell::{RefCell, RefMut},
    collections::BTreeMap,
    fs::File,
    io::{BufReader, Read, Seek},
    path::{Path, PathBuf},
};
use tracing::debug;
use zip::{result::ZipError, ZipArchive};

/// Read access to the entries of a game archive, keyed by slash-separated paths.
pub trait ArchiveReader {
    fn has_entry(&self, path: &str) -> bool;

    /// Reads an entry, returning `None` if it does not exist.
    fn read_entry(&self, path: &str) -> Result<Option<Vec<u8>>>;
}

/// Loads parsed classes by their dotted name.
pub trait ClassSource {
    fn load_class(&self, name: &str) -> Result<Option<ClassModel>>;
}
impl<T: ArchiveReader + ?Sized> ClassSource for T {
    fn load_class(&self, name: &str) -> Result<Option<ClassModel>> {
        match self.read_entry(&class_entry(name))? {
            Some(data) => match ClassModel::parse(&data) {
                Ok(class) => Ok(Some(class)),
                Err(e) => Err(Error::class_format(name, e)),
            },
            None => Ok(None),
        }
    }
}

/// Returns the archive entry holding a class, e.g. `a/b/C.class` for `a.b.C`.
pub fn class_entry(name: &str) -> String {
    format!("{}.class", name.replace('.', "/"))
}

/// A jar file, usually on disk.
pub struct JarArchive<R = BufReader<File>> {
    path: PathBuf,
    zip: RefCell<ZipArchive<R>>,
}
impl JarArchive {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::archive_read(path, e))?;
        JarArchive::from_reader(path, BufReader::new(file))
    }
}
impl<R: Read + Seek> JarArchive<R> {
    /// Opens a jar from any seekable reader. `path` is only used in error messages.
    pub fn from_reader(path: impl Into<PathBuf>, reader: R) -> Result<Self> {
        let path = path.into();
        let zip = ZipArchive::new(reader).map_err(|e| Error::archive_read(&path, e))?;
        debug!("Opened {} with {} entries", path.display(), zip.len());
        Ok(JarArchive {
            path,
            zip: RefCell::new(zip),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn zip(&self) -> RefMut<'_, ZipArchive<R>> {
        self.zip.borrow_mut()
    }
}
impl<R: Read + Seek> ArchiveReader for JarArchive<R> {
    fn has_entry(&self, path: &str) -> bool {
        self.zip.borrow().file_names().any(|x| x == path)
    }

    fn read_entry(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let mut zip = self.zip.borrow_mut();
        let mut file = match zip.by_name(path) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(Error::archive_read(&self.path, e)),
        };
        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data).map_err(|e| Error::archive_read(&self.path, e))?;
        Ok(Some(data))
    }
}

/// An archive held in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryArchive {
    entries: BTreeMap<String, Vec<u8>>,
}
impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &str, data: Vec<u8>) -> &mut Self {
        self.entries.insert(path.to_string(), data);
        self
    }

    /// Adds a class under the entry matching its internal name.
    pub fn insert_class(&mut self, class: &mut ClassModel) -> Result<&mut Self> {
        let data = class.to_vec().map_err(|e| Error::class_format(&class.name, e))?;
        let path = format!("{}.class", class.name);
        Ok(self.insert(&path, data))
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &[u8])> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}
impl ArchiveReader for MemoryArchive {
    fn has_entry(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }
    fn read_entry(&self, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(path).cloned())
    }
}
