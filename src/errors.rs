use std::{
    backtrace::Backtrace,
    borrow::Cow,
    fmt::{Display, Formatter},
    panic::Location,
    path::PathBuf,
};
use thiserror::Error;

// internal reexports
pub use std::{error::Error as ErrorTrait, result::Result as StdResult};

/// The error type used for `minipatch`.
///
/// This error does not implement [`Error`](`ErrorTrait`) to allow a `From` implementation for any
/// standard error.
#[derive(Debug)]
pub struct Error(Box<ErrorData>);

#[derive(Debug)]
struct ErrorData {
    location: &'static Location<'static>,
    data: ErrorType,
    backtrace: Option<Backtrace>,
}

/// The broad category of an [`struct@Error`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    /// The method that the hook is injected into does not exist.
    MethodNotFound,
    /// The game archive could not be opened or read.
    ArchiveRead,
    /// A class file in the archive could not be parsed or written.
    ClassFormat,
    /// A recovered version string is not a valid version.
    VersionUnparseable,
    Internal,
    Message,
}

#[derive(Error, Debug)]
enum ErrorType {
    #[error("Could not find {method}{descriptor} in {class}!")]
    MethodNotFound {
        class: String,
        method: String,
        descriptor: String,
    },
    #[error("Failed to read archive {}: {source}", .path.display())]
    ArchiveRead {
        path: PathBuf,
        #[source]
        source: Box<dyn ErrorTrait + 'static>,
    },
    #[error("Malformed class {class}: {source}")]
    ClassFormat {
        class: String,
        #[source]
        source: minipatch_classfile::ClassFileError,
    },
    #[error("Could not parse version {0:?}")]
    VersionUnparseable(String),
    #[error("Internal error: {0}")]
    Wrapped(#[source] Box<dyn ErrorTrait + 'static>),
    #[error("Internal error: {0}")]
    Error(Cow<'static, str>),
    #[error("{0}")]
    Message(Cow<'static, str>),
}
impl ErrorType {
    fn kind(&self) -> ErrorKind {
        match self {
            ErrorType::MethodNotFound { .. } => ErrorKind::MethodNotFound,
            ErrorType::ArchiveRead { .. } => ErrorKind::ArchiveRead,
            ErrorType::ClassFormat { .. } => ErrorKind::ClassFormat,
            ErrorType::VersionUnparseable(_) => ErrorKind::VersionUnparseable,
            ErrorType::Wrapped(_) | ErrorType::Error(_) => ErrorKind::Internal,
            ErrorType::Message(_) => ErrorKind::Message,
        }
    }
    fn is_internal(&self) -> bool {
        self.kind() == ErrorKind::Internal
    }
}

impl Error {
    #[inline(never)]
    #[track_caller]
    fn raw_new(tp: ErrorType) -> Self {
        let backtrace = if tp.is_internal() {
            Some(Backtrace::capture())
        } else {
            None
        };
        Error(Box::new(ErrorData {
            location: Location::caller(),
            data: tp,
            backtrace,
        }))
    }

    /// Creates a new `Error` with an internal error message.
    #[inline(never)]
    #[track_caller]
    pub fn new(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::raw_new(ErrorType::Error(msg.into()))
    }

    /// Creates a new `Error` with an error message.
    ///
    /// Unlike [`Error::new`], this does not record a backtrace, and the message is displayed
    /// as-is.
    #[inline(never)]
    #[track_caller]
    pub fn message(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::raw_new(ErrorType::Message(msg.into()))
    }

    /// Creates an error for a hook target method that does not exist.
    #[inline(never)]
    #[track_caller]
    pub fn method_not_found(class: &str, method: &str, descriptor: &str) -> Self {
        Self::raw_new(ErrorType::MethodNotFound {
            class: class.to_string(),
            method: method.to_string(),
            descriptor: descriptor.to_string(),
        })
    }

    /// Wraps a failure to open or read an archive, attaching its path.
    #[inline(never)]
    #[track_caller]
    pub fn archive_read<T: ErrorTrait + 'static>(path: impl Into<PathBuf>, err: T) -> Self {
        Self::raw_new(ErrorType::ArchiveRead {
            path: path.into(),
            source: Box::new(err),
        })
    }

    #[inline(never)]
    #[track_caller]
    pub fn class_format(class: &str, err: minipatch_classfile::ClassFileError) -> Self {
        Self::raw_new(ErrorType::ClassFormat {
            class: class.to_string(),
            source: err,
        })
    }

    #[inline(never)]
    #[track_caller]
    pub fn version_unparseable(version: &str) -> Self {
        Self::raw_new(ErrorType::VersionUnparseable(version.to_string()))
    }

    /// Wraps any error in an `Error`.
    #[inline(never)]
    #[track_caller]
    pub fn wrap<T: ErrorTrait + 'static>(err: T) -> Self {
        Self::raw_new(ErrorType::Wrapped(Box::new(err)))
    }

    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        self.0.data.kind()
    }

    /// Returns the cause of this error.
    pub fn source(&self) -> Option<&(dyn ErrorTrait + 'static)> {
        ErrorTrait::source(&self.0.data)
    }

    /// Returns the backtrace for this error.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        self.0.backtrace.as_ref()
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.0.data.is_internal() {
            write!(
                f,
                "{} (at {}:{})",
                self.0.data,
                self.0.location.file(),
                self.0.location.line()
            )
        } else {
            Display::fmt(&self.0.data, f)
        }
    }
}
impl<T: ErrorTrait + 'static> From<T> for Error {
    #[track_caller]
    fn from(t: T) -> Self {
        Error::wrap(t)
    }
}

/// The result type used for `minipatch`.
pub type Result<T> = StdResult<T, Error>;

/// Returns from the current function with an internal [`struct@Error`].
///
/// This requires the function return a [`Result`], and uses the same format as [`format!`].
#[macro_export]
macro_rules! patch_bail {
    ($($tt:tt)*) => {
        return ::std::result::Result::Err($crate::Error::new(::std::format!($($tt)*)))
    }
}

/// Returns from the current function with an internal [`struct@Error`], if a precondition fails.
///
/// This requires the function return a [`Result`], and uses the same format as [`assert!`].
#[macro_export]
macro_rules! patch_assert {
    ($condition:expr, $($tt:tt)*) => {
        if !$condition {
            $crate::patch_bail!($($tt)*)
        }
    }
}
