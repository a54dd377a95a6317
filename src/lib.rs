#![deny(unused_must_use)]

//! Locates the entry classes of a Minicraft game jar, works out which variant and version of the
//! game it is, and injects a call to a startup hook into the game's initialization method.
//!
//! The pieces can be used on their own: [`locate::find_method`] and [`inject::inject_hook`] work
//! on any [`ClassModel`], [`variant::classify`] on any set of archive entries, and
//! [`version::scan_version`] on any class.

#[macro_use]
mod errors;

pub mod archive;
pub mod arguments;
pub mod config;
pub mod entrypoint;
pub mod game;
pub mod inject;
pub mod locate;
pub mod variant;
pub mod version;

pub use errors::{Error, ErrorKind, Result};

#[doc(inline)]
pub use minipatch_classfile as classfile;
pub use minipatch_classfile::ClassModel;
