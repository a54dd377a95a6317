use thiserror::Error;

/// An error encountered while reading or writing a class file.
#[derive(Error, Debug)]
pub enum ClassFileError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a class file (magic number 0x{0:08x})")]
    BadMagic(u32),
    #[error("unknown constant pool tag {tag} at index {index}")]
    UnknownPoolTag { tag: u8, index: u16 },
    #[error("invalid constant pool index {0}")]
    InvalidPoolIndex(u16),
    #[error("constant pool entry {index} should be {expected}, found {found}")]
    UnexpectedPoolEntry {
        index: u16,
        expected: &'static str,
        found: &'static str,
    },
    #[error("constant pool entry {0} is not valid modified UTF-8")]
    InvalidUtf8(u16),
    #[error("unknown opcode 0x{opcode:02x} at offset {offset}")]
    UnknownOpcode { opcode: u8, offset: u32 },
    #[error("offset {0} is not on an instruction boundary")]
    InvalidLabel(u32),
    #[error("branch at offset {offset} cannot reach relative offset {relative}")]
    BranchOutOfRange { offset: u32, relative: i32 },
    #[error("malformed code: {0}")]
    MalformedCode(&'static str),
    #[error("malformed {0} attribute")]
    MalformedAttribute(&'static str),
    #[error("{0} is too large for the class file format")]
    TooLarge(&'static str),
}
