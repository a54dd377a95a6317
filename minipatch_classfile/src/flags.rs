use enumset::{EnumSet, EnumSetType};

/// Access flags of a class. Each variant is the bit index of its `ACC_*` mask.
#[derive(EnumSetType, Debug)]
pub enum ClassAccessFlags {
    Public = 0,
    Final = 4,
    Super = 5,
    Interface = 9,
    Abstract = 10,
    Synthetic = 12,
    Annotation = 13,
    Enum = 14,
    /// `module-info`, never a loadable class.
    Module = 15,
}

/// Access flags of a field.
#[derive(EnumSetType, Debug)]
pub enum FieldAccessFlags {
    Public = 0,
    Private = 1,
    Protected = 2,
    Static = 3,
    Final = 4,
    Volatile = 6,
    Transient = 7,
    Synthetic = 12,
    Enum = 14,
}

/// Access flags of a method.
#[derive(EnumSetType, Debug)]
pub enum MethodAccessFlags {
    Public = 0,
    Private = 1,
    Protected = 2,
    Static = 3,
    Final = 4,
    Synchronized = 5,
    /// Shares its bit with `volatile` on fields.
    Bridge = 6,
    Varargs = 7,
    Native = 8,
    Abstract = 10,
    Strict = 11,
    Synthetic = 12,
}

/// Decodes raw access bits, dropping any bits this model does not name.
pub(crate) fn decode<T: EnumSetType>(bits: u16) -> EnumSet<T> {
    EnumSet::from_u16_truncated(bits)
}
