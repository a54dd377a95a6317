use crate::ClassFileError;
use byteorder::{ReadBytesExt, WriteBytesExt, BE};
use std::{
    collections::HashMap,
    io::{Error, Read, Write},
};

/// An index into a class file's constant pool.
#[derive(Copy, Clone, Debug, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct PoolId(pub(crate) u16);
impl PoolId {
    pub fn index(&self) -> u16 {
        self.0
    }
    pub fn write(&self, mut w: impl Write) -> Result<(), Error> {
        w.write_u16::<BE>(self.0)
    }
}

#[derive(Clone, Debug, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub enum PoolEntry {
    Utf8(String),
    Integer(i32),
    Float(u32), // f32 bits
    Long(i64),
    Double(u64), // f64 bits
    Class(PoolId),
    String(PoolId),
    FieldRef {
        class_index: PoolId,
        name_and_type_index: PoolId,
    },
    MethodRef {
        class_index: PoolId,
        name_and_type_index: PoolId,
    },
    InterfaceMethodRef {
        class_index: PoolId,
        name_and_type_index: PoolId,
    },
    NameAndType {
        name_index: PoolId,
        descriptor_index: PoolId,
    },
    MethodHandle {
        reference_kind: u8,
        reference_index: PoolId,
    },
    MethodType(PoolId),
    Dynamic {
        bootstrap_method_attr_index: u16,
        name_and_type_index: PoolId,
    },
    InvokeDynamic {
        bootstrap_method_attr_index: u16,
        name_and_type_index: PoolId,
    },
    Module(PoolId),
    Package(PoolId),
}
impl PoolEntry {
    fn is_wide(&self) -> bool {
        matches!(self, PoolEntry::Long(_) | PoolEntry::Double(_))
    }
    fn kind(&self) -> &'static str {
        match self {
            PoolEntry::Utf8(_) => "Utf8",
            PoolEntry::Integer(_) => "Integer",
            PoolEntry::Float(_) => "Float",
            PoolEntry::Long(_) => "Long",
            PoolEntry::Double(_) => "Double",
            PoolEntry::Class(_) => "Class",
            PoolEntry::String(_) => "String",
            PoolEntry::FieldRef { .. } => "Fieldref",
            PoolEntry::MethodRef { .. } => "Methodref",
            PoolEntry::InterfaceMethodRef { .. } => "InterfaceMethodref",
            PoolEntry::NameAndType { .. } => "NameAndType",
            PoolEntry::MethodHandle { .. } => "MethodHandle",
            PoolEntry::MethodType(_) => "MethodType",
            PoolEntry::Dynamic { .. } => "Dynamic",
            PoolEntry::InvokeDynamic { .. } => "InvokeDynamic",
            PoolEntry::Module(_) => "Module",
            PoolEntry::Package(_) => "Package",
        }
    }
}

/// A member reference resolved out of the constant pool.
#[derive(Copy, Clone, Debug)]
pub struct MemberRefStrs<'a> {
    pub owner: &'a str,
    pub name: &'a str,
    pub descriptor: &'a str,
    pub interface: bool,
}

/// The constant pool of a class.
///
/// Entries read from an existing class keep their original indices. Interning a value that
/// already exists returns the existing index; anything else is appended to the end. A pool that
/// runs out of indices fails with [`ClassFileError::TooLarge`] when it is written.
#[derive(Debug, Clone)]
pub struct ConstantPool {
    // slot 0 and the slot after each Long/Double are `None`
    entries: Vec<Option<PoolEntry>>,
    cache: HashMap<PoolEntry, PoolId>,
    // set when an entry did not fit, reported by `write`
    overflowed: bool,
}
impl Default for ConstantPool {
    fn default() -> Self {
        ConstantPool {
            entries: vec![None],
            cache: HashMap::new(),
            overflowed: false,
        }
    }
}
impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of slots used, as written in `constant_pool_count` minus one.
    pub fn len(&self) -> usize {
        self.entries.len().saturating_sub(1)
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn read(mut r: impl Read) -> Result<Self, ClassFileError> {
        let count = r.read_u16::<BE>()?;
        let mut pool = ConstantPool::new();
        let mut index = 1u16;
        while index < count {
            let tag = r.read_u8()?;
            let entry = match tag {
                1 => {
                    let len = r.read_u16::<BE>()? as usize;
                    let mut buf = vec![0u8; len];
                    r.read_exact(&mut buf)?;
                    match cesu8::from_java_cesu8(&buf) {
                        Ok(str) => PoolEntry::Utf8(str.into_owned()),
                        Err(_) => return Err(ClassFileError::InvalidUtf8(index)),
                    }
                }
                3 => PoolEntry::Integer(r.read_i32::<BE>()?),
                4 => PoolEntry::Float(r.read_u32::<BE>()?),
                5 => PoolEntry::Long(r.read_i64::<BE>()?),
                6 => PoolEntry::Double(r.read_u64::<BE>()?),
                7 => PoolEntry::Class(PoolId(r.read_u16::<BE>()?)),
                8 => PoolEntry::String(PoolId(r.read_u16::<BE>()?)),
                9 | 10 | 11 => {
                    let class_index = PoolId(r.read_u16::<BE>()?);
                    let name_and_type_index = PoolId(r.read_u16::<BE>()?);
                    match tag {
                        9 => PoolEntry::FieldRef {
                            class_index,
                            name_and_type_index,
                        },
                        10 => PoolEntry::MethodRef {
                            class_index,
                            name_and_type_index,
                        },
                        _ => PoolEntry::InterfaceMethodRef {
                            class_index,
                            name_and_type_index,
                        },
                    }
                }
                12 => PoolEntry::NameAndType {
                    name_index: PoolId(r.read_u16::<BE>()?),
                    descriptor_index: PoolId(r.read_u16::<BE>()?),
                },
                15 => PoolEntry::MethodHandle {
                    reference_kind: r.read_u8()?,
                    reference_index: PoolId(r.read_u16::<BE>()?),
                },
                16 => PoolEntry::MethodType(PoolId(r.read_u16::<BE>()?)),
                17 | 18 => {
                    let bootstrap_method_attr_index = r.read_u16::<BE>()?;
                    let name_and_type_index = PoolId(r.read_u16::<BE>()?);
                    if tag == 17 {
                        PoolEntry::Dynamic {
                            bootstrap_method_attr_index,
                            name_and_type_index,
                        }
                    } else {
                        PoolEntry::InvokeDynamic {
                            bootstrap_method_attr_index,
                            name_and_type_index,
                        }
                    }
                }
                19 => PoolEntry::Module(PoolId(r.read_u16::<BE>()?)),
                20 => PoolEntry::Package(PoolId(r.read_u16::<BE>()?)),
                _ => return Err(ClassFileError::UnknownPoolTag { tag, index }),
            };

            let wide = entry.is_wide();
            pool.cache.entry(entry.clone()).or_insert(PoolId(index));
            pool.entries.push(Some(entry));
            index += 1;
            if wide {
                pool.entries.push(None);
                index += 1;
            }
        }
        Ok(pool)
    }

    pub fn write(&self, mut w: impl Write) -> Result<(), ClassFileError> {
        if self.overflowed || self.entries.len() > u16::MAX as usize {
            return Err(ClassFileError::TooLarge("constant pool"));
        }
        w.write_u16::<BE>(self.entries.len() as u16)?;
        for entry in self.entries.iter().flatten() {
            write_entry(entry, &mut w)?;
        }
        Ok(())
    }

    pub fn get(&self, id: PoolId) -> Result<&PoolEntry, ClassFileError> {
        match self.entries.get(id.0 as usize) {
            Some(Some(entry)) => Ok(entry),
            _ => Err(ClassFileError::InvalidPoolIndex(id.0)),
        }
    }

    fn mismatch(&self, id: PoolId, expected: &'static str) -> ClassFileError {
        ClassFileError::UnexpectedPoolEntry {
            index: id.0,
            expected,
            found: self.get(id).map(|x| x.kind()).unwrap_or("nothing"),
        }
    }

    pub fn get_utf8(&self, id: PoolId) -> Result<&str, ClassFileError> {
        match self.get(id)? {
            PoolEntry::Utf8(str) => Ok(str),
            _ => Err(self.mismatch(id, "Utf8")),
        }
    }
    pub fn get_class(&self, id: PoolId) -> Result<&str, ClassFileError> {
        match self.get(id)? {
            PoolEntry::Class(name) => self.get_utf8(*name),
            _ => Err(self.mismatch(id, "Class")),
        }
    }
    pub fn get_name_and_type(&self, id: PoolId) -> Result<(&str, &str), ClassFileError> {
        match self.get(id)? {
            PoolEntry::NameAndType {
                name_index,
                descriptor_index,
            } => {
                Ok((self.get_utf8(*name_index)?, self.get_utf8(*descriptor_index)?))
            }
            _ => Err(self.mismatch(id, "NameAndType")),
        }
    }
    pub fn get_member_ref(&self, id: PoolId) -> Result<MemberRefStrs<'_>, ClassFileError> {
        let (class_index, name_and_type_index, interface) = match self.get(id)? {
            PoolEntry::FieldRef {
                class_index,
                name_and_type_index,
            }
            | PoolEntry::MethodRef {
                class_index,
                name_and_type_index,
            } => {
                (*class_index, *name_and_type_index, false)
            }
            PoolEntry::InterfaceMethodRef {
                class_index,
                name_and_type_index,
            } => {
                (*class_index, *name_and_type_index, true)
            }
            _ => return Err(self.mismatch(id, "member reference")),
        };
        let (name, descriptor) = self.get_name_and_type(name_and_type_index)?;
        Ok(MemberRefStrs {
            owner: self.get_class(class_index)?,
            name,
            descriptor,
            interface,
        })
    }

    fn entry(&mut self, entry: PoolEntry) -> PoolId {
        if let Some(x) = self.cache.get(&entry) {
            *x
        } else {
            let raw_id = self.entries.len();
            let wide = entry.is_wide();
            if raw_id + if wide { 2 } else { 1 } > u16::MAX as usize {
                self.overflowed = true;
                return PoolId(0);
            }

            let id = PoolId(raw_id as u16);
            self.entries.push(Some(entry.clone()));
            if wide {
                self.entries.push(None);
            }
            self.cache.insert(entry, id);
            id
        }
    }
    fn name_and_type(&mut self, v: &str, descriptor: &str) -> PoolId {
        let name_index = self.utf8(v);
        let descriptor_index = self.utf8(descriptor);
        self.entry(PoolEntry::NameAndType {
            name_index,
            descriptor_index,
        })
    }

    pub fn utf8(&mut self, v: &str) -> PoolId {
        self.entry(PoolEntry::Utf8(v.to_string()))
    }
    pub fn integer(&mut self, v: i32) -> PoolId {
        self.entry(PoolEntry::Integer(v))
    }
    pub fn float(&mut self, v: f32) -> PoolId {
        self.entry(PoolEntry::Float(v.to_bits()))
    }
    pub fn long(&mut self, v: i64) -> PoolId {
        self.entry(PoolEntry::Long(v))
    }
    pub fn double(&mut self, v: f64) -> PoolId {
        self.entry(PoolEntry::Double(v.to_bits()))
    }
    pub fn class(&mut self, v: &str) -> PoolId {
        let contents = self.utf8(v);
        self.entry(PoolEntry::Class(contents))
    }
    pub fn string(&mut self, str: &str) -> PoolId {
        let contents = self.utf8(str);
        self.entry(PoolEntry::String(contents))
    }
    pub fn field_ref(&mut self, cl: &str, name: &str, ty: &str) -> PoolId {
        let class = self.class(cl);
        let name_and_type = self.name_and_type(name, ty);
        self.entry(PoolEntry::FieldRef {
            class_index: class,
            name_and_type_index: name_and_type,
        })
    }
    pub fn method_ref(&mut self, cl: &str, name: &str, ty: &str) -> PoolId {
        let class = self.class(cl);
        let name_and_type = self.name_and_type(name, ty);
        self.entry(PoolEntry::MethodRef {
            class_index: class,
            name_and_type_index: name_and_type,
        })
    }
    pub fn interface_method_ref(&mut self, cl: &str, name: &str, ty: &str) -> PoolId {
        let class = self.class(cl);
        let name_and_type = self.name_and_type(name, ty);
        self.entry(PoolEntry::InterfaceMethodRef {
            class_index: class,
            name_and_type_index: name_and_type,
        })
    }
}

fn write_entry(entry: &PoolEntry, mut w: impl Write) -> Result<(), ClassFileError> {
    match entry {
        PoolEntry::Utf8(str) => {
            let cesu = cesu8::to_java_cesu8(str);
            if cesu.len() > u16::MAX as usize {
                return Err(ClassFileError::TooLarge("Utf8 constant"));
            }
            w.write_u8(1)?;
            w.write_u16::<BE>(cesu.len() as u16)?;
            w.write_all(&cesu)?;
        }
        PoolEntry::Integer(v) => {
            w.write_u8(3)?;
            w.write_i32::<BE>(*v)?;
        }
        PoolEntry::Float(v) => {
            w.write_u8(4)?;
            w.write_u32::<BE>(*v)?;
        }
        PoolEntry::Long(v) => {
            w.write_u8(5)?;
            w.write_i64::<BE>(*v)?;
        }
        PoolEntry::Double(v) => {
            w.write_u8(6)?;
            w.write_u64::<BE>(*v)?;
        }
        PoolEntry::Class(id) => {
            w.write_u8(7)?;
            id.write(&mut w)?;
        }
        PoolEntry::String(id) => {
            w.write_u8(8)?;
            id.write(&mut w)?;
        }
        PoolEntry::FieldRef {
            class_index,
            name_and_type_index,
        } => {
            w.write_u8(9)?;
            class_index.write(&mut w)?;
            name_and_type_index.write(&mut w)?;
        }
        PoolEntry::MethodRef {
            class_index,
            name_and_type_index,
        } => {
            w.write_u8(10)?;
            class_index.write(&mut w)?;
            name_and_type_index.write(&mut w)?;
        }
        PoolEntry::InterfaceMethodRef {
            class_index,
            name_and_type_index,
        } => {
            w.write_u8(11)?;
            class_index.write(&mut w)?;
            name_and_type_index.write(&mut w)?;
        }
        PoolEntry::NameAndType {
            name_index,
            descriptor_index,
        } => {
            w.write_u8(12)?;
            name_index.write(&mut w)?;
            descriptor_index.write(&mut w)?;
        }
        PoolEntry::MethodHandle {
            reference_kind,
            reference_index,
        } => {
            w.write_u8(15)?;
            w.write_u8(*reference_kind)?;
            reference_index.write(&mut w)?;
        }
        PoolEntry::MethodType(id) => {
            w.write_u8(16)?;
            id.write(&mut w)?;
        }
        PoolEntry::Dynamic {
            bootstrap_method_attr_index,
            name_and_type_index,
        } => {
            w.write_u8(17)?;
            w.write_u16::<BE>(*bootstrap_method_attr_index)?;
            name_and_type_index.write(&mut w)?;
        }
        PoolEntry::InvokeDynamic {
            bootstrap_method_attr_index,
            name_and_type_index,
        } => {
            w.write_u8(18)?;
            w.write_u16::<BE>(*bootstrap_method_attr_index)?;
            name_and_type_index.write(&mut w)?;
        }
        PoolEntry::Module(id) => {
            w.write_u8(19)?;
            id.write(&mut w)?;
        }
        PoolEntry::Package(id) => {
            w.write_u8(20)?;
            id.write(&mut w)?;
        }
    }
    Ok(())
}
