#![deny(unused_must_use)]

//! An editable in-memory model of JVM class files.
//!
//! A class is parsed into a [`ClassModel`], edited through its fields and methods, and written
//! back out. The constant pool of a parsed class is preserved index-for-index, and everything
//! that refers to bytecode offsets is tracked through [`Label`]s, so instructions may be inserted
//! without breaking branches, exception handlers or stack map frames.

mod attributes;
mod code;
mod constant_pool;
mod errors;
mod flags;
mod stack_map;

pub use attributes::{Code, ExceptionHandler, LineNumber, LocalVariable, RawAttribute};
pub use code::{Constant, InsnList, Instruction, Label, MemberRef, Opcode};
pub use constant_pool::{ConstantPool, MemberRefStrs, PoolEntry, PoolId};
pub use errors::ClassFileError;
pub use flags::*;
pub use stack_map::{Frame, FrameKind, VerificationType};

use crate::attributes::{Attribute, ConstantValue};
use byteorder::{ReadBytesExt, WriteBytesExt, BE};
use enumset::EnumSet;
use std::io::{Cursor, Write};

const MAGIC: u32 = 0xCAFEBABE;

#[derive(Clone, Debug)]
pub struct FieldModel {
    pub access: EnumSet<FieldAccessFlags>,
    pub name: String,
    pub descriptor: String,
    /// The value of the field's `ConstantValue` attribute, if it has one.
    pub constant_value: Option<Constant>,
    pub attributes: Vec<RawAttribute>,
}
impl FieldModel {
    pub fn constant_value(&mut self, value: Constant) -> &mut Self {
        self.constant_value = Some(value);
        self
    }
}

#[derive(Clone, Debug)]
pub struct MethodModel {
    pub access: EnumSet<MethodAccessFlags>,
    pub name: String,
    pub descriptor: String,
    /// The body of the method, or `None` for abstract and native methods.
    pub code: Option<Code>,
    pub attributes: Vec<RawAttribute>,
}
impl MethodModel {
    pub fn instructions(&self) -> Option<&InsnList> {
        self.code.as_ref().map(|x| &x.instructions)
    }
    pub fn instructions_mut(&mut self) -> Option<&mut InsnList> {
        self.code.as_mut().map(|x| &mut x.instructions)
    }

    pub fn set_code(&mut self, code: Code) -> &mut Self {
        self.code = Some(code);
        self
    }
}

/// One class file.
#[derive(Clone, Debug)]
pub struct ClassModel {
    pub minor_version: u16,
    pub major_version: u16,
    pub access: EnumSet<ClassAccessFlags>,
    /// The internal name of the class, e.g. `com/example/Main`.
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldModel>,
    pub methods: Vec<MethodModel>,
    pub attributes: Vec<RawAttribute>,
    pool: ConstantPool,
}
impl ClassModel {
    /// Creates an empty class extending `java/lang/Object`, targeting Java 8.
    pub fn new(access: EnumSet<ClassAccessFlags>, name: &str) -> Self {
        ClassModel {
            minor_version: 0,
            major_version: 52,
            access,
            name: name.to_string(),
            super_name: Some("java/lang/Object".to_string()),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
            pool: ConstantPool::new(),
        }
    }

    /// Parses a class file.
    pub fn parse(data: &[u8]) -> Result<ClassModel, ClassFileError> {
        let mut r = Cursor::new(data);
        let magic = r.read_u32::<BE>()?;
        if magic != MAGIC {
            return Err(ClassFileError::BadMagic(magic));
        }
        let minor_version = r.read_u16::<BE>()?;
        let major_version = r.read_u16::<BE>()?;
        let pool = ConstantPool::read(&mut r)?;

        let access = flags::decode(r.read_u16::<BE>()?);
        let name = pool.get_class(PoolId(r.read_u16::<BE>()?))?.to_string();
        let super_name = match r.read_u16::<BE>()? {
            0 => None,
            id => Some(pool.get_class(PoolId(id))?.to_string()),
        };
        let interface_count = r.read_u16::<BE>()?;
        let mut interfaces = Vec::with_capacity(interface_count as usize);
        for _ in 0..interface_count {
            interfaces.push(pool.get_class(PoolId(r.read_u16::<BE>()?))?.to_string());
        }

        let field_count = r.read_u16::<BE>()?;
        let mut fields = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            let access = flags::decode(r.read_u16::<BE>()?);
            let name = pool.get_utf8(PoolId(r.read_u16::<BE>()?))?.to_string();
            let descriptor = pool.get_utf8(PoolId(r.read_u16::<BE>()?))?.to_string();
            let mut constant_value = None;
            let mut attributes = Vec::new();
            for attr in RawAttribute::read_table(&mut r, &pool)? {
                if attr.name == "ConstantValue" && constant_value.is_none() {
                    let id = Cursor::new(&attr.data).read_u16::<BE>()?;
                    constant_value = Some(Constant::resolve(&pool, PoolId(id), false)?);
                } else {
                    attributes.push(attr);
                }
            }
            fields.push(FieldModel {
                access,
                name,
                descriptor,
                constant_value,
                attributes,
            });
        }

        let method_count = r.read_u16::<BE>()?;
        let mut methods = Vec::with_capacity(method_count as usize);
        for _ in 0..method_count {
            let access = flags::decode(r.read_u16::<BE>()?);
            let name = pool.get_utf8(PoolId(r.read_u16::<BE>()?))?.to_string();
            let descriptor = pool.get_utf8(PoolId(r.read_u16::<BE>()?))?.to_string();
            let mut code = None;
            let mut attributes = Vec::new();
            for attr in RawAttribute::read_table(&mut r, &pool)? {
                if attr.name == "Code" && code.is_none() {
                    code = Some(Code::decode(&attr.data, &pool)?);
                } else {
                    attributes.push(attr);
                }
            }
            methods.push(MethodModel {
                access,
                name,
                descriptor,
                code,
                attributes,
            });
        }

        let attributes = RawAttribute::read_table(&mut r, &pool)?;

        Ok(ClassModel {
            minor_version,
            major_version,
            access,
            name,
            super_name,
            interfaces,
            fields,
            methods,
            attributes,
            pool,
        })
    }

    pub fn pool(&self) -> &ConstantPool {
        &self.pool
    }
    pub fn pool_mut(&mut self) -> &mut ConstantPool {
        &mut self.pool
    }

    pub fn field(
        &mut self,
        access: EnumSet<FieldAccessFlags>,
        name: &str,
        descriptor: &str,
    ) -> &mut FieldModel {
        self.fields.push(FieldModel {
            access,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            constant_value: None,
            attributes: Vec::new(),
        });
        let idx = self.fields.len() - 1;
        &mut self.fields[idx]
    }
    pub fn method(
        &mut self,
        access: EnumSet<MethodAccessFlags>,
        name: &str,
        descriptor: &str,
    ) -> &mut MethodModel {
        self.methods.push(MethodModel {
            access,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            code: None,
            attributes: Vec::new(),
        });
        let idx = self.methods.len() - 1;
        &mut self.methods[idx]
    }

    /// Writes the class file. New constants are appended to the existing constant pool.
    pub fn write(&mut self, mut write: impl Write) -> Result<(), ClassFileError> {
        let pool = &mut self.pool;

        // write classfile body
        let mut body = Vec::<u8>::new();
        body.write_u16::<BE>(self.access.as_u16())?;
        pool.class(&self.name).write(&mut body)?;
        match &self.super_name {
            Some(name) => pool.class(name).write(&mut body)?,
            None => body.write_u16::<BE>(0)?,
        }
        if self.interfaces.len() > u16::MAX as usize {
            return Err(ClassFileError::TooLarge("interface table"));
        }
        body.write_u16::<BE>(self.interfaces.len() as u16)?;
        for interface in &self.interfaces {
            pool.class(interface).write(&mut body)?;
        }

        // write fields
        if self.fields.len() > u16::MAX as usize {
            return Err(ClassFileError::TooLarge("field table"));
        }
        body.write_u16::<BE>(self.fields.len() as u16)?;
        for field in &self.fields {
            body.write_u16::<BE>(field.access.as_u16())?;
            pool.utf8(&field.name).write(&mut body)?;
            pool.utf8(&field.descriptor).write(&mut body)?;

            let constant = field.constant_value.as_ref().map(ConstantValue);
            let mut table: Vec<&dyn Attribute> = Vec::new();
            if let Some(constant) = &constant {
                table.push(constant);
            }
            table.extend(field.attributes.iter().map(|x| x as &dyn Attribute));
            attributes::write_table(pool, &mut body, &table)?;
        }

        // write methods
        if self.methods.len() > u16::MAX as usize {
            return Err(ClassFileError::TooLarge("method table"));
        }
        body.write_u16::<BE>(self.methods.len() as u16)?;
        for method in &self.methods {
            body.write_u16::<BE>(method.access.as_u16())?;
            pool.utf8(&method.name).write(&mut body)?;
            pool.utf8(&method.descriptor).write(&mut body)?;

            let mut table: Vec<&dyn Attribute> = Vec::new();
            if let Some(code) = &method.code {
                table.push(code);
            }
            table.extend(method.attributes.iter().map(|x| x as &dyn Attribute));
            attributes::write_table(pool, &mut body, &table)?;
        }

        // write attributes
        let table: Vec<&dyn Attribute> =
            self.attributes.iter().map(|x| x as &dyn Attribute).collect();
        attributes::write_table(pool, &mut body, &table)?;

        // the constant pool goes last, since writing everything else may add to it
        write.write_u32::<BE>(MAGIC)?;
        write.write_u16::<BE>(self.minor_version)?;
        write.write_u16::<BE>(self.major_version)?;
        pool.write(&mut write)?;
        write.write_all(&body)?;

        Ok(())
    }

    pub fn to_vec(&mut self) -> Result<Vec<u8>, ClassFileError> {
        let mut out = Vec::new();
        self.write(&mut out)?;
        Ok(out)
    }

    pub fn find_field(&self, name: &str) -> Option<&FieldModel> {
        self.fields.iter().find(|x| x.name == name)
    }
}
