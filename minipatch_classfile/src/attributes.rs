use crate::{
    code::{EncodedCode, InsnList, Label},
    constant_pool::{ConstantPool, PoolId},
    stack_map::{self, Frame},
    ClassFileError,
};
use byteorder::{ReadBytesExt, WriteBytesExt, BE};
use std::{
    fmt::Debug,
    io::{Cursor, Read, Write},
};

/// An attribute that may be written to a Java class file.
pub(crate) trait Attribute: Debug {
    /// The name of the attribute.
    fn name(&self) -> &str;

    /// Write the attribute body to an output buffer.
    fn write(&self, pool: &mut ConstantPool, out: &mut Vec<u8>) -> Result<(), ClassFileError>;
}

/// Writes a table of attributes, including the count prefix.
pub(crate) fn write_table(
    pool: &mut ConstantPool,
    mut out: impl Write,
    attrs: &[&dyn Attribute],
) -> Result<(), ClassFileError> {
    if attrs.len() > u16::MAX as usize {
        return Err(ClassFileError::TooLarge("attribute table"));
    }
    out.write_u16::<BE>(attrs.len() as u16)?;
    for attr in attrs {
        pool.utf8(attr.name()).write(&mut out)?;
        let mut body = Vec::new();
        attr.write(pool, &mut body)?;
        if body.len() > u32::MAX as usize {
            return Err(ClassFileError::TooLarge("attribute"));
        }
        out.write_u32::<BE>(body.len() as u32)?;
        out.write_all(&body)?;
    }
    Ok(())
}

/// An attribute this model does not interpret, carried through unchanged.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawAttribute {
    pub name: String,
    pub data: Vec<u8>,
}
impl RawAttribute {
    pub(crate) fn read_table(
        mut r: impl Read,
        pool: &ConstantPool,
    ) -> Result<Vec<RawAttribute>, ClassFileError> {
        let count = r.read_u16::<BE>()?;
        let mut attrs = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name = pool.get_utf8(PoolId(r.read_u16::<BE>()?))?.to_string();
            let len = r.read_u32::<BE>()? as usize;
            let mut data = vec![0u8; len];
            r.read_exact(&mut data)?;
            attrs.push(RawAttribute { name, data });
        }
        Ok(attrs)
    }
}
impl Attribute for RawAttribute {
    fn name(&self) -> &str {
        &self.name
    }
    fn write(&self, _: &mut ConstantPool, out: &mut Vec<u8>) -> Result<(), ClassFileError> {
        out.extend_from_slice(&self.data);
        Ok(())
    }
}

/// Represents the `ConstantValue` attribute of a field.
#[derive(Debug)]
pub(crate) struct ConstantValue<'a>(pub(crate) &'a crate::Constant);
impl<'a> Attribute for ConstantValue<'a> {
    fn name(&self) -> &str {
        "ConstantValue"
    }
    fn write(&self, pool: &mut ConstantPool, out: &mut Vec<u8>) -> Result<(), ClassFileError> {
        self.0.intern(pool).write(out)?;
        Ok(())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExceptionHandler {
    pub start: Label,
    pub end: Label,
    pub handler: Label,
    /// The caught class, or `None` for a `finally` handler.
    pub catch_type: Option<String>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LineNumber {
    pub start: Label,
    pub line: u16,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LocalVariable {
    pub start: Label,
    pub end: Label,
    pub name: PoolId,
    pub descriptor: PoolId,
    pub index: u16,
}

#[derive(Clone, Debug)]
enum CodeAttribute {
    LineNumberTable(Vec<LineNumber>),
    LocalVariableTable(Vec<LocalVariable>),
    LocalVariableTypeTable(Vec<LocalVariable>),
    StackMapTable(Vec<Frame>),
    /// Type annotations on instructions, which refer to bytecode offsets without being decoded.
    TypeAnnotations(RawAttribute),
    Raw(RawAttribute),
}
impl CodeAttribute {
    fn raw(attr: RawAttribute) -> CodeAttribute {
        match attr.name.as_str() {
            "RuntimeVisibleTypeAnnotations" | "RuntimeInvisibleTypeAnnotations" => {
                CodeAttribute::TypeAnnotations(attr)
            }
            _ => CodeAttribute::Raw(attr),
        }
    }
}

/// The `Code` attribute of a method: its instructions and everything that refers to them.
#[derive(Clone, Debug)]
pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    pub instructions: InsnList,
    pub exception_table: Vec<ExceptionHandler>,
    attributes: Vec<CodeAttribute>,
}
impl Code {
    pub fn new(max_stack: u16, max_locals: u16, instructions: InsnList) -> Self {
        Code {
            max_stack,
            max_locals,
            instructions,
            exception_table: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// The stack map frames of this method, if it has any.
    pub fn frames(&self) -> Option<&[Frame]> {
        self.attributes.iter().find_map(|x| match x {
            CodeAttribute::StackMapTable(frames) => Some(frames.as_slice()),
            _ => None,
        })
    }
    pub fn line_numbers(&self) -> Option<&[LineNumber]> {
        self.attributes.iter().find_map(|x| match x {
            CodeAttribute::LineNumberTable(lines) => Some(lines.as_slice()),
            _ => None,
        })
    }

    /// The attributes of this method's code that are carried through without being interpreted.
    pub fn raw_attributes(&self) -> impl Iterator<Item = &RawAttribute> + '_ {
        self.attributes.iter().filter_map(|x| match x {
            CodeAttribute::TypeAnnotations(raw) | CodeAttribute::Raw(raw) => Some(raw),
            _ => None,
        })
    }

    /// Adds an attribute that is written out unchanged.
    ///
    /// Type annotations are dropped on write once instructions have moved away from their
    /// decoded offsets, since the offsets inside them would be stale.
    pub fn push_raw_attribute(&mut self, attr: RawAttribute) {
        self.attributes.push(CodeAttribute::raw(attr));
    }

    pub fn set_frames(&mut self, frames: Vec<Frame>) {
        self.attributes.retain(|x| !matches!(x, CodeAttribute::StackMapTable(_)));
        self.attributes.push(CodeAttribute::StackMapTable(frames));
    }
    pub fn set_line_numbers(&mut self, lines: Vec<LineNumber>) {
        self.attributes.retain(|x| !matches!(x, CodeAttribute::LineNumberTable(_)));
        self.attributes.push(CodeAttribute::LineNumberTable(lines));
    }

    /// Decodes a `Code` attribute body.
    ///
    /// Debug entries (line numbers and local variables) that do not point at an instruction
    /// boundary are dropped, as the JVM ignores them anyway.
    pub(crate) fn decode(data: &[u8], pool: &ConstantPool) -> Result<Code, ClassFileError> {
        let mut r = Cursor::new(data);
        let max_stack = r.read_u16::<BE>()?;
        let max_locals = r.read_u16::<BE>()?;
        let code_len = r.read_u32::<BE>()? as usize;
        let mut code = vec![0u8; code_len];
        r.read_exact(&mut code)?;
        let instructions = InsnList::decode(&code, pool)?;

        let mut boundaries = instructions.decoded_offsets();
        boundaries.push(code_len as u32);
        let at = |pc: u32| -> Option<Label> {
            if boundaries.binary_search(&pc).is_ok() {
                Some(Label(pc))
            } else {
                None
            }
        };

        let handler_count = r.read_u16::<BE>()?;
        let mut exception_table = Vec::with_capacity(handler_count as usize);
        for _ in 0..handler_count {
            let start = r.read_u16::<BE>()? as u32;
            let end = r.read_u16::<BE>()? as u32;
            let handler = r.read_u16::<BE>()? as u32;
            let catch_type = match r.read_u16::<BE>()? {
                0 => None,
                id => Some(pool.get_class(PoolId(id))?.to_string()),
            };
            match (at(start), at(end), at(handler)) {
                (Some(start), Some(end), Some(handler)) => {
                    exception_table.push(ExceptionHandler {
                        start,
                        end,
                        handler,
                        catch_type,
                    })
                }
                _ => return Err(ClassFileError::MalformedAttribute("Code")),
            }
        }

        let mut attributes = Vec::new();
        for attr in RawAttribute::read_table(&mut r, pool)? {
            attributes.push(match attr.name.as_str() {
                "LineNumberTable" => {
                    let mut r = Cursor::new(attr.data.as_slice());
                    let count = r.read_u16::<BE>()?;
                    let mut lines = Vec::with_capacity(count as usize);
                    for _ in 0..count {
                        let start = r.read_u16::<BE>()? as u32;
                        let line = r.read_u16::<BE>()?;
                        if let Some(start) = at(start) {
                            lines.push(LineNumber { start, line });
                        }
                    }
                    CodeAttribute::LineNumberTable(lines)
                }
                "LocalVariableTable" => {
                    CodeAttribute::LocalVariableTable(read_locals(&attr.data, &at)?)
                }
                "LocalVariableTypeTable" => {
                    CodeAttribute::LocalVariableTypeTable(read_locals(&attr.data, &at)?)
                }
                "StackMapTable" => CodeAttribute::StackMapTable(stack_map::decode(&attr.data)?),
                _ => CodeAttribute::raw(attr),
            });
        }

        Ok(Code {
            max_stack,
            max_locals,
            instructions,
            exception_table,
            attributes,
        })
    }
}
impl Attribute for Code {
    fn name(&self) -> &str {
        "Code"
    }
    fn write(&self, pool: &mut ConstantPool, out: &mut Vec<u8>) -> Result<(), ClassFileError> {
        let EncodedCode { code, offsets } = self.instructions.encode(pool)?;
        if code.len() > u16::MAX as usize {
            return Err(ClassFileError::TooLarge("method body"));
        }

        // write header
        out.write_u16::<BE>(self.max_stack)?;
        out.write_u16::<BE>(self.max_locals)?;

        // write code
        out.write_u32::<BE>(code.len() as u32)?;
        out.write_all(&code)?;

        // write exception table
        out.write_u16::<BE>(self.exception_table.len() as u16)?;
        for handler in &self.exception_table {
            out.write_u16::<BE>(offsets.resolve(handler.start)? as u16)?;
            out.write_u16::<BE>(offsets.resolve(handler.end)? as u16)?;
            out.write_u16::<BE>(offsets.resolve(handler.handler)? as u16)?;
            match &handler.catch_type {
                Some(class) => pool.class(class).write(&mut *out)?,
                None => out.write_u16::<BE>(0)?,
            }
        }

        // write attributes table
        let mut encoded = Vec::with_capacity(self.attributes.len());
        for attr in &self.attributes {
            let (name, data) = match attr {
                CodeAttribute::LineNumberTable(lines) => {
                    let mut data = Vec::new();
                    data.write_u16::<BE>(lines.len() as u16)?;
                    for line in lines {
                        data.write_u16::<BE>(offsets.resolve(line.start)? as u16)?;
                        data.write_u16::<BE>(line.line)?;
                    }
                    ("LineNumberTable", data)
                }
                CodeAttribute::LocalVariableTable(locals) => {
                    ("LocalVariableTable", write_locals(locals, &offsets)?)
                }
                CodeAttribute::LocalVariableTypeTable(locals) => {
                    ("LocalVariableTypeTable", write_locals(locals, &offsets)?)
                }
                CodeAttribute::StackMapTable(frames) => {
                    ("StackMapTable", stack_map::encode(frames, &offsets)?)
                }
                CodeAttribute::TypeAnnotations(_) if !offsets.keeps_decoded_offsets() => continue,
                CodeAttribute::TypeAnnotations(raw) | CodeAttribute::Raw(raw) => {
                    (raw.name.as_str(), raw.data.clone())
                }
            };
            encoded.push(RawAttribute {
                name: name.to_string(),
                data,
            });
        }
        let table: Vec<&dyn Attribute> = encoded.iter().map(|x| x as &dyn Attribute).collect();
        write_table(pool, out, &table)
    }
}

fn read_locals(
    data: &[u8],
    at: &impl Fn(u32) -> Option<Label>,
) -> Result<Vec<LocalVariable>, ClassFileError> {
    let mut r = Cursor::new(data);
    let count = r.read_u16::<BE>()?;
    let mut locals = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let start = r.read_u16::<BE>()? as u32;
        let length = r.read_u16::<BE>()? as u32;
        let name = PoolId(r.read_u16::<BE>()?);
        let descriptor = PoolId(r.read_u16::<BE>()?);
        let index = r.read_u16::<BE>()?;
        if let (Some(start), Some(end)) = (at(start), at(start + length)) {
            locals.push(LocalVariable {
                start,
                end,
                name,
                descriptor,
                index,
            });
        }
    }
    Ok(locals)
}

fn write_locals(
    locals: &[LocalVariable],
    offsets: &crate::code::LabelOffsets,
) -> Result<Vec<u8>, ClassFileError> {
    let mut data = Vec::new();
    data.write_u16::<BE>(locals.len() as u16)?;
    for local in locals {
        let start = offsets.resolve(local.start)?;
        let end = offsets.resolve(local.end)?;
        data.write_u16::<BE>(start as u16)?;
        data.write_u16::<BE>(end.saturating_sub(start) as u16)?;
        local.name.write(&mut data)?;
        local.descriptor.write(&mut data)?;
        data.write_u16::<BE>(local.index)?;
    }
    Ok(data)
}
