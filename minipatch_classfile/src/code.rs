use crate::{
    constant_pool::{ConstantPool, PoolEntry, PoolId},
    ClassFileError,
};
use byteorder::{ReadBytesExt, WriteBytesExt, BE};
use std::{
    borrow::Cow,
    collections::{HashMap, HashSet},
    io::Cursor,
};

const WIDE: u8 = 0xc4;

// labels handed out to new instructions never collide with bytecode offsets
const FIRST_FRESH_LABEL: u32 = 0x1_0000;

/// A position in an instruction list that branches and tables refer to.
///
/// Labels created while decoding are named after the bytecode offset of the instruction they
/// mark, so they stay attached to that instruction when other instructions are inserted before
/// it.
#[derive(Copy, Clone, Debug, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct Label(pub(crate) u32);

/// A reference to a field or method, as used by field access and invoke instructions.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct MemberRef {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    pub interface: bool,
}
impl MemberRef {
    pub fn new(owner: &str, name: &str, descriptor: &str) -> Self {
        MemberRef {
            owner: owner.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            interface: false,
        }
    }

    fn intern(&self, opcode: Opcode, pool: &mut ConstantPool) -> PoolId {
        if opcode.is_field_access() {
            pool.field_ref(&self.owner, &self.name, &self.descriptor)
        } else if self.interface {
            pool.interface_method_ref(&self.owner, &self.name, &self.descriptor)
        } else {
            pool.method_ref(&self.owner, &self.name, &self.descriptor)
        }
    }
}

/// A loadable constant, either an `ldc` operand or the value of a `ConstantValue` attribute.
#[derive(Clone, Debug, PartialEq)]
pub enum Constant {
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    String(String),
    Class(String),
    /// A method handle, method type or dynamic constant, kept as a raw pool reference.
    Pool { id: PoolId, wide: bool },
}
impl Constant {
    pub(crate) fn resolve(
        pool: &ConstantPool,
        id: PoolId,
        wide: bool,
    ) -> Result<Constant, ClassFileError> {
        Ok(match pool.get(id)? {
            PoolEntry::Integer(v) => Constant::Integer(*v),
            PoolEntry::Float(v) => Constant::Float(f32::from_bits(*v)),
            PoolEntry::Long(v) => Constant::Long(*v),
            PoolEntry::Double(v) => Constant::Double(f64::from_bits(*v)),
            PoolEntry::String(str) => Constant::String(pool.get_utf8(*str)?.to_string()),
            PoolEntry::Class(name) => Constant::Class(pool.get_utf8(*name)?.to_string()),
            PoolEntry::MethodHandle { .. }
            | PoolEntry::MethodType(_)
            | PoolEntry::Dynamic { .. } => Constant::Pool { id, wide },
            _ => {
                return Err(ClassFileError::UnexpectedPoolEntry {
                    index: id.0,
                    expected: "loadable constant",
                    found: "other",
                })
            }
        })
    }

    pub(crate) fn intern(&self, pool: &mut ConstantPool) -> PoolId {
        match self {
            Constant::Integer(v) => pool.integer(*v),
            Constant::Float(v) => pool.float(*v),
            Constant::Long(v) => pool.long(*v),
            Constant::Double(v) => pool.double(*v),
            Constant::String(v) => pool.string(v),
            Constant::Class(v) => pool.class(v),
            Constant::Pool { id, .. } => *id,
        }
    }

    fn is_wide(&self) -> bool {
        match self {
            Constant::Long(_) | Constant::Double(_) => true,
            Constant::Pool { wide, .. } => *wide,
            _ => false,
        }
    }

    /// Returns the string value, if this is a string constant.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Constant::String(str) => Some(str),
            _ => None,
        }
    }
}

/// A single decoded instruction, with its operands resolved out of the constant pool.
#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    /// An instruction with no operands.
    Basic(Opcode),
    BiPush(i8),
    SiPush(i16),
    /// `ldc`, `ldc_w` or `ldc2_w`. The encoding is picked when the method is written.
    Ldc(Constant),
    /// A load, store or `ret` with an explicit local variable index.
    Local { opcode: Opcode, index: u16 },
    Iinc { index: u16, delta: i16 },
    Jump { opcode: Opcode, target: Label },
    TableSwitch {
        default: Label,
        low: i32,
        targets: Vec<Label>,
    },
    LookupSwitch {
        default: Label,
        pairs: Vec<(i32, Label)>,
    },
    Field { opcode: Opcode, field: MemberRef },
    Invoke { opcode: Opcode, method: MemberRef },
    InvokeDynamic(PoolId),
    /// `new`, `anewarray`, `checkcast` or `instanceof`.
    Type { opcode: Opcode, class: String },
    NewArray(u8),
    MultiANewArray { class: String, dimensions: u8 },
}
impl Instruction {
    pub fn invokestatic(owner: &str, name: &str, sig: &str) -> Self {
        Instruction::Invoke {
            opcode: Opcode::invokestatic,
            method: MemberRef::new(owner, name, sig),
        }
    }
    pub fn invokevirtual(owner: &str, name: &str, sig: &str) -> Self {
        Instruction::Invoke {
            opcode: Opcode::invokevirtual,
            method: MemberRef::new(owner, name, sig),
        }
    }
    pub fn invokespecial(owner: &str, name: &str, sig: &str) -> Self {
        Instruction::Invoke {
            opcode: Opcode::invokespecial,
            method: MemberRef::new(owner, name, sig),
        }
    }
    pub fn getstatic(owner: &str, name: &str, ty: &str) -> Self {
        Instruction::Field {
            opcode: Opcode::getstatic,
            field: MemberRef::new(owner, name, ty),
        }
    }
    pub fn putstatic(owner: &str, name: &str, ty: &str) -> Self {
        Instruction::Field {
            opcode: Opcode::putstatic,
            field: MemberRef::new(owner, name, ty),
        }
    }
    pub fn new_object(ty: &str) -> Self {
        Instruction::Type {
            opcode: Opcode::new,
            class: ty.to_string(),
        }
    }
    pub fn aconst_str(str: &str) -> Self {
        Instruction::Ldc(Constant::String(str.to_string()))
    }
    pub fn iconst(v: i32) -> Self {
        match v {
            -1 => Instruction::Basic(Opcode::iconst_m1),
            0 => Instruction::Basic(Opcode::iconst_0),
            1 => Instruction::Basic(Opcode::iconst_1),
            2 => Instruction::Basic(Opcode::iconst_2),
            3 => Instruction::Basic(Opcode::iconst_3),
            4 => Instruction::Basic(Opcode::iconst_4),
            5 => Instruction::Basic(Opcode::iconst_5),
            _ if v <= i8::MAX as i32 && v >= i8::MIN as i32 => Instruction::BiPush(v as i8),
            _ if v <= i16::MAX as i32 && v >= i16::MIN as i32 => Instruction::SiPush(v as i16),
            _ => Instruction::Ldc(Constant::Integer(v)),
        }
    }

    /// The opcode of this instruction. Constant loads always report `ldc`.
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Basic(op) => *op,
            Instruction::BiPush(_) => Opcode::bipush,
            Instruction::SiPush(_) => Opcode::sipush,
            Instruction::Ldc(_) => Opcode::ldc,
            Instruction::Local { opcode, .. } => *opcode,
            Instruction::Iinc { .. } => Opcode::iinc,
            Instruction::Jump { opcode, .. } => *opcode,
            Instruction::TableSwitch { .. } => Opcode::tableswitch,
            Instruction::LookupSwitch { .. } => Opcode::lookupswitch,
            Instruction::Field { opcode, .. } => *opcode,
            Instruction::Invoke { opcode, .. } => *opcode,
            Instruction::InvokeDynamic(_) => Opcode::invokedynamic,
            Instruction::Type { opcode, .. } => *opcode,
            Instruction::NewArray(_) => Opcode::newarray,
            Instruction::MultiANewArray { .. } => Opcode::multianewarray,
        }
    }

    /// Returns the loaded string, if this instruction loads a string constant.
    pub fn string_constant(&self) -> Option<&str> {
        match self {
            Instruction::Ldc(constant) => constant.as_str(),
            _ => None,
        }
    }

    fn intern(&self, pool: &mut ConstantPool) -> Option<PoolId> {
        match self {
            Instruction::Ldc(constant) => Some(constant.intern(pool)),
            Instruction::Field { opcode, field } => Some(field.intern(*opcode, pool)),
            Instruction::Invoke { opcode, method } => Some(method.intern(*opcode, pool)),
            Instruction::InvokeDynamic(id) => Some(*id),
            Instruction::Type { class, .. } | Instruction::MultiANewArray { class, .. } => {
                Some(pool.class(class))
            }
            _ => None,
        }
    }

    fn size(&self, offset: u32, pool_id: Option<PoolId>) -> u32 {
        let pad = (4 - (offset + 1) % 4) % 4;
        match self {
            Instruction::Basic(_) => 1,
            Instruction::BiPush(_) => 2,
            Instruction::SiPush(_) => 3,
            Instruction::Ldc(constant) => {
                if constant.is_wide() || pool_id.map_or(0, |x| x.0) > u8::MAX as u16 {
                    3
                } else {
                    2
                }
            }
            Instruction::Local { index, .. } => {
                if *index > u8::MAX as u16 {
                    4
                } else {
                    2
                }
            }
            Instruction::Iinc { index, delta } => {
                if *index > u8::MAX as u16 || *delta > i8::MAX as i16 || *delta < i8::MIN as i16
                {
                    6
                } else {
                    3
                }
            }
            Instruction::Jump { opcode, .. } => {
                if opcode.is_wide_jump() {
                    5
                } else {
                    3
                }
            }
            Instruction::TableSwitch { targets, .. } => 1 + pad + 12 + 4 * targets.len() as u32,
            Instruction::LookupSwitch { pairs, .. } => 1 + pad + 8 + 8 * pairs.len() as u32,
            Instruction::Field { .. } => 3,
            Instruction::Invoke { opcode, .. } => {
                if *opcode == Opcode::invokeinterface {
                    5
                } else {
                    3
                }
            }
            Instruction::InvokeDynamic(_) => 5,
            Instruction::Type { .. } => 3,
            Instruction::NewArray(_) => 2,
            Instruction::MultiANewArray { .. } => 4,
        }
    }

    fn write(
        &self,
        offset: u32,
        pool_id: Option<PoolId>,
        offsets: &LabelOffsets,
        out: &mut Vec<u8>,
    ) -> Result<(), ClassFileError> {
        let relative = |target: &Label| -> Result<i32, ClassFileError> {
            Ok(offsets.resolve(*target)? as i32 - offset as i32)
        };
        let pool_id = || pool_id.ok_or(ClassFileError::MalformedCode("operand was not interned"));

        match self {
            Instruction::Basic(op) => out.write_u8(op.opcode())?,
            Instruction::BiPush(v) => {
                out.write_u8(Opcode::bipush.opcode())?;
                out.write_i8(*v)?;
            }
            Instruction::SiPush(v) => {
                out.write_u8(Opcode::sipush.opcode())?;
                out.write_i16::<BE>(*v)?;
            }
            Instruction::Ldc(constant) => {
                let id = pool_id()?;
                if constant.is_wide() {
                    out.write_u8(Opcode::ldc2_w.opcode())?;
                    id.write(&mut *out)?;
                } else if id.0 > u8::MAX as u16 {
                    out.write_u8(Opcode::ldc_w.opcode())?;
                    id.write(&mut *out)?;
                } else {
                    out.write_u8(Opcode::ldc.opcode())?;
                    out.write_u8(id.0 as u8)?;
                }
            }
            Instruction::Local { opcode, index } => {
                if *index <= u8::MAX as u16 {
                    out.write_u8(opcode.opcode())?;
                    out.write_u8(*index as u8)?;
                } else {
                    out.write_u8(WIDE)?;
                    out.write_u8(opcode.opcode())?;
                    out.write_u16::<BE>(*index)?;
                }
            }
            Instruction::Iinc { index, delta } => {
                if self.size(offset, None) == 3 {
                    out.write_u8(Opcode::iinc.opcode())?;
                    out.write_u8(*index as u8)?;
                    out.write_i8(*delta as i8)?;
                } else {
                    out.write_u8(WIDE)?;
                    out.write_u8(Opcode::iinc.opcode())?;
                    out.write_u16::<BE>(*index)?;
                    out.write_i16::<BE>(*delta)?;
                }
            }
            Instruction::Jump { opcode, target } => {
                let rel = relative(target)?;
                out.write_u8(opcode.opcode())?;
                if opcode.is_wide_jump() {
                    out.write_i32::<BE>(rel)?;
                } else if rel > i16::MAX as i32 || rel < i16::MIN as i32 {
                    return Err(ClassFileError::BranchOutOfRange {
                        offset,
                        relative: rel,
                    });
                } else {
                    out.write_i16::<BE>(rel as i16)?;
                }
            }
            Instruction::TableSwitch {
                default,
                low,
                targets,
            } => {
                out.write_u8(Opcode::tableswitch.opcode())?;
                write_padding(offset, out)?;
                out.write_i32::<BE>(relative(default)?)?;
                out.write_i32::<BE>(*low)?;
                out.write_i32::<BE>(*low + targets.len() as i32 - 1)?;
                for target in targets {
                    out.write_i32::<BE>(relative(target)?)?;
                }
            }
            Instruction::LookupSwitch { default, pairs } => {
                out.write_u8(Opcode::lookupswitch.opcode())?;
                write_padding(offset, out)?;
                out.write_i32::<BE>(relative(default)?)?;
                out.write_i32::<BE>(pairs.len() as i32)?;
                for (key, target) in pairs {
                    out.write_i32::<BE>(*key)?;
                    out.write_i32::<BE>(relative(target)?)?;
                }
            }
            Instruction::Field { opcode, .. } | Instruction::Type { opcode, .. } => {
                out.write_u8(opcode.opcode())?;
                pool_id()?.write(&mut *out)?;
            }
            Instruction::Invoke { opcode, method } => {
                out.write_u8(opcode.opcode())?;
                pool_id()?.write(&mut *out)?;
                if *opcode == Opcode::invokeinterface {
                    out.write_u8(interface_arg_count(&method.descriptor))?;
                    out.write_u8(0)?;
                }
            }
            Instruction::InvokeDynamic(id) => {
                out.write_u8(Opcode::invokedynamic.opcode())?;
                id.write(&mut *out)?;
                out.write_u16::<BE>(0)?;
            }
            Instruction::NewArray(atype) => {
                out.write_u8(Opcode::newarray.opcode())?;
                out.write_u8(*atype)?;
            }
            Instruction::MultiANewArray { dimensions, .. } => {
                out.write_u8(Opcode::multianewarray.opcode())?;
                pool_id()?.write(&mut *out)?;
                out.write_u8(*dimensions)?;
            }
        }
        Ok(())
    }
}

fn write_padding(offset: u32, out: &mut Vec<u8>) -> Result<(), ClassFileError> {
    for _ in 0..(4 - (offset + 1) % 4) % 4 {
        out.write_u8(0)?;
    }
    Ok(())
}

/// The `count` operand of `invokeinterface`: one slot for the receiver plus the argument slots.
fn interface_arg_count(descriptor: &str) -> u8 {
    let mut count = 1u8;
    let mut chars = descriptor.chars().skip(1).peekable();
    while let Some(ch) = chars.next() {
        match ch {
            ')' => break,
            'J' | 'D' => count += 2,
            'L' => {
                for ch in chars.by_ref() {
                    if ch == ';' {
                        break;
                    }
                }
                count += 1;
            }
            '[' => {
                while chars.peek() == Some(&'[') {
                    chars.next();
                }
                if chars.next() == Some('L') {
                    for ch in chars.by_ref() {
                        if ch == ';' {
                            break;
                        }
                    }
                }
                count += 1;
            }
            _ => count += 1,
        }
    }
    count
}

#[derive(Clone, Debug)]
struct InsnNode {
    label: Option<Label>,
    insn: Instruction,
}

/// An ordered, editable sequence of instructions.
///
/// Inserting or removing instructions never reorders the remaining ones. Equality only compares
/// the instructions themselves, not the labels attached to them.
#[derive(Clone, Debug)]
pub struct InsnList {
    nodes: Vec<InsnNode>,
    end: Label,
    next_label: u32,
}
impl Default for InsnList {
    fn default() -> Self {
        InsnList {
            nodes: Vec::new(),
            end: Label(FIRST_FRESH_LABEL),
            next_label: FIRST_FRESH_LABEL + 1,
        }
    }
}
impl InsnList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.nodes.get(index).map(|x| &x.insn)
    }
    pub fn first(&self) -> Option<&Instruction> {
        self.get(0)
    }
    pub fn iter(&self) -> impl Iterator<Item = &Instruction> + '_ {
        self.nodes.iter().map(|x| &x.insn)
    }
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Instruction> + '_ {
        self.nodes.iter_mut().map(|x| &mut x.insn)
    }
    pub fn to_vec(&self) -> Vec<Instruction> {
        self.iter().cloned().collect()
    }

    /// Inserts an instruction before the instruction currently at `index`.
    ///
    /// Labels stay attached to the instructions they were attached to, so branches that
    /// targeted the displaced instruction still target it.
    pub fn insert(&mut self, index: usize, insn: Instruction) {
        self.nodes.insert(index, InsnNode { label: None, insn });
    }
    pub fn prepend(&mut self, insn: Instruction) {
        self.insert(0, insn);
    }
    pub fn push(&mut self, insn: Instruction) -> &mut Self {
        self.nodes.push(InsnNode { label: None, insn });
        self
    }
    pub fn remove(&mut self, index: usize) -> Instruction {
        self.nodes.remove(index).insn
    }

    /// Returns the label of the instruction at `index`, creating one if needed.
    pub fn label(&mut self, index: usize) -> Label {
        let next_label = &mut self.next_label;
        *self.nodes[index].label.get_or_insert_with(|| {
            let label = Label(*next_label);
            *next_label += 1;
            label
        })
    }

    /// The label marking the end of the instruction list.
    pub fn end_label(&self) -> Label {
        self.end
    }

    /// The offsets of all instructions that came out of the decoder, in ascending order.
    pub(crate) fn decoded_offsets(&self) -> Vec<u32> {
        self.nodes
            .iter()
            .filter_map(|x| x.label)
            .map(|x| x.0)
            .filter(|x| *x < FIRST_FRESH_LABEL)
            .collect()
    }

    pub(crate) fn decode(code: &[u8], pool: &ConstantPool) -> Result<InsnList, ClassFileError> {
        let mut r = Cursor::new(code);
        let mut nodes = Vec::new();
        let mut targets = Vec::new();

        while (r.position() as usize) < code.len() {
            let pc = r.position() as u32;
            let byte = r.read_u8()?;
            let branch = |rel: i32| -> Result<Label, ClassFileError> {
                let target = pc as i64 + rel as i64;
                if target < 0 || target >= code.len() as i64 {
                    Err(ClassFileError::InvalidLabel(target.max(0) as u32))
                } else {
                    Ok(Label(target as u32))
                }
            };
            let unknown = |opcode: u8| ClassFileError::UnknownOpcode { opcode, offset: pc };

            let insn = if byte == WIDE {
                let op = r.read_u8()?;
                match Opcode::from_u8(op) {
                    Some(Opcode::iinc) => Instruction::Iinc {
                        index: r.read_u16::<BE>()?,
                        delta: r.read_i16::<BE>()?,
                    },
                    Some(opcode) if opcode.operands() == Operands::Local => {
                        Instruction::Local {
                            opcode,
                            index: r.read_u16::<BE>()?,
                        }
                    }
                    _ => return Err(unknown(op)),
                }
            } else {
                let opcode = match Opcode::from_u8(byte) {
                    Some(opcode) => opcode,
                    None => return Err(unknown(byte)),
                };
                match opcode.operands() {
                    Operands::None => Instruction::Basic(opcode),
                    Operands::Byte if opcode == Opcode::bipush => {
                        Instruction::BiPush(r.read_i8()?)
                    }
                    Operands::Byte => Instruction::NewArray(r.read_u8()?),
                    Operands::Short => Instruction::SiPush(r.read_i16::<BE>()?),
                    Operands::Ldc => {
                        let id = PoolId(r.read_u8()? as u16);
                        Instruction::Ldc(Constant::resolve(pool, id, false)?)
                    }
                    Operands::LdcW => {
                        let id = PoolId(r.read_u16::<BE>()?);
                        let wide = opcode == Opcode::ldc2_w;
                        Instruction::Ldc(Constant::resolve(pool, id, wide)?)
                    }
                    Operands::Local => Instruction::Local {
                        opcode,
                        index: r.read_u8()? as u16,
                    },
                    Operands::Iinc => Instruction::Iinc {
                        index: r.read_u8()? as u16,
                        delta: r.read_i8()? as i16,
                    },
                    Operands::Branch => {
                        let target = branch(r.read_i16::<BE>()? as i32)?;
                        targets.push(target);
                        Instruction::Jump { opcode, target }
                    }
                    Operands::BranchWide => {
                        let target = branch(r.read_i32::<BE>()?)?;
                        targets.push(target);
                        Instruction::Jump { opcode, target }
                    }
                    Operands::TableSwitch => {
                        r.set_position(r.position() + ((4 - (pc + 1) % 4) % 4) as u64);
                        let default = branch(r.read_i32::<BE>()?)?;
                        let low = r.read_i32::<BE>()?;
                        let high = r.read_i32::<BE>()?;
                        if high < low {
                            return Err(ClassFileError::MalformedCode("tableswitch high < low"));
                        }
                        let mut table = Vec::new();
                        for _ in 0..(high as i64 - low as i64 + 1) {
                            table.push(branch(r.read_i32::<BE>()?)?);
                        }
                        targets.push(default);
                        targets.extend(table.iter().copied());
                        Instruction::TableSwitch {
                            default,
                            low,
                            targets: table,
                        }
                    }
                    Operands::LookupSwitch => {
                        r.set_position(r.position() + ((4 - (pc + 1) % 4) % 4) as u64);
                        let default = branch(r.read_i32::<BE>()?)?;
                        let npairs = r.read_i32::<BE>()?;
                        if npairs < 0 {
                            return Err(ClassFileError::MalformedCode("lookupswitch npairs < 0"));
                        }
                        let mut pairs = Vec::new();
                        for _ in 0..npairs {
                            let key = r.read_i32::<BE>()?;
                            pairs.push((key, branch(r.read_i32::<BE>()?)?));
                        }
                        targets.push(default);
                        targets.extend(pairs.iter().map(|x| x.1));
                        Instruction::LookupSwitch { default, pairs }
                    }
                    Operands::Field => {
                        let id = PoolId(r.read_u16::<BE>()?);
                        Instruction::Field {
                            opcode,
                            field: member_ref(pool, id)?,
                        }
                    }
                    Operands::Invoke => {
                        let id = PoolId(r.read_u16::<BE>()?);
                        if opcode == Opcode::invokeinterface {
                            r.read_u16::<BE>()?; // count, zero
                        }
                        Instruction::Invoke {
                            opcode,
                            method: member_ref(pool, id)?,
                        }
                    }
                    Operands::InvokeDynamic => {
                        let id = PoolId(r.read_u16::<BE>()?);
                        r.read_u16::<BE>()?;
                        Instruction::InvokeDynamic(id)
                    }
                    Operands::Type => {
                        let id = PoolId(r.read_u16::<BE>()?);
                        Instruction::Type {
                            opcode,
                            class: pool.get_class(id)?.to_string(),
                        }
                    }
                    Operands::MultiANewArray => {
                        let id = PoolId(r.read_u16::<BE>()?);
                        Instruction::MultiANewArray {
                            class: pool.get_class(id)?.to_string(),
                            dimensions: r.read_u8()?,
                        }
                    }
                }
            };
            nodes.push(InsnNode {
                label: Some(Label(pc)),
                insn,
            });
        }

        let starts: HashSet<_> = nodes.iter().filter_map(|x| x.label).collect();
        for target in targets {
            if !starts.contains(&target) {
                return Err(ClassFileError::InvalidLabel(target.0));
            }
        }

        Ok(InsnList {
            nodes,
            end: Label(code.len() as u32),
            next_label: FIRST_FRESH_LABEL,
        })
    }

    /// Encodes the list into bytecode.
    ///
    /// A `goto` or `jsr` that no longer reaches its target with a 16-bit offset is written as
    /// `goto_w` or `jsr_w`. Conditional branches have no wide form, and fail with
    /// [`ClassFileError::BranchOutOfRange`] instead.
    pub(crate) fn encode(&self, pool: &mut ConstantPool) -> Result<EncodedCode, ClassFileError> {
        let ids: Vec<_> = self.nodes.iter().map(|x| x.insn.intern(pool)).collect();
        let mut insns: Vec<_> = self.nodes.iter().map(|x| Cow::Borrowed(&x.insn)).collect();

        // widening only grows the code, so this settles
        loop {
            let (offsets, node_offsets, len) = self.layout(&insns, &ids);

            let mut widened = false;
            for (insn, offset) in insns.iter_mut().zip(&node_offsets) {
                let (opcode, target) = match insn.as_ref() {
                    Instruction::Jump { opcode, target } => (*opcode, *target),
                    _ => continue,
                };
                let wide = match opcode {
                    Opcode::goto => Opcode::goto_w,
                    Opcode::jsr => Opcode::jsr_w,
                    _ => continue,
                };
                let rel = offsets.resolve(target)? as i64 - *offset as i64;
                if rel > i16::MAX as i64 || rel < i16::MIN as i64 {
                    *insn = Cow::Owned(Instruction::Jump {
                        opcode: wide,
                        target,
                    });
                    widened = true;
                }
            }
            if widened {
                continue;
            }

            let mut code = Vec::with_capacity(len as usize);
            for ((insn, id), offset) in insns.iter().zip(&ids).zip(&node_offsets) {
                insn.write(*offset, *id, &offsets, &mut code)?;
            }
            debug_assert_eq!(code.len() as u32, len);
            return Ok(EncodedCode { code, offsets });
        }
    }

    fn layout(
        &self,
        insns: &[Cow<'_, Instruction>],
        ids: &[Option<PoolId>],
    ) -> (LabelOffsets, Vec<u32>, u32) {
        let mut offsets = LabelOffsets::default();
        let mut node_offsets = Vec::with_capacity(insns.len());
        let mut offset = 0u32;
        for ((node, insn), id) in self.nodes.iter().zip(insns).zip(ids) {
            if let Some(label) = node.label {
                offsets.0.insert(label, offset);
            }
            node_offsets.push(offset);
            offset += insn.size(offset, *id);
        }
        offsets.0.insert(self.end, offset);
        (offsets, node_offsets, offset)
    }
}
impl PartialEq for InsnList {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}
impl From<Vec<Instruction>> for InsnList {
    fn from(vec: Vec<Instruction>) -> Self {
        vec.into_iter().collect()
    }
}
impl FromIterator<Instruction> for InsnList {
    fn from_iter<T: IntoIterator<Item = Instruction>>(iter: T) -> Self {
        let mut list = InsnList::new();
        for insn in iter {
            list.push(insn);
        }
        list
    }
}

fn member_ref(pool: &ConstantPool, id: PoolId) -> Result<MemberRef, ClassFileError> {
    let strs = pool.get_member_ref(id)?;
    Ok(MemberRef {
        owner: strs.owner.to_string(),
        name: strs.name.to_string(),
        descriptor: strs.descriptor.to_string(),
        interface: strs.interface,
    })
}

/// The new bytecode offset of every label in an encoded instruction list.
#[derive(Debug, Default)]
pub(crate) struct LabelOffsets(HashMap<Label, u32>);
impl LabelOffsets {
    pub(crate) fn resolve(&self, label: Label) -> Result<u32, ClassFileError> {
        match self.0.get(&label) {
            Some(x) => Ok(*x),
            None => Err(ClassFileError::InvalidLabel(label.0)),
        }
    }

    /// Whether every decoded instruction is still at the offset it was decoded from.
    pub(crate) fn keeps_decoded_offsets(&self) -> bool {
        self.0
            .iter()
            .filter(|(label, _)| label.0 < FIRST_FRESH_LABEL)
            .all(|(label, offset)| label.0 == *offset)
    }
}

pub(crate) struct EncodedCode {
    pub(crate) code: Vec<u8>,
    pub(crate) offsets: LabelOffsets,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Operands {
    None,
    Byte,
    Short,
    Ldc,
    LdcW,
    Local,
    Iinc,
    Branch,
    BranchWide,
    TableSwitch,
    LookupSwitch,
    Field,
    Invoke,
    InvokeDynamic,
    Type,
    MultiANewArray,
}

macro_rules! opcodes {
    ($($hex:literal $name:ident,)*) => {
        /// A JVM opcode. The `wide` prefix is not an opcode of its own here.
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        #[allow(non_camel_case_types)]
        pub enum Opcode {
            $($name,)*
        }
        impl Opcode {
            pub fn opcode(&self) -> u8 {
                match *self {
                    $(Opcode::$name => $hex,)*
                }
            }
            pub fn from_u8(byte: u8) -> Option<Opcode> {
                match byte {
                    $($hex => Some(Opcode::$name),)*
                    _ => None,
                }
            }
            pub fn name(&self) -> &'static str {
                match *self {
                    $(Opcode::$name => stringify!($name),)*
                }
            }
        }
    };
}
opcodes! {
    0x00 nop,
    0x01 aconst_null,
    0x02 iconst_m1,
    0x03 iconst_0,
    0x04 iconst_1,
    0x05 iconst_2,
    0x06 iconst_3,
    0x07 iconst_4,
    0x08 iconst_5,
    0x09 lconst_0,
    0x0a lconst_1,
    0x0b fconst_0,
    0x0c fconst_1,
    0x0d fconst_2,
    0x0e dconst_0,
    0x0f dconst_1,
    0x10 bipush,
    0x11 sipush,
    0x12 ldc,
    0x13 ldc_w,
    0x14 ldc2_w,
    0x15 iload,
    0x16 lload,
    0x17 fload,
    0x18 dload,
    0x19 aload,
    0x1a iload_0,
    0x1b iload_1,
    0x1c iload_2,
    0x1d iload_3,
    0x1e lload_0,
    0x1f lload_1,
    0x20 lload_2,
    0x21 lload_3,
    0x22 fload_0,
    0x23 fload_1,
    0x24 fload_2,
    0x25 fload_3,
    0x26 dload_0,
    0x27 dload_1,
    0x28 dload_2,
    0x29 dload_3,
    0x2a aload_0,
    0x2b aload_1,
    0x2c aload_2,
    0x2d aload_3,
    0x2e iaload,
    0x2f laload,
    0x30 faload,
    0x31 daload,
    0x32 aaload,
    0x33 baload,
    0x34 caload,
    0x35 saload,
    0x36 istore,
    0x37 lstore,
    0x38 fstore,
    0x39 dstore,
    0x3a astore,
    0x3b istore_0,
    0x3c istore_1,
    0x3d istore_2,
    0x3e istore_3,
    0x3f lstore_0,
    0x40 lstore_1,
    0x41 lstore_2,
    0x42 lstore_3,
    0x43 fstore_0,
    0x44 fstore_1,
    0x45 fstore_2,
    0x46 fstore_3,
    0x47 dstore_0,
    0x48 dstore_1,
    0x49 dstore_2,
    0x4a dstore_3,
    0x4b astore_0,
    0x4c astore_1,
    0x4d astore_2,
    0x4e astore_3,
    0x4f iastore,
    0x50 lastore,
    0x51 fastore,
    0x52 dastore,
    0x53 aastore,
    0x54 bastore,
    0x55 castore,
    0x56 sastore,
    0x57 pop,
    0x58 pop2,
    0x59 dup,
    0x5a dup_x1,
    0x5b dup_x2,
    0x5c dup2,
    0x5d dup2_x1,
    0x5e dup2_x2,
    0x5f swap,
    0x60 iadd,
    0x61 ladd,
    0x62 fadd,
    0x63 dadd,
    0x64 isub,
    0x65 lsub,
    0x66 fsub,
    0x67 dsub,
    0x68 imul,
    0x69 lmul,
    0x6a fmul,
    0x6b dmul,
    0x6c idiv,
    0x6d ldiv,
    0x6e fdiv,
    0x6f ddiv,
    0x70 irem,
    0x71 lrem,
    0x72 frem,
    0x73 drem,
    0x74 ineg,
    0x75 lneg,
    0x76 fneg,
    0x77 dneg,
    0x78 ishl,
    0x79 lshl,
    0x7a ishr,
    0x7b lshr,
    0x7c iushr,
    0x7d lushr,
    0x7e iand,
    0x7f land,
    0x80 ior,
    0x81 lor,
    0x82 ixor,
    0x83 lxor,
    0x84 iinc,
    0x85 i2l,
    0x86 i2f,
    0x87 i2d,
    0x88 l2i,
    0x89 l2f,
    0x8a l2d,
    0x8b f2i,
    0x8c f2l,
    0x8d f2d,
    0x8e d2i,
    0x8f d2l,
    0x90 d2f,
    0x91 i2b,
    0x92 i2c,
    0x93 i2s,
    0x94 lcmp,
    0x95 fcmpl,
    0x96 fcmpg,
    0x97 dcmpl,
    0x98 dcmpg,
    0x99 ifeq,
    0x9a ifne,
    0x9b iflt,
    0x9c ifge,
    0x9d ifgt,
    0x9e ifle,
    0x9f if_icmpeq,
    0xa0 if_icmpne,
    0xa1 if_icmplt,
    0xa2 if_icmpge,
    0xa3 if_icmpgt,
    0xa4 if_icmple,
    0xa5 if_acmpeq,
    0xa6 if_acmpne,
    0xa7 goto,
    0xa8 jsr,
    0xa9 ret,
    0xaa tableswitch,
    0xab lookupswitch,
    0xac ireturn,
    0xad lreturn,
    0xae freturn,
    0xaf dreturn,
    0xb0 areturn,
    0xb1 vreturn,
    0xb2 getstatic,
    0xb3 putstatic,
    0xb4 getfield,
    0xb5 putfield,
    0xb6 invokevirtual,
    0xb7 invokespecial,
    0xb8 invokestatic,
    0xb9 invokeinterface,
    0xba invokedynamic,
    0xbb new,
    0xbc newarray,
    0xbd anewarray,
    0xbe arraylength,
    0xbf athrow,
    0xc0 checkcast,
    0xc1 instanceof,
    0xc2 monitorenter,
    0xc3 monitorexit,
    0xc5 multianewarray,
    0xc6 ifnull,
    0xc7 ifnonnull,
    0xc8 goto_w,
    0xc9 jsr_w,
    0xca breakpoint,
}
impl Opcode {
    //noinspection SpellCheckingInspection
    fn operands(&self) -> Operands {
        use Opcode::*;

        match self {
            bipush | newarray => Operands::Byte,
            sipush => Operands::Short,
            ldc => Operands::Ldc,
            ldc_w | ldc2_w => Operands::LdcW,
            iload | lload | fload | dload | aload => Operands::Local,
            istore | lstore | fstore | dstore | astore | ret => Operands::Local,
            iinc => Operands::Iinc,
            ifeq | ifne | iflt | ifge | ifgt | ifle => Operands::Branch,
            if_icmpeq | if_icmpne | if_icmplt | if_icmpge | if_icmpgt | if_icmple => {
                Operands::Branch
            }
            if_acmpeq | if_acmpne | goto | jsr | ifnull | ifnonnull => Operands::Branch,
            goto_w | jsr_w => Operands::BranchWide,
            tableswitch => Operands::TableSwitch,
            lookupswitch => Operands::LookupSwitch,
            getstatic | putstatic | getfield | putfield => Operands::Field,
            invokevirtual | invokespecial | invokestatic | invokeinterface => Operands::Invoke,
            invokedynamic => Operands::InvokeDynamic,
            new | anewarray | checkcast | instanceof => Operands::Type,
            multianewarray => Operands::MultiANewArray,
            _ => Operands::None,
        }
    }

    fn is_wide_jump(&self) -> bool {
        matches!(self, Opcode::goto_w | Opcode::jsr_w)
    }
    fn is_field_access(&self) -> bool {
        self.operands() == Operands::Field
    }
}
