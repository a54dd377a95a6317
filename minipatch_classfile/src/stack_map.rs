use crate::{
    code::{Label, LabelOffsets},
    constant_pool::PoolId,
    ClassFileError,
};
use byteorder::{ReadBytesExt, WriteBytesExt, BE};
use std::io::{Cursor, Read};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum VerificationType {
    Top,
    Integer,
    Float,
    Double,
    Long,
    Null,
    UninitializedThis,
    Object(PoolId),
    /// An object created by the `new` instruction at the given label, not yet initialized.
    Uninitialized(Label),
}
impl VerificationType {
    fn read(mut r: impl Read) -> Result<Self, ClassFileError> {
        Ok(match r.read_u8()? {
            0 => VerificationType::Top,
            1 => VerificationType::Integer,
            2 => VerificationType::Float,
            3 => VerificationType::Double,
            4 => VerificationType::Long,
            5 => VerificationType::Null,
            6 => VerificationType::UninitializedThis,
            7 => VerificationType::Object(PoolId(r.read_u16::<BE>()?)),
            8 => VerificationType::Uninitialized(Label(r.read_u16::<BE>()? as u32)),
            _ => return Err(ClassFileError::MalformedAttribute("StackMapTable")),
        })
    }

    fn write(&self, offsets: &LabelOffsets, out: &mut Vec<u8>) -> Result<(), ClassFileError> {
        match self {
            VerificationType::Top => out.write_u8(0)?,
            VerificationType::Integer => out.write_u8(1)?,
            VerificationType::Float => out.write_u8(2)?,
            VerificationType::Double => out.write_u8(3)?,
            VerificationType::Long => out.write_u8(4)?,
            VerificationType::Null => out.write_u8(5)?,
            VerificationType::UninitializedThis => out.write_u8(6)?,
            VerificationType::Object(id) => {
                out.write_u8(7)?;
                id.write(&mut *out)?;
            }
            VerificationType::Uninitialized(label) => {
                out.write_u8(8)?;
                out.write_u16::<BE>(offsets.resolve(*label)? as u16)?;
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FrameKind {
    Same,
    SameLocals1StackItem(VerificationType),
    Chop(u8),
    Append(Vec<VerificationType>),
    Full {
        locals: Vec<VerificationType>,
        stack: Vec<VerificationType>,
    },
}

/// One entry of a `StackMapTable`, attached to the instruction it describes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Frame {
    pub at: Label,
    pub kind: FrameKind,
}

fn read_types(
    r: &mut Cursor<&[u8]>,
    count: usize,
) -> Result<Vec<VerificationType>, ClassFileError> {
    (0..count).map(|_| VerificationType::read(&mut *r)).collect()
}

pub(crate) fn decode(data: &[u8]) -> Result<Vec<Frame>, ClassFileError> {
    let mut r = Cursor::new(data);
    let count = r.read_u16::<BE>()?;
    let mut frames = Vec::with_capacity(count as usize);
    let mut prev: Option<u32> = None;

    for _ in 0..count {
        let frame_type = r.read_u8()?;
        let (delta, kind) = match frame_type {
            0..=63 => (frame_type as u32, FrameKind::Same),
            64..=127 => (
                frame_type as u32 - 64,
                FrameKind::SameLocals1StackItem(VerificationType::read(&mut r)?),
            ),
            247 => {
                let delta = r.read_u16::<BE>()? as u32;
                (delta, FrameKind::SameLocals1StackItem(VerificationType::read(&mut r)?))
            }
            248..=250 => (r.read_u16::<BE>()? as u32, FrameKind::Chop(251 - frame_type)),
            251 => (r.read_u16::<BE>()? as u32, FrameKind::Same),
            252..=254 => {
                let delta = r.read_u16::<BE>()? as u32;
                let locals = read_types(&mut r, (frame_type - 251) as usize)?;
                (delta, FrameKind::Append(locals))
            }
            255 => {
                let delta = r.read_u16::<BE>()? as u32;
                let local_count = r.read_u16::<BE>()? as usize;
                let locals = read_types(&mut r, local_count)?;
                let stack_count = r.read_u16::<BE>()? as usize;
                let stack = read_types(&mut r, stack_count)?;
                (delta, FrameKind::Full { locals, stack })
            }
            _ => return Err(ClassFileError::MalformedAttribute("StackMapTable")),
        };

        let offset = match prev {
            None => delta,
            Some(prev) => prev + delta + 1,
        };
        prev = Some(offset);
        frames.push(Frame {
            at: Label(offset),
            kind,
        });
    }
    Ok(frames)
}

pub(crate) fn encode(frames: &[Frame], offsets: &LabelOffsets) -> Result<Vec<u8>, ClassFileError> {
    if frames.len() > u16::MAX as usize {
        return Err(ClassFileError::TooLarge("StackMapTable"));
    }

    let mut out = Vec::new();
    out.write_u16::<BE>(frames.len() as u16)?;
    let mut prev: Option<u32> = None;
    for frame in frames {
        let offset = offsets.resolve(frame.at)?;
        let delta = match prev {
            None => offset as i64,
            Some(prev) => offset as i64 - prev as i64 - 1,
        };
        if delta < 0 || delta > u16::MAX as i64 {
            return Err(ClassFileError::MalformedAttribute("StackMapTable"));
        }
        let delta = delta as u16;
        prev = Some(offset);

        match &frame.kind {
            FrameKind::Same if delta < 64 => out.write_u8(delta as u8)?,
            FrameKind::Same => {
                out.write_u8(251)?;
                out.write_u16::<BE>(delta)?;
            }
            FrameKind::SameLocals1StackItem(ty) => {
                if delta < 64 {
                    out.write_u8(64 + delta as u8)?;
                } else {
                    out.write_u8(247)?;
                    out.write_u16::<BE>(delta)?;
                }
                ty.write(offsets, &mut out)?;
            }
            FrameKind::Chop(k) => {
                out.write_u8(251 - *k)?;
                out.write_u16::<BE>(delta)?;
            }
            FrameKind::Append(locals) => {
                out.write_u8(251 + locals.len() as u8)?;
                out.write_u16::<BE>(delta)?;
                for ty in locals {
                    ty.write(offsets, &mut out)?;
                }
            }
            FrameKind::Full { locals, stack } => {
                out.write_u8(255)?;
                out.write_u16::<BE>(delta)?;
                out.write_u16::<BE>(locals.len() as u16)?;
                for ty in locals {
                    ty.write(offsets, &mut out)?;
                }
                out.write_u16::<BE>(stack.len() as u16)?;
                for ty in stack {
                    ty.write(offsets, &mut out)?;
                }
            }
        }
    }
    Ok(out)
}
