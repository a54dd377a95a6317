#![allow(dead_code)]

use minipatch::classfile::*;
use std::io::{Cursor, Write};
use zip::{write::FileOptions, ZipWriter};

pub const HOOK_OWNER: &str = "io/github/pseudodistant/provider/services/MiniHooks";

/// A public class with a single `static` method holding `body`.
pub fn class_with_method(
    name: &str,
    method: &str,
    descriptor: &str,
    body: Vec<Instruction>,
) -> ClassModel {
    let mut class = ClassModel::new(ClassAccessFlags::Public | ClassAccessFlags::Super, name);
    class
        .method(MethodAccessFlags::Public | MethodAccessFlags::Static, method, descriptor)
        .set_code(Code::new(2, 1, body.into()));
    class
}

/// A class with a static initializer holding `body`, followed by a `return`.
pub fn class_with_clinit(name: &str, mut body: Vec<Instruction>) -> ClassModel {
    body.push(Instruction::Basic(Opcode::vreturn));
    let mut class = class_with_method(name, "<clinit>", "()V", body);
    class.field(
        FieldAccessFlags::Public | FieldAccessFlags::Static | FieldAccessFlags::Final,
        "VERSION",
        "Ljava/lang/String;",
    );
    class
}

/// Five instructions that make up a plausible `init()V` body.
pub fn init_body(owner: &str) -> Vec<Instruction> {
    vec![
        Instruction::iconst(0),
        Instruction::putstatic(owner, "score", "I"),
        Instruction::iconst(1),
        Instruction::Basic(Opcode::pop),
        Instruction::Basic(Opcode::vreturn),
    ]
}

pub fn class_bytes(class: &mut ClassModel) -> Vec<u8> {
    class.to_vec().unwrap()
}

/// Builds a jar in memory.
pub fn build_jar(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        zip.start_file(*name, FileOptions::default()).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}
