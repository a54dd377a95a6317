mod common;

use common::*;
use minipatch::{
    archive::MemoryArchive,
    classfile::*,
    config::PatchConfig,
    variant::Variant,
    version::{probe_version, scan_version, GameVersion},
    ErrorKind,
};

const GAME: &str = "minicraft/core/Game";
const HOLDER: &str = "minicraft/saveload/Version";

fn ldc(str: &str) -> Instruction {
    Instruction::aconst_str(str)
}
fn new_holder() -> Instruction {
    Instruction::new_object(HOLDER)
}
fn store_version() -> Instruction {
    Instruction::putstatic(GAME, "VERSION", "Ljava/lang/String;")
}
fn init_holder() -> Instruction {
    Instruction::invokespecial(HOLDER, "<init>", "(Ljava/lang/String;)V")
}
fn dup() -> Instruction {
    Instruction::Basic(Opcode::dup)
}

fn scan(body: Vec<Instruction>) -> Option<String> {
    let mut class = class_with_clinit(GAME, body);
    // go through the class file format, as the scanner would see a real jar
    let class = ClassModel::parse(&class_bytes(&mut class)).unwrap();
    scan_version(&class, &PatchConfig::default())
}

#[test]
fn test_constant_field() {
    let mut class = ClassModel::new(ClassAccessFlags::Public.into(), GAME);
    class
        .field(FieldAccessFlags::Public | FieldAccessFlags::Static, "VERSION", "Ljava/lang/String;")
        .constant_value(Constant::String("1.2.3".to_string()));
    let class = ClassModel::parse(&class_bytes(&mut class)).unwrap();
    assert_eq!(scan_version(&class, &PatchConfig::default()).as_deref(), Some("1.2.3"));
}

#[test]
fn test_constant_field_wins() {
    let mut class = class_with_clinit(GAME, vec![ldc("9.9"), store_version()]);
    class.fields[0].constant_value(Constant::String("1.0".to_string()));
    assert_eq!(scan_version(&class, &PatchConfig::default()).as_deref(), Some("1.0"));
}

#[test]
fn test_non_string_constant_ignored() {
    let mut class = class_with_clinit(GAME, vec![ldc("3.1"), store_version()]);
    class.fields[0].constant_value(Constant::Integer(4));
    assert_eq!(scan_version(&class, &PatchConfig::default()).as_deref(), Some("3.1"));
}

const SCAN_CASES: &[(&str, &[&str], Option<&str>)] = &[
    // new Version("2.0-alpha")
    ("construction", &["new", "dup", "ldc 2.0-alpha", "init", "store"], Some("2.0-alpha")),
    ("construction, immediate", &["new", "ldc 2.0-alpha"], Some("2.0-alpha")),
    ("direct store", &["ldc 3.0", "store"], Some("3.0")),
    ("store takes the latest string", &["ldc a", "ldc 3.0", "dup", "store"], Some("3.0")),
    ("construction beats earlier string", &["ldc x", "new", "dup", "ldc 2.1"], Some("2.1")),
    ("first capture wins", &["ldc 1.0", "store", "new", "ldc 2.0"], Some("1.0")),
    ("store before any string", &["store", "ldc 4.0"], None),
    ("string without store", &["ldc hello"], None),
    ("construction without string", &["new", "dup", "init"], None),
    ("other type constructed", &["other", "dup", "ldc 5.0"], None),
    ("other field stored", &["ldc 6.0", "other store"], None),
    ("empty", &[], None),
];

fn build(step: &str) -> Instruction {
    match step {
        "new" => new_holder(),
        "dup" => dup(),
        "init" => init_holder(),
        "store" => store_version(),
        "other" => Instruction::new_object("java/lang/StringBuilder"),
        "other store" => Instruction::putstatic(GAME, "NAME", "Ljava/lang/String;"),
        _ => match step.strip_prefix("ldc ") {
            Some(str) => ldc(str),
            None => panic!("unknown step {:?}", step),
        },
    }
}

#[test]
fn test_initializer_patterns() {
    for (name, steps, expected) in SCAN_CASES {
        let body = steps.iter().map(|x| build(x)).collect();
        assert_eq!(scan(body).as_deref(), *expected, "case: {}", name);
    }
}

#[test]
fn test_holder_needs_new() {
    let body = vec![
        Instruction::Type {
            opcode: Opcode::checkcast,
            class: HOLDER.to_string(),
        },
        ldc("7.0"),
    ];
    assert_eq!(scan(body), None);
}

#[test]
fn test_no_initializer() {
    let class = ClassModel::new(ClassAccessFlags::Public.into(), GAME);
    assert_eq!(scan_version(&class, &PatchConfig::default()), None);
}

#[test]
fn test_probe_archive() {
    let mut archive = MemoryArchive::new();
    archive
        .insert_class(&mut class_with_clinit(
            GAME,
            vec![new_holder(), dup(), ldc("2.1.0"), init_holder()],
        ))
        .unwrap();
    archive.insert_class(&mut class_with_clinit("com/mojang/ld22/Game", vec![])).unwrap();

    let result = probe_version(&archive, &PatchConfig::default()).unwrap();
    assert_eq!(result.variant, Variant::Plus);
    assert_eq!(result.version.as_deref(), Some("2.1.0"));
}

#[test]
fn test_probe_unclassified() {
    let mut archive = MemoryArchive::new();
    let mut main = class_with_clinit("net/other/Main", vec![ldc("1.0"), store_version()]);
    archive.insert_class(&mut main).unwrap();

    let result = probe_version(&archive, &PatchConfig::default()).unwrap();
    assert_eq!(result.variant, Variant::Original);
    assert_eq!(result.version, None);
}

#[test]
fn test_probe_malformed_class() {
    let mut archive = MemoryArchive::new();
    archive.insert("com/mojang/ld22/GameControl.class", vec![0, 1, 2, 3]);
    let err = probe_version(&archive, &PatchConfig::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ClassFormat);
}

const VERSIONS: &[(&str, bool)] = &[
    ("1.2.3", true),
    ("2.0-alpha", true),
    ("2.0.5-dev3+build.7", true),
    ("1", true),
    ("Infdev", false),
    ("1.0 beta", false),
    ("01.2", false),
    ("1..2", false),
    ("1.2-", false),
];
#[test]
fn test_game_version_parse() {
    for (version, semantic) in VERSIONS {
        let parsed = GameVersion::parse(version).unwrap();
        assert_eq!(parsed.is_semantic(), *semantic, "version: {:?}", version);
        assert_eq!(parsed.to_string(), *version);
    }
}

#[test]
fn test_game_version_unparseable() {
    for version in ["", "   "] {
        let err = GameVersion::parse(version).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::VersionUnparseable);
    }
}
