mod common;

use common::*;
use minipatch::{
    archive::{ArchiveReader, ClassSource, JarArchive, MemoryArchive},
    arguments::Arguments,
    classfile::*,
    config::{HookDescriptor, PatchConfig},
    entrypoint::{find_entrypoint, patch_archive, EntrypointPatch},
    game::LocatedGame,
    inject::hook_call,
    variant::Variant,
    ErrorKind,
};
use std::{fs, io::Cursor, path::PathBuf};
use tempfile::TempDir;

const ORIGINAL_GAME: &str = "com/mojang/ld22/Game";
const PLUS_GAME: &str = "minicraft/core/Game";
const PLUS_INITIALIZER: &str = "minicraft/core/Initializer";

fn original_jar() -> Vec<u8> {
    let mut game = class_with_method(ORIGINAL_GAME, "init", "()V", init_body(ORIGINAL_GAME));
    game.field(FieldAccessFlags::Public | FieldAccessFlags::Static, "VERSION", "Ljava/lang/String;")
        .constant_value(Constant::String("1.0".to_string()));
    build_jar(&[
        ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\r\n".to_vec()),
        ("META-INF/NOTCH.SF", b"signature".to_vec()),
        ("com/mojang/ld22/Game.class", class_bytes(&mut game)),
        ("res/title.png", vec![0x89, 0x50, 0x4e, 0x47]),
    ])
}

fn init_of(source: &impl ClassSource, class: &str) -> Vec<Instruction> {
    let class = source.load_class(class).unwrap().unwrap();
    let method = class.methods.iter().find(|x| x.name == "init").unwrap();
    method.instructions().unwrap().to_vec()
}

#[test]
fn test_find_entrypoint_priority() {
    let config = PatchConfig::default();
    let mut archive = MemoryArchive::new();
    assert_eq!(find_entrypoint(&archive, &config), None);

    archive.insert("minicraft/Game.class", vec![]);
    assert_eq!(find_entrypoint(&archive, &config).as_deref(), Some("minicraft.Game"));
    archive.insert("com/mojang/ld22/GameControl.class", vec![]);
    assert_eq!(find_entrypoint(&archive, &config).as_deref(), Some("com.mojang.ld22.GameControl"));
    archive.insert("com/mojang/ld22/Game.class", vec![]);
    assert_eq!(find_entrypoint(&archive, &config).as_deref(), Some("com.mojang.ld22.Game"));
}

#[test]
fn test_patch_main_class() {
    let config = PatchConfig::default();
    let mut archive = MemoryArchive::new();
    archive
        .insert_class(&mut class_with_method(
            ORIGINAL_GAME,
            "init",
            "()V",
            init_body(ORIGINAL_GAME),
        ))
        .unwrap();
    let entries: Vec<_> = archive.entries().collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0, "com/mojang/ld22/Game.class");
    assert_eq!(&entries[0].1[..4], &[0xca, 0xfe, 0xba, 0xbe]);

    let patched = EntrypointPatch::new(&config).process(&archive, "com.mojang.ld22.Game").unwrap();
    let mut patched = patched.unwrap();
    assert_eq!(patched.name, "com.mojang.ld22.Game");
    assert_eq!(patched.entry(), "com/mojang/ld22/Game.class");

    let mut out = MemoryArchive::new();
    out.insert(&patched.entry(), patched.to_vec().unwrap());
    let insns = init_of(&out, "com.mojang.ld22.Game");
    assert_eq!(insns.len(), 6);
    assert_eq!(insns[0], hook_call(&config.hook));
    assert_eq!(&insns[1..], init_body(ORIGINAL_GAME).as_slice());
}

#[test]
fn test_patch_prefers_initializer() {
    let config = PatchConfig::default();
    let mut archive = MemoryArchive::new();
    archive
        .insert_class(&mut class_with_method(PLUS_GAME, "init", "()V", init_body(PLUS_GAME)))
        .unwrap();
    archive
        .insert_class(&mut class_with_method(PLUS_INITIALIZER, "run", "()V", init_body(PLUS_GAME)))
        .unwrap();

    let patched = EntrypointPatch::new(&config).process(&archive, "minicraft.core.Game").unwrap();
    let patched = patched.unwrap();
    assert_eq!(patched.name, "minicraft.core.Initializer");
    let run = patched.class.methods.iter().find(|x| x.name == "run").unwrap();
    assert_eq!(run.instructions().unwrap().first(), Some(&hook_call(&config.hook)));
}

#[test]
fn test_patch_missing_init() {
    let config = PatchConfig::default();
    let mut archive = MemoryArchive::new();
    archive
        .insert_class(&mut class_with_method(
            ORIGINAL_GAME,
            "init",
            "(I)V",
            init_body(ORIGINAL_GAME),
        ))
        .unwrap();

    let err = EntrypointPatch::new(&config).process(&archive, "com.mojang.ld22.Game").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MethodNotFound);
    assert_eq!(err.to_string(), "Could not find init()V in com.mojang.ld22.Game!");

    // the initializer is authoritative once it exists, even if the main class has init()V
    archive
        .insert_class(&mut class_with_method(
            ORIGINAL_GAME,
            "init",
            "()V",
            init_body(ORIGINAL_GAME),
        ))
        .unwrap()
        .insert_class(&mut class_with_method(PLUS_INITIALIZER, "start", "()V", vec![]))
        .unwrap();
    let err = EntrypointPatch::new(&config).process(&archive, "com.mojang.ld22.Game").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MethodNotFound);
    assert!(err.to_string().contains("minicraft.core.Initializer"));
}

#[test]
fn test_patch_skips_unknown_packages() {
    let config = PatchConfig::default();
    let mut archive = MemoryArchive::new();
    archive
        .insert_class(&mut class_with_method(
            "net/example/Game",
            "init",
            "()V",
            init_body("net/example/Game"),
        ))
        .unwrap();
    let patched = EntrypointPatch::new(&config).process(&archive, "net.example.Game").unwrap();
    assert!(patched.is_none());
}

#[test]
fn test_patch_custom_hook() {
    let hook = HookDescriptor::new("com/example/Hooks", "start", "()V").unwrap();
    let config = PatchConfig::default().with_hook(hook);
    let mut archive = MemoryArchive::new();
    archive
        .insert_class(&mut class_with_method(
            ORIGINAL_GAME,
            "init",
            "()V",
            init_body(ORIGINAL_GAME),
        ))
        .unwrap();
    let patched = EntrypointPatch::new(&config).process(&archive, "com.mojang.ld22.Game").unwrap();
    let insns = patched.unwrap().class.methods[0].instructions().unwrap().to_vec();
    assert_eq!(insns[0], Instruction::invokestatic("com/example/Hooks", "start", "()V"));
}

#[test]
fn test_patch_jar_end_to_end() {
    let config = PatchConfig::default();
    let jar = JarArchive::from_reader("game.jar", Cursor::new(original_jar())).unwrap();
    let entrypoint = find_entrypoint(&jar, &config).unwrap();
    assert_eq!(init_of(&jar, &entrypoint).len(), 5);

    let patched = EntrypointPatch::new(&config).process(&jar, &entrypoint).unwrap();
    let mut patched: Vec<_> = patched.into_iter().collect();
    let mut output = Cursor::new(Vec::new());
    patch_archive(&jar, &mut output, &mut patched).unwrap();

    let out = JarArchive::from_reader("patched.jar", Cursor::new(output.into_inner())).unwrap();
    let insns = init_of(&out, &entrypoint);
    assert_eq!(insns.len(), 6);
    assert_eq!(insns[0], hook_call(&config.hook));
    assert_eq!(&insns[1..], init_body(ORIGINAL_GAME).as_slice());

    assert!(!out.has_entry("META-INF/NOTCH.SF"));
    assert!(out.has_entry("META-INF/MANIFEST.MF"));
    assert_eq!(out.read_entry("res/title.png").unwrap(), Some(vec![0x89, 0x50, 0x4e, 0x47]));

    let version = out.load_class(&entrypoint).unwrap().unwrap();
    assert_eq!(
        version.find_field("VERSION").and_then(|x| x.constant_value.clone()),
        Some(Constant::String("1.0".to_string()))
    );
}

#[test]
fn test_missing_jar() {
    let err = JarArchive::open("/nonexistent/minicraft.jar").err().unwrap();
    assert_eq!(err.kind(), ErrorKind::ArchiveRead);

    let err = JarArchive::from_reader("broken.jar", Cursor::new(vec![1, 2, 3])).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::ArchiveRead);
}

#[test]
fn test_locate_and_patch_game() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("minicraft.jar");
    let output = dir.path().join("minicraft-patched.jar");
    fs::write(&input, original_jar()).unwrap();

    let args = Arguments::parse(&["--savedir", "saves", "--gameDir", "run"]);
    let game = LocatedGame::locate(&input, args, PatchConfig::default()).unwrap().unwrap();
    assert_eq!(game.entrypoint, "com.mojang.ld22.Game");
    assert_eq!(game.variant, Variant::Original);
    assert_eq!(game.version.to_string(), "1.0");
    assert_eq!(game.game_dir(), PathBuf::from("run"));
    assert_eq!(game.launch_arguments(true), ["--gameDir", "run"]);

    game.patch(&output).unwrap();
    let out = JarArchive::open(&output).unwrap();
    assert_eq!(init_of(&out, "com.mojang.ld22.Game").len(), 6);
}

#[test]
fn test_locate_unknown_game() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("other.jar");
    fs::write(&input, build_jar(&[("net/example/Main.class", vec![])])).unwrap();
    assert!(LocatedGame::locate(&input, Arguments::default(), PatchConfig::default())
        .unwrap()
        .is_none());
}

#[test]
fn test_locate_unversioned_game() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("minicraft.jar");
    let mut game = class_with_method(PLUS_GAME, "init", "()V", init_body(PLUS_GAME));
    fs::write(&input, build_jar(&[("minicraft/core/Game.class", class_bytes(&mut game))])).unwrap();

    let game = LocatedGame::locate(&input, Arguments::default(), PatchConfig::default())
        .unwrap()
        .unwrap();
    assert_eq!(game.variant, Variant::Plus);
    assert_eq!(game.version.to_string(), "0.0.0");
    assert_eq!(game.metadata().id, "minicraftplus");
}

#[test]
fn test_patch_refuses_game_jar() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("minicraft.jar");
    let jar = original_jar();
    fs::write(&input, &jar).unwrap();

    let game = LocatedGame::locate(&input, Arguments::default(), PatchConfig::default())
        .unwrap()
        .unwrap();
    for output in [input.clone(), dir.path().join(".").join("minicraft.jar")] {
        let err = game.patch(&output).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Message);
        assert_eq!(fs::read(&input).unwrap(), jar);
    }

    let out = JarArchive::open(&input).unwrap();
    assert_eq!(init_of(&out, "com.mojang.ld22.Game").len(), 5);
}
