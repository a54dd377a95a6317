mod common;

use common::*;
use minipatch::{
    classfile::*,
    config::HookDescriptor,
    inject::{hook_call, inject_hook},
    locate::{find_method, find_method_mut},
    ErrorKind,
};

const METHODS: &[(&str, &str)] = &[
    ("<init>", "()V"),
    ("init", "(I)V"),
    ("init", "()V"),
    ("tick", "()V"),
    ("init", "()V"),
];

fn sample_class() -> ClassModel {
    let mut class = ClassModel::new(ClassAccessFlags::Public.into(), "test/Game");
    for (i, (name, descriptor)) in METHODS.iter().enumerate() {
        let body = vec![Instruction::iconst(i as i32), Instruction::Basic(Opcode::pop)];
        class
            .method(MethodAccessFlags::Public.into(), name, descriptor)
            .set_code(Code::new(1, 1, body.into()));
    }
    class
}

/// Which method a search returns is identified by the constant its body pushes.
fn method_index(method: &MethodModel) -> i32 {
    match method.instructions().and_then(|x| x.first()) {
        Some(Instruction::Basic(Opcode::iconst_0)) => 0,
        Some(Instruction::Basic(Opcode::iconst_1)) => 1,
        Some(Instruction::Basic(Opcode::iconst_2)) => 2,
        Some(Instruction::Basic(Opcode::iconst_3)) => 3,
        Some(Instruction::Basic(Opcode::iconst_4)) => 4,
        x => panic!("unexpected method body: {:?}", x),
    }
}

#[test]
fn test_find_unique_method() {
    let class = sample_class();
    let found = find_method(&class, |name, desc| name == "tick" && desc == "()V").unwrap();
    assert_eq!(method_index(found), 3);
    let found = find_method(&class, |name, desc| name == "init" && desc == "(I)V").unwrap();
    assert_eq!(method_index(found), 1);
}

#[test]
fn test_find_earliest_match() {
    let class = sample_class();
    for _ in 0..3 {
        let found = find_method(&class, |name, desc| name == "init" && desc == "()V").unwrap();
        assert_eq!(method_index(found), 2);
    }
    let found = find_method(&class, |name, _| name == "init").unwrap();
    assert_eq!(method_index(found), 1);
}

#[test]
fn test_find_missing_method() {
    let mut class = sample_class();
    assert!(find_method(&class, |name, _| name == "run").is_none());
    assert!(find_method_mut(&mut class, |_, desc| desc == "()I").is_none());
}

#[test]
fn test_inject_prepends_hook() {
    let hook = HookDescriptor::new(HOOK_OWNER, "init", "()V").unwrap();
    let mut class = class_with_method("test/Game", "init", "()V", init_body("test/Game"));
    let method = find_method_mut(&mut class, |name, _| name == "init").unwrap();
    let before = method.instructions().unwrap().to_vec();

    inject_hook(method, &hook).unwrap();
    let after = method.instructions().unwrap().to_vec();
    assert_eq!(after.len(), before.len() + 1);
    assert_eq!(after[0], Instruction::invokestatic(HOOK_OWNER, "init", "()V"));
    assert_eq!(after[0], hook_call(&hook));
    assert_eq!(&after[1..], before.as_slice());
}

#[test]
fn test_inject_survives_reencoding() {
    let hook = HookDescriptor::default();
    let mut class = class_with_method("test/Game", "init", "()V", init_body("test/Game"));
    inject_hook(&mut class.methods[0], &hook).unwrap();

    let parsed = ClassModel::parse(&class_bytes(&mut class)).unwrap();
    let insns = parsed.methods[0].instructions().unwrap();
    assert_eq!(insns.len(), 6);
    assert_eq!(insns.first(), Some(&hook_call(&hook)));
    assert_eq!(insns.iter().skip(1).cloned().collect::<Vec<_>>(), init_body("test/Game"));
}

#[test]
fn test_inject_twice_calls_hook_twice() {
    let hook = HookDescriptor::default();
    let mut class = class_with_method("test/Game", "init", "()V", init_body("test/Game"));
    inject_hook(&mut class.methods[0], &hook).unwrap();
    inject_hook(&mut class.methods[0], &hook).unwrap();

    let insns = class.methods[0].instructions().unwrap();
    assert_eq!(insns.len(), 7);
    assert_eq!(insns.get(0), Some(&hook_call(&hook)));
    assert_eq!(insns.get(1), Some(&hook_call(&hook)));
}

#[test]
fn test_inject_without_code() {
    let mut class = ClassModel::new(ClassAccessFlags::Public.into(), "test/Abstract");
    let flags = MethodAccessFlags::Public | MethodAccessFlags::Abstract;
    let method = class.method(flags, "init", "()V");
    let err = inject_hook(method, &HookDescriptor::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Message);
}

const BAD_HOOKS: &[(&str, &str, &str)] = &[
    (HOOK_OWNER, "init", "(I)V"),
    (HOOK_OWNER, "init", "()I"),
    (HOOK_OWNER, "init", ""),
    ("", "init", "()V"),
    (HOOK_OWNER, "", "()V"),
];
#[test]
fn test_bad_hook_descriptors() {
    for (owner, name, desc) in BAD_HOOKS {
        let result = HookDescriptor::new(owner, name, desc);
        assert!(result.is_err(), "should reject {}.{}{}", owner, name, desc);
    }
    let hook = HookDescriptor::new("com.example.Hooks", "start", "()V").unwrap();
    assert_eq!(hook.owner(), "com/example/Hooks");
}
