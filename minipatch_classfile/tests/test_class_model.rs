use minipatch_classfile::*;

const VERSION_FIELD: &str = "VERSION";
const STRING_DESC: &str = "Ljava/lang/String;";

fn sample_class() -> ClassModel {
    let mut class =
        ClassModel::new(ClassAccessFlags::Public | ClassAccessFlags::Super, "test/Sample");
    class.interfaces.push("java/lang/Runnable".to_string());
    class
        .field(
            FieldAccessFlags::Public | FieldAccessFlags::Static | FieldAccessFlags::Final,
            VERSION_FIELD,
            STRING_DESC,
        )
        .constant_value(Constant::String("1.2.3".to_string()));
    class.field(FieldAccessFlags::Private.into(), "counter", "J");

    let mut body = InsnList::new();
    body.push(Instruction::Basic(Opcode::aload_0))
        .push(Instruction::invokespecial("java/lang/Object", "<init>", "()V"))
        .push(Instruction::Basic(Opcode::vreturn));
    class
        .method(MethodAccessFlags::Public.into(), "<init>", "()V")
        .set_code(Code::new(1, 1, body));

    let mut body = InsnList::new();
    body.push(Instruction::aconst_str("hello"))
        .push(Instruction::Ldc(Constant::Long(1 << 40)))
        .push(Instruction::Basic(Opcode::pop2))
        .push(Instruction::Basic(Opcode::pop))
        .push(Instruction::iconst(1000))
        .push(Instruction::Iinc {
            index: 300,
            delta: 2,
        })
        .push(Instruction::Basic(Opcode::aload_0))
        .push(Instruction::invokevirtual("test/Sample", "other", "()I"))
        .push(Instruction::Basic(Opcode::pop))
        .push(Instruction::Basic(Opcode::vreturn));
    class
        .method(MethodAccessFlags::Public.into(), "run", "()V")
        .set_code(Code::new(3, 301, body));

    class.method(MethodAccessFlags::Public | MethodAccessFlags::Abstract, "other", "()I");
    class
}

#[test]
fn test_round_trip_model() {
    let mut class = sample_class();
    let bytes = class.to_vec().unwrap();
    let parsed = ClassModel::parse(&bytes).unwrap();

    assert_eq!(parsed.name, "test/Sample");
    assert_eq!(parsed.super_name.as_deref(), Some("java/lang/Object"));
    assert_eq!(parsed.interfaces, vec!["java/lang/Runnable".to_string()]);
    assert_eq!(parsed.major_version, 52);
    assert!(parsed.access.contains(ClassAccessFlags::Super));

    assert_eq!(parsed.fields.len(), 2);
    let version = parsed.find_field(VERSION_FIELD).unwrap();
    assert_eq!(version.descriptor, STRING_DESC);
    assert_eq!(version.constant_value, Some(Constant::String("1.2.3".to_string())));
    assert!(parsed.fields[1].constant_value.is_none());

    let names: Vec<_> = parsed.methods.iter().map(|x| x.name.as_str()).collect();
    assert_eq!(names, ["<init>", "run", "other"]);
    assert!(parsed.methods[2].code.is_none());
    for (original, parsed) in class.methods.iter().zip(&parsed.methods) {
        assert_eq!(original.instructions(), parsed.instructions());
    }
}

#[test]
fn test_round_trip_is_stable() {
    let first = sample_class().to_vec().unwrap();
    let second = ClassModel::parse(&first).unwrap().to_vec().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_wide_constant_load() {
    let mut class = ClassModel::new(ClassAccessFlags::Public.into(), "test/Wide");
    for i in 0..300 {
        class.pool_mut().integer(i);
    }
    let mut body = InsnList::new();
    body.push(Instruction::aconst_str("late"))
        .push(Instruction::Basic(Opcode::areturn));
    class
        .method(MethodAccessFlags::Static.into(), "get", "()Ljava/lang/String;")
        .set_code(Code::new(1, 0, body));

    let bytes = class.to_vec().unwrap();
    let parsed = ClassModel::parse(&bytes).unwrap();
    let insns = parsed.methods[0].instructions().unwrap();
    assert_eq!(insns.len(), 2);
    assert_eq!(insns.first().and_then(|x| x.string_constant()), Some("late"));
}

#[test]
fn test_pool_dedupes() {
    let mut pool = ConstantPool::new();
    assert!(pool.is_empty());

    let a = pool.utf8("a");
    assert_eq!(pool.utf8("a"), a);
    let class = pool.class("a");
    assert_eq!(pool.len(), 2);
    assert_eq!(pool.get_class(class).unwrap(), "a");

    let long = pool.long(7);
    let next = pool.utf8("b");
    assert_eq!(next.index(), long.index() + 2);
    assert_eq!(pool.long(7), long);

    let method = pool.method_ref("a", "run", "()V");
    let strs = pool.get_member_ref(method).unwrap();
    assert_eq!((strs.owner, strs.name, strs.descriptor), ("a", "run", "()V"));
    assert!(!strs.interface);
}

#[test]
fn test_instruction_list_edits() {
    let mut list: InsnList =
        vec![Instruction::iconst(0), Instruction::iconst(1), Instruction::iconst(2)].into();
    list.insert(1, Instruction::Basic(Opcode::nop));
    list.prepend(Instruction::Basic(Opcode::dup));
    assert_eq!(
        list.to_vec(),
        vec![
            Instruction::Basic(Opcode::dup),
            Instruction::iconst(0),
            Instruction::Basic(Opcode::nop),
            Instruction::iconst(1),
            Instruction::iconst(2),
        ]
    );
    assert_eq!(list.remove(2), Instruction::Basic(Opcode::nop));
    assert_eq!(list.len(), 4);
    assert_eq!(list.label(1), list.label(1));
    assert_ne!(list.label(1), list.label(2));
}

#[test]
fn test_iconst_forms() {
    assert_eq!(Instruction::iconst(-1), Instruction::Basic(Opcode::iconst_m1));
    assert_eq!(Instruction::iconst(100), Instruction::BiPush(100));
    assert_eq!(Instruction::iconst(-1000), Instruction::SiPush(-1000));
    assert_eq!(Instruction::iconst(1 << 20), Instruction::Ldc(Constant::Integer(1 << 20)));
}

#[test]
fn test_full_constant_pool() {
    let mut class = ClassModel::new(ClassAccessFlags::Public.into(), "test/Full");
    class
        .method(MethodAccessFlags::Static.into(), "run", "()V")
        .set_code(Code::new(0, 0, vec![Instruction::Basic(Opcode::vreturn)].into()));
    class.to_vec().unwrap();

    // fill every remaining slot
    let mut next = 0;
    while class.pool().len() < u16::MAX as usize - 1 {
        class.pool_mut().integer(next);
        next += 1;
    }
    let bytes = class.to_vec().unwrap();
    assert_eq!(ClassModel::parse(&bytes).unwrap().pool().len(), u16::MAX as usize - 1);

    let hook = Instruction::invokestatic("test/Hooks", "init", "()V");
    class.methods[0].instructions_mut().unwrap().prepend(hook);
    assert!(matches!(class.to_vec(), Err(ClassFileError::TooLarge("constant pool"))));
}
