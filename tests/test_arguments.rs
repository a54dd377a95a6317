use minipatch::arguments::Arguments;
use std::path::Path;

#[test]
fn test_parse_pairs_and_extras() {
    let args = Arguments::parse(&["--gameDir", "run", "nogui", "--debug", "--savedir", "saves"]);
    assert_eq!(args.get("gameDir"), Some("run"));
    assert_eq!(args.get("debug"), Some(""));
    assert_eq!(args.get("savedir"), Some("saves"));
    assert_eq!(args.extra_args(), ["nogui"]);
    assert_eq!(
        args.to_vec(),
        ["--gameDir", "run", "--debug", "", "--savedir", "saves", "nogui"]
    );
}

#[test]
fn test_parse_trailing_key() {
    let args = Arguments::parse(&["a", "--fullscreen"]);
    assert!(!args.contains_key("fullscreen"));
    assert_eq!(args.extra_args(), ["a", "--fullscreen"]);
}

#[test]
fn test_put_replaces_in_place() {
    let mut args = Arguments::parse(&["--a", "1", "--b", "2"]);
    args.put("a", "3");
    args.put("c", "4");
    assert_eq!(args.to_vec(), ["--a", "3", "--b", "2", "--c", "4"]);
}

#[test]
fn test_game_dir() {
    let args = Arguments::parse::<&str>(&[]);
    assert_eq!(args.game_dir(), Path::new("."));

    let mut args = Arguments::parse(&["--gameDir", "/tmp/game"]);
    assert_eq!(args.ensure_game_dir().unwrap(), Path::new("/tmp/game"));

    let mut args = Arguments::default();
    let dir = args.ensure_game_dir().unwrap();
    assert!(dir.is_absolute());
    assert_eq!(args.get("gameDir"), Some(dir.to_str().unwrap()));
    assert!(dir.components().all(|x| x != std::path::Component::CurDir));
}

const SANITIZE_CASES: &[(&[&str], &[&str])] = &[
    (&["--savedir", "s", "--width", "100"], &["--width", "100"]),
    (&["--DEBUG", "true", "x"], &["x"]),
    (&["--localclient", "", "--gameDir", "g"], &["--gameDir", "g"]),
    (&["--width", "100"], &["--width", "100"]),
];
#[test]
fn test_sanitize() {
    for (input, expected) in SANITIZE_CASES {
        let args = Arguments::parse(*input);
        assert_eq!(args.launch_arguments(true), *expected, "input: {:?}", input);
        assert_eq!(args.launch_arguments(false), args.to_vec());
    }
}
