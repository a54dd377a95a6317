use crate::Result;
use std::{
    env,
    path::{Component, Path, PathBuf},
};

/// Keys removed from sanitized launch arguments, lowercase and without `--`.
const SENSITIVE_ARGS: &[&str] = &["savedir", "debug", "localclient"];

const GAME_DIR: &str = "gameDir";

/// Command line arguments passed through to the game.
///
/// `--key value` pairs are kept in the order they first appeared. Everything else is an extra
/// argument, passed on after the pairs.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Arguments {
    values: Vec<(String, String)>,
    extra: Vec<String>,
}
impl Arguments {
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Arguments {
        let mut arguments = Arguments::default();
        let mut i = 0;
        while i < args.len() {
            let arg = args[i].as_ref();
            match arg.strip_prefix("--") {
                Some(key) if i + 1 < args.len() => {
                    let value = args[i + 1].as_ref();
                    if value.starts_with("--") {
                        arguments.put(key, "");
                    } else {
                        arguments.put(key, value);
                        i += 1;
                    }
                }
                _ => arguments.extra.push(arg.to_string()),
            }
            i += 1;
        }
        arguments
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.iter().find(|x| x.0 == key).map(|x| x.1.as_str())
    }
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
    pub fn put(&mut self, key: &str, value: &str) {
        match self.values.iter_mut().find(|x| x.0 == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.values.push((key.to_string(), value.to_string())),
        }
    }
    pub fn extra_args(&self) -> &[String] {
        &self.extra
    }

    pub fn to_vec(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.values.len() * 2 + self.extra.len());
        for (key, value) in &self.values {
            out.push(format!("--{}", key));
            out.push(value.clone());
        }
        out.extend(self.extra.iter().cloned());
        out
    }

    /// The directory the game runs in, `.` unless `--gameDir` is given.
    pub fn game_dir(&self) -> &Path {
        Path::new(self.get(GAME_DIR).unwrap_or("."))
    }

    /// Sets `--gameDir` to the absolute game directory if it is not already set.
    pub fn ensure_game_dir(&mut self) -> Result<PathBuf> {
        if let Some(dir) = self.get(GAME_DIR) {
            return Ok(PathBuf::from(dir));
        }
        let dir = normalize(&env::current_dir()?.join(self.game_dir()));
        self.put(GAME_DIR, &dir.to_string_lossy());
        Ok(dir)
    }

    /// The arguments to launch the game with. Sanitizing drops sensitive keys and their values.
    pub fn launch_arguments(&self, sanitize: bool) -> Vec<String> {
        let args = self.to_vec();
        if !sanitize {
            return args;
        }

        let mut out = Vec::with_capacity(args.len());
        let mut i = 0;
        while i < args.len() {
            let arg = &args[i];
            let sensitive = arg
                .strip_prefix("--")
                .map_or(false, |x| SENSITIVE_ARGS.contains(&x.to_lowercase().as_str()));
            if sensitive && i + 1 < args.len() {
                i += 2;
            } else {
                out.push(arg.clone());
                i += 1;
            }
        }
        out
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            _ => out.push(component),
        }
    }
    out
}
