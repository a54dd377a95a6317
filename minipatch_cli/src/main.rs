use clap::{Parser, Subcommand};
use minipatch::{
    arguments::Arguments,
    config::{HookDescriptor, PatchConfig},
    game::LocatedGame,
    Result,
};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(name = "minipatch", version, about = "Identifies and patches Minicraft game jars")]
struct Opts {
    #[clap(subcommand)]
    command: Command,

    /// The game jar.
    #[clap(long, env = "MINIPATCH_GAME_JAR", default_value = "./jars/minicraft.jar")]
    jar: PathBuf,

    /// The class holding the hook method, e.g. `com/example/Hooks`.
    #[clap(long)]
    hook_owner: Option<String>,
    /// The name of the hook method.
    #[clap(long)]
    hook_name: Option<String>,

    /// Enables debug logging. `RUST_LOG` takes precedence.
    #[clap(long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Prints the variant and version of the game.
    Probe {
        /// Prints launch arguments without sensitive values.
        #[clap(long)]
        sanitize: bool,
        /// Arguments passed through to the game.
        #[clap(last = true)]
        game_args: Vec<String>,
    },
    /// Writes a copy of the game jar with the hook injected.
    Patch {
        #[clap(short, long)]
        out: PathBuf,
    },
}

fn init_logging(debug: bool) {
    let default = if debug {
        "minipatch=debug"
    } else {
        "minipatch=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn make_config(opts: &Opts) -> Result<PatchConfig> {
    let config = PatchConfig::default();
    if opts.hook_owner.is_none() && opts.hook_name.is_none() {
        return Ok(config);
    }
    let default = HookDescriptor::default();
    let hook = HookDescriptor::new(
        opts.hook_owner.as_deref().unwrap_or(default.owner()),
        opts.hook_name.as_deref().unwrap_or(default.name()),
        "()V",
    )?;
    Ok(config.with_hook(hook))
}

fn run(opts: Opts) -> Result<bool> {
    let config = make_config(&opts)?;
    let arguments = match &opts.command {
        Command::Probe { game_args, .. } => Arguments::parse(game_args.as_slice()),
        Command::Patch { .. } => Arguments::default(),
    };
    let game = match LocatedGame::locate(&opts.jar, arguments, config)? {
        Some(game) => game,
        None => {
            error!("{} is not a known Minicraft jar.", opts.jar.display());
            return Ok(false);
        }
    };

    match opts.command {
        Command::Probe { sanitize, .. } => {
            let metadata = game.metadata();
            println!("jar:         {}", game.jar_path().display());
            println!("entrypoint:  {}", game.entrypoint);
            println!("variant:     {} ({})", metadata.name, metadata.id);
            println!("version:     {}", game.version);
            println!("author:      {}", metadata.author);
            for (kind, link) in metadata.contact {
                println!("{:<12} {}", format!("{}:", kind), link);
            }
            println!("game dir:    {}", game.game_dir().display());
            println!("launch args: {}", game.launch_arguments(sanitize).join(" "));
        }
        Command::Patch { out } => {
            game.patch(&out)?;
            info!("Patched {} {} into {}", game.variant, game.version, out.display());
        }
    }
    Ok(true)
}

fn main() {
    let opts = Opts::parse();
    init_logging(opts.debug);

    match run(opts) {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}
