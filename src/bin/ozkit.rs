use std::{
    cell::RefCell,
    path::{Path, PathBuf},
    rc::Rc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ozkit", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the leaves-first execution order of entry modules.
    Resolve(GraphArgs),
    /// Write every module the entries need, in execution order, as one JSON bundle.
    Bundle(BundleArgs),
    /// Run one tween on the system clock and print sampled values.
    Tween(TweenArgs),
}

#[derive(Parser, Debug)]
struct GraphArgs {
    /// Directory holding JSON module documents.
    #[arg(long)]
    root: PathBuf,

    /// Loader configuration JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Entry module ids.
    #[arg(required = true)]
    entries: Vec<String>,
}

#[derive(Parser, Debug)]
struct BundleArgs {
    #[command(flatten)]
    graph: GraphArgs,

    /// Output bundle path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct TweenArgs {
    #[arg(long, default_value_t = 0.0)]
    from: f64,

    #[arg(long, default_value_t = 100.0)]
    to: f64,

    /// Duration in milliseconds.
    #[arg(long, default_value_t = 300.0)]
    duration: f64,

    /// Easing name, e.g. `easeOutBounce`.
    #[arg(long)]
    easing: Option<String>,

    /// Frame cap; `0` renders on every tick.
    #[arg(long, default_value_t = 60)]
    fps: u32,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Resolve(args) => cmd_resolve(args),
        Command::Bundle(args) => cmd_bundle(args),
        Command::Tween(args) => cmd_tween(args),
    }
}

fn read_config(path: Option<&Path>) -> anyhow::Result<ozkit::LoaderConfig> {
    let Some(path) = path else {
        return Ok(ozkit::LoaderConfig {
            default_suffix: Some("json".to_string()),
            ..ozkit::LoaderConfig::default()
        });
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read loader config '{}'", path.display()))?;
    let cfg = ozkit::LoaderConfig::from_json(&text)
        .with_context(|| format!("parse loader config '{}'", path.display()))?;
    Ok(cfg)
}

/// Load and run `entries`; returns the loader and whether every entry resolved.
fn load_graph(args: &GraphArgs) -> anyhow::Result<(ozkit::Loader, bool)> {
    let cfg = read_config(args.config.as_deref())?;
    let mut loader = ozkit::Loader::with_config(cfg, ozkit::DirSource::new(&args.root));
    let resolved = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&resolved);
    loader.require(args.entries.clone(), move |values| {
        *sink.borrow_mut() = Some(values.iter().all(Option::is_some));
    });
    loader.run_until_idle();
    let complete = resolved.borrow().unwrap_or(false);
    Ok((loader, complete))
}

fn cmd_resolve(args: GraphArgs) -> anyhow::Result<()> {
    let (loader, complete) = load_graph(&args)?;
    for id in loader.executed() {
        println!("{id}");
    }
    if !complete {
        anyhow::bail!("some entries did not resolve: {}", args.entries.join(", "));
    }
    Ok(())
}

fn cmd_bundle(args: BundleArgs) -> anyhow::Result<()> {
    let (loader, complete) = load_graph(&args.graph)?;
    if !complete {
        anyhow::bail!(
            "some entries did not resolve: {}",
            args.graph.entries.join(", ")
        );
    }
    let reset_prefix = format!("{}!", ozkit::RESET_PLUGIN);
    let modules: Vec<ozkit::ModuleDoc> = loader
        .executed()
        .iter()
        .filter(|id| !id.starts_with(&reset_prefix))
        .filter_map(|id| loader.module(id))
        .map(|record| ozkit::ModuleDoc {
            name: Some(record.name.clone()),
            deps: record.deps.clone(),
            exports: record.exports.clone(),
            url: None,
        })
        .collect();
    let bundle = ozkit::ScriptDoc::Bundle { modules };

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    let f = std::fs::File::create(&args.out)
        .with_context(|| format!("create bundle '{}'", args.out.display()))?;
    serde_json::to_writer_pretty(f, &bundle).with_context(|| "write bundle JSON")?;
    println!("{}", args.out.display());
    Ok(())
}

fn cmd_tween(args: TweenArgs) -> anyhow::Result<()> {
    let mut mainloop = ozkit::Mainloop::default();
    mainloop.config(ozkit::SchedulerConfig { fps: args.fps });
    if let Some(name) = &args.easing {
        anyhow::ensure!(
            mainloop.easing().contains(name),
            "unknown easing '{name}'"
        );
    }
    let mut opts = ozkit::TweenOpts::new(|value, elapsed| {
        println!("{elapsed:.0}\t{value:.3}");
    });
    opts.easing = args.easing.clone();
    mainloop.add_tween("cli", args.from, args.to, args.duration, opts);
    mainloop.run("cli");
    let frames = mainloop.drive(ozkit::DEFAULT_INTERVAL);
    tracing::debug!(frames, "tween finished");
    Ok(())
}
