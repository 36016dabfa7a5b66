use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "resep", version)]
struct Cli {
    /// Log filter, e.g. `info` or `resep=debug`.
    #[arg(long, global = true, default_value = "warn")]
    log: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the shapes every stage produces for one frame size.
    Plan(PlanArgs),
    /// Print the midpoint order used to raise the frame rate by a factor.
    Schedule(ScheduleArgs),
    /// Synthesize the frame halfway between two images.
    Interpolate(InterpolateArgs),
    /// Raise the frame rate of a directory of frames.
    Sequence(SequenceArgs),
    /// Write the deterministic initial parameters as JSON.
    ExportParams(ExportArgs),
}

#[derive(Parser, Debug)]
struct NetArgs {
    /// Network config JSON; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Parameter JSON to load over the initial parameters.
    #[arg(long)]
    weights: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct PlanArgs {
    #[arg(long)]
    height: usize,

    #[arg(long)]
    width: usize,

    #[command(flatten)]
    net: NetArgs,
}

#[derive(Parser, Debug)]
struct ScheduleArgs {
    /// Power-of-two frame-rate factor.
    #[arg(long)]
    factor: usize,
}

#[derive(Parser, Debug)]
struct InterpolateArgs {
    #[arg(long)]
    first: PathBuf,

    #[arg(long)]
    second: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    net: NetArgs,
}

#[derive(Parser, Debug)]
struct SequenceArgs {
    /// Directory of input frames, processed in file-name order.
    #[arg(long = "in")]
    in_dir: PathBuf,

    /// Output directory; frames are written as `000000.png`, `000001.png`, ...
    #[arg(long)]
    out: PathBuf,

    /// Power-of-two frame-rate factor.
    #[arg(long, default_value_t = 2)]
    factor: usize,

    #[command(flatten)]
    net: NetArgs,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Output JSON path.
    #[arg(long)]
    out: PathBuf,

    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log).with_context(|| "parse --log filter")?)
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Plan(args) => cmd_plan(args),
        Command::Schedule(args) => cmd_schedule(args),
        Command::Interpolate(args) => cmd_interpolate(args),
        Command::Sequence(args) => cmd_sequence(args),
        Command::ExportParams(args) => cmd_export(args),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<resep::NetworkConfig> {
    let config = match path {
        Some(p) => resep::NetworkConfig::from_path(p)
            .with_context(|| format!("load config '{}'", p.display()))?,
        None => resep::NetworkConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn load_network(args: &NetArgs) -> anyhow::Result<resep::Network> {
    let config = load_config(args.config.as_deref())?;
    let mut network = resep::Network::new(config)?;
    if let Some(path) = &args.weights {
        let store = resep::ParamStore::from_path(path)?;
        network
            .load_params(&store)
            .with_context(|| format!("load weights '{}'", path.display()))?;
    }
    Ok(network)
}

fn read_frame(path: &Path) -> anyhow::Result<ndarray::Array3<f32>> {
    let img = image::open(path)
        .with_context(|| format!("read image '{}'", path.display()))?
        .to_rgb8();
    Ok(resep::frame_from_image(&img))
}

fn write_frame(path: &Path, frame: &ndarray::Array3<f32>) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    resep::frame_to_image(frame)?
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", path.display()))
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let mut network = load_network(&args.net)?;
    let plan = network.plan(args.height, args.width)?;
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

fn cmd_schedule(args: ScheduleArgs) -> anyhow::Result<()> {
    anyhow::ensure!(
        resep::schedule::is_power_of_two_factor(args.factor),
        "--factor must be a power of two, got {}",
        args.factor
    );
    for step in resep::interpolation_order(args.factor, 0)? {
        println!("{} {} -> {}", step.left, step.right, step.mid);
    }
    Ok(())
}

fn cmd_interpolate(args: InterpolateArgs) -> anyhow::Result<()> {
    let interpolator = resep::Interpolator::new(load_network(&args.net)?)?;
    let one = read_frame(&args.first)?;
    let two = read_frame(&args.second)?;
    let mid = interpolator.estimate(&one, &two)?;
    write_frame(&args.out, &mid)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_sequence(args: SequenceArgs) -> anyhow::Result<()> {
    let interpolator = resep::Interpolator::new(load_network(&args.net)?)?;
    let mut paths = std::fs::read_dir(&args.in_dir)
        .with_context(|| format!("list '{}'", args.in_dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    paths.retain(|p| p.is_file());
    paths.sort();
    anyhow::ensure!(
        !paths.is_empty(),
        "no frames in '{}'",
        args.in_dir.display()
    );

    let frames = paths
        .iter()
        .map(|p| read_frame(p).map_err(resep::NetError::from));
    let mut index = 0usize;
    let written = resep::interpolate_stream(
        frames,
        args.factor,
        |a, b| interpolator.estimate(a, b),
        |frame| {
            write_frame(&args.out.join(format!("{index:06}.png")), frame)?;
            index += 1;
            Ok(())
        },
    )?;
    eprintln!("wrote {written} frames to {}", args.out.display());
    Ok(())
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    let mut network = resep::Network::new(config)?;
    let store = network.export_params()?;
    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    store.to_path(&args.out)?;
    eprintln!(
        "wrote {} arrays ({} values) to {}",
        store.len(),
        store.scalar_count(),
        args.out.display()
    );
    Ok(())
}
