use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};
use darkroom::{
    BakeConfig, BakeReport, BucketStore, ColumnScheduler, DirStore, IntensityGrid, MemoryStore,
    OverlapPolicy, Ripeness, ThresholdScale,
};

#[derive(Parser, Debug)]
#[command(name = "darkroom", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Drop and refill one bucket per image row.
    Prepare(PrepareArgs),
    /// Develop the image into the store, one column per tick.
    Bake(BakeArgs),
    /// Write the current bucket contents as a PNG.
    Snapshot(SnapshotArgs),
}

#[derive(Args, Debug)]
struct SettingsArgs {
    /// JSON config file. Replaces every other setting flag.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Source image.
    #[arg(long, required_unless_present = "config")]
    image: Option<PathBuf>,

    /// Schema name (store subdirectory).
    #[arg(long, default_value = "darkroom")]
    name: String,

    /// Initial tokens per bucket.
    #[arg(long, default_value_t = 256)]
    ripeness: u32,

    /// Seconds between columns.
    #[arg(long, default_value_t = 1.0)]
    interval_secs: f64,

    /// What to do when a tick fires while earlier columns still run.
    #[arg(long, value_enum, default_value_t = OverlapChoice::Overlap)]
    overlap: OverlapChoice,

    /// Threshold divisor: `byte` (R/256) or `full` (R/255, white drains a bucket).
    #[arg(long, value_enum, default_value_t = ScaleChoice::Byte)]
    scale: ScaleChoice,

    /// Row fan-out threads.
    #[arg(long)]
    threads: Option<usize>,

    /// Wait for this second-of-minute before the first tick.
    #[arg(long)]
    align_second: Option<u8>,
}

#[derive(Args, Debug)]
struct PrepareArgs {
    #[command(flatten)]
    settings: SettingsArgs,

    /// Store root directory.
    #[arg(long, default_value = "darkroom-store")]
    store: PathBuf,
}

#[derive(Args, Debug)]
struct BakeArgs {
    #[command(flatten)]
    settings: SettingsArgs,

    /// Store root directory.
    #[arg(long, default_value = "darkroom-store")]
    store: PathBuf,

    /// Provision the buckets before baking.
    #[arg(long)]
    prepare: bool,

    /// Bake into a throwaway in-memory store; `--store` is ignored.
    #[arg(long)]
    memory: bool,
}

#[derive(Args, Debug)]
struct SnapshotArgs {
    #[command(flatten)]
    settings: SettingsArgs,

    /// Store root directory.
    #[arg(long, default_value = "darkroom-store")]
    store: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OverlapChoice {
    Overlap,
    Serial,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ScaleChoice {
    Byte,
    Full,
}

impl SettingsArgs {
    fn resolve(&self) -> anyhow::Result<BakeConfig> {
        if let Some(path) = &self.config {
            return Ok(BakeConfig::from_path(path)?);
        }
        let image = self
            .image
            .clone()
            .context("either --config or --image is required")?;
        let cfg = BakeConfig {
            name: self.name.clone(),
            image,
            ripeness: Ripeness(self.ripeness),
            interval_secs: self.interval_secs,
            overlap: match self.overlap {
                OverlapChoice::Overlap => OverlapPolicy::Overlap,
                OverlapChoice::Serial => OverlapPolicy::Serial,
            },
            scale: match self.scale {
                ScaleChoice::Byte => ThresholdScale::Byte,
                ScaleChoice::Full => ThresholdScale::Full,
            },
            threads: self.threads,
            align_second: self.align_second,
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Prepare(args) => cmd_prepare(args),
        Command::Bake(args) => cmd_bake(args),
        Command::Snapshot(args) => cmd_snapshot(args),
    }
}

fn load_image(cfg: &BakeConfig) -> anyhow::Result<IntensityGrid> {
    let image = IntensityGrid::open(&cfg.image)?;
    tracing::info!(
        width = image.width(),
        height = image.height(),
        "loaded {}",
        cfg.image.display()
    );
    Ok(image)
}

fn open_store(root: &std::path::Path, cfg: &BakeConfig) -> anyhow::Result<DirStore> {
    DirStore::open(root, &cfg.name)
        .with_context(|| format!("open store '{}' under '{}'", cfg.name, root.display()))
}

fn cmd_prepare(args: PrepareArgs) -> anyhow::Result<()> {
    let cfg = args.settings.resolve()?;
    let image = load_image(&cfg)?;
    let store = open_store(&args.store, &cfg)?;
    darkroom::provision(&store, image.height(), cfg.ripeness)?;
    eprintln!(
        "provisioned {} buckets in {}",
        image.height(),
        store.schema_dir().display()
    );
    Ok(())
}

fn cmd_bake(args: BakeArgs) -> anyhow::Result<()> {
    let cfg = args.settings.resolve()?;
    let image = Arc::new(load_image(&cfg)?);

    let report = if args.memory {
        let store = MemoryStore::new();
        darkroom::provision(&store, image.height(), cfg.ripeness)?;
        run_bake(Arc::new(store), image, &cfg)?
    } else {
        let store = open_store(&args.store, &cfg)?;
        if args.prepare {
            darkroom::provision(&store, image.height(), cfg.ripeness)?;
        }
        run_bake(Arc::new(store), image, &cfg)?
    };

    eprintln!(
        "baked {}/{} columns ({} row applies){}",
        report.columns_completed,
        report.columns_dispatched,
        report.rows_applied,
        if report.cancelled { ", cancelled" } else { "" }
    );
    Ok(())
}

fn run_bake<S: BucketStore>(
    store: Arc<S>,
    image: Arc<IntensityGrid>,
    cfg: &BakeConfig,
) -> anyhow::Result<BakeReport> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("start tokio runtime")?;

    let baker = cfg.column_baker()?;
    let options = cfg.schedule_options()?;
    runtime.block_on(async move {
        let (stop_tx, mut stop_rx) = tokio::sync::watch::channel(false);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, finishing dispatched columns");
                let _ = stop_tx.send(true);
            }
        });

        if let Some(second) = cfg.align_second
            && !darkroom::align_to_second_or_stop(second, &mut stop_rx).await?
        {
            return Ok(BakeReport {
                cancelled: true,
                ..BakeReport::default()
            });
        }

        let mut scheduler =
            ColumnScheduler::new(store, image, baker, options).with_stop_signal(stop_rx);
        Ok::<_, anyhow::Error>(scheduler.bake().await?)
    })
}

fn cmd_snapshot(args: SnapshotArgs) -> anyhow::Result<()> {
    let cfg = args.settings.resolve()?;
    let grid = load_image(&cfg)?;
    let store = open_store(&args.store, &cfg)?;
    let snapshot = darkroom::render_snapshot(&store, grid.height(), cfg.ripeness)?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        &args.out,
        snapshot.as_raw(),
        snapshot.width(),
        snapshot.height(),
        image::ColorType::L8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
