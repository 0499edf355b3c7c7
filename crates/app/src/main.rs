use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use clap::{Args, Parser, Subcommand};
use portfolio_tour_core::page::BODY_ID;
use portfolio_tour_core::timeline::parse_timeline_document;
use portfolio_tour_core::{
    AssetSource, DirectoryAssets, Document, Element, FilePreferences, GalleryManifest, ImageGallery,
    MediaHandle, MemoryPreferences, SeekControl, SharedPreferences, SimulatedMedia, TourConfig,
    TourController, TourError, UiEvent,
};
use tracing_subscriber::EnvFilter;

fn main() -> portfolio_tour_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Tour(args) => run_tour(&args),
        Commands::Gallery { manifest, root } => run_gallery(&manifest, &root),
    }
}

fn run_tour(args: &TourArgs) -> portfolio_tour_core::Result<()> {
    tracing::info!(audio = %args.audio, events = %args.events, "starting tour");

    if args.step <= 0.0 {
        return Err(TourError::InvalidInput("step must be a positive number of seconds"));
    }

    let config = match &args.config {
        Some(path) => TourConfig::from_file(path)?,
        None => TourConfig::default(),
    };
    let assets = DirectoryAssets::new(&args.root);
    let events = assets.fetch(&args.events);

    let document = Document::shared();
    {
        let mut doc = document.borrow_mut();
        doc.add_child(
            BODY_ID,
            Element::new("div", config.startup_container_id.as_str()),
        )?;
        if let Ok(bytes) = &events {
            for target in event_targets(bytes) {
                if !doc.contains(&target) {
                    doc.add_child(BODY_ID, Element::new("section", target))?;
                }
            }
        }
    }

    let preferences: SharedPreferences = match &args.prefs {
        Some(path) => Rc::new(RefCell::new(FilePreferences::open(path)?)),
        None => MemoryPreferences::shared(),
    };

    let mut tour = TourController::new(document.clone(), preferences, config);
    tour.build(&args.audio)?;
    if args.toggle_auto_scroll {
        tour.toggle_auto_scroll()?;
    }
    tour.load_event_timeline(&args.events)?;

    // Requesting the start first exercises the deferred path: playback begins
    // as soon as the second resource completes.
    tour.handle(UiEvent::StartupClicked)?;

    let media = SimulatedMedia::new(args.duration);
    let audio = assets
        .fetch(&args.audio)
        .map(|_| Box::new(media.clone()) as Box<dyn MediaHandle>);
    tour.complete_audio_load(audio)?;
    let report = tour.complete_timeline_load(events)?;
    tracing::info!(accepted = report.accepted, rejected = report.rejected.len(), "timeline ready");

    if let Some(seconds) = args.seek_to {
        let value = seconds / args.duration * tour.slider().max_value();
        tour.handle(UiEvent::SeekPressed)?;
        tour.handle(UiEvent::SeekReleased(value))?;
    }

    let step_ms = (args.step * 1000.0).round() as u64;
    while !media.ended() && !media.is_paused() {
        media.advance(args.step);
        tour.handle(UiEvent::MediaTimeUpdate)?;
        document.borrow_mut().advance(step_ms);
    }

    let dispatched = tour.player().map_or(0, |player| player.dispatched());
    tour.handle(UiEvent::ExitClicked)?;
    tracing::info!(dispatched, auto_scroll = tour.auto_scroll(), "tour finished");
    Ok(())
}

fn event_targets(bytes: &[u8]) -> Vec<String> {
    let Ok(document) = parse_timeline_document(bytes) else {
        return Vec::new();
    };
    document
        .entries
        .into_iter()
        .filter_map(|entry| entry.ok())
        .map(|event| event.target)
        .filter(|target| !target.is_empty())
        .collect()
}

fn run_gallery(manifest_url: &str, root: &Path) -> portfolio_tour_core::Result<()> {
    tracing::info!(manifest = manifest_url, "loading gallery");

    let assets = DirectoryAssets::new(root);
    let manifest = GalleryManifest::parse(&assets.fetch(manifest_url)?, manifest_url)?;
    let mut gallery = ImageGallery::new();

    for pending in gallery.queue_manifest(manifest) {
        match assets.fetch(&pending.image.src) {
            Ok(_) => {
                gallery.add_image(pending.image, Some(pending.rank))?;
            }
            Err(err) => {
                tracing::error!(
                    src = %pending.image.src,
                    error = %err,
                    "cannot find image from gallery manifest"
                );
            }
        }
    }

    for (rank, image) in gallery.images() {
        println!("{rank}\t{}\t{}", image.src, image.alt.as_deref().unwrap_or(""));
    }
    tracing::info!(images = gallery.len(), "gallery loaded");
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Headless host for the narrated portfolio tour",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a narrated tour to completion on a simulated clock.
    Tour(TourArgs),
    /// Load a gallery manifest and list its images in display order.
    Gallery {
        /// URL of the gallery manifest, relative to the site root.
        manifest: String,
        /// Directory that site URLs resolve against.
        #[arg(short, long, default_value = ".")]
        root: PathBuf,
    },
}

#[derive(Args, Debug)]
struct TourArgs {
    /// URL of the narration audio, relative to the site root.
    #[arg(long)]
    audio: String,
    /// URL of the timeline events JSON, relative to the site root.
    #[arg(long)]
    events: String,
    /// Length of the narration in seconds.
    #[arg(long, default_value_t = 60.0)]
    duration: f64,
    /// Directory that site URLs resolve against.
    #[arg(short, long, default_value = ".")]
    root: PathBuf,
    /// Seconds between simulated media time updates.
    #[arg(long, default_value_t = 0.25)]
    step: f64,
    /// Jump to this position right after the tour starts.
    #[arg(long)]
    seek_to: Option<f64>,
    /// JSON file holding persisted preferences.
    #[arg(long)]
    prefs: Option<PathBuf>,
    /// JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Flip the persisted auto-scroll preference before starting.
    #[arg(long)]
    toggle_auto_scroll: bool,
}
