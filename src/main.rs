use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use raylib::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod carousel;
mod constants;
mod error;
mod ffmpeg;
mod player;
mod progress;
mod sequencer;
mod slide;
mod ticker;
mod view;

use crate::carousel::Carousel;
use crate::constants::*;
use crate::ffmpeg::FfmpegBackend;
use crate::player::MediaLibrary;
use crate::sequencer::Sequencer;
use crate::slide::load_deck;
use crate::view::CarouselView;

/// Plays a directory of video clips as an auto-advancing carousel.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Directory holding the clips, optionally with a carousel.toml manifest
    deck: PathBuf,

    /// Metadata reports to exceed before play/pause commands are trusted
    /// [default: slide count - 1]
    #[arg(long)]
    readiness_threshold: Option<usize>,

    /// Start playing immediately instead of waiting to be scrolled into view
    #[arg(long)]
    autoplay: bool,

    /// Draw playback state in the top-left corner
    #[arg(long)]
    overlay: bool,

    #[arg(long, default_value_t = WINDOW_WIDTH)]
    width: i32,

    #[arg(long, default_value_t = WINDOW_HEIGHT)]
    height: i32,

    #[arg(long, default_value_t = FPS)]
    fps: u32,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_filter: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let slides = load_deck(&args.deck).with_context(|| format!("loading deck {}", args.deck.display()))?;
    let threshold = args
        .readiness_threshold
        .unwrap_or_else(|| Sequencer::default_threshold(slides.len()));
    info!(slides = slides.len(), threshold, "starting carousel");

    let mut library = MediaLibrary::new(FfmpegBackend::new(DECODE_WIDTH, DECODE_HEIGHT, DECODE_FPS), &slides);

    let (mut rl, thread) = raylib::init()
        .size(args.width, args.height)
        .title("Video Carousel")
        .vsync()
        .resizable()
        .build();
    rl.set_target_fps(args.fps);
    rl.set_trace_log(TraceLogLevel::LOG_ERROR);

    let mut carousel = Carousel::new(slides, threshold, rl.get_screen_width() as f32);
    let mut view = CarouselView::new(library.len(), args.autoplay, args.overlay);

    // --- Main Loop ---
    while !rl.window_should_close() {
        let dt = rl.get_frame_time();

        // 1. Media events from the streams
        for event in library.update(dt) {
            carousel.handle_media(event, &mut library);
        }

        // 2. User input: scroll-triggered visibility and the control button
        carousel.set_viewport_width(rl.get_screen_width() as f32);
        for event in view.handle_input(&rl) {
            carousel.dispatch(event, &mut library);
        }

        // 3. Frame uploads, animations, progress sampling
        view.upload_frames(&mut rl, &thread, &mut library);
        view.observe(&carousel, dt);
        carousel.tick(&library);

        let stream = library.status(carousel.state().active_index);
        let mut d = rl.begin_drawing(&thread);
        view.draw(&mut d, &carousel, stream);
    }

    info!("window closed");
    Ok(())
}
