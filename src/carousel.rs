use tracing::{debug, info};

use crate::player::{MediaClock, MediaEvent, Playback};
use crate::progress::{ProgressState, Synchronizer};
use crate::sequencer::{Command, ControlIcon, Event, PlaybackState, Sequencer};
use crate::slide::Slide;

/// The carousel core: the sequencer and the progress synchronizer, fed by
/// media and user events. Holds indices and computed values only.
pub struct Carousel {
    slides: Vec<Slide>,
    sequencer: Sequencer,
    synchronizer: Synchronizer,
}

impl Carousel {
    /// `slides` must not be empty.
    pub fn new(slides: Vec<Slide>, readiness_threshold: usize, viewport_width: f32) -> Self {
        let count = slides.len();
        let mut synchronizer = Synchronizer::new(count, viewport_width);
        let sequencer = Sequencer::new(count, readiness_threshold);
        synchronizer.sync(sequencer.state());

        Self { slides, sequencer, synchronizer }
    }

    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    pub fn state(&self) -> &PlaybackState {
        self.sequencer.state()
    }

    pub fn progress(&self) -> &[ProgressState] {
        self.synchronizer.progress()
    }

    pub fn control_icon(&self) -> ControlIcon {
        self.state().control_icon()
    }

    /// Horizontal offset of the slide strip, in percent of one slide.
    pub fn strip_offset_percent(&self) -> f32 {
        -100.0 * self.state().active_index as f32
    }

    pub fn is_sampling(&self) -> bool {
        self.synchronizer.is_sampling()
    }

    /// Live ticker registrations; never more than one.
    pub fn sampler_count(&self) -> usize {
        self.synchronizer.ticker().len()
    }

    pub fn set_viewport_width(&mut self, viewport_width: f32) {
        self.synchronizer.set_viewport_width(viewport_width);
    }

    pub fn dispatch(&mut self, event: Event, player: &mut impl Playback) {
        if event == Event::VisibilityEntered && !self.state().ready_to_start {
            info!("carousel visible, starting playback");
        }
        if event == Event::ManualControl && self.state().is_last_slide {
            info!("replaying from the first slide");
        }

        let commands = self.sequencer.apply(event);
        self.synchronizer.sync(self.sequencer.state());

        for command in commands {
            debug!(?command, "playback command");
            match command {
                Command::Play(slide) => player.play(slide),
                Command::Pause(slide) => player.pause(slide),
            }
        }
    }

    pub fn handle_media(&mut self, event: MediaEvent, player: &mut impl Playback) {
        match event {
            MediaEvent::MetadataLoaded { slide, duration } => {
                if let Some(s) = self.slides.get_mut(slide) {
                    if !s.has_known_duration() {
                        s.duration_seconds = duration;
                    }
                }
                self.dispatch(Event::MetadataLoaded(slide), player);
            }
            MediaEvent::Started { slide } => self.dispatch(Event::PlaybackStarted(slide), player),
            MediaEvent::Ended { slide } => {
                // Settle the finished slide at full progress before moving on.
                if let Some(duration) = self.slides.get(slide).map(|s| s.duration_seconds) {
                    self.synchronizer.sample(slide, Some(duration), duration);
                }
                self.dispatch(Event::SlideEnded(slide), player);
            }
        }
    }

    /// Runs the registered samplers for one display frame, then clears the
    /// one-shot end flag the frame has already observed.
    pub fn tick(&mut self, clock: &impl MediaClock) {
        for slide in self.synchronizer.ticker().scheduled() {
            let duration = self.slides[slide].duration_seconds;
            self.synchronizer.sample(slide, clock.current_time(slide), duration);
        }
        self.sequencer.settle();
    }
}
