//! Progress indicator synchronization.
//!
//! Only the active slide is ever sampled. A sampler is registered with the
//! [`Ticker`] while the carousel is playing and released as soon as playback
//! stops or the active slide changes, so at most one registration is live.

use raylib::prelude::Color;
use tracing::debug;

use crate::constants::*;
use crate::sequencer::PlaybackState;
use crate::ticker::{TickRegistration, Ticker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorPhase {
    Idle,
    Active,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressState {
    pub fraction_complete: f32,
    /// Last rendered fill, in whole percent.
    pub fill_percent: u8,
    pub indicator_width_px: f32,
    pub indicator_color: Color,
    pub phase: IndicatorPhase,
}

impl ProgressState {
    pub fn idle() -> Self {
        Self {
            fraction_complete: 0.0,
            fill_percent: 0,
            indicator_width_px: INDICATOR_COLLAPSED_PX,
            indicator_color: INDICATOR_IDLE_COLOR,
            phase: IndicatorPhase::Idle,
        }
    }
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::idle()
    }
}

/// Width of the active slide's indicator for a viewport `viewport_width` pixels wide.
pub fn active_indicator_width(viewport_width: f32) -> f32 {
    let vw = if viewport_width < BREAKPOINT_SMALL {
        INDICATOR_VW_SMALL
    } else if viewport_width < BREAKPOINT_MEDIUM {
        INDICATOR_VW_MEDIUM
    } else {
        INDICATOR_VW_LARGE
    };
    viewport_width * vw / 100.0
}

struct Sampler {
    registration: TickRegistration,
    fraction: f32,
    last_percent: Option<u8>,
}

pub struct Synchronizer {
    ticker: Ticker,
    progress: Vec<ProgressState>,
    sampler: Option<Sampler>,
    tracked_index: Option<usize>,
    tracked_ready: bool,
    viewport_width: f32,
}

impl Synchronizer {
    pub fn new(slide_count: usize, viewport_width: f32) -> Self {
        Self {
            ticker: Ticker::new(),
            progress: vec![ProgressState::idle(); slide_count.max(1)],
            sampler: None,
            tracked_index: None,
            tracked_ready: false,
            viewport_width,
        }
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub fn progress(&self) -> &[ProgressState] {
        &self.progress
    }

    pub fn is_sampling(&self) -> bool {
        self.sampler.is_some()
    }

    pub fn set_viewport_width(&mut self, viewport_width: f32) {
        if (viewport_width - self.viewport_width).abs() < f32::EPSILON {
            return;
        }
        self.viewport_width = viewport_width;
        for state in self.progress.iter_mut() {
            if state.phase == IndicatorPhase::Active {
                state.indicator_width_px = active_indicator_width(viewport_width);
            }
        }
    }

    /// Follows the sequencer: swaps the sampler when the active slide changes
    /// and registers or releases it as playback starts or stops.
    pub fn sync(&mut self, state: &PlaybackState) {
        let index = state.active_index.min(self.progress.len() - 1);
        let index_changed = self.tracked_index != Some(index);
        let start_changed = state.ready_to_start != self.tracked_ready;

        if index_changed {
            self.release();
            self.progress[index] = ProgressState::idle();
        }

        // Slide 0 is restarted whenever playback (re)starts from it.
        if index == 0 && (index_changed || start_changed) {
            self.release();
            self.progress[0] = ProgressState::idle();
        }

        self.tracked_index = Some(index);
        self.tracked_ready = state.ready_to_start;

        if state.is_playing {
            if self.sampler.is_none() {
                debug!(slide = index, "sampler registered");
                self.sampler = Some(Sampler {
                    registration: self.ticker.register(index),
                    fraction: 0.0,
                    last_percent: None,
                });
            }
        } else {
            self.release();
        }
    }

    /// Records one tick for `slide`. Returns true when the rendered indicator changed.
    pub fn sample(&mut self, slide: usize, elapsed: Option<f32>, duration: f32) -> bool {
        let Some(sampler) = self.sampler.as_mut() else {
            return false;
        };
        if sampler.registration.slide() != slide {
            return false;
        }
        let Some(elapsed) = elapsed.filter(|t| t.is_finite()) else {
            return false;
        };
        if !duration.is_finite() || duration <= 0.0 {
            return false;
        }

        let fraction = (elapsed / duration).clamp(0.0, 1.0).max(sampler.fraction);
        sampler.fraction = fraction;

        let state = &mut self.progress[slide];
        state.fraction_complete = fraction;

        let mut changed = false;
        let percent = (fraction * 100.0).ceil() as u8;
        if sampler.last_percent != Some(percent) {
            sampler.last_percent = Some(percent);
            state.fill_percent = percent;
            if state.phase != IndicatorPhase::Completed {
                state.indicator_width_px = active_indicator_width(self.viewport_width);
                state.indicator_color = INDICATOR_ACTIVE_COLOR;
                state.phase = IndicatorPhase::Active;
            }
            changed = true;
        }

        // A sampler only exists while playing, so a paused slide never completes.
        if fraction >= 1.0 && state.phase != IndicatorPhase::Completed {
            state.indicator_width_px = INDICATOR_COLLAPSED_PX;
            state.indicator_color = INDICATOR_COMPLETED_COLOR;
            state.phase = IndicatorPhase::Completed;
            debug!(slide, "indicator completed");
            changed = true;
        }

        changed
    }

    fn release(&mut self) {
        if let Some(sampler) = self.sampler.take() {
            debug!(slide = sampler.registration.slide(), "sampler released");
        }
    }
}
