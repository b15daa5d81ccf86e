//! Authoritative playback state for the carousel and the rules that move it.
//!
//! [`PlaybackState::next`] is a pure transition function. [`Sequencer`] wraps
//! it with the readiness-gated command contract: after any transition that
//! changes the control-relevant fields, it emits at most one [`Command`]
//! addressed to the active slide.

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    MetadataLoaded(usize),
    PlaybackStarted(usize),
    SlideEnded(usize),
    VisibilityEntered,
    ManualToggle,
    Reset,
    /// The user pressed the control button; resolves to `Reset` on the last
    /// slide and to `ManualToggle` otherwise.
    ManualControl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Play(usize),
    Pause(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlIcon {
    Replay,
    Play,
    Pause,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackState {
    pub active_index: usize,
    pub is_playing: bool,
    pub has_ended: bool,
    pub is_last_slide: bool,
    pub ready_to_start: bool,
    pub loaded_count: usize,
}

impl PlaybackState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `event` to a deck of `slide_count` slides.
    pub fn next(&self, event: Event, slide_count: usize) -> PlaybackState {
        let mut next = *self;
        next.has_ended = false;
        let last_index = slide_count.saturating_sub(1);

        match event {
            Event::MetadataLoaded(slide) => {
                if slide < slide_count {
                    next.loaded_count = next.loaded_count.saturating_add(1);
                }
            }
            Event::PlaybackStarted(slide) => {
                if slide == self.active_index {
                    next.is_playing = true;
                }
            }
            Event::SlideEnded(slide) => {
                // Stale ends from a slide that is no longer active are dropped.
                if slide == self.active_index {
                    if slide >= last_index {
                        next.is_last_slide = true;
                    } else {
                        next.has_ended = true;
                        next.active_index = slide + 1;
                    }
                }
            }
            Event::VisibilityEntered => {
                if !self.ready_to_start {
                    next.ready_to_start = true;
                    next.is_playing = true;
                }
            }
            Event::ManualToggle => {
                next.is_playing = !self.is_playing;
            }
            Event::Reset => {
                if self.is_last_slide {
                    next.active_index = 0;
                    next.is_last_slide = false;
                }
            }
            Event::ManualControl => {
                let resolved = if self.is_last_slide { Event::Reset } else { Event::ManualToggle };
                return self.next(resolved, slide_count);
            }
        }

        next
    }

    pub fn control_icon(&self) -> ControlIcon {
        if self.is_last_slide {
            ControlIcon::Replay
        } else if !self.is_playing {
            ControlIcon::Play
        } else {
            ControlIcon::Pause
        }
    }

    // Fields whose change re-evaluates the play/pause command.
    fn control_key(&self) -> (bool, usize, bool, bool) {
        (self.ready_to_start, self.active_index, self.has_ended, self.is_playing)
    }
}

pub struct Sequencer {
    slide_count: usize,
    readiness_threshold: usize,
    state: PlaybackState,
}

impl Sequencer {
    /// `readiness_threshold` is the number of metadata reports that must be
    /// exceeded before play/pause commands are issued.
    pub fn new(slide_count: usize, readiness_threshold: usize) -> Self {
        Self {
            slide_count: slide_count.max(1),
            readiness_threshold,
            state: PlaybackState::new(),
        }
    }

    /// Threshold that waits for every slide of the deck to report metadata.
    pub fn default_threshold(slide_count: usize) -> usize {
        slide_count.saturating_sub(1)
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn is_buffered(&self) -> bool {
        self.state.loaded_count > self.readiness_threshold
    }

    pub fn apply(&mut self, event: Event) -> Vec<Command> {
        let previous = self.state;
        self.state = previous.next(event, self.slide_count);

        if self.state != previous {
            debug!(?event, from = ?previous, to = ?self.state, "playback transition");
        }

        let mut commands = Vec::new();
        if self.is_buffered() && self.state.control_key() != previous.control_key() {
            let index = self.state.active_index;
            if !self.state.is_playing {
                commands.push(Command::Pause(index));
            } else if self.state.ready_to_start {
                commands.push(Command::Play(index));
            }
        }
        commands
    }

    /// Clears the one-shot `has_ended` flag once a frame has observed it.
    pub fn settle(&mut self) {
        self.state.has_ended = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn buffered(slide_count: usize) -> Sequencer {
        let mut sequencer = Sequencer::new(slide_count, Sequencer::default_threshold(slide_count));
        for i in 0..slide_count {
            sequencer.apply(Event::MetadataLoaded(i));
        }
        sequencer
    }

    #[test]
    fn starts_idle_at_first_slide() {
        let state = PlaybackState::new();
        assert_eq!(state.active_index, 0);
        assert!(!state.is_playing);
        assert!(!state.ready_to_start);
        assert!(!state.is_last_slide);
        assert_eq!(state.loaded_count, 0);
    }

    #[test]
    fn visibility_starts_playback_once() {
        let mut sequencer = buffered(4);
        assert_eq!(sequencer.apply(Event::VisibilityEntered), vec![Command::Play(0)]);
        assert!(sequencer.state().is_playing);
        assert!(sequencer.state().ready_to_start);

        sequencer.apply(Event::ManualToggle);
        let before = *sequencer.state();
        assert!(sequencer.apply(Event::VisibilityEntered).is_empty());
        assert_eq!(*sequencer.state(), before);
    }

    #[test]
    fn ended_advances_and_flags_entry() {
        let state = PlaybackState { ready_to_start: true, is_playing: true, ..Default::default() };
        let next = state.next(Event::SlideEnded(0), 4);
        assert_eq!(next.active_index, 1);
        assert!(next.has_ended);
        assert!(!next.is_last_slide);
        assert!(next.is_playing);
    }

    #[test]
    fn last_slide_does_not_overflow() {
        let state = PlaybackState { active_index: 3, is_playing: true, ..Default::default() };
        let next = state.next(Event::SlideEnded(3), 4);
        assert_eq!(next.active_index, 3);
        assert!(next.is_last_slide);
        assert!(!next.has_ended);
    }

    #[test]
    fn single_slide_deck_ends_on_first_slide() {
        let next = PlaybackState::new().next(Event::SlideEnded(0), 1);
        assert_eq!(next.active_index, 0);
        assert!(next.is_last_slide);
    }

    #[test]
    fn stale_ended_is_ignored() {
        let state = PlaybackState { active_index: 2, is_playing: true, ..Default::default() };
        assert_eq!(state.next(Event::SlideEnded(1), 4), state);
        assert_eq!(state.next(Event::SlideEnded(3), 4), state);
    }

    #[test]
    fn reset_requires_last_slide() {
        let state = PlaybackState { active_index: 2, ..Default::default() };
        assert_eq!(state.next(Event::Reset, 4), state);

        let finished = PlaybackState { active_index: 3, is_last_slide: true, is_playing: true, ..Default::default() };
        let next = finished.next(Event::Reset, 4);
        assert_eq!(next.active_index, 0);
        assert!(!next.is_last_slide);
        assert!(next.is_playing);
    }

    #[test]
    fn manual_control_resolves_by_state() {
        let playing = PlaybackState { is_playing: true, ..Default::default() };
        assert!(!playing.next(Event::ManualControl, 4).is_playing);

        let finished = PlaybackState { active_index: 3, is_last_slide: true, is_playing: true, ..Default::default() };
        let next = finished.next(Event::ManualControl, 4);
        assert_eq!(next.active_index, 0);
        assert!(next.is_playing);
    }

    #[test]
    fn control_icon_prefers_replay() {
        let mut state = PlaybackState::new();
        assert_eq!(state.control_icon(), ControlIcon::Play);
        state.is_playing = true;
        assert_eq!(state.control_icon(), ControlIcon::Pause);
        state.is_last_slide = true;
        assert_eq!(state.control_icon(), ControlIcon::Replay);
    }

    #[test]
    fn playback_started_only_for_active_slide() {
        let state = PlaybackState { active_index: 1, ..Default::default() };
        assert!(!state.next(Event::PlaybackStarted(0), 4).is_playing);
        assert!(state.next(Event::PlaybackStarted(1), 4).is_playing);
    }

    #[test]
    fn no_commands_until_buffered() {
        let mut sequencer = Sequencer::new(4, 3);
        for i in 0..3 {
            assert!(sequencer.apply(Event::MetadataLoaded(i)).is_empty());
        }
        assert!(sequencer.apply(Event::VisibilityEntered).is_empty());
        assert!(sequencer.state().is_playing);

        // Loading alone is bookkeeping; the next state change issues the command.
        assert!(sequencer.apply(Event::MetadataLoaded(3)).is_empty());
        assert_eq!(sequencer.apply(Event::ManualToggle), vec![Command::Pause(0)]);
    }

    #[test]
    fn play_waits_for_visibility() {
        let mut sequencer = buffered(3);
        // Toggled on before the carousel was ever seen: nothing to play yet.
        assert!(sequencer.apply(Event::ManualToggle).is_empty());
        assert_eq!(sequencer.apply(Event::ManualToggle), vec![Command::Pause(0)]);
    }

    #[test]
    fn commands_target_active_slide_only() {
        let mut sequencer = buffered(3);
        sequencer.apply(Event::VisibilityEntered);
        assert_eq!(sequencer.apply(Event::SlideEnded(0)), vec![Command::Play(1)]);
        sequencer.settle();
        assert_eq!(sequencer.apply(Event::ManualToggle), vec![Command::Pause(1)]);
        assert!(sequencer.apply(Event::SlideEnded(0)).is_empty());
    }

    #[test]
    fn last_slide_end_and_reset_commands() {
        let mut sequencer = buffered(2);
        sequencer.apply(Event::VisibilityEntered);
        sequencer.apply(Event::SlideEnded(0));
        sequencer.settle();

        assert!(sequencer.apply(Event::SlideEnded(1)).is_empty());
        assert!(sequencer.state().is_last_slide);
        assert_eq!(sequencer.apply(Event::ManualControl), vec![Command::Play(0)]);
        assert_eq!(sequencer.state().active_index, 0);
    }

    #[test]
    fn settle_clears_has_ended_without_commands() {
        let mut sequencer = buffered(3);
        sequencer.apply(Event::VisibilityEntered);
        sequencer.apply(Event::SlideEnded(0));
        assert!(sequencer.state().has_ended);
        sequencer.settle();
        assert!(!sequencer.state().has_ended);
        assert!(sequencer.state().is_playing);
    }

    #[test]
    fn concrete_four_slide_session() {
        let mut sequencer = buffered(4);

        sequencer.apply(Event::VisibilityEntered);
        assert!(sequencer.state().is_playing);
        assert_eq!(sequencer.state().active_index, 0);

        sequencer.apply(Event::SlideEnded(0));
        sequencer.settle();
        assert_eq!(sequencer.state().active_index, 1);

        sequencer.apply(Event::SlideEnded(1));
        sequencer.settle();
        assert_eq!(sequencer.state().active_index, 2);

        assert_eq!(sequencer.apply(Event::ManualToggle), vec![Command::Pause(2)]);
        assert!(!sequencer.state().is_playing);
        assert_eq!(sequencer.state().active_index, 2);

        assert_eq!(sequencer.apply(Event::ManualToggle), vec![Command::Play(2)]);

        sequencer.apply(Event::SlideEnded(2));
        sequencer.settle();
        sequencer.apply(Event::SlideEnded(3));
        assert!(sequencer.state().is_last_slide);
        assert_eq!(sequencer.state().active_index, 3);

        sequencer.apply(Event::Reset);
        assert_eq!(sequencer.state().active_index, 0);
        assert!(!sequencer.state().is_last_slide);
    }

    fn event_strategy(slide_count: usize) -> impl Strategy<Value = Event> {
        let index = 0..slide_count + 1;
        prop_oneof![
            index.clone().prop_map(Event::MetadataLoaded),
            index.clone().prop_map(Event::PlaybackStarted),
            index.prop_map(Event::SlideEnded),
            Just(Event::VisibilityEntered),
            Just(Event::ManualToggle),
            Just(Event::Reset),
            Just(Event::ManualControl),
        ]
    }

    fn session_strategy() -> impl Strategy<Value = (usize, Vec<Event>)> {
        (1usize..8).prop_flat_map(|n| (Just(n), prop::collection::vec(event_strategy(n), 0..64)))
    }

    proptest! {
        #[test]
        fn state_invariants_hold((slide_count, events) in session_strategy()) {
            let mut sequencer = Sequencer::new(slide_count, Sequencer::default_threshold(slide_count));
            let mut was_ready = false;
            let mut loaded = 0;

            for event in events {
                let before = *sequencer.state();
                let commands = sequencer.apply(event);
                let after = *sequencer.state();

                prop_assert!(after.active_index < slide_count);
                prop_assert!(!was_ready || after.ready_to_start);
                prop_assert!(after.loaded_count >= loaded);
                prop_assert!(commands.len() <= 1);
                for command in &commands {
                    match command {
                        Command::Play(i) | Command::Pause(i) => prop_assert_eq!(*i, after.active_index),
                    }
                }
                if event == Event::ManualToggle {
                    prop_assert_eq!(after.is_playing, !before.is_playing);
                    prop_assert_eq!(after.active_index, before.active_index);
                }
                if before.has_ended {
                    // A one-shot flag never survives the following transition
                    // unless that transition ends another slide.
                    prop_assert!(!after.has_ended || matches!(event, Event::SlideEnded(_)));
                }

                was_ready = after.ready_to_start;
                loaded = after.loaded_count;
            }
        }
    }
}
