use std::collections::HashMap;

use raylib::prelude::*;
use tracing::{debug, warn};

use crate::carousel::Carousel;
use crate::constants::*;
use crate::player::{MediaBackend, MediaLibrary, StreamStatus};
use crate::progress::ProgressState;
use crate::sequencer::{ControlIcon, Event};

const HEADER_SCREENS: f32 = 1.2;     // Header height, in window heights
const SCROLL_STEP: f32 = 60.0;       // Pixels per wheel notch
const PILL_MARGIN: f32 = 40.0;       // Gap between slides and indicator pill
const PILL_HEIGHT: f32 = 56.0;
const PILL_PADDING: f32 = 28.0;
const DOT_SPACING: f32 = 16.0;
const BUTTON_RADIUS: f32 = 28.0;
const CAPTION_TOP: f32 = 48.0;
const CAPTION_SIZE: i32 = 24;
const TITLE_SIZE: i32 = 48;

/// Page geometry for one frame, in window pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub screen_width: f32,
    pub screen_height: f32,
    pub slide_width: f32,
    pub slide_height: f32,
    pub gap: f32,
    pub strip_left: f32,
    pub carousel_top: f32,
    pub pill_top: f32,
    pub max_scroll: f32,
}

impl Layout {
    pub fn compute(screen_width: f32, screen_height: f32, scroll: f32) -> Self {
        let slide_width = screen_width * if screen_width < BREAKPOINT_SMALL { 0.88 } else { 0.70 };
        let slide_height = (slide_width * 9.0 / 16.0).min(screen_height * 0.7);
        let gap = if screen_width < BREAKPOINT_STRIP { 40.0 } else { 80.0 };
        let header = screen_height * HEADER_SCREENS;
        let carousel_top = header - scroll;
        let pill_top = carousel_top + slide_height + PILL_MARGIN;
        let page_height = header + slide_height + PILL_MARGIN + PILL_HEIGHT + PILL_MARGIN;

        Self {
            screen_width,
            screen_height,
            slide_width,
            slide_height,
            gap,
            strip_left: (screen_width - slide_width) * 0.5,
            carousel_top,
            pill_top,
            max_scroll: (page_height - screen_height).max(0.0),
        }
    }

    /// True once the top edge of the slides is inside the window.
    pub fn carousel_in_view(&self) -> bool {
        self.carousel_top < self.screen_height
    }

    /// Left edge of slide `index` for a strip shifted by `offset` slides.
    pub fn slide_left(&self, index: usize, offset: f32) -> f32 {
        self.strip_left + (index as f32 + offset) * (self.slide_width + self.gap)
    }

    pub fn pill_width(&self, widths: &[f32]) -> f32 {
        widths.iter().map(|w| w + DOT_SPACING).sum::<f32>() + PILL_PADDING * 2.0 - DOT_SPACING
    }

    pub fn pill_left(&self, widths: &[f32]) -> f32 {
        (self.screen_width - self.pill_width(widths) - 2.0 * BUTTON_RADIUS - DOT_SPACING) * 0.5
    }

    pub fn button_center(&self, widths: &[f32]) -> Vector2 {
        Vector2::new(
            self.pill_left(widths) + self.pill_width(widths) + DOT_SPACING + BUTTON_RADIUS,
            self.pill_top + PILL_HEIGHT * 0.5,
        )
    }
}

/// Moves `current` toward `target` so the gap closes in about
/// `INDICATOR_TWEEN_DURATION` seconds.
pub fn approach(current: f32, target: f32, dt: f32) -> f32 {
    let step = (dt * 4.0 / INDICATOR_TWEEN_DURATION).min(1.0);
    let next = current + (target - current) * step;
    if (target - next).abs() < 0.5 { target } else { next }
}

pub struct CarouselView {
    textures: HashMap<usize, Texture2D>,
    scroll: f32,
    autoplay: bool,
    overlay: bool,
    visibility_sent: bool,
    strip_offset: f32,
    strip_tween: ease::Tween,
    shown_index: usize,
    indicator_widths: Vec<f32>,
}

impl CarouselView {
    pub fn new(slide_count: usize, autoplay: bool, overlay: bool) -> Self {
        Self {
            textures: HashMap::new(),
            scroll: 0.0,
            autoplay,
            overlay,
            visibility_sent: false,
            strip_offset: 0.0,
            strip_tween: ease::Tween::new(ease::quad_in_out, 0.0, 0.0, SLIDE_TRANSITION_DURATION),
            shown_index: 0,
            indicator_widths: vec![INDICATOR_COLLAPSED_PX; slide_count],
        }
    }

    fn layout(&self, rl: &RaylibHandle) -> Layout {
        Layout::compute(rl.get_screen_width() as f32, rl.get_screen_height() as f32, self.scroll)
    }

    /// Scrolling and the control button. Returns the events for the carousel.
    pub fn handle_input(&mut self, rl: &RaylibHandle) -> Vec<Event> {
        let mut events = Vec::new();

        let mut delta = -rl.get_mouse_wheel_move() * SCROLL_STEP;
        if rl.is_key_pressed(KeyboardKey::KEY_PAGE_DOWN) || rl.is_key_pressed(KeyboardKey::KEY_DOWN) {
            delta += rl.get_screen_height() as f32 * 0.5;
        }
        if rl.is_key_pressed(KeyboardKey::KEY_PAGE_UP) || rl.is_key_pressed(KeyboardKey::KEY_UP) {
            delta -= rl.get_screen_height() as f32 * 0.5;
        }
        let max_scroll = self.layout(rl).max_scroll;
        self.scroll = (self.scroll + delta).clamp(0.0, max_scroll);

        let layout = self.layout(rl);
        if !self.visibility_sent && (self.autoplay || layout.carousel_in_view()) {
            self.visibility_sent = true;
            debug!(scroll = self.scroll, "carousel scrolled into view");
            events.push(Event::VisibilityEntered);
        }

        let mouse = rl.get_mouse_position();
        let button = layout.button_center(&self.indicator_widths);
        let clicked = rl.is_mouse_button_pressed(MouseButton::MOUSE_BUTTON_LEFT)
            && (mouse.x - button.x).hypot(mouse.y - button.y) <= BUTTON_RADIUS;
        if clicked || rl.is_key_pressed(KeyboardKey::KEY_SPACE) {
            events.push(Event::ManualControl);
        }

        events
    }

    /// Pushes freshly decoded frames into the per-slide textures.
    pub fn upload_frames<B: MediaBackend>(
        &mut self,
        rl: &mut RaylibHandle,
        thread: &RaylibThread,
        library: &mut MediaLibrary<B>,
    ) {
        for slide in 0..library.len() {
            let Some(pixels) = library.take_frame(slide) else {
                continue;
            };

            if !self.textures.contains_key(&slide) {
                let blank = Image::gen_image_color(DECODE_WIDTH, DECODE_HEIGHT, Color::BLACK);
                match rl.load_texture_from_image(thread, &blank) {
                    Ok(texture) => {
                        self.textures.insert(slide, texture);
                    }
                    Err(e) => {
                        warn!(slide, error = %e, "failed to create slide texture");
                        continue;
                    }
                }
            }

            if let Some(texture) = self.textures.get_mut(&slide) {
                if let Err(e) = texture.update_texture(pixels) {
                    warn!(slide, error = %e, "dropped video frame");
                }
            }
        }
    }

    /// Follows the carousel state: retargets the strip animation on slide
    /// changes and eases indicator widths.
    pub fn observe(&mut self, carousel: &Carousel, dt: f32) {
        let state = carousel.state();
        if state.active_index != self.shown_index || state.has_ended {
            self.shown_index = state.active_index;
            let target = carousel.strip_offset_percent() / 100.0;
            self.strip_tween = ease::Tween::new(
                ease::quad_in_out,
                self.strip_offset,
                target,
                SLIDE_TRANSITION_DURATION,
            );
        }
        self.strip_offset = self.strip_tween.apply(dt);

        for (width, progress) in self.indicator_widths.iter_mut().zip(carousel.progress()) {
            *width = approach(*width, progress.indicator_width_px, dt);
        }
    }

    pub fn draw(&self, d: &mut RaylibDrawHandle, carousel: &Carousel, stream: Option<StreamStatus>) {
        let layout = Layout::compute(d.get_screen_width() as f32, d.get_screen_height() as f32, self.scroll);
        d.clear_background(Color::BLACK);

        let title_y = (layout.screen_height * HEADER_SCREENS * 0.5 - self.scroll) as i32;
        d.draw_text("Get the highlights.", (layout.screen_width * 0.06) as i32, title_y, TITLE_SIZE, Color::GRAY);

        for (i, slide) in carousel.slides().iter().enumerate() {
            let left = layout.slide_left(i, self.strip_offset);
            if left > layout.screen_width || left + layout.slide_width < 0.0 {
                continue;
            }
            let frame = Rectangle::new(left, layout.carousel_top, layout.slide_width, layout.slide_height);
            d.draw_rectangle_rounded(frame, 0.08, 16, Color::new(0x10, 0x10, 0x10, 0xff));

            if let Some(texture) = self.textures.get(&i) {
                d.draw_texture_pro(
                    texture,
                    Rectangle::new(0.0, 0.0, texture.width() as f32, texture.height() as f32),
                    frame,
                    Vector2::new(0.0, 0.0),
                    0.0,
                    Color::WHITE,
                );
            }

            for (line, text) in slide.caption_lines.iter().enumerate() {
                d.draw_text(
                    text,
                    (left + layout.slide_width * 0.05) as i32,
                    (layout.carousel_top + CAPTION_TOP) as i32 + line as i32 * (CAPTION_SIZE + 8),
                    CAPTION_SIZE,
                    Color::WHITE,
                );
            }
        }

        self.draw_indicators(d, &layout, carousel.progress());
        self.draw_control(d, layout.button_center(&self.indicator_widths), carousel.control_icon());

        if self.overlay {
            self.draw_overlay(d, carousel, stream);
        }
    }

    fn draw_overlay(&self, d: &mut RaylibDrawHandle, carousel: &Carousel, stream: Option<StreamStatus>) {
        let state = carousel.state();
        let progress = carousel.progress()[state.active_index];
        let lines = [
            format!(
                "slide {}/{}  playing {}  ready {}  last {}  loaded {}",
                state.active_index + 1,
                carousel.slides().len(),
                state.is_playing,
                state.ready_to_start,
                state.is_last_slide,
                state.loaded_count,
            ),
            format!(
                "progress {:.3}  fill {}%  phase {:?}",
                progress.fraction_complete, progress.fill_percent, progress.phase,
            ),
            format!(
                "samplers {}  sampling {}  stream {:?}",
                carousel.sampler_count(),
                carousel.is_sampling(),
                stream,
            ),
        ];
        for (i, line) in lines.iter().enumerate() {
            d.draw_text(line, 10, 10 + i as i32 * 20, 18, Color::LIME);
        }
    }

    fn draw_indicators(&self, d: &mut RaylibDrawHandle, layout: &Layout, progress: &[ProgressState]) {
        let widths = &self.indicator_widths;
        let pill = Rectangle::new(layout.pill_left(widths), layout.pill_top, layout.pill_width(widths), PILL_HEIGHT);
        d.draw_rectangle_rounded(pill, 1.0, 16, INDICATOR_TRACK_COLOR);

        let dot = INDICATOR_COLLAPSED_PX;
        let top = layout.pill_top + (PILL_HEIGHT - dot) * 0.5;
        let mut x = pill.x + PILL_PADDING;
        for (width, state) in widths.iter().zip(progress) {
            d.draw_rectangle_rounded(Rectangle::new(x, top, *width, dot), 1.0, 8, INDICATOR_IDLE_COLOR);
            let fill = (*width * state.fill_percent as f32 / 100.0).max(0.0);
            if fill > 0.0 {
                d.draw_rectangle_rounded(Rectangle::new(x, top, fill, dot), 1.0, 8, state.indicator_color);
            }
            x += width + DOT_SPACING;
        }
    }

    fn draw_control(&self, d: &mut RaylibDrawHandle, center: Vector2, icon: ControlIcon) {
        d.draw_circle_v(center, BUTTON_RADIUS, INDICATOR_TRACK_COLOR);
        let s = BUTTON_RADIUS * 0.4;
        let ink = Color::new(0x1d, 0x1d, 0x1f, 0xff);
        match icon {
            ControlIcon::Play => d.draw_triangle(
                Vector2::new(center.x - s * 0.7, center.y - s),
                Vector2::new(center.x - s * 0.7, center.y + s),
                Vector2::new(center.x + s, center.y),
                ink,
            ),
            ControlIcon::Pause => {
                let bar = s * 0.5;
                d.draw_rectangle_rec(Rectangle::new(center.x - s * 0.8, center.y - s, bar, s * 2.0), ink);
                d.draw_rectangle_rec(Rectangle::new(center.x + s * 0.3, center.y - s, bar, s * 2.0), ink);
            }
            ControlIcon::Replay => {
                d.draw_ring(center, s * 0.7, s, 60.0, 360.0, 24, ink);
                d.draw_triangle(
                    Vector2::new(center.x + s * 0.2, center.y - s * 1.4),
                    Vector2::new(center.x + s * 0.2, center.y - s * 0.3),
                    Vector2::new(center.x + s * 1.1, center.y - s * 0.85),
                    ink,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carousel_enters_view_after_scrolling_past_header() {
        let top = Layout::compute(1280.0, 800.0, 0.0);
        assert!(!top.carousel_in_view());

        let scrolled = Layout::compute(1280.0, 800.0, 200.0);
        assert!(scrolled.carousel_in_view());
        assert!(scrolled.max_scroll > 200.0);
    }

    #[test]
    fn slide_size_follows_breakpoints() {
        let wide = Layout::compute(1600.0, 1000.0, 0.0);
        assert_eq!(wide.slide_width, 1120.0);
        assert_eq!(wide.gap, 80.0);

        let narrow = Layout::compute(600.0, 1000.0, 0.0);
        assert_eq!(narrow.slide_width, 528.0);
        assert_eq!(narrow.gap, 40.0);
    }

    #[test]
    fn strip_offset_moves_whole_slides() {
        let layout = Layout::compute(1600.0, 1000.0, 0.0);
        assert_eq!(layout.slide_left(0, 0.0), layout.strip_left);
        assert_eq!(layout.slide_left(2, -2.0), layout.strip_left);
        assert_eq!(layout.slide_left(1, 0.0) - layout.slide_left(0, 0.0), 1200.0);
    }

    #[test]
    fn approach_converges_on_target() {
        let mut width = INDICATOR_COLLAPSED_PX;
        for _ in 0..60 {
            width = approach(width, 64.0, 1.0 / 60.0);
        }
        assert_eq!(width, 64.0);
        assert_eq!(approach(10.0, 10.0, 0.016), 10.0);
        assert_eq!(approach(0.0, 100.0, 10.0), 100.0);
    }
}
