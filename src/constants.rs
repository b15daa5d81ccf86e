use raylib::prelude::Color;

pub const WINDOW_WIDTH: i32 = 1280;           // Default window width
pub const WINDOW_HEIGHT: i32 = 800;           // Default window height
pub const FPS: u32 = 60;                      // Display refresh cadence

pub const DECODE_WIDTH: i32 = 1280;           // Decoded frame width (pixels)
pub const DECODE_HEIGHT: i32 = 720;           // Decoded frame height (pixels)
pub const DECODE_FPS: u32 = 30;               // Decoded frame rate
pub const FRAME_QUEUE_DEPTH: usize = 8;       // Frames buffered ahead of playback

pub const SLIDE_TRANSITION_DURATION: f32 = 2.0; // Strip slide animation (seconds)
pub const INDICATOR_TWEEN_DURATION: f32 = 0.5;  // Indicator resize animation (seconds)

// Viewport breakpoints (pixels)
pub const BREAKPOINT_SMALL: f32 = 760.0;
pub const BREAKPOINT_MEDIUM: f32 = 1200.0;
pub const BREAKPOINT_STRIP: f32 = 640.0;

// Active indicator width, in percent of the viewport width
pub const INDICATOR_VW_SMALL: f32 = 10.0;
pub const INDICATOR_VW_MEDIUM: f32 = 10.0;
pub const INDICATOR_VW_LARGE: f32 = 4.0;

pub const INDICATOR_COLLAPSED_PX: f32 = 12.0;
pub const INDICATOR_ACTIVE_COLOR: Color = Color::new(0xff, 0xff, 0xff, 0xff);
pub const INDICATOR_COMPLETED_COLOR: Color = Color::new(0xaf, 0xaf, 0xaf, 0xff);
pub const INDICATOR_IDLE_COLOR: Color = Color::new(0xe5, 0xe7, 0xeb, 0xff);
pub const INDICATOR_TRACK_COLOR: Color = Color::new(0xd1, 0xd5, 0xdb, 0xff);

pub const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "m4v", "mov", "webm", "mkv"];
pub const MANIFEST_FILE_NAME: &str = "carousel.toml";
