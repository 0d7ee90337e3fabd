use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use image::{DynamicImage, RgbaImage};

/// Produces a fresh indicator view for each overlay session.
pub type IndicatorFactory = Arc<dyn Fn() -> IndicatorView + Send + Sync>;

/// Transforms the captured snapshot into the image displayed behind the
/// indicator.
pub type BackgroundProcessor = Arc<dyn Fn(RgbaImage) -> RgbaImage + Send + Sync>;

const DEFAULT_BEFORE_SHOW_DELAY: Duration = Duration::from_millis(700);
const DEFAULT_MIN_SHOW_TIME: Duration = Duration::from_millis(400);
const DEFAULT_VIEW_SIZE: u32 = 100;
const DEFAULT_CIRCLE_COUNT: u32 = 8;
const DEFAULT_CIRCLE_INTERVAL: Duration = Duration::from_millis(150);
const DEFAULT_BOX_COUNT: u32 = 3;
const DEFAULT_BOX_INTERVAL: Duration = Duration::from_millis(200);
// Orange at ~2/3 alpha, the classic spinner look.
const DEFAULT_CIRCLE_COLOR: [u8; 4] = [255, 165, 0, 172];
const DEFAULT_BOX_COLOR: [u8; 4] = [162, 199, 214, 172];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorShape {
    Circles,
    Boxes,
}

/// Appearance of the busy indicator. Pure data: how frames are actually
/// drawn is the host toolkit's concern.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSettings {
    pub shape: IndicatorShape,
    pub color: [u8; 4],
    pub scale: f32,
    pub frame_count: u32,
    pub animation_interval: Duration,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            shape: IndicatorShape::Circles,
            color: DEFAULT_CIRCLE_COLOR,
            scale: 1.0,
            frame_count: DEFAULT_CIRCLE_COUNT,
            animation_interval: DEFAULT_CIRCLE_INTERVAL,
        }
    }
}

/// An indicator instance as handed to the host panel: a sized view plus
/// its appearance settings.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorView {
    pub width: u32,
    pub height: u32,
    pub settings: IndicatorSettings,
}

impl IndicatorView {
    pub fn new(settings: IndicatorSettings) -> Self {
        Self {
            width: DEFAULT_VIEW_SIZE,
            height: DEFAULT_VIEW_SIZE,
            settings,
        }
    }
}

impl Default for IndicatorView {
    fn default() -> Self {
        Self::new(IndicatorSettings::default())
    }
}

/// Immutable overlay configuration. Builder methods consume the value and
/// return an updated one; a config shared with a controller never changes
/// underneath it.
#[derive(Clone)]
pub struct OverlayConfig {
    pub(crate) before_show_delay: Duration,
    pub(crate) min_show_time: Duration,
    pub(crate) indicator_factory: IndicatorFactory,
    pub(crate) background_processor: BackgroundProcessor,
    pub(crate) allow_stop_before_start: bool,
    pub(crate) detect_deadlocks: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            before_show_delay: DEFAULT_BEFORE_SHOW_DELAY,
            min_show_time: DEFAULT_MIN_SHOW_TIME,
            indicator_factory: Arc::new(IndicatorView::default),
            background_processor: Arc::new(grayscale_and_blur),
            allow_stop_before_start: false,
            detect_deadlocks: false,
        }
    }
}

impl OverlayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Debounce: how long an operation must run before the indicator
    /// appears at all.
    pub fn show_indicator_after(mut self, delay: Duration) -> Self {
        self.before_show_delay = delay;
        self
    }

    /// Floor on how long a shown indicator stays visible.
    pub fn hide_indicator_on_complete_after(mut self, min_show_time: Duration) -> Self {
        self.min_show_time = min_show_time;
        self
    }

    pub fn hide_indicator_immediately_on_complete(self) -> Self {
        self.hide_indicator_on_complete_after(Duration::ZERO)
    }

    pub fn with_custom_indicator(mut self, factory: IndicatorFactory) -> Self {
        self.indicator_factory = factory;
        self
    }

    pub fn with_circles_indicator(self, settings: IndicatorSettings) -> Self {
        self.with_custom_indicator(Arc::new(move || {
            IndicatorView::new(IndicatorSettings {
                shape: IndicatorShape::Circles,
                ..settings.clone()
            })
        }))
    }

    pub fn with_boxes_indicator(self) -> Self {
        self.with_custom_indicator(Arc::new(|| {
            IndicatorView::new(IndicatorSettings {
                shape: IndicatorShape::Boxes,
                color: DEFAULT_BOX_COLOR,
                scale: 1.0,
                frame_count: DEFAULT_BOX_COUNT,
                animation_interval: DEFAULT_BOX_INTERVAL,
            })
        }))
    }

    pub fn with_background_processor(mut self, processor: BackgroundProcessor) -> Self {
        self.background_processor = processor;
        self
    }

    pub fn with_grayscale_and_blur_background(self) -> Self {
        self.with_background_processor(Arc::new(grayscale_and_blur))
    }

    /// Keep the captured snapshot as-is.
    pub fn with_unprocessed_background(self) -> Self {
        self.with_background_processor(Arc::new(|image| image))
    }

    /// Tolerate `stop` without a matching `start` instead of reporting an
    /// invalid call.
    pub fn allow_stop_before_start(mut self) -> Self {
        self.allow_stop_before_start = true;
        self
    }

    /// Guard focus claims with the deadlock watchdog.
    pub fn detect_deadlocks(mut self, enabled: bool) -> Self {
        self.detect_deadlocks = enabled;
        self
    }

    pub fn before_show_delay(&self) -> Duration {
        self.before_show_delay
    }

    pub fn min_show_time(&self) -> Duration {
        self.min_show_time
    }

    pub fn allows_stop_before_start(&self) -> bool {
        self.allow_stop_before_start
    }

    pub fn detects_deadlocks(&self) -> bool {
        self.detect_deadlocks
    }
}

impl fmt::Debug for OverlayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayConfig")
            .field("before_show_delay", &self.before_show_delay)
            .field("min_show_time", &self.min_show_time)
            .field("allow_stop_before_start", &self.allow_stop_before_start)
            .field("detect_deadlocks", &self.detect_deadlocks)
            .finish_non_exhaustive()
    }
}

fn grayscale_and_blur(image: RgbaImage) -> RgbaImage {
    DynamicImage::ImageRgba8(image)
        .grayscale()
        .blur(2.0)
        .to_rgba8()
}
