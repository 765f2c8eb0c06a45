//! View space ↔ image space.
//!
//! The canvas is a fixed-size viewport. It shows either the whole image or a
//! zoom sub-rectangle of it, scaled uniformly so it fits. Pointer input arrives
//! in view space; polygons are composited in image space.

/// A point on the display viewport, in screen pixels relative to its top-left.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewPoint {
    pub x: f32,
    pub y: f32,
}

impl ViewPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A pixel coordinate on the full-resolution image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImagePoint {
    pub x: i32,
    pub y: i32,
}

impl ImagePoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Size of the display surface in screen pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub const MIN_PERCENT: u32 = 20;
    pub const MAX_PERCENT: u32 = 80;

    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Viewport covering `percent` of the screen in each axis (clamped to 20..=80).
    pub fn from_screen(screen_width: f32, screen_height: f32, percent: u32) -> Self {
        let factor = percent.clamp(Self::MIN_PERCENT, Self::MAX_PERCENT) as f32 / 100.0;
        Self::new(
            (screen_width * factor).trunc(),
            (screen_height * factor).trunc(),
        )
    }
}

/// Image-space rectangle currently shown in the viewport.
///
/// Always normalized (`x1 < x2`, `y1 < y2`) and inside `[0, w] × [0, h]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ZoomRegion {
    x1: u32,
    y1: u32,
    x2: u32,
    y2: u32,
}

impl ZoomRegion {
    /// Order and clamp two corners against an image of `width × height`.
    /// Returns `None` if nothing of area remains.
    pub fn new(a: ImagePoint, b: ImagePoint, width: u32, height: u32) -> Option<Self> {
        let clamp_x = |v: i32| v.clamp(0, width as i32) as u32;
        let clamp_y = |v: i32| v.clamp(0, height as i32) as u32;
        let (x1, x2) = (clamp_x(a.x.min(b.x)), clamp_x(a.x.max(b.x)));
        let (y1, y2) = (clamp_y(a.y.min(b.y)), clamp_y(a.y.max(b.y)));
        (x1 < x2 && y1 < y2).then_some(Self { x1, y1, x2, y2 })
    }

    /// Re-clamp against new image dimensions (e.g. after loading another frame).
    pub fn clamped_to(self, width: u32, height: u32) -> Option<Self> {
        Self::new(self.origin(), self.corner(), width, height)
    }

    pub fn origin(&self) -> ImagePoint {
        ImagePoint::new(self.x1 as i32, self.y1 as i32)
    }

    pub fn corner(&self) -> ImagePoint {
        ImagePoint::new(self.x2 as i32, self.y2 as i32)
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }
}

/// Converts between view space and image space for one fixed display state.
///
/// Build a fresh mapper whenever the viewport, the image or the zoom region
/// changes; the scale factor is derived from all three.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mapper {
    scale: f32,
    origin: ImagePoint,
    source: (u32, u32),
    zoomed: bool,
}

impl Mapper {
    pub fn new(viewport: Viewport, image_size: (u32, u32), zoom: Option<ZoomRegion>) -> Self {
        let (origin, source) = match zoom {
            Some(region) => (region.origin(), (region.width(), region.height())),
            None => (ImagePoint::new(0, 0), image_size),
        };
        let (sw, sh) = (source.0.max(1) as f32, source.1.max(1) as f32);
        let scale = (viewport.width / sw).min(viewport.height / sh);
        Self {
            scale,
            origin,
            source,
            zoomed: zoom.is_some(),
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn is_zoomed(&self) -> bool {
        self.zoomed
    }

    pub fn to_image_space(&self, p: ViewPoint) -> ImagePoint {
        ImagePoint::new(
            (p.x / self.scale) as i32 + self.origin.x,
            (p.y / self.scale) as i32 + self.origin.y,
        )
    }

    pub fn to_view_space(&self, p: ImagePoint) -> ViewPoint {
        ViewPoint::new(
            (p.x - self.origin.x) as f32 * self.scale,
            (p.y - self.origin.y) as f32 * self.scale,
        )
    }

    /// On-screen size of the scaled source, truncated to whole pixels.
    pub fn display_size(&self) -> (f32, f32) {
        (
            (self.source.0 as f32 * self.scale).trunc(),
            (self.source.1 as f32 * self.scale).trunc(),
        )
    }

    /// Image-space rectangle being shown, as (top-left, bottom-right).
    pub fn source_rect(&self) -> (ImagePoint, ImagePoint) {
        let end = ImagePoint::new(
            self.origin.x + self.source.0 as i32,
            self.origin.y + self.source.1 as i32,
        );
        (self.origin, end)
    }

    /// Zoom region for a rectangle dragged between two view points.
    ///
    /// Corners go through the current transform, so dragging while already
    /// zoomed selects inside the visible region; the result replaces it.
    pub fn zoom_region_from_drag(
        &self,
        a: ViewPoint,
        b: ViewPoint,
        image_size: (u32, u32),
    ) -> Option<ZoomRegion> {
        let top_left = ViewPoint::new(a.x.min(b.x), a.y.min(b.y));
        let bottom_right = ViewPoint::new(a.x.max(b.x), a.y.max(b.y));
        ZoomRegion::new(
            self.to_image_space(top_left),
            self.to_image_space(bottom_right),
            image_size.0,
            image_size.1,
        )
    }
}
