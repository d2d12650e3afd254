#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PanelSize {
    pub width: i32,
    pub height: i32,
}

impl PanelSize {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SurfaceGeometry {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl SurfaceGeometry {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn intersects(self, other: SurfaceGeometry) -> bool {
        if self.width <= 0 || self.height <= 0 || other.width <= 0 || other.height <= 0 {
            return false;
        }
        let left = self.x.max(other.x);
        let right = self
            .x
            .saturating_add(self.width)
            .min(other.x.saturating_add(other.width));
        let top = self.y.max(other.y);
        let bottom = self
            .y
            .saturating_add(self.height)
            .min(other.y.saturating_add(other.height));
        right > left && bottom > top
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenArea {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl ScreenArea {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelMargins {
    pub right: i32,
    pub bottom: i32,
}

impl PanelMargins {
    pub const fn new(right: i32, bottom: i32) -> Self {
        Self { right, bottom }
    }
}

/// Geometry of the floating fallback: anchored to the bottom-right corner of `area`.
pub fn floating_placement(area: ScreenArea, size: PanelSize, margins: PanelMargins) -> SurfaceGeometry {
    let width = size.width.max(1);
    let height = size.height.max(1);
    let x = area
        .x
        .saturating_add(area.width)
        .saturating_sub(width)
        .saturating_sub(margins.right)
        .max(area.x);
    let y = area
        .y
        .saturating_add(area.height)
        .saturating_sub(height)
        .saturating_sub(margins.bottom)
        .max(area.y);
    SurfaceGeometry::new(x, y, width, height)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GeometrySnapshot {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub is_active: bool,
    pub is_visible: bool,
}

impl GeometrySnapshot {
    pub const NONE: GeometrySnapshot = GeometrySnapshot {
        x: 0,
        y: 0,
        width: 0,
        height: 0,
        is_active: false,
        is_visible: false,
    };

    pub fn from_surface(geometry: SurfaceGeometry, is_active: bool, is_visible: bool) -> Self {
        Self {
            x: geometry.x,
            y: geometry.y,
            width: geometry.width,
            height: geometry.height,
            is_active,
            is_visible,
        }
    }

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }

    pub fn bounds(&self) -> SurfaceGeometry {
        SurfaceGeometry::new(self.x, self.y, self.width, self.height)
    }
}
