//! Pixel-space rectangles

use crate::transform::Transform;

/// Horizontal placement inside a containing rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HAlign {
    Left,
    Center,
    Right,
}

/// Vertical placement inside a containing rectangle. `Top` is the
/// high-y edge (coordinates are y-up).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VAlign {
    Top,
    Middle,
    Bottom,
}

/// An axis-aligned box in integer pixel coordinates, y-up, with the
/// origin at its lower-left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rectangle {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Rectangle {
        Rectangle {
            x,
            y,
            width,
            height,
        }
    }

    /// Center of the rectangle in (fractional) pixel coordinates.
    pub fn center(&self) -> (f32, f32) {
        (
            self.x as f32 + self.width as f32 / 2.0,
            self.y as f32 + self.height as f32 / 2.0,
        )
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x
            && y >= self.y
            && x < self.x + self.width as i32
            && y < self.y + self.height as i32
    }

    /// Translation to the rectangle's center.
    pub fn translation(&self) -> Transform {
        let (cx, cy) = self.center();
        Transform::identity().translate(cx, cy)
    }

    /// Maps the unit square centered at the origin (corners at ±0.5 on
    /// each axis) onto this rectangle.
    pub fn transformation(&self) -> Transform {
        self.translation().scale(self.width as f32, self.height as f32)
    }

    /// Pure offset; preserves size.
    pub fn moved(self, dx: i32, dy: i32) -> Rectangle {
        Rectangle {
            x: self.x + dx,
            y: self.y + dy,
            ..self
        }
    }

    /// Adjust the size by `(dw, dh)`, shifting the origin by half the
    /// delta to keep the box roughly centered. The half is a truncating
    /// division, so odd deltas land asymmetrically; negative deltas
    /// shrink, clamping the size at zero.
    pub fn grow(self, dw: i32, dh: i32) -> Rectangle {
        Rectangle {
            x: self.x - dw / 2,
            y: self.y - dh / 2,
            width: (self.width as i64 + dw as i64).max(0) as u32,
            height: (self.height as i64 + dh as i64).max(0) as u32,
        }
    }

    /// Scale the size by `(fx, fy)`, truncating toward zero, and
    /// recenter by half the size delta with the same truncation as
    /// [`Rectangle::grow`].
    pub fn scale(self, fx: f32, fy: f32) -> Rectangle {
        let width = ((self.width as f32 * fx) as i64).max(0) as u32;
        let height = ((self.height as f32 * fy) as i64).max(0) as u32;
        let dw = width as i32 - self.width as i32;
        let dh = height as i32 - self.height as i32;
        Rectangle {
            x: self.x - dw / 2,
            y: self.y - dh / 2,
            width,
            height,
        }
    }

    /// Place a `width`×`height` box inside this rectangle.
    ///
    /// Centered placements offset by `(old - new) / 2` with truncating
    /// signed division, which biases the result by one pixel toward the
    /// lower/left side when the size difference is odd or negative.
    pub fn position(&self, width: u32, height: u32, halign: HAlign, valign: VAlign) -> Rectangle {
        let x = self.x
            + match halign {
                HAlign::Left => 0,
                HAlign::Center => (self.width as i32 - width as i32) / 2,
                HAlign::Right => self.width as i32 - width as i32,
            };
        let y = self.y
            + match valign {
                VAlign::Bottom => 0,
                VAlign::Middle => (self.height as i32 - height as i32) / 2,
                VAlign::Top => self.height as i32 - height as i32,
            };
        Rectangle {
            x,
            y,
            width,
            height,
        }
    }
}
