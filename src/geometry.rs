//! Pixel-space geometry primitives shared by every pipeline stage.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in integer pixel coordinates.
///
/// Rectangles are meaningful only with positive width and height; stages that
/// produce rectangles check `has_area` before handing them on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    /// True if both dimensions are positive.
    pub fn has_area(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Shrinks this rectangle into `frame`: each overflowing edge is pulled
    /// back and the corresponding dimension reduced by the overflow.
    ///
    /// The result may have non-positive width or height when the rectangle
    /// lies entirely outside `frame`; callers decide whether that is an error.
    pub fn clamped_to(&self, frame: Rect) -> Rect {
        let mut r = *self;
        if r.x < frame.x {
            r.width -= frame.x - r.x;
            r.x = frame.x;
        }
        if r.y < frame.y {
            r.height -= frame.y - r.y;
            r.y = frame.y;
        }
        if r.right() > frame.right() {
            r.width = frame.right() - r.x;
        }
        if r.bottom() > frame.bottom() {
            r.height = frame.bottom() - r.y;
        }
        r
    }
}

/// Manual pixel correction applied after scaling, owned by persisted
/// configuration and read-only to this crate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offset {
    pub dx: i32,
    pub dy: i32,
}

impl Offset {
    pub const fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }
}

/// Per-axis scale factors mapping calibration space to capture space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scale {
    pub sx: f64,
    pub sy: f64,
}

impl Scale {
    pub const IDENTITY: Scale = Scale { sx: 1.0, sy: 1.0 };

    pub fn new(sx: f64, sy: f64) -> Self {
        Self { sx, sy }
    }

    pub fn is_identity(&self) -> bool {
        self.sx == 1.0 && self.sy == 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_inside_is_noop() {
        let frame = Rect::new(0, 0, 1920, 1080);
        let r = Rect::new(100, 200, 300, 400);
        assert_eq!(r.clamped_to(frame), r);
    }

    #[test]
    fn test_clamp_shrinks_left_and_top() {
        let frame = Rect::new(0, 0, 1920, 1080);
        let r = Rect::new(-30, -10, 100, 100);
        let c = r.clamped_to(frame);
        assert_eq!(c, Rect::new(0, 0, 70, 90));
    }

    #[test]
    fn test_clamp_shrinks_right_and_bottom() {
        let frame = Rect::new(0, 0, 1920, 1080);
        let r = Rect::new(1900, 1070, 100, 100);
        let c = r.clamped_to(frame);
        assert_eq!(c, Rect::new(1900, 1070, 20, 10));
    }

    #[test]
    fn test_clamp_never_grows() {
        let frame = Rect::new(0, 0, 800, 600);
        let rects = [
            Rect::new(-50, -50, 200, 200),
            Rect::new(700, 500, 300, 300),
            Rect::new(10, 10, 20, 20),
        ];
        for r in rects {
            let c = r.clamped_to(frame);
            assert!(c.width <= r.width);
            assert!(c.height <= r.height);
        }
    }

    #[test]
    fn test_clamp_fully_outside_has_no_area() {
        let frame = Rect::new(0, 0, 800, 600);
        let r = Rect::new(900, 700, 50, 50);
        assert!(!r.clamped_to(frame).has_area());
    }

    #[test]
    fn test_clamp_nonzero_frame_origin() {
        let frame = Rect::new(100, 100, 200, 200);
        let r = Rect::new(50, 150, 100, 100);
        assert_eq!(r.clamped_to(frame), Rect::new(100, 150, 50, 100));
    }
}
