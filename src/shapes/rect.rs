/// Axis-aligned pixel rectangle anchored at its top-left corner.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Rect {
        Rect { x, y, w, h }
    }

    /// Build from corner coordinates, returning `None` for empty or inverted spans.
    pub fn from_corners(x1: u32, y1: u32, x2: u32, y2: u32) -> Option<Rect> {
        if x2 <= x1 || y2 <= y1 {
            return None;
        }

        Some(Rect {
            x: x1,
            y: y1,
            w: x2 - x1,
            h: y2 - y1,
        })
    }

    pub fn left(&self) -> u32 {
        self.x
    }
    pub fn right(&self) -> u32 {
        self.x + self.w
    }
    pub fn top(&self) -> u32 {
        self.y
    }
    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }
    pub fn area(&self) -> u32 {
        self.w * self.h
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.right() <= width && self.bottom() <= height
    }

    /// Grow by `dx` on the left and right and `dy` on the top and bottom,
    /// clipping the result to a `width` x `height` image.
    pub fn expand(&self, dx: u32, dy: u32, width: u32, height: u32) -> Rect {
        let left = self.left().saturating_sub(dx);
        let top = self.top().saturating_sub(dy);
        let right = self.right().saturating_add(dx).min(width);
        let bottom = self.bottom().saturating_add(dy).min(height);

        Rect {
            x: left,
            y: top,
            w: right.saturating_sub(left),
            h: bottom.saturating_sub(top),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_corners_rejects_empty_spans() {
        assert_eq!(Rect::from_corners(5, 5, 5, 10), None);
        assert_eq!(Rect::from_corners(5, 5, 10, 4), None);
        assert_eq!(Rect::from_corners(1, 2, 4, 8), Some(Rect::new(1, 2, 3, 6)));
    }

    #[test]
    fn expand_inside_image() {
        let r = Rect::new(20, 30, 10, 20).expand(2, 4, 100, 100);
        assert_eq!(r, Rect::new(18, 26, 14, 28));
        assert_eq!(r.area(), 14 * 28);
    }

    #[test]
    fn expand_clips_to_every_edge() {
        let r = Rect::new(1, 2, 96, 95).expand(10, 10, 100, 100);
        assert_eq!(r, Rect::new(0, 0, 100, 100));
        assert!(r.fits_within(100, 100));
    }
}
