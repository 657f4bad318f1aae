/// Axis-aligned box in centimeters. `left`/`top` may be negative, `width`/`height` never are.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, by: Point) -> Point {
        Point::new(self.x + by.x, self.y + by.y)
    }
}

impl BoundingBox {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.left, self.top)
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let left = self.left.min(other.left);
        let top = self.top.min(other.top);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        BoundingBox::new(left, top, right - left, bottom - top)
    }

    /// Same size, moved so that `origin` becomes (0, 0).
    pub fn relative_to(&self, origin: Point) -> BoundingBox {
        BoundingBox {
            left: self.left - origin.x,
            top: self.top - origin.y,
            ..*self
        }
    }

    pub fn translated(&self, by: Point) -> BoundingBox {
        BoundingBox {
            left: self.left + by.x,
            top: self.top + by.y,
            ..*self
        }
    }
}

/// Axis-aligned box enclosing `bbox` after rotating it about its own center.
///
/// A zero rotation returns the input untouched so unrotated shapes never pick up
/// trigonometric noise.
pub fn rotated_bounding_box(bbox: &BoundingBox, rotation_degrees: f64) -> BoundingBox {
    if rotation_degrees == 0.0 {
        return *bbox;
    }
    let (sin, cos) = rotation_degrees.to_radians().sin_cos();
    let (s, c) = (sin.abs(), cos.abs());
    let width = bbox.width * c + bbox.height * s;
    let height = bbox.width * s + bbox.height * c;
    let center = bbox.center();
    BoundingBox::new(center.x - width / 2.0, center.y - height / 2.0, width, height)
}

/// Union of all boxes, `None` for an empty iterator.
pub fn union_all<'a>(boxes: impl IntoIterator<Item = &'a BoundingBox>) -> Option<BoundingBox> {
    boxes
        .into_iter()
        .fold(None, |acc: Option<BoundingBox>, b| match acc {
            Some(a) => Some(a.union(b)),
            None => Some(*b),
        })
}
