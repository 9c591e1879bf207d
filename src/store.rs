use std::fmt;

// ── Data Model ──────────────────────────────────────────────────────────────

/// Pixel position on the image being annotated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Rounds a sub-pixel image position down and clamps it into an image of
    /// `size` pixels.
    pub fn from_image_pos(x: f32, y: f32, size: (u32, u32)) -> Self {
        let max_x = size.0.saturating_sub(1) as i32;
        let max_y = size.1.saturating_sub(1) as i32;
        Self::new(
            (x.floor() as i32).clamp(0, max_x),
            (y.floor() as i32).clamp(0, max_y),
        )
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Points of one drag gesture, in drawing order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Contour {
    points: Vec<Point>,
}

impl Contour {
    fn starting_at(p: Point) -> Self {
        Self { points: vec![p] }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }
}

/// Renders as a literal point list, e.g. `[(1, 2), (3, 4)]`.
impl fmt::Display for Contour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, p) in self.points.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{p}")?;
        }
        f.write_str("]")
    }
}

impl FromIterator<Point> for Contour {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

// ── Annotation Set ──────────────────────────────────────────────────────────

/// Contours drawn on the currently open image.
///
/// At most one contour is "active" at a time, namely the last one while a
/// gesture is in progress.
#[derive(Clone, Debug, Default)]
pub struct AnnotationSet {
    contours: Vec<Contour>,
    drawing: bool,
}

impl AnnotationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new contour. An unfinished contour is kept as drawn so far.
    pub fn begin_contour(&mut self, p: Point) {
        self.contours.push(Contour::starting_at(p));
        self.drawing = true;
    }

    pub fn extend_current(&mut self, p: Point) {
        if let Some(contour) = self.active_mut() {
            contour.points.push(p);
        }
    }

    pub fn end_contour(&mut self, p: Point) {
        if let Some(contour) = self.active_mut() {
            contour.points.push(p);
        }
        self.drawing = false;
    }

    pub fn clear(&mut self) {
        self.contours.clear();
        self.drawing = false;
    }

    fn active_mut(&mut self) -> Option<&mut Contour> {
        if self.drawing {
            self.contours.last_mut()
        } else {
            None
        }
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    pub fn contours(&self) -> &[Contour] {
        &self.contours
    }

    pub fn len(&self) -> usize {
        self.contours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }
}
