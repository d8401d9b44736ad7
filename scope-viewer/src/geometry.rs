#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

/// Translation plus uniform scale: `global = local * k + (x, y)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub x: f32,
    pub y: f32,
    pub k: f32,
}

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine {
    pub const IDENTITY: Affine = Affine { x: 0.0, y: 0.0, k: 1.0 };

    pub const fn new(x: f32, y: f32, k: f32) -> Self {
        Self { x, y, k }
    }

    pub const fn translate(x: f32, y: f32) -> Self {
        Self { x, y, k: 1.0 }
    }

    pub fn apply(&self, p: Point) -> Point {
        Point::new(p.x * self.k + self.x, p.y * self.k + self.y)
    }

    pub fn invert(&self, p: Point) -> Point {
        Point::new((p.x - self.x) / self.k, (p.y - self.y) / self.k)
    }

    /// Maps a point local to `from` into the local space of `to`, both being
    /// children of the same stage.
    pub fn to_local(p: Point, from: &Affine, to: &Affine) -> Point {
        to.invert(from.apply(p))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    pub fn of(points: &[Point]) -> Option<Self> {
        let first = *points.first()?;
        Some(points.iter().fold(
            Bounds {
                min: first,
                max: first,
            },
            |b, p| Bounds {
                min: Point::new(b.min.x.min(p.x), b.min.y.min(p.y)),
                max: Point::new(b.max.x.max(p.x), b.max.y.max(p.y)),
            },
        ))
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

/// Closed polygon used for lasso hit testing.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: Vec<Point>,
    bounds: Option<Bounds>,
}

impl Polygon {
    pub fn new(vertices: Vec<Point>) -> Self {
        let bounds = Bounds::of(&vertices);
        Self { vertices, bounds }
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    /// Even-odd containment. Fewer than three vertices enclose nothing.
    pub fn contains(&self, p: Point) -> bool {
        let n = self.vertices.len();
        if n < 3 {
            return false;
        }
        match self.bounds {
            Some(b) if b.contains(p) => {}
            _ => return false,
        }

        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[j];
            if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Polygon {
        Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
            Point::new(0.0, 0.0),
        ])
    }

    #[test]
    fn square_contains_interior_only() {
        let sq = square();
        assert!(sq.contains(Point::new(5.0, 5.0)));
        assert!(sq.contains(Point::new(0.5, 9.5)));
        assert!(!sq.contains(Point::new(15.0, 5.0)));
        assert!(!sq.contains(Point::new(-1.0, 5.0)));
    }

    #[test]
    fn concave_notch_is_excluded() {
        // U shape open at the top between x=4 and x=6
        let u = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 8.0),
            Point::new(6.0, 8.0),
            Point::new(6.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ]);
        assert!(!u.contains(Point::new(5.0, 4.0)));
        assert!(u.contains(Point::new(2.0, 4.0)));
        assert!(u.contains(Point::new(5.0, 9.0)));
    }

    #[test]
    fn degenerate_polygons_contain_nothing() {
        let line = Polygon::new(vec![Point::new(0.0, 0.0), Point::new(10.0, 10.0)]);
        assert!(!line.contains(Point::new(5.0, 5.0)));
        assert!(!Polygon::new(vec![]).contains(Point::default()));
    }

    #[test]
    fn to_local_accounts_for_both_layers() {
        let sprites = Affine::new(10.0, 20.0, 2.0);
        let overlay = Affine::translate(5.0, 5.0);
        let p = Affine::to_local(Point::new(1.0, 1.0), &sprites, &overlay);
        assert_eq!(p, Point::new(7.0, 17.0));
        assert_eq!(sprites.invert(sprites.apply(p)), p);
    }
}
