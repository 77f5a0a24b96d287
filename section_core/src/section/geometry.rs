//! Planar geometry helpers and the bending frame

use serde::{Deserialize, Serialize};

/// A point in the section plane
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Create a point
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    /// The origin
    pub fn origin() -> Self {
        Point::default()
    }

    /// True when both coordinates are finite
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Point { x, y }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}

/// Area and centroid of a triangle (area is unsigned).
pub fn triangle_properties(a: Point, b: Point, c: Point) -> (f64, Point) {
    let cross = (b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y);
    let centroid = Point::new((a.x + b.x + c.x) / 3.0, (a.y + b.y + c.y) / 3.0);
    (0.5 * cross.abs(), centroid)
}

/// Area and centroid of a simple polygon (area is unsigned).
///
/// Degenerate polygons return zero area at the mean of their vertices.
pub fn polygon_properties(vertices: &[Point]) -> (f64, Point) {
    let n = vertices.len();
    let mean = || {
        let k = n.max(1) as f64;
        Point::new(
            vertices.iter().map(|v| v.x).sum::<f64>() / k,
            vertices.iter().map(|v| v.y).sum::<f64>() / k,
        )
    };
    if n < 3 {
        return (0.0, mean());
    }

    // Shoelace about the first vertex to limit cancellation
    let o = vertices[0];
    let (mut twice_area, mut cx, mut cy) = (0.0, 0.0, 0.0);
    for i in 1..n - 1 {
        let (a, b) = (vertices[i], vertices[i + 1]);
        let (ax, ay, bx, by) = (a.x - o.x, a.y - o.y, b.x - o.x, b.y - o.y);
        let cross = ax * by - bx * ay;
        twice_area += cross;
        cx += (ax + bx) * cross;
        cy += (ay + by) * cross;
    }
    if twice_area == 0.0 {
        return (0.0, mean());
    }
    (
        0.5 * twice_area.abs(),
        Point::new(o.x + cx / (3.0 * twice_area), o.y + cy / (3.0 * twice_area)),
    )
}

/// Split a convex polygon along the line `u(p) = cut` of the projection for `theta`.
///
/// Returns the parts with `u >= cut` and `u <= cut`; either may be empty.
pub fn split_polygon(vertices: &[Point], theta: f64, cut: f64) -> (Vec<Point>, Vec<Point>) {
    let mut above = Vec::with_capacity(vertices.len() + 2);
    let mut below = Vec::with_capacity(vertices.len() + 2);
    for (i, &a) in vertices.iter().enumerate() {
        let b = vertices[(i + 1) % vertices.len()];
        let (ua, ub) = (project(theta, a) - cut, project(theta, b) - cut);
        if ua >= 0.0 {
            above.push(a);
        }
        if ua <= 0.0 {
            below.push(a);
        }
        if (ua > 0.0 && ub < 0.0) || (ua < 0.0 && ub > 0.0) {
            let t = ua / (ua - ub);
            let p = Point::new(a.x + t * (b.x - a.x), a.y + t * (b.y - a.y));
            above.push(p);
            below.push(p);
        }
    }
    (above, below)
}

/// Projection of the section onto the compression normal for a bending angle.
///
/// The neutral axis runs along `(cos θ, sin θ)`. The compression side lies
/// in the direction `(-sin θ, cos θ)`, so with `θ = 0` the top of the
/// section (largest `y`) is in compression under positive curvature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BendingFrame {
    /// Neutral axis angle (radians)
    pub theta: f64,
    /// Projection of the extreme compressive fibre
    pub top: f64,
    /// Projection of the extreme tensile fibre
    pub bottom: f64,
}

impl BendingFrame {
    /// Build a frame from the points bounding the section.
    ///
    /// Returns a zero-depth frame at the origin for an empty iterator.
    pub fn new(theta: f64, points: impl IntoIterator<Item = Point>) -> Self {
        let mut top = f64::NEG_INFINITY;
        let mut bottom = f64::INFINITY;
        for p in points {
            let u = project(theta, p);
            top = top.max(u);
            bottom = bottom.min(u);
        }
        if top < bottom {
            top = 0.0;
            bottom = 0.0;
        }
        BendingFrame { theta, top, bottom }
    }

    /// Coordinate of a point along the compression normal
    pub fn project(&self, p: Point) -> f64 {
        project(self.theta, p)
    }

    /// Distance of a point below the extreme compressive fibre
    pub fn depth_of(&self, p: Point) -> f64 {
        self.top - self.project(p)
    }

    /// Section depth perpendicular to the neutral axis
    pub fn depth(&self) -> f64 {
        self.top - self.bottom
    }
}

/// `u(p) = -x sin θ + y cos θ`
pub fn project(theta: f64, p: Point) -> f64 {
    let (sin, cos) = theta.sin_cos();
    -p.x * sin + p.y * cos
}
