use nalgebra::Vector2;

/// An axis-aligned rectangle in normalized viewport space, `[0,1]` by
/// default for the full screen.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    #[inline]
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// The default clip rectangle: the full `[0,1]x[0,1]` viewport.
    #[inline]
    pub fn full_viewport() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }

    #[inline]
    pub fn left(&self) -> f32 {
        self.x
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.y + self.h
    }
}

/// Shoelace formula for the (unsigned) area of a simple polygon given in
/// either winding order.
pub fn polygon_area(points: &[Vector2<f32>]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        sum += a.x * b.y - b.x * a.y;
    }
    (sum * 0.5).abs()
}

/// Axis-aligned bounds of a 2D point set.
pub fn bounds_of(points: &[Vector2<f32>]) -> Option<(Vector2<f32>, Vector2<f32>)> {
    let mut it = points.iter();
    let first = *it.next()?;
    let mut min = first;
    let mut max = first;
    for &p in it {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    Some((min, max))
}

/// Sorts points by angle around their centroid, producing a valid winding
/// order for a convex point set. Used to turn an unordered set of visible
/// box vertices (projected to screen space) into a polygon suitable for
/// clipping and area computation.
pub fn order_convex_points(points: &mut [Vector2<f32>]) {
    if points.len() < 3 {
        return;
    }
    let centroid = points.iter().fold(Vector2::new(0.0, 0.0), |acc, p| acc + p)
        / points.len() as f32;
    points.sort_by(|a, b| {
        let angle_a = (a.y - centroid.y).atan2(a.x - centroid.x);
        let angle_b = (b.y - centroid.y).atan2(b.x - centroid.x);
        angle_a.partial_cmp(&angle_b).unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Clips a (convex or simple) polygon against an axis-aligned rectangle
/// using the Sutherland-Hodgman algorithm. Returns the clipped polygon,
/// empty if nothing survives.
pub fn sutherland_hodgman_clip(polygon: &[Vector2<f32>], clip: Rect) -> Vec<Vector2<f32>> {
    if polygon.is_empty() {
        return Vec::new();
    }

    let edges: [(fn(Vector2<f32>, Rect) -> bool, fn(Vector2<f32>, Vector2<f32>, Rect) -> Vector2<f32>); 4] = [
        (|p, r| p.x >= r.left(), |a, b, r| intersect_vertical(a, b, r.left())),
        (|p, r| p.x <= r.right(), |a, b, r| intersect_vertical(a, b, r.right())),
        (|p, r| p.y >= r.bottom(), |a, b, r| intersect_horizontal(a, b, r.bottom())),
        (|p, r| p.y <= r.top(), |a, b, r| intersect_horizontal(a, b, r.top())),
    ];

    let mut output = polygon.to_vec();
    for (inside, intersect) in edges {
        if output.is_empty() {
            break;
        }
        let input = output;
        output = Vec::with_capacity(input.len() + 1);
        for i in 0..input.len() {
            let current = input[i];
            let previous = input[(i + input.len() - 1) % input.len()];
            let current_in = inside(current, clip);
            let previous_in = inside(previous, clip);
            if current_in {
                if !previous_in {
                    output.push(intersect(previous, current, clip));
                }
                output.push(current);
            } else if previous_in {
                output.push(intersect(previous, current, clip));
            }
        }
    }
    output
}

fn intersect_vertical(a: Vector2<f32>, b: Vector2<f32>, x: f32) -> Vector2<f32> {
    let t = if (b.x - a.x).abs() > f32::EPSILON {
        (x - a.x) / (b.x - a.x)
    } else {
        0.0
    };
    Vector2::new(x, a.y + t * (b.y - a.y))
}

fn intersect_horizontal(a: Vector2<f32>, b: Vector2<f32>, y: f32) -> Vector2<f32> {
    let t = if (b.y - a.y).abs() > f32::EPSILON {
        (y - a.y) / (b.y - a.y)
    } else {
        0.0
    };
    Vector2::new(a.x + t * (b.x - a.x), y)
}
