//! Delaunay triangulation and piecewise-linear scattered-data interpolation.
//!
//! Triangulation is incremental Bowyer-Watson. Circumcircles of the live
//! triangles are kept in an R-tree so each insertion only inspects the
//! triangles whose circumcircle can contain the new point.

use rstar::{PointDistance, RTree, RTreeObject, AABB};
use std::collections::HashMap;

/// Scale factor for the enclosing super-triangle relative to the point extent.
const SUPER_TRIANGLE_SCALE: f64 = 64.0;

/// Relative area below which a candidate triangle is treated as collinear.
const COLLINEAR_TOLERANCE: f64 = 1e-12;

/// Relative distance below which two samples are merged into one vertex.
const MERGE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone)]
struct Circumcircle {
    id: usize,
    center: [f64; 2],
    radius_2: f64,
}

impl PartialEq for Circumcircle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl RTreeObject for Circumcircle {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        let r = self.radius_2.sqrt();
        AABB::from_corners(
            [self.center[0] - r, self.center[1] - r],
            [self.center[0] + r, self.center[1] + r],
        )
    }
}

impl PointDistance for Circumcircle {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = point[0] - self.center[0];
        let dy = point[1] - self.center[1];
        let inside = (dx * dx + dy * dy).sqrt() - self.radius_2.sqrt();
        inside.max(0.0).powi(2)
    }

    fn contains_point(&self, point: &[f64; 2]) -> bool {
        let dx = point[0] - self.center[0];
        let dy = point[1] - self.center[1];
        dx * dx + dy * dy < self.radius_2
    }
}

fn circumcircle(a: [f64; 2], b: [f64; 2], c: [f64; 2], scale_2: f64) -> Option<([f64; 2], f64)> {
    let d = 2.0 * (a[0] * (b[1] - c[1]) + b[0] * (c[1] - a[1]) + c[0] * (a[1] - b[1]));
    if d.abs() <= COLLINEAR_TOLERANCE * scale_2 {
        return None;
    }
    let a2 = a[0] * a[0] + a[1] * a[1];
    let b2 = b[0] * b[0] + b[1] * b[1];
    let c2 = c[0] * c[0] + c[1] * c[1];
    let ux = (a2 * (b[1] - c[1]) + b2 * (c[1] - a[1]) + c2 * (a[1] - b[1])) / d;
    let uy = (a2 * (c[0] - b[0]) + b2 * (a[0] - c[0]) + c2 * (b[0] - a[0])) / d;
    let radius_2 = (a[0] - ux).powi(2) + (a[1] - uy).powi(2);
    Some(([ux, uy], radius_2))
}

/// Delaunay triangulation over a set of distinct points.
#[derive(Debug, Clone)]
pub struct Delaunay {
    points: Vec<[f64; 2]>,
    triangles: Vec<[usize; 3]>,
}

impl Delaunay {
    /// Triangulates the given points. Fewer than three points, or an entirely
    /// collinear set, yield no triangles.
    pub fn triangulate(points: &[[f64; 2]]) -> Self {
        let mut delaunay = Self {
            points: points.to_vec(),
            triangles: Vec::new(),
        };
        if points.len() < 3 {
            return delaunay;
        }

        let (min, max) = bounds(points);
        let span = (max[0] - min[0]).max(max[1] - min[1]).max(1.0);
        let scale_2 = span * span;
        let cx = (min[0] + max[0]) / 2.0;
        let cy = (min[1] + max[1]) / 2.0;
        let reach = SUPER_TRIANGLE_SCALE * span;

        let n = points.len();
        let mut vertices = points.to_vec();
        vertices.push([cx - reach, cy - reach]);
        vertices.push([cx + reach, cy - reach]);
        vertices.push([cx, cy + reach]);

        let mut slots: Vec<Option<[usize; 3]>> = Vec::new();
        let mut circles: RTree<Circumcircle> = RTree::new();

        let add = |tri: [usize; 3],
                   slots: &mut Vec<Option<[usize; 3]>>,
                   circles: &mut RTree<Circumcircle>| {
            let [a, b, c] = tri;
            if let Some((center, radius_2)) =
                circumcircle(vertices[a], vertices[b], vertices[c], scale_2)
            {
                let id = slots.len();
                slots.push(Some(tri));
                circles.insert(Circumcircle {
                    id,
                    center,
                    radius_2,
                });
            }
        };

        add([n, n + 1, n + 2], &mut slots, &mut circles);

        for (index, point) in points.iter().enumerate() {
            let bad: Vec<Circumcircle> = circles.locate_all_at_point(point).cloned().collect();
            if bad.is_empty() {
                continue;
            }

            let mut edges: HashMap<(usize, usize), usize> = HashMap::new();
            for circle in &bad {
                if let Some([a, b, c]) = slots[circle.id].take() {
                    for (p, q) in [(a, b), (b, c), (c, a)] {
                        *edges.entry((p.min(q), p.max(q))).or_insert(0) += 1;
                    }
                }
                circles.remove(circle);
            }

            for ((p, q), count) in edges {
                if count == 1 {
                    add([p, q, index], &mut slots, &mut circles);
                }
            }
        }

        delaunay.triangles = slots
            .into_iter()
            .flatten()
            .filter(|tri| tri.iter().all(|&v| v < n))
            .collect();
        delaunay
    }

    pub fn points(&self) -> &[[f64; 2]] {
        &self.points
    }

    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }
}

fn bounds(points: &[[f64; 2]]) -> ([f64; 2], [f64; 2]) {
    points.iter().fold(
        ([f64::INFINITY; 2], [f64::NEG_INFINITY; 2]),
        |(min, max), p| {
            (
                [min[0].min(p[0]), min[1].min(p[1])],
                [max[0].max(p[0]), max[1].max(p[1])],
            )
        },
    )
}

/// A triangle of the final mesh, indexed by its bounding box.
#[derive(Debug, Clone)]
struct MeshTriangle {
    corners: [[f64; 2]; 3],
    values: [f64; 3],
}

impl MeshTriangle {
    /// Barycentric weights of `point`, `None` if outside (with a small tolerance).
    fn barycentric(&self, point: &[f64; 2]) -> Option<[f64; 3]> {
        let [a, b, c] = self.corners;
        let det = (b[1] - c[1]) * (a[0] - c[0]) + (c[0] - b[0]) * (a[1] - c[1]);
        if det == 0.0 {
            return None;
        }
        let l1 = ((b[1] - c[1]) * (point[0] - c[0]) + (c[0] - b[0]) * (point[1] - c[1])) / det;
        let l2 = ((c[1] - a[1]) * (point[0] - c[0]) + (a[0] - c[0]) * (point[1] - c[1])) / det;
        let l3 = 1.0 - l1 - l2;
        const EPS: f64 = -1e-9;
        (l1 >= EPS && l2 >= EPS && l3 >= EPS).then_some([l1, l2, l3])
    }
}

impl RTreeObject for MeshTriangle {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_points(self.corners.iter())
    }
}

impl PointDistance for MeshTriangle {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        self.envelope().distance_2(point)
    }

    fn contains_point(&self, point: &[f64; 2]) -> bool {
        self.barycentric(point).is_some()
    }
}

/// Piecewise-linear interpolant over the Delaunay triangulation of scattered samples.
///
/// Queries outside the convex hull, or inside a triangle with a missing
/// (`NaN`) vertex value, return `NaN`.
pub struct LinearInterpolator {
    mesh: RTree<MeshTriangle>,
}

impl LinearInterpolator {
    /// Builds the interpolant. Samples closer than a tiny fraction of the
    /// extent (including `-0.0` against `0.0`) are merged, keeping the first.
    pub fn new(points: &[[f64; 2]], values: &[f64]) -> Self {
        let finite: Vec<([f64; 2], f64)> = points
            .iter()
            .zip(values)
            .filter(|(point, _)| point.iter().all(|c| c.is_finite()))
            // adding zero folds -0.0 into 0.0
            .map(|(point, &value)| ([point[0] + 0.0, point[1] + 0.0], value))
            .collect();

        let span = if finite.is_empty() {
            1.0
        } else {
            let (min, max) = bounds(&finite.iter().map(|(p, _)| *p).collect::<Vec<_>>());
            (max[0] - min[0]).max(max[1] - min[1]).max(1.0)
        };
        let merge_2 = (MERGE_TOLERANCE * span).powi(2);

        let mut accepted: RTree<[f64; 2]> = RTree::new();
        let mut unique_points = Vec::with_capacity(finite.len());
        let mut unique_values = Vec::with_capacity(finite.len());
        for (point, value) in finite {
            let duplicate = accepted
                .nearest_neighbor(&point)
                .map_or(false, |near| near.distance_2(&point) <= merge_2);
            if !duplicate {
                accepted.insert(point);
                unique_points.push(point);
                unique_values.push(value);
            }
        }

        let delaunay = Delaunay::triangulate(&unique_points);
        let triangles = delaunay
            .triangles()
            .iter()
            .map(|&[a, b, c]| MeshTriangle {
                corners: [unique_points[a], unique_points[b], unique_points[c]],
                values: [unique_values[a], unique_values[b], unique_values[c]],
            })
            .collect();

        Self {
            mesh: RTree::bulk_load(triangles),
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.mesh.size()
    }

    pub fn interpolate(&self, x: f64, y: f64) -> f64 {
        let point = [x, y];
        self.mesh
            .locate_all_at_point(&point)
            .find_map(|tri| {
                tri.barycentric(&point).map(|w| {
                    w[0] * tri.values[0] + w[1] * tri.values[1] + w[2] * tri.values[2]
                })
            })
            .unwrap_or(f64::NAN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn square_with_center_gives_four_triangles() {
        let points = [[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0], [1.0, 1.0]];
        let delaunay = Delaunay::triangulate(&points);
        assert_eq!(delaunay.triangles().len(), 4);
    }

    #[test]
    fn collinear_points_have_no_triangles() {
        let points = [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [3.0, 3.0]];
        assert!(Delaunay::triangulate(&points).triangles().is_empty());
    }

    #[test]
    fn interpolation_reproduces_plane() {
        let mut points = Vec::new();
        let mut values = Vec::new();
        for (x, y) in [(0.0, 0.0), (4.0, 0.3), (4.2, 3.9), (0.1, 4.0), (2.1, 1.7), (1.3, 3.1)] {
            points.push([x, y]);
            values.push(3.0 * x - 2.0 * y + 1.0);
        }
        let interpolator = LinearInterpolator::new(&points, &values);
        assert_relative_eq!(interpolator.interpolate(2.0, 2.0), 3.0, epsilon = 1e-9);
        assert_relative_eq!(interpolator.interpolate(1.0, 0.5), 3.0, epsilon = 1e-9);
    }

    #[test]
    fn interpolation_is_undefined_outside_hull() {
        let points = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let interpolator = LinearInterpolator::new(&points, &[1.0, 1.0, 1.0]);
        assert!(interpolator.interpolate(5.0, 5.0).is_nan());
        assert_relative_eq!(interpolator.interpolate(0.2, 0.2), 1.0);
    }

    #[test]
    fn duplicate_points_are_merged() {
        let points = [[0.0, 0.0], [0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let interpolator = LinearInterpolator::new(&points, &[2.0, 9.0, 2.0, 2.0]);
        assert_eq!(interpolator.triangle_count(), 1);
        assert_relative_eq!(interpolator.interpolate(0.1, 0.1), 2.0);
    }

    #[test]
    fn signed_zero_copies_do_not_fold_the_mesh() {
        // Port and starboard both emit the v = 0 row, once as -0.0.
        let mut points = Vec::new();
        let mut values = Vec::new();
        for u in 0..12 {
            for v in -4..=4 {
                let (u, v) = (f64::from(u), f64::from(v));
                points.push([u, v]);
                values.push(u + v);
                if v == 0.0 {
                    points.push([u, -0.0]);
                    values.push(u);
                }
            }
        }
        // near-coincident copy from round-off
        points.push([5.0 + 1e-13, 2.0]);
        values.push(7.0);

        let interpolator = LinearInterpolator::new(&points, &values);
        let area: f64 = interpolator
            .mesh
            .iter()
            .map(|tri| {
                let [a, b, c] = tri.corners;
                ((b[0] - a[0]) * (c[1] - a[1]) - (c[0] - a[0]) * (b[1] - a[1])).abs() / 2.0
            })
            .sum();
        assert_relative_eq!(area, 11.0 * 8.0, epsilon = 1e-9);
        assert_eq!(interpolator.triangle_count(), 2 * 11 * 8);

        for u in 0..12 {
            for v in -4..=4 {
                let (u, v) = (f64::from(u), f64::from(v));
                assert_relative_eq!(interpolator.interpolate(u, v), u + v, epsilon = 1e-9);
                assert_relative_eq!(
                    interpolator.interpolate(u * 0.97 + 0.1, v * 0.9),
                    u * 0.97 + 0.1 + v * 0.9,
                    epsilon = 1e-9
                );
            }
        }
    }
}
