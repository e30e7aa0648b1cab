use std::collections::{HashMap, HashSet};

use lascat_core::nalgebra::{Point2, Vector3};

use super::{GroundModel, GroundModelError, IdwGroundModel};

const NO_NEIGHBOUR: usize = usize::MAX;
/// Barycentric tolerance for point-in-triangle tests, so that positions on shared edges are always found
const BARYCENTRIC_EPSILON: f64 = 1e-9;

/// A triangle with counter-clockwise vertices. `neighbours[i]` is the triangle across the edge opposite of
/// `vertices[i]`
#[derive(Clone, Copy, Debug)]
struct Triangle {
    vertices: [usize; 3],
    neighbours: [usize; 3],
    alive: bool,
}

/// Orientation of c relative to the directed line a->b: positive if c lies to the left
fn orient(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Positive if d lies strictly inside the circumcircle of the counter-clockwise triangle (a, b, c)
fn in_circle(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>, d: &Point2<f64>) -> f64 {
    let (adx, ady) = (a.x - d.x, a.y - d.y);
    let (bdx, bdy) = (b.x - d.x, b.y - d.y);
    let (cdx, cdy) = (c.x - d.x, c.y - d.y);
    (adx * adx + ady * ady) * (bdx * cdy - cdx * bdy)
        + (bdx * bdx + bdy * bdy) * (cdx * ady - adx * cdy)
        + (cdx * cdx + cdy * cdy) * (adx * bdy - bdx * ady)
}

/// Barycentric weights of p in the triangle (a, b, c), or `None` for a degenerate triangle
fn barycentric(
    a: &Point2<f64>,
    b: &Point2<f64>,
    c: &Point2<f64>,
    p: &Point2<f64>,
) -> Option<[f64; 3]> {
    let det = (b.y - c.y) * (a.x - c.x) + (c.x - b.x) * (a.y - c.y);
    if det == 0.0 {
        return None;
    }
    let w0 = ((b.y - c.y) * (p.x - c.x) + (c.x - b.x) * (p.y - c.y)) / det;
    let w1 = ((c.y - a.y) * (p.x - c.x) + (a.x - c.x) * (p.y - c.y)) / det;
    Some([w0, w1, 1.0 - w0 - w1])
}

/// Incremental Bowyer-Watson Delaunay triangulation with triangle adjacency, so that both point location and
/// cavity search stay local. Every hull edge is closed off by a ghost triangle that connects it to a vertex at
/// infinity, so the triangulated area always is the convex hull of the inserted vertices
struct Triangulation {
    vertices: Vec<Point2<f64>>,
    triangles: Vec<Triangle>,
    /// Index of the vertex at infinity
    ghost: usize,
    last_created: usize,
}

impl Triangulation {
    /// Creates a triangulation of the non-collinear vertices `a`, `b` and `c`: one real triangle and the three ghost
    /// triangles around it. The other vertices are added with [insert](Triangulation::insert)
    fn new(points: Vec<Point2<f64>>, a: usize, b: usize, c: usize) -> Self {
        let (b, c) = if orient(&points[a], &points[b], &points[c]) > 0.0 {
            (b, c)
        } else {
            (c, b)
        };
        let mut vertices = points;
        let ghost = vertices.len();
        vertices.push(Point2::new(f64::NAN, f64::NAN));
        let triangle = |vertices: [usize; 3], neighbours: [usize; 3]| Triangle {
            vertices,
            neighbours,
            alive: true,
        };
        Self {
            vertices,
            triangles: vec![
                triangle([a, b, c], [1, 2, 3]),
                triangle([c, b, ghost], [3, 2, 0]),
                triangle([a, c, ghost], [1, 3, 0]),
                triangle([b, a, ghost], [2, 1, 0]),
            ],
            ghost,
            last_created: 0,
        }
    }

    fn point(&self, index: usize) -> &Point2<f64> {
        &self.vertices[index]
    }

    /// For a ghost triangle, the hull edge (a, b) it is attached to. The outside of the hull lies to the left of a->b
    fn ghost_edge(&self, triangle: usize) -> Option<(usize, usize)> {
        let vertices = self.triangles[triangle].vertices;
        vertices
            .iter()
            .position(|vertex| *vertex == self.ghost)
            .map(|i| (vertices[(i + 1) % 3], vertices[(i + 2) % 3]))
    }

    fn is_ghost(&self, triangle: usize) -> bool {
        self.triangles[triangle].vertices.contains(&self.ghost)
    }

    fn contains(&self, triangle: usize, p: &Point2<f64>) -> bool {
        let vertices = self.triangles[triangle].vertices;
        (0..3).all(|i| {
            orient(
                self.point(vertices[(i + 1) % 3]),
                self.point(vertices[(i + 2) % 3]),
                p,
            ) >= 0.0
        })
    }

    /// Finds the triangle to start the cavity of p from: a real triangle containing p, or the ghost triangle of a
    /// hull edge that p lies beyond. Walks from the most recently created triangle and falls back to a linear scan
    /// if the walk does not terminate
    fn locate(&self, p: &Point2<f64>) -> Option<usize> {
        let mut current = self.last_created;
        if let Some(i) = self.triangles[current]
            .vertices
            .iter()
            .position(|vertex| *vertex == self.ghost)
        {
            current = self.triangles[current].neighbours[i];
        }
        'walk: for _ in 0..self.triangles.len() {
            let triangle = &self.triangles[current];
            for i in 0..3 {
                let a = self.point(triangle.vertices[(i + 1) % 3]);
                let b = self.point(triangle.vertices[(i + 2) % 3]);
                if orient(a, b, p) < 0.0 {
                    let next = triangle.neighbours[i];
                    if next == NO_NEIGHBOUR {
                        break 'walk;
                    }
                    if self.is_ghost(next) {
                        return Some(next);
                    }
                    current = next;
                    continue 'walk;
                }
            }
            return Some(current);
        }

        (0..self.triangles.len()).find(|triangle| {
            self.triangles[*triangle].alive
                && if self.is_ghost(*triangle) {
                    self.conflicts(*triangle, p)
                } else {
                    self.contains(*triangle, p)
                }
        })
    }

    /// Returns true if inserting p destroys the given triangle. For real triangles this is the circumcircle test,
    /// ghost triangles conflict with all points beyond their hull edge and with points inside of the edge itself
    fn conflicts(&self, triangle: usize, p: &Point2<f64>) -> bool {
        match self.ghost_edge(triangle) {
            Some((a, b)) => {
                let (a, b) = (self.point(a), self.point(b));
                let side = orient(a, b, p);
                side > 0.0
                    || (side == 0.0 && (p.x - a.x) * (p.x - b.x) + (p.y - a.y) * (p.y - b.y) < 0.0)
            }
            None => {
                let [a, b, c] = self.triangles[triangle].vertices;
                in_circle(self.point(a), self.point(b), self.point(c), p) > 0.0
            }
        }
    }

    /// Inserts the vertex with the given index into the triangulation
    fn insert(&mut self, vertex: usize) {
        let p = *self.point(vertex);
        let start = match self.locate(&p) {
            Some(start) => start,
            None => return,
        };

        // Collect the cavity of triangles that conflict with p, and the edges on its boundary
        let mut cavity = HashSet::new();
        cavity.insert(start);
        let mut stack = vec![start];
        // (edge start, edge end, triangle outside of the edge, cavity triangle inside of the edge)
        let mut boundary = vec![];
        while let Some(current) = stack.pop() {
            let triangle = self.triangles[current];
            for i in 0..3 {
                let neighbour = triangle.neighbours[i];
                if neighbour != NO_NEIGHBOUR && cavity.contains(&neighbour) {
                    continue;
                }
                if neighbour != NO_NEIGHBOUR && self.conflicts(neighbour, &p) {
                    cavity.insert(neighbour);
                    stack.push(neighbour);
                    continue;
                }
                boundary.push((
                    triangle.vertices[(i + 1) % 3],
                    triangle.vertices[(i + 2) % 3],
                    neighbour,
                    current,
                ));
            }
        }
        // A neighbour that was first recorded as boundary might have joined the cavity later
        boundary.retain(|(_, _, outside, _)| *outside == NO_NEIGHBOUR || !cavity.contains(outside));

        for triangle in &cavity {
            self.triangles[*triangle].alive = false;
        }

        // Fan the cavity boundary around p
        let first_new = self.triangles.len();
        let mut starting_at = HashMap::with_capacity(boundary.len());
        let mut ending_at = HashMap::with_capacity(boundary.len());
        for (offset, (a, b, outside, inside)) in boundary.iter().enumerate() {
            let index = first_new + offset;
            self.triangles.push(Triangle {
                vertices: [*a, *b, vertex],
                neighbours: [NO_NEIGHBOUR, NO_NEIGHBOUR, *outside],
                alive: true,
            });
            starting_at.insert(*a, index);
            ending_at.insert(*b, index);
            if *outside != NO_NEIGHBOUR {
                for neighbour in self.triangles[*outside].neighbours.iter_mut() {
                    if *neighbour == *inside {
                        *neighbour = index;
                    }
                }
            }
        }
        for index in first_new..self.triangles.len() {
            let [a, b, _] = self.triangles[index].vertices;
            // across the edge (b, p) lies the fan triangle starting at b, across (p, a) the one ending at a
            self.triangles[index].neighbours[0] =
                starting_at.get(&b).copied().unwrap_or(NO_NEIGHBOUR);
            self.triangles[index].neighbours[1] =
                ending_at.get(&a).copied().unwrap_or(NO_NEIGHBOUR);
        }
        if self.triangles.len() > first_new {
            self.last_created = first_new;
        }
    }

    /// Returns the vertices and all real triangles
    fn finish(self) -> (Vec<Point2<f64>>, Vec<[usize; 3]>) {
        let ghost = self.ghost;
        let triangles = self
            .triangles
            .iter()
            .filter(|triangle| triangle.alive && !triangle.vertices.contains(&ghost))
            .map(|triangle| triangle.vertices)
            .collect();
        let mut vertices = self.vertices;
        vertices.truncate(ghost);
        (vertices, triangles)
    }
}

/// Uniform bucket grid over the triangles of a triangulation for fast point location
struct TriangleBuckets {
    cell_size: f64,
    cols: usize,
    rows: usize,
    buckets: Vec<Vec<usize>>,
}

impl TriangleBuckets {
    fn build(
        vertices: &[Point2<f64>],
        triangles: &[[usize; 3]],
        width: f64,
        height: f64,
    ) -> Self {
        let cell_size = ((width * height / triangles.len().max(1) as f64).sqrt() * 2.0)
            .max(width.max(height) / 1024.0)
            .max(f64::MIN_POSITIVE);
        let cols = ((width / cell_size).floor() as usize + 1).max(1);
        let rows = ((height / cell_size).floor() as usize + 1).max(1);
        let mut buckets = vec![Vec::new(); cols * rows];
        let mut grid = Self {
            cell_size,
            cols,
            rows,
            buckets: vec![],
        };
        for (index, triangle) in triangles.iter().enumerate() {
            let corners = triangle.iter().map(|vertex| vertices[*vertex]);
            let (mut min_x, mut min_y) = (f64::MAX, f64::MAX);
            let (mut max_x, mut max_y) = (f64::MIN, f64::MIN);
            for corner in corners {
                min_x = min_x.min(corner.x);
                min_y = min_y.min(corner.y);
                max_x = max_x.max(corner.x);
                max_y = max_y.max(corner.y);
            }
            let (row_start, col_start) = grid.cell_of(min_x, min_y);
            let (row_end, col_end) = grid.cell_of(max_x, max_y);
            for row in row_start..=row_end {
                for col in col_start..=col_end {
                    buckets[row * cols + col].push(index);
                }
            }
        }
        grid.buckets = buckets;
        grid
    }

    fn cell_of(&self, x: f64, y: f64) -> (usize, usize) {
        let clamp = |value: f64, count: usize| -> usize {
            if value <= 0.0 {
                0
            } else {
                (value as usize).min(count - 1)
            }
        };
        (
            clamp((y / self.cell_size).floor(), self.rows),
            clamp((x / self.cell_size).floor(), self.cols),
        )
    }

    fn candidates(&self, x: f64, y: f64) -> &[usize] {
        let (row, col) = self.cell_of(x, y);
        &self.buckets[row * self.cols + col]
    }
}

/// Ground surface from linear interpolation on the Delaunay triangulation of the ground points
pub struct TinGroundModel {
    origin: Point2<f64>,
    width: f64,
    height: f64,
    vertices: Vec<Point2<f64>>,
    elevations: Vec<f64>,
    triangles: Vec<[usize; 3]>,
    buckets: TriangleBuckets,
    extrapolation: Option<IdwGroundModel>,
}

impl TinGroundModel {
    /// Triangulates the given ground points. Points sharing the same horizontal position are reduced to the first
    /// of them. Fails if fewer than three distinct positions remain or all of them are collinear
    pub fn build(ground: &[Vector3<f64>]) -> Result<Self, GroundModelError> {
        let mut seen = HashSet::with_capacity(ground.len());
        let distinct = ground
            .iter()
            .filter(|position| {
                seen.insert(((position.x + 0.0).to_bits(), (position.y + 0.0).to_bits()))
            })
            .copied()
            .collect::<Vec<_>>();
        if distinct.len() < 3 {
            return Err(GroundModelError::InsufficientPoints {
                found: distinct.len(),
                required: 3,
            });
        }

        // Triangulate in local coordinates to keep precision with large projected coordinates
        let (mut min_x, mut min_y) = (f64::MAX, f64::MAX);
        let (mut max_x, mut max_y) = (f64::MIN, f64::MIN);
        for position in &distinct {
            min_x = min_x.min(position.x);
            min_y = min_y.min(position.y);
            max_x = max_x.max(position.x);
            max_y = max_y.max(position.y);
        }
        let origin = Point2::new(min_x, min_y);
        let (width, height) = (max_x - min_x, max_y - min_y);
        let local = distinct
            .iter()
            .map(|position| Point2::new(position.x - origin.x, position.y - origin.y))
            .collect::<Vec<_>>();
        let elevations = distinct.iter().map(|position| position.z).collect::<Vec<_>>();

        let num_points = local.len();
        let order = insertion_order(&local, width, height);
        let (a, b) = (order[0], order[1]);
        let c = order[2..]
            .iter()
            .copied()
            .find(|c| orient(&local[a], &local[b], &local[*c]) != 0.0)
            .ok_or(GroundModelError::Degenerate(num_points))?;
        let mut triangulation = Triangulation::new(local, a, b, c);
        for vertex in order {
            if vertex != a && vertex != b && vertex != c {
                triangulation.insert(vertex);
            }
        }
        let (vertices, triangles) = triangulation.finish();

        let buckets = TriangleBuckets::build(&vertices, &triangles, width, height);
        Ok(Self {
            origin,
            width,
            height,
            vertices,
            elevations,
            triangles,
            buckets,
            extrapolation: None,
        })
    }

    /// Use `fallback` for all positions outside of the triangulated area
    pub fn with_extrapolation(self, fallback: IdwGroundModel) -> Self {
        Self {
            extrapolation: Some(fallback),
            ..self
        }
    }

    /// Number of triangles in the triangulation
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    fn interpolate(&self, x: f64, y: f64) -> Option<f64> {
        let p = Point2::new(x - self.origin.x, y - self.origin.y);
        let tolerance = BARYCENTRIC_EPSILON * self.width.max(self.height).max(1.0);
        if p.x < -tolerance
            || p.y < -tolerance
            || p.x > self.width + tolerance
            || p.y > self.height + tolerance
        {
            return None;
        }
        for triangle in self.buckets.candidates(p.x, p.y) {
            let [a, b, c] = self.triangles[*triangle];
            let weights = match barycentric(
                &self.vertices[a],
                &self.vertices[b],
                &self.vertices[c],
                &p,
            ) {
                Some(weights) => weights,
                None => continue,
            };
            if weights.iter().all(|w| *w >= -BARYCENTRIC_EPSILON) {
                return Some(
                    weights[0] * self.elevations[a]
                        + weights[1] * self.elevations[b]
                        + weights[2] * self.elevations[c],
                );
            }
        }
        None
    }
}

impl GroundModel for TinGroundModel {
    fn ground_z(&self, x: f64, y: f64) -> Option<f64> {
        self.interpolate(x, y).or_else(|| {
            self.extrapolation
                .as_ref()
                .and_then(|fallback| fallback.ground_z(x, y))
        })
    }
}

/// Orders the vertices row by row over a coarse grid, alternating the direction of each row, so that consecutive
/// insertions are spatially close
fn insertion_order(vertices: &[Point2<f64>], width: f64, height: f64) -> Vec<usize> {
    let cell_size = ((width * height / vertices.len() as f64).sqrt() * 4.0)
        .max(width.max(height) / 4096.0)
        .max(f64::MIN_POSITIVE);
    let mut order = (0..vertices.len()).collect::<Vec<_>>();
    order.sort_by_key(|index| {
        let vertex = &vertices[*index];
        let row = (vertex.y / cell_size).floor() as i64;
        let col = (vertex.x / cell_size).floor() as i64;
        let col = if row % 2 == 0 { col } else { -col };
        (row, col)
    });
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn test_single_triangle() {
        let ground = vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(10.0, 0.0, 10.0),
            Vector3::new(0.0, 10.0, 20.0),
        ];
        let model = TinGroundModel::build(&ground).unwrap();
        assert_eq!(model.num_triangles(), 1);
        assert_approx_eq!(model.ground_z(0.0, 0.0).unwrap(), 0.0, 1e-9);
        assert_approx_eq!(model.ground_z(5.0, 0.0).unwrap(), 5.0, 1e-9);
        assert_approx_eq!(model.ground_z(2.0, 3.0).unwrap(), 2.0 + 6.0, 1e-9);
        assert_eq!(model.ground_z(9.0, 9.0), None);
    }

    #[test]
    fn test_collinear_points_are_degenerate() {
        let ground = (0..5)
            .map(|i| Vector3::new(i as f64, i as f64, 1.0))
            .collect::<Vec<_>>();
        assert_eq!(
            TinGroundModel::build(&ground).err(),
            Some(GroundModelError::Degenerate(5))
        );
    }

    #[test]
    fn test_duplicate_positions_count_once() {
        let ground = vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 5.0),
            Vector3::new(1.0, 0.0, 0.0),
        ];
        assert_eq!(
            TinGroundModel::build(&ground).err(),
            Some(GroundModelError::InsufficientPoints {
                found: 2,
                required: 3
            })
        );
    }

    #[test]
    fn test_random_points_form_valid_delaunay_triangulation() {
        let mut rng = StdRng::seed_from_u64(42);
        let ground = (0..500)
            .map(|_| {
                Vector3::new(
                    600_000.0 + rng.gen_range(0.0..250.0),
                    5_200_000.0 + rng.gen_range(0.0..250.0),
                    rng.gen_range(300.0..320.0),
                )
            })
            .collect::<Vec<_>>();
        let model = TinGroundModel::build(&ground).unwrap();

        // Euler: a triangulation of n points with h hull vertices has 2n - 2 - h triangles
        assert!(model.num_triangles() > 2 * 500 - 2 - 100);
        assert!(model.num_triangles() <= 2 * 500 - 5);

        // empty circumcircle property
        for triangle in &model.triangles {
            let [a, b, c] = *triangle;
            assert!(orient(&model.vertices[a], &model.vertices[b], &model.vertices[c]) > 0.0);
            for (index, vertex) in model.vertices.iter().enumerate().step_by(7) {
                if index == a || index == b || index == c {
                    continue;
                }
                let inside = in_circle(
                    &model.vertices[a],
                    &model.vertices[b],
                    &model.vertices[c],
                    vertex,
                );
                assert!(inside <= 1e-3, "vertex {} inside circumcircle", index);
            }
        }

        // every input point is reproduced exactly
        for position in ground.iter().step_by(13) {
            assert_approx_eq!(
                model.ground_z(position.x, position.y).unwrap(),
                position.z,
                1e-6
            );
        }
    }

    #[test]
    fn test_whole_convex_hull_is_triangulated() {
        for seed in 100..110 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut ground = vec![
                Vector3::new(0.0, 0.0, 10.0),
                Vector3::new(500.0, 0.0, 10.0),
                Vector3::new(0.0, 500.0, 10.0),
                Vector3::new(500.0, 500.0, 10.0),
            ];
            ground.extend((0..3000).map(|_| {
                Vector3::new(
                    rng.gen_range(0.0..=500.0),
                    rng.gen_range(0.0..=500.0),
                    10.0,
                )
            }));
            let model = TinGroundModel::build(&ground).unwrap();
            // the hull is the square, so it has at least the 4 corners and at most all points on it
            assert!(model.num_triangles() <= 2 * ground.len() - 2 - 4);

            for _ in 0..20_000 {
                let (x, y) = (rng.gen_range(0.0..500.0), rng.gen_range(0.0..500.0));
                let z = model.ground_z(x, y);
                assert!(z.is_some(), "no ground at ({}, {}) with seed {}", x, y, seed);
                assert_approx_eq!(z.unwrap(), 10.0, 1e-6);
            }
            for (x, y) in &[(0.0, 250.0), (500.0, 0.0), (250.0, 500.0), (499.999, 0.001)] {
                assert!(model.ground_z(*x, *y).is_some());
            }
        }
    }

    #[test]
    fn test_hull_edges_with_collinear_points() {
        // a regular grid puts many points onto every hull edge
        let ground = (0..=10)
            .flat_map(|row| (0..=10).map(move |col| Vector3::new(col as f64, row as f64, 1.0)))
            .collect::<Vec<_>>();
        let model = TinGroundModel::build(&ground).unwrap();
        assert_eq!(model.num_triangles(), 2 * 121 - 2 - 40);
        for i in 0..=100 {
            let t = i as f64 / 10.0;
            assert!(model.ground_z(t, 0.0).is_some());
            assert!(model.ground_z(10.0, t).is_some());
            assert!(model.ground_z(t, 10.0).is_some());
            assert!(model.ground_z(0.0, t).is_some());
        }
    }
}
