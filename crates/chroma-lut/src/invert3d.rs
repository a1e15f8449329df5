//! Exact inverse evaluation of a 3D LUT.
//!
//! Inverting a cube means answering: which input produced this output?
//! The approach here, after Gill, Murray and Wright's factorization
//! updating scheme:
//!
//! 1. **Extrapolate** the forward grid by one layer per side (values pushed
//!    away from center 0.5 with scale 4) so out-of-gamut requests still
//!    land inside some cell.
//! 2. Build a **range tree** over the grid's cells. Each node stores the
//!    RGB min/max of the values beneath it, expanded by a small tolerance.
//! 3. A query walks the tree, pruning nodes whose bounding box does not
//!    contain the target, and at each surviving cell solves the
//!    tetrahedral barycentric system with a rank-revealing LU
//!    factorization (row and column pivoting). The first feasible
//!    solution wins.
//!
//! If no cell yields a feasible solution the documented fallback output is
//! (0, 0, 0).

use crate::Lut3D;

/// Tolerance by which node ranges are expanded, absorbing forward
/// evaluation error.
const TOL: f32 = 1e-6;

/// Singularity tolerance for the factorization.
const ZERO_TOL: f64 = 1.0e-9;
/// Barycentric coordinates may undershoot zero by this much.
const NEGZERO_TOL: f64 = -1.0e-9;
/// Barycentric coordinate sums may overshoot one by this much.
const ONE_TOL: f64 = 1.0 + 1.0e-9;

/// The six tetrahedra of a grid cell, as axis permutations.
///
/// For a permutation (a, b, c) the tet vertices are the cell base,
/// base+e_a, base+e_a+e_b and the far corner. Listed in the documented
/// tie-break order: R>G>B first.
const TET_PERMS: [[usize; 3]; 6] = [
    [0, 1, 2],
    [0, 2, 1],
    [2, 0, 1],
    [1, 0, 2],
    [1, 2, 0],
    [2, 1, 0],
];

/// Exact inverse of a [`Lut3D`].
///
/// Construction extrapolates the grid and builds the search tree; queries
/// are pure and thread-safe.
///
/// # Example
///
/// ```rust
/// use chroma_lut::{Interpolation, InvLut3D, Lut3D};
///
/// let lut = Lut3D::identity(17);
/// let inv = InvLut3D::new(&lut);
/// let back = inv.apply([0.25, 0.5, 0.75]);
/// assert!((back[0] - 0.25).abs() < 1e-3);
/// ```
#[derive(Debug, Clone)]
pub struct InvLut3D {
    /// Extrapolated grid, side `gsz`, blue index fastest.
    grid: Vec<[f32; 3]>,
    gsz: usize,
    /// Converts extrapolated index units back to the original domain.
    scale: f32,
    root: Node,
}

#[derive(Debug, Clone)]
struct Node {
    min: [f32; 3],
    max: [f32; 3],
    kind: NodeKind,
}

#[derive(Debug, Clone)]
enum NodeKind {
    Branch(Vec<Node>),
    /// Base indices of grid cells, at most 8 per leaf.
    Leaf(Vec<[u16; 3]>),
}

impl InvLut3D {
    /// Builds the inverse evaluator for a forward cube.
    pub fn new(lut: &Lut3D) -> Self {
        let dim = lut.size;
        let gsz = dim + 2;
        let last = dim - 1;

        let mut grid = vec![[0.0f32; 3]; gsz * gsz * gsz];
        for i in 0..gsz {
            for j in 0..gsz {
                for k in 0..gsz {
                    let si = (i as isize - 1).clamp(0, last as isize) as usize;
                    let sj = (j as isize - 1).clamp(0, last as isize) as usize;
                    let sk = (k as isize - 1).clamp(0, last as isize) as usize;
                    let mut rgb = lut.get(si, sj, sk);
                    let inside = (1..=dim).contains(&i)
                        && (1..=dim).contains(&j)
                        && (1..=dim).contains(&k);
                    if !inside {
                        for c in rgb.iter_mut() {
                            *c = (*c - 0.5) * 4.0 + 0.5;
                        }
                    }
                    grid[(i * gsz + j) * gsz + k] = rgb;
                }
            }
        }

        let cells = gsz - 1;
        let root = build_node(&grid, gsz, [0, 0, 0], [cells, cells, cells]);

        Self {
            grid,
            gsz,
            scale: 1.0 / (gsz - 3) as f32,
            root,
        }
    }

    /// Looks up the input that the forward cube maps to `rgb`.
    ///
    /// The query is clamped to the value range the extrapolated grid
    /// actually covers; the output lies in the original (not extrapolated)
    /// domain. Returns (0, 0, 0) when no cell contains the target.
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let mut target = [0.0f32; 3];
        for c in 0..3 {
            let v = if rgb[c].is_nan() { 0.0 } else { rgb[c] };
            target[c] = v.clamp(self.root.min[c], self.root.max[c]);
        }

        let mut result = [0.0f32; 3];
        self.search(&self.root, target, &mut result);

        let max_dim = (self.gsz - 3) as f32;
        // Subtract 1 to drop the extrapolation layer from the index units.
        [
            (result[0] - 1.0).clamp(0.0, max_dim) * self.scale,
            (result[1] - 1.0).clamp(0.0, max_dim) * self.scale,
            (result[2] - 1.0).clamp(0.0, max_dim) * self.scale,
        ]
    }

    fn search(&self, node: &Node, target: [f32; 3], result: &mut [f32; 3]) -> bool {
        for c in 0..3 {
            if target[c] < node.min[c] || target[c] > node.max[c] {
                return false;
            }
        }
        match &node.kind {
            NodeKind::Branch(children) => {
                children.iter().any(|ch| self.search(ch, target, result))
            }
            NodeKind::Leaf(cells) => cells
                .iter()
                .any(|cell| self.solve_cell(*cell, target, result)),
        }
    }

    /// Tries the six tetrahedra of one cell; writes the solution in
    /// extrapolated index units on success.
    fn solve_cell(&self, cell: [u16; 3], target: [f32; 3], result: &mut [f32; 3]) -> bool {
        let (ci, cj, ck) = (cell[0] as usize, cell[1] as usize, cell[2] as usize);
        let base = self.grid_at(ci, cj, ck);

        let b = [
            target[0] as f64 - base[0] as f64,
            target[1] as f64 - base[1] as f64,
            target[2] as f64 - base[2] as f64,
        ];

        for perm in TET_PERMS {
            // Unit-cube offsets of the tet's three non-base vertices.
            let mut verts = [[0usize; 3]; 3];
            verts[0][perm[0]] = 1;
            verts[1][perm[0]] = 1;
            verts[1][perm[1]] = 1;
            verts[2] = [1, 1, 1];

            let mut a = [[0.0f64; 3]; 3];
            for (m, v) in verts.iter().enumerate() {
                let val = self.grid_at(ci + v[0], cj + v[1], ck + v[2]);
                for c in 0..3 {
                    a[c][m] = val[c] as f64 - base[c] as f64;
                }
            }

            if let Some(w) = solve_feasible(a, b) {
                for c in 0..3 {
                    let mut pos = cell[c] as f64;
                    for (m, v) in verts.iter().enumerate() {
                        pos += w[m] * v[c] as f64;
                    }
                    result[c] = pos as f32;
                }
                return true;
            }
        }
        false
    }

    #[inline]
    fn grid_at(&self, i: usize, j: usize, k: usize) -> [f32; 3] {
        self.grid[(i * self.gsz + j) * self.gsz + k]
    }
}

/// Builds a tree node over the half-open cell index range `[lo, hi)`.
fn build_node(grid: &[[f32; 3]], gsz: usize, lo: [usize; 3], hi: [usize; 3]) -> Node {
    let extent = [hi[0] - lo[0], hi[1] - lo[1], hi[2] - lo[2]];

    if extent.iter().all(|&e| e <= 2) {
        let mut cells = Vec::with_capacity(extent.iter().product());
        let mut min = [f32::INFINITY; 3];
        let mut max = [f32::NEG_INFINITY; 3];
        for i in lo[0]..hi[0] {
            for j in lo[1]..hi[1] {
                for k in lo[2]..hi[2] {
                    cells.push([i as u16, j as u16, k as u16]);
                    for (di, dj, dk) in CORNERS {
                        let v = grid[((i + di) * gsz + j + dj) * gsz + k + dk];
                        for c in 0..3 {
                            min[c] = min[c].min(v[c]);
                            max[c] = max[c].max(v[c]);
                        }
                    }
                }
            }
        }
        for c in 0..3 {
            min[c] -= TOL;
            max[c] += TOL;
        }
        return Node {
            min,
            max,
            kind: NodeKind::Leaf(cells),
        };
    }

    // Split every axis with more than one cell at its midpoint.
    let mut splits = [[0usize; 3]; 3]; // per axis: lo, mid, hi
    for c in 0..3 {
        let mid = if extent[c] > 1 { lo[c] + extent[c] / 2 } else { hi[c] };
        splits[c] = [lo[c], mid, hi[c]];
    }

    let mut children = Vec::new();
    for i in 0..2 {
        for j in 0..2 {
            for k in 0..2 {
                let clo = [splits[0][i], splits[1][j], splits[2][k]];
                let chi = [splits[0][i + 1], splits[1][j + 1], splits[2][k + 1]];
                if clo[0] < chi[0] && clo[1] < chi[1] && clo[2] < chi[2] {
                    children.push(build_node(grid, gsz, clo, chi));
                }
            }
        }
    }

    let mut min = [f32::INFINITY; 3];
    let mut max = [f32::NEG_INFINITY; 3];
    for ch in &children {
        for c in 0..3 {
            min[c] = min[c].min(ch.min[c]);
            max[c] = max[c].max(ch.max[c]);
        }
    }

    Node {
        min,
        max,
        kind: NodeKind::Branch(children),
    }
}

const CORNERS: [(usize, usize, usize); 8] = [
    (0, 0, 0),
    (0, 0, 1),
    (0, 1, 0),
    (0, 1, 1),
    (1, 0, 0),
    (1, 0, 1),
    (1, 1, 0),
    (1, 1, 1),
];

/// Solves `A w = b` with a rank-revealing LU (row and column pivoting) and
/// checks barycentric feasibility during back-substitution.
///
/// Returns `None` when the system is inconsistent or the solution leaves
/// the tetrahedron (a coordinate below zero or the running sum above one,
/// within tolerance). Rank-deficient but consistent directions get a zero
/// coordinate, which handles the flat cells the extrapolation produces.
fn solve_feasible(a: [[f64; 3]; 3], b: [f64; 3]) -> Option<[f64; 3]> {
    let mut u = a;
    let mut y = b;
    let mut rp = [0usize, 1, 2];
    let mut cp = [0usize, 1, 2];

    for j in 0..2 {
        // Partial row pivoting on the current column.
        let mut piv = j;
        let mut abs_d = u[rp[j]][cp[j]].abs();
        for k in (j + 1)..3 {
            let abs_n = u[rp[k]][cp[j]].abs();
            if abs_n > abs_d {
                abs_d = abs_n;
                piv = k;
            }
        }

        // Column pivot when the whole column is negligible.
        if abs_d < ZERO_TOL {
            let mut col_piv = j;
            for h in (j + 1)..3 {
                for k in j..3 {
                    let abs_n = u[rp[k]][cp[h]].abs();
                    if abs_n > abs_d {
                        abs_d = abs_n;
                        piv = k;
                        col_piv = h;
                    }
                }
            }
            if abs_d > ZERO_TOL {
                cp.swap(j, col_piv);
            }
        }
        if piv != j {
            rp.swap(j, piv);
        }

        let denom = u[rp[j]][cp[j]];
        if denom.abs() < ZERO_TOL {
            continue;
        }
        for h in (j + 1)..3 {
            let num = u[rp[h]][cp[j]];
            if num.abs() >= ZERO_TOL {
                let f = num / denom;
                u[rp[h]][cp[j]] = 0.0;
                for k in (j + 1)..3 {
                    u[rp[h]][cp[k]] -= f * u[rp[j]][cp[k]];
                }
                y[rp[h]] -= f * y[rp[j]];
            }
        }
    }

    let mut x = [0.0f64; 3];
    let mut running_sum = 0.0f64;
    for js in (0..3).rev() {
        let denom = u[rp[js]][cp[js]];
        if denom.abs() < ZERO_TOL {
            if y[rp[js]].abs() > ZERO_TOL {
                return None;
            }
            x[js] = 0.0;
        } else {
            let mut sm = 0.0;
            for k in (js + 1)..3 {
                sm += u[rp[js]][cp[k]] * x[k];
            }
            let x_tmp = (y[rp[js]] - sm) / denom;
            if x_tmp < NEGZERO_TOL {
                return None;
            }
            running_sum += x_tmp;
            if running_sum > ONE_TOL {
                return None;
            }
            x[js] = x_tmp;
        }
    }

    let mut w = [0.0f64; 3];
    for j in 0..3 {
        w[cp[j]] = x[j];
    }
    Some(w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Interpolation;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_identity_roundtrip() {
        let lut = Lut3D::identity(17);
        let inv = InvLut3D::new(&lut);
        for probe in [
            [0.0, 0.0, 0.0],
            [0.25, 0.5, 0.75],
            [1.0, 1.0, 1.0],
            [0.18, 0.18, 0.18],
        ] {
            let back = inv.apply(probe);
            for c in 0..3 {
                assert_abs_diff_eq!(back[c], probe[c], epsilon = 1e-3);
            }
        }
    }

    #[test]
    fn test_nonuniform_lut_roundtrip() {
        // A gamma-warped cube, still monotone per axis.
        let size = 9;
        let mut lut = Lut3D::identity(size);
        for i in 0..lut.data.len() {
            for c in 0..3 {
                lut.data[i][c] = lut.data[i][c].powf(1.8);
            }
        }
        let inv = InvLut3D::new(&lut);
        for probe in [[0.1, 0.4, 0.7], [0.5, 0.5, 0.5], [0.9, 0.2, 0.6]] {
            let fwd = lut.apply(probe, Interpolation::Tetrahedral);
            let back = inv.apply(fwd);
            let fwd2 = lut.apply(back, Interpolation::Tetrahedral);
            for c in 0..3 {
                assert_abs_diff_eq!(fwd2[c], fwd[c], epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn test_grid_points_invert_exactly() {
        let size = 5;
        let lut = Lut3D::identity(size);
        let inv = InvLut3D::new(&lut);
        let last = (size - 1) as f32;
        for i in 0..size {
            let v = i as f32 / last;
            let back = inv.apply([v, v, v]);
            for c in 0..3 {
                assert_abs_diff_eq!(back[c], v, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn test_out_of_gamut_uses_extrapolation() {
        // Identity cube with a corner pushed past 1; a query beyond the
        // nominal gamut resolves in the stretched top cell.
        let mut lut = Lut3D::identity(33);
        let n = 32;
        lut.set(n, n, n, [1.2, 1.2, 1.2]);
        let inv = InvLut3D::new(&lut);
        let back = inv.apply([1.1, 1.1, 1.1]);
        for c in 0..3 {
            assert!(back[c].is_finite());
            assert!((0.0..=1.0).contains(&back[c]));
        }
        let fwd = lut.apply(back, Interpolation::Tetrahedral);
        for c in 0..3 {
            assert_abs_diff_eq!(fwd[c], 1.1, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_flat_cube_falls_back_to_zero() {
        // A constant cube never contains the (clamped) target in any tet,
        // so the documented (0, 0, 0) fallback applies.
        let lut = Lut3D::from_data(vec![[5.0, 5.0, 5.0]; 8], 2).unwrap();
        let inv = InvLut3D::new(&lut);
        assert_eq!(inv.apply([0.5, 0.5, 0.5]), [0.0, 0.0, 0.0]);
    }
}
