//! Quadratic error function solver.
//!
//! A QEF collects Hermite constraints `(normal, point)`, each describing a
//! plane the surface is expected to pass through, and finds the position
//! minimising the sum of squared distances to all of those planes:
//!
//! ```text
//! E(x) = Σ (n·(x - p))²  =  xᵀ(AᵀA)x - 2xᵀ(Aᵀb) + bᵀb
//! ```
//!
//! The normal equations are solved around the mass point (mean of all
//! constraint points) with a truncated pseudo-inverse, so directions the
//! constraints don't pin down (flat regions, single planes) stay at the mass
//! point instead of shooting off to infinity.
//!
//! Accumulation runs in double precision. The residual is a difference of
//! large sums and single precision loses it entirely past a few cells.
use glam::{ DVec3, Vec3 };

/// Eigenvalues (or their reciprocals) smaller than this are treated as zero.
pub const PSEUDO_INVERSE_THRESHOLD: f64 = 0.1;

/// Cyclic Jacobi sweeps over the 3 off-diagonal pairs. Plenty for a 3x3.
pub const JACOBI_SWEEPS: usize = 5;

type Mat3 = [[f64; 3]; 3];

/// Running sums for one QEF.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QefData {
    // Upper triangle of the symmetric AᵀA: xx, xy, xz, yy, yz, zz
    ata: [f64; 6],
    atb: DVec3,
    btb: f64,
    point_sum: DVec3,
    count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QefSolution {
    pub position: Vec3,
    /// Sum of squared plane distances at `position`, see [`QefData::error_at`].
    pub error: f32,
}

impl QefData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulates the plane through `point` with the given `normal`.
    pub fn add(&mut self, normal: Vec3, point: Vec3) {
        let n = normal.as_dvec3();
        let p = point.as_dvec3();
        let d = n.dot(p);

        self.ata[0] += n.x * n.x;
        self.ata[1] += n.x * n.y;
        self.ata[2] += n.x * n.z;
        self.ata[3] += n.y * n.y;
        self.ata[4] += n.y * n.z;
        self.ata[5] += n.z * n.z;

        self.atb += n * d;
        self.btb += d * d;
        self.point_sum += p;
        self.count += 1;
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn mass_point(&self) -> Vec3 {
        assert!(self.count > 0, "mass point of an empty QEF");
        (self.point_sum / self.count as f64).as_vec3()
    }

    /// Squared distance sum of all accumulated planes at `position`.
    ///
    /// This is the residual `solve` reports and simplification thresholds are
    /// measured in. It is not the normal-equation residual
    /// `‖AᵀA·x − Aᵀb‖²`, which vanishes at any least-squares solution, so a
    /// threshold tuned against that metric is far too loose here.
    pub fn error_at(&self, position: Vec3) -> f32 {
        let x = position.as_dvec3();
        let error = x.dot(self.mul_ata(x)) - 2.0 * x.dot(self.atb) + self.btb;
        error.max(0.0) as f32
    }

    /// Panics on an empty QEF. Callers only solve cells that saw at least one
    /// crossing.
    pub fn solve(&self) -> QefSolution {
        assert!(self.count > 0, "solving a QEF with no constraints");

        let mass_point = self.point_sum / self.count as f64;
        let shifted_atb = self.atb - self.mul_ata(mass_point);

        let (sigma, v) = jacobi_eigen(self.full_ata());
        let pinv = pseudo_inverse(sigma, &v);
        let correction = mul(&pinv, shifted_atb);

        let position = (mass_point + correction).as_vec3();
        QefSolution {
            position,
            error: self.error_at(position),
        }
    }

    fn full_ata(&self) -> Mat3 {
        let a = &self.ata;
        [
            [a[0], a[1], a[2]],
            [a[1], a[3], a[4]],
            [a[2], a[4], a[5]],
        ]
    }

    fn mul_ata(&self, x: DVec3) -> DVec3 {
        mul(&self.full_ata(), x)
    }
}

fn mul(m: &Mat3, x: DVec3) -> DVec3 {
    DVec3::new(
        m[0][0] * x.x + m[0][1] * x.y + m[0][2] * x.z,
        m[1][0] * x.x + m[1][1] * x.y + m[1][2] * x.z,
        m[2][0] * x.x + m[2][1] * x.y + m[2][2] * x.z,
    )
}

/// Diagonalises a symmetric matrix: returns the eigenvalues and the matrix
/// whose columns are the matching eigenvectors.
fn jacobi_eigen(mut a: Mat3) -> ([f64; 3], Mat3) {
    let mut v = [
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0],
    ];

    for _ in 0..JACOBI_SWEEPS {
        for (p, q) in [(0, 1), (0, 2), (1, 2)] {
            jacobi_rotate(&mut a, &mut v, p, q);
        }
    }

    ([a[0][0], a[1][1], a[2][2]], v)
}

/// One Givens rotation zeroing `a[p][q]`, accumulated into `v`.
fn jacobi_rotate(a: &mut Mat3, v: &mut Mat3, p: usize, q: usize) {
    let apq = a[p][q];
    if apq == 0.0 {
        return;
    }

    let theta = (a[q][q] - a[p][p]) / (2.0 * apq);
    let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
    let c = 1.0 / (t * t + 1.0).sqrt();
    let s = t * c;

    a[p][p] -= t * apq;
    a[q][q] += t * apq;
    a[p][q] = 0.0;
    a[q][p] = 0.0;

    let r = 3 - p - q;
    let (arp, arq) = (a[r][p], a[r][q]);
    a[r][p] = c * arp - s * arq;
    a[p][r] = a[r][p];
    a[r][q] = s * arp + c * arq;
    a[q][r] = a[r][q];

    for row in v.iter_mut() {
        let (vp, vq) = (row[p], row[q]);
        row[p] = c * vp - s * vq;
        row[q] = s * vp + c * vq;
    }
}

fn inverse_or_zero(x: f64) -> f64 {
    if x.abs() < PSEUDO_INVERSE_THRESHOLD || (1.0 / x).abs() < PSEUDO_INVERSE_THRESHOLD {
        0.0
    }
    else {
        1.0 / x
    }
}

fn pseudo_inverse(sigma: [f64; 3], v: &Mat3) -> Mat3 {
    let d = sigma.map(inverse_or_zero);
    let mut out = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            out[i][j] = (0..3).map(|k| v[i][k] * d[k] * v[j][k]).sum();
        }
    }
    out
}

#[test]
fn qef_single_constraint() {
    use glam::vec3;

    let mut qef = QefData::new();
    let point = vec3(0.3, 0.5, 0.7);
    qef.add(vec3(0.6, 0.8, 0.0), point);

    let solution = qef.solve();
    assert!(solution.position.abs_diff_eq(point, 1e-5), "{:?}", solution.position);
    assert!(solution.error < 1e-10, "{}", solution.error);
}

#[test]
fn qef_coplanar_constraints() {
    use glam::vec3;

    let normal = vec3(1.0, 2.0, -0.5).normalize();
    // Two tangent directions of the plane through (1, 1, 1)
    let t1 = normal.cross(Vec3::Z).normalize();
    let t2 = normal.cross(t1);
    let on_plane = |u: f32, v: f32| Vec3::ONE + t1 * u + t2 * v;

    let mut qef = QefData::new();
    for (u, v) in [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (0.4, -0.7), (-1.2, 0.3)] {
        qef.add(normal, on_plane(u, v));
    }

    let solution = qef.solve();
    assert!(solution.error < 1e-6, "{}", solution.error);
    assert!(normal.dot(solution.position - Vec3::ONE).abs() < 1e-4);
    // Unconstrained along the plane: stays at the mass point
    assert!(solution.position.abs_diff_eq(qef.mass_point(), 1e-4));
}

#[test]
fn qef_sharp_corner() {
    use glam::vec3;

    // Three axis planes meeting at (0.25, 0.5, 0.75)
    let corner = vec3(0.25, 0.5, 0.75);
    let mut qef = QefData::new();
    qef.add(Vec3::X, vec3(0.25, 0.9, 0.1));
    qef.add(Vec3::Y, vec3(0.8, 0.5, 0.3));
    qef.add(Vec3::Z, vec3(0.6, 0.2, 0.75));

    let solution = qef.solve();
    assert!(solution.position.abs_diff_eq(corner, 1e-5), "{:?}", solution.position);
    assert!(solution.error < 1e-8);
}

#[test]
fn qef_parallel_planes_have_error() {
    use glam::vec3;

    // y = 0.5 and y = 1.5 can't both be satisfied; best is halfway with error 2 * 0.5²
    let mut qef = QefData::new();
    qef.add(Vec3::Y, vec3(0.0, 0.5, 0.0));
    qef.add(Vec3::Y, vec3(1.0, 1.5, 0.0));

    let solution = qef.solve();
    assert!((solution.position.y - 1.0).abs() < 1e-5);
    assert!((solution.error - 0.5).abs() < 1e-5, "{}", solution.error);
}

#[test]
fn qef_degenerate_stays_at_mass_point() {
    use glam::vec3;

    // Tiny normals: every eigenvalue falls under the threshold
    let mut qef = QefData::new();
    qef.add(vec3(0.01, 0.0, 0.0), vec3(0.0, 0.0, 0.0));
    qef.add(vec3(0.0, 0.01, 0.0), vec3(1.0, 1.0, 1.0));

    let solution = qef.solve();
    assert!(solution.position.abs_diff_eq(qef.mass_point(), 1e-6));
}

#[test]
#[should_panic]
fn qef_empty_solve_panics() {
    QefData::new().solve();
}

#[test]
fn jacobi_diagonalises() {
    let a = [
        [4.0, 1.0, 0.5],
        [1.0, 3.0, 0.2],
        [0.5, 0.2, 1.0],
    ];
    let (sigma, v) = jacobi_eigen(a);

    // A·v_k == σ_k·v_k for each eigenvector column
    for k in 0..3 {
        let col = DVec3::new(v[0][k], v[1][k], v[2][k]);
        let av = mul(&a, col);
        assert!(av.abs_diff_eq(col * sigma[k], 1e-9), "{k}: {av:?} vs {:?}", col * sigma[k]);
    }
}
