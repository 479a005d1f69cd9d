use super::Vec3;

/// Column-major 4x4 matrix (`cols[col][row]`), f64 on the CPU side.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mat4 {
    pub cols: [[f64; 4]; 4],
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat4 {
    pub const IDENTITY: Self = Self {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    pub fn from_cols(cols: [[f64; 4]; 4]) -> Self {
        Self { cols }
    }

    pub fn translation(t: Vec3) -> Self {
        let mut m = Self::IDENTITY;
        m.cols[3] = [t.x, t.y, t.z, 1.0];
        m
    }

    pub fn scale(s: Vec3) -> Self {
        let mut m = Self::IDENTITY;
        m.cols[0][0] = s.x;
        m.cols[1][1] = s.y;
        m.cols[2][2] = s.z;
        m
    }

    /// Right-handed rotation about +Y.
    pub fn rotation_y(angle_rad: f64) -> Self {
        let (s, c) = angle_rad.sin_cos();
        Self::from_cols([
            [c, 0.0, -s, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [s, 0.0, c, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Right-handed perspective projection with depth range [0, 1].
    pub fn perspective_rh_z0(fov_y_rad: f64, aspect: f64, near: f64, far: f64) -> Self {
        let f = 1.0 / (0.5 * fov_y_rad).tan();
        Self::from_cols([
            [f / aspect, 0.0, 0.0, 0.0],
            [0.0, f, 0.0, 0.0],
            [0.0, 0.0, far / (near - far), -1.0],
            [0.0, 0.0, (near * far) / (near - far), 0.0],
        ])
    }

    /// Right-handed view matrix looking from `eye` towards `target`.
    ///
    /// Returns `None` when `eye == target` or `up` is parallel to the view direction.
    pub fn look_at_rh(eye: Vec3, target: Vec3, up: Vec3) -> Option<Self> {
        let f = (target - eye).normalize()?;
        let s = f.cross(up).normalize()?;
        let u = s.cross(f);

        Some(Self::from_cols([
            [s.x, u.x, -f.x, 0.0],
            [s.y, u.y, -f.y, 0.0],
            [s.z, u.z, -f.z, 0.0],
            [-s.dot(eye), -u.dot(eye), f.dot(eye), 1.0],
        ]))
    }

    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        let c = &self.cols;
        Vec3::new(
            c[0][0] * p.x + c[1][0] * p.y + c[2][0] * p.z + c[3][0],
            c[0][1] * p.x + c[1][1] * p.y + c[2][1] * p.z + c[3][1],
            c[0][2] * p.x + c[1][2] * p.y + c[2][2] * p.z + c[3][2],
        )
    }

    /// Applies the full matrix including the perspective divide.
    ///
    /// Returns `None` when the point maps to `w <= 0` (behind a perspective eye).
    pub fn project_point(&self, p: Vec3) -> Option<Vec3> {
        let c = &self.cols;
        let w = c[0][3] * p.x + c[1][3] * p.y + c[2][3] * p.z + c[3][3];
        if w <= 0.0 {
            return None;
        }
        let v = self.transform_point(p);
        Some(v * (1.0 / w))
    }

    pub fn transform_vector(&self, v: Vec3) -> Vec3 {
        let c = &self.cols;
        Vec3::new(
            c[0][0] * v.x + c[1][0] * v.y + c[2][0] * v.z,
            c[0][1] * v.x + c[1][1] * v.y + c[2][1] * v.z,
            c[0][2] * v.x + c[1][2] * v.y + c[2][2] * v.z,
        )
    }

    pub fn translation_part(&self) -> Vec3 {
        Vec3::new(self.cols[3][0], self.cols[3][1], self.cols[3][2])
    }

    /// Length of each basis column, i.e. the scale baked into an affine matrix.
    pub fn scale_part(&self) -> Vec3 {
        let axis = |i: usize| Vec3::new(self.cols[i][0], self.cols[i][1], self.cols[i][2]).length();
        Vec3::new(axis(0), axis(1), axis(2))
    }

    /// Copy with the translation column cleared.
    pub fn without_translation(&self) -> Self {
        let mut m = *self;
        m.cols[3] = [0.0, 0.0, 0.0, 1.0];
        m
    }

    /// General inverse via cofactor expansion. `None` if singular.
    pub fn inverse(&self) -> Option<Self> {
        let m: [f64; 16] = [
            self.cols[0][0],
            self.cols[0][1],
            self.cols[0][2],
            self.cols[0][3],
            self.cols[1][0],
            self.cols[1][1],
            self.cols[1][2],
            self.cols[1][3],
            self.cols[2][0],
            self.cols[2][1],
            self.cols[2][2],
            self.cols[2][3],
            self.cols[3][0],
            self.cols[3][1],
            self.cols[3][2],
            self.cols[3][3],
        ];
        let mut inv = [0.0f64; 16];

        inv[0] = m[5] * m[10] * m[15] - m[5] * m[11] * m[14] - m[9] * m[6] * m[15]
            + m[9] * m[7] * m[14]
            + m[13] * m[6] * m[11]
            - m[13] * m[7] * m[10];
        inv[4] = -m[4] * m[10] * m[15] + m[4] * m[11] * m[14] + m[8] * m[6] * m[15]
            - m[8] * m[7] * m[14]
            - m[12] * m[6] * m[11]
            + m[12] * m[7] * m[10];
        inv[8] = m[4] * m[9] * m[15] - m[4] * m[11] * m[13] - m[8] * m[5] * m[15]
            + m[8] * m[7] * m[13]
            + m[12] * m[5] * m[11]
            - m[12] * m[7] * m[9];
        inv[12] = -m[4] * m[9] * m[14] + m[4] * m[10] * m[13] + m[8] * m[5] * m[14]
            - m[8] * m[6] * m[13]
            - m[12] * m[5] * m[10]
            + m[12] * m[6] * m[9];
        inv[1] = -m[1] * m[10] * m[15] + m[1] * m[11] * m[14] + m[9] * m[2] * m[15]
            - m[9] * m[3] * m[14]
            - m[13] * m[2] * m[11]
            + m[13] * m[3] * m[10];
        inv[5] = m[0] * m[10] * m[15] - m[0] * m[11] * m[14] - m[8] * m[2] * m[15]
            + m[8] * m[3] * m[14]
            + m[12] * m[2] * m[11]
            - m[12] * m[3] * m[10];
        inv[9] = -m[0] * m[9] * m[15] + m[0] * m[11] * m[13] + m[8] * m[1] * m[15]
            - m[8] * m[3] * m[13]
            - m[12] * m[1] * m[11]
            + m[12] * m[3] * m[9];
        inv[13] = m[0] * m[9] * m[14] - m[0] * m[10] * m[13] - m[8] * m[1] * m[14]
            + m[8] * m[2] * m[13]
            + m[12] * m[1] * m[10]
            - m[12] * m[2] * m[9];
        inv[2] = m[1] * m[6] * m[15] - m[1] * m[7] * m[14] - m[5] * m[2] * m[15]
            + m[5] * m[3] * m[14]
            + m[13] * m[2] * m[7]
            - m[13] * m[3] * m[6];
        inv[6] = -m[0] * m[6] * m[15] + m[0] * m[7] * m[14] + m[4] * m[2] * m[15]
            - m[4] * m[3] * m[14]
            - m[12] * m[2] * m[7]
            + m[12] * m[3] * m[6];
        inv[10] = m[0] * m[5] * m[15] - m[0] * m[7] * m[13] - m[4] * m[1] * m[15]
            + m[4] * m[3] * m[13]
            + m[12] * m[1] * m[7]
            - m[12] * m[3] * m[5];
        inv[14] = -m[0] * m[5] * m[14] + m[0] * m[6] * m[13] + m[4] * m[1] * m[14]
            - m[4] * m[2] * m[13]
            - m[12] * m[1] * m[6]
            + m[12] * m[2] * m[5];
        inv[3] = -m[1] * m[6] * m[11] + m[1] * m[7] * m[10] + m[5] * m[2] * m[11]
            - m[5] * m[3] * m[10]
            - m[9] * m[2] * m[7]
            + m[9] * m[3] * m[6];
        inv[7] = m[0] * m[6] * m[11] - m[0] * m[7] * m[10] - m[4] * m[2] * m[11]
            + m[4] * m[3] * m[10]
            + m[8] * m[2] * m[7]
            - m[8] * m[3] * m[6];
        inv[11] = -m[0] * m[5] * m[11] + m[0] * m[7] * m[9] + m[4] * m[1] * m[11]
            - m[4] * m[3] * m[9]
            - m[8] * m[1] * m[7]
            + m[8] * m[3] * m[5];
        inv[15] = m[0] * m[5] * m[10] - m[0] * m[6] * m[9] - m[4] * m[1] * m[10]
            + m[4] * m[2] * m[9]
            + m[8] * m[1] * m[6]
            - m[8] * m[2] * m[5];

        let det = m[0] * inv[0] + m[1] * inv[4] + m[2] * inv[8] + m[3] * inv[12];
        if det.abs() < 1e-300 || !det.is_finite() {
            return None;
        }
        let inv_det = 1.0 / det;

        let mut cols = [[0.0f64; 4]; 4];
        for (i, v) in inv.iter().enumerate() {
            cols[i / 4][i % 4] = v * inv_det;
        }
        Some(Self { cols })
    }

    pub fn to_f32_cols(&self) -> [[f32; 4]; 4] {
        let mut out = [[0.0f32; 4]; 4];
        for (col, src) in out.iter_mut().zip(self.cols.iter()) {
            for (dst, v) in col.iter_mut().zip(src.iter()) {
                *dst = *v as f32;
            }
        }
        out
    }
}

impl std::ops::Mul for Mat4 {
    type Output = Self;

    /// `self * other`: `other` is applied first.
    fn mul(self, other: Self) -> Self::Output {
        let a = &self.cols;
        let b = &other.cols;
        let mut c = [[0.0f64; 4]; 4];
        for col in 0..4 {
            for row in 0..4 {
                c[col][row] = a[0][row] * b[col][0]
                    + a[1][row] * b[col][1]
                    + a[2][row] * b[col][2]
                    + a[3][row] * b[col][3];
            }
        }
        Self { cols: c }
    }
}

#[cfg(test)]
mod tests {
    use super::Mat4;
    use crate::math::Vec3;

    fn assert_vec_close(a: Vec3, b: Vec3, eps: f64) {
        let diff = (a - b).length();
        assert!(diff <= eps, "expected {a:?} ~= {b:?} (diff {diff})");
    }

    fn assert_mat_close(a: Mat4, b: Mat4, eps: f64) {
        for col in 0..4 {
            for row in 0..4 {
                let diff = (a.cols[col][row] - b.cols[col][row]).abs();
                assert!(diff <= eps, "mismatch at [{col}][{row}]: {a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn rotation_y_turns_z_into_x() {
        let r = Mat4::rotation_y(std::f64::consts::FRAC_PI_2);
        assert_vec_close(
            r.transform_point(Vec3::new(0.0, 0.0, 1.0)),
            Vec3::new(1.0, 0.0, 0.0),
            1e-12,
        );
        assert_vec_close(
            r.transform_point(Vec3::new(1.0, 0.0, 0.0)),
            Vec3::new(0.0, 0.0, -1.0),
            1e-12,
        );
    }

    #[test]
    fn multiplication_applies_right_operand_first() {
        let t = Mat4::translation(Vec3::new(10.0, 0.0, 0.0));
        let r = Mat4::rotation_y(std::f64::consts::PI);
        let p = (t * r).transform_point(Vec3::new(1.0, 0.0, 0.0));
        assert_vec_close(p, Vec3::new(9.0, 0.0, 0.0), 1e-12);
    }

    #[test]
    fn inverse_round_trips_affine_transform() {
        let m = Mat4::translation(Vec3::new(3.0, -2.0, 7.5))
            * Mat4::rotation_y(0.7)
            * Mat4::scale(Vec3::new(2.0, 2.0, 0.5));
        let inv = m.inverse().expect("invertible");
        assert_mat_close(m * inv, Mat4::IDENTITY, 1e-12);
    }

    #[test]
    fn singular_matrix_has_no_inverse() {
        let m = Mat4::scale(Vec3::new(1.0, 0.0, 1.0));
        assert!(m.inverse().is_none());
    }

    #[test]
    fn look_at_maps_target_onto_negative_z() {
        let eye = Vec3::new(0.0, 0.0, 320.0);
        let view = Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y).expect("view");
        assert_vec_close(view.transform_point(Vec3::ZERO), Vec3::new(0.0, 0.0, -320.0), 1e-9);
        assert!(Mat4::look_at_rh(eye, eye, Vec3::Y).is_none());
    }

    #[test]
    fn perspective_maps_near_and_far_to_unit_depth_range() {
        let proj = Mat4::perspective_rh_z0(45f64.to_radians(), 1.5, 1.0, 10_000.0);
        let near = proj.project_point(Vec3::new(0.0, 0.0, -1.0)).expect("in front");
        let far = proj.project_point(Vec3::new(0.0, 0.0, -10_000.0)).expect("in front");
        assert!(near.z.abs() < 1e-9);
        assert!((far.z - 1.0).abs() < 1e-9);
        assert!(proj.project_point(Vec3::new(0.0, 0.0, 5.0)).is_none());
    }
}
