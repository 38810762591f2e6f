//! 2D affine transforms

/// A 2D affine map stored as a 3×2 matrix: two linear rows plus a
/// translation row.
///
/// Points are applied row-vector style, so for `t.apply(x, y)`:
///
/// ```text
/// x' = m[0][0]*x + m[1][0]*y + m[2][0]
/// y' = m[0][1]*x + m[1][1]*y + m[2][1]
/// ```
///
/// Every operation returns a new value. Instance methods pre-compose:
/// `t.translate(dx, dy)` is the map that first translates the point and
/// then applies `t`. This makes geometric chains read naturally:
/// `Transform::identity().translate(cx, cy).scale(w, h)` scales the
/// unit square and then moves it to be centered at `(cx, cy)`, even
/// though `.scale` appears last textually.
///
/// Degenerate transforms (zero scale) are legal and simply collapse
/// geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
#[repr(C)]
pub struct Transform {
    pub m: [[f32; 2]; 3],
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        m: [[1.0, 0.0], [0.0, 1.0], [0.0, 0.0]],
    };

    pub const fn identity() -> Transform {
        Self::IDENTITY
    }

    /// Apply the map to a point.
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.m[0][0] * x + self.m[1][0] * y + self.m[2][0],
            self.m[0][1] * x + self.m[1][1] * y + self.m[2][1],
        )
    }

    /// Function composition: `compose(a, b)` applies `b` first and `a`
    /// last, so `compose(a, b).apply(p) == a.apply(b.apply(p))`. Not
    /// commutative.
    pub fn compose(a: Transform, b: Transform) -> Transform {
        let am = &a.m;
        let bm = &b.m;
        let mut m = [[0.0f32; 2]; 3];
        for j in 0..2 {
            m[0][j] = bm[0][0] * am[0][j] + bm[0][1] * am[1][j];
            m[1][j] = bm[1][0] * am[0][j] + bm[1][1] * am[1][j];
            m[2][j] = bm[2][0] * am[0][j] + bm[2][1] * am[1][j] + am[2][j];
        }
        Transform { m }
    }

    /// Pre-compose a translation by `(dx, dy)`.
    pub fn translate(self, dx: f32, dy: f32) -> Transform {
        Self::compose(
            self,
            Transform {
                m: [[1.0, 0.0], [0.0, 1.0], [dx, dy]],
            },
        )
    }

    /// Pre-compose a counter-clockwise rotation by `angle` radians.
    pub fn rotate(self, angle: f32) -> Transform {
        let (sin, cos) = angle.sin_cos();
        Self::compose(
            self,
            Transform {
                m: [[cos, sin], [-sin, cos], [0.0, 0.0]],
            },
        )
    }

    /// Pre-compose an axis-aligned scale by `(sx, sy)`.
    pub fn scale(self, sx: f32, sy: f32) -> Transform {
        Self::compose(
            self,
            Transform {
                m: [[sx, 0.0], [0.0, sy], [0.0, 0.0]],
            },
        )
    }

    /// Expand to a column-major 3×3 matrix (third column `(0, 0, 1)`)
    /// for a `mat3` uniform upload.
    pub fn to_mat3(&self) -> [f32; 9] {
        [
            self.m[0][0],
            self.m[0][1],
            0.0,
            self.m[1][0],
            self.m[1][1],
            0.0,
            self.m[2][0],
            self.m[2][1],
            1.0,
        ]
    }
}

impl Default for Transform {
    fn default() -> Transform {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn assert_point_eq(actual: (f32, f32), expected: (f32, f32)) {
        assert!(
            (actual.0 - expected.0).abs() < EPS && (actual.1 - expected.1).abs() < EPS,
            "expected {expected:?}, got {actual:?}"
        );
    }

    fn assert_transform_eq(a: Transform, b: Transform) {
        for i in 0..3 {
            for j in 0..2 {
                assert!(
                    (a.m[i][j] - b.m[i][j]).abs() < EPS,
                    "matrices differ at [{i}][{j}]: {a:?} vs {b:?}"
                );
            }
        }
    }

    #[test]
    fn test_identity_apply() {
        let t = Transform::identity();
        assert_point_eq(t.apply(3.0, -7.5), (3.0, -7.5));
    }

    #[test]
    fn test_translate() {
        let t = Transform::identity().translate(10.0, -2.0);
        assert_point_eq(t.apply(1.0, 1.0), (11.0, -1.0));
    }

    #[test]
    fn test_scale() {
        let t = Transform::identity().scale(2.0, 3.0);
        assert_point_eq(t.apply(1.0, 1.0), (2.0, 3.0));
    }

    #[test]
    fn test_rotate_quarter_turn_is_counter_clockwise() {
        let t = Transform::identity().rotate(std::f32::consts::FRAC_PI_2);
        assert_point_eq(t.apply(1.0, 0.0), (0.0, 1.0));
        assert_point_eq(t.apply(0.0, 1.0), (-1.0, 0.0));
    }

    #[test]
    fn test_instance_methods_pre_compose() {
        // Scale is applied to the point first even though `.scale` is
        // called after `.translate`.
        let t = Transform::identity().translate(10.0, 0.0).scale(2.0, 2.0);
        assert_point_eq(t.apply(1.0, 1.0), (12.0, 2.0));
    }

    #[test]
    fn test_compose_applies_right_operand_first() {
        let translate = Transform::identity().translate(5.0, 0.0);
        let scale = Transform::identity().scale(2.0, 2.0);

        let scale_then_translate = Transform::compose(translate, scale);
        assert_point_eq(scale_then_translate.apply(1.0, 1.0), (7.0, 2.0));

        let translate_then_scale = Transform::compose(scale, translate);
        assert_point_eq(translate_then_scale.apply(1.0, 1.0), (12.0, 2.0));
    }

    #[test]
    fn test_compose_matches_pointwise_application() {
        let a = Transform::identity().rotate(0.3).translate(2.0, -1.0);
        let b = Transform::identity().scale(1.5, 0.25).rotate(-1.1);
        let c = Transform::compose(a, b);

        for &(x, y) in &[(0.0, 0.0), (1.0, 0.0), (-3.0, 2.5), (10.0, 10.0)] {
            let (bx, by) = b.apply(x, y);
            assert_point_eq(c.apply(x, y), a.apply(bx, by));
        }
    }

    #[test]
    fn test_compose_associativity() {
        let a = Transform::identity().rotate(0.7).translate(1.0, 2.0);
        let b = Transform::identity().scale(3.0, -0.5);
        let c = Transform::identity().translate(-4.0, 0.25).rotate(2.0);

        let left = Transform::compose(Transform::compose(a, b), c);
        let right = Transform::compose(a, Transform::compose(b, c));
        assert_transform_eq(left, right);
    }

    #[test]
    fn test_identity_laws() {
        let a = Transform::identity().translate(3.0, 4.0).rotate(1.0).scale(2.0, 0.5);
        assert_transform_eq(Transform::compose(a, Transform::identity()), a);
        assert_transform_eq(Transform::compose(Transform::identity(), a), a);
    }

    #[test]
    fn test_degenerate_scale_collapses() {
        let t = Transform::identity().translate(5.0, 5.0).scale(0.0, 0.0);
        assert_point_eq(t.apply(100.0, -42.0), (5.0, 5.0));
    }

    #[test]
    fn test_to_mat3_is_column_major() {
        let t = Transform::identity().translate(7.0, 8.0).scale(2.0, 3.0);
        let m = t.to_mat3();
        // Columns: linear x, linear y, translation.
        assert_eq!(&m[0..3], &[2.0, 0.0, 0.0]);
        assert_eq!(&m[3..6], &[0.0, 3.0, 0.0]);
        assert_eq!(&m[6..9], &[7.0, 8.0, 1.0]);
    }
}
