//! 2D affine transforms in homogeneous form.

use crate::error::{Result, SteadyError};
use glam::{DAffine2, DMat2, DVec2};
use std::ops::Mul;

/// Determinants smaller than this are treated as singular.
pub const SINGULAR_EPSILON: f64 = 1e-12;

/// A 2D affine transform, conceptually a 3x3 matrix whose bottom row is
/// always `[0, 0, 1]`.
///
/// Composition follows matrix multiplication: `a * b` applies `b` first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2D {
    inner: DAffine2,
}

impl Transform2D {
    /// Identity transform.
    pub const IDENTITY: Self = Self {
        inner: DAffine2::IDENTITY,
    };

    /// Build from the top two rows `[[a, b, tx], [c, d, ty]]`.
    pub fn from_rows(rows: [[f64; 3]; 2]) -> Self {
        let [[a, b, tx], [c, d, ty]] = rows;
        Self {
            inner: DAffine2::from_mat2_translation(
                DMat2::from_cols(DVec2::new(a, c), DVec2::new(b, d)),
                DVec2::new(tx, ty),
            ),
        }
    }

    /// Create a translation transform.
    #[inline]
    pub fn translate(x: f64, y: f64) -> Self {
        Self {
            inner: DAffine2::from_translation(DVec2::new(x, y)),
        }
    }

    /// Create a similarity: uniform `scale`, rotation `angle` (radians),
    /// then translation.
    pub fn similarity(scale: f64, angle: f64, tx: f64, ty: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::from_rows([
            [scale * cos, -scale * sin, tx],
            [scale * sin, scale * cos, ty],
        ])
    }

    /// Top two rows of the matrix.
    pub fn rows(&self) -> [[f64; 3]; 2] {
        let m = self.inner.matrix2;
        let t = self.inner.translation;
        [[m.x_axis.x, m.y_axis.x, t.x], [m.x_axis.y, m.y_axis.y, t.y]]
    }

    /// Full 3x3 homogeneous matrix, row-major.
    pub fn to_rows3(&self) -> [[f64; 3]; 3] {
        let [r0, r1] = self.rows();
        [r0, r1, [0.0, 0.0, 1.0]]
    }

    /// Matrix product `self * other`: apply `other`, then `self`.
    #[inline]
    pub fn then(self, other: Self) -> Self {
        Self {
            inner: self.inner * other.inner,
        }
    }

    /// Determinant of the 2x2 linear part.
    #[inline]
    pub fn determinant(&self) -> f64 {
        self.inner.matrix2.determinant()
    }

    /// General affine inverse.
    ///
    /// Fails when the linear part is singular or the matrix holds
    /// non-finite values.
    pub fn try_inverse(&self) -> Result<Self> {
        let determinant = self.determinant();
        if !determinant.is_finite() || determinant.abs() < SINGULAR_EPSILON {
            return Err(SteadyError::SingularTransform { determinant });
        }
        let inverse = self.inner.inverse();
        if !inverse.is_finite() {
            return Err(SteadyError::SingularTransform { determinant });
        }
        Ok(Self { inner: inverse })
    }

    /// Transform a point.
    #[inline]
    pub fn transform_point(&self, point: DVec2) -> DVec2 {
        self.inner.transform_point2(point)
    }

    /// Translation component.
    #[inline]
    pub fn translation(&self) -> DVec2 {
        self.inner.translation
    }

    /// Uniform scale, assuming a similarity (no shear).
    pub fn similarity_scale(&self) -> f64 {
        self.determinant().abs().sqrt()
    }

    /// Rotation angle in radians, assuming a similarity (no shear).
    pub fn rotation(&self) -> f64 {
        let m = self.inner.matrix2;
        m.x_axis.y.atan2(m.x_axis.x)
    }

    pub fn is_finite(&self) -> bool {
        self.inner.is_finite()
    }

    /// Element-wise comparison with an absolute tolerance.
    pub fn approx_eq(&self, other: &Self, eps: f64) -> bool {
        self.inner.abs_diff_eq(other.inner, eps)
    }

    pub fn is_identity_within(&self, eps: f64) -> bool {
        self.approx_eq(&Self::IDENTITY, eps)
    }

    /// Underlying glam affine.
    #[inline]
    pub fn as_affine(&self) -> &DAffine2 {
        &self.inner
    }
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Transform2D {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        self.then(rhs)
    }
}

impl From<DAffine2> for Transform2D {
    fn from(inner: DAffine2) -> Self {
        Self { inner }
    }
}
