use bytemuck::{Pod, Zeroable};

/// 2D affine transform:
///
/// ```text
/// | a  c  tx |
/// | b  d  ty |
/// | 0  0  1  |
/// ```
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Matrix {
    #[inline]
    pub const fn identity() -> Self {
        Self { a: 1.0, b: 0.0, c: 0.0, d: 1.0, tx: 0.0, ty: 0.0 }
    }

    #[inline]
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.tx,
            self.b * x + self.d * y + self.ty,
        )
    }

    /// Column-major 3x3, each column padded to a vec4 for WGSL/std140 layout.
    pub fn to_mat3_cols(&self) -> [[f32; 4]; 3] {
        [
            [self.a, self.b, 0.0, 0.0],
            [self.c, self.d, 0.0, 0.0],
            [self.tx, self.ty, 1.0, 0.0],
        ]
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

/// Uniform block carrying the active projection to draw pipelines.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct ProjectionUniform {
    pub projection: [[f32; 4]; 3],
}

impl From<&Matrix> for ProjectionUniform {
    fn from(m: &Matrix) -> Self {
        Self { projection: m.to_mat3_cols() }
    }
}
