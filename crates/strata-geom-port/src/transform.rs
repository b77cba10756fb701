// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Affine shape transform.

/// Column-major 4x4 local-to-world matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transform(pub [f64; 16]);

impl Transform {
    /// Identity transform.
    pub const IDENTITY: Self = Self([
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]);

    /// Pure translation.
    pub fn translation(x: f64, y: f64, z: f64) -> Self {
        let mut m = Self::IDENTITY.0;
        m[12] = x;
        m[13] = y;
        m[14] = z;
        Self(m)
    }

    /// Axis-aligned scale.
    pub fn scale(x: f64, y: f64, z: f64) -> Self {
        let mut m = Self::IDENTITY.0;
        m[0] = x;
        m[5] = y;
        m[10] = z;
        Self(m)
    }

    /// Returns `true` for the exact identity matrix.
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    fn at(&self, row: usize, col: usize) -> f64 {
        self.0[col * 4 + row]
    }

    /// Determinant of the linear part. Negative values mirror geometry.
    pub fn determinant(&self) -> f64 {
        let a = |r, c| self.at(r, c);
        a(0, 0) * (a(1, 1) * a(2, 2) - a(1, 2) * a(2, 1))
            - a(0, 1) * (a(1, 0) * a(2, 2) - a(1, 2) * a(2, 0))
            + a(0, 2) * (a(1, 0) * a(2, 1) - a(1, 1) * a(2, 0))
    }

    /// Apply to a point.
    pub fn transform_point(&self, p: [f64; 3]) -> [f64; 3] {
        let mut out = [0.0; 3];
        for (row, o) in out.iter_mut().enumerate() {
            *o = self.at(row, 0) * p[0]
                + self.at(row, 1) * p[1]
                + self.at(row, 2) * p[2]
                + self.at(row, 3);
        }
        out
    }

    /// Apply to a normal using the inverse transpose of the linear part.
    ///
    /// The result is re-normalized. Singular matrices return the input.
    pub fn transform_normal(&self, n: [f64; 3]) -> [f64; 3] {
        let a = |r, c| self.at(r, c);
        // cofactor matrix of the 3x3 block equals det * inverse transpose
        let cof = [
            [
                a(1, 1) * a(2, 2) - a(1, 2) * a(2, 1),
                a(1, 2) * a(2, 0) - a(1, 0) * a(2, 2),
                a(1, 0) * a(2, 1) - a(1, 1) * a(2, 0),
            ],
            [
                a(0, 2) * a(2, 1) - a(0, 1) * a(2, 2),
                a(0, 0) * a(2, 2) - a(0, 2) * a(2, 0),
                a(0, 1) * a(2, 0) - a(0, 0) * a(2, 1),
            ],
            [
                a(0, 1) * a(1, 2) - a(0, 2) * a(1, 1),
                a(0, 2) * a(1, 0) - a(0, 0) * a(1, 2),
                a(0, 0) * a(1, 1) - a(0, 1) * a(1, 0),
            ],
        ];
        let det = a(0, 0) * cof[0][0] + a(0, 1) * cof[0][1] + a(0, 2) * cof[0][2];
        if det == 0.0 {
            return n;
        }
        let mut out = [0.0; 3];
        for (row, o) in out.iter_mut().enumerate() {
            *o = cof[row][0] * n[0] + cof[row][1] * n[1] + cof[row][2] * n[2];
        }
        let len = out.iter().map(|c| c * c).sum::<f64>().sqrt();
        if len > 0.0 {
            out.iter_mut().for_each(|c| *c /= len);
        }
        // inverse transpose is cof / det; only the sign of det survives normalization
        if det < 0.0 {
            out.iter_mut().for_each(|c| *c = -*c);
        }
        out
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}
