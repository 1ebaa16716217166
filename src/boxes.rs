//! The `PeriodicBox` type represents the enclosing box of a simulated system,
//! with periodic boundary conditions along every axis.
use std::f64;

use crate::{Matrix3, Vector3D};

/// The shape of a periodic box determines how periodic boundary conditions
/// are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxShape {
    /// Orthorhombic box, with cuboid shape
    Orthorhombic,
    /// Triclinic box, with arbitrary parallelepiped shape
    Triclinic,
}

/// A `PeriodicBox` defines the physical boundaries of a particle snapshot.
///
/// The box matrix is stored in row-major order, each row being one box
/// vector. Two-dimensional boxes are represented with a placeholder unit
/// vector along z: points in a 2D box must have their third coordinate set
/// to 0, and the fractional coordinate along z is always reported as 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodicBox {
    /// Box matrix
    matrix: Matrix3,
    /// Transpose of the box matrix, cached from matrix
    transpose: Matrix3,
    /// Inverse of the transpose of the box matrix, cached from matrix
    inverse: Matrix3,
    /// Box shape
    shape: BoxShape,
    /// Is this a 2D box?
    is_2d: bool,
}

impl From<Matrix3> for PeriodicBox {
    fn from(matrix: Matrix3) -> PeriodicBox {
        assert!(f64::abs(matrix.determinant()) > 1e-6, "box matrix is not invertible");

        let is_close_0 = |value| f64::abs(value) < 1e-6;
        let is_diagonal = |matrix: Matrix3| {
            is_close_0(matrix[0][1]) && is_close_0(matrix[0][2]) &&
            is_close_0(matrix[1][0]) && is_close_0(matrix[1][2]) &&
            is_close_0(matrix[2][0]) && is_close_0(matrix[2][1])
        };

        let shape = if is_diagonal(matrix) {
            BoxShape::Orthorhombic
        } else {
            BoxShape::Triclinic
        };

        return PeriodicBox {
            matrix: matrix,
            transpose: matrix.transposed(),
            inverse: matrix.transposed().inverse(),
            shape: shape,
            is_2d: false,
        };
    }
}

impl PeriodicBox {
    /// Create an orthorhombic box, with side lengths `a, b, c`.
    pub fn orthorhombic(a: f64, b: f64, c: f64) -> PeriodicBox {
        assert!(a > 0.0 && b > 0.0 && c > 0.0, "box lengths must be positive");
        let matrix = Matrix3::new([
            [a, 0.0, 0.0],
            [0.0, b, 0.0],
            [0.0, 0.0, c],
        ]);
        PeriodicBox {
            matrix: matrix,
            transpose: matrix,
            inverse: matrix.inverse(),
            shape: BoxShape::Orthorhombic,
            is_2d: false,
        }
    }

    /// Create a cubic box, with side lengths `length, length, length`.
    pub fn cubic(length: f64) -> PeriodicBox {
        PeriodicBox::orthorhombic(length, length, length)
    }

    /// Create a two-dimensional rectangular box, with side lengths `a, b`.
    pub fn rectangular(a: f64, b: f64) -> PeriodicBox {
        let mut periodic_box = PeriodicBox::orthorhombic(a, b, 1.0);
        periodic_box.is_2d = true;
        return periodic_box;
    }

    /// Create a triclinic box from the side lengths `a, b, c` and the tilt
    /// factors `xy, xz, yz`. The box vectors are `(a, 0, 0)`,
    /// `(xy * b, b, 0)` and `(xz * c, yz * c, c)`.
    pub fn triclinic(a: f64, b: f64, c: f64, xy: f64, xz: f64, yz: f64) -> PeriodicBox {
        assert!(a > 0.0 && b > 0.0 && c > 0.0, "box lengths must be positive");
        assert!(xy.is_finite() && xz.is_finite() && yz.is_finite(), "tilt factors must be finite");
        let matrix = Matrix3::new([
            [a, 0.0, 0.0],
            [xy * b, b, 0.0],
            [xz * c, yz * c, c],
        ]);
        return PeriodicBox::from(matrix);
    }

    /// Create a two-dimensional triclinic box from the side lengths `a, b`
    /// and the tilt factor `xy`.
    pub fn triclinic_2d(a: f64, b: f64, xy: f64) -> PeriodicBox {
        let mut periodic_box = PeriodicBox::triclinic(a, b, 1.0, xy, 0.0, 0.0);
        periodic_box.is_2d = true;
        return periodic_box;
    }

    /// Get the box shape
    pub fn shape(&self) -> BoxShape {
        self.shape
    }

    /// Check if this box is two-dimensional
    pub fn is_2d(&self) -> bool {
        self.is_2d
    }

    /// Get the first length of the box (i.e. the norm of the first box
    /// vector)
    pub fn a(&self) -> f64 {
        match self.shape {
            BoxShape::Triclinic => self.a_vector().norm(),
            BoxShape::Orthorhombic => self.matrix[0][0],
        }
    }

    /// Get the second length of the box (i.e. the norm of the second box
    /// vector)
    pub fn b(&self) -> f64 {
        match self.shape {
            BoxShape::Triclinic => self.b_vector().norm(),
            BoxShape::Orthorhombic => self.matrix[1][1],
        }
    }

    /// Get the third length of the box (i.e. the norm of the third box
    /// vector). For a 2D box this is the unit placeholder length.
    pub fn c(&self) -> f64 {
        match self.shape {
            BoxShape::Triclinic => self.c_vector().norm(),
            BoxShape::Orthorhombic => self.matrix[2][2],
        }
    }

    /// Get the lengths of the three box vectors
    pub fn lengths(&self) -> Vector3D {
        Vector3D::new(self.a(), self.b(), self.c())
    }

    /// Get the distances between faces of the box. For a 2D box the distance
    /// along z is reported as infinite, since there is no periodic replica in
    /// this direction.
    pub fn distances_between_faces(&self) -> Vector3D {
        let (a, b, c) = (self.a_vector(), self.b_vector(), self.c_vector());
        // Plans normal vectors
        let na = (b ^ c).normalized();
        let nb = (c ^ a).normalized();
        let nc = (a ^ b).normalized();

        let mut distances = Vector3D::new(f64::abs(na * a), f64::abs(nb * b), f64::abs(nc * c));
        if self.is_2d {
            distances[2] = f64::INFINITY;
        }
        return distances;
    }

    /// Get the matricial representation of the box
    pub fn matrix(&self) -> Matrix3 {
        self.matrix
    }

    /// Get the first vector of the box
    fn a_vector(&self) -> Vector3D {
        self.matrix[0].into()
    }

    /// Get the second vector of the box
    fn b_vector(&self) -> Vector3D {
        self.matrix[1].into()
    }

    /// Get the third vector of the box
    fn c_vector(&self) -> Vector3D {
        self.matrix[2].into()
    }
}

/// Geometric operations using periodic boundary conditions
impl PeriodicBox {
    /// Get the fractional coordinates of `point` in this box, wrapped inside
    /// `[0, 1)` along each axis. For a 2D box the third fractional
    /// coordinate is always 0.
    pub fn fraction(&self, point: Vector3D) -> Vector3D {
        let mut fractional = self.fractional(point);
        fractional[0] -= f64::floor(fractional[0]);
        fractional[1] -= f64::floor(fractional[1]);
        fractional[2] -= f64::floor(fractional[2]);
        if self.is_2d {
            fractional[2] = 0.0;
        }
        return fractional;
    }

    /// Wrap a vector in the box, obeying the periodic boundary conditions.
    /// For a cubic box of side length `L`, this produce a vector with all
    /// components in `[0, L)`.
    pub fn wrap_vector(&self, vector: &mut Vector3D) {
        match self.shape {
            BoxShape::Orthorhombic => {
                vector[0] -= f64::floor(vector[0] / self.a()) * self.a();
                vector[1] -= f64::floor(vector[1] / self.b()) * self.b();
                vector[2] -= f64::floor(vector[2] / self.c()) * self.c();
            }
            BoxShape::Triclinic => {
                let mut fractional = self.fractional(*vector);
                fractional[0] -= f64::floor(fractional[0]);
                fractional[1] -= f64::floor(fractional[1]);
                fractional[2] -= f64::floor(fractional[2]);
                *vector = self.cartesian(fractional);
            }
        }
    }

    /// Find the minimum image of a vector in the box, obeying the periodic
    /// boundary conditions. For a cubic box of side length `L`, this produce
    /// a vector with all components in `[-L/2, L/2)`.
    pub fn vector_image(&self, vector: &mut Vector3D) {
        match self.shape {
            BoxShape::Orthorhombic => {
                vector[0] -= f64::round(vector[0] / self.a()) * self.a();
                vector[1] -= f64::round(vector[1] / self.b()) * self.b();
                vector[2] -= f64::round(vector[2] / self.c()) * self.c();
            }
            BoxShape::Triclinic => {
                let mut fractional = self.fractional(*vector);
                fractional[0] -= f64::round(fractional[0]);
                fractional[1] -= f64::round(fractional[1]);
                fractional[2] -= f64::round(fractional[2]);
                *vector = self.cartesian(fractional);
            }
        }
    }

    /// Get the fractional representation of the `vector` in this box
    pub fn fractional(&self, vector: Vector3D) -> Vector3D {
        // this needs to use the inverse of the transpose of the matrix, since
        // we only have code to multiply a vector by a matrix on the left
        return self.inverse * vector;
    }

    /// Get the Cartesian representation of the `fractional` vector in this
    /// box
    pub fn cartesian(&self, fractional: Vector3D) -> Vector3D {
        // this needs to use the inverse of the transpose of the matrix, since
        // we only have code to multiply a vector by a matrix on the left
        return self.transpose * fractional;
    }

    /// Periodic boundary conditions squared distance between the point `u`
    /// and the point `v`
    pub fn distance2(&self, u: Vector3D, v: Vector3D) -> f64 {
        let mut d = v - u;
        self.vector_image(&mut d);
        return d.norm2();
    }

    /// Periodic boundary conditions distance between the point `u` and the
    /// point `v`
    pub fn distance(&self, u: Vector3D, v: Vector3D) -> f64 {
        return f64::sqrt(self.distance2(u, v));
    }
}
