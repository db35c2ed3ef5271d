//! Opaque solid values and their mesh export.
//!
//! The pipeline never looks inside a [`Solid`]; it only asks the CSG kernel for
//! a triangle mesh and writes that mesh as binary STL.

use glam::Vec3;
use vcad::Part;

use crate::error::ExportError;

/// STL header length in bytes
const STL_HEADER_LEN: usize = 80;
/// Bytes per STL triangle record: normal + 3 vertices (12 f32) + attribute u16
const STL_TRIANGLE_LEN: usize = 50;

/// Immutable geometric value produced by a module's `generate`.
pub struct Solid {
    part: Part,
}

impl Solid {
    pub fn new(part: Part) -> Self {
        Self { part }
    }

    /// Triangulate the solid.
    pub fn mesh(&self) -> Result<TriangleMesh, ExportError> {
        let mesh = self.part.to_mesh();
        let positions = mesh.vertices();
        let indices = mesh.indices();

        if positions.is_empty() || indices.len() < 3 {
            return Err(ExportError::EmptyMesh);
        }

        let vertex_count = positions.len() / 3;
        let vertices: Vec<Vec3> = positions
            .chunks_exact(3)
            .map(|p| Vec3::new(p[0], p[1], p[2]))
            .collect();

        let mut triangles = Vec::with_capacity(indices.len() / 3);
        for tri in indices.chunks_exact(3) {
            for &index in tri {
                if index as usize >= vertex_count {
                    return Err(ExportError::IndexOutOfRange {
                        index,
                        vertices: vertex_count,
                    });
                }
            }
            triangles.push([tri[0], tri[1], tri[2]]);
        }

        Ok(TriangleMesh {
            vertices,
            triangles,
        })
    }

    /// Export as binary STL, `name` goes into the header.
    pub fn to_stl(&self, name: &str) -> Result<Vec<u8>, ExportError> {
        self.mesh()?.to_stl(name)
    }
}

/// Indexed triangle mesh extracted from a solid.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleMesh {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
}

impl TriangleMesh {
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    fn corners(&self, tri: &[u32; 3]) -> [Vec3; 3] {
        [
            self.vertices[tri[0] as usize],
            self.vertices[tri[1] as usize],
            self.vertices[tri[2] as usize],
        ]
    }

    /// Axis-aligned bounding box of the vertices referenced by triangles.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut iter = self.triangles.iter().flat_map(|tri| self.corners(tri));
        let first = iter.next()?;
        Some(iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p))))
    }

    /// Bounding box extent along X, Y and Z.
    pub fn size(&self) -> Vec3 {
        self.bounds()
            .map(|(min, max)| max - min)
            .unwrap_or(Vec3::ZERO)
    }

    /// Enclosed volume from signed tetrahedra (meaningful for closed meshes only).
    pub fn volume(&self) -> f64 {
        let sum: f64 = self
            .triangles
            .iter()
            .map(|tri| {
                let [a, b, c] = self.corners(tri);
                f64::from(a.dot(b.cross(c)))
            })
            .sum();
        (sum / 6.0).abs()
    }

    /// Serialize as binary STL.
    pub fn to_stl(&self, name: &str) -> Result<Vec<u8>, ExportError> {
        let count = u32::try_from(self.triangles.len())
            .map_err(|_| ExportError::TooManyTriangles(self.triangles.len()))?;

        let mut stl = Vec::with_capacity(STL_HEADER_LEN + 4 + self.triangles.len() * STL_TRIANGLE_LEN);

        // Header must not start with "solid", readers take that as ASCII STL
        let mut header = format!("binary STL {}", name).into_bytes();
        header.resize(STL_HEADER_LEN, 0);
        stl.extend_from_slice(&header);
        stl.extend_from_slice(&count.to_le_bytes());

        for tri in &self.triangles {
            let [p0, p1, p2] = self.corners(tri);
            let normal = (p1 - p0).cross(p2 - p0).normalize_or_zero();
            for v in [normal, p0, p1, p2] {
                stl.extend_from_slice(&v.x.to_le_bytes());
                stl.extend_from_slice(&v.y.to_le_bytes());
                stl.extend_from_slice(&v.z.to_le_bytes());
            }
            stl.extend_from_slice(&0u16.to_le_bytes());
        }

        Ok(stl)
    }
}
