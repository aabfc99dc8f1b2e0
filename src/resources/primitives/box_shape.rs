use glam::{Vec2, Vec3};

use crate::resources::geometry::Geometry;

/// One face of the box: outward normal, four corners on the unit cube
/// (counter-clockwise seen from outside) and their texture coordinates.
struct Face {
    normal: Vec3,
    corners: [Vec3; 4],
    uvs: [Vec2; 4],
}

const FACES: [Face; 6] = [
    // Front (+Z)
    Face {
        normal: Vec3::Z,
        corners: [
            Vec3::new(-1.0, -1.0, 1.0),
            Vec3::new(1.0, -1.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(-1.0, 1.0, 1.0),
        ],
        uvs: [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0), Vec2::new(0.0, 1.0)],
    },
    // Back (-Z)
    Face {
        normal: Vec3::NEG_Z,
        corners: [
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(-1.0, 1.0, -1.0),
            Vec3::new(1.0, 1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
        ],
        uvs: [Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0), Vec2::new(0.0, 1.0), Vec2::new(0.0, 0.0)],
    },
    // Top (+Y)
    Face {
        normal: Vec3::Y,
        corners: [
            Vec3::new(-1.0, 1.0, -1.0),
            Vec3::new(-1.0, 1.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(1.0, 1.0, -1.0),
        ],
        uvs: [Vec2::new(0.0, 1.0), Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0)],
    },
    // Bottom (-Y)
    Face {
        normal: Vec3::NEG_Y,
        corners: [
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, 1.0),
            Vec3::new(-1.0, -1.0, 1.0),
        ],
        uvs: [Vec2::new(1.0, 1.0), Vec2::new(0.0, 1.0), Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0)],
    },
    // Right (+X)
    Face {
        normal: Vec3::X,
        corners: [
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(1.0, 1.0, -1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(1.0, -1.0, 1.0),
        ],
        uvs: [Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0), Vec2::new(0.0, 1.0), Vec2::new(0.0, 0.0)],
    },
    // Left (-X)
    Face {
        normal: Vec3::NEG_X,
        corners: [
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(-1.0, -1.0, 1.0),
            Vec3::new(-1.0, 1.0, 1.0),
            Vec3::new(-1.0, 1.0, -1.0),
        ],
        uvs: [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0), Vec2::new(0.0, 1.0)],
    },
];

/// Axis-aligned box centered on the origin.
///
/// Vertices are not shared between faces so each face keeps its own normal:
/// 24 vertices and 36 indices (two triangles per face, CCW outward).
#[must_use]
pub fn create_box(width: f32, height: f32, depth: f32) -> Geometry {
    let half = Vec3::new(width, height, depth) * 0.5;

    let mut positions = Vec::with_capacity(24 * 3);
    let mut normals = Vec::with_capacity(24 * 3);
    let mut uvs = Vec::with_capacity(24 * 2);
    let mut indices = Vec::with_capacity(36);

    for (face_index, face) in FACES.iter().enumerate() {
        let base = face_index as u32 * 4;
        for (corner, uv) in face.corners.iter().zip(face.uvs) {
            positions.extend_from_slice(&(*corner * half).to_array());
            normals.extend_from_slice(&face.normal.to_array());
            uvs.extend_from_slice(&uv.to_array());
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    Geometry::from_trusted(positions, normals, uvs, indices)
}
