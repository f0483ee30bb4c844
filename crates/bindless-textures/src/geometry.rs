//! Tetrahedron geometry with a per-face texture selector.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

/// Vertex layout shared with `shaders/bindless.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub tex_coord: [f32; 2],
    /// Index into the texture handle array.
    pub side: i32,
}

impl Vertex {
    const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x2, // tex_coord
        2 => Sint32     // side
    ];

    fn new(position: Vec3, tex_coord: Vec2, side: i32) -> Self {
        Self {
            position: position.to_array(),
            tex_coord: tex_coord.to_array(),
            side,
        }
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Base triangle on the unit circle in the XZ plane plus the apex.
pub fn tetrahedron_points() -> [Vec3; 4] {
    let base = |degrees: f32| {
        let r = degrees.to_radians();
        Vec3::new(r.sin(), 0.0, r.cos())
    };
    let apex = (2.0 / 30f32.to_radians().cos() - 1.0).abs();

    [base(0.0), base(120.0), base(240.0), Vec3::new(0.0, apex, 0.0)]
}

/// The tetrahedron as a six-vertex triangle strip.
///
/// Each strip triangle takes its face index from its last vertex.
pub fn tetrahedron_strip() -> [Vertex; 6] {
    let p = tetrahedron_points();
    [
        Vertex::new(p[0], Vec2::new(0.0, 0.0), 0),
        Vertex::new(p[1], Vec2::new(1.0, 0.0), 0),
        Vertex::new(p[3], Vec2::new(0.5, 1.0), 0),
        Vertex::new(p[2], Vec2::new(0.0, 0.0), 1),
        Vertex::new(p[0], Vec2::new(1.0, 0.0), 2),
        Vertex::new(p[1], Vec2::new(0.5, 1.0), 3),
    ]
}

/// Expands a triangle strip into a list with the same winding.
///
/// Flat attributes come from the first vertex of a list triangle, so every
/// emitted vertex carries the `side` of the strip triangle's last vertex.
pub fn strip_to_list(strip: &[Vertex]) -> Vec<Vertex> {
    let triangles = strip.len().saturating_sub(2);
    let mut list = Vec::with_capacity(triangles * 3);

    for i in 0..triangles {
        let side = strip[i + 2].side;
        // Odd strip triangles are wound the other way round.
        let (a, b) = if i % 2 == 0 { (i, i + 1) } else { (i + 1, i) };
        for k in [a, b, i + 2] {
            list.push(Vertex { side, ..strip[k] });
        }
    }
    list
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangles(list: &[Vertex]) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        list.chunks_exact(3)
            .map(|t| [t[0], t[1], t[2]].map(|v| Vec3::from_array(v.position)))
    }

    #[test]
    fn points_form_a_regular_base() {
        let p = tetrahedron_points();
        let edge = p[0].distance(p[1]);
        assert!((p[1].distance(p[2]) - edge).abs() < 1e-5);
        assert!((p[2].distance(p[0]) - edge).abs() < 1e-5);
        assert!(p[3].y > 0.0);
    }

    #[test]
    fn strip_selects_faces_zero_to_three() {
        let sides: Vec<i32> = tetrahedron_strip().iter().map(|v| v.side).collect();
        assert_eq!(sides, [0, 0, 0, 1, 2, 3]);
    }

    #[test]
    fn list_has_one_uniform_side_per_triangle() {
        let list = strip_to_list(&tetrahedron_strip());
        assert_eq!(list.len(), 12);

        let sides: Vec<i32> = list
            .chunks_exact(3)
            .map(|t| {
                assert!(t.iter().all(|v| v.side == t[0].side));
                t[0].side
            })
            .collect();
        assert_eq!(sides, [0, 1, 2, 3]);
    }

    #[test]
    fn every_face_points_outward() {
        let p = tetrahedron_points();
        let center = (p[0] + p[1] + p[2] + p[3]) / 4.0;

        for [a, b, c] in triangles(&strip_to_list(&tetrahedron_strip())) {
            let normal = (b - a).cross(c - a);
            let face_center = (a + b + c) / 3.0;
            assert!(normal.dot(face_center - center) > 0.0);
        }
    }

    #[test]
    fn short_strips_produce_nothing() {
        let strip = tetrahedron_strip();
        assert!(strip_to_list(&strip[..2]).is_empty());
        assert!(strip_to_list(&[]).is_empty());
    }
}
