use std::collections::{BTreeSet, HashMap};
use std::f32::consts::PI;

use glam::Vec3;
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::models::{LineVertex, MeshVertex};

pub struct IndexedMesh {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u16>,
}

/// UV 球体，位于原点
pub fn uv_sphere(radius: f32, width_segments: u32, height_segments: u32) -> IndexedMesh {
    let width_segments = width_segments.max(3);
    let height_segments = height_segments.max(2);
    let mut vertices = Vec::with_capacity(((width_segments + 1) * (height_segments + 1)) as usize);

    for y in 0..=height_segments {
        let v = y as f32 / height_segments as f32;
        let phi = v * PI;
        for x in 0..=width_segments {
            let u = x as f32 / width_segments as f32;
            let theta = u * 2.0 * PI;
            let normal = Vec3::new(-theta.cos() * phi.sin(), phi.cos(), theta.sin() * phi.sin());
            vertices.push(MeshVertex {
                position: (normal * radius).to_array(),
                normal: normal.to_array(),
            });
        }
    }

    let stride = width_segments + 1;
    let mut indices = Vec::with_capacity((width_segments * height_segments * 6) as usize);
    for y in 0..height_segments {
        for x in 0..width_segments {
            let a = (y * stride + x + 1) as u16;
            let b = (y * stride + x) as u16;
            let c = ((y + 1) * stride + x) as u16;
            let d = ((y + 1) * stride + x + 1) as u16;
            // 两极退化的三角形跳过
            if y != 0 {
                indices.extend_from_slice(&[a, b, d]);
            }
            if y != height_segments - 1 {
                indices.extend_from_slice(&[b, c, d]);
            }
        }
    }

    IndexedMesh { vertices, indices }
}

fn icosahedron_base() -> ([Vec3; 12], [[usize; 3]; 20]) {
    let t = (1.0 + 5.0f32.sqrt()) / 2.0;
    let v = [
        Vec3::new(-1.0, t, 0.0), Vec3::new(1.0, t, 0.0), Vec3::new(-1.0, -t, 0.0), Vec3::new(1.0, -t, 0.0),
        Vec3::new(0.0, -1.0, t), Vec3::new(0.0, 1.0, t), Vec3::new(0.0, -1.0, -t), Vec3::new(0.0, 1.0, -t),
        Vec3::new(t, 0.0, -1.0), Vec3::new(t, 0.0, 1.0), Vec3::new(-t, 0.0, -1.0), Vec3::new(-t, 0.0, 1.0),
    ];
    let f = [
        [0, 11, 5], [0, 5, 1], [0, 1, 7], [0, 7, 10], [0, 10, 11],
        [1, 5, 9], [5, 11, 4], [11, 10, 2], [10, 7, 6], [7, 1, 8],
        [3, 9, 4], [3, 4, 2], [3, 2, 6], [3, 6, 8], [3, 8, 9],
        [4, 9, 5], [2, 4, 11], [6, 2, 10], [8, 6, 7], [9, 8, 1],
    ];
    (v, f)
}

/// Wireframe edges of a geodesic icosahedron. `detail` subdivides each
/// edge into `detail + 1` segments; vertices are pushed out to `radius`.
pub fn icosahedron_wireframe(radius: f32, detail: u32, color: [f32; 4]) -> Vec<LineVertex> {
    let (base, faces) = icosahedron_base();
    let n = detail + 1;

    let mut positions: Vec<Vec3> = Vec::new();
    let mut lookup: HashMap<[i32; 3], usize> = HashMap::new();
    let mut index_of = |p: Vec3| -> usize {
        let p = p.normalize() * radius;
        let key = [
            (p.x * 1e4).round() as i32,
            (p.y * 1e4).round() as i32,
            (p.z * 1e4).round() as i32,
        ];
        *lookup.entry(key).or_insert_with(|| {
            positions.push(p);
            positions.len() - 1
        })
    };

    let mut edges: BTreeSet<(usize, usize)> = BTreeSet::new();
    let mut add_edge = |a: usize, b: usize| {
        if a != b {
            edges.insert((a.min(b), a.max(b)));
        }
    };

    for [ia, ib, ic] in faces {
        let (a, b, c) = (base[ia], base[ib], base[ic]);
        // 三角形内的网格点 (i, j)：i 沿 a->b，j 沿 a->c
        let point = |i: u32, j: u32| a + (b - a) * (i as f32 / n as f32) + (c - a) * (j as f32 / n as f32);
        for i in 0..n {
            for j in 0..(n - i) {
                let p0 = index_of(point(i, j));
                let p1 = index_of(point(i + 1, j));
                let p2 = index_of(point(i, j + 1));
                add_edge(p0, p1);
                add_edge(p1, p2);
                add_edge(p2, p0);
                if i + j + 1 < n {
                    let p3 = index_of(point(i + 1, j + 1));
                    add_edge(p1, p3);
                    add_edge(p3, p2);
                }
            }
        }
    }

    edges
        .into_iter()
        .flat_map(|(a, b)| {
            [
                LineVertex { position: positions[a].to_array(), color },
                LineVertex { position: positions[b].to_array(), color },
            ]
        })
        .collect()
}

/// `count` 个均匀分布在边长为 `spread` 的立方体中的点
pub fn star_field(count: usize, spread: f32, seed: u64, color: [f32; 4]) -> Vec<LineVertex> {
    let mut rng = StdRng::seed_from_u64(seed);
    let half = spread / 2.0;
    (0..count)
        .map(|_| LineVertex {
            position: [
                rng.random_range(-half..half),
                rng.random_range(-half..half),
                rng.random_range(-half..half),
            ],
            color,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_vertices_on_surface() {
        let mesh = uv_sphere(0.8, 32, 32);
        assert_eq!(mesh.vertices.len(), 33 * 33);
        assert_eq!(mesh.indices.len() % 3, 0);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
        for v in &mesh.vertices {
            assert!((Vec3::from_array(v.position).length() - 0.8).abs() < 1e-4);
        }
    }

    #[test]
    fn icosahedron_edge_counts() {
        let color = [1.0; 4];
        // 20 个面，30 条边
        assert_eq!(icosahedron_wireframe(4.0, 0, color).len(), 30 * 2);
        // detail 1：每个面 4 个三角形，共 120 条边
        let lines = icosahedron_wireframe(4.0, 1, color);
        assert_eq!(lines.len(), 120 * 2);
        for v in &lines {
            assert!((Vec3::from_array(v.position).length() - 4.0).abs() < 1e-4);
        }
    }

    #[test]
    fn star_field_is_bounded_and_seeded() {
        let a = star_field(500, 120.0, 7, [1.0; 4]);
        let b = star_field(500, 120.0, 7, [1.0; 4]);
        assert_eq!(a.len(), 500);
        assert!(a.iter().zip(&b).all(|(x, y)| x.position == y.position));
        assert!(a.iter().all(|v| v.position.iter().all(|c| c.abs() <= 60.0)));
    }
}
