//! CPU-side mesh generation.

/// Interleaved vertex: position, normal, texture coordinate.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Unit UV sphere. Scale it by the drawable radius in the world matrix.
///
/// The vertex at texture coordinate `(u, v)` lies at
/// `foundation::math::project(90 - 180 v, 360 u - 180, 1)`: `v = 0` is the
/// north pole (top row of an equirectangular image) and `u = 0.5` is the
/// prime meridian. Markers placed with `project` land on the matching texel.
#[derive(Debug, Clone, PartialEq)]
pub struct SphereMesh {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u16>,
}

impl SphereMesh {
    /// Grids beyond this size overflow `u16` indices.
    pub const MAX_SEGMENTS: u32 = 254;

    pub fn generate(width_segments: u32, height_segments: u32) -> Self {
        let w = width_segments.clamp(3, Self::MAX_SEGMENTS);
        let h = height_segments.clamp(2, Self::MAX_SEGMENTS);

        let mut vertices = Vec::with_capacity(((w + 1) * (h + 1)) as usize);
        for iy in 0..=h {
            let v = iy as f64 / h as f64;
            let (sin_t, cos_t) = (v * std::f64::consts::PI).sin_cos();
            for ix in 0..=w {
                let u = ix as f64 / w as f64;
                let (sin_p, cos_p) = (u * std::f64::consts::TAU).sin_cos();

                let p = [
                    (-cos_p * sin_t) as f32,
                    cos_t as f32,
                    (sin_p * sin_t) as f32,
                ];
                vertices.push(MeshVertex {
                    position: p,
                    normal: p,
                    uv: [u as f32, v as f32],
                });
            }
        }

        // Counter-clockwise seen from outside; the pole rows collapse to one triangle per quad.
        let stride = w + 1;
        let mut indices = Vec::with_capacity((w * (2 * h - 2) * 3) as usize);
        for iy in 0..h {
            for ix in 0..w {
                let a = (iy * stride + ix + 1) as u16;
                let b = (iy * stride + ix) as u16;
                let c = ((iy + 1) * stride + ix) as u16;
                let d = ((iy + 1) * stride + ix + 1) as u16;

                if iy != 0 {
                    indices.extend_from_slice(&[a, b, d]);
                }
                if iy != h - 1 {
                    indices.extend_from_slice(&[b, c, d]);
                }
            }
        }

        Self { vertices, indices }
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}
