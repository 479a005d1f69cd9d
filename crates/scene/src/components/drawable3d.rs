use crate::components::Material;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Shape3D {
    /// UV sphere centred on the entity origin.
    Sphere {
        radius: f64,
        width_segments: u32,
        height_segments: u32,
    },
    /// Axis-aligned cube of edge `size`.
    Box { size: f64 },
    /// Camera-facing quad.
    Sprite { width: f64, height: f64 },
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Drawable3D {
    pub shape: Shape3D,
    pub material: Material,
}

impl Drawable3D {
    pub fn sphere(radius: f64, segments: u32, material: Material) -> Self {
        Self {
            shape: Shape3D::Sphere {
                radius,
                width_segments: segments,
                height_segments: segments,
            },
            material,
        }
    }

    pub fn cube(size: f64, material: Material) -> Self {
        Self {
            shape: Shape3D::Box { size },
            material,
        }
    }

    pub fn sprite(width: f64, height: f64, material: Material) -> Self {
        Self {
            shape: Shape3D::Sprite { width, height },
            material,
        }
    }

    /// Radius of the bounding sphere in local units.
    pub fn bounding_radius(&self) -> f64 {
        match self.shape {
            Shape3D::Sphere { radius, .. } => radius,
            Shape3D::Box { size } => size * 0.5 * 3f64.sqrt(),
            Shape3D::Sprite { width, height } => 0.5 * width.hypot(height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Drawable3D, Shape3D};
    use crate::components::{Material, Rgb};

    #[test]
    fn create_sphere_drawable() {
        let drawable = Drawable3D::sphere(1.5, 16, Material::basic(Rgb::WHITE));
        assert!(matches!(
            drawable.shape,
            Shape3D::Sphere {
                width_segments: 16,
                height_segments: 16,
                ..
            }
        ));
        assert_eq!(drawable.bounding_radius(), 1.5);
    }
}
