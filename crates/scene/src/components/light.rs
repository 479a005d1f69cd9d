use crate::components::Rgb;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Light {
    Ambient {
        color: Rgb,
    },
    /// Omnidirectional light at the entity's world position, fading to zero at `distance`.
    Point {
        color: Rgb,
        intensity: f32,
        distance: f32,
    },
}

impl Light {
    pub fn ambient(hex: u32) -> Self {
        Self::Ambient {
            color: Rgb::from_hex(hex),
        }
    }

    pub fn point(hex: u32, intensity: f32, distance: f32) -> Self {
        Self::Point {
            color: Rgb::from_hex(hex),
            intensity,
            distance,
        }
    }
}
