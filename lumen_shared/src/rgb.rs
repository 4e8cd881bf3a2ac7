use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// Color of a single LED. Component arithmetic saturates to the 8-bit range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Builds a color from float components, clamping each to [0, 255] before
/// truncating toward zero.
pub fn rgb_from_float(r: f32, g: f32, b: f32) -> Rgb {
    fn component(value: f32) -> u8 {
        if value <= 0.0 {
            0
        } else if value >= 255.0 {
            255
        } else {
            value as u8
        }
    }

    Rgb {
        r: component(r),
        g: component(g),
        b: component(b),
    }
}

impl Add for Rgb {
    type Output = Rgb;

    fn add(self, other: Rgb) -> Rgb {
        Rgb {
            r: self.r.saturating_add(other.r),
            g: self.g.saturating_add(other.g),
            b: self.b.saturating_add(other.b),
        }
    }
}

impl AddAssign for Rgb {
    fn add_assign(&mut self, other: Rgb) {
        *self = *self + other;
    }
}

impl Sub for Rgb {
    type Output = Rgb;

    fn sub(self, other: Rgb) -> Rgb {
        Rgb {
            r: self.r.saturating_sub(other.r),
            g: self.g.saturating_sub(other.g),
            b: self.b.saturating_sub(other.b),
        }
    }
}

impl SubAssign for Rgb {
    fn sub_assign(&mut self, other: Rgb) {
        *self = *self - other;
    }
}

impl Mul<f32> for Rgb {
    type Output = Rgb;

    fn mul(self, factor: f32) -> Rgb {
        rgb_from_float(
            f32::from(self.r) * factor,
            f32::from(self.g) * factor,
            f32::from(self.b) * factor,
        )
    }
}

impl Mul<Rgb> for f32 {
    type Output = Rgb;

    fn mul(self, color: Rgb) -> Rgb {
        color * self
    }
}

/// A run of LEDs, indexed from 0.
pub type RgbStrip = Vec<Rgb>;
