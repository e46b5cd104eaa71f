//! Colours and frame-rate independent colour smoothing.
//!
//! Colours are stored in linear RGB, which is the space lighting and
//! interpolation happen in. Hex strings from a config are treated as sRGB,
//! the way they are written in a stylesheet, and converted on parse.
//!
//! [`ColorAnimator`] eases a displayed colour toward a target colour with
//! exponential smoothing:
//!
//! ```text
//! current += (target - current) * (1 - exp(-dt / smooth_time))
//! ```
//!
//! Because `exp(-a) * exp(-b) == exp(-(a + b))`, running two frames of `dt`
//! lands exactly where one frame of `2 * dt` would, so the visible easing
//! speed does not depend on the frame rate.

use glam::Vec3;

use crate::error::ConfigError;

/// Default smoothing time constant for connector colours, in seconds.
pub const DEFAULT_SMOOTH_TIME: f32 = 0.2;

/// A linear RGB colour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);

    /// A colour from linear components.
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// A colour from sRGB-encoded components in `[0, 1]`.
    pub fn from_srgb(r: f32, g: f32, b: f32) -> Self {
        Self {
            r: srgb_to_linear(r),
            g: srgb_to_linear(g),
            b: srgb_to_linear(b),
        }
    }

    /// Parse `#rrggbb`, `#rgb` or one of a few CSS colour names.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let trimmed = s.trim();
        let named = match trimmed.to_ascii_lowercase().as_str() {
            "white" => Some("#ffffff"),
            "black" => Some("#000000"),
            "red" => Some("#ff0000"),
            "green" => Some("#008000"),
            "blue" => Some("#0000ff"),
            _ => None,
        };
        let hex = named
            .unwrap_or(trimmed)
            .strip_prefix('#')
            .ok_or_else(|| ConfigError::InvalidColor(s.to_string()))?;

        let channel = |digits: &str| {
            u8::from_str_radix(digits, 16).map_err(|_| ConfigError::InvalidColor(s.to_string()))
        };

        let (r, g, b) = match hex.len() {
            6 if hex.is_ascii() => (channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?),
            3 if hex.is_ascii() => {
                // #abc is shorthand for #aabbcc
                let r = channel(&hex[0..1])?;
                let g = channel(&hex[1..2])?;
                let b = channel(&hex[2..3])?;
                (r * 17, g * 17, b * 17)
            }
            _ => return Err(ConfigError::InvalidColor(s.to_string())),
        };

        Ok(Self::from_srgb(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
        ))
    }

    /// sRGB-encoded components.
    pub fn to_srgb(self) -> [f32; 3] {
        [
            linear_to_srgb(self.r),
            linear_to_srgb(self.g),
            linear_to_srgb(self.b),
        ]
    }

    #[inline]
    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    #[inline]
    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.r, self.g, self.b)
    }

    #[inline]
    pub fn from_vec3(v: Vec3) -> Self {
        Self::rgb(v.x, v.y, v.z)
    }

    /// Largest per-channel distance to `other`.
    pub fn max_difference(self, other: Color) -> f32 {
        (self.to_vec3() - other.to_vec3()).abs().max_element()
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// Fraction of the remaining distance covered in `dt` seconds.
///
/// Zero for `dt <= 0`; one for a non-positive smoothing time (snap).
#[inline]
pub fn damp_factor(smooth_time: f32, dt: f32) -> f32 {
    if dt <= 0.0 {
        0.0
    } else if smooth_time <= 0.0 {
        1.0
    } else {
        1.0 - (-dt / smooth_time).exp()
    }
}

/// Exponentially smooth one value toward `target`.
#[inline]
pub fn damp(current: f32, target: f32, smooth_time: f32, dt: f32) -> f32 {
    current + (target - current) * damp_factor(smooth_time, dt)
}

/// Eases a mesh's displayed colour toward its configured colour.
#[derive(Debug, Clone)]
pub struct ColorAnimator {
    current: Color,
    target: Color,
    smooth_time: f32,
}

impl ColorAnimator {
    pub fn new(current: Color, target: Color, smooth_time: f32) -> Self {
        Self {
            current,
            target,
            smooth_time,
        }
    }

    /// An animator that already shows its target.
    pub fn settled(target: Color) -> Self {
        Self::new(target, target, DEFAULT_SMOOTH_TIME)
    }

    #[inline]
    pub fn current(&self) -> Color {
        self.current
    }

    #[inline]
    pub fn target(&self) -> Color {
        self.target
    }

    #[inline]
    pub fn smooth_time(&self) -> f32 {
        self.smooth_time
    }

    pub fn set_target(&mut self, target: Color) {
        self.target = target;
    }

    /// Jump straight to `color` without easing.
    pub fn snap_to(&mut self, color: Color) {
        self.current = color;
    }

    /// Advance by one frame of `dt` seconds and return the new colour.
    pub fn update(&mut self, dt: f32) -> Color {
        let t = damp_factor(self.smooth_time, dt);
        let current = self.current.to_vec3();
        let target = self.target.to_vec3();
        self.current = Color::from_vec3(current + (target - current) * t);
        self.current
    }
}
