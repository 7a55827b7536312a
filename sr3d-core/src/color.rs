/// 8-bit RGB color used by textures and the frame buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const WHITE: Self = Self::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Gray level, clamped to the displayable range
    pub fn gray(level: f32) -> Self {
        let v = level.clamp(0.0, 255.0) as u8;
        Self::new(v, v, v)
    }

    pub fn from_array(rgb: [u8; 3]) -> Self {
        Self::new(rgb[0], rgb[1], rgb[2])
    }

    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Perceived brightness in `[0, 1]`
    pub fn luminance(self) -> f32 {
        (0.2126 * self.r as f32 + 0.7152 * self.g as f32 + 0.0722 * self.b as f32) / 255.0
    }
}

impl From<[u8; 3]> for Color {
    fn from(rgb: [u8; 3]) -> Self {
        Self::from_array(rgb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gray_clamps() {
        assert_eq!(Color::gray(-5.0), Color::BLACK);
        assert_eq!(Color::gray(300.0), Color::WHITE);
        assert_eq!(Color::gray(127.9), Color::new(127, 127, 127));
    }

    #[test]
    fn test_luminance_range() {
        assert!(Color::BLACK.luminance().abs() < 1e-6);
        assert!((Color::WHITE.luminance() - 1.0).abs() < 1e-4);
    }
}
