/// RGB textures sampled with nearest-texel lookup
use std::path::Path;

use image::RgbImage;
use nalgebra::Point2;

use crate::color::Color;
use crate::error::MeshError;

#[derive(Debug, Clone)]
pub struct Texture {
    width: usize,
    height: usize,
    texels: Vec<Color>,
}

impl Texture {
    /// Texture from row-major texels, top row first
    pub fn from_texels(width: usize, height: usize, texels: Vec<Color>) -> Self {
        assert_eq!(texels.len(), width * height, "texel count must match dimensions");
        Self {
            width,
            height,
            texels,
        }
    }

    pub fn solid(color: Color) -> Self {
        Self::from_texels(1, 1, vec![color])
    }

    pub fn from_image(image: &RgbImage) -> Self {
        let texels = image.pixels().map(|p| Color::from_array(p.0)).collect();
        Self::from_texels(image.width() as usize, image.height() as usize, texels)
    }

    /// Decode any image format enabled on the `image` crate
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MeshError> {
        let path = path.as_ref();
        let decoded = image::open(path).map_err(|source| MeshError::Image {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_image(&decoded.to_rgb8()))
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// True for a zero-width or zero-height texture
    pub fn is_empty(&self) -> bool {
        self.texels.is_empty()
    }

    /// Texel at integer coordinates, clamped to the edges; black when empty
    pub fn texel(&self, x: i64, y: i64) -> Color {
        if self.is_empty() {
            return Color::BLACK;
        }
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        self.texels[y * self.width + x]
    }

    /// Nearest sample at normalized UV; `v = 0` is the bottom row
    pub fn sample(&self, uv: Point2<f32>) -> Color {
        let x = (uv.x * self.width as f32).floor() as i64;
        let y = ((1.0 - uv.y) * self.height as f32).floor() as i64;
        self.texel(x, y)
    }
}
