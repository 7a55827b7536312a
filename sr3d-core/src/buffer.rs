/// Color and depth render targets
use crate::color::Color;
use crate::texture::Texture;

/// RGB8 image, row-major with the top row first
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    width: usize,
    height: usize,
    bytes: Vec<u8>,
}

impl FrameBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            bytes: vec![0; width * height * 3],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn clear(&mut self, color: Color) {
        for pixel in self.bytes.chunks_exact_mut(3) {
            pixel.copy_from_slice(&color.to_array());
        }
    }

    fn offset(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.width && y < self.height).then(|| (y * self.width + x) * 3)
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Color> {
        let i = self.offset(x, y)?;
        Some(Color::new(self.bytes[i], self.bytes[i + 1], self.bytes[i + 2]))
    }

    /// Out-of-bounds writes are ignored
    pub fn set(&mut self, x: usize, y: usize, color: Color) {
        if let Some(i) = self.offset(x, y) {
            self.bytes[i..i + 3].copy_from_slice(&color.to_array());
        }
    }

    /// Fill the whole buffer with `image`, scaled by nearest sampling.
    ///
    /// An empty image leaves the buffer untouched.
    pub fn blit(&mut self, image: &Texture) {
        if image.is_empty() {
            return;
        }
        for y in 0..self.height {
            let src_y = (y * image.height()) / self.height.max(1);
            for x in 0..self.width {
                let src_x = (x * image.width()) / self.width.max(1);
                self.set(x, y, image.texel(src_x as i64, src_y as i64));
            }
        }
    }

    /// Raw pixels for a frame sink: RGB, row-major, top row first
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Per-pixel depth values; smaller is closer
#[derive(Debug, Clone)]
pub struct DepthBuffer {
    width: usize,
    height: usize,
    values: Vec<f32>,
}

impl DepthBuffer {
    /// Value of a pixel nothing has been drawn to
    pub const FAR: f32 = f32::MAX;

    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            values: vec![Self::FAR; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn clear(&mut self) {
        self.values.fill(Self::FAR);
    }

    fn index(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        self.index(x, y).map(|i| self.values[i])
    }

    /// Out-of-bounds writes are ignored
    pub fn set(&mut self, x: usize, y: usize, depth: f32) {
        if let Some(i) = self.index(x, y) {
            self.values[i] = depth;
        }
    }

    /// Lower the stored value to `depth` if that is closer; never raises it
    pub fn store_min(&mut self, x: usize, y: usize, depth: f32) {
        if let Some(i) = self.index(x, y) {
            self.values[i] = self.values[i].min(depth);
        }
    }

    /// Pixel lookup from fractional screen coordinates
    pub fn sample(&self, x: f32, y: f32) -> Option<f32> {
        if !(x >= 0.0 && y >= 0.0) {
            return None;
        }
        self.get(x as usize, y as usize)
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Number of pixels that received a depth
    pub fn covered(&self) -> usize {
        self.values.iter().filter(|&&v| v < Self::FAR).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_layout() {
        let mut frame = FrameBuffer::new(3, 2);
        frame.set(2, 1, Color::new(1, 2, 3));
        frame.set(5, 5, Color::WHITE);
        assert_eq!(&frame.as_bytes()[15..18], &[1, 2, 3]);
        assert_eq!(frame.get(2, 1), Some(Color::new(1, 2, 3)));
        assert_eq!(frame.get(3, 0), None);
    }

    #[test]
    fn test_blit_scales_nearest() {
        let image = Texture::from_texels(1, 2, vec![Color::WHITE, Color::BLACK]);
        let mut frame = FrameBuffer::new(4, 4);
        frame.clear(Color::new(9, 9, 9));
        frame.blit(&image);
        assert_eq!(frame.get(3, 1), Some(Color::WHITE));
        assert_eq!(frame.get(0, 2), Some(Color::BLACK));

        frame.blit(&Texture::from_texels(0, 3, vec![]));
        assert_eq!(frame.get(0, 2), Some(Color::BLACK));
    }

    #[test]
    fn test_store_min_never_raises() {
        let mut depth = DepthBuffer::new(2, 2);
        depth.store_min(1, 1, 10.0);
        depth.store_min(1, 1, 20.0);
        assert_eq!(depth.get(1, 1), Some(10.0));
        depth.store_min(1, 1, 5.0);
        assert_eq!(depth.get(1, 1), Some(5.0));
        assert_eq!(depth.covered(), 1);
        depth.clear();
        assert_eq!(depth.covered(), 0);
    }

    #[test]
    fn test_sample_rejects_negative_and_nan() {
        let depth = DepthBuffer::new(2, 2);
        assert_eq!(depth.sample(-0.5, 1.0), None);
        assert_eq!(depth.sample(f32::NAN, 1.0), None);
        assert_eq!(depth.sample(1.9, 0.2), Some(DepthBuffer::FAR));
    }
}
