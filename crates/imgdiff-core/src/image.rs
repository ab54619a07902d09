use crate::error::{DiffError, Result};

/// Bytes per RGBA pixel.
pub const CHANNELS: usize = 4;

fn expected_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * CHANNELS
}

fn check_buffer(data_len: usize, width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(DiffError::InvalidDimensions { width, height });
    }
    let expected = expected_len(width, height);
    if data_len != expected {
        return Err(DiffError::InvalidBuffer {
            expected,
            actual: data_len,
        });
    }
    Ok(())
}

/// Borrowed RGBA8 image. Construction validates the buffer length, so every
/// engine can index pixels without further checks.
#[derive(Clone, Copy, Debug)]
pub struct ImageRef<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
}

impl<'a> ImageRef<'a> {
    pub fn new(data: &'a [u8], width: u32, height: u32) -> Result<Self> {
        check_buffer(data.len(), width, height)?;
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Packed pixel at linear index, `R | G << 8 | B << 16 | A << 24`.
    #[inline(always)]
    pub fn pixel(&self, index: usize) -> u32 {
        let p = index * CHANNELS;
        u32::from_le_bytes([
            self.data[p],
            self.data[p + 1],
            self.data[p + 2],
            self.data[p + 3],
        ])
    }

    #[inline(always)]
    pub fn pixel_xy(&self, x: u32, y: u32) -> u32 {
        self.pixel(y as usize * self.width as usize + x as usize)
    }

    /// Raw bytes of row `y`, columns `[x0, x1)`.
    #[inline]
    pub(crate) fn row_span(&self, y: u32, x0: u32, x1: u32) -> &'a [u8] {
        let row = y as usize * self.width as usize;
        &self.data[(row + x0 as usize) * CHANNELS..(row + x1 as usize) * CHANNELS]
    }
}

/// Score engines treat a size change as an error.
pub(crate) fn layout_check(a: ImageRef<'_>, b: ImageRef<'_>) -> Result<()> {
    if a.dimensions() != b.dimensions() {
        let (left_w, left_h) = a.dimensions();
        let (right_w, right_h) = b.dimensions();
        return Err(DiffError::LayoutMismatch {
            left_w,
            left_h,
            right_w,
            right_h,
        });
    }
    Ok(())
}

/// Owned RGBA8 image, used for rendered diff output and by decoders.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl Image {
    /// Fully transparent black image.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        check_buffer(expected_len(width, height), width, height)?;
        Ok(Self {
            data: vec![0; expected_len(width, height)],
            width,
            height,
        })
    }

    pub fn from_raw(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        check_buffer(data.len(), width, height)?;
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Image filled with one RGBA color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self> {
        let mut image = Self::new(width, height)?;
        for px in image.data.chunks_exact_mut(CHANNELS) {
            px.copy_from_slice(&rgba);
        }
        Ok(image)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    pub fn as_view(&self) -> ImageRef<'_> {
        ImageRef {
            data: &self.data,
            width: self.width,
            height: self.height,
        }
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let p = (y as usize * self.width as usize + x as usize) * CHANNELS;
        self.data[p..p + CHANNELS].copy_from_slice(&rgba);
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let p = (y as usize * self.width as usize + x as usize) * CHANNELS;
        [
            self.data[p],
            self.data[p + 1],
            self.data[p + 2],
            self.data[p + 3],
        ]
    }
}

#[inline(always)]
pub fn pack_rgba(r: u8, g: u8, b: u8, a: u8) -> u32 {
    u32::from_le_bytes([r, g, b, a])
}

#[inline(always)]
pub fn unpack_rgba(pixel: u32) -> [u8; 4] {
    pixel.to_le_bytes()
}
