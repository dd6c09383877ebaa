use ndarray::{ArrayView3, ArrayViewMut3};

/// A single captured frame: contiguous RGB bytes in row-major order.
///
/// Pixel format conversion happens at the capture and display boundaries;
/// everything in between sees packed RGB.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    /// A black RGB frame, mostly useful for tests and placeholders.
    pub fn blank(width: u32, height: u32, index: usize) -> Self {
        Self::new(
            vec![0u8; width as usize * height as usize * 3],
            width,
            height,
            3,
            index,
        )
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Capture order of this frame, starting at 0.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        ArrayViewMut3::from_shape(self.shape(), &mut self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Returns a copy resized by `factor` on both axes using bilinear filtering.
    ///
    /// Output dimensions are rounded and never drop below one pixel.
    pub fn scaled(&self, factor: f64) -> Result<Frame, Box<dyn std::error::Error>> {
        if !(factor > 0.0) {
            return Err(format!("scale factor must be positive, got {factor}").into());
        }
        if self.channels != 3 {
            return Err(format!("cannot scale {}-channel frame", self.channels).into());
        }
        let (w, h) = scaled_size(self.width, self.height, factor);
        if (w, h) == (self.width, self.height) {
            return Ok(self.clone());
        }

        let img = image::RgbImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or("Failed to create image from frame data")?;
        let resized = image::imageops::resize(&img, w, h, image::imageops::FilterType::Triangle);
        Ok(Frame::new(resized.into_raw(), w, h, 3, self.index))
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

fn scaled_size(width: u32, height: u32, factor: f64) -> (u32, u32) {
    let w = (width as f64 * factor).round().max(1.0) as u32;
    let h = (height as f64 * factor).round().max(1.0) as u32;
    (w, h)
}
