use image::DynamicImage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("image buffer is empty")]
    Empty,

    #[error("failed to decode image: {0}")]
    Codec(#[from] image::ImageError),

    #[error("invalid geometry {width}x{height}x{channels} for {len} samples")]
    Geometry {
        width: u32,
        height: u32,
        channels: u8,
        len: usize,
    },
}

/// Decoded pixel grid: row-major, channel-interleaved 8-bit samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    width: u32,
    height: u32,
    channels: u8,
    samples: Vec<u8>,
}

impl RawImage {
    /// Build a grid, rejecting zero geometry and any sample count that is not
    /// exactly `width * height * channels`.
    pub fn new(width: u32, height: u32, channels: u8, samples: Vec<u8>) -> Result<Self, DecodeError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(channels as usize));
        if !matches!(expected, Some(n) if n != 0 && n == samples.len()) {
            return Err(DecodeError::Geometry {
                width,
                height,
                channels,
                len: samples.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            samples,
        })
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

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    /// Number of samples, always `width * height * channels`.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn geometry(&self) -> (u32, u32, u8) {
        (self.width, self.height, self.channels)
    }
}

/// Decode an encoded image (any format `image` recognises) into a raw grid.
pub fn decode(bytes: &[u8]) -> Result<RawImage, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    let img = image::load_from_memory(bytes)?;
    log::debug!(
        "decoded image: width={} height={} color={:?} len={}",
        img.width(),
        img.height(),
        img.color(),
        bytes.len()
    );
    from_dynamic(img)
}

/// Flatten a `DynamicImage` to 8-bit samples, keeping its channel count.
pub fn from_dynamic(img: DynamicImage) -> Result<RawImage, DecodeError> {
    let (width, height) = (img.width(), img.height());
    let (channels, samples) = match img {
        DynamicImage::ImageLuma8(buf) => (1, buf.into_raw()),
        DynamicImage::ImageLumaA8(buf) => (2, buf.into_raw()),
        DynamicImage::ImageRgb8(buf) => (3, buf.into_raw()),
        DynamicImage::ImageRgba8(buf) => (4, buf.into_raw()),
        // 16-bit and float layouts
        other => match other.color().channel_count() {
            1 => (1, other.to_luma8().into_raw()),
            2 => (2, other.to_luma_alpha8().into_raw()),
            3 => (3, other.to_rgb8().into_raw()),
            _ => (4, other.to_rgba8().into_raw()),
        },
    };
    RawImage::new(width, height, channels, samples)
}
