//! # Frame Module
//!
//! Loading and storing one evaluation example as a set of PNG files.
//!
//! File encodings:
//! - `_image.png`: 8-bit RGB, mapped to `[0, 1]`
//! - `_mask.png`: 8-bit grayscale foreground probability, mapped to `[0, 1]`
//! - `_depth.png`: 16-bit grayscale whose samples are the bit patterns of
//!   IEEE 754 half floats
//! - `_depth_mask.png`: optional 8-bit grayscale depth validity mask

use crate::result_dir::with_postfix;
use crate::{Co3dError, DEPTH_MASK_POSTFIX, Result, ResultType};
use half::f16;
use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Rgb, Rgb32FImage, RgbImage};
use std::path::Path;

/// Single-channel floating point image.
pub type GrayF32Image = ImageBuffer<Luma<f32>, Vec<f32>>;

/// 16-bit single-channel image, the on-disk depth container.
type Gray16Image = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Image, foreground mask and depth of one view, all at one resolution.
#[derive(Debug, Clone)]
pub struct RgbdaFrame {
    image: Rgb32FImage,
    mask: GrayF32Image,
    depth: GrayF32Image,
    depth_mask: Option<GrayF32Image>,
}

impl RgbdaFrame {
    /// Assemble a frame, checking that every map has the image's resolution.
    pub fn new(
        image: Rgb32FImage,
        mask: GrayF32Image,
        depth: GrayF32Image,
        depth_mask: Option<GrayF32Image>,
    ) -> Result<Self> {
        let expected = image.dimensions();
        check_dimensions("mask", expected, mask.dimensions())?;
        check_dimensions("depth", expected, depth.dimensions())?;
        if let Some(depth_mask) = &depth_mask {
            check_dimensions("depth mask", expected, depth_mask.dimensions())?;
        }
        Ok(Self {
            image,
            mask,
            depth,
            depth_mask,
        })
    }

    /// A frame whose every pixel carries the same values.
    #[must_use]
    pub fn uniform(width: u32, height: u32, rgb: [f32; 3], mask: f32, depth: f32) -> Self {
        Self {
            image: Rgb32FImage::from_pixel(width, height, Rgb(rgb)),
            mask: GrayF32Image::from_pixel(width, height, Luma([mask])),
            depth: GrayF32Image::from_pixel(width, height, Luma([depth])),
            depth_mask: None,
        }
    }

    /// Width and height shared by all maps.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    #[must_use]
    pub fn image(&self) -> &Rgb32FImage {
        &self.image
    }

    #[must_use]
    pub fn mask(&self) -> &GrayF32Image {
        &self.mask
    }

    #[must_use]
    pub fn depth(&self) -> &GrayF32Image {
        &self.depth
    }

    #[must_use]
    pub fn depth_mask(&self) -> Option<&GrayF32Image> {
        self.depth_mask.as_ref()
    }

    pub fn mask_mut(&mut self) -> &mut GrayF32Image {
        &mut self.mask
    }

    pub fn depth_mut(&mut self) -> &mut GrayF32Image {
        &mut self.depth
    }
}

pub(crate) fn check_dimensions(what: &str, expected: (u32, u32), actual: (u32, u32)) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(Co3dError::DimensionMismatch {
            what: what.to_string(),
            expected,
            actual,
        })
    }
}

// =============================================================================
// LOADING
// =============================================================================

/// Load the example whose files share the prefix `root`.
///
/// The depth mask is loaded when `<root>_depth_mask.png` exists.
pub fn load_rgbda_frame(root: &Path) -> Result<RgbdaFrame> {
    let image_path = with_postfix(root, &ResultType::Image.postfix());
    let image = open_png(&image_path)?.to_rgb32f();

    let mask = load_mask(&with_postfix(root, &ResultType::Mask.postfix()))?;
    let depth = load_depth(&with_postfix(root, &ResultType::Depth.postfix()))?;

    let depth_mask_path = with_postfix(root, DEPTH_MASK_POSTFIX);
    let depth_mask = if depth_mask_path.is_file() {
        Some(load_mask(&depth_mask_path)?)
    } else {
        None
    };

    RgbdaFrame::new(image, mask, depth, depth_mask)
}

fn open_png(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|e| Co3dError::image(path, e))
}

fn load_mask(path: &Path) -> Result<GrayF32Image> {
    Ok(open_png(path)?.to_luma32f())
}

fn load_depth(path: &Path) -> Result<GrayF32Image> {
    match open_png(path)? {
        DynamicImage::ImageLuma16(raw) => Ok(GrayF32Image::from_fn(
            raw.width(),
            raw.height(),
            |x, y| Luma([f16::from_bits(raw.get_pixel(x, y).0[0]).to_f32()]),
        )),
        _ => Err(Co3dError::UnsupportedDepthFormat {
            path: path.to_path_buf(),
        }),
    }
}

// =============================================================================
// STORING
// =============================================================================

/// Write `frame` as `<root>_image.png`, `<root>_mask.png`, `<root>_depth.png`
/// and, when present, `<root>_depth_mask.png`.
pub fn store_rgbda_frame(frame: &RgbdaFrame, root: &Path) -> Result<()> {
    let (width, height) = frame.dimensions();

    let image = RgbImage::from_fn(width, height, |x, y| {
        let [r, g, b] = frame.image.get_pixel(x, y).0;
        Rgb([quantize(r), quantize(g), quantize(b)])
    });
    save(&image, &with_postfix(root, &ResultType::Image.postfix()))?;

    save(
        &quantize_gray(&frame.mask),
        &with_postfix(root, &ResultType::Mask.postfix()),
    )?;

    let depth = Gray16Image::from_fn(width, height, |x, y| {
        Luma([f16::from_f32(frame.depth.get_pixel(x, y).0[0]).to_bits()])
    });
    save(&depth, &with_postfix(root, &ResultType::Depth.postfix()))?;

    if let Some(depth_mask) = &frame.depth_mask {
        save(&quantize_gray(depth_mask), &with_postfix(root, DEPTH_MASK_POSTFIX))?;
    }

    Ok(())
}

fn quantize(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn quantize_gray(map: &GrayF32Image) -> GrayImage {
    GrayImage::from_fn(map.width(), map.height(), |x, y| {
        Luma([quantize(map.get_pixel(x, y).0[0])])
    })
}

fn save<P, C>(buffer: &ImageBuffer<P, C>, path: &Path) -> Result<()>
where
    P: image::PixelWithColorType,
    [P::Subpixel]: image::EncodableLayout,
    C: std::ops::Deref<Target = [P::Subpixel]>,
{
    buffer.save(path).map_err(|e| Co3dError::image(path, e))
}

// =============================================================================
// TESTS
// =============================================================================
