//! Noise classification for the lossless-vs-lossy decision.
//!
//! A Laplacian high-pass over the luma plane measures edge energy: the
//! share of pixels with any response at all. Flat artwork (screenshots,
//! line art, renders) stays mostly zero and compresses better losslessly;
//! photographic noise lights up almost every pixel.

use image::DynamicImage;

/// Noise classification of a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Noisiness {
    /// Low edge energy; a lossless encode is worth attempting first.
    Noiseless,
    /// Photographic content; go straight to the lossy search.
    Noisy,
}

/// Edge-energy ratio of the image, in `0.0..=1.0`.
///
/// 0 means every pixel had zero response to the Laplacian kernel.
pub fn noise_ratio(img: &DynamicImage) -> f64 {
    let luma = img.to_luma8();
    let (width, height) = (luma.width(), luma.height());
    if width == 0 || height == 0 {
        return 0.0;
    }

    #[rustfmt::skip]
    let kernel: [f32; 9] = [
        0.0, -1.0, 0.0,
        -1.0, 4.0, -1.0,
        0.0, -1.0, 0.0,
    ];
    let filtered = image::imageops::filter3x3(&luma, &kernel);

    let zero_pixels = filtered.pixels().filter(|p| p.0[0] == 0).count();
    let pixels = (width as u64 * height as u64) as f64;
    1.0 - zero_pixels as f64 / pixels
}

/// Classify an image against the noise threshold.
pub fn noise_detection(img: &DynamicImage, threshold: f64) -> Noisiness {
    let ratio = noise_ratio(img);
    tracing::debug!("noise ratio: {}", ratio);
    if ratio < threshold {
        Noisiness::Noiseless
    } else {
        Noisiness::Noisy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_flat_image_is_noiseless() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 64, Rgb([128, 128, 128])));
        assert_eq!(noise_ratio(&img), 0.0);
        assert_eq!(noise_detection(&img, 0.2), Noisiness::Noiseless);
    }

    #[test]
    fn test_checkerboard_is_noisy() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(64, 64, |x, y| {
            if (x + y) % 2 == 0 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        }));
        assert!(noise_ratio(&img) > 0.5);
        assert_eq!(noise_detection(&img, 0.2), Noisiness::Noisy);
    }
}
