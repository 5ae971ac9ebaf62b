use image::imageops::{self, FilterType};
use image::RgbImage;

pub const IMAGE_SIZE: u32 = 224;

pub const CLIP_MEAN: [f32; 3] = [0.48145466, 0.4578275, 0.40821073];
pub const CLIP_STD: [f32; 3] = [0.26862954, 0.26130258, 0.27577711];

/// Centered square of side `min(width, height)`. Cropping before resizing
/// keeps memory bounded for extreme aspect ratios.
fn center_square(img: &RgbImage) -> RgbImage {
    let (width, height) = img.dimensions();
    let side = width.min(height);
    let x_offset = (width - side) / 2;
    let y_offset = (height - side) / 2;
    imageops::crop_imm(img, x_offset, y_offset, side, side).to_image()
}

fn resize_square(img: &RgbImage, size: u32) -> RgbImage {
    if img.dimensions() == (size, size) {
        return img.clone();
    }
    imageops::resize(img, size, size, FilterType::CatmullRom)
}

/// CLIP image preprocessing: center square, resized to 224 (bicubic),
/// scaled to [0, 1] and normalized per channel. Output is CHW, length
/// `3 * 224 * 224`.
pub fn preprocess(img: &RgbImage) -> Vec<f32> {
    let cropped = resize_square(&center_square(img), IMAGE_SIZE);

    let plane = (IMAGE_SIZE * IMAGE_SIZE) as usize;
    let mut pixels = vec![0f32; 3 * plane];
    for (i, pixel) in cropped.pixels().enumerate() {
        for c in 0..3 {
            let value = pixel[c] as f32 / 255.0;
            pixels[c * plane + i] = (value - CLIP_MEAN[c]) / CLIP_STD[c];
        }
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_center_square() {
        let mut img = RgbImage::new(300, 100);
        img.put_pixel(150, 50, Rgb([9, 9, 9]));
        let square = center_square(&img);
        assert_eq!(square.dimensions(), (100, 100));
        assert_eq!(square.get_pixel(50, 50), &Rgb([9, 9, 9]));

        assert_eq!(center_square(&RgbImage::new(40, 90)).dimensions(), (40, 40));
    }

    #[test]
    fn test_small_images_are_upscaled() {
        let resized = resize_square(&center_square(&RgbImage::new(8, 8)), IMAGE_SIZE);
        assert_eq!(resized.dimensions(), (224, 224));
    }

    #[test]
    fn test_extreme_aspect_ratio_stays_bounded() {
        let tall = RgbImage::from_pixel(1, 100_000, Rgb([255, 255, 255]));
        assert_eq!(center_square(&tall).dimensions(), (1, 1));
        assert_eq!(preprocess(&tall).len(), 3 * 224 * 224);

        let wide = RgbImage::new(100_000, 2);
        assert_eq!(preprocess(&wide).len(), 3 * 224 * 224);
    }

    #[test]
    fn test_output_shape() {
        let img = RgbImage::new(320, 240);
        assert_eq!(preprocess(&img).len(), 3 * 224 * 224);
    }

    #[test]
    fn test_channel_normalization() {
        let img = RgbImage::from_pixel(250, 250, Rgb([255, 0, 255]));
        let pixels = preprocess(&img);
        let plane = 224 * 224;

        let red = (1.0 - CLIP_MEAN[0]) / CLIP_STD[0];
        let green = (0.0 - CLIP_MEAN[1]) / CLIP_STD[1];
        assert!((pixels[0] - red).abs() < 1e-3);
        assert!((pixels[plane] - green).abs() < 1e-3);
        assert!((pixels[2 * plane + plane - 1] - (1.0 - CLIP_MEAN[2]) / CLIP_STD[2]).abs() < 1e-3);
    }
}
