use std::path::{Path, PathBuf};
use std::fs;
use image::{GrayImage, ImageFormat, Luma, Rgba, RgbaImage};
use imageproc::gradients::sobel_gradients;

use crate::adjacency::GridShape;
use crate::errors::{IftError, Result};
use crate::path_function::{PathValue, INFINITY};

/// Represents an input image with its metadata
pub struct InputImage {
    pub image: GrayImage,
    pub path: PathBuf,
    pub filename: String,
}

impl InputImage {
    /// Planar grid matching the image, x fastest
    pub fn shape(&self) -> Result<GridShape> {
        let (width, height) = self.image.dimensions();
        GridShape::planar(width as usize, height as usize)
    }
}

/// Get all PNG files from a directory (recursively)
pub fn get_png_files_in_dir<P: AsRef<Path>>(dir_path: P) -> Result<Vec<PathBuf>> {
    let dir_path = dir_path.as_ref();

    if !dir_path.exists() {
        return Err(IftError::InvalidPath(dir_path.to_path_buf()));
    }

    if !dir_path.is_dir() {
        return Err(IftError::Config(format!(
            "{} is not a directory", dir_path.display()
        )));
    }

    let mut png_files = Vec::new();
    find_png_files_recursive(dir_path, &mut png_files)?;
    png_files.sort();

    Ok(png_files)
}

fn find_png_files_recursive(dir_path: &Path, result: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir_path)? {
        let path = entry?.path();

        if path.is_dir() {
            find_png_files_recursive(&path, result)?;
        } else if path.is_file() {
            let is_png = path
                .extension()
                .map_or(false, |ext| ext.eq_ignore_ascii_case("png"));
            if is_png {
                result.push(path);
            }
        }
    }

    Ok(())
}

/// Load an image as 8-bit grayscale
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<InputImage> {
    let path = path.as_ref();

    let filename = path.file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| IftError::InvalidPath(path.to_path_buf()))?
        .to_string();

    let image = image::open(path)?.to_luma8();

    Ok(InputImage {
        image,
        path: path.to_path_buf(),
        filename,
    })
}

/// Pixel intensities in node order
pub fn image_to_values(image: &GrayImage) -> Vec<PathValue> {
    image.pixels().map(|p| PathValue::from(p[0])).collect()
}

/// Sobel gradient magnitude in node order
pub fn gradient_magnitude(image: &GrayImage) -> Vec<PathValue> {
    sobel_gradients(image)
        .pixels()
        .map(|p| PathValue::from(p[0]))
        .collect()
}

/// `max - v` for every value, turning ridges into valleys
pub fn complement(values: &[PathValue]) -> Vec<PathValue> {
    let max = values.iter().copied().max().unwrap_or(0);
    values.iter().map(|&v| max - v).collect()
}

fn check_size(values: usize, width: u32, height: u32) -> Result<()> {
    let expected = width as usize * height as usize;
    if values != expected {
        return Err(IftError::DimensionMismatch {
            map: "image",
            expected,
            found: values,
        });
    }
    Ok(())
}

/// Distinct colour for every label, black for label 0
pub fn label_color(label: u32) -> Rgba<u8> {
    if label == 0 {
        return Rgba([0, 0, 0, 255]);
    }
    let hash = label.wrapping_mul(2_654_435_761);
    Rgba([
        (hash >> 24) as u8 | 0x40,
        (hash >> 16) as u8 | 0x40,
        (hash >> 8) as u8 | 0x40,
        255,
    ])
}

/// Colour-coded label map
pub fn label_image(labels: &[u32], width: u32, height: u32) -> Result<RgbaImage> {
    check_size(labels.len(), width, height)?;
    Ok(RgbaImage::from_fn(width, height, |x, y| {
        label_color(labels[(y * width + x) as usize])
    }))
}

/// Path values stretched to 0..=254; unreached nodes are white
pub fn value_image(values: &[PathValue], width: u32, height: u32) -> Result<GrayImage> {
    check_size(values.len(), width, height)?;
    let finite = values.iter().copied().filter(|&v| v != INFINITY);
    let min = finite.clone().min().unwrap_or(0);
    let max = finite.max().unwrap_or(0);
    let range = (max - min).max(1) as f64;

    Ok(GrayImage::from_fn(width, height, |x, y| {
        let v = values[(y * width + x) as usize];
        if v == INFINITY {
            Luma([255])
        } else {
            Luma([((v - min) as f64 / range * 254.0).round() as u8])
        }
    }))
}

/// Draw `path` in red over the grayscale image
pub fn path_overlay(image: &GrayImage, path: &[usize]) -> RgbaImage {
    let (width, height) = image.dimensions();
    let mut overlay = RgbaImage::from_fn(width, height, |x, y| {
        let v = image.get_pixel(x, y)[0];
        Rgba([v, v, v, 255])
    });
    for &node in path {
        let x = (node % width as usize) as u32;
        let y = (node / width as usize) as u32;
        if y < height {
            overlay.put_pixel(x, y, Rgba([255, 0, 0, 255]));
        }
    }
    overlay
}

/// Save an RGBA image to the specified path
pub fn save_image<P: AsRef<Path>>(image: &RgbaImage, path: P) -> Result<()> {
    image.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Save a grayscale image to the specified path
pub fn save_gray_image<P: AsRef<Path>>(image: &GrayImage, path: P) -> Result<()> {
    image.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_follow_node_order() {
        let image = GrayImage::from_fn(3, 2, |x, y| Luma([(x + 10 * y) as u8]));
        assert_eq!(image_to_values(&image), vec![0, 1, 2, 10, 11, 12]);
    }

    #[test]
    fn test_gradient_is_zero_on_flat_image() {
        let image = GrayImage::from_pixel(4, 4, Luma([77]));
        assert!(gradient_magnitude(&image).iter().all(|&g| g == 0));
    }

    #[test]
    fn test_gradient_peaks_at_step() {
        let image = GrayImage::from_fn(6, 3, |x, _| Luma([if x < 3 { 0 } else { 200 }]));
        let gradient = gradient_magnitude(&image);
        assert_eq!(gradient.len(), 18);
        assert!(gradient[2 + 6] > 0);
        assert_eq!(gradient[6], 0);
    }

    #[test]
    fn test_complement() {
        assert_eq!(complement(&[0, 3, 5]), vec![5, 2, 0]);
    }

    #[test]
    fn test_label_image_colors() {
        let image = label_image(&[0, 1, 2, 1], 2, 2).unwrap();
        assert_eq!(*image.get_pixel(0, 0), Rgba([0, 0, 0, 255]));
        assert_eq!(image.get_pixel(1, 0), image.get_pixel(1, 1));
        assert_ne!(image.get_pixel(1, 0), image.get_pixel(0, 1));
        assert!(label_image(&[0, 1], 2, 2).is_err());
    }

    #[test]
    fn test_value_image_stretches_finite_values() {
        let image = value_image(&[0, 5, 10, INFINITY], 2, 2).unwrap();
        assert_eq!(image.get_pixel(0, 0)[0], 0);
        assert_eq!(image.get_pixel(1, 0)[0], 127);
        assert_eq!(image.get_pixel(0, 1)[0], 254);
        assert_eq!(image.get_pixel(1, 1)[0], 255);
    }

    #[test]
    fn test_path_overlay_marks_nodes() {
        let image = GrayImage::from_pixel(3, 3, Luma([9]));
        let overlay = path_overlay(&image, &[0, 4, 8]);
        assert_eq!(*overlay.get_pixel(1, 1), Rgba([255, 0, 0, 255]));
        assert_eq!(*overlay.get_pixel(1, 0), Rgba([9, 9, 9, 255]));
    }
}
