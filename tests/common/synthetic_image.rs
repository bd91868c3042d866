use image::{GrayImage, Luma};

/// Dark left half, bright right half; the step lies between `width / 2 - 1` and `width / 2`.
pub fn vertical_step(width: u32, height: u32) -> GrayImage {
    assert!(width >= 4 && height > 0, "image too small for a step");
    GrayImage::from_fn(width, height, |x, _| {
        Luma([if x < width / 2 { 40 } else { 200 }])
    })
}

/// Dark top half, bright bottom half; the step lies between `height / 2 - 1` and `height / 2`.
pub fn horizontal_step(width: u32, height: u32) -> GrayImage {
    assert!(width > 0 && height >= 4, "image too small for a step");
    GrayImage::from_fn(width, height, |_, y| {
        Luma([if y < height / 2 { 0 } else { 200 }])
    })
}

/// Seed file text in the planar format, one `x y label` line per seed
pub fn seed_file(seeds: &[(usize, usize, u32)]) -> String {
    let mut text = String::from("2\n");
    for (x, y, label) in seeds {
        text.push_str(&format!("{} {} {}\n", x, y, label));
    }
    text
}
