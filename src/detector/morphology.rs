use image::GrayImage;
use imageproc::contrast::threshold;
use imageproc::distance_transform::Norm;
use imageproc::morphology::{close, open};

/// Clean a raw foreground mask: opening removes speckle noise, closing fills
/// small interior gaps, then a fixed threshold binarizes the result to
/// 0 / 255. A `kernel_radius` of 2 corresponds to a 5x5 square structuring
/// element.
pub fn clean_mask(mask: &GrayImage, kernel_radius: u8, threshold_value: u8) -> GrayImage {
    let opened = open(mask, Norm::LInf, kernel_radius);
    let closed = close(&opened, Norm::LInf, kernel_radius);
    threshold(&closed, threshold_value)
}
