//! Digitization of electron images into camera counts

use ndarray::Array2;

use crate::hardware::Camera;

/// Convert an electron image to ADU.
///
/// Each pixel becomes `electrons * adu_per_electron + baseline_adu`, rounded
/// and clamped to `[0, 2^bit_depth - 1]`. Values saturate, they never wrap.
/// NaN pixels read as 0.
pub fn digitize(electron_img: &Array2<f64>, camera: &Camera) -> Array2<u16> {
    let max_adu = camera.max_adu();
    let gain = camera.adu_per_electron;
    let baseline = camera.baseline_adu;

    electron_img.mapv(|electrons| {
        let adu = (electrons * gain + baseline).round();
        if adu.is_nan() {
            0
        } else {
            adu.clamp(0.0, max_adu) as u16
        }
    })
}
