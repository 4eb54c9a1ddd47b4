use nalgebra::{Vector3, Vector4};

const GAMMA: f32 = 2.2;

/// sRGB-encoded [0, 1] value -> linear, using the usual 2.2 power approximation.
#[inline]
pub fn srgb_to_linear(color: Vector3<f32>) -> Vector3<f32> {
    color.map(|c| c.powf(GAMMA))
}

/// Linear RGB -> sRGB (gamma correction), applied when the target is read back.
#[inline]
pub fn linear_to_srgb(color: Vector3<f32>) -> Vector3<f32> {
    color.map(|c| c.max(0.0).powf(1.0 / GAMMA))
}

/// Converts a linear RGBA color to 8-bit sRGB; alpha is stored linearly.
pub fn to_rgba8(color: &Vector4<f32>) -> [u8; 4] {
    let srgb = linear_to_srgb(color.xyz());
    let quantize = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    [
        quantize(srgb.x),
        quantize(srgb.y),
        quantize(srgb.z),
        quantize(color.w),
    ]
}
