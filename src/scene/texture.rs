use crate::core::color::srgb_to_linear;
use image::DynamicImage;
use log::debug;
use nalgebra::{Vector2, Vector4};

/// How texel values are encoded in the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    /// Color data (diffuse maps); decoded to linear on upload.
    Srgb,
    /// Non-color data such as normal maps; used as stored.
    Linear,
}

/// Minification/magnification filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Nearest,
    Linear,
    /// Bilinear within the two nearest mip levels, blended by LOD.
    LinearMipmapLinear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureOptions {
    pub color_space: ColorSpace,
    pub filter: Filter,
    pub generate_mipmaps: bool,
}

impl Default for TextureOptions {
    fn default() -> Self {
        Self {
            color_space: ColorSpace::Srgb,
            filter: Filter::LinearMipmapLinear,
            generate_mipmaps: true,
        }
    }
}

#[derive(Debug, Clone)]
struct MipLevel {
    width: usize,
    height: usize,
    texels: Vec<Vector4<f32>>,
}

impl MipLevel {
    /// Texel with REPEAT wrapping.
    #[inline]
    fn fetch(&self, x: i64, y: i64) -> Vector4<f32> {
        let x = x.rem_euclid(self.width as i64) as usize;
        let y = y.rem_euclid(self.height as i64) as usize;
        self.texels[y * self.width + x]
    }

    /// 2x2 box filter down to the next level.
    fn downsample(&self) -> MipLevel {
        let width = (self.width / 2).max(1);
        let height = (self.height / 2).max(1);
        let mut texels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                let (sx, sy) = (2 * x as i64, 2 * y as i64);
                let sum = self.fetch(sx, sy)
                    + self.fetch(sx + 1, sy)
                    + self.fetch(sx, sy + 1)
                    + self.fetch(sx + 1, sy + 1);
                texels.push(sum * 0.25);
            }
        }
        MipLevel { width, height, texels }
    }

    fn sample_nearest(&self, uv: &Vector2<f32>) -> Vector4<f32> {
        let (x, y) = self.texel_space(uv);
        self.fetch(x.floor() as i64, y.floor() as i64)
    }

    fn sample_bilinear(&self, uv: &Vector2<f32>) -> Vector4<f32> {
        let (x, y) = self.texel_space(uv);
        // Pixel centers sit at +0.5.
        let (x, y) = (x - 0.5, y - 0.5);
        let (x0, y0) = (x.floor(), y.floor());
        let (wx, wy) = (x - x0, y - y0);
        let (x0, y0) = (x0 as i64, y0 as i64);

        let top = self.fetch(x0, y0) * (1.0 - wx) + self.fetch(x0 + 1, y0) * wx;
        let bottom = self.fetch(x0, y0 + 1) * (1.0 - wx) + self.fetch(x0 + 1, y0 + 1) * wx;
        top * (1.0 - wy) + bottom * wy
    }

    /// UV -> continuous texel coordinates. V is flipped: image row 0 is the top.
    #[inline]
    fn texel_space(&self, uv: &Vector2<f32>) -> (f32, f32) {
        let u = uv.x - uv.x.floor();
        let v = uv.y - uv.y.floor();
        (u * self.width as f32, (1.0 - v) * self.height as f32)
    }
}

/// A 2D texture with an optional mip chain, stored as linear RGBA floats.
#[derive(Debug, Clone)]
pub struct Texture {
    levels: Vec<MipLevel>,
    pub options: TextureOptions,
}

impl Texture {
    pub fn from_image(img: &DynamicImage, options: TextureOptions) -> Self {
        let rgba = img.to_rgba32f();
        let (width, height) = (rgba.width() as usize, rgba.height() as usize);
        let texels = rgba
            .pixels()
            .map(|p| {
                let c = Vector4::new(p[0], p[1], p[2], p[3]);
                match options.color_space {
                    ColorSpace::Srgb => srgb_to_linear(c.xyz()).push(c.w),
                    ColorSpace::Linear => c,
                }
            })
            .collect();

        let mut levels = vec![MipLevel {
            width: width.max(1),
            height: height.max(1),
            texels,
        }];
        if options.generate_mipmaps {
            while let Some(last) = levels.last().filter(|l| l.width > 1 || l.height > 1) {
                let next = last.downsample();
                levels.push(next);
            }
            debug!("Generated {} mip levels for {}x{} texture", levels.len(), width, height);
        }

        Self { levels, options }
    }

    pub fn width(&self) -> usize {
        self.levels[0].width
    }

    pub fn height(&self) -> usize {
        self.levels[0].height
    }

    pub fn mip_levels(&self) -> usize {
        self.levels.len()
    }

    /// Samples with REPEAT wrapping.
    ///
    /// `uv_density` is the rasterizer's estimate of UV units per screen pixel;
    /// it selects the mip level for [`Filter::LinearMipmapLinear`]. Pass 0.0 to
    /// force the base level.
    pub fn sample(&self, uv: &Vector2<f32>, uv_density: f32) -> Vector4<f32> {
        match self.options.filter {
            Filter::Nearest => self.levels[0].sample_nearest(uv),
            Filter::Linear => self.levels[0].sample_bilinear(uv),
            Filter::LinearMipmapLinear => {
                let lod = self.lod(uv_density);
                let base = lod.floor() as usize;
                let frac = lod - lod.floor();
                let near = self.levels[base].sample_bilinear(uv);
                if frac <= f32::EPSILON || base + 1 >= self.levels.len() {
                    near
                } else {
                    near * (1.0 - frac) + self.levels[base + 1].sample_bilinear(uv) * frac
                }
            }
        }
    }

    fn lod(&self, uv_density: f32) -> f32 {
        let texels_per_pixel = uv_density * self.width().max(self.height()) as f32;
        if texels_per_pixel <= 1.0 {
            return 0.0;
        }
        texels_per_pixel
            .log2()
            .clamp(0.0, (self.levels.len() - 1) as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn checker(size: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(size, size, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        }))
    }

    fn linear(filter: Filter) -> TextureOptions {
        TextureOptions {
            color_space: ColorSpace::Linear,
            filter,
            generate_mipmaps: true,
        }
    }

    #[test]
    fn test_mip_chain_reaches_one_texel() {
        let tex = Texture::from_image(&checker(8), linear(Filter::LinearMipmapLinear));
        assert_eq!(tex.mip_levels(), 4); // 8, 4, 2, 1
        assert_eq!(tex.width(), 8);
    }

    #[test]
    fn test_high_density_samples_averaged_level() {
        let tex = Texture::from_image(&checker(8), linear(Filter::LinearMipmapLinear));
        // One pixel covers the whole texture: the 1x1 level, mid grey.
        let c = tex.sample(&Vector2::new(0.3, 0.7), 1.0);
        assert!((c.x - 0.5).abs() < 1e-5);
        assert!((c.w - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_nearest_hits_exact_texel() {
        let tex = Texture::from_image(&checker(2), linear(Filter::Nearest));
        // u in the left column, v near 1.0 -> image row 0.
        let c = tex.sample(&Vector2::new(0.25, 0.9), 0.0);
        assert_eq!(c, Vector4::new(1.0, 1.0, 1.0, 1.0));
        let c = tex.sample(&Vector2::new(0.75, 0.9), 0.0);
        assert_eq!(c, Vector4::new(0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_srgb_is_linearized() {
        let grey = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([128, 128, 128, 255])));
        let options = TextureOptions {
            color_space: ColorSpace::Srgb,
            filter: Filter::Nearest,
            generate_mipmaps: false,
        };
        let c = Texture::from_image(&grey, options).sample(&Vector2::new(0.5, 0.5), 0.0);
        let expected = (128.0f32 / 255.0).powf(2.2);
        assert!((c.x - expected).abs() < 1e-4);
    }

    #[test]
    fn test_uv_wraps() {
        let tex = Texture::from_image(&checker(2), linear(Filter::Nearest));
        let a = tex.sample(&Vector2::new(0.25, 0.9), 0.0);
        let b = tex.sample(&Vector2::new(1.25, -0.1), 0.0);
        assert_eq!(a, b);
    }
}
