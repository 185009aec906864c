use std::fmt;
use std::path::Path;

use anyhow::Result;
use image::{GrayImage, Luma, RgbImage};
use serde::{Deserialize, Serialize};

use crate::config::FeatureConfig;
use crate::histogram::{self, HIST_LEN};
use crate::kmeans;
use crate::shape::{self, MOMENT_COUNT};
use crate::texture;

/// 主色数量
pub const PALETTE_LEN: usize = 5;
/// 纹理能量向量长度（4 个频率，各两个统计量）
pub const TEXTURE_LEN: usize = 8;

/// 图片字节无法解码
#[derive(Debug)]
pub struct DecodeError(pub String);

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "无法解码图片: {}", self.0)
    }
}

impl std::error::Error for DecodeError {}

/// 一张图片的四组描述符
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptors {
    /// 8x8x8 RGB 联合直方图，L2 归一化
    pub histogram: Vec<f32>,
    /// k-means 聚出的 5 个主色中心，顺序无意义
    pub palette: Vec<[f32; 3]>,
    /// Gabor 纹理能量，按频率交替排列 [mean, var]
    pub texture: Vec<f32>,
    /// 最大外部轮廓的 7 个 Hu 不变矩
    pub moments: Vec<f32>,
}

impl Descriptors {
    /// 校验各分块长度是否合法
    pub fn well_formed(&self) -> bool {
        self.histogram.len() == HIST_LEN
            && self.palette.len() == PALETTE_LEN
            && self.texture.len() == TEXTURE_LEN
            && self.moments.len() == MOMENT_COUNT
    }
}

/// 特征提取器
///
/// 全部算法参数在构造时注入，之后不可变，同一个实例可以在多个
/// 线程间共享。四组描述符都从同一个解码后的像素缓冲计算。
pub struct FeatureExtractor {
    config: FeatureConfig,
    seed: Option<u64>,
}

impl FeatureExtractor {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config, seed: None }
    }

    /// 固定聚类随机种子，测试中用于复现主色结果
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// 解码图片字节为 RGB 像素缓冲
    pub fn decode(&self, bytes: &[u8]) -> Result<RgbImage> {
        let image = image::load_from_memory(bytes).map_err(|e| DecodeError(e.to_string()))?;
        Ok(image.to_rgb8())
    }

    /// 从解码后的图片计算四组描述符
    pub fn extract(&self, image: &RgbImage) -> Descriptors {
        let gray = rgb_to_gray(image);

        let histogram = histogram::color_histogram(image);
        let palette = self.dominant_colors(image);
        let texture = texture::texture_energy(&gray, &self.config.frequencies);
        let moments = shape::shape_moments(&gray, self.config.canny_low, self.config.canny_high);

        Descriptors { histogram, palette, texture, moments }
    }

    /// 解码并提取
    pub fn extract_bytes(&self, bytes: &[u8]) -> Result<Descriptors> {
        let image = self.decode(bytes)?;
        Ok(self.extract(&image))
    }

    pub fn extract_file(&self, path: impl AsRef<Path>) -> Result<Descriptors> {
        let bytes = std::fs::read(path)?;
        self.extract_bytes(&bytes)
    }

    fn dominant_colors(&self, image: &RgbImage) -> Vec<[f32; 3]> {
        let pixels: Vec<[f32; 3]> = image
            .pixels()
            .map(|p| [p[0] as f32, p[1] as f32, p[2] as f32])
            .collect();
        let state = kmeans::kmeans(
            &pixels,
            self.config.palette_size,
            self.config.kmeans_attempts,
            self.config.kmeans_eps,
            self.config.kmeans_max_iter,
            self.seed,
        );
        state.centroids
    }
}

/// BT.601 加权灰度转换（0.299 R + 0.587 G + 0.114 B，四舍五入）
pub fn rgb_to_gray(image: &RgbImage) -> GrayImage {
    let (w, h) = image.dimensions();
    let mut gray = GrayImage::new(w, h);
    for (x, y, pixel) in image.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let v = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        gray.put_pixel(x, y, Luma([v.round() as u8]));
    }
    gray
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;

    fn extractor() -> FeatureExtractor {
        FeatureExtractor::new(FeatureConfig::default()).with_seed(42)
    }

    #[test]
    fn test_gray_conversion_weights() {
        let image = RgbImage::from_pixel(2, 2, Rgb([255, 0, 0]));
        let gray = rgb_to_gray(&image);
        // 0.299 * 255 = 76.245
        assert_eq!(gray.get_pixel(0, 0)[0], 76);

        let image = RgbImage::from_pixel(2, 2, Rgb([0, 0, 255]));
        assert_eq!(rgb_to_gray(&image).get_pixel(1, 1)[0], 29);
    }

    #[test]
    fn test_extract_solid_red() {
        let image = RgbImage::from_pixel(100, 100, Rgb([255, 0, 0]));
        let descriptors = extractor().extract(&image);

        assert!(descriptors.well_formed());

        // 直方图集中在单个 bin
        assert_eq!(descriptors.histogram.iter().filter(|&&x| x > 0.0).count(), 1);

        // 纯色图片的主色全部收敛到红色附近
        for [r, g, b] in &descriptors.palette {
            assert!((r - 255.0).abs() < 1.0);
            assert!(g.abs() < 1.0 && b.abs() < 1.0);
        }

        // 没有边缘，Hu 矩全零
        assert!(descriptors.moments.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_extract_lengths() {
        let image = RgbImage::from_fn(64, 48, |x, y| {
            Rgb([(x * 3) as u8, (y * 5) as u8, ((x + y) * 2) as u8])
        });
        let descriptors = extractor().extract(&image);

        assert_eq!(descriptors.histogram.len(), HIST_LEN);
        assert_eq!(descriptors.palette.len(), PALETTE_LEN);
        assert_eq!(descriptors.texture.len(), TEXTURE_LEN);
        assert_eq!(descriptors.moments.len(), MOMENT_COUNT);
    }

    #[test]
    fn test_decode_error() {
        let result = extractor().extract_bytes(b"definitely not an image");
        let err = result.unwrap_err();
        assert!(err.is::<DecodeError>());
    }

    #[test]
    fn test_decode_roundtrip() {
        // 编码成 PNG 再解码，像素应当保持不变
        let image = RgbImage::from_fn(16, 16, |x, y| Rgb([x as u8 * 10, y as u8 * 10, 0]));
        let mut bytes = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let decoded = extractor().decode(&bytes).unwrap();
        assert_eq!(decoded, image);
    }
}
