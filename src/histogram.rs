use image::RgbImage;

/// 每个通道的 bin 数
const BINS_PER_CHANNEL: usize = 8;
/// 直方图总长度（8x8x8 联合分布展平）
pub const HIST_LEN: usize = BINS_PER_CHANNEL * BINS_PER_CHANNEL * BINS_PER_CHANNEL;

/// 计算 RGB 联合颜色直方图
///
/// 每个通道按 [0, 256) 均分为 8 个 bin，三个通道组成 512 维联合分布，
/// 展平顺序固定为 (R, G, B) 嵌套。结果做 L2 归一化，全零直方图保持全零。
pub fn color_histogram(image: &RgbImage) -> Vec<f32> {
    let mut counts = vec![0u32; HIST_LEN];
    for pixel in image.pixels() {
        let [r, g, b] = pixel.0;
        counts[bin_index(r, g, b)] += 1;
    }

    let mut hist: Vec<f32> = counts.into_iter().map(|c| c as f32).collect();
    normalize_l2(&mut hist);
    hist
}

#[inline]
fn bin_index(r: u8, g: u8, b: u8) -> usize {
    let (r, g, b) = (r as usize / 32, g as usize / 32, b as usize / 32);
    (r * BINS_PER_CHANNEL + g) * BINS_PER_CHANNEL + b
}

/// L2 归一化，零向量原样返回
pub fn normalize_l2(v: &mut [f32]) {
    let norm = v.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x = (*x as f64 / norm) as f32);
    }
}
