use std::f64::consts::PI;

use image::GrayImage;
use ndarray::Array2;

use crate::utils::reflect_101;

/// 计算灰度图的 Gabor 纹理能量
///
/// 对每个频率生成 θ=0 的实部 Gabor 核做相关运算，响应先取整并饱和到
/// u8 的 [0, 255] 区间，再统计均值和方差。返回按频率顺序交替排列的
/// [mean, var] 对，长度为频率数的两倍。
pub fn texture_energy(gray: &GrayImage, frequencies: &[f32]) -> Vec<f32> {
    let plane = gray_to_plane(gray);

    let mut feats = Vec::with_capacity(frequencies.len() * 2);
    for &frequency in frequencies {
        let (kx, ky) = gabor_kernel_1d(frequency as f64);
        let response = correlate_separable(&plane, &kx, &ky);
        let (mean, variance) = saturated_stats(&response);
        feats.push(mean as f32);
        feats.push(variance as f32);
    }
    feats
}

fn gray_to_plane(gray: &GrayImage) -> Array2<f64> {
    let (w, h) = gray.dimensions();
    Array2::from_shape_fn((h as usize, w as usize), |(y, x)| {
        gray.get_pixel(x as u32, y as u32)[0] as f64
    })
}

/// 生成实部 Gabor 核的两个一维分量
///
/// θ=0 的实部核 exp(-(x²+y²)/2σ²)·cos(2πfx)/(2πσ²) 可以精确分离为
/// x 方向的高斯调制余弦和 y 方向的纯高斯。带宽固定为 1 个倍频程，
/// 对应 σ = 0.5622/f，核半径取 3σ 向上取整（至少为 1）。
fn gabor_kernel_1d(frequency: f64) -> (Vec<f64>, Vec<f64>) {
    // 带宽为 1 时的 σ·f 常数
    let sigma_prefactor = (2f64.ln() / 2.0).sqrt() * 3.0 / PI;
    let sigma = sigma_prefactor / frequency;
    let radius = (3.0 * sigma).ceil().max(1.0) as i64;
    let norm = 1.0 / (2.0 * PI * sigma * sigma);

    let kx = (-radius..=radius)
        .map(|x| {
            let x = x as f64;
            norm * (-0.5 * x * x / (sigma * sigma)).exp() * (2.0 * PI * frequency * x).cos()
        })
        .collect();
    let ky = (-radius..=radius)
        .map(|y| {
            let y = y as f64;
            (-0.5 * y * y / (sigma * sigma)).exp()
        })
        .collect();
    (kx, ky)
}

/// 两次一维相关实现二维相关，边界按 REFLECT_101 处理
fn correlate_separable(plane: &Array2<f64>, kx: &[f64], ky: &[f64]) -> Array2<f64> {
    let (h, w) = plane.dim();
    let rx = (kx.len() / 2) as isize;
    let ry = (ky.len() / 2) as isize;

    let mut tmp = Array2::zeros((h, w));
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (i, k) in kx.iter().enumerate() {
                let sx = reflect_101(x as isize + i as isize - rx, w);
                acc += plane[(y, sx)] * k;
            }
            tmp[(y, x)] = acc;
        }
    }

    let mut out = Array2::zeros((h, w));
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (i, k) in ky.iter().enumerate() {
                let sy = reflect_101(y as isize + i as isize - ry, h);
                acc += tmp[(sy, x)] * k;
            }
            out[(y, x)] = acc;
        }
    }
    out
}

/// 响应饱和到 u8 后统计均值和方差
fn saturated_stats(response: &Array2<f64>) -> (f64, f64) {
    let n = response.len() as f64;
    if n == 0.0 {
        return (0.0, 0.0);
    }

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for &v in response.iter() {
        let v = v.round().clamp(0.0, 255.0);
        sum += v;
        sum_sq += v * v;
    }
    let mean = sum / n;
    let variance = sum_sq / n - mean * mean;
    (mean, variance)
}
