use image::GrayImage;
use ndarray::Array2;

use crate::utils::reflect_101;

/// Hu 不变矩的个数
pub const MOMENT_COUNT: usize = 7;

// 8 邻域方向增量，逆时针序（y 轴向下）
// 0=东 1=东北 2=北 3=西北 4=西 5=西南 6=南 7=东南
const DX: [i32; 8] = [1, 1, 0, -1, -1, -1, 0, 1];
const DY: [i32; 8] = [0, -1, -1, -1, 0, 1, 1, 1];

/// 计算灰度图的形状描述符
///
/// Canny 提取边缘后取面积最大的外部轮廓，返回它的 7 个 Hu 不变矩。
/// 图中没有任何轮廓时返回全零向量。
pub fn shape_moments(gray: &GrayImage, low: f32, high: f32) -> Vec<f32> {
    let edges = canny(gray, low, high);
    let contours = external_contours(&edges);

    // 面积最大的轮廓，面积相同时保留先遇到的
    let mut best: Option<(f64, &Vec<(i32, i32)>)> = None;
    for contour in &contours {
        let area = contour_area(contour);
        if best.as_ref().is_none_or(|(b, _)| area > *b) {
            best = Some((area, contour));
        }
    }

    match best {
        Some((_, contour)) => {
            let hu = hu_moments(&contour_moments(contour));
            hu.iter().map(|&x| x as f32).collect()
        }
        None => vec![0.0; MOMENT_COUNT],
    }
}

/// Canny 边缘检测
///
/// Sobel 3x3 梯度取 L1 幅值，四方向非极大值抑制后用双阈值做滞后连接，
/// 返回 0/255 的边缘图。阈值与幅值直接比较，不做归一化。
pub fn canny(gray: &GrayImage, low: f32, high: f32) -> Array2<u8> {
    let (w, h) = gray.dimensions();
    let (w, h) = (w as usize, h as usize);
    if w == 0 || h == 0 {
        return Array2::zeros((h, w));
    }

    // Sobel 梯度，边界按 REFLECT_101 处理
    let at = |x: isize, y: isize| -> i32 {
        gray.get_pixel(reflect_101(x, w) as u32, reflect_101(y, h) as u32)[0] as i32
    };
    let mut gx = Array2::<i32>::zeros((h, w));
    let mut gy = Array2::<i32>::zeros((h, w));
    let mut mag = Array2::<i32>::zeros((h, w));
    for y in 0..h {
        for x in 0..w {
            let (xi, yi) = (x as isize, y as isize);
            let (tl, t, tr) = (at(xi - 1, yi - 1), at(xi, yi - 1), at(xi + 1, yi - 1));
            let (l, r) = (at(xi - 1, yi), at(xi + 1, yi));
            let (bl, b, br) = (at(xi - 1, yi + 1), at(xi, yi + 1), at(xi + 1, yi + 1));
            let dx = (tr + 2 * r + br) - (tl + 2 * l + bl);
            let dy = (bl + 2 * b + br) - (tl + 2 * t + tr);
            gx[(y, x)] = dx;
            gy[(y, x)] = dy;
            mag[(y, x)] = dx.abs() + dy.abs();
        }
    }

    // 非极大值抑制：0 = 非边缘，1 = 弱边缘，2 = 强边缘
    let tan22 = 22.5f64.to_radians().tan();
    let tan67 = 67.5f64.to_radians().tan();
    let mag_at = |x: isize, y: isize| -> i32 {
        if x < 0 || y < 0 || x >= w as isize || y >= h as isize {
            0
        } else {
            mag[(y as usize, x as usize)]
        }
    };
    let mut map = Array2::<u8>::zeros((h, w));
    for y in 0..h {
        for x in 0..w {
            let m = mag[(y, x)];
            if (m as f32) <= low {
                continue;
            }
            let dx = gx[(y, x)];
            let dy = gy[(y, x)];
            let (adx, ady) = (dx.abs() as f64, dy.abs() as f64);
            let (xi, yi) = (x as isize, y as isize);

            let keep = if ady < tan22 * adx {
                // 梯度接近水平，沿 x 方向比较
                m > mag_at(xi - 1, yi) && m >= mag_at(xi + 1, yi)
            } else if ady > tan67 * adx {
                // 梯度接近垂直，沿 y 方向比较
                m > mag_at(xi, yi - 1) && m >= mag_at(xi, yi + 1)
            } else {
                // 对角方向，按梯度符号选择对角线
                let s = if (dx ^ dy) < 0 { -1 } else { 1 };
                m > mag_at(xi - s, yi - 1) && m >= mag_at(xi + s, yi + 1)
            };
            if keep {
                map[(y, x)] = if (m as f32) > high { 2 } else { 1 };
            }
        }
    }

    // 滞后连接：从强边缘出发，8 邻域可达的弱边缘一并保留
    let mut edges = Array2::<u8>::zeros((h, w));
    let mut stack = Vec::new();
    for y in 0..h {
        for x in 0..w {
            if map[(y, x)] == 2 {
                stack.push((x, y));
            }
        }
    }
    while let Some((x, y)) = stack.pop() {
        if edges[(y, x)] != 0 {
            continue;
        }
        edges[(y, x)] = 255;
        for dy in -1isize..=1 {
            for dx in -1isize..=1 {
                let (nx, ny) = (x as isize + dx, y as isize + dy);
                if nx < 0 || ny < 0 || nx >= w as isize || ny >= h as isize {
                    continue;
                }
                let (nx, ny) = (nx as usize, ny as usize);
                if edges[(ny, nx)] == 0 && map[(ny, nx)] >= 1 {
                    stack.push((nx, ny));
                }
            }
        }
    }
    edges
}

/// 提取全部外部轮廓
///
/// 每个 8 连通域只保留一条外边界，按栅格扫描顺序返回。
pub fn external_contours(edges: &Array2<u8>) -> Vec<Vec<(i32, i32)>> {
    let (h, w) = edges.dim();
    let mut visited = Array2::from_elem((h, w), false);
    let mut contours = Vec::new();

    for y in 0..h {
        for x in 0..w {
            if edges[(y, x)] != 0 && !visited[(y, x)] {
                // 栅格序首个像素一定位于连通域的外边界上
                contours.push(trace_boundary(edges, x as i32, y as i32));
                flood_mark(edges, &mut visited, x, y);
            }
        }
    }
    contours
}

/// 从外边界起点出发沿边界走一圈，返回 (x, y) 顶点序列
fn trace_boundary(edges: &Array2<u8>, x0: i32, y0: i32) -> Vec<(i32, i32)> {
    let (h, w) = edges.dim();
    let at = |x: i32, y: i32| -> bool {
        x >= 0 && y >= 0 && (x as usize) < w && (y as usize) < h && edges[(y as usize, x as usize)] != 0
    };

    // 从西侧开始顺时针找第一个前景邻居
    let mut s = 4usize;
    let (mut x1, mut y1) = (x0, y0);
    let mut found = false;
    for _ in 0..8 {
        s = (s + 7) % 8;
        let (nx, ny) = (x0 + DX[s], y0 + DY[s]);
        if at(nx, ny) {
            (x1, y1) = (nx, ny);
            found = true;
            break;
        }
    }
    if !found {
        // 孤立单像素
        return vec![(x0, y0)];
    }

    let mut contour = Vec::new();
    let (mut x3, mut y3) = (x0, y0);
    loop {
        // 逆时针扫描下一个边界像素
        let (x4, y4) = loop {
            s = (s + 1) % 8;
            let (nx, ny) = (x3 + DX[s], y3 + DY[s]);
            if at(nx, ny) {
                break (nx, ny);
            }
        };
        contour.push((x3, y3));

        // 回到起点且下一步是最初找到的邻居时结束
        if x4 == x0 && y4 == y0 && x3 == x1 && y3 == y1 {
            break;
        }
        (x3, y3) = (x4, y4);
        s = (s + 4) % 8;
    }
    contour
}

/// 标记整个 8 连通域为已访问
fn flood_mark(edges: &Array2<u8>, visited: &mut Array2<bool>, x: usize, y: usize) {
    let (h, w) = edges.dim();
    let mut stack = vec![(x, y)];
    visited[(y, x)] = true;
    while let Some((x, y)) = stack.pop() {
        for dy in -1isize..=1 {
            for dx in -1isize..=1 {
                let (nx, ny) = (x as isize + dx, y as isize + dy);
                if nx < 0 || ny < 0 || nx >= w as isize || ny >= h as isize {
                    continue;
                }
                let (nx, ny) = (nx as usize, ny as usize);
                if edges[(ny, nx)] != 0 && !visited[(ny, nx)] {
                    visited[(ny, nx)] = true;
                    stack.push((nx, ny));
                }
            }
        }
    }
}

/// 轮廓多边形面积（鞋带公式的绝对值）
pub fn contour_area(contour: &[(i32, i32)]) -> f64 {
    if contour.len() < 3 {
        return 0.0;
    }
    let mut acc = 0f64;
    for i in 0..contour.len() {
        let (x1, y1) = contour[i];
        let (x2, y2) = contour[(i + 1) % contour.len()];
        acc += x1 as f64 * y2 as f64 - x2 as f64 * y1 as f64;
    }
    (acc / 2.0).abs()
}

/// 轮廓多边形的原点矩
#[derive(Debug, Clone, Copy, Default)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
    pub m20: f64,
    pub m11: f64,
    pub m02: f64,
    pub m30: f64,
    pub m21: f64,
    pub m12: f64,
    pub m03: f64,
}

/// 沿多边形边做格林公式累加计算轮廓矩
///
/// 服从遍历方向的符号统一翻转，保证 m00 非负。围不出面积的退化轮廓
/// （单像素、一条直线）返回全零。
pub fn contour_moments(contour: &[(i32, i32)]) -> Moments {
    let n = contour.len();
    if n == 0 {
        return Moments::default();
    }

    let (mut a00, mut a10, mut a01) = (0f64, 0f64, 0f64);
    let (mut a20, mut a11, mut a02) = (0f64, 0f64, 0f64);
    let (mut a30, mut a21, mut a12, mut a03) = (0f64, 0f64, 0f64, 0f64);

    let (mut xi_1, mut yi_1) = (contour[n - 1].0 as f64, contour[n - 1].1 as f64);
    for &(x, y) in contour {
        let (xi, yi) = (x as f64, y as f64);
        let dxy = xi_1 * yi - xi * yi_1;
        let xp = xi_1 + xi;
        let yp = yi_1 + yi;

        a00 += dxy;
        a10 += dxy * xp;
        a01 += dxy * yp;
        a20 += dxy * (xi_1 * xi_1 + xi_1 * xi + xi * xi);
        a11 += dxy * (xi_1 * (2.0 * yi_1 + yi) + xi * (yi_1 + 2.0 * yi));
        a02 += dxy * (yi_1 * yi_1 + yi_1 * yi + yi * yi);
        a30 += dxy * xp * (xi_1 * xi_1 + xi * xi);
        a21 += dxy
            * (xi_1 * xi_1 * (3.0 * yi_1 + yi)
                + 2.0 * xi * xi_1 * yp
                + xi * xi * (yi_1 + 3.0 * yi));
        a12 += dxy
            * (yi_1 * yi_1 * (3.0 * xi_1 + xi)
                + 2.0 * yi * yi_1 * xp
                + yi * yi * (xi_1 + 3.0 * xi));
        a03 += dxy * yp * (yi_1 * yi_1 + yi * yi);

        (xi_1, yi_1) = (xi, yi);
    }

    if a00.abs() > f32::EPSILON as f64 {
        let sign = if a00 > 0.0 { 1.0 } else { -1.0 };
        Moments {
            m00: a00 * sign / 2.0,
            m10: a10 * sign / 6.0,
            m01: a01 * sign / 6.0,
            m20: a20 * sign / 12.0,
            m11: a11 * sign / 24.0,
            m02: a02 * sign / 12.0,
            m30: a30 * sign / 20.0,
            m21: a21 * sign / 60.0,
            m12: a12 * sign / 60.0,
            m03: a03 * sign / 20.0,
        }
    } else {
        Moments::default()
    }
}

/// 由原点矩计算 7 个 Hu 不变矩，m00 接近零时全部返回 0
pub fn hu_moments(m: &Moments) -> [f64; 7] {
    if m.m00.abs() < f32::EPSILON as f64 {
        return [0.0; 7];
    }

    // 中心矩
    let cx = m.m10 / m.m00;
    let cy = m.m01 / m.m00;
    let mu20 = m.m20 - m.m10 * cx;
    let mu11 = m.m11 - m.m10 * cy;
    let mu02 = m.m02 - m.m01 * cy;
    let mu30 = m.m30 - cx * (3.0 * mu20 + cx * m.m10);
    let mu21 = m.m21 - cx * (2.0 * mu11 + cx * m.m01) - cy * mu20;
    let mu12 = m.m12 - cy * (2.0 * mu11 + cy * m.m10) - cx * mu02;
    let mu03 = m.m03 - cy * (3.0 * mu02 + cy * m.m01);

    // 归一化中心矩，nu_pq = mu_pq / m00^((p+q)/2 + 1)
    let s2 = 1.0 / (m.m00 * m.m00);
    let s3 = s2 / m.m00.sqrt();
    let nu20 = mu20 * s2;
    let nu11 = mu11 * s2;
    let nu02 = mu02 * s2;
    let nu30 = mu30 * s3;
    let nu21 = mu21 * s3;
    let nu12 = mu12 * s3;
    let nu03 = mu03 * s3;

    let mut hu = [0f64; 7];
    let mut t0 = nu30 + nu12;
    let mut t1 = nu21 + nu03;
    let mut q0 = t0 * t0;
    let mut q1 = t1 * t1;
    let n4 = 4.0 * nu11;
    let s = nu20 + nu02;
    let d = nu20 - nu02;

    hu[0] = s;
    hu[1] = d * d + n4 * nu11;
    hu[3] = q0 + q1;
    hu[5] = d * (q0 - q1) + n4 * t0 * t1;

    t0 *= q0 - 3.0 * q1;
    t1 *= 3.0 * q0 - q1;
    q0 = nu30 - 3.0 * nu12;
    q1 = 3.0 * nu21 - nu03;

    hu[2] = q0 * q0 + q1 * q1;
    hu[4] = q0 * t0 + q1 * t1;
    hu[6] = q1 * t0 - q0 * t1;
    hu
}
