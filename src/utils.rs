use indicatif::ProgressStyle;

/// 进度条样式
pub fn pb_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta}) {msg}")
        .unwrap()
        .progress_chars("#>-")
}

/// BORDER_REFLECT_101 形式的坐标映射 (gfedcb|abcdefgh|gfedcba)
///
/// 卷积和梯度计算在图像边界处都按这种方式取像素
pub fn reflect_101(idx: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let len = len as isize;
    let mut idx = idx;
    while idx < 0 || idx >= len {
        if idx < 0 {
            idx = -idx;
        }
        if idx >= len {
            idx = 2 * (len - 1) - idx;
        }
    }
    idx as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflect_101() {
        // 区间内的坐标原样返回
        assert_eq!(reflect_101(0, 5), 0);
        assert_eq!(reflect_101(4, 5), 4);
        // 左侧越界：-1 -> 1, -2 -> 2
        assert_eq!(reflect_101(-1, 5), 1);
        assert_eq!(reflect_101(-2, 5), 2);
        // 右侧越界：5 -> 3, 6 -> 2
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(6, 5), 2);
        // 单像素行退化为 0
        assert_eq!(reflect_101(-3, 1), 0);
        assert_eq!(reflect_101(7, 1), 0);
    }
}
