use std::sync::LazyLock;

use prometheus::*;

static METRIC_SEARCH_IMAGE_COUNT: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "vs_search_image_count",
        "count of the image to search",
        &["size", "category"]
    )
    .unwrap()
});

static METRIC_SEARCH_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "vs_search_duration",
        "duration of the per-image search in seconds",
        &["size", "category"]
    )
    .unwrap()
});

static METRIC_SEARCH_TOP_SCORE: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "vs_search_top_score",
        "top combined score of the per-image search",
        &["size", "category"],
        (0..=20).map(|x| x as f64 * 0.05).collect()
    )
    .unwrap()
});

/// 增加搜索图片计数
pub fn inc_image_count(size: (u32, u32), category: Option<&str>) {
    let size = to_fixed_size(size);

    METRIC_SEARCH_IMAGE_COUNT.with_label_values(&[size, category.unwrap_or("all")]).inc();
}

pub fn observe_search_duration(size: (u32, u32), category: Option<&str>, duration: f32) {
    let size = to_fixed_size(size);

    METRIC_SEARCH_DURATION
        .with_label_values(&[size, category.unwrap_or("all")])
        .observe(duration as f64);
}

pub fn observe_top_score(size: (u32, u32), category: Option<&str>, score: f32) {
    let size = to_fixed_size(size);

    METRIC_SEARCH_TOP_SCORE
        .with_label_values(&[size, category.unwrap_or("all")])
        .observe(score as f64);
}

/// 将图像面积范围调整到几个固定值
fn to_fixed_size((width, height): (u32, u32)) -> &'static str {
    let area = width * height;
    if area <= 128 * 128 {
        "128"
    } else if area <= 256 * 256 {
        "256"
    } else if area <= 512 * 512 {
        "512"
    } else if area <= 768 * 768 {
        "768"
    } else if area <= 1024 * 1024 {
        "1024"
    } else if area <= 1536 * 1536 {
        "1536"
    } else if area <= 2048 * 2048 {
        "2048"
    } else {
        "2048+"
    }
}
