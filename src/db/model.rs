/// 图片记录
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ImageRecord {
    /// 图片 ID
    pub id: i64,
    /// 图片内容的 blake3 哈希
    pub hash: Vec<u8>,
    /// 原始文件名或路径
    pub filename: String,
    /// 图片分类
    pub category: String,
    /// 入库时间
    pub created_at: String,
}

/// 图片特征记录，四组描述符分别序列化存储
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FeatureRecord {
    /// 图片 ID
    pub id: i64,
    /// 图片分类
    pub category: String,
    /// 颜色直方图
    pub histogram: Vec<u8>,
    /// 主色调色板
    pub palette: Vec<u8>,
    /// 纹理能量
    pub texture: Vec<u8>,
    /// Hu 不变矩
    pub moments: Vec<u8>,
}
