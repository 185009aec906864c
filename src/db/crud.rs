use sqlx::{Executor, Result, Sqlite, SqlitePool};

use super::model::*;

/// 待插入的图片记录，描述符已经序列化
pub struct NewImage<'a> {
    pub hash: &'a [u8],
    pub filename: &'a str,
    pub category: &'a str,
    pub histogram: &'a [u8],
    pub palette: &'a [u8],
    pub texture: &'a [u8],
    pub moments: &'a [u8],
}

/// 添加图片记录，返回新 id
pub async fn add_image<'c, E>(executor: E, image: &NewImage<'_>) -> Result<i64>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query_scalar(
        r#"
        INSERT INTO image (hash, filename, category, histogram, palette, texture, moments)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(image.hash)
    .bind(image.filename)
    .bind(image.category)
    .bind(image.histogram)
    .bind(image.palette)
    .bind(image.texture)
    .bind(image.moments)
    .fetch_one(executor)
    .await
}

/// 按内容哈希查找图片，存在时返回记录 id
pub async fn find_image_by_hash(executor: &SqlitePool, hash: &[u8]) -> Result<Option<i64>> {
    sqlx::query_scalar(
        r#"
        SELECT id FROM image WHERE hash = ?
        "#,
    )
    .bind(hash)
    .fetch_optional(executor)
    .await
}

/// 按 id 获取图片记录
pub async fn get_image(executor: &SqlitePool, id: i64) -> Result<Option<ImageRecord>> {
    sqlx::query_as(
        r#"
        SELECT id, hash, filename, category, created_at FROM image WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// 重复图片覆盖入库时只更新文件名与分类
pub async fn update_image_meta(
    executor: &SqlitePool,
    hash: &[u8],
    filename: &str,
    category: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE image SET filename = ?, category = ? WHERE hash = ?
        "#,
    )
    .bind(filename)
    .bind(category)
    .bind(hash)
    .execute(executor)
    .await?;

    Ok(())
}

/// 读取特征快照，可按分类过滤
///
/// NOTE: 按 id 升序返回，评分排序的平局规则依赖这个顺序
pub async fn get_features(
    executor: &SqlitePool,
    category: Option<&str>,
) -> Result<Vec<FeatureRecord>> {
    match category {
        Some(category) => {
            sqlx::query_as(
                r#"
                SELECT id, category, histogram, palette, texture, moments
                FROM image WHERE category = ? ORDER BY id ASC
                "#,
            )
            .bind(category)
            .fetch_all(executor)
            .await
        }
        None => {
            sqlx::query_as(
                r#"
                SELECT id, category, histogram, palette, texture, moments
                FROM image ORDER BY id ASC
                "#,
            )
            .fetch_all(executor)
            .await
        }
    }
}

/// 查询数据库中的图片数量
pub async fn count_images(executor: &SqlitePool) -> Result<i64> {
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM image
        "#,
    )
    .fetch_one(executor)
    .await
}
