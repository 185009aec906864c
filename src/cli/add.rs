use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressIterator};
use log::info;
use regex::Regex;
use tokio::sync::mpsc::{Sender, channel};
use tokio::task::{JoinHandle, block_in_place, spawn_blocking};
use walkdir::WalkDir;

use crate::VSDBBuilder;
use crate::cli::SubCommandExtend;
use crate::config::{ExtractOptions, Opts};
use crate::utils::pb_style;

#[derive(Parser, Debug, Clone)]
pub struct AddCommand {
    #[command(flatten)]
    pub extract: ExtractOptions,
    /// 图片所在目录
    pub path: PathBuf,
    /// 图片分类，不填则使用图片所在目录的名字
    #[arg(short = 'C', long)]
    pub category: Option<String>,
    /// 扫描的文件后缀名，多个后缀用逗号分隔
    #[arg(short, long, default_value = "jpg,png,webp")]
    pub suffix: String,
    /// 如果图片已添加，是否覆盖旧的记录
    #[arg(long)]
    pub overwrite: bool,
}

impl SubCommandExtend for AddCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let re_suf = format!("(?i)({})", self.suffix.replace(',', "|"));
        let re_suf = Regex::new(&re_suf).expect("failed to build regex");

        let db = Arc::new(
            VSDBBuilder::new(opts.conf_dir.clone()).seed(self.extract.seed).open().await?,
        );

        let pb = ProgressBar::no_length().with_style(pb_style());

        // task1: 扫描目录，读取文件并计算哈希
        let (hash_tx, mut hash_rx) = channel(num_cpus::get() * 2);
        let task1_hash: JoinHandle<Result<()>> = tokio::spawn({
            let path = self.path.clone();
            let category = self.category.clone();
            let pb = pb.clone();
            async move { scan_directory(path, category, hash_tx, re_suf, pb).await }
        });

        // task2: 检查已添加图片
        let (filter_tx, mut filter_rx) = channel(num_cpus::get() * 2);
        let task2_filter: JoinHandle<Result<()>> = tokio::spawn({
            let pb = pb.clone();
            let db = db.clone();
            let overwrite = self.overwrite;
            async move {
                while let Some((entry, category, data, hash)) = hash_rx.recv().await {
                    if db.check_hash(&hash).await?.is_some() {
                        if overwrite {
                            db.update_image_meta(&hash, &entry, &category).await?;
                            pb.set_message(format!("更新图片记录: {}", entry));
                        } else {
                            pb.set_message(format!("跳过图片: {}", entry));
                        }
                        pb.inc(1);
                    } else {
                        filter_tx.send((entry, category, data, hash)).await?;
                    }
                }
                Ok(())
            }
        });

        // task3: 特征提取
        let (feature_tx, mut feature_rx) = channel(num_cpus::get() * 2);
        let task3_extract = spawn_blocking({
            let pb = pb.clone();
            let db = db.clone();
            move || {
                let pb = &pb;
                let feature_tx = &feature_tx;
                let extractor = db.extractor();
                rayon::scope(|s| {
                    while let Some((entry, category, data, hash)) = filter_rx.blocking_recv() {
                        s.spawn(move |_| match extractor.extract_bytes(&data) {
                            Ok(descriptors) => {
                                feature_tx
                                    .blocking_send((entry, category, hash, descriptors))
                                    .unwrap();
                            }
                            Err(e) => {
                                pb.println(format!("特征提取失败: {}: {}", entry, e));
                                pb.inc(1);
                            }
                        });
                    }
                });
            }
        });

        // task4: 添加图片
        let task4_add: JoinHandle<Result<()>> = tokio::spawn({
            let pb = pb.clone();
            let db = db.clone();
            async move {
                while let Some((entry, category, hash, descriptors)) = feature_rx.recv().await {
                    db.add_image(&entry, &category, &hash, &descriptors, None).await?;
                    pb.set_message(entry);
                    pb.inc(1);
                }
                Ok(())
            }
        });

        // 等待所有任务完成
        let _ = tokio::try_join!(task1_hash, task2_filter, task3_extract, task4_add);

        pb.finish_with_message("图片添加完成");

        Ok(())
    }
}

async fn scan_directory(
    path: impl AsRef<Path>,
    category: Option<String>,
    hash_tx: Sender<(String, String, Vec<u8>, Vec<u8>)>,
    re_suf: Regex,
    pb: ProgressBar,
) -> Result<()> {
    info!("开始扫描目录: {}", path.as_ref().display());
    let pb2 = ProgressBar::no_length().with_style(pb_style());
    let entries = WalkDir::new(path)
        .into_iter()
        .progress_with(pb2)
        .filter_map(|entry| {
            entry.ok().and_then(|entry| {
                let path = entry.path();
                if path.is_file() {
                    if let Some(ext) = path.extension() {
                        if re_suf.is_match(&ext.to_string_lossy()) {
                            return Some(path.to_path_buf());
                        }
                    }
                }
                None
            })
        })
        .collect::<Vec<_>>();
    info!("扫描完成，共 {} 张图片", entries.len());

    pb.set_length(entries.len() as u64);

    for entry in entries {
        let data = tokio::fs::read(&entry).await?;
        let hash = block_in_place(|| blake3::hash(&data));
        let category = category_for(&entry, category.as_deref());
        let name = entry.to_string_lossy().to_string();
        hash_tx.send((name, category, data, hash.as_bytes().to_vec())).await?;
    }
    Ok(())
}

/// 未指定分类时，用图片所在目录的名字作为分类
fn category_for(path: &Path, explicit: Option<&str>) -> String {
    if let Some(category) = explicit {
        return category.to_string();
    }
    path.parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "uncategorized".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_for() {
        assert_eq!(category_for(Path::new("/data/cats/1.jpg"), None), "cats");
        assert_eq!(category_for(Path::new("/data/cats/1.jpg"), Some("dogs")), "dogs");
        assert_eq!(category_for(Path::new("1.jpg"), None), "uncategorized");
    }
}
