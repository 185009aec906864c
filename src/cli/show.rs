use anyhow::Result;
use clap::Parser;

use crate::cli::SubCommandExtend;
use crate::config::{ExtractOptions, FeatureConfig, Opts};
use crate::extract::FeatureExtractor;

#[derive(Parser, Debug, Clone)]
pub struct ShowCommand {
    #[command(flatten)]
    pub extract: ExtractOptions,
    /// 图片路径
    pub image: String,
    /// 打印完整直方图，而不是摘要
    #[arg(long)]
    pub full: bool,
}

impl SubCommandExtend for ShowCommand {
    async fn run(&self, _opts: &Opts) -> Result<()> {
        let mut extractor = FeatureExtractor::new(FeatureConfig::default());
        if let Some(seed) = self.extract.seed {
            extractor = extractor.with_seed(seed);
        }
        let descriptors = extractor.extract_file(&self.image)?;

        let nonzero = descriptors.histogram.iter().filter(|v| **v > 0.0).count();
        println!("直方图非零 bin 数: {} / {}", nonzero, descriptors.histogram.len());
        if self.full {
            println!("直方图: {:?}", descriptors.histogram);
        }

        println!("主色:");
        for color in &descriptors.palette {
            println!("  r = {:.1}, g = {:.1}, b = {:.1}", color[0], color[1], color[2]);
        }

        println!("纹理能量 (均值/方差):");
        for pair in descriptors.texture.chunks(2) {
            println!("  mean = {:.2}, var = {:.2}", pair[0], pair[1]);
        }

        println!("Hu 矩:");
        for (i, m) in descriptors.moments.iter().enumerate() {
            println!("  h{} = {:e}", i + 1, m);
        }

        Ok(())
    }
}
