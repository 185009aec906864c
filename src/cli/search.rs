use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::debug;
use tokio::task::block_in_place;

use crate::VSDBBuilder;
use crate::cli::SubCommandExtend;
use crate::config::{ExtractOptions, Opts, SearchOptions};
use crate::score::SimilarityResult;

#[derive(Parser, Debug, Clone)]
pub struct SearchCommand {
    #[command(flatten)]
    pub extract: ExtractOptions,
    #[command(flatten)]
    pub search: SearchOptions,
    /// 被搜索的图片路径
    pub image: String,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for SearchCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let db = VSDBBuilder::new(opts.conf_dir.clone()).seed(self.extract.seed).open().await?;

        let descriptors = block_in_place(|| db.extractor().extract_file(&self.image))?;

        let result =
            db.search(&descriptors, self.search.category.as_deref(), self.search.count).await?;

        debug!("命中 {} 条结果", result.len());

        print_result(&result, self)
    }
}

fn print_result(result: &[SimilarityResult], opts: &SearchCommand) -> Result<()> {
    match opts.output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result)?)
        }
        OutputFormat::Table => {
            for item in result {
                println!("{:.4}\t{}\t{}", item.score, item.id, item.category);
            }
        }
    }
    Ok(())
}

#[derive(ValueEnum, Debug, Clone)]
pub enum OutputFormat {
    Json,
    Table,
}
