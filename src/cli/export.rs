use anyhow::Result;
use clap::Parser;
use log::info;
use ndarray_npy::write_npy;

use crate::cli::SubCommandExtend;
use crate::{Opts, VSDBBuilder};

#[derive(Parser, Debug, Clone)]
pub struct ExportCommand {
    /// 输出文件路径
    #[arg(long, default_value = "features.npy")]
    pub output: String,
}

impl SubCommandExtend for ExportCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let db = VSDBBuilder::new(opts.conf_dir.clone()).open().await?;
        let data = db.export().await?;
        write_npy(&self.output, &data)?;
        info!("导出成功: {} 条直方图", data.nrows());
        Ok(())
    }
}
