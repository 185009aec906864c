use std::sync::Arc;

use crate::cli::server::ServerCommand;
use crate::config::SearchOptions;
use crate::vsdb::VSDB;

/// 应用状态
pub struct AppState {
    /// 特征数据库
    pub db: VSDB,
    /// 搜索配置选项
    pub search: SearchOptions,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(db: VSDB, opts: &ServerCommand) -> Arc<Self> {
        Arc::new(AppState { db, search: opts.search.clone() })
    }
}
