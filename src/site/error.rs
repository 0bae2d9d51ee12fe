use std::path::PathBuf;
use thiserror::Error;

/// 站点内容加载错误
#[derive(Error, Debug)]
pub enum SiteError {
    #[error("内容目录不存在: {path}")]
    ContentDirMissing { path: PathBuf },

    #[error("缺少站点根页面 _index.md: {path}")]
    RootPageMissing { path: PathBuf },

    #[error("博客文章缺少发布日期: {path}")]
    MissingDate { path: PathBuf },

    #[error("发布日期无法解析: {path} ({value})")]
    InvalidDate { path: PathBuf, value: String },

    #[error("字段 {field} 超出 {limit} 字符上限: {path}")]
    FieldTooLong {
        field: &'static str,
        limit: usize,
        path: PathBuf,
    },

    #[error("页面类型无法识别: {path} ({value})")]
    UnknownPageType { path: PathBuf, value: String },
}
