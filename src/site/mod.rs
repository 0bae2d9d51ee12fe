pub mod context;
pub mod error;
pub mod loader;
pub mod pagination;
pub mod query;
pub mod routes;
pub mod search;
pub mod tree;

pub use context::ContextBuilder;
pub use error::SiteError;
pub use loader::{load_site, ImageStore};
pub use pagination::{PageSlice, Paginator};
pub use query::{get_blogs, PostQuery};
pub use routes::{route_page, RouteOutcome};
pub use search::SearchIndex;
pub use tree::{PageQuery, PageTree};

use crate::models::SnippetStore;

/// 加载完成的站点：页面树、片段、图片库、搜索索引
///
/// 整体只读；重新加载时在引擎里整个换掉。
#[derive(Debug)]
pub struct Site {
    pub tree: PageTree,
    pub snippets: SnippetStore,
    pub images: ImageStore,
    pub search: SearchIndex,
}
