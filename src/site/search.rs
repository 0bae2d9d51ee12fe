use crate::models::{PageContent, PageId};
use crate::site::tree::PageTree;
use crate::utils;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

/// 搜索索引项
#[derive(Debug, Clone, Serialize)]
pub struct SearchIndexItem {
    /// 页面编号
    pub id: PageId,
    /// 页面标题
    pub title: String,
    /// 页面 URL
    pub url: String,
    /// 简介
    pub intro: String,
    /// 索引正文（去掉 Markdown 标记的纯文本）
    pub content: String,
    /// 首次发布时间（用于并列命中时排序）
    pub first_published_at: DateTime<Utc>,
}

/// 内存搜索索引
///
/// 加载站点时在已发布页面上建立，随站点一起整体替换。
#[derive(Debug)]
pub struct SearchIndex {
    items: Vec<SearchIndexItem>,
}

impl SearchIndex {
    /// 在页面树上建索引，只收已发布页面
    pub fn build(tree: &PageTree) -> Self {
        let mut items = Vec::new();
        for node in tree.pages() {
            if !node.live {
                continue;
            }
            let (intro, body) = indexed_text(&node.content);
            items.push(SearchIndexItem {
                id: node.id,
                title: node.title.clone(),
                url: tree.url(node.id),
                intro,
                content: utils::markdown::plain_text(&body),
                first_published_at: node.first_published_at,
            });
        }
        debug!("搜索索引收录了 {} 个页面", items.len());
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 查询：大小写不敏感的子串匹配
    ///
    /// 排名按加权命中次数（标题 x3、简介 x2、正文 x1），
    /// 并列时新发布的排前面。空查询返回空结果。
    pub fn search(&self, query: &str) -> Vec<&SearchIndexItem> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<(usize, &SearchIndexItem)> = self
            .items
            .iter()
            .filter_map(|item| {
                let score = count_matches(&item.title.to_lowercase(), &needle) * 3
                    + count_matches(&item.intro.to_lowercase(), &needle) * 2
                    + count_matches(&item.content.to_lowercase(), &needle);
                (score > 0).then_some((score, item))
            })
            .collect();

        hits.sort_by(|a, b| {
            b.0.cmp(&a.0)
                .then(b.1.first_published_at.cmp(&a.1.first_published_at))
        });
        hits.into_iter().map(|(_, item)| item).collect()
    }
}

fn count_matches(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

/// 每种页面类型进索引的文本：简介加正文
fn indexed_text(content: &PageContent) -> (String, String) {
    match content {
        PageContent::Home(home) => (String::new(), home.hero_body.clone()),
        PageContent::Standard(page) => (page.hero_text.clone(), page.body.clone()),
        PageContent::BlogIndex(index) => (index.intro.clone(), index.hero_body.clone()),
        PageContent::Blog(blog) => (blog.intro.clone(), blog.body.clone()),
    }
}
