use crate::models::{BlogCategory, PageNode};
use crate::site::tree::PageTree;
use crate::utils;
use std::cmp::Ordering;
use tracing::warn;

/// 已发布文章上的链式筛选
///
/// 对应列表页取文章的查询链：先收集全树的已发布文章，
/// 再按标签或分类过滤、按字段排序。
pub struct PostQuery<'a> {
    posts: Vec<&'a PageNode>,
}

impl<'a> PostQuery<'a> {
    /// 全树范围内的已发布文章，按文档顺序
    pub fn new(tree: &'a PageTree) -> Self {
        let posts = tree
            .pages()
            .filter(|node| node.live && node.content.as_blog().is_some())
            .collect();
        Self { posts }
    }

    /// 限定为某个页面的后代
    pub fn descendant_of(mut self, tree: &PageTree, ancestor: crate::models::PageId) -> Self {
        self.posts.retain(|node| {
            let mut current = node.parent;
            while let Some(id) = current {
                if id == ancestor {
                    return true;
                }
                current = tree.node(id).parent;
            }
            false
        });
        self
    }

    /// 按键值对过滤
    ///
    /// 支持的键：`tag`（标签别名）、`category`（分类名）。
    /// 未知的键只记一条警告，集合保持不变。
    pub fn filter(mut self, key: &str, value: &str) -> Self {
        match key {
            "tag" => {
                self.posts.retain(|node| {
                    node.content
                        .as_blog()
                        .map(|blog| blog.tags.iter().any(|tag| utils::slugify(tag) == value))
                        .unwrap_or(false)
                });
            }
            "category" => {
                self.posts.retain(|node| {
                    node.content
                        .as_blog()
                        .map(|blog| blog.categories.iter().any(|name| name == value))
                        .unwrap_or(false)
                });
            }
            other => {
                warn!("未知的过滤键，忽略: {}", other);
            }
        }
        self
    }

    /// 按字段排序，前缀 `-` 表示倒序
    pub fn order_by(mut self, key: &str) -> Self {
        let (field, descending) = match key.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (key, false),
        };
        let compare: fn(&PageNode, &PageNode) -> Ordering = match field {
            "date" => |a, b| {
                let date_a = a.content.as_blog().map(|blog| blog.date);
                let date_b = b.content.as_blog().map(|blog| blog.date);
                date_a.cmp(&date_b)
            },
            "first_published_at" => |a, b| a.first_published_at.cmp(&b.first_published_at),
            "title" => |a, b| a.title.cmp(&b.title),
            other => {
                warn!("未知的排序字段，忽略: {}", other);
                return self;
            }
        };
        self.posts.sort_by(|a, b| {
            let ordering = compare(a, b).then(a.id.cmp(&b.id));
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
        self
    }

    pub fn count(&self) -> usize {
        self.posts.len()
    }

    pub fn posts(self) -> Vec<&'a PageNode> {
        self.posts
    }
}

/// 路由子视图共用的取文章助手
///
/// 限定在列表页的后代范围内，逐个应用过滤键值对，按日期倒序返回。
pub fn get_blogs<'a>(
    tree: &'a PageTree,
    index: crate::models::PageId,
    filters: &[(&str, &str)],
) -> Vec<&'a PageNode> {
    let mut query = PostQuery::new(tree).descendant_of(tree, index);
    for (key, value) in filters {
        query = query.filter(key, value);
    }
    query.order_by("-date").posts()
}

impl BlogCategory {
    /// 该分类下的已发布文章，按日期倒序，每次访问重新计算
    pub fn blogs<'a>(&self, tree: &'a PageTree) -> Vec<&'a PageNode> {
        PostQuery::new(tree)
            .filter("category", &self.name)
            .order_by("-date")
            .posts()
    }
}
