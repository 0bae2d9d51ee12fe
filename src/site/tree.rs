use crate::models::{PageContent, PageId, PageNode, TagInfo};
use crate::utils;
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::warn;

/// 内存中的页面树
///
/// 加载器把内容目录整理成一棵树后，所有站点查询都落在这里：
/// 按路径解析页面、生成 URL、遍历子树、汇总标签。
#[derive(Debug)]
pub struct PageTree {
    nodes: Vec<PageNode>,
    children: Vec<Vec<PageId>>,
    root: PageId,
}

impl PageTree {
    /// 从节点列表建树，子节点顺序保持加载顺序
    pub fn new(nodes: Vec<PageNode>) -> Self {
        debug_assert!(!nodes.is_empty(), "页面树不能为空");
        let mut children = vec![Vec::new(); nodes.len()];
        let mut root = 0;
        for node in &nodes {
            match node.parent {
                Some(parent) => children[parent].push(node.id),
                None => root = node.id,
            }
        }
        Self {
            nodes,
            children,
            root,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 根节点（站点首页）
    pub fn root(&self) -> &PageNode {
        &self.nodes[self.root]
    }

    pub fn node(&self, id: PageId) -> &PageNode {
        &self.nodes[id]
    }

    pub fn get(&self, id: PageId) -> Option<&PageNode> {
        self.nodes.get(id)
    }

    pub fn parent(&self, id: PageId) -> Option<&PageNode> {
        self.nodes[id].parent.map(|parent| &self.nodes[parent])
    }

    /// 所有节点，按编号顺序
    pub fn pages(&self) -> impl Iterator<Item = &PageNode> {
        self.nodes.iter()
    }

    /// 全树查询（不含顺序保证之外的过滤）
    pub fn all(&self) -> PageQuery<'_> {
        PageQuery {
            tree: self,
            ids: (0..self.nodes.len()).collect(),
        }
    }

    /// 直接子页面
    pub fn children(&self, id: PageId) -> PageQuery<'_> {
        PageQuery {
            tree: self,
            ids: self.children[id].clone(),
        }
    }

    /// 子树中的所有后代（不含自身），深度优先
    pub fn descendants(&self, id: PageId) -> PageQuery<'_> {
        let mut ids = Vec::new();
        let mut stack: Vec<PageId> = self.children[id].iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            ids.push(current);
            stack.extend(self.children[current].iter().rev());
        }
        PageQuery { tree: self, ids }
    }

    /// 页面的站点内 URL：根节点为 `/`，其余为 `/slug/../`
    pub fn url(&self, id: PageId) -> String {
        let mut slugs = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = &self.nodes[node_id];
            if node.parent.is_some() {
                slugs.push(node.slug.as_str());
            }
            current = node.parent;
        }
        if slugs.is_empty() {
            return "/".to_string();
        }
        slugs.reverse();
        format!("/{}/", slugs.join("/"))
    }

    /// 按请求路径解析页面
    ///
    /// 从根节点开始逐段匹配子页面别名，返回最深能匹配到的页面
    /// 和剩余未消费的路径段。剩余段交给页面自己的子路由处理，
    /// 页面没有子路由时由视图层按 404 处理。
    pub fn resolve<'p>(&self, path: &'p str) -> (PageId, Vec<&'p str>) {
        let segments = utils::split_path(path);
        let mut current = self.root;
        let mut consumed = 0;
        for segment in &segments {
            match self.child_by_slug(current, segment) {
                Some(child) => {
                    current = child;
                    consumed += 1;
                }
                None => break,
            }
        }
        (current, segments[consumed..].to_vec())
    }

    /// 按站点内路径查找页面，路径必须完整匹配
    pub fn page_at(&self, path: &str) -> Option<&PageNode> {
        let (id, rest) = self.resolve(path);
        rest.is_empty().then(|| &self.nodes[id])
    }

    fn child_by_slug(&self, id: PageId, slug: &str) -> Option<PageId> {
        self.children[id]
            .iter()
            .copied()
            .find(|&child| self.nodes[child].slug == slug)
    }

    /// 博客列表页（按文档顺序取第一个）
    pub fn blog_index(&self) -> Option<&PageNode> {
        self.nodes
            .iter()
            .find(|node| matches!(node.content, PageContent::BlogIndex(_)))
    }

    /// 汇总所有已发布文章的标签
    ///
    /// 标签没有独立的存储，完全由文章前置元数据推导：
    /// 下架一篇文章，它的标签计数随之变化。
    pub fn tags(&self) -> Vec<TagInfo> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for node in &self.nodes {
            if !node.live {
                continue;
            }
            if let Some(blog) = node.content.as_blog() {
                for tag in &blog.tags {
                    *counts.entry(tag.clone()).or_insert(0) += 1;
                }
            }
        }
        counts
            .into_iter()
            .map(|(name, post_count)| TagInfo {
                slug: utils::slugify(&name),
                name,
                post_count,
            })
            .collect()
    }
}

/// 页面集合上的链式查询
pub struct PageQuery<'a> {
    tree: &'a PageTree,
    ids: Vec<PageId>,
}

impl<'a> PageQuery<'a> {
    /// 只保留已发布的页面
    pub fn live(mut self) -> Self {
        let tree = self.tree;
        self.ids.retain(|&id| tree.nodes[id].live);
        self
    }

    /// 按字段排序，前缀 `-` 表示倒序
    ///
    /// 支持 `first_published_at`、`date`、`title`。
    /// 未知字段只记一条警告，顺序保持不变。
    pub fn order_by(mut self, key: &str) -> Self {
        let (field, descending) = match key.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (key, false),
        };
        let tree = self.tree;
        let compare: fn(&PageNode, &PageNode) -> Ordering = match field {
            "first_published_at" => |a, b| a.first_published_at.cmp(&b.first_published_at),
            "date" => |a, b| date_key(a).cmp(&date_key(b)),
            "title" => |a, b| a.title.cmp(&b.title),
            other => {
                warn!("未知的排序字段，忽略: {}", other);
                return self;
            }
        };
        self.ids.sort_by(|&a, &b| {
            let ordering = compare(&tree.nodes[a], &tree.nodes[b]).then(a.cmp(&b));
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
        self
    }

    pub fn count(&self) -> usize {
        self.ids.len()
    }

    pub fn first(&self) -> Option<&'a PageNode> {
        self.ids.first().map(|&id| &self.tree.nodes[id])
    }

    pub fn nodes(self) -> Vec<&'a PageNode> {
        self.ids
            .into_iter()
            .map(|id| &self.tree.nodes[id])
            .collect()
    }

    pub fn ids(&self) -> &[PageId] {
        &self.ids
    }
}

/// 排序用的日期：文章用发布日期，其余页面退回首次发布时间
fn date_key(node: &PageNode) -> NaiveDate {
    node.content
        .as_blog()
        .map(|blog| blog.date)
        .unwrap_or_else(|| node.first_published_at.date_naive())
}
