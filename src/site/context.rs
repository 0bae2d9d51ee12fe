use crate::models::{BlogPage, Config, ImageRef, PageContent, PageNode, PageRef};
use crate::site::pagination::{PageSlice, Paginator};
use crate::site::search::SearchIndexItem;
use crate::site::Site;
use crate::utils;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use tera::Context;

/// 渲染上下文装配
///
/// 每种页面类型算出自己的上下文（站点信息、页面对象、列表、分页），
/// 路由层拿到 Context 后交给模板渲染。
pub struct ContextBuilder<'a> {
    site: &'a Site,
    config: &'a Config,
}

impl<'a> ContextBuilder<'a> {
    pub fn new(site: &'a Site, config: &'a Config) -> Self {
        Self { site, config }
    }

    /// 按页面类型分派
    pub fn for_page(&self, node: &PageNode, page_param: Option<&str>) -> Context {
        match &node.content {
            PageContent::Home(_) | PageContent::Standard(_) => self.base_context(node),
            PageContent::BlogIndex(_) => self.blog_index(node, page_param),
            PageContent::Blog(blog) => self.blog(node, blog),
        }
    }

    /// 博客列表页：已发布子文章按首次发布时间倒序，再分页
    pub fn blog_index(&self, node: &PageNode, page_param: Option<&str>) -> Context {
        let posts = self
            .site
            .tree
            .children(node.id)
            .live()
            .order_by("-first_published_at")
            .nodes();
        let mut context = self.base_context(node);
        self.insert_listing(&mut context, posts, page_param);
        context
    }

    /// 标签、分类子视图：过滤好的文章集合加一个说明对象
    pub fn filtered_index(
        &self,
        node: &PageNode,
        posts: Vec<&PageNode>,
        page_param: Option<&str>,
        key: &str,
        detail: Value,
    ) -> Context {
        let mut context = self.base_context(node);
        self.insert_listing(&mut context, posts, page_param);
        context.insert(key, &detail);
        context
    }

    /// 文章页：相册、主图、父列表页、带 URL 的标签
    pub fn blog(&self, node: &PageNode, blog: &BlogPage) -> Context {
        let mut context = self.base_context(node);

        let gallery: Vec<Value> = blog
            .gallery
            .iter()
            .map(|item| {
                json!({
                    "image": self.image_value(item.image.as_ref()),
                    "caption": item.caption,
                    "order": item.order,
                })
            })
            .collect();
        context.insert("gallery", &gallery);
        context.insert("main_image", &self.image_value(blog.main_image()));

        // 直接父页面的最具体类型
        let parent = self
            .site
            .tree
            .parent(node.id)
            .map(|parent| self.page_value(parent))
            .unwrap_or(Value::Null);
        context.insert("blog_page", &parent);

        context.insert("tags", &self.blog_tags(node, blog));
        context.insert(
            "date_display",
            &blog.date.format(&self.config.date_format()).to_string(),
        );
        context
    }

    /// 分类不存在时的兜底列表：全部分类
    pub fn all_categories(&self, node: &PageNode) -> Context {
        let index_url = self.site.tree.url(node.id);
        let categories: Vec<Value> = self
            .site
            .snippets
            .categories
            .iter()
            .map(|category| {
                json!({
                    "name": category.name,
                    "icon": self.image_value(category.icon.as_ref()),
                    "url": utils::join_url(&index_url, &["categories", &category.name]),
                    "post_count": category.blogs(&self.site.tree).len(),
                })
            })
            .collect();
        let mut context = self.base_context(node);
        context.insert("categories", &categories);
        context
    }

    /// 分类的上下文对象
    pub fn category_value(&self, category: &crate::models::BlogCategory) -> Value {
        json!({
            "name": category.name,
            "icon": self.image_value(category.icon.as_ref()),
        })
    }

    /// 搜索结果页
    pub fn search(
        &self,
        query: &str,
        results: Vec<&SearchIndexItem>,
        page_param: Option<&str>,
    ) -> Context {
        let mut context = Context::new();
        context.insert("site", &self.site_value());
        context.insert(
            "page",
            &json!({ "title": "Search", "url": "/search/", "kind": "search" }),
        );
        context.insert("messages", &Vec::<String>::new());
        context.insert("query", query);

        let paginator = Paginator::new(results, self.config.per_page());
        let slice = paginator.get_page(page_param);
        let items: Vec<Value> = slice
            .items
            .iter()
            .map(|item| {
                json!({
                    "title": item.title,
                    "url": item.url,
                    "intro": item.intro,
                })
            })
            .collect();
        context.insert("results", &items);
        context.insert("pagination", &pagination_value(&slice));
        context.insert(
            "now",
            &Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        );
        context
    }

    /// 404 页的上下文
    pub fn not_found(&self) -> Context {
        let mut context = Context::new();
        context.insert("site", &self.site_value());
        context.insert(
            "page",
            &json!({ "title": "Not found", "url": "", "kind": "not_found" }),
        );
        context.insert("messages", &Vec::<String>::new());
        context.insert(
            "now",
            &Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        );
        context
    }

    /// 所有页面共享的基础上下文
    fn base_context(&self, node: &PageNode) -> Context {
        let mut context = Context::new();
        context.insert("site", &self.site_value());
        context.insert("page", &self.page_value(node));
        // 服务器随后用请求里带的消息覆盖
        context.insert("messages", &Vec::<String>::new());
        context.insert(
            "now",
            &Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        );
        context
    }

    fn insert_listing(
        &self,
        context: &mut Context,
        posts: Vec<&PageNode>,
        page_param: Option<&str>,
    ) {
        let paginator = Paginator::new(posts, self.config.per_page());
        let slice = paginator.get_page(page_param);
        let items: Vec<Value> = slice
            .items
            .iter()
            .map(|post| self.page_value(post))
            .collect();
        context.insert("posts", &items);
        context.insert("pagination", &pagination_value(&slice));
    }

    fn site_value(&self) -> Value {
        json!({
            "title": self.config.title,
            "description": self.config.description.clone().unwrap_or_default(),
            "author": self.config.author.clone().unwrap_or_default(),
            "language": self.config.language.clone().unwrap_or_else(|| "en".to_string()),
            "url": self.config.url.clone().unwrap_or_default(),
            "per_page": self.config.per_page(),
        })
    }

    /// 页面对象：公共字段加最具体类型的字段平铺，引用解析成 URL
    fn page_value(&self, node: &PageNode) -> Value {
        let mut page = serde_json::Map::new();
        page.insert("id".to_string(), json!(node.id));
        page.insert("title".to_string(), json!(node.title));
        page.insert("slug".to_string(), json!(node.slug));
        page.insert("url".to_string(), json!(self.site.tree.url(node.id)));
        page.insert("live".to_string(), json!(node.live));
        page.insert("kind".to_string(), json!(node.content.kind()));
        page.insert(
            "first_published_at".to_string(),
            json!(node
                .first_published_at
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()),
        );

        if let Value::Object(specific) = specific_value(&node.content) {
            page.extend(specific);
        }

        // 引用类字段换成解析结果
        match &node.content {
            PageContent::Home(home) => {
                page.insert(
                    "hero_image".to_string(),
                    self.image_value(home.hero_image.as_ref()),
                );
                page.insert(
                    "hero_cta_link".to_string(),
                    self.link_value(home.hero_cta_link.as_ref()),
                );
                page.insert(
                    "feature_section_1_page".to_string(),
                    self.link_value(home.feature_section_1_page.as_ref()),
                );
                page.insert(
                    "feature_section_2_page".to_string(),
                    self.link_value(home.feature_section_2_page.as_ref()),
                );
            }
            PageContent::Standard(standard) => {
                page.insert(
                    "hero_image".to_string(),
                    self.image_value(standard.hero_image.as_ref()),
                );
            }
            PageContent::BlogIndex(index) => {
                page.insert(
                    "hero_image".to_string(),
                    self.image_value(index.hero_image.as_ref()),
                );
            }
            PageContent::Blog(blog) => {
                page.insert(
                    "intro".to_string(),
                    json!(blog.intro),
                );
                page.insert(
                    "date_display".to_string(),
                    json!(blog.date.format(&self.config.date_format()).to_string()),
                );
                page.insert(
                    "main_image".to_string(),
                    self.image_value(blog.main_image()),
                );
            }
        }

        Value::Object(page)
    }

    /// 图片引用 → /media/ URL，文件已删除时为 null
    fn image_value(&self, image: Option<&ImageRef>) -> Value {
        image
            .and_then(|image| self.site.images.resolve(image))
            .map(Value::String)
            .unwrap_or(Value::Null)
    }

    /// 页面引用 → 标题加 URL，目标缺失或未发布时为 null
    fn link_value(&self, link: Option<&PageRef>) -> Value {
        let Some(page_ref) = link else {
            return Value::Null;
        };
        match self.site.tree.page_at(&page_ref.0) {
            Some(target) if target.live => json!({
                "title": target.title,
                "url": self.site.tree.url(target.id),
            }),
            _ => Value::Null,
        }
    }

    /// 文章标签，带构造好的归档 URL
    fn blog_tags(&self, node: &PageNode, blog: &BlogPage) -> Vec<Value> {
        let parent_url = node
            .parent
            .map(|parent| self.site.tree.url(parent))
            .unwrap_or_else(|| "/".to_string());
        blog.tags
            .iter()
            .map(|name| {
                let slug = utils::slugify(name);
                json!({
                    "name": name,
                    "url": utils::join_url(&parent_url, &["tags", &slug]),
                    "slug": slug,
                })
            })
            .collect()
    }
}

fn specific_value(content: &PageContent) -> Value {
    fn to_value<T: Serialize>(value: &T) -> Value {
        serde_json::to_value(value).unwrap_or(Value::Null)
    }
    match content {
        PageContent::Home(home) => to_value(home),
        PageContent::Standard(page) => to_value(page),
        PageContent::BlogIndex(index) => to_value(index),
        PageContent::Blog(blog) => to_value(blog),
    }
}

fn pagination_value<T>(slice: &PageSlice<'_, T>) -> Value {
    json!({
        "number": slice.number,
        "num_pages": slice.num_pages,
        "count": slice.count,
        "has_previous": slice.has_previous(),
        "has_next": slice.has_next(),
        "previous_page_number": slice.previous_page_number(),
        "next_page_number": slice.next_page_number(),
    })
}
