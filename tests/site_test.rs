// 端到端测试：在临时目录里搭一个完整站点（内容、片段、图片、默认主题），
// 用引擎加载后走真实的路由和模板渲染。

use rust_wagtail::site::ContextBuilder;
use rust_wagtail::{route_page, Engine, RouteOutcome};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// init 命令内嵌的默认主题，测试直接取同一份文件
mod theme_files {
    pub const LAYOUT: &str = include_str!("../embed/theme/default/layout/layout.html");
    pub const HOME: &str = include_str!("../embed/theme/default/layout/home_page.html");
    pub const STANDARD: &str = include_str!("../embed/theme/default/layout/standard_page.html");
    pub const BLOG_INDEX: &str = include_str!("../embed/theme/default/layout/blog_index_page.html");
    pub const BLOG: &str = include_str!("../embed/theme/default/layout/blog_page.html");
    pub const PAGINATION: &str = include_str!("../embed/theme/default/layout/pagination.html");
    pub const ALL_CATEGORIES: &str =
        include_str!("../embed/theme/default/layout/all_categories.html");
    pub const SEARCH: &str = include_str!("../embed/theme/default/layout/search.html");
    pub const NOT_FOUND: &str = include_str!("../embed/theme/default/layout/404.html");
}

fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn install_theme(root: &Path) {
    let templates = [
        ("layout.html", theme_files::LAYOUT),
        ("home_page.html", theme_files::HOME),
        ("standard_page.html", theme_files::STANDARD),
        ("blog_index_page.html", theme_files::BLOG_INDEX),
        ("blog_page.html", theme_files::BLOG),
        ("pagination.html", theme_files::PAGINATION),
        ("all_categories.html", theme_files::ALL_CATEGORIES),
        ("search.html", theme_files::SEARCH),
        ("404.html", theme_files::NOT_FOUND),
    ];
    for (name, content) in templates {
        write_file(root, &format!("themes/default/layout/{}", name), content);
    }
    write_file(root, "themes/default/source/css/style.css", "body {}\n");
}

/// 面包房示例站：首页、关于页、博客列表加八篇文章（每页 3 篇 → 3 页）
fn scaffold_bakery_site(root: &Path) {
    write_file(
        root,
        "_config.yml",
        r#"title: Crusty Corner
description: 'Notes from a home bakery'
language: en
url: http://localhost:4000
theme: default
date_format: '%d %B %Y'
per_page: 3
debug: false
allowed_hosts:
  - '*'
"#,
    );

    install_theme(root);

    write_file(
        root,
        "content/_index.md",
        r#"---
type: home
title: Home
hero_title: Welcome to Crusty Corner
hero_cta_text: Read the blog
hero_cta_link: /blog/
feature_section_1: Fresh from the oven
feature_section_1_page: /blog/
---

Everything here is baked twice, once in the oven and once in Markdown.
"#,
    );
    write_file(
        root,
        "content/about.md",
        r#"---
type: standard
title: About
hero_title: About the bakery
hero_text: Who we are and why we bake.
---

We are a tiny bakery that writes more than it sells.
"#,
    );
    write_file(
        root,
        "content/blog/_index.md",
        r#"---
type: blog_index
title: Blog
intro: Bakes, brews and workshop notes.
hero_title: The bakery blog
---
"#,
    );

    let posts = [
        (
            "starter.md",
            r#"---
title: Feeding a Sourdough Starter
date: 2025-01-01
intro: Rye flour and patience.
tags:
  - sourdough
categories:
  - Breads
---

Feed it every morning.
"#,
        ),
        (
            "rye.md",
            r#"---
title: Rye Loaf
date: 2025-01-02
intro: Dense and dark.
tags:
  - sourdough
  - rye
categories:
  - Breads
---

100% rye needs a hot oven.
"#,
        ),
        (
            "baguette.md",
            r#"---
title: Baguettes at Home
date: 2025-01-03
intro: Steam is everything.
tags:
  - wheat
categories:
  - Breads
---

Score with confidence.
"#,
        ),
        (
            "stout.md",
            r#"---
title: A Winter Stout
date: 2025-01-04
intro: Roasty and thick.
tags:
  - brewing
categories:
  - Drinks
---

Mash high for body.
"#,
        ),
        (
            "ale.md",
            r#"---
title: Pale Ale Notes
date: 2025-01-05
intro: Hops from the garden.
tags:
  - brewing
categories:
  - Drinks
---

Dry hop on day five.
"#,
        ),
        (
            "kvass.md",
            r#"---
title: Bread Kvass
date: 2025-01-06
intro: Stale rye becomes a drink.
tags:
  - brewing
  - rye
categories:
  - Drinks
---

Toast the bread first.
"#,
        ),
        (
            "oven.md",
            r#"---
title: Inside the New Oven
date: 2025-01-07
intro: A tour of the deck oven.
categories:
  - Breads
gallery:
  - image: oven.jpg
    caption: The new deck oven
  - image: missing.jpg
    caption: Gone but remembered
---

Three decks, steam on each.
"#,
        ),
        (
            "crumb.md",
            r#"---
title: Reading the Crumb
date: 2025-01-08
intro: Open crumb and why it happens.
tags:
  - sourdough
categories:
  - Breads
---

Big holes are not the only goal.
"#,
        ),
        (
            "secret.md",
            r#"---
title: Secret Recipe
date: 2025-01-09
live: false
intro: Not ready yet.
tags:
  - sourdough
---

The hidden lamination trick.
"#,
        ),
    ];
    for (name, content) in posts {
        write_file(root, &format!("content/blog/{}", name), content);
    }

    write_file(root, "snippets/categories.yml", "- name: Breads\n- name: Drinks\n");
    write_file(
        root,
        "snippets/social.yml",
        "- name: GitHub\n  link: https://github.com/example\n",
    );

    write_file(root, "images/oven.jpg", "not really a jpeg");
}

fn bakery_engine() -> (TempDir, Engine) {
    let dir = tempfile::tempdir().unwrap();
    scaffold_bakery_site(dir.path());
    let engine = Engine::new(dir.path().to_path_buf()).unwrap();
    (dir, engine)
}

/// 路由并断言得到渲染结果，返回模板名和上下文
fn route_render(
    engine: &Engine,
    path: &str,
    page_param: Option<&str>,
) -> (String, tera::Context) {
    let site = engine.site();
    let site = site.read().unwrap();
    match route_page(&site, &engine.config, path, page_param) {
        RouteOutcome::Render { template, context } => (template, context),
        other => panic!("期望渲染 {}，得到 {:?}", path, other),
    }
}

/// 把上下文交给真实的主题模板渲染
fn render_html(engine: &Engine, template: &str, context: &tera::Context) -> String {
    let renderer = engine.renderer();
    let renderer = renderer.read().unwrap();
    renderer.render_template(template, context).unwrap()
}

fn post_titles(context: &tera::Context) -> Vec<String> {
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
fn out_of_range_page_returns_last_page() {
    let (_dir, engine) = bakery_engine();

    // 8 篇已发布文章、每页 3 篇 → 3 页；请求第 8 页（⌈8/3⌉+5）
    let (template, context) = route_render(&engine, "/blog/", Some("8"));
    assert_eq!(template, "blog_index_page.html");

    let pagination = context.get("pagination").unwrap();
    assert_eq!(*pagination.get("number").unwrap(), 3);
    assert_eq!(*pagination.get("num_pages").unwrap(), 3);
    assert_eq!(
        post_titles(&context),
        vec!["Rye Loaf", "Feeding a Sourdough Starter"]
    );

    let html = render_html(&engine, &template, &context);
    assert!(html.contains("Page 3 of 3"));
}

#[test]
fn blog_index_lists_newest_first() {
    let (_dir, engine) = bakery_engine();

    let (template, context) = route_render(&engine, "/blog/", None);
    assert_eq!(
        post_titles(&context),
        vec!["Reading the Crumb", "Inside the New Oven", "Bread Kvass"]
    );

    let html = render_html(&engine, &template, &context);
    assert!(html.contains("Reading the Crumb"));
    assert!(html.contains("Bakes, brews and workshop notes."));
    // 草稿不出现在任何一页
    assert!(!html.contains("Secret Recipe"));
}

#[test]
fn main_image_is_first_gallery_entry_or_absent() {
    let (_dir, engine) = bakery_engine();

    let (_, context) = route_render(&engine, "/blog/oven/", None);
    assert_eq!(*context.get("main_image").unwrap(), "/media/oven.jpg");

    // 没有相册的文章 main_image 为空
    let (_, context) = route_render(&engine, "/blog/crumb/", None);
    assert!(context.get("main_image").unwrap().is_null());
}

#[test]
fn deleted_image_keeps_gallery_entry_with_cleared_reference() {
    let (_dir, engine) = bakery_engine();

    let (template, context) = route_render(&engine, "/blog/oven/", None);
    let gallery = context.get("gallery").unwrap().as_array().unwrap();
    assert_eq!(gallery.len(), 2);
    assert_eq!(*gallery[0].get("image").unwrap(), "/media/oven.jpg");
    assert!(gallery[1].get("image").unwrap().is_null());
    assert_eq!(*gallery[1].get("caption").unwrap(), "Gone but remembered");

    let html = render_html(&engine, &template, &context);
    assert!(html.contains("The new deck oven"));
    assert!(html.contains("Gone but remembered"));
}

#[test]
fn blog_post_tags_link_into_parent_index() {
    let (_dir, engine) = bakery_engine();

    let (template, context) = route_render(&engine, "/blog/kvass/", None);
    let urls: Vec<&str> = context
        .get("tags")
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .map(|tag| tag.get("url").unwrap().as_str().unwrap())
        .collect();
    assert_eq!(urls, vec!["/blog/tags/brewing/", "/blog/tags/rye/"]);

    // 父页面取最具体类型
    let parent = context.get("blog_page").unwrap();
    assert_eq!(*parent.get("kind").unwrap(), "blog_index_page");

    let html = render_html(&engine, &template, &context);
    assert!(html.contains("href=\"/blog/tags/rye/\""));
    assert!(!html.contains("//tags"));
}

#[test]
fn tag_view_filters_and_orders() {
    let (_dir, engine) = bakery_engine();

    let (template, context) = route_render(&engine, "/blog/tags/rye/", None);
    assert_eq!(template, "blog_index_page.html");
    assert_eq!(post_titles(&context), vec!["Bread Kvass", "Rye Loaf"]);

    let html = render_html(&engine, &template, &context);
    assert!(html.contains("Posts tagged with"));
}

#[test]
fn missing_tag_redirects_with_one_message() {
    let (_dir, engine) = bakery_engine();

    let site = engine.site();
    let site = site.read().unwrap();
    match route_page(&site, &engine.config, "/blog/tags/quantum/", None) {
        RouteOutcome::Redirect { location, messages } => {
            assert_eq!(location, "/blog/");
            assert_eq!(messages.len(), 1);
            assert!(messages[0].contains("quantum"));
        }
        other => panic!("期望重定向，得到 {:?}", other),
    }
}

#[test]
fn known_category_shows_unfiltered_posts() {
    let (_dir, engine) = bakery_engine();

    // Drinks 分类只有三篇，但分类页展示全部八篇（键名不匹配，过滤未生效）
    let (template, context) = route_render(&engine, "/blog/categories/Drinks/", None);
    assert_eq!(template, "blog_index_page.html");
    let pagination = context.get("pagination").unwrap();
    assert_eq!(*pagination.get("count").unwrap(), 8);
    assert_eq!(*context.get("category").unwrap().get("name").unwrap(), "Drinks");
}

#[test]
fn missing_category_falls_back_to_all_categories() {
    let (_dir, engine) = bakery_engine();

    let (template, context) = route_render(&engine, "/blog/categories/Pastry/", None);
    assert_eq!(template, "all_categories.html");

    let html = render_html(&engine, &template, &context);
    assert!(html.contains("Breads"));
    assert!(html.contains("Drinks"));
    assert!(html.contains("href=\"/blog/categories/Breads/\""));
}

#[test]
fn home_page_renders_hero_and_features() {
    let (_dir, engine) = bakery_engine();

    let (template, context) = route_render(&engine, "/", None);
    assert_eq!(template, "home_page.html");

    let html = render_html(&engine, &template, &context);
    assert!(html.contains("Welcome to Crusty Corner"));
    assert!(html.contains("Read the blog"));
    assert!(html.contains("Fresh from the oven"));
    // 页脚的社交链接来自片段仓库
    assert!(html.contains("https://github.com/example"));
}

#[test]
fn standard_page_renders_body() {
    let (_dir, engine) = bakery_engine();

    let (template, context) = route_render(&engine, "/about/", None);
    assert_eq!(template, "standard_page.html");

    let html = render_html(&engine, &template, &context);
    assert!(html.contains("About the bakery"));
    assert!(html.contains("writes more than it sells"));
}

#[test]
fn unknown_path_is_not_found_and_404_renders() {
    let (_dir, engine) = bakery_engine();

    let site = engine.site();
    let outcome = {
        let site = site.read().unwrap();
        route_page(&site, &engine.config, "/no-such-page/", None)
    };
    assert!(matches!(outcome, RouteOutcome::NotFound));

    let context = {
        let site = site.read().unwrap();
        ContextBuilder::new(&site, &engine.config).not_found()
    };
    let html = render_html(&engine, "404.html", &context);
    assert!(html.contains("Page not found"));
}

#[test]
fn search_finds_live_posts_only() {
    let (_dir, engine) = bakery_engine();

    let site = engine.site();
    let site = site.read().unwrap();

    let results = site.search.search("rye");
    let titles: Vec<&str> = results.iter().map(|item| item.title.as_str()).collect();
    assert!(titles.contains(&"Rye Loaf"));
    assert!(titles.contains(&"Bread Kvass"));

    // 草稿内容搜不到
    assert!(site.search.search("lamination").is_empty());

    let context =
        ContextBuilder::new(&site, &engine.config).search("rye", site.search.search("rye"), None);
    drop(site);
    let html = render_html(&engine, "search.html", &context);
    assert!(html.contains("Rye Loaf"));
}

#[test]
fn reload_picks_up_new_content() {
    let (dir, engine) = bakery_engine();

    write_file(
        dir.path(),
        "content/blog/focaccia.md",
        r#"---
title: Focaccia Friday
date: 2025-01-10
intro: Olive oil all the way down.
categories:
  - Breads
---

Dimple with wet fingers.
"#,
    );
    engine.reload().unwrap();

    let (_, context) = route_render(&engine, "/blog/", None);
    assert_eq!(post_titles(&context)[0], "Focaccia Friday");
}
