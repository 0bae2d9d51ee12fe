use crate::core::Engine;
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// 指定站点目录
    #[arg(short, long, default_value = ".")]
    pub path: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 初始化新的站点
    Init(InitArgs),

    /// 创建新的文章
    New(NewArgs),

    /// 启动本地服务器
    Serve(ServeArgs),

    /// 检查站点内容并输出报告
    Check,
}

#[derive(Args)]
pub struct InitArgs {
    /// 站点目录名称
    #[arg(value_name = "NAME")]
    pub name: String,

    /// 站点标题
    #[arg(short, long)]
    pub title: Option<String>,
}

#[derive(Args)]
pub struct NewArgs {
    /// 文章标题
    pub title: String,

    /// 内容目录下的小节，默认 blog
    #[arg(short, long)]
    pub section: Option<String>,
}

#[derive(Args)]
pub struct ServeArgs {
    /// 服务器端口
    #[arg(short, long, default_value = "4000")]
    pub port: u16,

    /// 监视文件变化并自动重新加载
    #[arg(short, long)]
    pub watch: bool,
}

// 嵌入的默认配置模板
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Site
title: {title}
description: ''
author: ''
language: en

# URL
url: http://localhost:4000
root: /

# Directories
content_dir: content
snippet_dir: snippets
image_dir: images

# Rendering
theme: default
date_format: '%d %B %Y'
per_page: 10

# Server
debug: false
allowed_hosts:
  - '*'
"#;

// 嵌入的默认主题文件
mod default_theme {
    // 主题CSS文件
    pub const STYLE_CSS: &str = include_str!("../../embed/theme/default/source/css/style.css");

    // 主题布局文件
    pub const LAYOUT_HTML: &str = include_str!("../../embed/theme/default/layout/layout.html");
    pub const HOME_HTML: &str =
        include_str!("../../embed/theme/default/layout/home_page.html");
    pub const STANDARD_HTML: &str =
        include_str!("../../embed/theme/default/layout/standard_page.html");
    pub const BLOG_INDEX_HTML: &str =
        include_str!("../../embed/theme/default/layout/blog_index_page.html");
    pub const BLOG_HTML: &str =
        include_str!("../../embed/theme/default/layout/blog_page.html");
    pub const PAGINATION_HTML: &str =
        include_str!("../../embed/theme/default/layout/pagination.html");
    pub const ALL_CATEGORIES_HTML: &str =
        include_str!("../../embed/theme/default/layout/all_categories.html");
    pub const SEARCH_HTML: &str =
        include_str!("../../embed/theme/default/layout/search.html");
    pub const NOT_FOUND_HTML: &str = include_str!("../../embed/theme/default/layout/404.html");
}

// 初始化站点文件结构：配置、默认主题、示例内容和片段
fn initialize_site_structure(site_path: &Path, site_title: &str) -> Result<()> {
    let content_dir = site_path.join("content");
    let blog_dir = content_dir.join("blog");
    let snippet_dir = site_path.join("snippets");
    let image_dir = site_path.join("images");
    let theme_dir = site_path.join("themes").join("default");
    let theme_layout_dir = theme_dir.join("layout");
    let theme_css_dir = theme_dir.join("source").join("css");

    for dir in &[
        &content_dir,
        &blog_dir,
        &snippet_dir,
        &image_dir,
        &theme_layout_dir,
        &theme_css_dir,
    ] {
        fs::create_dir_all(dir)?;
    }

    // 默认配置
    let config_content = DEFAULT_CONFIG_TEMPLATE.replace("{title}", site_title);
    fs::write(site_path.join("_config.yml"), config_content)?;

    // 默认主题
    fs::write(theme_css_dir.join("style.css"), default_theme::STYLE_CSS)?;
    fs::write(theme_layout_dir.join("layout.html"), default_theme::LAYOUT_HTML)?;
    fs::write(theme_layout_dir.join("home_page.html"), default_theme::HOME_HTML)?;
    fs::write(
        theme_layout_dir.join("standard_page.html"),
        default_theme::STANDARD_HTML,
    )?;
    fs::write(
        theme_layout_dir.join("blog_index_page.html"),
        default_theme::BLOG_INDEX_HTML,
    )?;
    fs::write(theme_layout_dir.join("blog_page.html"), default_theme::BLOG_HTML)?;
    fs::write(
        theme_layout_dir.join("pagination.html"),
        default_theme::PAGINATION_HTML,
    )?;
    fs::write(
        theme_layout_dir.join("all_categories.html"),
        default_theme::ALL_CATEGORIES_HTML,
    )?;
    fs::write(theme_layout_dir.join("search.html"), default_theme::SEARCH_HTML)?;
    fs::write(theme_layout_dir.join("404.html"), default_theme::NOT_FOUND_HTML)?;

    // 首页
    let home_content = format!(
        "---\n\
        type: home\n\
        title: Home\n\
        hero_title: Welcome to {}\n\
        hero_cta_text: Read the blog\n\
        hero_cta_link: /blog/\n\
        feature_section_1: From the blog\n\
        feature_section_1_page: /blog/\n\
        ---\n\n\
        This site is served straight from the files under `content/`.\n",
        site_title,
    );
    fs::write(content_dir.join("_index.md"), home_content)?;

    // 示例普通页面
    let about_content = "---\n\
        type: standard\n\
        title: About\n\
        hero_title: About us\n\
        hero_text: What this site is about.\n\
        ---\n\n\
        Write about your site here.\n";
    fs::write(content_dir.join("about.md"), about_content)?;

    // 博客列表页
    let blog_index_content = "---\n\
        type: blog_index\n\
        title: Blog\n\
        intro: News and articles.\n\
        hero_title: Our blog\n\
        ---\n";
    fs::write(blog_dir.join("_index.md"), blog_index_content)?;

    // 示例博文
    let hello_content = format!(
        "---\n\
        type: blog\n\
        title: Hello World\n\
        date: {}\n\
        intro: The first post on this site.\n\
        tags:\n\
          - welcome\n\
        categories:\n\
          - News\n\
        ---\n\n\
        # Hello\n\n\
        This is your first post. Edit or delete it, then start writing!\n",
        chrono::Local::now().format("%Y-%m-%d"),
    );
    fs::write(blog_dir.join("hello-world.md"), hello_content)?;

    // 片段：一个示例分类和一个示例社交链接
    fs::write(snippet_dir.join("categories.yml"), "- name: News\n")?;
    fs::write(
        snippet_dir.join("social.yml"),
        "- name: GitHub\n  link: https://github.com\n",
    )?;

    Ok(())
}

/// 执行命令
pub async fn execute(cli: Cli) -> Result<()> {
    let site_path = cli.path.clone();

    match cli.command {
        Commands::Init(args) => {
            let site_path = site_path.join(&args.name);

            // 如果目录不为空，询问用户是否继续
            if site_path.exists() && site_path.read_dir()?.next().is_some() {
                println!("Directory is not empty. Do you want to continue? (y/N)");
                let mut input = String::new();
                std::io::stdin().read_line(&mut input)?;
                if !input.trim().eq_ignore_ascii_case("y") {
                    println!("Operation cancelled.");
                    return Ok(());
                }
            }

            fs::create_dir_all(&site_path)?;
            let site_title = args.title.unwrap_or_else(|| args.name.clone());
            initialize_site_structure(&site_path, &site_title)?;

            info!("Initialized new site at: {}", site_path.display());
        }
        Commands::New(args) => {
            let engine = Engine::new(site_path)?;
            engine.new_post(&args.title, args.section.as_deref())?;
        }
        Commands::Serve(args) => {
            let engine = Engine::new(site_path)?;
            if args.watch {
                engine.watch()?;
            }
            engine.serve(args.port).await?;
        }
        Commands::Check => {
            let engine = Engine::new(site_path)?;
            engine.check()?;
        }
    }

    Ok(())
}
