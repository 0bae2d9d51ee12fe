use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 页面树节点编号
pub type PageId = usize;

/// 图片引用：图片库中的文件名
///
/// 引用的文件被删除时引用本身保留，渲染时解析为空（不级联删除）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(pub String);

/// 页面引用：站点内路径，渲染时解析为目标页面的 URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageRef(pub String);

/// 页面树节点的公共数据
///
/// URL 解析、发布状态、发布时间等所有页面类型共享的能力都在这里，
/// 具体类型放在 `content` 字段（对应 .specific）。
#[derive(Debug, Clone, Serialize)]
pub struct PageNode {
    /// 节点编号
    pub id: PageId,
    /// 父节点编号（根节点为 None）
    pub parent: Option<PageId>,
    /// URL 别名（根节点为空字符串）
    pub slug: String,
    /// 页面标题
    pub title: String,
    /// 是否已发布
    pub live: bool,
    /// 首次发布时间
    pub first_published_at: DateTime<Utc>,
    /// 源文件路径
    pub source: PathBuf,
    /// 最具体的页面类型
    pub content: PageContent,
}

/// 页面的最具体类型
#[derive(Debug, Clone, Serialize)]
pub enum PageContent {
    Home(HomePage),
    Standard(StandardPage),
    BlogIndex(BlogIndexPage),
    Blog(BlogPage),
}

impl PageContent {
    /// 页面类型名（同时也是模板名的前缀）
    pub fn kind(&self) -> &'static str {
        match self {
            PageContent::Home(_) => "home_page",
            PageContent::Standard(_) => "standard_page",
            PageContent::BlogIndex(_) => "blog_index_page",
            PageContent::Blog(_) => "blog_page",
        }
    }

    /// 页面使用的模板文件名
    pub fn template(&self) -> String {
        format!("{}.html", self.kind())
    }

    pub fn as_blog(&self) -> Option<&BlogPage> {
        match self {
            PageContent::Blog(blog) => Some(blog),
            _ => None,
        }
    }

    pub fn as_blog_index(&self) -> Option<&BlogIndexPage> {
        match self {
            PageContent::BlogIndex(index) => Some(index),
            _ => None,
        }
    }
}

/// 首页：主视觉区块加两个推荐位
#[derive(Debug, Clone, Serialize)]
pub struct HomePage {
    /// 主视觉标题
    pub hero_title: String,
    /// 主视觉正文（Markdown 原文）
    pub hero_body: String,
    /// 渲染后的主视觉正文
    pub hero_body_html: String,
    /// 主视觉图片
    pub hero_image: Option<ImageRef>,
    /// 主视觉按钮文字
    pub hero_cta_text: String,
    /// 主视觉按钮指向的页面
    pub hero_cta_link: Option<PageRef>,
    /// 推荐位一标题
    pub feature_section_1: String,
    /// 推荐位一指向的页面
    pub feature_section_1_page: Option<PageRef>,
    /// 推荐位二标题
    pub feature_section_2: String,
    /// 推荐位二指向的页面
    pub feature_section_2_page: Option<PageRef>,
}

/// 普通页面：主视觉区块加正文
#[derive(Debug, Clone, Serialize)]
pub struct StandardPage {
    /// 主视觉标题
    pub hero_title: String,
    /// 主视觉图片
    pub hero_image: Option<ImageRef>,
    /// 主视觉文字
    pub hero_text: String,
    /// 正文（Markdown 原文）
    pub body: String,
    /// 渲染后的正文
    pub body_html: String,
}

/// 博客列表页：文章列表的落地页
#[derive(Debug, Clone, Serialize)]
pub struct BlogIndexPage {
    /// 简介（Markdown 原文）
    pub intro: String,
    /// 渲染后的简介
    pub intro_html: String,
    /// 主视觉标题
    pub hero_title: String,
    /// 主视觉正文（Markdown 原文）
    pub hero_body: String,
    /// 渲染后的主视觉正文
    pub hero_body_html: String,
    /// 主视觉图片
    pub hero_image: Option<ImageRef>,
}

/// 博客文章
#[derive(Debug, Clone, Serialize)]
pub struct BlogPage {
    /// 发布日期（必填）
    pub date: NaiveDate,
    /// 文章简介（不超过 250 字符）
    pub intro: String,
    /// 正文（Markdown 原文）
    pub body: String,
    /// 渲染后的正文
    pub body_html: String,
    /// 文章标签
    pub tags: Vec<String>,
    /// 文章分类（按分类名关联）
    pub categories: Vec<String>,
    /// 相册（按 order 排序）
    pub gallery: Vec<GalleryImage>,
}

impl BlogPage {
    /// 相册中的第一张图片，相册为空时返回 None
    ///
    /// 第一个相册条目的图片引用已被清空时同样返回 None。
    pub fn main_image(&self) -> Option<&ImageRef> {
        self.gallery.first().and_then(|item| item.image.as_ref())
    }
}

/// 相册条目：图片加说明，属于一篇文章
#[derive(Debug, Clone, Serialize)]
pub struct GalleryImage {
    /// 图片引用（图片删除后为 None，条目保留）
    pub image: Option<ImageRef>,
    /// 图片说明（不超过 250 字符）
    pub caption: String,
    /// 显示顺序
    pub order: usize,
}

/// 标签信息（由文章前置元数据汇总得到）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagInfo {
    /// 标签名称
    pub name: String,
    /// 标签别名（用于URL）
    pub slug: String,
    /// 该标签下的文章数量
    pub post_count: usize,
}
