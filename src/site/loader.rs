use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use gray_matter::engine::YAML;
use gray_matter::{Matter, Pod};
use rayon::prelude::*;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::models::{
    BlogIndexPage, BlogPage, Config, GalleryImage, HomePage, ImageRef, PageContent, PageId,
    PageNode, PageRef, SnippetStore, StandardPage,
};
use crate::site::error::SiteError;
use crate::site::search::SearchIndex;
use crate::site::tree::PageTree;
use crate::site::Site;
use crate::utils;

/// intro 和图片说明的长度上限（按字符数）
const TEXT_FIELD_MAX: usize = 250;

/// 加载整个站点：内容树、片段、图片库、搜索索引
pub fn load_site(base_dir: &Path, config: &Config) -> Result<Site> {
    let content_dir = base_dir.join(config.content_dir());
    if !content_dir.is_dir() {
        return Err(SiteError::ContentDirMissing { path: content_dir }.into());
    }

    // 收集 Markdown 文件，解析阶段用 rayon 并行
    let files = collect_markdown_files(&content_dir);
    let parsed: Vec<ParsedFile> = files
        .par_iter()
        .map(|path| parse_file(path, &content_dir))
        .collect::<Result<Vec<_>>>()?;

    let tree = assemble_tree(parsed, &content_dir)?;
    let snippets = SnippetStore::load(&base_dir.join(config.snippet_dir()))?;
    let images = ImageStore::scan(&base_dir.join(config.image_dir()))?;
    let search = SearchIndex::build(&tree);

    info!(
        "加载了 {} 个页面、{} 个分类、{} 张图片",
        tree.len(),
        snippets.categories.len(),
        images.len()
    );

    Ok(Site {
        tree,
        snippets,
        images,
        search,
    })
}

fn collect_markdown_files(content_dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(content_dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file() && utils::is_markdown_file(entry.path()))
        .map(|entry| entry.path().to_path_buf())
        .collect()
}

/// 内容文件的前置元数据
///
/// 未知字段一律忽略，作者可以自由加扩展字段。
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct FrontMatter {
    title: Option<String>,
    slug: Option<String>,
    #[serde(rename = "type")]
    page_type: Option<String>,
    live: Option<bool>,
    date: Option<String>,
    intro: Option<String>,
    hero_title: Option<String>,
    hero_body: Option<String>,
    hero_text: Option<String>,
    hero_image: Option<String>,
    hero_cta_text: Option<String>,
    hero_cta_link: Option<String>,
    feature_section_1: Option<String>,
    feature_section_1_page: Option<String>,
    feature_section_2: Option<String>,
    feature_section_2_page: Option<String>,
    #[serde(deserialize_with = "string_or_list")]
    tags: Vec<String>,
    #[serde(deserialize_with = "string_or_list")]
    categories: Vec<String>,
    gallery: Vec<GalleryEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct GalleryEntry {
    image: Option<String>,
    caption: String,
}

/// 标签和分类既可以写成列表也可以写成单个字符串
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(single) => Ok(vec![single]),
        Value::Sequence(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(text) => Ok(text),
                other => Err(serde::de::Error::custom(format!(
                    "期望字符串，得到 {:?}",
                    other
                ))),
            })
            .collect(),
        other => Err(serde::de::Error::custom(format!(
            "期望字符串或列表，得到 {:?}",
            other
        ))),
    }
}

/// 解析完成、尚未挂到树上的一个内容文件
struct ParsedFile {
    /// 相对 content/ 的目录层级
    rel_dir: Vec<String>,
    /// 文件名主干，_index.md 用所在目录名
    stem: String,
    is_index: bool,
    front: FrontMatter,
    body: String,
    body_html: String,
    modified: DateTime<Utc>,
    source: PathBuf,
}

fn parse_file(path: &Path, content_dir: &Path) -> Result<ParsedFile> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("读取内容文件失败: {}", path.display()))?;

    let matter = Matter::<YAML>::new();
    let parsed = matter.parse(&raw);
    let front = match parsed.data {
        Some(pod) => serde_yaml::from_value(pod_to_value(pod))
            .with_context(|| format!("解析前置元数据失败: {}", path.display()))?,
        None => FrontMatter::default(),
    };

    let body = parsed.content;
    let body_html = utils::markdown::render(&body)?;

    let rel = path.strip_prefix(content_dir).unwrap_or(path);
    let mut components: Vec<String> = rel
        .iter()
        .map(|component| component.to_string_lossy().to_string())
        .collect();
    let file_name = components.pop().unwrap_or_default();
    let is_index = file_name == "_index.md";
    let stem = if is_index {
        components.last().cloned().unwrap_or_default()
    } else {
        file_name.trim_end_matches(".md").to_string()
    };

    let metadata = fs::metadata(path)?;
    let modified: DateTime<Utc> = metadata.modified()?.into();

    Ok(ParsedFile {
        rel_dir: components,
        stem,
        is_index,
        front,
        body,
        body_html,
        modified,
        source: path.to_path_buf(),
    })
}

// 工具函数：将 Pod 值转换为 serde_yaml::Value
fn pod_to_value(pod: Pod) -> Value {
    match pod {
        Pod::String(s) => Value::String(s),
        Pod::Integer(i) => Value::Number(serde_yaml::Number::from(i)),
        Pod::Float(f) => Value::Number(serde_yaml::Number::from(f)),
        Pod::Boolean(b) => Value::Bool(b),
        Pod::Array(arr) => Value::Sequence(arr.into_iter().map(pod_to_value).collect()),
        Pod::Hash(map) => {
            let mut mapping = Mapping::new();
            for (k, v) in map {
                mapping.insert(Value::String(k), pod_to_value(v));
            }
            Value::Mapping(mapping)
        }
        Pod::Null => Value::Null,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageKind {
    Home,
    Standard,
    BlogIndex,
    Blog,
}

fn resolve_kind(explicit: Option<&str>, fallback: PageKind, path: &Path) -> Result<PageKind> {
    let Some(raw) = explicit else {
        return Ok(fallback);
    };
    match raw {
        "home" | "home_page" => Ok(PageKind::Home),
        "standard" | "standard_page" => Ok(PageKind::Standard),
        "blog_index" | "blog_index_page" => Ok(PageKind::BlogIndex),
        "blog" | "blog_post" | "blog_page" => Ok(PageKind::Blog),
        other => Err(SiteError::UnknownPageType {
            path: path.to_path_buf(),
            value: other.to_string(),
        }
        .into()),
    }
}

fn slug_of(file: &ParsedFile) -> String {
    match &file.front.slug {
        Some(explicit) => utils::slugify(explicit),
        None => utils::slugify(&file.stem),
    }
}

fn parse_date(raw: &str, path: &Path) -> Result<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    // 兼容带时间的写法
    if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(datetime.date());
    }
    Err(SiteError::InvalidDate {
        path: path.to_path_buf(),
        value: raw.to_string(),
    }
    .into())
}

fn ensure_len(field: &'static str, value: &str, path: &Path) -> Result<()> {
    if value.chars().count() > TEXT_FIELD_MAX {
        return Err(SiteError::FieldTooLong {
            field,
            limit: TEXT_FIELD_MAX,
            path: path.to_path_buf(),
        }
        .into());
    }
    Ok(())
}

struct TreeBuilder {
    nodes: Vec<PageNode>,
    index_by_dir: BTreeMap<Vec<String>, ParsedFile>,
    leaves_by_dir: BTreeMap<Vec<String>, Vec<ParsedFile>>,
    subdirs_of: BTreeMap<Vec<String>, BTreeSet<String>>,
}

fn assemble_tree(parsed: Vec<ParsedFile>, content_dir: &Path) -> Result<PageTree> {
    let mut index_by_dir: BTreeMap<Vec<String>, ParsedFile> = BTreeMap::new();
    let mut leaves_by_dir: BTreeMap<Vec<String>, Vec<ParsedFile>> = BTreeMap::new();
    for file in parsed {
        if file.is_index {
            index_by_dir.insert(file.rel_dir.clone(), file);
        } else {
            leaves_by_dir.entry(file.rel_dir.clone()).or_default().push(file);
        }
    }
    // 同级文件按文件名排序，保证树的顺序稳定
    for leaves in leaves_by_dir.values_mut() {
        leaves.sort_by(|a, b| a.stem.cmp(&b.stem));
    }

    let root_file = index_by_dir
        .remove(&Vec::new())
        .ok_or_else(|| SiteError::RootPageMissing {
            path: content_dir.join("_index.md"),
        })?;

    let mut subdirs_of: BTreeMap<Vec<String>, BTreeSet<String>> = BTreeMap::new();
    for dir in index_by_dir.keys().chain(leaves_by_dir.keys()) {
        for depth in 0..dir.len() {
            subdirs_of
                .entry(dir[..depth].to_vec())
                .or_default()
                .insert(dir[depth].clone());
        }
    }

    let mut builder = TreeBuilder {
        nodes: Vec::new(),
        index_by_dir,
        leaves_by_dir,
        subdirs_of,
    };
    builder.build_section(Vec::new(), root_file, None, PageKind::Home)?;
    Ok(PageTree::new(builder.nodes))
}

impl TreeBuilder {
    /// 建立一个小节：先挂小节页面本身，再挂叶子文件和子目录
    fn build_section(
        &mut self,
        dir: Vec<String>,
        file: ParsedFile,
        parent: Option<PageId>,
        fallback: PageKind,
    ) -> Result<PageId> {
        let id = self.push_node(file, parent, fallback)?;

        // 博客列表页下的叶子默认按文章处理
        let leaf_fallback = match self.nodes[id].content {
            PageContent::BlogIndex(_) => PageKind::Blog,
            _ => PageKind::Standard,
        };

        let mut seen_slugs: HashSet<String> = HashSet::new();

        for leaf in self.leaves_by_dir.remove(&dir).unwrap_or_default() {
            let slug = slug_of(&leaf);
            if !seen_slugs.insert(slug.clone()) {
                warn!(
                    "同级页面别名重复，保留先出现的一个: {} ({})",
                    slug,
                    leaf.source.display()
                );
                continue;
            }
            self.push_node(leaf, Some(id), leaf_fallback)?;
        }

        for name in self.subdirs_of.remove(&dir).unwrap_or_default() {
            let mut child_dir = dir.clone();
            child_dir.push(name.clone());
            match self.index_by_dir.remove(&child_dir) {
                Some(index_file) => {
                    let slug = slug_of(&index_file);
                    if !seen_slugs.insert(slug.clone()) {
                        warn!(
                            "同级页面别名重复，保留先出现的一个: {} ({})",
                            slug,
                            index_file.source.display()
                        );
                        continue;
                    }
                    self.build_section(child_dir, index_file, Some(id), PageKind::Standard)?;
                }
                None => {
                    warn!("目录缺少 _index.md，跳过其中的页面: {}", child_dir.join("/"));
                }
            }
        }

        Ok(id)
    }

    fn push_node(
        &mut self,
        file: ParsedFile,
        parent: Option<PageId>,
        fallback: PageKind,
    ) -> Result<PageId> {
        let id = self.nodes.len();
        let slug = if parent.is_none() {
            String::new()
        } else {
            slug_of(&file)
        };
        let title = file.front.title.clone().unwrap_or_else(|| {
            if file.stem.is_empty() {
                "Home".to_string()
            } else {
                file.stem.clone()
            }
        });
        let live = file.front.live.unwrap_or(true);

        let date = match &file.front.date {
            Some(raw) => Some(parse_date(raw, &file.source)?),
            None => None,
        };
        // 首次发布时间：发布日期的零点，没有日期就用文件修改时间
        let first_published_at = match date {
            Some(date) => Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)),
            None => file.modified,
        };

        let kind = resolve_kind(file.front.page_type.as_deref(), fallback, &file.source)?;
        let content = build_content(kind, &file, &title, date)?;

        self.nodes.push(PageNode {
            id,
            parent,
            slug,
            title,
            live,
            first_published_at,
            source: file.source,
            content,
        });
        Ok(id)
    }
}

fn build_content(
    kind: PageKind,
    file: &ParsedFile,
    title: &str,
    date: Option<NaiveDate>,
) -> Result<PageContent> {
    let front = &file.front;
    match kind {
        PageKind::Home => {
            // 主视觉正文缺省用文件正文
            let (hero_body, hero_body_html) = hero_body_of(front, file)?;
            Ok(PageContent::Home(HomePage {
                hero_title: front.hero_title.clone().unwrap_or_else(|| title.to_string()),
                hero_body,
                hero_body_html,
                hero_image: front.hero_image.clone().map(ImageRef),
                hero_cta_text: front.hero_cta_text.clone().unwrap_or_default(),
                hero_cta_link: front.hero_cta_link.clone().map(PageRef),
                feature_section_1: front.feature_section_1.clone().unwrap_or_default(),
                feature_section_1_page: front.feature_section_1_page.clone().map(PageRef),
                feature_section_2: front.feature_section_2.clone().unwrap_or_default(),
                feature_section_2_page: front.feature_section_2_page.clone().map(PageRef),
            }))
        }
        PageKind::Standard => Ok(PageContent::Standard(StandardPage {
            hero_title: front.hero_title.clone().unwrap_or_else(|| title.to_string()),
            hero_image: front.hero_image.clone().map(ImageRef),
            hero_text: front.hero_text.clone().unwrap_or_default(),
            body: file.body.clone(),
            body_html: file.body_html.clone(),
        })),
        PageKind::BlogIndex => {
            let intro = front.intro.clone().unwrap_or_default();
            let intro_html = utils::markdown::render(&intro)?;
            let (hero_body, hero_body_html) = hero_body_of(front, file)?;
            Ok(PageContent::BlogIndex(BlogIndexPage {
                intro,
                intro_html,
                hero_title: front.hero_title.clone().unwrap_or_else(|| title.to_string()),
                hero_body,
                hero_body_html,
                hero_image: front.hero_image.clone().map(ImageRef),
            }))
        }
        PageKind::Blog => {
            let date = date.ok_or_else(|| SiteError::MissingDate {
                path: file.source.clone(),
            })?;
            let intro = front.intro.clone().unwrap_or_default();
            ensure_len("intro", &intro, &file.source)?;

            let mut gallery = Vec::with_capacity(front.gallery.len());
            for (order, entry) in front.gallery.iter().enumerate() {
                ensure_len("caption", &entry.caption, &file.source)?;
                gallery.push(GalleryImage {
                    image: entry.image.clone().map(ImageRef),
                    caption: entry.caption.clone(),
                    order,
                });
            }

            Ok(PageContent::Blog(BlogPage {
                date,
                intro,
                body: file.body.clone(),
                body_html: file.body_html.clone(),
                tags: front.tags.clone(),
                categories: front.categories.clone(),
                gallery,
            }))
        }
    }
}

fn hero_body_of(front: &FrontMatter, file: &ParsedFile) -> Result<(String, String)> {
    match &front.hero_body {
        Some(hero_body) => {
            let html = utils::markdown::render(hero_body)?;
            Ok((hero_body.clone(), html))
        }
        None => Ok((file.body.clone(), file.body_html.clone())),
    }
}

/// 图片库：扫描得到的文件名集合，引用在渲染时解析
#[derive(Debug, Clone, Default)]
pub struct ImageStore {
    names: BTreeSet<String>,
}

impl ImageStore {
    /// 用给定的文件名集合建库
    pub fn from_names<I: IntoIterator<Item = String>>(names: I) -> Self {
        Self {
            names: names.into_iter().collect(),
        }
    }

    /// 扫描图片目录，目录不存在时得到空库
    pub fn scan(dir: &Path) -> Result<Self> {
        let mut names = BTreeSet::new();
        if dir.is_dir() {
            for entry in WalkDir::new(dir) {
                let entry = entry?;
                if !entry.path().is_file() {
                    continue;
                }
                if let Ok(rel) = entry.path().strip_prefix(dir) {
                    names.insert(rel.to_string_lossy().replace('\\', "/"));
                }
            }
        }
        Ok(Self { names })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// 解析图片引用：文件存在返回 /media/ 下的 URL，已删除返回 None
    ///
    /// 引用失效不报错也不丢弃记录，只是解析为空。
    pub fn resolve(&self, image: &ImageRef) -> Option<String> {
        self.contains(&image.0)
            .then(|| format!("/media/{}", image.0))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|name| name.as_str())
    }
}
