use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use super::types::ImageRef;

/// 博客分类：可独立管理的全局片段，按名称关联到文章
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogCategory {
    /// 分类名称
    pub name: String,
    /// 分类图标
    #[serde(default)]
    pub icon: Option<ImageRef>,
}

/// 社交链接：名称加链接加图标，由模板函数读取
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialItem {
    /// 社交平台名称
    pub name: String,
    /// 社交主页链接
    #[serde(default)]
    pub link: Option<String>,
    /// 图标
    #[serde(default)]
    pub icon: Option<ImageRef>,
}

/// 片段仓库：分类和社交链接，独立于页面树管理
#[derive(Debug, Clone, Default)]
pub struct SnippetStore {
    /// 所有博客分类
    pub categories: Vec<BlogCategory>,
    /// 所有社交链接
    pub social: Vec<SocialItem>,
}

impl SnippetStore {
    /// 从片段目录加载（categories.yml 和 social.yml，缺失的文件当作空列表）
    pub fn load(dir: &Path) -> Result<Self> {
        let categories: Vec<BlogCategory> = load_yaml_list(&dir.join("categories.yml"))?;
        let social: Vec<SocialItem> = load_yaml_list(&dir.join("social.yml"))?;

        // 分类名称不允许为空
        for category in &categories {
            if category.name.trim().is_empty() {
                anyhow::bail!("分类名称不能为空: {}", dir.join("categories.yml").display());
            }
        }

        debug!("加载了 {} 个分类和 {} 个社交链接", categories.len(), social.len());

        Ok(Self { categories, social })
    }

    /// 按名称查找分类（精确匹配）
    pub fn category_by_name(&self, name: &str) -> Option<&BlogCategory> {
        self.categories.iter().find(|c| c.name == name)
    }
}

/// 读取一个 YAML 列表文件，文件不存在时返回空列表
fn load_yaml_list<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("读取片段文件失败: {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_yaml::from_str(&content).with_context(|| format!("解析片段文件失败: {}", path.display()))
}
