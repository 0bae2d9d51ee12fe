use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use url::Url;

/// 站点配置（读取自 _config.yml）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub title: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub language: Option<String>,
    pub url: Option<String>,
    pub root: Option<String>,
    pub theme: Option<String>,
    pub date_format: Option<String>,
    /// 列表页每页文章数
    pub per_page: Option<i32>,
    /// 调试模式：错误响应携带详细信息
    pub debug: Option<bool>,
    /// 允许的 Host 头，"*" 表示全部放行
    pub allowed_hosts: Option<Vec<String>>,
    pub content_dir: Option<String>,
    pub snippet_dir: Option<String>,
    pub image_dir: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "My Site".to_string(),
            description: None,
            author: None,
            language: Some("en".to_string()),
            url: None,
            root: Some("/".to_string()),
            theme: Some("default".to_string()),
            date_format: None,
            per_page: None,
            debug: None,
            allowed_hosts: None,
            content_dir: None,
            snippet_dir: None,
            image_dir: None,
        }
    }
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("解析配置文件失败: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// 加载配置的别名
    pub fn load(path: &Path) -> Result<Self> {
        Self::from_file(path)
    }

    /// 保存配置到文件
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;
        Ok(())
    }

    /// 保存配置的别名
    pub fn save(&self, path: &Path) -> Result<()> {
        self.save_to_file(path)
    }

    /// 校验配置项
    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.url {
            Url::parse(url).with_context(|| format!("站点 URL 无效: {}", url))?;
        }
        if let Some(per_page) = self.per_page {
            if per_page < 1 {
                anyhow::bail!("per_page 必须大于 0，当前为 {}", per_page);
            }
        }
        Ok(())
    }

    /// 每页文章数，默认 10
    pub fn per_page(&self) -> usize {
        self.per_page.map(|n| n.max(1) as usize).unwrap_or(10)
    }

    /// 调试模式，默认关闭
    pub fn debug(&self) -> bool {
        self.debug.unwrap_or(false)
    }

    /// 主题名称，默认 default
    pub fn theme(&self) -> String {
        self.theme.clone().unwrap_or_else(|| "default".to_string())
    }

    /// 日期展示格式，默认 %Y-%m-%d
    pub fn date_format(&self) -> String {
        self.date_format
            .clone()
            .unwrap_or_else(|| "%Y-%m-%d".to_string())
    }

    /// 内容目录，默认 content
    pub fn content_dir(&self) -> String {
        self.content_dir.clone().unwrap_or_else(|| "content".to_string())
    }

    /// 片段目录，默认 snippets
    pub fn snippet_dir(&self) -> String {
        self.snippet_dir.clone().unwrap_or_else(|| "snippets".to_string())
    }

    /// 图片库目录，默认 images
    pub fn image_dir(&self) -> String {
        self.image_dir.clone().unwrap_or_else(|| "images".to_string())
    }

    /// 允许的 Host 列表，默认放行全部
    pub fn allowed_hosts(&self) -> Vec<String> {
        self.allowed_hosts
            .clone()
            .unwrap_or_else(|| vec!["*".to_string()])
    }

    /// 检查请求的 Host 头是否被允许（忽略端口）
    pub fn host_allowed(&self, host: &str) -> bool {
        let bare = if let Some(rest) = host.strip_prefix('[') {
            // IPv6 地址形如 [::1]:4000
            rest.split(']').next().unwrap_or(rest)
        } else {
            host.split(':').next().unwrap_or(host)
        };

        self.allowed_hosts()
            .iter()
            .any(|allowed| allowed == "*" || allowed.eq_ignore_ascii_case(bare))
    }
}
