use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use pulldown_cmark::{html, Options, Parser};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tera::Tera;
use tracing::{debug, error};

use crate::models::Config;
use crate::site::Site;

#[derive(Clone)]
pub struct ThemeRenderer {
    /// 主题目录
    pub theme_dir: PathBuf,
    /// 模板引擎
    pub tera: Tera,
}

impl ThemeRenderer {
    /// 创建新的主题渲染器，模板取自 themes/<theme>/layout/
    pub fn new(base_dir: &Path, config: &Config, site: Arc<RwLock<Site>>) -> Result<Self> {
        let theme_dir = base_dir.join("themes").join(config.theme());

        if !theme_dir.exists() {
            return Err(anyhow!("主题目录不存在: {}", theme_dir.display()));
        }

        let mut tera = Tera::new(&format!("{}/**/*.html", theme_dir.join("layout").display()))?;

        // 注册过滤器和函数
        Self::register_filters(&mut tera);
        Self::register_functions(&mut tera, site);

        Ok(ThemeRenderer { theme_dir, tera })
    }

    /// 注册模板过滤器
    fn register_filters(tera: &mut Tera) {
        // 注册日期格式化过滤器
        tera.register_filter("date_format", Self::date_format_filter);
        // 注册Markdown过滤器
        tera.register_filter("markdown", Self::markdown_filter);
    }

    /// 注册模板函数
    fn register_functions(tera: &mut Tera, site: Arc<RwLock<Site>>) {
        // 社交链接函数：读取当前片段仓库，图标解析成 /media/ URL
        tera.register_function(
            "social_items",
            move |_args: &HashMap<String, tera::Value>| -> tera::Result<tera::Value> {
                let site = site
                    .read()
                    .map_err(|_| tera::Error::msg("站点状态不可用"))?;
                let items: Vec<tera::Value> = site
                    .snippets
                    .social
                    .iter()
                    .map(|item| {
                        serde_json::json!({
                            "name": item.name,
                            "link": item.link,
                            "icon": item.icon.as_ref().and_then(|icon| site.images.resolve(icon)),
                        })
                    })
                    .collect();
                Ok(tera::Value::Array(items))
            },
        );
    }

    /// 渲染模板
    pub fn render_template(&self, template_name: &str, context: &tera::Context) -> Result<String> {
        match self.tera.render(template_name, context) {
            Ok(result) => Ok(result),
            Err(e) => {
                error!("模板渲染失败: {}", e);
                Err(anyhow!(e))
            }
        }
    }

    /// 获取可用的布局列表
    pub fn available_layouts(&self) -> Vec<String> {
        self.tera.get_template_names().map(String::from).collect()
    }

    /// 检查布局是否存在
    pub fn has_layout(&self, layout: &str) -> bool {
        self.tera.get_template_names().any(|name| name == layout)
    }

    /// 获取主题资源目录
    pub fn source_dir(&self) -> PathBuf {
        self.theme_dir.join("source")
    }

    /// 从模板引擎中重新加载模板
    pub fn reload_templates(&mut self) -> Result<()> {
        debug!("Reloading theme templates...");
        self.tera.full_reload()?;
        Ok(())
    }

    fn date_format_filter(
        value: &tera::Value,
        args: &HashMap<String, tera::Value>,
    ) -> tera::Result<tera::Value> {
        let format = args
            .get("format")
            .and_then(|f| f.as_str())
            .unwrap_or("%Y-%m-%d");
        let Some(raw) = value.as_str() else {
            return Ok(value.clone());
        };

        // 上下文里的时间有三种写法，挨个尝试
        let formatted = if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
            datetime.format(format).to_string()
        } else if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
            datetime.format(format).to_string()
        } else if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            date.format(format).to_string()
        } else {
            return Ok(value.clone());
        };
        Ok(tera::Value::String(formatted))
    }

    fn markdown_filter(
        value: &tera::Value,
        _args: &HashMap<String, tera::Value>,
    ) -> tera::Result<tera::Value> {
        if let Some(text) = value.as_str() {
            let mut options = Options::empty();
            options.insert(Options::ENABLE_TABLES);
            options.insert(Options::ENABLE_FOOTNOTES);
            options.insert(Options::ENABLE_STRIKETHROUGH);
            options.insert(Options::ENABLE_TASKLISTS);
            options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
            options.insert(Options::ENABLE_SMART_PUNCTUATION);

            let parser = Parser::new_ext(text, options);
            let mut html_output = String::new();
            html::push_html(&mut html_output, parser);

            // 处理代码块样式问题
            let html_output = if html_output.contains("<pre><code") {
                html_output.replace("<pre><code", "<pre><code class=\"hljs\"")
            } else {
                html_output
            };

            Ok(tera::Value::String(html_output))
        } else {
            Ok(value.clone())
        }
    }
}
