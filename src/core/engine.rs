use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::{error, info, warn};

use crate::models::{Config, ImageRef, PageContent, PageNode};
use crate::site::{load_site, Site};
use crate::theme::ThemeRenderer;

/// 站点引擎
///
/// 持有站点根目录、配置、加载完成的站点内容和主题渲染器。
/// 站点内容放在 `Arc<RwLock<Site>>` 里，重新加载时整体替换，
/// 请求处理期间只读。
#[derive(Clone)]
pub struct Engine {
    /// 站点根目录
    pub base_dir: PathBuf,
    /// 站点配置（启动时读取，修改 _config.yml 需要重启）
    pub config: Config,
    /// 当前站点内容
    site: Arc<RwLock<Site>>,
    /// 主题渲染器
    renderer: Arc<RwLock<ThemeRenderer>>,
}

impl Engine {
    /// 创建引擎：读取配置、加载站点、初始化主题
    pub fn new(base_dir: PathBuf) -> Result<Self> {
        let config_path = base_dir.join("_config.yml");
        let config = if config_path.exists() {
            Config::from_file(&config_path)?
        } else {
            warn!("未找到 _config.yml，使用默认配置");
            Config::default()
        };

        info!("加载站点: {}", base_dir.display());
        let site = load_site(&base_dir, &config)?;
        let site = Arc::new(RwLock::new(site));

        let renderer = ThemeRenderer::new(&base_dir, &config, Arc::clone(&site))?;
        let renderer = Arc::new(RwLock::new(renderer));

        Ok(Self {
            base_dir,
            config,
            site,
            renderer,
        })
    }

    /// 站点内容的共享句柄
    pub fn site(&self) -> Arc<RwLock<Site>> {
        Arc::clone(&self.site)
    }

    /// 主题渲染器的共享句柄
    pub fn renderer(&self) -> Arc<RwLock<ThemeRenderer>> {
        Arc::clone(&self.renderer)
    }

    /// 重新加载站点内容和模板
    ///
    /// 加载失败时返回错误，当前站点内容保持不变。
    pub fn reload(&self) -> Result<()> {
        let site = load_site(&self.base_dir, &self.config)?;
        let pages = site.tree.len();
        *self.site.write().unwrap() = site;
        self.renderer.write().unwrap().reload_templates()?;
        info!("站点已重新加载: {} 个页面", pages);
        Ok(())
    }

    /// 开始监视文件变化，变化后重新加载站点
    pub fn watch(&self) -> Result<()> {
        info!("{}", "Watching for file changes...".green());

        use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
        use std::sync::mpsc;
        use std::time::{Duration, Instant};

        // 创建通道以接收文件系统事件
        let (tx, rx) = mpsc::channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    let _ = tx.send(event);
                }
                Err(e) => {
                    warn!("监视错误: {:?}", e);
                }
            },
            notify::Config::default(),
        )
        .context("创建文件监视器失败")?;

        // 监视内容、片段、图片和主题目录
        let watch_dirs = [
            self.base_dir.join(self.config.content_dir()),
            self.base_dir.join(self.config.snippet_dir()),
            self.base_dir.join(self.config.image_dir()),
            self.base_dir.join("themes"),
        ];
        for dir in &watch_dirs {
            if !dir.exists() {
                continue;
            }
            match watcher.watch(dir, RecursiveMode::Recursive) {
                Ok(_) => info!("正在监控目录: {}", dir.display()),
                Err(e) => warn!("监控目录失败: {}: {:?}", dir.display(), e),
            }
        }

        let engine = self.clone();

        // 监视循环放在阻塞任务里，watcher 随任务存活
        tokio::task::spawn_blocking(move || {
            let _watcher = watcher;
            let debounce_time = Duration::from_millis(1000);
            let mut last_event: Option<Instant> = None;

            loop {
                match rx.recv_timeout(Duration::from_secs(1)) {
                    Ok(event) => {
                        if relevant_change(&event) {
                            last_event = Some(Instant::now());
                        }
                    }
                    Err(mpsc::RecvTimeoutError::Timeout) => {
                        // 距最后一次变化超过防抖时间后再重新加载
                        if let Some(instant) = last_event {
                            if instant.elapsed() >= debounce_time {
                                info!("检测到文件变化，重新加载站点...");
                                if let Err(e) = engine.reload() {
                                    error!("重新加载失败: {:#}", e);
                                }
                                last_event = None;
                            }
                        }
                    }
                    Err(mpsc::RecvTimeoutError::Disconnected) => {
                        info!("监控通道已关闭，退出监控循环");
                        break;
                    }
                }
            }
        });

        Ok(())
    }

    /// 创建新文章
    pub fn new_post(&self, title: &str, section: Option<&str>) -> Result<()> {
        info!("创建新文章: {}", title);
        let slug = crate::utils::slugify(title);
        let filename = format!("{}.md", slug);

        let section = section.unwrap_or("blog");
        let target_path = self
            .base_dir
            .join(self.config.content_dir())
            .join(section)
            .join(filename);

        if let Some(parent) = target_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("创建目录失败: {}", parent.display()))?;
            }
        }

        if target_path.exists() {
            return Err(anyhow::anyhow!("文件已存在: {}", target_path.display()));
        }

        let front_matter = format!(
            "---\n\
            type: blog\n\
            title: {}\n\
            date: {}\n\
            intro: \"\"\n\
            tags: []\n\
            categories: []\n\
            ---\n\n\
            Start writing here.\n",
            title,
            chrono::Local::now().format("%Y-%m-%d"),
        );

        fs::write(&target_path, front_matter)
            .with_context(|| format!("写入文件失败: {}", target_path.display()))?;

        info!("成功创建文章: {}", target_path.display());
        Ok(())
    }

    /// 启动本地服务器
    pub async fn serve(&self, port: u16) -> Result<()> {
        let server = super::server::Server::new(
            self.base_dir.clone(),
            self.config.clone(),
            self.site(),
            self.renderer(),
            port,
        );
        server.start().await
    }

    /// 检查站点并输出报告：页面和片段数量、草稿、失效的图片引用
    pub fn check(&self) -> Result<()> {
        let site = self.site.read().unwrap();

        let total = site.tree.len();
        let live = site.tree.all().live().count();
        let images = site.images.names().count();

        println!("{}", "Site check".bright_cyan());
        println!("  pages       {} ({} live, {} draft)", total, live, total - live);
        println!("  categories  {}", site.snippets.categories.len());
        println!("  social      {}", site.snippets.social.len());
        println!("  images      {}", images);

        let mut warnings = 0usize;

        for node in site.tree.pages() {
            if !node.live {
                warn!("草稿页面: {} ({})", node.title, node.source.display());
                warnings += 1;
            }
            for image in page_image_refs(node) {
                if site.images.resolve(image).is_none() {
                    warn!(
                        "图片引用失效: {} 引用了 {}",
                        node.source.display(),
                        image.0
                    );
                    warnings += 1;
                }
            }
        }

        for category in &site.snippets.categories {
            if let Some(icon) = &category.icon {
                if site.images.resolve(icon).is_none() {
                    warn!("分类 {} 的图标失效: {}", category.name, icon.0);
                    warnings += 1;
                }
            }
        }
        for item in &site.snippets.social {
            if let Some(icon) = &item.icon {
                if site.images.resolve(icon).is_none() {
                    warn!("社交链接 {} 的图标失效: {}", item.name, icon.0);
                    warnings += 1;
                }
            }
        }

        if warnings == 0 {
            println!("{}", "No problems found.".bright_green());
        } else {
            println!("{}", format!("{} warning(s).", warnings).yellow());
        }

        Ok(())
    }
}

/// 事件是否值得触发一次重新加载
fn relevant_change(event: &notify::Event) -> bool {
    use notify::EventKind;

    if !matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) {
        return false;
    }

    event.paths.iter().any(|path| {
        if path.is_dir() {
            return true;
        }
        match path.extension() {
            Some(ext) => {
                let ext = ext.to_string_lossy().to_lowercase();
                matches!(
                    ext.as_str(),
                    "md" | "markdown" | "yml" | "yaml" | "html" | "css" | "js"
                )
            }
            None => false,
        }
    })
}

/// 页面携带的所有图片引用
fn page_image_refs(node: &PageNode) -> Vec<&ImageRef> {
    match &node.content {
        PageContent::Home(home) => home.hero_image.iter().collect(),
        PageContent::Standard(page) => page.hero_image.iter().collect(),
        PageContent::BlogIndex(index) => index.hero_image.iter().collect(),
        PageContent::Blog(blog) => blog
            .gallery
            .iter()
            .filter_map(|item| item.image.as_ref())
            .collect(),
    }
}
