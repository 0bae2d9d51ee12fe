use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::models::Config;
use crate::site::{route_page, ContextBuilder, RouteOutcome, Site};
use crate::theme::ThemeRenderer;

/// 一次性消息的 Cookie 名
const MESSAGES_COOKIE: &str = "rw_messages";

/// HTTP 服务器：请求时渲染页面，静态资源和图片走文件服务
pub struct Server {
    /// 站点根目录
    base_dir: PathBuf,
    /// 站点配置
    config: Config,
    /// 站点内容
    site: Arc<RwLock<Site>>,
    /// 主题渲染器
    renderer: Arc<RwLock<ThemeRenderer>>,
    /// 端口
    port: u16,
}

/// 请求处理的共享状态
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    site: Arc<RwLock<Site>>,
    renderer: Arc<RwLock<ThemeRenderer>>,
}

impl Server {
    /// 创建新的服务器
    pub fn new(
        base_dir: PathBuf,
        config: Config,
        site: Arc<RwLock<Site>>,
        renderer: Arc<RwLock<ThemeRenderer>>,
        port: u16,
    ) -> Self {
        Self {
            base_dir,
            config,
            site,
            renderer,
            port,
        }
    }

    /// 启动服务器
    pub async fn start(self) -> Result<()> {
        // 主题静态资源和图片库
        let static_dir = self.renderer.read().unwrap().source_dir();
        let media_dir = self.base_dir.join(self.config.image_dir());

        let state = AppState {
            config: Arc::new(self.config),
            site: self.site,
            renderer: self.renderer,
        };

        let app = Router::new()
            .route("/search", get(search_handler))
            .route("/search/", get(search_handler))
            .nest_service("/static", ServeDir::new(static_dir))
            .nest_service("/media", ServeDir::new(media_dir))
            .fallback(page_handler)
            .layer(TraceLayer::new_for_http())
            .with_state(state);

        let addr: SocketAddr = format!("0.0.0.0:{}", self.port).parse()?;
        info!("Server started at http://localhost:{}", self.port);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

/// 页面请求的兜底处理：解析路径、路由、渲染
async fn page_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    if let Some(response) = reject_bad_host(&state.config, &headers) {
        return response;
    }

    let page_param = params.get("page").map(|s| s.as_str());

    // 路由和上下文组装都在读锁内完成，渲染放在锁外
    let outcome = {
        let site = state.site.read().unwrap();
        route_page(&site, &state.config, uri.path(), page_param)
    };

    match outcome {
        RouteOutcome::Render { template, context } => {
            render_page(&state, &template, context, &headers)
        }
        RouteOutcome::Redirect { location, messages } => {
            debug!("重定向到 {}，附带 {} 条消息", location, messages.len());
            (
                StatusCode::FOUND,
                [
                    (header::LOCATION, location),
                    (header::SET_COOKIE, messages_cookie(&messages)),
                ],
            )
                .into_response()
        }
        RouteOutcome::NotFound => not_found(&state),
    }
}

/// 搜索页：?query= 全文检索，?page= 翻页
async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if let Some(response) = reject_bad_host(&state.config, &headers) {
        return response;
    }

    let query = params.get("query").cloned().unwrap_or_default();
    let page_param = params.get("page").map(|s| s.as_str());

    let context = {
        let site = state.site.read().unwrap();
        let results = site.search.search(&query);
        ContextBuilder::new(&site, &state.config).search(&query, results, page_param)
    };

    render_page(&state, "search.html", context, &headers)
}

/// 渲染模板并处理一次性消息：有 Cookie 时填进上下文并带清除头返回
fn render_page(
    state: &AppState,
    template: &str,
    mut context: tera::Context,
    headers: &HeaderMap,
) -> Response {
    let incoming = read_messages(headers);
    if let Some(messages) = &incoming {
        if !messages.is_empty() {
            context.insert("messages", messages);
        }
    }

    let rendered = {
        let renderer = state.renderer.read().unwrap();
        renderer.render_template(template, &context)
    };

    match rendered {
        Ok(body) => {
            if incoming.is_some() {
                ([(header::SET_COOKIE, clear_messages_cookie())], Html(body)).into_response()
            } else {
                Html(body).into_response()
            }
        }
        Err(e) => server_error(&state.config, e),
    }
}

/// 404 响应，主题带 404.html 时用它渲染
fn not_found(state: &AppState) -> Response {
    let context = {
        let site = state.site.read().unwrap();
        ContextBuilder::new(&site, &state.config).not_found()
    };

    let rendered = {
        let renderer = state.renderer.read().unwrap();
        if renderer.has_layout("404.html") {
            renderer.render_template("404.html", &context).ok()
        } else {
            None
        }
    };

    match rendered {
        Some(body) => (StatusCode::NOT_FOUND, Html(body)).into_response(),
        None => (StatusCode::NOT_FOUND, "Not Found").into_response(),
    }
}

/// 渲染失败的 500 响应，调试模式下带错误详情
fn server_error(config: &Config, error: anyhow::Error) -> Response {
    error!("渲染失败: {:#}", error);
    let body = if config.debug() {
        format!("Internal Server Error\n\n{:#}", error)
    } else {
        "Internal Server Error".to_string()
    };
    (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
}

/// Host 头不在白名单内时返回 400
fn reject_bad_host(config: &Config, headers: &HeaderMap) -> Option<Response> {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    if config.host_allowed(host) {
        None
    } else {
        debug!("拒绝请求，Host 不在白名单内: {}", host);
        Some((StatusCode::BAD_REQUEST, "Bad Request (400)").into_response())
    }
}

/// 从 Cookie 头取出一次性消息
///
/// 没有消息 Cookie 时返回 None；有 Cookie 时返回其中的消息列表，
/// 调用方渲染完成后负责带上清除头。
fn read_messages(headers: &HeaderMap) -> Option<Vec<String>> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    let prefix = format!("{}=", MESSAGES_COOKIE);
    let raw = cookies
        .split(';')
        .find_map(|part| part.trim().strip_prefix(prefix.as_str()))?;

    let messages = url::form_urlencoded::parse(raw.as_bytes())
        .filter(|(key, _)| key == "m")
        .map(|(_, value)| value.into_owned())
        .collect();
    Some(messages)
}

/// 把消息编码进 Set-Cookie 值
fn messages_cookie(messages: &[String]) -> String {
    let mut encoded = url::form_urlencoded::Serializer::new(String::new());
    for message in messages {
        encoded.append_pair("m", message);
    }
    format!("{}={}; Path=/; HttpOnly", MESSAGES_COOKIE, encoded.finish())
}

/// 清除消息 Cookie 的 Set-Cookie 值
fn clear_messages_cookie() -> String {
    format!("{}=; Path=/; Max-Age=0; HttpOnly", MESSAGES_COOKIE)
}
