use std::path::Path;

pub mod markdown;

/// 从文本生成 URL 友好的别名
pub fn slugify(text: &str) -> String {
    slug::slugify(text)
}

/// 检查文件是否为 Markdown 文件
pub fn is_markdown_file<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();
    if let Some(ext) = path.extension() {
        ext == "md" || ext == "markdown"
    } else {
        false
    }
}

/// 拼接 URL 路径片段
///
/// 去掉多余的斜杠，结果始终以斜杠开头和结尾，
/// 例如 `join_url("/blog/", &["tags", "django"])` 得到 `/blog/tags/django/`。
pub fn join_url(base: &str, segments: &[&str]) -> String {
    let mut parts: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    for segment in segments {
        parts.extend(segment.split('/').filter(|s| !s.is_empty()));
    }

    if parts.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", parts.join("/"))
    }
}

/// 把请求路径拆分为片段（忽略空段）
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}
