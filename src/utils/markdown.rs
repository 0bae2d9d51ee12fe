use anyhow::Result;
use pulldown_cmark::{html, Event, Options, Parser};

/// 将Markdown渲染为HTML
pub fn render(markdown: &str) -> Result<String> {
    // 创建Markdown解析选项
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    // 解析Markdown
    let parser = Parser::new_ext(markdown, options);

    // 将解析结果渲染为HTML
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);

    Ok(html_output)
}

/// 提取Markdown中的纯文本（用于搜索索引）
pub fn plain_text(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, Options::empty());
    let mut text = String::new();

    for event in parser {
        match event {
            Event::Text(t) | Event::Code(t) => {
                if !text.is_empty() && !text.ends_with(' ') {
                    text.push(' ');
                }
                text.push_str(&t);
            }
            Event::SoftBreak | Event::HardBreak => {
                if !text.ends_with(' ') {
                    text.push(' ');
                }
            }
            _ => {}
        }
    }

    text.trim().to_string()
}
