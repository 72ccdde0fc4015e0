//! Markdown rendering with site directives
//!
//! On top of GFM this supports the directive syntax used by the content
//! files: `:::details` collapsible containers, `:command[...]` and
//! `:color[...]{...}` inline spans, and `command` fenced blocks. Headings
//! get slug ids and tables a scroll wrapper.

use anyhow::Result;
use lazy_static::lazy_static;
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    static ref INLINE_DIRECTIVE: Regex =
        Regex::new(r":(command|color)\[([^\]]*)\](?:\{([^}]*)\})?").unwrap();
}

/// Markdown renderer for content bodies
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render markdown to HTML
    pub fn render(&self, markdown: &str) -> Result<String> {
        // Front matter is stripped before rendering, so no metadata blocks here
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_HEADING_ATTRIBUTES
            | Options::ENABLE_GFM;
        let parser = Parser::new_ext(markdown, options);

        let mut events: Vec<Event> = Vec::new();
        let mut in_command_block = false;
        let mut command_content = String::new();

        for event in parser {
            match event {
                Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(ref lang)))
                    if lang.split_whitespace().next() == Some("command") =>
                {
                    in_command_block = true;
                    command_content.clear();
                }
                Event::End(TagEnd::CodeBlock) if in_command_block => {
                    events.push(Event::Html(CowStr::from(command_block(&command_content))));
                    in_command_block = false;
                }
                Event::Text(text) if in_command_block => {
                    command_content.push_str(&text);
                }
                _ => events.push(event),
            }
        }

        let events = apply_containers(events);
        let events = apply_inline_directives(events);
        let events = assign_heading_ids(events);
        let events = wrap_tables(events);

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());

        Ok(html_output)
    }

    /// Render a one-line fragment, unwrapping the single paragraph pulldown
    /// produces for it. Used for patch-note items.
    pub fn render_inline(&self, markdown: &str) -> Result<String> {
        let html = self.render(markdown)?;
        let trimmed = html.trim();
        if let Some(inner) = trimmed.strip_prefix("<p>").and_then(|s| s.strip_suffix("</p>")) {
            if !inner.contains("<p>") {
                return Ok(inner.to_string());
            }
        }
        Ok(trimmed.to_string())
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Replace `:::details` / `:::` marker paragraphs with details/summary tags.
///
/// Markers are recognized either as standalone paragraphs or at the first
/// and last line of a paragraph. Unclosed containers are closed at the end
/// of the document; a stray closer stays literal text.
fn apply_containers<'a>(events: Vec<Event<'a>>) -> Vec<Event<'a>> {
    let mut out = Vec::with_capacity(events.len());
    let mut depth = 0usize;
    let mut i = 0;

    while i < events.len() {
        if let Some(marker) = paragraph_marker(&events, i) {
            if marker == ":::" {
                if depth > 0 {
                    out.push(Event::Html("</details>".into()));
                    depth -= 1;
                    i += 3;
                    continue;
                }
            } else if let Some(title) = details_title(&marker) {
                out.push(Event::Html(details_open(&title).into()));
                depth += 1;
                i += 3;
                continue;
            }
        }
        if let Some(marker) = leading_marker(&events, i) {
            if let Some(title) = details_title(&marker) {
                out.push(Event::Html(details_open(&title).into()));
                out.push(Event::Start(Tag::Paragraph));
                depth += 1;
                i += 3;
                continue;
            }
        }
        if depth > 0 && trailing_close(&events, i) {
            out.push(Event::End(TagEnd::Paragraph));
            out.push(Event::Html("</details>".into()));
            depth -= 1;
            i += 3;
            continue;
        }
        out.push(events[i].clone());
        i += 1;
    }

    for _ in 0..depth {
        out.push(Event::Html("</details>".into()));
    }
    out
}

/// A paragraph holding nothing but a `:::` marker line
fn paragraph_marker(events: &[Event<'_>], i: usize) -> Option<String> {
    match (events.get(i), events.get(i + 1), events.get(i + 2)) {
        (
            Some(Event::Start(Tag::Paragraph)),
            Some(Event::Text(text)),
            Some(Event::End(TagEnd::Paragraph)),
        ) if text.trim_start().starts_with(":::") => Some(text.trim().to_string()),
        _ => None,
    }
}

/// A marker on the first line of a longer paragraph
fn leading_marker(events: &[Event<'_>], i: usize) -> Option<String> {
    match (events.get(i), events.get(i + 1), events.get(i + 2)) {
        (Some(Event::Start(Tag::Paragraph)), Some(Event::Text(text)), Some(Event::SoftBreak))
            if text.trim_start().starts_with(":::") =>
        {
            Some(text.trim().to_string())
        }
        _ => None,
    }
}

/// A `:::` closer on the last line of a paragraph
fn trailing_close(events: &[Event<'_>], i: usize) -> bool {
    matches!(
        (events.get(i), events.get(i + 1), events.get(i + 2)),
        (
            Some(Event::SoftBreak),
            Some(Event::Text(text)),
            Some(Event::End(TagEnd::Paragraph)),
        ) if text.trim() == ":::"
    )
}

fn details_title(marker: &str) -> Option<String> {
    let rest = marker.strip_prefix(":::")?;
    let rest = rest.strip_prefix("details")?;
    // Reject other directive names sharing the prefix, e.g. :::detailsgrid
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let title = rest.trim();
    Some(if title.is_empty() {
        "Details".to_string()
    } else {
        title.to_string()
    })
}

fn details_open(title: &str) -> String {
    format!("<details><summary>{}</summary>", html_escape(title))
}

/// Expand `:command[...]` and `:color[...]{...}` inside plain text.
///
/// Adjacent text events are coalesced first because pulldown splits text
/// at unresolved `[`/`]` brackets. Code spans and code blocks are left
/// alone.
fn apply_inline_directives<'a>(events: Vec<Event<'a>>) -> Vec<Event<'a>> {
    let mut out = Vec::with_capacity(events.len());
    let mut text_run = String::new();
    let mut in_code_block = false;

    for event in events {
        match event {
            Event::Text(text) if !in_code_block => text_run.push_str(&text),
            Event::Start(Tag::CodeBlock(_)) => {
                flush_text_run(&mut text_run, &mut out);
                in_code_block = true;
                out.push(event);
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                out.push(event);
            }
            other => {
                flush_text_run(&mut text_run, &mut out);
                out.push(other);
            }
        }
    }
    flush_text_run(&mut text_run, &mut out);
    out
}

fn flush_text_run<'a>(run: &mut String, out: &mut Vec<Event<'a>>) {
    if run.is_empty() {
        return;
    }
    let text = std::mem::take(run);
    if text.contains(":command[") || text.contains(":color[") {
        expand_directives(&text, out);
    } else {
        out.push(Event::Text(text.into()));
    }
}

fn expand_directives<'a>(text: &str, out: &mut Vec<Event<'a>>) {
    let mut last = 0;
    for caps in INLINE_DIRECTIVE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last {
            out.push(Event::Text(text[last..whole.start()].to_string().into()));
        }
        let body = caps.get(2).map_or("", |m| m.as_str());
        let rendered = match caps.get(1).map(|m| m.as_str()) {
            Some("command") => command_span(body),
            _ => color_span(body, caps.get(3).map(|m| m.as_str())),
        };
        out.push(Event::InlineHtml(rendered.into()));
        last = whole.end();
    }
    if last < text.len() {
        out.push(Event::Text(text[last..].to_string().into()));
    }
}

fn command_span(command: &str) -> String {
    let escaped = html_escape(command.trim());
    format!(
        r#"<code class="command" data-command="{}">{}</code>"#,
        escaped, escaped
    )
}

/// A color value is only interpolated into the style attribute when it is
/// a hex code or a bare color name; anything else renders as plain text.
fn color_span(text: &str, value: Option<&str>) -> String {
    let value = value
        .map(|v| v.strip_prefix("color=").unwrap_or(v).trim())
        .unwrap_or("");
    if is_css_color(value) {
        format!(
            r#"<span style="color:{}">{}</span>"#,
            value,
            html_escape(text)
        )
    } else {
        html_escape(text)
    }
}

fn is_css_color(value: &str) -> bool {
    if let Some(hex) = value.strip_prefix('#') {
        return matches!(hex.len(), 3 | 4 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    !value.is_empty() && value.chars().all(|c| c.is_ascii_alphabetic())
}

fn command_block(raw: &str) -> String {
    let escaped = html_escape(raw.trim());
    format!(
        r#"<pre class="command-block"><code data-command="{}">{}</code></pre>"#,
        escaped, escaped
    )
}

/// Give headings without an explicit `{#id}` a slug id, deduplicated with
/// `-2`, `-3` suffixes in document order.
fn assign_heading_ids<'a>(events: Vec<Event<'a>>) -> Vec<Event<'a>> {
    let mut out = Vec::with_capacity(events.len());
    let mut used: HashSet<String> = HashSet::new();
    let mut i = 0;

    while i < events.len() {
        if let Event::Start(Tag::Heading {
            level,
            id,
            classes,
            attrs,
        }) = &events[i]
        {
            if let Some(explicit) = id {
                used.insert(explicit.to_string());
                out.push(events[i].clone());
            } else {
                let text = heading_text(&events[i + 1..]);
                let slug = unique_slug(&text, &mut used);
                out.push(Event::Start(Tag::Heading {
                    level: *level,
                    id: Some(slug.into()),
                    classes: classes.clone(),
                    attrs: attrs.clone(),
                }));
            }
            i += 1;
            continue;
        }
        out.push(events[i].clone());
        i += 1;
    }
    out
}

fn heading_text(events: &[Event<'_>]) -> String {
    let mut text = String::new();
    for event in events {
        match event {
            Event::End(TagEnd::Heading(_)) => break,
            Event::Text(t) | Event::Code(t) => text.push_str(t),
            _ => {}
        }
    }
    text
}

fn unique_slug(text: &str, used: &mut HashSet<String>) -> String {
    let base = slug::slugify(text);
    let base = if base.is_empty() {
        "section".to_string()
    } else {
        base
    };
    if used.insert(base.clone()) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}-{}", base, n);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Wrap tables so wide ones can scroll horizontally
fn wrap_tables<'a>(events: Vec<Event<'a>>) -> Vec<Event<'a>> {
    let mut out = Vec::with_capacity(events.len());
    for event in events {
        match event {
            Event::Start(Tag::Table(_)) => {
                out.push(Event::Html(r#"<div class="table-wrap">"#.into()));
                out.push(event);
            }
            Event::End(TagEnd::Table) => {
                out.push(event);
                out.push(Event::Html("</div>".into()));
            }
            _ => out.push(event),
        }
    }
    out
}

/// Simple HTML escaping
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
