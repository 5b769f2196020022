// src/notify/render.rs
//! Digest bodies: plain text and inline-styled HTML.

use crate::translate::DigestEntry;
use chrono::NaiveDate;
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::fmt::Write as _;

pub fn subject(prefix: &str, date: NaiveDate) -> String {
    format!("{prefix} - {}", date.format("%Y-%m-%d"))
}

fn published(entry: &DigestEntry) -> String {
    entry.item.published_at.format("%m-%d %H:%M").to_string()
}

pub fn render_text(title: &str, date: NaiveDate, entries: &[DigestEntry]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{title} ({})", date.format("%Y-%m-%d"));
    let _ = writeln!(out, "{} stories today", entries.len());
    for (i, e) in entries.iter().enumerate() {
        out.push('\n');
        match e.translated_title.as_deref() {
            Some(t) => {
                let _ = writeln!(out, "{}. {t}", i + 1);
                let _ = writeln!(out, "   {}", e.item.title);
            }
            None => {
                let _ = writeln!(out, "{}. {}", i + 1, e.item.title);
            }
        }
        let _ = writeln!(out, "   {} · {}", e.item.outlet, published(e));
        if let Some(s) = e.translated_summary.as_deref().or(e.item.summary.as_deref()) {
            let _ = writeln!(out, "   {s}");
        }
        let _ = writeln!(out, "   {}", e.item.url);
    }
    out
}

pub fn render_html(title: &str, date: NaiveDate, entries: &[DigestEntry]) -> String {
    let mut items = String::new();
    for (i, e) in entries.iter().enumerate() {
        let shown = e.translated_title.as_deref().unwrap_or(&e.item.title);
        let _ = write!(
            items,
            r#"<div style="margin-bottom:24px;padding:16px;background:#f9f9f9;border-radius:8px;">
<h3 style="margin:0 0 8px 0;font-size:16px;"><span style="color:#666;font-weight:normal;">{rank}.</span> <a href="{href}" style="color:#1a73e8;text-decoration:none;">{shown}</a></h3>
"#,
            rank = i + 1,
            href = encode_double_quoted_attribute(&e.item.url),
            shown = encode_text(shown),
        );
        if e.translated_title.is_some() {
            let _ = writeln!(
                items,
                r#"<p style="margin:0 0 8px 0;color:#999;font-size:13px;">{}</p>"#,
                encode_text(&e.item.title)
            );
        }
        let _ = writeln!(
            items,
            r#"<p style="margin:0 0 8px 0;color:#666;font-size:14px;">{} · {}</p>"#,
            encode_text(&e.item.outlet),
            published(e)
        );
        if let Some(s) = e.translated_summary.as_deref().or(e.item.summary.as_deref()) {
            let _ = writeln!(
                items,
                r#"<p style="margin:0;color:#333;font-size:14px;line-height:1.6;">{}</p>"#,
                encode_text(s)
            );
        }
        items.push_str("</div>\n");
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><meta name="viewport" content="width=device-width, initial-scale=1.0"></head>
<body style="font-family:-apple-system,'Segoe UI',Roboto,Arial,sans-serif;max-width:600px;margin:0 auto;padding:20px;background:#fff;">
<div style="text-align:center;padding:20px 0;border-bottom:2px solid #1a73e8;">
<h1 style="margin:0;color:#333;font-size:24px;">{title}</h1>
<p style="margin:8px 0 0 0;color:#666;">{date}</p>
</div>
<div style="padding:20px 0;">
<p style="color:#666;font-size:14px;">{count} stories today</p>
{items}</div>
</body>
</html>
"#,
        title = encode_text(title),
        date = date.format("%Y-%m-%d"),
        count = entries.len(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Language, NewsItem, SourceKind};
    use chrono::{TimeZone, Utc};

    fn entry(title: &str, translated: Option<&str>) -> DigestEntry {
        DigestEntry {
            item: NewsItem {
                title: title.into(),
                summary: Some("a <b>bold</b> claim".into()),
                url: "https://x.test/?a=1&b=2".into(),
                source: SourceKind::Forum,
                outlet: "Hacker News".into(),
                published_at: Utc.with_ymd_and_hms(2025, 9, 6, 8, 5, 0).unwrap(),
                social_score: 10,
                language: Language::English,
            },
            translated_title: translated.map(Into::into),
            translated_summary: None,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 6).unwrap()
    }

    #[test]
    fn subject_format() {
        assert_eq!(subject("AI News Daily", date()), "AI News Daily - 2025-09-06");
    }

    #[test]
    fn text_lists_rank_outlet_and_time() {
        let out = render_text("AI News Daily", date(), &[entry("GPT <5>", None)]);
        assert!(out.contains("1. GPT <5>"));
        assert!(out.contains("Hacker News · 09-06 08:05"));
    }

    #[test]
    fn html_escapes_everything() {
        let out = render_html("AI News Daily", date(), &[entry("GPT <script>", None)]);
        assert!(out.contains("GPT &lt;script&gt;"));
        assert!(out.contains("a &lt;b&gt;bold&lt;/b&gt; claim"));
        assert!(out.contains("https://x.test/?a=1&amp;b=2"));
        assert!(!out.contains("<script>"));
    }

    #[test]
    fn translated_title_first_original_below() {
        let out = render_html("AI News Daily", date(), &[entry("Claude ships", Some("Claude 发布"))]);
        let t = out.find("Claude 发布").unwrap();
        let o = out.find("Claude ships").unwrap();
        assert!(t < o);
    }
}
