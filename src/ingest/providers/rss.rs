// src/ingest/providers/rss.rs
//! RSS 2.0 and Atom feeds. The document root picks the dialect.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use quick_xml::de::from_str;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;

use crate::ingest::types::{RawItem, SourceProvider};
use crate::item::{Language, SourceKind};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    id: Option<String>,
    title: Option<AtomText>,
    #[serde(rename = "link", default)]
    link: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<AtomText>,
    content: Option<AtomText>,
    #[serde(rename = "author", default)]
    author: Vec<AtomAuthor>,
}

/// Text construct; the `type` attribute is ignored, markup is cleaned later.
#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: String,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomAuthor {
    name: Option<String>,
}

/// One feed entry, whichever dialect it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FeedEntry {
    pub id: Option<String>,
    pub title: String,
    pub link: String,
    pub published: Option<String>,
    pub summary: Option<String>,
    pub authors: Vec<String>,
}

impl From<Item> for FeedEntry {
    fn from(it: Item) -> Self {
        Self {
            id: None,
            title: it.title.unwrap_or_default(),
            link: it.link.unwrap_or_default().trim().to_string(),
            published: it.pub_date,
            summary: it.description,
            authors: Vec::new(),
        }
    }
}

impl From<AtomEntry> for FeedEntry {
    fn from(e: AtomEntry) -> Self {
        // rel defaults to "alternate"; fall back to the first link, then a URL id.
        let link = e
            .link
            .iter()
            .find(|l| l.rel.as_deref().map_or(true, |r| r == "alternate"))
            .or_else(|| e.link.first())
            .map(|l| l.href.trim().to_string())
            .or_else(|| e.id.clone().filter(|id| id.starts_with("http")))
            .unwrap_or_default();
        Self {
            id: e.id,
            title: e.title.map(|t| t.value).unwrap_or_default(),
            link,
            published: e.published.or(e.updated),
            summary: e.summary.or(e.content).map(|t| t.value),
            authors: e
                .author
                .into_iter()
                .filter_map(|a| a.name)
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .collect(),
        }
    }
}

/// Local name of the document element, e.g. `rss` or `feed`.
fn root_element(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned())
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

/// Parse an RSS 2.0 or Atom document. Entries without a title or link are
/// dropped here.
pub(crate) fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>> {
    let xml = scrub_html_entities_for_xml(xml);
    let entries: Vec<FeedEntry> = match root_element(&xml).as_deref() {
        Some("rss") => {
            let rss: Rss = from_str(&xml).context("rss xml")?;
            rss.channel.item.into_iter().map(FeedEntry::from).collect()
        }
        Some("feed") => {
            let feed: AtomFeed = from_str(&xml).context("atom xml")?;
            feed.entry.into_iter().map(FeedEntry::from).collect()
        }
        Some(other) => return Err(anyhow!("unsupported feed root <{other}>")),
        None => return Err(anyhow!("no xml document element")),
    };
    Ok(entries
        .into_iter()
        .filter(|e| !e.title.trim().is_empty() && !e.link.is_empty())
        .collect())
}

/// Generic feed source (36氪, 虎嗅, TechCrunch, The Verge, Nitter, ...).
pub struct RssProvider {
    name: String,
    source: SourceKind,
    language: Language,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl RssProvider {
    pub fn from_fixture(name: &str, source: SourceKind, language: Language, xml: &str) -> Self {
        Self {
            name: name.to_string(),
            source,
            language,
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    pub fn from_url(
        name: &str,
        source: SourceKind,
        language: Language,
        url: &str,
        client: reqwest::Client,
    ) -> Self {
        Self {
            name: name.to_string(),
            source,
            language,
            mode: Mode::Http {
                url: url.to_string(),
                client,
            },
        }
    }

    /// Parse a feed body into raw items; validation is left to the ingest layer.
    pub fn parse_items_from_str(&self, s: &str) -> Result<Vec<RawItem>> {
        let t0 = std::time::Instant::now();
        let entries = parse_feed(s).with_context(|| format!("parsing {} feed", self.name))?;

        let out = entries
            .into_iter()
            .map(|e| RawItem {
                title: e.title,
                summary: e.summary,
                url: e.link,
                outlet: self.name.clone(),
                source: self.source,
                published: e.published,
                social_score: None,
                language: self.language,
            })
            .collect();

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("ingest_parse_ms").record(ms);
        Ok(out)
    }
}

#[async_trait]
impl SourceProvider for RssProvider {
    async fn fetch_latest(&self) -> Result<Vec<RawItem>> {
        match &self.mode {
            Mode::Fixture(s) => self.parse_items_from_str(s),
            Mode::Http { url, client } => {
                let body = client
                    .get(url)
                    .send()
                    .await
                    .with_context(|| format!("{} http get()", self.name))?
                    .error_for_status()
                    .with_context(|| format!("{} http status", self.name))?
                    .text()
                    .await
                    .with_context(|| format!("{} http .text()", self.name))?;
                self.parse_items_from_str(&body)
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// HTML entities that feeds leak outside CDATA and that XML does not define.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&hellip;", "...")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>t</title>
<item><title>OpenAI ships GPT-5&nbsp;today</title><link>https://a.test/1</link>
<pubDate>Sat, 06 Sep 2025 10:00:00 +0000</pubDate><description><![CDATA[<p>Big <b>news</b></p>]]></description></item>
<item><title></title><link>https://a.test/2</link></item>
<item><title>No link</title></item>
</channel></rss>"#;

    #[tokio::test]
    async fn fixture_parses_and_skips_incomplete_entries() {
        let p = RssProvider::from_fixture("TechCrunch", SourceKind::MainstreamMedia, Language::English, FEED);
        let items = p.fetch_latest().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "OpenAI ships GPT-5 today");
        assert_eq!(items[0].outlet, "TechCrunch");
        assert_eq!(items[0].summary.as_deref(), Some("<p>Big <b>news</b></p>"));
        assert_eq!(
            items[0].published.as_deref(),
            Some("Sat, 06 Sep 2025 10:00:00 +0000")
        );
    }

    #[tokio::test]
    async fn empty_channel_is_not_an_error() {
        let xml = r#"<rss><channel><title>empty</title></channel></rss>"#;
        let p = RssProvider::from_fixture("x", SourceKind::Social, Language::Unknown, xml);
        assert!(p.fetch_latest().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn garbage_is_an_error() {
        let p = RssProvider::from_fixture("x", SourceKind::Social, Language::Unknown, "<html>");
        assert!(p.fetch_latest().await.is_err());
    }

    const ATOM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xml:lang="en-US">
  <title>The Verge</title>
  <link href="https://www.theverge.com/" rel="alternate"/>
  <updated>2025-09-06T10:00:00-04:00</updated>
  <entry>
    <published>2025-09-06T09:30:00-04:00</published>
    <updated>2025-09-06T09:45:00-04:00</updated>
    <title type="html"><![CDATA[Anthropic&#8217;s Claude gets a memory]]></title>
    <content type="html"><![CDATA[<p>Claude can now <em>remember</em>.</p>]]></content>
    <link rel="alternate" type="text/html" href="https://www.theverge.com/ai/1"/>
    <id>https://www.theverge.com/?p=1</id>
    <author><name>Jane Roe</name></author>
  </entry>
  <entry>
    <updated>2025-09-06T08:00:00Z</updated>
    <title>OpenAI DevDay dates</title>
    <link rel="related" href="https://openai.test/devday"/>
    <link href="https://www.theverge.com/ai/2"/>
    <summary>Short one</summary>
    <id>tag:theverge.com,2025:2</id>
  </entry>
  <entry>
    <title>No link at all</title>
    <id>tag:theverge.com,2025:3</id>
  </entry>
</feed>"#;

    #[tokio::test]
    async fn atom_feed_parses_entries() {
        let p = RssProvider::from_fixture("The Verge", SourceKind::MainstreamMedia, Language::English, ATOM);
        let items = p.fetch_latest().await.unwrap();
        assert_eq!(items.len(), 2);

        assert_eq!(items[0].title, "Anthropic&#8217;s Claude gets a memory");
        assert_eq!(items[0].url, "https://www.theverge.com/ai/1");
        assert_eq!(items[0].published.as_deref(), Some("2025-09-06T09:30:00-04:00"));
        assert_eq!(
            items[0].summary.as_deref(),
            Some("<p>Claude can now <em>remember</em>.</p>")
        );

        // No rel means alternate; `updated` stands in for `published`.
        assert_eq!(items[1].url, "https://www.theverge.com/ai/2");
        assert_eq!(items[1].published.as_deref(), Some("2025-09-06T08:00:00Z"));
        assert_eq!(items[1].summary.as_deref(), Some("Short one"));
        assert_eq!(items[1].outlet, "The Verge");
    }

    #[test]
    fn atom_authors_are_collected() {
        let entries = parse_feed(ATOM).unwrap();
        assert_eq!(entries[0].authors, vec!["Jane Roe".to_string()]);
        assert_eq!(entries[0].id.as_deref(), Some("https://www.theverge.com/?p=1"));
    }

    #[test]
    fn unknown_root_is_an_error() {
        let err = parse_feed("<opml><body/></opml>").unwrap_err();
        assert!(format!("{err:#}").contains("opml"));
    }
}
