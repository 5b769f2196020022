// src/notify/subscribers.rs
//! File-backed subscriber list: one address per line, lowercase, sorted.

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Pull the mail address out of a `From:` header value
/// (`"Jane Doe <jane@example.com>"` → `jane@example.com`).
pub fn extract_address(from_header: &str) -> Option<String> {
    static RE_ADDR: OnceCell<Regex> = OnceCell::new();
    let re = RE_ADDR.get_or_init(|| Regex::new(r"[\w.+-]+@[\w-]+(?:\.[\w-]+)*\.\w+").expect("addr regex"));
    re.find(from_header).map(|m| m.as_str().to_lowercase())
}

/// Missing file means no subscribers yet.
pub fn load(path: &Path) -> Result<BTreeSet<String>> {
    if !path.exists() {
        return Ok(BTreeSet::new());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading subscribers from {}", path.display()))?;
    Ok(clean(content.lines()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    pub added: usize,
    pub total: usize,
}

/// Union `new` into the file and rewrite it sorted.
pub fn merge<I, S>(path: &Path, new: I) -> Result<MergeOutcome>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let existing = load(path)?;
    let before = existing.len();
    let mut all = existing;
    all.extend(clean(new));

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let mut body = String::new();
    for addr in &all {
        body.push_str(addr);
        body.push('\n');
    }
    fs::write(path, body).with_context(|| format!("writing subscribers to {}", path.display()))?;

    let outcome = MergeOutcome {
        added: all.len() - before,
        total: all.len(),
    };
    tracing::info!(target: "notify", added = outcome.added, total = outcome.total, "subscriber list updated");
    Ok(outcome)
}

/// `EMAIL_TO` (comma separated) ∪ file subscribers, de-duplicated and sorted.
pub fn recipients(email_to: &str, subscribers: &BTreeSet<String>) -> Vec<String> {
    let mut all = clean(email_to.split(','));
    all.extend(subscribers.iter().cloned());
    all.into_iter().collect()
}

fn clean<I, S>(items: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| s.as_ref().trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_from_display_name_header() {
        assert_eq!(
            extract_address("Jane Doe <Jane.Doe@Example.co.uk>").as_deref(),
            Some("jane.doe@example.co.uk")
        );
        assert_eq!(extract_address("bob+ai@mail.test").as_deref(), Some("bob+ai@mail.test"));
        assert_eq!(extract_address("no address here"), None);
    }

    #[test]
    fn merge_unions_and_sorts() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("data").join("subscribers.txt");

        let first = merge(&p, ["b@x.test", "a@x.test"]).unwrap();
        assert_eq!(first, MergeOutcome { added: 2, total: 2 });

        let second = merge(&p, ["A@x.test", " c@x.test ", ""]).unwrap();
        assert_eq!(second, MergeOutcome { added: 1, total: 3 });

        let content = fs::read_to_string(&p).unwrap();
        assert_eq!(content, "a@x.test\nb@x.test\nc@x.test\n");
    }

    #[test]
    fn recipients_union_is_case_insensitive() {
        let subs: BTreeSet<String> = ["ops@x.test".to_string()].into_iter().collect();
        let r = recipients(" Ops@x.test, dev@x.test ,", &subs);
        assert_eq!(r, vec!["dev@x.test".to_string(), "ops@x.test".to_string()]);
    }
}
