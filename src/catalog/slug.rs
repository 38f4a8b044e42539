use regex::Regex;
use std::sync::OnceLock;

fn separator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").unwrap())
}

fn slug_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").unwrap())
}

/// Lowercases and collapses every run of non-alphanumerics into one hyphen.
pub fn slugify(title: &str) -> String {
    let lower = title.to_lowercase();
    let s = separator_re().replace_all(&lower, "-");
    s.trim_matches('-').to_string()
}

pub fn is_valid_slug(slug: &str) -> bool {
    slug_re().is_match(slug)
}
