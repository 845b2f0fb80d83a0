use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>"'`)\]]+"#).expect("valid regex"));

static MARKDOWN_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(!?)\[([^\]]*)\]\((https?://[^)\s]+)\)\s*$").expect("valid regex")
});

const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg", ".bmp", ".avif"];
const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".mov", ".webm", ".m4v"];
const IMAGE_HOSTS: &[&str] = &[
    "images.unsplash.com",
    "i.imgur.com",
    "picsum.photos",
    "images.pexels.com",
    "cdn.pixabay.com",
];
const VIDEO_HOSTS: &[&str] = &[
    "youtube.com",
    "youtu.be",
    "vimeo.com",
    "player.vimeo.com",
    "dailymotion.com",
    "tv.naver.com",
    "tiktok.com",
];

/// Prefix text longer than this means the URL is part of prose.
const MAX_URL_PREFIX_CHARS: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Embed,
    Bookmark,
    Link,
}

/// Result of inspecting one line for a standalone URL.
#[derive(Debug, Clone, PartialEq)]
pub enum UrlLine {
    /// No URL on the line.
    None,
    /// The line is predominantly one URL, optionally preceded by a title.
    Single {
        url: String,
        title: Option<String>,
        markdown_image: bool,
    },
    /// Several URLs, an unparsable URL, or a URL inside prose.
    Ambiguous,
}

pub fn find_urls(text: &str) -> Vec<String> {
    URL_RE
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?']).to_string())
        .collect()
}

pub fn is_absolute_http_url(raw: &str) -> bool {
    Url::parse(raw)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

pub fn inspect_line(text: &str) -> UrlLine {
    if let Some(caps) = MARKDOWN_LINK_RE.captures(text) {
        let url = caps[3].to_string();
        if !is_absolute_http_url(&url) {
            return UrlLine::Ambiguous;
        }
        let title = caps[2].trim();
        return UrlLine::Single {
            url,
            title: (!title.is_empty()).then(|| title.to_string()),
            markdown_image: &caps[1] == "!",
        };
    }

    let matches: Vec<regex::Match<'_>> = URL_RE.find_iter(text).collect();
    let m = match matches.as_slice() {
        [] => return UrlLine::None,
        [single] => *single,
        _ => return UrlLine::Ambiguous,
    };

    let url = m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?']);
    if !is_absolute_http_url(url) {
        return UrlLine::Ambiguous;
    }

    let suffix = text[m.end()..].trim();
    if !suffix.chars().all(|c| matches!(c, ')' | '.' | ',' | '!' | '?' | '」' | '>')) {
        return UrlLine::Ambiguous;
    }

    let prefix = text[..m.start()]
        .trim()
        .trim_end_matches([':', '：', '-', '–', '—', '(', '<', '='])
        .trim();
    if prefix.chars().count() > MAX_URL_PREFIX_CHARS {
        return UrlLine::Ambiguous;
    }

    UrlLine::Single {
        url: url.to_string(),
        title: (!prefix.is_empty()).then(|| prefix.to_string()),
        markdown_image: false,
    }
}

/// Media kind implied by the URL itself: file extension or well-known host.
pub fn kind_from_url(raw: &str) -> Option<MediaKind> {
    let url = Url::parse(raw).ok()?;
    let host = url.host_str()?.to_lowercase();
    let host = host
        .strip_prefix("www.")
        .or_else(|| host.strip_prefix("m."))
        .unwrap_or(&host)
        .to_string();
    let path = url.path().to_lowercase();

    if IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) || IMAGE_HOSTS.contains(&host.as_str()) {
        return Some(MediaKind::Image);
    }
    if VIDEO_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) || VIDEO_HOSTS.contains(&host.as_str()) {
        return Some(MediaKind::Video);
    }
    None
}

/// Media kind named by a cue word in free text ("이미지", "video", "북마크" …).
pub fn kind_from_words(text: &str) -> Option<MediaKind> {
    let lower = text.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));
    if has(&["image", "이미지", "사진", "그림", "photo", "picture"]) {
        Some(MediaKind::Image)
    } else if has(&["video", "동영상", "영상", "비디오", "유튜브", "youtube"]) {
        Some(MediaKind::Video)
    } else if has(&["embed", "임베드", "삽입"]) {
        Some(MediaKind::Embed)
    } else if has(&["bookmark", "북마크"]) {
        Some(MediaKind::Bookmark)
    } else if has(&["link", "링크", "url"]) {
        Some(MediaKind::Link)
    } else {
        None
    }
}

/// Host name without `www.`, used to match instruction clauses to URLs.
pub fn short_host(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    let host = url.host_str()?.to_lowercase();
    Some(host.strip_prefix("www.").unwrap_or(&host).to_string())
}
