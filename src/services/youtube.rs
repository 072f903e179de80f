//! YouTube link parsing

use url::Url;

fn is_video_id(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn query_video_id(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, value)| value.into_owned())
}

/// Pull the video id out of a watch, short, or embed link.
///
/// Accepts `youtube.com/watch?v=`, `youtu.be/<id>`, `youtube.com/embed/<id>`
/// and any link carrying a `v` query parameter (playlist links included).
pub fn extract_video_id(link: &str) -> Option<String> {
    let link = link.trim();
    if link.is_empty() {
        return None;
    }

    let url = Url::parse(link)
        .or_else(|_| Url::parse(&format!("https://{}", link)))
        .ok()?;
    let host = url.host_str().unwrap_or_default().trim_start_matches("www.");
    let mut segments = url.path_segments().into_iter().flatten().filter(|s| !s.is_empty());

    let id = match host {
        "youtu.be" => segments.next().map(str::to_string),
        h if h.ends_with("youtube.com") || h.ends_with("youtube-nocookie.com") => {
            match segments.next() {
                Some("embed") | Some("shorts") | Some("live") => segments.next().map(str::to_string),
                _ => query_video_id(&url),
            }
        }
        _ => query_video_id(&url),
    }?;

    is_video_id(&id).then_some(id)
}

/// Autoplaying, looping embed URL for the page's player frame
pub fn embed_url(video_id: &str) -> String {
    format!(
        "https://www.youtube.com/embed/{id}?autoplay=1&loop=1&playlist={id}&controls=1&modestbranding=1&rel=0",
        id = video_id
    )
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}
