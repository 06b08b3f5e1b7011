use reqwest::Url;
use serde::Serialize;

use crate::config::RemoteConfig;

/// Rendered outputs that can be fetched once a job completes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadKind {
    Original,
    Subtitled,
    Dubbed,
    Complete,
}

impl DownloadKind {
    pub const ALL: [DownloadKind; 4] = [
        DownloadKind::Original,
        DownloadKind::Subtitled,
        DownloadKind::Dubbed,
        DownloadKind::Complete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadKind::Original => "original",
            DownloadKind::Subtitled => "subtitled",
            DownloadKind::Dubbed => "dubbed",
            DownloadKind::Complete => "complete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadLink {
    pub kind: DownloadKind,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadLinks {
    pub project_url: String,
    pub source_video_url: String,
    pub links: Vec<DownloadLink>,
}

impl DownloadLinks {
    pub fn build(remote: &RemoteConfig, project_id: &str, video_url: &str) -> Self {
        let project_url = format!("{}/{}", remote.project_url_base.trim_end_matches('/'), project_id);
        let download_base = format!("{}/{}", remote.download_url_base.trim_end_matches('/'), project_id);

        let links = DownloadKind::ALL
            .iter()
            .map(|kind| DownloadLink {
                kind: *kind,
                url: download_url(&download_base, *kind, video_url),
            })
            .collect();

        Self {
            project_url,
            source_video_url: video_url.to_string(),
            links,
        }
    }

    pub fn get(&self, kind: DownloadKind) -> Option<&str> {
        self.links
            .iter()
            .find(|link| link.kind == kind)
            .map(|link| link.url.as_str())
    }
}

fn download_url(base: &str, kind: DownloadKind, video_url: &str) -> String {
    if kind == DownloadKind::Original {
        return video_url.to_string();
    }
    match Url::parse_with_params(base, &[("type", kind.as_str()), ("url", video_url)]) {
        Ok(url) => url.into(),
        Err(_) => format!("{base}?type={}", kind.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_embed_project_and_encoded_source() {
        let links = DownloadLinks::build(&RemoteConfig::default(), "demo-project-abc", "https://x.test/v?id=1&t=2");

        assert_eq!(links.project_url, "https://www.kapwing.com/studio/editor/demo-project-abc");
        let dubbed = links.get(DownloadKind::Dubbed).unwrap();
        assert!(dubbed.starts_with("https://api.kapwing.com/v1/videos/download/demo-project-abc?type=dubbed&url="));
        assert!(dubbed.contains("https%3A%2F%2Fx.test%2Fv%3Fid%3D1%26t%3D2"));
        assert_eq!(links.get(DownloadKind::Original), Some("https://x.test/v?id=1&t=2"));
        assert_eq!(links.links.len(), 4);
    }
}
