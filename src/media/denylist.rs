use crate::TranscriptorError;

/// Video-sharing and social sites whose URLs are webpages, not media files
pub const DEFAULT_WEBPAGE_HOSTS: &[&str] = &["youtube.com", "youtu.be", "tiktok.com", "instagram.com"];

/// Rejects URLs that point at known webpage hosts instead of a media file
#[derive(Debug, Clone)]
pub struct WebpageDenylist {
    hosts: Vec<String>,
}

impl WebpageDenylist {
    /// Default hosts plus any extra entries from configuration
    pub fn new<I, S>(extra_hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut hosts: Vec<String> = DEFAULT_WEBPAGE_HOSTS.iter().map(|h| h.to_string()).collect();

        for host in extra_hosts {
            let host = host.as_ref().trim().to_lowercase();
            if !host.is_empty() && !hosts.contains(&host) {
                hosts.push(host);
            }
        }

        Self { hosts }
    }

    /// Return the first denylisted host the URL contains (case-insensitive)
    pub fn matching_host(&self, url: &str) -> Option<&str> {
        let url_lower = url.to_lowercase();
        self.hosts
            .iter()
            .find(|host| url_lower.contains(host.as_str()))
            .map(String::as_str)
    }

    pub fn check(&self, url: &str) -> Result<(), TranscriptorError> {
        match self.matching_host(url) {
            Some(host) => Err(TranscriptorError::WebpageUrl(host.to_string())),
            None => Ok(()),
        }
    }

    #[cfg(test)]
    fn hosts(&self) -> &[String] {
        &self.hosts
    }
}

impl Default for WebpageDenylist {
    fn default() -> Self {
        Self::new(std::iter::empty::<&str>())
    }
}
