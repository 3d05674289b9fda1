use reqwest::Url;

/// Rewrites upstream image URLs so browsers fetch them through the local
/// `/api/proxy` endpoint instead of hot-linking the provider.
#[derive(Debug, Clone)]
pub struct ImageProxy {
    endpoint: Url,
}

impl ImageProxy {
    /// `public_url` is the externally visible base of this server, e.g.
    /// `http://localhost:9000`.
    pub fn new(public_url: &str) -> Result<Self, String> {
        let mut base = Url::parse(public_url).map_err(|e| format!("{public_url}: {e}"))?;
        if base.cannot_be_a_base() {
            return Err(format!("{public_url}: not a base URL"));
        }
        // Without the trailing slash `join` would replace the last segment.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base
            .join("api/proxy")
            .map_err(|e| format!("{public_url}: {e}"))?;

        Ok(Self { endpoint })
    }

    pub fn wrap(&self, image_url: &str) -> String {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("url", image_url);
        url.to_string()
    }
}
