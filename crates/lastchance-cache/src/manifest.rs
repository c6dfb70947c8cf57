//! Asset manifest
//!
//! A manifest is a cache generation name plus the fixed list of assets that
//! generation must contain. Bumping the name forces a full re-fetch and
//! retires every older generation on activate.

use url::Url;

use crate::error::CacheError;
use crate::Result;

/// Files making up the app shell, resolved against the shell base URL
const APP_SHELL_FILES: &[&str] = &["index.html", "style.css", "app.js", "manifest.json"];

/// Webfont stylesheet fetched alongside the shell
const FONT_STYLESHEET: &str = "https://fonts.googleapis.com/css2?family=Inter:wght@400;500;600&family=Merriweather:ital@0;1&family=Roboto+Mono:wght@400;500;700&display=swap";

#[derive(Debug, Clone)]
pub struct AssetManifest {
    /// Cache generation name, e.g. "lastchance-v2"
    generation: String,
    assets: Vec<Url>,
}

impl AssetManifest {
    pub fn new(generation: impl Into<String>, assets: Vec<String>) -> Result<Self> {
        let assets = assets
            .into_iter()
            .map(|raw| Url::parse(&raw).map_err(|_| CacheError::InvalidAssetUrl(raw)))
            .collect::<Result<Vec<Url>>>()?;

        Ok(Self {
            generation: generation.into(),
            assets,
        })
    }

    /// Standard manifest: the app shell files plus the font stylesheet.
    pub fn app_shell(generation: impl Into<String>, base: &Url) -> Result<Self> {
        let mut assets = Vec::with_capacity(APP_SHELL_FILES.len() + 2);
        assets.push(base.clone());

        for file in APP_SHELL_FILES {
            let asset = base
                .join(file)
                .map_err(|_| CacheError::InvalidAssetUrl((*file).to_string()))?;
            assets.push(asset);
        }

        let fonts = Url::parse(FONT_STYLESHEET)
            .map_err(|_| CacheError::InvalidAssetUrl(FONT_STYLESHEET.to_string()))?;
        assets.push(fonts);

        Ok(Self {
            generation: generation.into(),
            assets,
        })
    }

    pub fn generation(&self) -> &str {
        &self.generation
    }

    pub fn assets(&self) -> &[Url] {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}
