use std::{collections::HashMap, error::Error};

#[cfg(feature = "resolve-file")]
use std::fs;

use url::Url;

/// Fetches the raw content of documents for one or more uri schemes.
pub trait UrlLoader: Send + Sync {
    fn load(&self, url: &Url) -> Result<Vec<u8>, Box<dyn Error + Send + Sync>>;
}

impl<F> UrlLoader for F
where
    F: Fn(&Url) -> Result<Vec<u8>, Box<dyn Error + Send + Sync>> + Send + Sync,
{
    fn load(&self, url: &Url) -> Result<Vec<u8>, Box<dyn Error + Send + Sync>> {
        self(url)
    }
}

// --

/// Loads `file` urls from the local filesystem.
#[cfg(feature = "resolve-file")]
pub struct FileLoader;

#[cfg(feature = "resolve-file")]
impl UrlLoader for FileLoader {
    fn load(&self, url: &Url) -> Result<Vec<u8>, Box<dyn Error + Send + Sync>> {
        let path = url.to_file_path().map_err(|_| "invalid file path")?;
        Ok(fs::read(path)?)
    }
}

// --

/// Registry of [`UrlLoader`]s keyed by uri scheme.
pub struct SchemeUrlLoader(HashMap<String, Box<dyn UrlLoader>>);

impl Default for SchemeUrlLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemeUrlLoader {
    /// Registry with `file` scheme registered, if enabled.
    pub fn new() -> Self {
        #[allow(unused_mut)]
        let mut v = Self(HashMap::new());
        #[cfg(feature = "resolve-file")]
        v.register("file", Box::new(FileLoader));
        v
    }

    /// Registry with nothing registered.
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Registers `loader` for `scheme`, replacing any earlier one.
    pub fn register(&mut self, scheme: &str, loader: Box<dyn UrlLoader>) {
        self.0.insert(scheme.to_ascii_lowercase(), loader);
    }

    pub fn get(&self, scheme: &str) -> Option<&dyn UrlLoader> {
        self.0.get(scheme).map(Box::as_ref)
    }

    pub fn schemes(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

// --

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_loader() {
        let mut loaders = SchemeUrlLoader::empty();
        loaders.register(
            "MEM",
            Box::new(|url: &Url| -> Result<Vec<u8>, Box<dyn Error + Send + Sync>> {
                Ok(url.path().as_bytes().to_vec())
            }),
        );
        let url = Url::parse("mem:/schema").unwrap();
        let loader = loaders.get(url.scheme()).unwrap();
        assert_eq!(loader.load(&url).unwrap(), b"/schema");
        assert!(loaders.get("http").is_none());
    }

    #[cfg(feature = "resolve-file")]
    #[test]
    fn test_file_loader() {
        let path = fs::canonicalize("tests/examples/schema.json").unwrap();
        let url = Url::from_file_path(path).unwrap();
        let loaders = SchemeUrlLoader::new();
        let bytes = loaders.get("file").unwrap().load(&url).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(v.is_object());
    }
}
