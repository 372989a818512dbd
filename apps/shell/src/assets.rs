//! Custom `vitrine://` protocol serving page assets from the asset root.
//!
//! The start URL embeds the absolute root path, so relative references in
//! the page (`bridge.js`, `main.js`) come back as absolute `vitrine://`
//! URIs. Everything outside the root is refused.

use std::{
    fs,
    path::{Path, PathBuf},
};

use wry::http::{Request, Response, ResponseBuilder};

pub const SCHEME: &str = "vitrine";

pub fn start_url(root: &Path, page: &str) -> String {
    format!("{}://{}", SCHEME, root.join(page).display())
}

pub fn handle(root: &Path, request: &Request) -> Result<Response, wry::Error> {
    let uri = request.uri().replace("vitrine://", "");

    match resolve(root, &uri) {
        Ok(path) => {
            let mime = mime_guess::from_path(&path)
                .first_raw()
                .unwrap_or("application/octet-stream");
            let content = fs::read(path)?;
            ResponseBuilder::new().mimetype(mime).body(content)
        }
        Err(ResolveError::Outside) => {
            tracing::warn!(%uri, "refusing asset request outside the asset root");
            ResponseBuilder::new()
                .status(403)
                .mimetype("text/plain")
                .body(b"forbidden".to_vec())
        }
        Err(ResolveError::NotFound) => ResponseBuilder::new()
            .status(404)
            .mimetype("text/plain")
            .body(b"not found".to_vec()),
    }
}

#[derive(Debug, PartialEq, Eq)]
enum ResolveError {
    Outside,
    NotFound,
}

/// Canonicalizes the requested path and requires it to stay under the root.
fn resolve(root: &Path, requested: &str) -> Result<PathBuf, ResolveError> {
    let root = fs::canonicalize(root).map_err(|_| ResolveError::NotFound)?;
    let path = fs::canonicalize(requested).map_err(|_| ResolveError::NotFound)?;
    if path.starts_with(&root) {
        Ok(path)
    } else {
        Err(ResolveError::Outside)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_a_file_under_the_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let page = dir.path().join("index.html");
        fs::write(&page, "<html></html>").expect("write");

        let resolved = resolve(dir.path(), &page.display().to_string()).expect("resolve");
        assert_eq!(resolved, fs::canonicalize(&page).expect("canonical"));
    }

    #[test]
    fn refuses_paths_outside_the_root() {
        let outer = tempfile::tempdir().expect("tempdir");
        let root = outer.path().join("root");
        fs::create_dir(&root).expect("mkdir");
        let secret = outer.path().join("secret.txt");
        fs::write(&secret, "no").expect("write");

        assert_eq!(
            resolve(&root, &secret.display().to_string()),
            Err(ResolveError::Outside)
        );
    }

    #[test]
    fn refuses_dot_dot_escapes_after_canonicalization() {
        let outer = tempfile::tempdir().expect("tempdir");
        let root = outer.path().join("root");
        fs::create_dir(&root).expect("mkdir");
        let secret = outer.path().join("secret.txt");
        fs::write(&secret, "no").expect("write");

        let sneaky = root.join("..").join("secret.txt");
        assert_eq!(
            resolve(&root, &sneaky.display().to_string()),
            Err(ResolveError::Outside)
        );
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("missing.html");
        assert_eq!(
            resolve(dir.path(), &missing.display().to_string()),
            Err(ResolveError::NotFound)
        );
    }

    #[test]
    fn start_url_embeds_the_absolute_page_path() {
        let url = start_url(Path::new("/tmp/vitrine"), "index.html");
        assert_eq!(url, "vitrine:///tmp/vitrine/index.html");
    }
}
