//! Absolute links embedded in method results.

/// Builds project, release and file URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Links {
    domain: String,
    files_url: String,
}

impl Links {
    /// Links on `domain`, with downloads at `files_url` where `{path}` stands
    /// for the file's storage path.
    pub fn new(domain: impl Into<String>, files_url: impl Into<String>) -> Self {
        Self { domain: domain.into(), files_url: files_url.into() }
    }

    /// Public domain.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Project page.
    pub fn project(&self, name: &str) -> String {
        format!("https://{}/project/{name}/", self.domain)
    }

    /// Release page.
    pub fn release(&self, name: &str, version: &str) -> String {
        format!("https://{}/project/{name}/{version}/", self.domain)
    }

    /// Download link of the file stored at `path`.
    pub fn file(&self, path: &str) -> String {
        self.files_url.replace("{path}", path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links() {
        let links = Links::new("pypi.org", "https://files.pythonhosted.org/packages/{path}");
        assert_eq!(links.project("Django"), "https://pypi.org/project/Django/");
        assert_eq!(links.release("Django", "4.2"), "https://pypi.org/project/Django/4.2/");
        assert_eq!(
            links.file("ab/cd/Django-4.2.tar.gz"),
            "https://files.pythonhosted.org/packages/ab/cd/Django-4.2.tar.gz"
        );
        assert_eq!(links.domain(), "pypi.org");
    }
}
