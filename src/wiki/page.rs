#![forbid(unsafe_code)]

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use log::debug;

use crate::utils::errors::Errors;

// ***************************************************************************
//                                Constants
// ***************************************************************************
const PAGE_FILE_SUFFIX : &str = ".txt";
const PAGE_FILE_MODE   : u32  = 0o600;

// ***************************************************************************
//                                  Title
// ***************************************************************************
/// A page title that is known to be non-empty and purely ASCII alphanumeric,
/// so it can be used directly as a file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Title(String);

impl Title {
    pub fn parse(s: &str) -> Result<Title, Errors> {
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric()) {
            Ok(Title(s.to_string()))
        } else {
            Err(Errors::InvalidTitle(s.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ***************************************************************************
//                                  Page
// ***************************************************************************
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub title: Title,
    pub body: Vec<u8>,
}

impl Page {
    pub fn new(title: Title, body: Vec<u8>) -> Self {
        Page { title, body }
    }

    /// A page that has never been saved.
    pub fn empty(title: Title) -> Self {
        Page { title, body: Vec::new() }
    }
}

// ***************************************************************************
//                                PageStore
// ***************************************************************************
/** Flat directory of `<title>.txt` files.  Every call goes to the filesystem;
 * there is no caching and no locking, so concurrent saves of the same title
 * leave whichever write finished last.
 */
#[derive(Debug, Clone)]
pub struct PageStore {
    data_dir: PathBuf,
}

impl PageStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        PageStore { data_dir: data_dir.into() }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Write the page body, creating or truncating its file.  New files are
    /// readable and writable by the owner only.
    pub fn save(&self, page: &Page) -> Result<(), Errors> {
        let path = self.page_path(&page.title);
        debug!("Saving page {} to {:?}", page.title, path);
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(PAGE_FILE_MODE)
            .open(&path)?;
        file.write_all(&page.body)?;
        Ok(())
    }

    /// Read the full page.  A missing file is reported as `PageNotFound`
    /// so callers can treat it as a page that doesn't exist yet.
    pub fn load(&self, title: &Title) -> Result<Page, Errors> {
        let path = self.page_path(title);
        match fs::read(&path) {
            Ok(body) => Ok(Page::new(title.clone(), body)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Errors::PageNotFound(title.to_string())),
            Err(e) => Err(Errors::IOError(e)),
        }
    }

    fn page_path(&self, title: &Title) -> PathBuf {
        self.data_dir.join(format!("{}{}", title.as_str(), PAGE_FILE_SUFFIX))
    }
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn title(s: &str) -> Title {
        Title::parse(s).unwrap()
    }

    #[test]
    fn title_validation() {
        assert!(Title::parse("Abc123").is_ok());
        assert!(Title::parse("").is_err());
        assert!(Title::parse("../etc").is_err());
        assert!(Title::parse("with space").is_err());
        assert!(Title::parse("Ünicode").is_err());
    }

    #[test]
    fn save_then_load_returns_body() {
        let dir = tempfile::tempdir().unwrap();
        let store = PageStore::new(dir.path());
        let body = vec![0u8, 1, 2, 255, b'\n', b'x'];
        store.save(&Page::new(title("Binary1"), body.clone())).unwrap();
        let page = store.load(&title("Binary1")).unwrap();
        assert_eq!(page.title.as_str(), "Binary1");
        assert_eq!(page.body, body);
    }

    #[test]
    fn saving_twice_is_the_same_as_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = PageStore::new(dir.path());
        let page = Page::new(title("Twice"), b"same body".to_vec());
        store.save(&page).unwrap();
        store.save(&page).unwrap();
        assert_eq!(store.load(&title("Twice")).unwrap(), page);
    }

    #[test]
    fn shorter_save_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let store = PageStore::new(dir.path());
        store.save(&Page::new(title("Trunc"), b"a much longer body".to_vec())).unwrap();
        store.save(&Page::new(title("Trunc"), b"short".to_vec())).unwrap();
        assert_eq!(store.load(&title("Trunc")).unwrap().body, b"short".to_vec());
    }

    #[test]
    fn file_layout_and_mode() {
        let dir = tempfile::tempdir().unwrap();
        let store = PageStore::new(dir.path());
        store.save(&Page::new(title("Layout"), b"verbatim".to_vec())).unwrap();
        let path = dir.path().join("Layout.txt");
        assert_eq!(fs::read(&path).unwrap(), b"verbatim".to_vec());
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn missing_page_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = PageStore::new(dir.path());
        match store.load(&title("Nope")) {
            Err(Errors::PageNotFound(t)) => assert_eq!(t, "Nope"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn save_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = PageStore::new(dir.path().join("does_not_exist"));
        let result = store.save(&Page::new(title("Lost"), b"x".to_vec()));
        assert!(matches!(result, Err(Errors::IOError(_))));
    }
}
