extern crate alloc;

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use embedded_io::ErrorKind;
use log::{debug, info, warn};
use serde::Deserialize;

use crate::compositor::RenderMode;
use crate::config::ViewerConfig;
use crate::net::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("catalog document is malformed")]
    Malformed,
    #[error("catalog storage error: {0:?}")]
    Storage(ErrorKind),
    #[error("catalog is empty")]
    Empty,
    #[error("no more catalog entries")]
    OutOfRange,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogEntry {
    pub remote_id: String,
    pub title: String,
}

/// Retrieves the raw catalog document for a query URL.
pub trait PageSource {
    fn fetch_document(&mut self, url: &str) -> Result<Vec<u8>, CatalogError>;
}

pub fn catalog_url(
    host: &str,
    start: usize,
    limit: usize,
    min_rating: u32,
    mode: RenderMode,
) -> String {
    format!(
        "http://{host}/api/types:zxPicture/export:zxPicture/language:eng/start:{start}/limit:{limit}/order:votes,desc/filter:zxPictureMinRating={min_rating};zxPictureType={};",
        mode.picture_type()
    )
}

pub fn image_url(host: &str, remote_id: &str) -> String {
    format!("http://{host}/file/id:{remote_id}/filename:tmp")
}

#[derive(Deserialize)]
struct Document {
    #[serde(rename = "responseData")]
    response_data: ResponseData,
}

#[derive(Deserialize)]
struct ResponseData {
    #[serde(rename = "zxPicture")]
    pictures: Vec<Record>,
}

#[derive(Deserialize)]
struct Record {
    id: RecordId,
    title: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordId {
    Number(u64),
    Text(String),
}

impl RecordId {
    fn into_string(self) -> String {
        match self {
            Self::Number(n) => format!("{n}"),
            Self::Text(s) => s,
        }
    }
}

/// Parses one catalog page. Titles are cut to `title_max` characters.
pub fn parse_page(body: &[u8], title_max: usize) -> Result<Vec<CatalogEntry>, CatalogError> {
    let document: Document = serde_json::from_slice(body).map_err(|err| {
        warn!("catalog: unparsable document: {err}");
        CatalogError::Malformed
    })?;
    Ok(document
        .response_data
        .pictures
        .into_iter()
        .map(|record| CatalogEntry {
            remote_id: record.id.into_string(),
            title: record.title.chars().take(title_max).collect(),
        })
        .collect())
}

/// Ranked list of catalog entries, loaded one page at a time as the cursor
/// moves past the loaded tail.
pub struct CatalogPager {
    entries: Vec<CatalogEntry>,
    cursor: usize,
    origin: usize,
    page_start: usize,
    page_size: usize,
    pages_loaded: usize,
    min_rating: u32,
    title_max: usize,
    host: String,
    mode: RenderMode,
}

impl CatalogPager {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            origin: config.start_offset,
            page_start: config.start_offset,
            page_size: config.page_size.max(1),
            pages_loaded: 0,
            min_rating: config.min_rating,
            title_max: config.title_max_chars,
            host: config.host.clone(),
            mode: config.mode,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn page_start(&self) -> usize {
        self.page_start
    }

    pub fn current(&self) -> Option<&CatalogEntry> {
        self.entries.get(self.cursor)
    }

    /// 1-based position of the cursor in the server's ranking.
    pub fn rank_of_cursor(&self) -> usize {
        self.origin + self.cursor + 1
    }

    pub fn page_url(&self) -> String {
        catalog_url(
            &self.host,
            self.page_start,
            self.page_size,
            self.min_rating,
            self.mode,
        )
    }

    /// Requests the page at the current `page_start` and appends its
    /// records. On failure the entries are left untouched.
    pub fn fetch_page<P: PageSource>(&mut self, source: &mut P) -> Result<usize, CatalogError> {
        let url = self.page_url();
        debug!("catalog: requesting {url}");
        let body = source.fetch_document(&url)?;
        let page = parse_page(&body, self.title_max)?;
        let added = page.len();
        self.entries.extend(page);
        if added > 0 {
            self.pages_loaded += 1;
        }
        info!(
            "catalog: {added} entries at offset {} ({} loaded)",
            self.page_start,
            self.entries.len()
        );
        Ok(added)
    }

    /// Advances `page_start` (except for the very first page) and fetches.
    /// The advance is undone if the fetch fails or comes back empty, so the
    /// same page is asked for again next time.
    fn load_next_page<P: PageSource>(&mut self, source: &mut P) -> Result<usize, CatalogError> {
        let previous = self.page_start;
        if self.pages_loaded > 0 {
            self.page_start += self.page_size;
        }
        match self.fetch_page(source) {
            Ok(0) => {
                self.page_start = previous;
                Ok(0)
            }
            Ok(added) => Ok(added),
            Err(err) => {
                self.page_start = previous;
                Err(err)
            }
        }
    }

    fn load_through<P: PageSource>(
        &mut self,
        source: &mut P,
        index: usize,
    ) -> Result<(), CatalogError> {
        while index >= self.entries.len() {
            if self.load_next_page(source)? == 0 {
                return Err(CatalogError::OutOfRange);
            }
        }
        Ok(())
    }

    /// Entry at `index`, fetching further pages until it is loaded.
    pub fn ensure_loaded<P: PageSource>(
        &mut self,
        source: &mut P,
        index: usize,
    ) -> Result<&CatalogEntry, CatalogError> {
        self.load_through(source, index)?;
        Ok(&self.entries[index])
    }

    /// Moves the cursor by `delta`. Stepping before the first entry wraps to
    /// the last loaded one; stepping past the tail loads the next page, and
    /// wraps to the first entry once the catalog has no more pages. A pager
    /// whose startup fetch failed loads its first page and lands on entry 0.
    pub fn advance<P: PageSource>(
        &mut self,
        source: &mut P,
        delta: isize,
    ) -> Result<&CatalogEntry, CatalogError> {
        if self.entries.is_empty() {
            if self.load_next_page(source)? == 0 {
                return Err(CatalogError::Empty);
            }
            self.cursor = 0;
            return Ok(&self.entries[0]);
        }
        let target = self.cursor as isize + delta;
        if target < 0 {
            self.cursor = self.entries.len() - 1;
        } else {
            match self.load_through(source, target as usize) {
                Ok(()) => self.cursor = target as usize,
                Err(CatalogError::OutOfRange) => {
                    debug!("catalog: end of catalog, wrapping to the first entry");
                    self.cursor = 0;
                }
                Err(err) => return Err(err),
            }
        }
        Ok(&self.entries[self.cursor])
    }
}
