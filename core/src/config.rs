extern crate alloc;

use alloc::string::String;

use crate::compositor::RenderMode;
use crate::net::FetchOptions;

pub const DEFAULT_HOST: &str = "zxart.ee";

/// Session settings. The defaults browse the top-rated standard screens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewerConfig {
    pub host: String,
    /// Rank offset of the first catalog page.
    pub start_offset: usize,
    pub page_size: usize,
    pub min_rating: u32,
    pub title_max_chars: usize,
    pub mode: RenderMode,
    /// Used for image downloads.
    pub fetch: FetchOptions,
    /// Body cap for catalog documents, which outgrow any screen buffer.
    pub catalog_max_body: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            host: String::from(DEFAULT_HOST),
            start_offset: 0,
            page_size: 5,
            min_rating: 0,
            title_max_chars: 30,
            mode: RenderMode::Standard,
            fetch: FetchOptions::default(),
            catalog_max_body: 64 * 1024,
        }
    }
}

impl ViewerConfig {
    pub fn catalog_fetch(&self) -> FetchOptions {
        self.fetch.with_max_body(self.catalog_max_body)
    }
}
