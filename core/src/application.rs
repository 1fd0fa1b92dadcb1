extern crate alloc;

use alloc::format;
use alloc::vec::Vec;

use embedded_graphics::{
    Drawable,
    mono_font::{MonoTextStyle, ascii::FONT_6X10},
    pixelcolor::{Rgb888, RgbColor},
    prelude::{DrawTarget, Point, Size},
    primitives::Rectangle,
    text::{Baseline, Text},
};
use embedded_io::{Error as _, ErrorKind};
use log::{debug, info, warn};

use crate::{
    catalog::{CatalogError, CatalogPager, PageSource, image_url},
    config::ViewerConfig,
    display::{Display, FOOTER_POS, HEIGHT, SCREEN_ORIGIN, STATUS_POS, TITLE_POS, WIDTH},
    framebuffer::FrameBuffer,
    fs::Storage,
    input::{ButtonState, Buttons},
    net::{CancelToken, Connector, FetchError, FetchOptions, fetch},
};

/// Storage slot for downloaded screens.
pub const IMAGE_FILE: &str = "temp_file.scr";
/// Storage slot for catalog documents.
pub const CATALOG_FILE: &str = "data.json";

const FOOTER: &str = "        <<  A        Reload - B         C >>";
const BREAK_MESSAGE: &str = "Loading BREAK, press any key";
const STATUS_ROW: Rectangle = Rectangle::new(
    Point::new(0, FOOTER_POS.y),
    Size::new(WIDTH as u32, (HEIGHT as i32 - FOOTER_POS.y) as u32),
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ViewerError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("storage error: {0:?}")]
    Storage(ErrorKind),
}

impl From<ViewerError> for CatalogError {
    fn from(err: ViewerError) -> Self {
        match err {
            ViewerError::Catalog(err) => err,
            ViewerError::Fetch(err) => CatalogError::Fetch(err),
            ViewerError::Storage(kind) => CatalogError::Storage(kind),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewState {
    Starting,
    Showing,
    Interrupted,
}

/// Fetches into a storage slot and reads the slot back.
struct Transfer<'b, C: Connector, S: Storage> {
    connector: &'b mut C,
    storage: &'b mut S,
    cancel: &'b CancelToken,
    options: FetchOptions,
}

impl<C: Connector, S: Storage> Transfer<'_, C, S> {
    fn fetch_stored(&mut self, name: &str, url: &str) -> Result<Vec<u8>, ViewerError> {
        {
            let mut file = self
                .storage
                .create(name)
                .map_err(|e| ViewerError::Storage(e.kind()))?;
            fetch(&mut *self.connector, url, &mut file, self.cancel, &self.options)?;
        }
        self.storage
            .read_all(name)
            .map_err(|e| ViewerError::Storage(e.kind()))
    }
}

impl<C: Connector, S: Storage> PageSource for Transfer<'_, C, S> {
    fn fetch_document(&mut self, url: &str) -> Result<Vec<u8>, CatalogError> {
        Ok(self.fetch_stored(CATALOG_FILE, url)?)
    }
}

pub struct Application<'a, C: Connector, S: Storage> {
    dirty: bool,
    display_buffers: &'a mut FrameBuffer,
    connector: &'a mut C,
    storage: &'a mut S,
    config: ViewerConfig,
    cancel: CancelToken,
    pager: CatalogPager,
    state: ViewState,
    last_error: Option<ViewerError>,
}

impl<'a, C: Connector, S: Storage> Application<'a, C, S> {
    /// `cancel` is shared with whatever can interrupt a transfer from
    /// outside the update loop, such as a key watcher polled between reads.
    pub fn new(
        display_buffers: &'a mut FrameBuffer,
        connector: &'a mut C,
        storage: &'a mut S,
        config: ViewerConfig,
        cancel: CancelToken,
    ) -> Self {
        let pager = CatalogPager::new(&config);
        Application {
            dirty: true,
            display_buffers,
            connector,
            storage,
            config,
            cancel,
            pager,
            state: ViewState::Starting,
            last_error: None,
        }
    }

    /// Clone of the token guarding in-flight transfers. Cancelling it stops
    /// the current fetch at the next read.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn pager(&self) -> &CatalogPager {
        &self.pager
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn last_error(&self) -> Option<ViewerError> {
        self.last_error
    }

    /// Loads the first catalog page and shows its first screen.
    pub fn start(&mut self) {
        info!(
            "viewer: starting in {} mode at rank {}",
            self.config.mode.picture_type(),
            self.config.start_offset + 1
        );
        self.cancel.reset();
        let mut transfer = Transfer {
            connector: &mut *self.connector,
            storage: &mut *self.storage,
            cancel: &self.cancel,
            options: self.config.catalog_fetch(),
        };
        let result = match self.pager.fetch_page(&mut transfer) {
            Ok(0) => Err(CatalogError::Empty.into()),
            Ok(_) => self.load_current(),
            Err(err) => Err(err.into()),
        };
        self.finish(result);
    }

    pub fn update(&mut self, buttons: &ButtonState) {
        if !buttons.any_pressed() {
            return;
        }
        if buttons.is_pressed(Buttons::Back) {
            self.step(-1);
        } else if buttons.is_pressed(Buttons::Forward) {
            self.step(1);
        } else if buttons.is_pressed(Buttons::Reload) {
            self.show_break();
            self.step(0);
        }
    }

    pub fn draw(&mut self, display: &mut impl Display) {
        if self.dirty {
            display.display(self.display_buffers);
            self.dirty = false;
        }
    }

    fn step(&mut self, delta: isize) {
        self.cancel.reset();
        let mut transfer = Transfer {
            connector: &mut *self.connector,
            storage: &mut *self.storage,
            cancel: &self.cancel,
            options: self.config.catalog_fetch(),
        };
        let advanced = self.pager.advance(&mut transfer, delta).map(|_| ());
        let result = match advanced {
            Ok(()) => self.load_current(),
            Err(err) => Err(err.into()),
        };
        self.finish(result);
    }

    fn finish(&mut self, result: Result<(), ViewerError>) {
        match result {
            Ok(()) => {
                self.state = ViewState::Showing;
                self.last_error = None;
            }
            Err(err) => {
                warn!("viewer: loading interrupted: {err}");
                self.state = ViewState::Interrupted;
                self.last_error = Some(err);
                self.show_break();
            }
        }
        self.dirty = true;
    }

    fn load_current(&mut self) -> Result<(), ViewerError> {
        let Some(entry) = self.pager.current() else {
            return Err(CatalogError::Empty.into());
        };
        let mode = self.config.mode;
        let title = format!(
            "{} #{} {}",
            mode.label(),
            self.pager.rank_of_cursor(),
            entry.title
        );
        let url = image_url(&self.config.host, &entry.remote_id);
        debug!("viewer: loading {url}");

        let mut transfer = Transfer {
            connector: &mut *self.connector,
            storage: &mut *self.storage,
            cancel: &self.cancel,
            options: self.config.fetch.clone(),
        };
        let data = transfer.fetch_stored(IMAGE_FILE, &url)?;
        if data.len() < mode.buffer_size() {
            debug!(
                "viewer: short screen ({} of {} bytes), missing data shows as paper",
                data.len(),
                mode.buffer_size()
            );
        }

        // The previous screen stays up until the new one is in hand.
        self.display_buffers.clear(Rgb888::BLACK).ok();
        draw_text(self.display_buffers, &title, TITLE_POS);
        let Ok(plotted) = mode.render(&data, &mut *self.display_buffers, SCREEN_ORIGIN);
        draw_text(self.display_buffers, FOOTER, FOOTER_POS);
        info!("viewer: {title} ({plotted} pixels)");
        Ok(())
    }

    /// Replaces the footer with the break message, keeping the picture.
    fn show_break(&mut self) {
        self.display_buffers
            .fill_solid(&STATUS_ROW, Rgb888::BLACK)
            .ok();
        draw_text(self.display_buffers, BREAK_MESSAGE, STATUS_POS);
        self.dirty = true;
    }
}

fn draw_text(buffers: &mut FrameBuffer, text: &str, pos: Point) {
    let style = MonoTextStyle::new(&FONT_6X10, Rgb888::WHITE);
    Text::with_baseline(text, pos, style, Baseline::Top)
        .draw(buffers)
        .ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::{BlendBrightness, RenderMode};
    use crate::fs::MemoryStorage;
    use crate::net::mock::{Script, ScriptedConnector};
    use crate::scr::{GIGASCREEN_SIZE, SCREEN_SIZE, attr_offset, pixel_offset};
    use embedded_io::ErrorKind;

    const RED: u32 = 0xCD0000;

    #[derive(Default)]
    struct Panel {
        frames: usize,
    }

    impl Display for Panel {
        fn display(&mut self, _buffers: &FrameBuffer) {
            self.frames += 1;
        }
    }

    fn catalog(ids: std::ops::Range<u32>) -> Script {
        let records: Vec<String> = ids
            .map(|id| format!(r#"{{"id":{id},"title":"Pic {id}"}}"#))
            .collect();
        let body = format!(
            r#"{{"responseData":{{"zxPicture":[{}]}}}}"#,
            records.join(",")
        );
        Script::response(body.as_bytes(), 200)
    }

    /// Red ink pixel at the screen's top-left corner, black elsewhere.
    fn red_dot_screen() -> Vec<u8> {
        let mut data = vec![0u8; SCREEN_SIZE];
        data[pixel_offset(0, 0)] = 0b1000_0000;
        data[attr_offset(0, 0)] = 0b0000_0010;
        data
    }

    fn screen() -> Script {
        Script::response(&red_dot_screen(), 100)
    }

    fn origin_pixel(fb: &FrameBuffer) -> u32 {
        fb.pixels()[SCREEN_ORIGIN.y as usize * crate::framebuffer::WIDTH + SCREEN_ORIGIN.x as usize]
    }

    fn viewer<'a>(
        fb: &'a mut FrameBuffer,
        connector: &'a mut ScriptedConnector,
        storage: &'a mut MemoryStorage,
    ) -> Application<'a, ScriptedConnector, MemoryStorage> {
        Application::new(fb, connector, storage, ViewerConfig::default(), CancelToken::new())
    }

    fn press(button: Buttons) -> ButtonState {
        let mut state = ButtonState::new();
        state.update(1 << button as u8);
        state
    }

    #[test]
    fn startup_loads_catalog_then_first_screen() {
        let mut fb = FrameBuffer::new();
        let mut connector = ScriptedConnector::new([catalog(0..5), screen()]);
        let mut storage = MemoryStorage::new();
        let mut app = viewer(&mut fb, &mut connector, &mut storage);
        app.start();
        assert_eq!(app.state(), ViewState::Showing);
        assert_eq!(app.pager().len(), 5);
        let mut panel = Panel::default();
        app.draw(&mut panel);
        app.draw(&mut panel);
        assert_eq!(panel.frames, 1);
        drop(app);

        assert_eq!(origin_pixel(&fb), RED);
        assert!(connector.request(0).starts_with("GET /api/types:zxPicture/"));
        assert!(connector.request(1).starts_with("GET /file/id:0/filename:tmp HTTP/1.0"));
        assert_eq!(storage.get(IMAGE_FILE), Some(&red_dot_screen()[..]));
        assert!(storage.get(CATALOG_FILE).is_some());
    }

    #[test]
    fn title_and_footer_are_drawn() {
        let mut fb = FrameBuffer::new();
        let mut connector = ScriptedConnector::new([catalog(0..5), screen()]);
        let mut storage = MemoryStorage::new();
        let mut app = viewer(&mut fb, &mut connector, &mut storage);
        app.start();
        drop(app);
        let lit = |rows: std::ops::Range<usize>| {
            rows.flat_map(|y| fb.pixels()[y * 320..(y + 1) * 320].iter())
                .any(|&p| p == 0xFFFFFF)
        };
        assert!(lit(0..10));
        assert!(lit(224..234));
    }

    #[test]
    fn back_from_first_wraps_without_catalog_request() {
        let mut fb = FrameBuffer::new();
        let mut connector = ScriptedConnector::new([catalog(0..5), screen(), screen()]);
        let mut storage = MemoryStorage::new();
        let mut app = viewer(&mut fb, &mut connector, &mut storage);
        app.start();
        app.update(&press(Buttons::Back));
        assert_eq!(app.pager().cursor(), 4);
        assert_eq!(app.state(), ViewState::Showing);
        drop(app);
        assert_eq!(connector.connects.len(), 3);
        assert!(connector.request(2).starts_with("GET /file/id:4/"));
    }

    #[test]
    fn forward_past_tail_fetches_next_page() {
        let mut fb = FrameBuffer::new();
        let mut connector = ScriptedConnector::new([catalog(0..1), screen(), catalog(5..6), screen()]);
        let mut storage = MemoryStorage::new();
        let mut app = viewer(&mut fb, &mut connector, &mut storage);
        app.start();
        app.update(&press(Buttons::Forward));
        assert_eq!(app.pager().len(), 2);
        assert_eq!(app.pager().cursor(), 1);
        drop(app);
        assert!(connector.request(2).contains("/start:5/limit:5/"));
        assert!(connector.request(3).starts_with("GET /file/id:5/"));
    }

    #[test]
    fn failed_image_fetch_shows_break_and_keeps_catalog() {
        let mut fb = FrameBuffer::new();
        let mut connector = ScriptedConnector::new([
            catalog(0..5),
            Script::chunks([b"HTTP/1.0 200 OK\r\n"]),
        ]);
        let mut storage = MemoryStorage::new();
        let mut app = viewer(&mut fb, &mut connector, &mut storage);
        app.start();
        assert_eq!(app.state(), ViewState::Interrupted);
        assert_eq!(
            app.last_error(),
            Some(ViewerError::Fetch(FetchError::UnexpectedEof))
        );
        assert_eq!(app.pager().len(), 5);
        drop(app);
        assert_eq!(origin_pixel(&fb), 0);
    }

    #[test]
    fn viewer_recovers_after_failed_startup() {
        let mut fb = FrameBuffer::new();
        let failing = Script {
            connect_error: Some(ErrorKind::ConnectionRefused),
            ..Script::default()
        };
        let mut connector = ScriptedConnector::new([failing, catalog(0..5), screen()]);
        let mut storage = MemoryStorage::new();
        let mut app = viewer(&mut fb, &mut connector, &mut storage);
        app.start();
        assert_eq!(app.state(), ViewState::Interrupted);
        assert!(app.pager().is_empty());

        app.update(&press(Buttons::Forward));
        assert_eq!(app.state(), ViewState::Showing);
        assert_eq!(app.pager().cursor(), 0);
    }

    #[test]
    fn reload_fetches_the_current_screen_again() {
        let mut fb = FrameBuffer::new();
        let mut connector = ScriptedConnector::new([catalog(0..5), screen(), screen()]);
        let mut storage = MemoryStorage::new();
        let mut app = viewer(&mut fb, &mut connector, &mut storage);
        app.start();
        app.update(&press(Buttons::Reload));
        assert_eq!(app.state(), ViewState::Showing);
        assert!(!app.cancel_token().is_cancelled());
        drop(app);
        assert!(connector.request(2).starts_with("GET /file/id:0/"));
        assert_eq!(origin_pixel(&fb), RED);
    }

    #[test]
    fn cancelled_transfer_is_reported_as_interrupted() {
        let mut fb = FrameBuffer::new();
        let mut connector = ScriptedConnector::new([catalog(0..5)]);
        let mut storage = MemoryStorage::new();
        let mut app = viewer(&mut fb, &mut connector, &mut storage);
        let mut slow = screen();
        slow.cancel_after = Some((3, app.cancel_token()));
        app.connector.push(slow);
        app.start();
        assert_eq!(app.state(), ViewState::Interrupted);
        assert_eq!(
            app.last_error(),
            Some(ViewerError::Fetch(FetchError::UserCancelled))
        );
    }

    #[test]
    fn failed_page_fetch_keeps_rendered_image() {
        let mut fb = FrameBuffer::new();
        let refused = Script {
            connect_error: Some(ErrorKind::ConnectionRefused),
            ..Script::default()
        };
        let mut connector = ScriptedConnector::new([catalog(0..1), screen(), refused]);
        let mut storage = MemoryStorage::new();
        let mut app = viewer(&mut fb, &mut connector, &mut storage);
        app.start();
        app.update(&press(Buttons::Forward));
        assert_eq!(app.state(), ViewState::Interrupted);
        assert_eq!(
            app.last_error(),
            Some(ViewerError::Catalog(CatalogError::Fetch(
                FetchError::ConnectionFailure(ErrorKind::ConnectionRefused)
            )))
        );
        assert_eq!(app.pager().len(), 1);
        drop(app);
        assert_eq!(origin_pixel(&fb), RED);
    }

    #[test]
    fn failed_image_fetch_keeps_previous_screen() {
        let mut fb = FrameBuffer::new();
        let mut connector = ScriptedConnector::new([
            catalog(0..5),
            screen(),
            Script::chunks([b"HTTP/1.0 200 OK\r\n"]),
        ]);
        let mut storage = MemoryStorage::new();
        let mut app = viewer(&mut fb, &mut connector, &mut storage);
        app.start();
        app.update(&press(Buttons::Forward));
        assert_eq!(app.state(), ViewState::Interrupted);
        drop(app);
        assert_eq!(origin_pixel(&fb), RED);
        // break message replaces the footer, the title row is kept
        let row_lit = |y: usize| fb.pixels()[y * 320..(y + 1) * 320].contains(&0xFFFFFF);
        assert!((0..10).any(row_lit));
        assert!((224..234).any(row_lit));
    }

    #[test]
    fn shared_token_interrupts_reload_in_progress() {
        let mut fb = FrameBuffer::new();
        let cancel = CancelToken::new();
        let mut stalled = screen();
        // a key watcher sharing the token fires after the header arrives
        stalled.cancel_after = Some((2, cancel.clone()));
        let mut connector = ScriptedConnector::new([catalog(0..5), screen(), stalled, screen()]);
        let mut storage = MemoryStorage::new();
        let mut app = Application::new(
            &mut fb,
            &mut connector,
            &mut storage,
            ViewerConfig::default(),
            cancel.clone(),
        );
        app.start();

        app.update(&press(Buttons::Reload));
        assert_eq!(app.state(), ViewState::Interrupted);
        assert_eq!(
            app.last_error(),
            Some(ViewerError::Fetch(FetchError::UserCancelled))
        );
        assert!(cancel.is_cancelled());

        app.update(&press(Buttons::Reload));
        assert_eq!(app.state(), ViewState::Showing);
        assert!(!cancel.is_cancelled());
        drop(app);
        assert_eq!(connector.connects.len(), 4);
        assert_eq!(origin_pixel(&fb), RED);
    }

    #[test]
    fn idle_buttons_start_no_transfer() {
        let mut fb = FrameBuffer::new();
        let mut connector = ScriptedConnector::new([catalog(0..5), screen()]);
        let mut storage = MemoryStorage::new();
        let mut app = viewer(&mut fb, &mut connector, &mut storage);
        app.start();
        let mut held = press(Buttons::Forward);
        held.update(1 << Buttons::Forward as u8);
        app.update(&held);
        app.update(&ButtonState::new());
        assert_eq!(app.pager().cursor(), 0);
        drop(app);
        assert_eq!(connector.connects.len(), 2);
    }

    #[test]
    fn gigascreen_session_queries_gigascreen_catalog() {
        let mut fb = FrameBuffer::new();
        let mut pair = red_dot_screen();
        pair.extend_from_slice(&red_dot_screen());
        assert_eq!(pair.len(), GIGASCREEN_SIZE);
        let mut connector = ScriptedConnector::new([catalog(0..5), Script::response(&pair, 200)]);
        let mut storage = MemoryStorage::new();
        let config = ViewerConfig {
            mode: RenderMode::Gigascreen(BlendBrightness::Independent),
            ..ViewerConfig::default()
        };
        let mut app = Application::new(
            &mut fb,
            &mut connector,
            &mut storage,
            config,
            CancelToken::new(),
        );
        app.start();
        assert_eq!(app.state(), ViewState::Showing);
        drop(app);
        assert!(connector.request(0).contains("zxPictureType=gigascreen;"));
        // both frames dim red: (205*0.666 + 205*0.666) / 2
        assert_eq!(origin_pixel(&fb), 136 << 16);
    }
}
