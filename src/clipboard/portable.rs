//! Portable clipboard backend over `arboard`.
//!
//! Used where no native bridge exists. `arboard` already owns the OS
//! protocol, so this adapter only maps logical types onto its text and
//! image calls: `text/plain` as UTF-8, `image/png` encoded and decoded
//! with the `image` crate against arboard's RGBA buffers. One item per
//! write.
//!
//! On X11 and Wayland the writing process serves the selection itself,
//! and only while an `arboard::Clipboard` is alive. The backend therefore
//! opens one clipboard in `initialize` and keeps it for the life of the
//! process; [`Serve`] lets a short-lived writer block until the data has
//! been handed over.

use std::borrow::Cow;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use arboard::{Clipboard, ImageData};
use image::ImageFormat;

use super::item::{IMAGE_PNG, TEXT_PLAIN};
use super::{ClipboardBackend, ClipboardError, ClipboardItem, ClipboardItems, NativeError};

/// How long a write keeps its data available where the writer must serve
/// it (X11, Wayland). Elsewhere the OS copies the data and this is ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Serve {
    /// While the backend's clipboard lives, which is until process exit.
    #[default]
    WhileAlive,
    /// Block the write until another application takes ownership.
    UntilReplaced,
    /// Block until replaced or the deadline passes.
    Until(Instant),
}

/// The part of `arboard::Clipboard` the backend drives.
pub trait SystemClipboard: Send {
    fn load_text(&mut self) -> Result<String, arboard::Error>;

    fn load_image(&mut self) -> Result<ImageData<'static>, arboard::Error>;

    fn store_text(&mut self, text: String, serve: Serve) -> Result<(), arboard::Error>;

    fn store_image(&mut self, image: ImageData<'static>, serve: Serve)
    -> Result<(), arboard::Error>;
}

impl SystemClipboard for Clipboard {
    fn load_text(&mut self) -> Result<String, arboard::Error> {
        self.get_text()
    }

    fn load_image(&mut self) -> Result<ImageData<'static>, arboard::Error> {
        self.get_image()
    }

    fn store_text(&mut self, text: String, serve: Serve) -> Result<(), arboard::Error> {
        setter(self, serve).text(text)
    }

    fn store_image(
        &mut self,
        image: ImageData<'static>,
        serve: Serve,
    ) -> Result<(), arboard::Error> {
        setter(self, serve).image(image)
    }
}

#[cfg(all(
    unix,
    not(any(target_os = "macos", target_os = "android", target_os = "emscripten"))
))]
fn setter(clipboard: &mut Clipboard, serve: Serve) -> arboard::Set<'_> {
    use arboard::SetExtLinux;

    let set = clipboard.set();
    match serve {
        Serve::WhileAlive => set,
        Serve::UntilReplaced => set.wait(),
        Serve::Until(deadline) => set.wait_until(deadline),
    }
}

#[cfg(not(all(
    unix,
    not(any(target_os = "macos", target_os = "android", target_os = "emscripten"))
)))]
fn setter(clipboard: &mut Clipboard, _serve: Serve) -> arboard::Set<'_> {
    clipboard.set()
}

/// A validated single-item write, ready to hand to `arboard`.
#[derive(Debug, PartialEq)]
enum Payload {
    Text(String),
    Image {
        width: usize,
        height: usize,
        rgba: Vec<u8>,
    },
}

type Opener<C> = Box<dyn Fn() -> Result<C, arboard::Error> + Send + Sync>;

/// `arboard`-backed implementation of [`ClipboardBackend`].
///
/// Holds a single clipboard, opened by `initialize`, behind a mutex that
/// also keeps two threads of this process from overlapping. Data written
/// with [`Serve::WhileAlive`] disappears from X11/Wayland at process exit
/// unless a clipboard manager has taken it over.
pub struct PortableBackend<C: SystemClipboard = Clipboard> {
    open: Opener<C>,
    clipboard: Mutex<Option<C>>,
}

impl PortableBackend {
    pub fn new() -> Self {
        Self::with_opener(Clipboard::new)
    }
}

impl Default for PortableBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: SystemClipboard> PortableBackend<C> {
    /// Backend that opens its clipboard with `open` on `initialize`.
    pub fn with_opener(
        open: impl Fn() -> Result<C, arboard::Error> + Send + Sync + 'static,
    ) -> Self {
        Self {
            open: Box::new(open),
            clipboard: Mutex::new(None),
        }
    }

    /// The held clipboard slot. A poisoned lock still guards a usable
    /// clipboard.
    fn held(&self) -> MutexGuard<'_, Option<C>> {
        self.clipboard
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Like [`ClipboardBackend::write_all`], serving the data as `serve`
    /// asks. Blocking modes hold up other calls on this backend.
    pub fn write_serving(
        &self,
        items: ClipboardItems,
        serve: Serve,
    ) -> Result<(), ClipboardError> {
        let Some(payload) = plan_write(items)? else {
            return Ok(());
        };

        let mut held = self.held();
        let clipboard = held.as_mut().ok_or(ClipboardError::NotInitialized)?;
        if serve != Serve::WhileAlive {
            tracing::debug!(?serve, "serving clipboard until handed over");
        }

        match payload {
            Payload::Text(text) => clipboard
                .store_text(text, serve)
                .map_err(|e| map_error("Clipboard::set_text", e)),
            Payload::Image {
                width,
                height,
                rgba,
            } => clipboard
                .store_image(
                    ImageData {
                        width,
                        height,
                        bytes: Cow::Owned(rgba),
                    },
                    serve,
                )
                .map_err(|e| map_error("Clipboard::set_image", e)),
        }
    }
}

impl<C: SystemClipboard> ClipboardBackend for PortableBackend<C> {
    fn initialize(&self) -> Result<(), ClipboardError> {
        let mut held = self.held();
        if held.is_none() {
            *held = Some((self.open)().map_err(|e| map_error("Clipboard::new", e))?);
            tracing::debug!("portable clipboard initialized");
        }
        Ok(())
    }

    fn read_all(&self) -> Result<ClipboardItems, ClipboardError> {
        let mut held = self.held();
        let clipboard = held.as_mut().ok_or(ClipboardError::NotInitialized)?;
        let mut items = ClipboardItems::new();

        match clipboard.load_text() {
            Ok(text) if !text.is_empty() => items.push(ClipboardItem::text(text)),
            Ok(_) | Err(arboard::Error::ContentNotAvailable) => {}
            Err(e) => return Err(map_error("Clipboard::get_text", e)),
        }

        match clipboard.load_image() {
            Ok(frame) if !frame.bytes.is_empty() => {
                items.push(ClipboardItem::new(IMAGE_PNG, encode_png(&frame)?));
            }
            Ok(_) | Err(arboard::Error::ContentNotAvailable) => {}
            Err(e) => return Err(map_error("Clipboard::get_image", e)),
        }

        Ok(items)
    }

    fn write_all(&self, items: ClipboardItems) -> Result<(), ClipboardError> {
        self.write_serving(items, Serve::WhileAlive)
    }

    fn supported_types(&self) -> Vec<&'static str> {
        vec![TEXT_PLAIN, IMAGE_PNG]
    }

    fn max_items(&self) -> usize {
        1
    }
}

/// Validate an item list and convert it to a payload, before any OS call.
///
/// `None` for an empty list.
fn plan_write(items: ClipboardItems) -> Result<Option<Payload>, ClipboardError> {
    super::check_item_count(1, items.len())?;
    let Some(item) = items.into_iter().next() else {
        return Ok(None);
    };

    let (kind, data) = item.into_parts();
    let payload = match kind.as_str() {
        TEXT_PLAIN => Payload::Text(String::from_utf8(data).map_err(|e| {
            ClipboardError::InvalidData {
                kind: kind.clone(),
                reason: e.to_string(),
            }
        })?),
        IMAGE_PNG => decode_png(&data)?,
        _ => return Err(ClipboardError::UnsupportedType(kind)),
    };
    Ok(Some(payload))
}

fn decode_png(data: &[u8]) -> Result<Payload, ClipboardError> {
    let decoded = image::load_from_memory_with_format(data, ImageFormat::Png).map_err(|e| {
        ClipboardError::InvalidData {
            kind: IMAGE_PNG.to_string(),
            reason: e.to_string(),
        }
    })?;
    let rgba = decoded.to_rgba8();
    Ok(Payload::Image {
        width: rgba.width() as usize,
        height: rgba.height() as usize,
        rgba: rgba.into_raw(),
    })
}

fn encode_png(frame: &ImageData<'_>) -> Result<Vec<u8>, ClipboardError> {
    let invalid = |reason: String| ClipboardError::InvalidData {
        kind: IMAGE_PNG.to_string(),
        reason,
    };
    let width = u32::try_from(frame.width).map_err(|e| invalid(e.to_string()))?;
    let height = u32::try_from(frame.height).map_err(|e| invalid(e.to_string()))?;
    let buffer = image::RgbaImage::from_raw(width, height, frame.bytes.to_vec())
        .ok_or_else(|| invalid(format!("buffer too small for {width}x{height} RGBA")))?;

    let mut png = Vec::new();
    buffer
        .write_to(&mut std::io::Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| invalid(e.to_string()))?;
    Ok(png)
}

fn map_error(call: &'static str, err: arboard::Error) -> ClipboardError {
    match err {
        arboard::Error::ClipboardOccupied => ClipboardError::ResourceBusy(NativeError::new(call, 0)),
        arboard::Error::ConversionFailure => ClipboardError::InvalidData {
            kind: if call.ends_with("image") { IMAGE_PNG } else { TEXT_PLAIN }.to_string(),
            reason: "clipboard contents could not be converted".to_string(),
        },
        other => ClipboardError::Platform {
            call,
            reason: other.to_string(),
        },
    }
}
