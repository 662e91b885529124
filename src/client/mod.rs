//! One-shot clipboard commands behind the CLI.
//!
//! Each command initializes the process backend, performs a single read
//! or write (retrying only while the clipboard is busy), prints the
//! result, and returns.

mod format;

use std::io::{self, Read, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use clipbridge::dump::{self, DumpError};
use clipbridge::retry::RetryPolicy;
use clipbridge::{
    ClipboardBackend, ClipboardError, ClipboardItem, ClipboardItems, Serve, TEXT_PLAIN,
};

use crate::cli::Command;

/// Client error type.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Clipboard(#[from] ClipboardError),
    #[error("snapshot: {0}")]
    Dump(#[from] DumpError),
    #[error("no {0} item on the clipboard")]
    Missing(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Run one CLI command against the process-wide backend.
pub fn run(command: Command, policy: RetryPolicy) -> Result<(), ClientError> {
    policy.run(clipbridge::initialize)?;

    match command {
        Command::Read { kind, dump } => {
            let items = policy.run(clipbridge::read_clipboard)?;
            if let Some(path) = dump {
                dump::save_items(&path, &items)?;
                format::print_dumped(&path, items.len());
            } else if let Some(kind) = kind {
                let item = select(&items, &kind)?;
                io::stdout().lock().write_all(item.data())?;
            } else {
                format::print_items(&items);
            }
        }
        Command::Write {
            kind,
            restore,
            serve_secs,
        } => {
            let items = match restore {
                Some(path) => load_snapshot(&path)?,
                None => {
                    let mut data = Vec::new();
                    io::stdin().lock().read_to_end(&mut data)?;
                    let kind = kind.unwrap_or_else(|| TEXT_PLAIN.to_string());
                    vec![ClipboardItem::new(kind, data)]
                }
            };
            let count = items.len();
            let serve = serve_mode(serve_secs);
            policy.run(|| clipbridge::write_clipboard_serving(items.clone(), serve))?;
            format::print_written(count);
        }
        Command::Types => {
            let backend = clipbridge::backend();
            format::print_types(backend.name(), &backend.supported_types(), backend.max_items());
        }
    }

    Ok(())
}

fn load_snapshot(path: &Path) -> Result<ClipboardItems, ClientError> {
    let items = dump::load_items(path)?;
    tracing::debug!(path = %path.display(), items = items.len(), "loaded snapshot");
    Ok(items)
}

/// The process exits right after writing, so keep serving the data until
/// it is taken over or the limit passes.
fn serve_mode(serve_secs: Option<u64>) -> Serve {
    serve_secs
        .and_then(|secs| Instant::now().checked_add(Duration::from_secs(secs)))
        .map_or(Serve::UntilReplaced, Serve::Until)
}

/// First item of type `kind`.
fn select<'a>(items: &'a [ClipboardItem], kind: &str) -> Result<&'a ClipboardItem, ClientError> {
    items
        .iter()
        .find(|item| item.kind() == kind)
        .ok_or_else(|| ClientError::Missing(kind.to_string()))
}
