//! Streaming extraction API: emit pages as they are converted.
//!
//! Large scanned documents take minutes when every page falls through to
//! the full stage. A streams-based API lets callers write pages out or
//! update a progress bar as each one finishes, instead of buffering the
//! whole document.
//!
//! Conversion stays synchronous. [`extract_stream`] moves the extractor onto
//! a `spawn_blocking` thread and forwards pages through a channel of
//! capacity 1, so at most one page is converted ahead of the consumer.
//! Dropping the stream stops extraction once the in-flight page finishes.

use crate::error::SlicerError;
use crate::extract::ContentExtractor;
use crate::output::Page;
use std::pin::Pin;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tracing::{debug, info};

/// A boxed stream of output pages, in page order.
pub type PageStream = Pin<Box<dyn Stream<Item = Result<Page, SlicerError>> + Send>>;

/// Extract `first_page..=last_page`, streaming pages as they are ready.
///
/// Pages no stage produced are skipped. A fatal error is yielded as the last
/// item. Must be called from within a Tokio runtime.
pub fn extract_stream(
    extractor: ContentExtractor,
    first_page: usize,
    last_page: Option<usize>,
) -> PageStream {
    let (tx, rx) = mpsc::channel(1);
    info!("Starting streaming extraction: {}", extractor.source().name());

    tokio::task::spawn_blocking(move || {
        let pages = match extractor.extract_pages(first_page, last_page) {
            Ok(pages) => pages,
            Err(e) => {
                let _ = tx.blocking_send(Err(e));
                return;
            }
        };

        for item in pages {
            let out = match item {
                Ok((_, Some(page))) => Ok(page.into_page()),
                Ok((page_no, None)) => {
                    debug!("Page {} skipped", page_no);
                    continue;
                }
                Err(e) => Err(e),
            };
            if tx.blocking_send(out).is_err() {
                debug!("Stream receiver dropped; stopping extraction");
                return;
            }
        }
    });

    Box::pin(ReceiverStream::new(rx))
}
