use crate::observation::{ObservationStore, StoreError, DEFAULT_PAGE_SIZE, MIN_CURSOR};
use std::path::Path;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("store error: {0}")]
    Storage(#[from] StoreError),
}

/// Writes every stored observation to `sink` as one JSON object per line,
/// paging through the store by id. Returns the number of lines written.
///
/// The first failure aborts the export; whatever was already written stays
/// in the sink.
pub async fn export_all<W>(store: &ObservationStore, sink: W) -> Result<u64, ExportError>
where
    W: AsyncWrite + Unpin,
{
    let mut writer = BufWriter::new(sink);
    let mut cursor = MIN_CURSOR;
    let mut written = 0;

    loop {
        let page = store.scan_above(cursor, DEFAULT_PAGE_SIZE).await?;
        let Some(last) = page.last() else {
            break;
        };
        cursor = last.id;

        for observation in &page {
            let mut line = serde_json::to_vec(observation)?;
            line.push(b'\n');
            writer.write_all(&line).await?;
            written += 1;
        }
        // a failed scan of the next page must not lose this one
        writer.flush().await?;
        tracing::debug!(cursor, written, "exported page");
    }

    writer.into_inner().shutdown().await?;
    Ok(written)
}

pub async fn export_to_file(
    store: &ObservationStore,
    path: impl AsRef<Path>,
) -> Result<u64, ExportError> {
    let file = tokio::fs::File::create(path.as_ref()).await?;
    let written = export_all(store, file).await?;
    tracing::info!(path = %path.as_ref().display(), written, "exported observations");
    Ok(written)
}
