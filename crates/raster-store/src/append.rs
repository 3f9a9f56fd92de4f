//! One-shot append of a tile's payload into a container.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tile_model::{BandDescriptor, StorageType, TileSpec};
use tracing::{info, warn};

use crate::error::{Result, StoreError};
use crate::writer::WriterHandle;

/// Outcome of [`append_to_container`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppendResult {
    /// Time slot written.
    pub time_index: usize,
    /// Length of the time axis after the append.
    pub time_len: usize,
    /// The container did not exist before.
    pub container_created: bool,
    /// The band variable did not exist before.
    pub band_created: bool,
}

/// Open or create the container at `path`, make sure `band` exists and write
/// the tile's data at `timestamp`. The writer is always closed before
/// returning.
///
/// Fails with [`StoreError::MissingData`] when the tile carries no payload;
/// nothing is created in that case.
pub fn append_to_container(
    tile: &TileSpec,
    path: impl AsRef<Path>,
    storage_type: &StorageType,
    band: &BandDescriptor,
    timestamp: DateTime<Utc>,
) -> Result<AppendResult> {
    let path = path.as_ref();
    let data = tile
        .data()
        .ok_or_else(|| StoreError::MissingData(format!("band '{}'", band.name())))?;

    let mut writer = WriterHandle::create_or_open(path, tile, storage_type)?;
    let band_created = !writer.has_band(band.name());

    let outcome = writer
        .ensure_band(band, storage_type.chunking())
        .and_then(|handle| writer.append(&handle, timestamp, data));
    let closed = writer.close();

    let time_index = match (outcome, closed) {
        (Ok(index), Ok(())) => index,
        (Err(e), closed) => {
            if let Err(close_err) = closed {
                warn!(path = %path.display(), error = %close_err, "Close after failed append also failed");
            }
            return Err(e);
        }
        (Ok(_), Err(e)) => return Err(e),
    };

    let result = AppendResult {
        time_index,
        time_len: writer.time_len(),
        container_created: writer.created(),
        band_created,
    };
    info!(
        path = %path.display(),
        band = %band.name(),
        %timestamp,
        time_index = result.time_index,
        time_len = result.time_len,
        "Appended tile"
    );
    Ok(result)
}
