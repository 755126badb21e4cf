//! Saving CSV exports under their fixed filenames.

use std::path::{Path, PathBuf};

use shared::protocol::ExportTarget;
use tempfile::Builder;
use tracing::info;

use crate::{ClientError, PredictionService};

const STAGING_PREFIX: &str = ".export-";
const STAGING_SUFFIX: &str = ".part";

/// Downloads `target` into `dir` as [`ExportTarget::filename`].
///
/// The download streams into a staging file in the same directory. The
/// staging file is removed when it goes out of scope, so a failed download
/// leaves nothing behind; only a complete download is renamed into place.
pub async fn save_export<S>(
    service: &S,
    target: ExportTarget,
    dir: &Path,
) -> Result<PathBuf, ClientError>
where
    S: PredictionService + ?Sized,
{
    let mut staging = Builder::new()
        .prefix(STAGING_PREFIX)
        .suffix(STAGING_SUFFIX)
        .tempfile_in(dir)
        .map_err(|source| ClientError::ExportWrite { target, source })?;

    let written = service
        .download_export(target, staging.as_file_mut())
        .await?;

    let destination = dir.join(target.filename());
    staging
        .persist(&destination)
        .map_err(|err| ClientError::ExportWrite {
            target,
            source: err.error,
        })?;

    info!(
        export = target.name(),
        written,
        path = %destination.display(),
        "export saved"
    );
    Ok(destination)
}

#[cfg(test)]
#[path = "tests/export_tests.rs"]
mod tests;
