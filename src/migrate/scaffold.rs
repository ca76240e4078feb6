//! Creating new migration file pairs.

use std::fs;
use std::path::{Path, PathBuf};

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, PrimitiveDateTime, UtcOffset};
use tracing::info;

use super::{MigrateError, UP_SUFFIX};

const TIMESTAMP_LEN: usize = 14;

const STAMP: &[BorrowedFormatItem<'_>] =
    format_description!("[year][month][day][hour][minute][second]");

/// Formats `at` as a 14-digit `YYYYMMDDHHMMSS` timestamp (UTC).
pub fn timestamp(at: OffsetDateTime) -> Result<String, MigrateError> {
    Ok(at.to_offset(UtcOffset::UTC).format(STAMP)?)
}

/// Normalises a free-form description to `snake_case`.
///
/// `CreateUsers`, `create users` and `create-users` all become
/// `create_users`. Returns `None` if nothing alphanumeric is left.
pub fn snake_case(description: &str) -> Option<String> {
    let mut out = String::with_capacity(description.len() + 4);
    let mut prev_lower = false;
    for c in description.chars() {
        if c.is_ascii_alphanumeric() {
            if c.is_ascii_uppercase() && prev_lower && !out.ends_with('_') {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        } else {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            prev_lower = false;
        }
    }
    let out = out.trim_end_matches('_').to_owned();
    (!out.is_empty()).then_some(out)
}

/// Creates an empty `up`/`down` pair for `description` in `dir`, stamped
/// with the current time. See [`create_at`].
pub fn create(dir: &Path, description: &str) -> Result<(PathBuf, PathBuf), MigrateError> {
    create_at(dir, description, OffsetDateTime::now_utc())
}

/// Creates an empty `up`/`down` pair stamped with `at`, creating `dir` if
/// needed.
///
/// Timestamps in one directory must be strictly increasing. If `at` is not
/// later than the newest migration already present, the new one is stamped
/// one second after that newest one.
pub fn create_at(
    dir: &Path,
    description: &str,
    at: OffsetDateTime,
) -> Result<(PathBuf, PathBuf), MigrateError> {
    let description =
        snake_case(description).ok_or_else(|| MigrateError::InvalidName(description.to_owned()))?;
    fs::create_dir_all(dir)?;

    let mut stamp = timestamp(at)?;
    if let Some(latest) = latest_timestamp(dir)? {
        if stamp <= timestamp(latest)? {
            stamp = timestamp(latest + Duration::SECOND)?;
        }
    }

    let name = format!("{stamp}_{description}");
    let up = dir.join(format!("{name}.up.sql"));
    let down = dir.join(format!("{name}.down.sql"));
    fs::write(&up, format!("-- {name}: apply\n"))?;
    fs::write(&down, format!("-- {name}: revert\n"))?;

    info!(migration = %name, dir = %dir.display(), "created migration");
    Ok((up, down))
}

/// The newest timestamp among the up files in `dir`. Prefixes that are not
/// a valid date are ignored.
fn latest_timestamp(dir: &Path) -> Result<Option<OffsetDateTime>, MigrateError> {
    let mut latest: Option<OffsetDateTime> = None;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        if !file_name.ends_with(UP_SUFFIX) {
            continue;
        }
        let Some(prefix) = file_name.get(..TIMESTAMP_LEN) else {
            continue;
        };
        let Ok(parsed) = PrimitiveDateTime::parse(prefix, STAMP) else {
            continue;
        };
        let parsed = parsed.assume_utc();
        if latest.is_none_or(|l| parsed > l) {
            latest = Some(parsed);
        }
    }
    Ok(latest)
}
