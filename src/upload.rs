use std::path::Path;

use tracing::debug;
use unicode_normalization::UnicodeNormalization;

use crate::{error::UploadError, forms::UploadedFile};

/// Extension after the last dot, compared case-insensitively.
pub fn extension_allowed(file_name: &str, allowed: &[String]) -> bool {
    let Some((_, ext)) = file_name.rsplit_once('.') else {
        return false;
    };
    allowed.iter().any(|a| a.eq_ignore_ascii_case(ext))
}

/// Reduces a client supplied file name to `[A-Za-z0-9_.-]`.
///
/// Accented letters are decomposed and lose their marks, path separators
/// become spaces, whitespace runs collapse into `_`, other characters are
/// dropped and leading or trailing dots and underscores are stripped, so
/// `../../etc/passwd` ends up as `etc_passwd`.
pub fn sanitize_file_name(file_name: &str) -> String {
    let ascii: String = file_name.nfkd().filter(char::is_ascii).collect();
    let spaced = ascii.replace(['/', '\\'], " ");
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Writes a cover into `dir` and returns the name it was stored under.
///
/// A file with the same sanitized name is overwritten.
pub async fn save_cover(
    dir: &Path,
    file: &UploadedFile,
    allowed: &[String],
) -> Result<String, UploadError> {
    if !extension_allowed(&file.file_name, allowed) {
        return Err(UploadError::InvalidFileType(file.file_name.clone()));
    }

    let name = sanitize_file_name(&file.file_name);
    if name.is_empty() {
        return Err(UploadError::InvalidFileName(file.file_name.clone()));
    }

    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(dir.join(&name), &file.data).await?;

    debug!(
        original = %file.file_name,
        stored = %name,
        size = file.data.len(),
        content_type = file.content_type.as_deref().unwrap_or("unknown"),
        "cover saved"
    );
    Ok(name)
}
