//! Blob key layout and filename rules.
//!
//! Every object lives at `uploads/{uid}/{filename}`. The uid segment is
//! what isolates users, so a filename may never contain a separator or be a
//! relative path component.

use std::path::Path;

use cipherbox_core::error::AppError;
use cipherbox_core::result::AppResult;
use cipherbox_core::types::UserId;

const UPLOAD_ROOT: &str = "uploads";

/// Check a client-supplied filename. Anything else is used verbatim.
pub fn validate_filename(name: &str) -> AppResult<()> {
    if name.is_empty() {
        return Err(AppError::validation("File name must not be empty"));
    }
    if name == "." || name == ".." {
        return Err(AppError::validation(format!("Invalid file name: {name}")));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(AppError::validation(
            "File name must not contain path separators",
        ));
    }
    Ok(())
}

/// Prefix under which all of `uid`'s objects live, with trailing slash.
pub fn user_prefix(uid: &UserId) -> String {
    format!("{UPLOAD_ROOT}/{uid}/")
}

/// Full blob key for `(uid, name)`. The name must already be validated.
pub fn blob_key(uid: &UserId, name: &str) -> String {
    format!("{}{name}", user_prefix(uid))
}

/// Recover the filename from a key under `prefix`.
pub fn name_from_key<'a>(prefix: &str, key: &'a str) -> Option<&'a str> {
    key.strip_prefix(prefix).filter(|n| !n.is_empty() && !n.contains('/'))
}

/// Name a rename will actually write to: `new_name` keeps its own extension
/// if it has one, otherwise inherits `old_name`'s.
pub fn rename_target(old_name: &str, new_name: &str) -> String {
    if Path::new(new_name).extension().is_some() {
        return new_name.to_string();
    }
    match Path::new(old_name).extension() {
        Some(ext) => format!("{new_name}.{}", ext.to_string_lossy()),
        None => new_name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_filename() {
        assert!(validate_filename("hello.txt").is_ok());
        assert!(validate_filename("résumé final (2).pdf").is_ok());
        assert!(validate_filename("").is_err());
        assert!(validate_filename("..").is_err());
        assert!(validate_filename("a/b.txt").is_err());
        assert!(validate_filename("a\\b.txt").is_err());
    }

    #[test]
    fn test_keys() {
        let uid = UserId::new("u1");
        assert_eq!(blob_key(&uid, "hello.txt"), "uploads/u1/hello.txt");
        let prefix = user_prefix(&uid);
        assert_eq!(name_from_key(&prefix, "uploads/u1/hello.txt"), Some("hello.txt"));
        assert_eq!(name_from_key(&prefix, "uploads/u10/hello.txt"), None);
    }

    #[test]
    fn test_rename_target() {
        assert_eq!(rename_target("a.txt", "b"), "b.txt");
        assert_eq!(rename_target("a.txt", "b.md"), "b.md");
        assert_eq!(rename_target("archive.tar.gz", "backup"), "backup.gz");
        assert_eq!(rename_target("Makefile", "Build"), "Build");
    }
}
