//! Extension validation against an upload policy.
//!
//! Only the extension is checked; mime types are not reliably reported by
//! every browser, so final content validation is left to the API.

use crate::errors::ValidationFailure;
use crate::policy::UploadPolicy;
use crate::source::FileSource;

/// Check every file against the policy's allowed extensions.
///
/// Returns one failure per rejected file, in input order. A policy with no
/// extension restriction accepts everything. Pure: no I/O, no side effects.
pub fn validate(files: &[FileSource], policy: &UploadPolicy) -> Vec<ValidationFailure> {
    let Some(allowed) = policy.allowed_extensions.as_deref() else {
        return Vec::new();
    };
    if allowed.is_empty() {
        return Vec::new();
    }

    files
        .iter()
        .filter(|file| !extension_allowed(file.name(), allowed))
        .map(|file| ValidationFailure {
            file_name: file.name().to_string(),
            message: unsupported_message(allowed),
        })
        .collect()
}

fn extension_allowed(file_name: &str, allowed: &[String]) -> bool {
    // Extension is everything after the last dot; no dot means no extension.
    let Some((_, extension)) = file_name.rsplit_once('.') else {
        return false;
    };

    allowed
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(extension))
}

fn unsupported_message(allowed: &[String]) -> String {
    let listed = allowed
        .iter()
        .map(|extension| format!(".{}", extension.to_uppercase()))
        .collect::<Vec<_>>()
        .join(", ");

    format!("The file type you uploaded is not supported. Please use {listed}")
}
