//! Renaming rules: CRC-32 content hashing and hash-qualified names.

use std::fs::File;
use std::io::Read as _;
use std::path::Path;

use crate::error::Error;

/// Read buffer size for streaming file content through the checksum.
const HASH_CHUNK_BYTES: usize = 8 * 1024;

/// Maps an asset's reference and location to their hash-qualified
/// counterparts. Both new names embed the same hash, computed once from the
/// file content when the rule is built. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Filesystem path of the asset's current content.
    location: String,
    /// `location` with the hash token inserted.
    new_location: String,
    /// `reference` with the hash token inserted.
    new_reference: String,
    /// Reference string as it appears in documents, e.g. `app.js`.
    reference: String,
}

impl Rule {
    /// Hash the file at `location` and derive the renamed reference and path.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be opened or read to completion.
    pub fn build(reference: &str, location: &str) -> Result<Self, Error> {
        let hash = hash_file(Path::new(location))?;
        return Ok(Self::with_hash(reference, location, hash));
    }

    /// Filesystem path of the asset before renaming.
    pub fn location(&self) -> &Path {
        return Path::new(&self.location);
    }

    /// Filesystem path of the asset after renaming.
    pub fn new_location(&self) -> &Path {
        return Path::new(&self.new_location);
    }

    /// Reference string that replaces `reference` in documents.
    pub fn new_reference(&self) -> &str {
        return &self.new_reference;
    }

    /// Reference string as it appears in documents.
    pub fn reference(&self) -> &str {
        return &self.reference;
    }

    /// Build a rule from a hash that is already known.
    pub fn with_hash(reference: &str, location: &str, hash: u32) -> Self {
        return Self {
            location: location.to_string(),
            new_location: hashed_name(location, hash),
            new_reference: hashed_name(reference, hash),
            reference: reference.to_string(),
        };
    }
}

/// Stream the whole file through CRC-32 (IEEE).
///
/// # Errors
///
/// Returns `Error::Io` on open or read failure.
pub fn hash_file(path: &Path) -> Result<u32, Error> {
    let mut file = File::open(path).map_err(Error::io(path))?;
    let mut hasher = crc32fast::Hasher::new();
    let mut buf = vec![0_u8; HASH_CHUNK_BYTES];
    loop {
        let n = match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::Io { path: path.to_path_buf(), source: e }),
        };
        hasher.update(buf.get(..n).unwrap_or_default());
    }
    return Ok(hasher.finalize());
}

/// Insert `-<hex>` before the last extension of the final path segment.
///
/// The directory part is kept byte-for-byte. A name without a `.` gets the
/// token appended. The empty string stays empty.
pub fn hashed_name(name: &str, hash: u32) -> String {
    if name.is_empty() {
        return String::new();
    }
    let base_start = name.rfind(std::path::is_separator).map_or(0, |i| return i.saturating_add(1));
    let (dir, base) = name.split_at(base_start);
    let (stem, ext) = base.rfind('.').map_or((base, ""), |dot| return base.split_at(dot));
    return format!("{dir}{stem}-{hash:x}{ext}");
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, clippy::unwrap_used, reason = "tests")]
mod tests {
    use super::*;

    #[test]
    fn hashed_name_conformance_table() {
        let cases = [
            ("", 0_u32, ""),
            ("test", 0x1234, "test-1234"),
            ("command.com", 0x5678, "command-5678.com"),
            ("/etc/passwd", 0x12, "/etc/passwd-12"),
            ("/etc/sudoers.d", 0x34, "/etc/sudoers-34.d"),
        ];
        for (input, hash, expected) in cases {
            assert_eq!(hashed_name(input, hash), expected, "input {input:?}");
        }
    }

    #[test]
    fn hashed_name_splits_only_last_extension() {
        assert_eq!(hashed_name("js/vendor.min.js", 0xabc), "js/vendor.min-abc.js");
        assert_eq!(hashed_name("v1.2/app", 0xff), "v1.2/app-ff");
        assert_eq!(hashed_name("./static/app.css", 0x1), "./static/app-1.css");
    }

    #[test]
    fn hash_matches_crc32_check_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("check.txt");
        std::fs::write(&path, b"123456789").unwrap();
        assert_eq!(hash_file(&path).unwrap(), 0xcbf4_3926);
    }

    #[test]
    fn hash_is_content_only() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.js");
        let b = dir.path().join("other-name.css");
        std::fs::write(&a, b"console.log(1);\n").unwrap();
        std::fs::write(&b, b"console.log(1);\n").unwrap();
        assert_eq!(hash_file(&a).unwrap(), hash_file(&b).unwrap());
        assert_eq!(hash_file(&a).unwrap(), 0x6a9f_696c);

        std::fs::write(&b, b"console.log(2);\n").unwrap();
        assert_ne!(hash_file(&a).unwrap(), hash_file(&b).unwrap());
    }

    #[test]
    fn build_uses_one_hash_for_both_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.js");
        std::fs::write(&path, b"console.log(1);\n").unwrap();
        let location = path.to_str().unwrap();

        let rule = Rule::build("js/app.js", location).unwrap();
        assert_eq!(rule.reference(), "js/app.js");
        assert_eq!(rule.new_reference(), "js/app-6a9f696c.js");
        assert_eq!(rule.new_location(), dir.path().join("app-6a9f696c.js"));
        assert_eq!(rule.location(), path);
    }

    #[test]
    fn empty_reference_yields_empty_new_reference() {
        let rule = Rule::with_hash("", "assets/app.js", 0x10);
        assert_eq!(rule.new_reference(), "");
        assert_eq!(rule.new_location(), Path::new("assets/app-10.js"));
    }

    #[test]
    fn build_fails_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.js");
        let err = Rule::build("missing.js", missing.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, Error::Io { ref path, .. } if *path == missing));
    }
}
