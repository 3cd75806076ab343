//! Path & kind resolution and the client-facing resource descriptor.
//!
//! A request path ending in `/` asserts "this is a directory", anything else asserts
//! "this is a file". The assertion only selects a branch; the driver has the final
//! word, and a contradiction surfaces as `Outcome::WrongKind` which the HTTP layer
//! turns into a 303 redirect to the corrected URL.

use axum::http::Uri;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::storage::{DirEntry, FsError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    File,
    Directory,
}

/// A filesystem entry as exposed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub name: String,
    pub path: String,
    pub dir: bool,
}

impl ResourceDescriptor {
    /// Descriptor for a requested path; name is the last non-empty segment ("" for root).
    pub fn for_path(path: &str, kind: Kind) -> Self {
        let name = path.split('/').filter(|s| !s.is_empty()).last().unwrap_or("").to_string();
        Self { name, path: path.to_string(), dir: kind == Kind::Directory }
    }
}

impl From<DirEntry> for ResourceDescriptor {
    fn from(e: DirEntry) -> Self {
        Self { name: e.name, path: e.path, dir: e.dir }
    }
}

/// The decoded request path plus what the caller asserted about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPath {
    /// Percent-decoded path handed to the driver.
    pub decoded: String,
    /// Path exactly as it appeared on the wire, used to build redirects.
    pub raw: String,
    pub query: Option<String>,
    pub kind: Kind,
}

impl TargetPath {
    pub fn parse(raw: &str, query: Option<&str>) -> AppResult<Self> {
        let raw = if raw.is_empty() { "/" } else { raw };
        let decoded = decode_keeping_reserved(raw)
            .map_err(|e| AppError::user("bad_path".to_string(), format!("path is not valid UTF-8 after decoding: {}", e)))?;
        let kind = if raw.ends_with('/') { Kind::Directory } else { Kind::File };
        Ok(Self { decoded, raw: raw.to_string(), query: query.map(|q| q.to_string()), kind })
    }

    pub fn from_uri(uri: &Uri) -> AppResult<Self> {
        Self::parse(uri.path(), uri.query())
    }

    /// `uri` is the path as seen by this router (prefix stripped when nested);
    /// redirects are built from `original`, the URL the client actually sent.
    pub fn from_request_uris(uri: &Uri, original: &Uri) -> AppResult<Self> {
        let mut t = Self::from_uri(uri)?;
        if original.path() != uri.path() {
            t.raw = original.path().to_string();
        }
        t.query = original.query().map(|q| q.to_string());
        Ok(t)
    }

    pub fn descriptor(&self) -> ResourceDescriptor {
        ResourceDescriptor::for_path(&self.decoded, self.kind)
    }

    /// URL the client should have used, given what the path actually is.
    pub fn redirect_location(&self, actual: Kind) -> String {
        let mut target = match actual {
            Kind::Directory if !self.raw.ends_with('/') => format!("{}/", self.raw),
            Kind::File if self.raw.len() > 1 && self.raw.ends_with('/') => self.raw[..self.raw.len() - 1].to_string(),
            _ => self.raw.clone(),
        };
        if let Some(q) = &self.query {
            target.push('?');
            target.push_str(q);
        }
        target
    }
}

/// Escapes of these characters stay encoded, so `%2F` names a character inside
/// a segment rather than a separator.
const RESERVED: &[u8] = b";/?:@&=+$,#";

/// Percent-decode `raw`, leaving escapes of reserved characters untouched.
fn decode_keeping_reserved(raw: &str) -> Result<String, std::string::FromUtf8Error> {
    let mut out = String::with_capacity(raw.len());
    let mut chunk_start = 0;
    let mut i = 0;
    while let Some(off) = raw[i..].find('%') {
        let at = i + off;
        let reserved = raw
            .get(at + 1..at + 3)
            .filter(|h| h.bytes().all(|b| b.is_ascii_hexdigit()))
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .is_some_and(|b| RESERVED.contains(&b));
        if reserved {
            out.push_str(&urlencoding::decode(&raw[chunk_start..at])?);
            out.push_str(&raw[at..at + 3]);
            chunk_start = at + 3;
            i = at + 3;
        } else {
            i = at + 1;
        }
    }
    out.push_str(&urlencoding::decode(&raw[chunk_start..])?);
    Ok(out)
}

/// Result of a read-side driver call: either the value, or proof that the
/// trailing-slash assertion was wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Found(T),
    WrongKind { expected: Kind, actual: Kind },
}

impl<T> Outcome<T> {
    /// Fold a driver result into an outcome. Only the two kind errors are
    /// recovered; everything else stays an error.
    pub fn from_driver(res: Result<T, FsError>, expected: Kind) -> AppResult<Self> {
        match (res, expected) {
            (Ok(v), _) => Ok(Outcome::Found(v)),
            (Err(FsError::NotADirectory(_)), Kind::Directory) => {
                Ok(Outcome::WrongKind { expected, actual: Kind::File })
            }
            (Err(FsError::IsADirectory(_)), Kind::File) => {
                Ok(Outcome::WrongKind { expected, actual: Kind::Directory })
            }
            (Err(e), _) => Err(e.into()),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Found(v) => Outcome::Found(f(v)),
            Outcome::WrongKind { expected, actual } => Outcome::WrongKind { expected, actual },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_selects_kind() {
        assert_eq!(TargetPath::parse("/", None).unwrap().kind, Kind::Directory);
        assert_eq!(TargetPath::parse("/a/b/", None).unwrap().kind, Kind::Directory);
        assert_eq!(TargetPath::parse("/a/b", None).unwrap().kind, Kind::File);
    }

    #[test]
    fn percent_escapes_are_decoded() {
        let t = TargetPath::parse("/my%20docs/caf%C3%A9.txt", None).unwrap();
        assert_eq!(t.decoded, "/my docs/café.txt");
        assert_eq!(t.raw, "/my%20docs/caf%C3%A9.txt");
        assert!(TargetPath::parse("/bad%FF", None).is_err());
    }

    #[test]
    fn reserved_escapes_stay_encoded() {
        let t = TargetPath::parse("/a%2Fb%20c", None).unwrap();
        assert_eq!(t.decoded, "/a%2Fb c");
        assert_eq!(t.kind, Kind::File);
        let t = TargetPath::parse("/q%3F%23/caf%C3%A9%2f", None).unwrap();
        assert_eq!(t.decoded, "/q%3F%23/café%2f");
        assert_eq!(t.kind, Kind::File);
        assert_eq!(TargetPath::parse("/100%", None).unwrap().decoded, "/100%");
    }

    #[test]
    fn redirect_locations() {
        let dir_req = TargetPath::parse("/a/b.txt/", None).unwrap();
        assert_eq!(dir_req.redirect_location(Kind::File), "/a/b.txt");
        let file_req = TargetPath::parse("/a/sub", Some("encoding=hex")).unwrap();
        assert_eq!(file_req.redirect_location(Kind::Directory), "/a/sub/?encoding=hex");
        let root = TargetPath::parse("/", None).unwrap();
        assert_eq!(root.redirect_location(Kind::File), "/");
    }

    #[test]
    fn descriptors_for_paths() {
        let d = ResourceDescriptor::for_path("/a/b/", Kind::Directory);
        assert_eq!(d, ResourceDescriptor { name: "b".into(), path: "/a/b/".into(), dir: true });
        let r = ResourceDescriptor::for_path("/", Kind::Directory);
        assert_eq!(r.name, "");
        let f = ResourceDescriptor::for_path("/x.txt", Kind::File);
        assert!(!f.dir);
        assert_eq!(f.name, "x.txt");
    }

    #[test]
    fn only_kind_errors_become_wrong_kind() {
        let o = Outcome::<()>::from_driver(Err(FsError::NotADirectory("/f/".into())), Kind::Directory).unwrap();
        assert_eq!(o, Outcome::WrongKind { expected: Kind::Directory, actual: Kind::File });
        let o = Outcome::<()>::from_driver(Err(FsError::IsADirectory("/d".into())), Kind::File).unwrap();
        assert_eq!(o, Outcome::WrongKind { expected: Kind::File, actual: Kind::Directory });
        assert!(Outcome::<()>::from_driver(Err(FsError::NotFound("/x".into())), Kind::File).is_err());
        // A kind error that contradicts the branch taken is not a redirect.
        assert!(Outcome::<()>::from_driver(Err(FsError::IsADirectory("/d/".into())), Kind::Directory).is_err());
    }
}
