//! Request parameters and the per-operation option structures built from them.
//!
//! Bodies arrive as JSON or as urlencoded forms. Form values are always strings,
//! so booleans and modes are accepted in either shape. Every option is defaulted
//! exactly once, when its operation struct is built, and validated before the
//! driver is called.

use axum::body::Body;
use axum::extract::{Form, FromRequest, Request};
use axum::http::header::CONTENT_TYPE;
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::storage::Encoding;
use super::resource::Kind;

pub const DEFAULT_FILE_MODE: u32 = 0o666;
pub const DEFAULT_DIR_MODE: u32 = 0o777;
const MAX_MODE: u32 = 0o7777;
const BODY_LIMIT: usize = 64 * 1024 * 1024;

/// Fields accepted in POST/PUT/DELETE bodies.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct RequestBody {
    #[serde(rename = "newPath", alias = "new_path", default)]
    pub new_path: Option<String>,
    #[serde(default, deserialize_with = "de_flex_bool")]
    pub clobber: Option<bool>,
    #[serde(default, deserialize_with = "de_flex_bool")]
    pub mkdirp: Option<bool>,
    #[serde(default, deserialize_with = "de_flex_mode")]
    pub mode: Option<u32>,
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Query parameters accepted by GET.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct GetQuery {
    #[serde(default)]
    pub recursive: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}

/// Body extractor that accepts `application/x-www-form-urlencoded` or JSON.
/// An empty body yields `T::default()`.
#[derive(Debug, Clone, Default)]
pub struct FormOrJson<T>(pub T);

impl<S, T> FromRequest<S> for FormOrJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default + Send,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (parts, body) = req.into_parts();
        let bytes = axum::body::to_bytes(body, BODY_LIMIT)
            .await
            .map_err(|e| AppError::user("bad_body".to_string(), format!("failed to read request body: {}", e)))?;
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(FormOrJson(T::default()));
        }
        let is_form = parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.to_ascii_lowercase().starts_with("application/x-www-form-urlencoded"))
            .unwrap_or(false);
        if is_form {
            let req = Request::from_parts(parts, Body::from(bytes));
            let Form(v) = Form::<T>::from_request(req, state)
                .await
                .map_err(|e| AppError::user("bad_body".to_string(), e.body_text()))?;
            return Ok(FormOrJson(v));
        }
        serde_json::from_slice::<T>(&bytes)
            .map(FormOrJson)
            .map_err(|e| AppError::user("bad_body".to_string(), format!("invalid JSON body: {}", e)))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlexValue {
    Bool(bool),
    Int(u64),
    Text(String),
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

fn de_flex_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    match Option::<FlexValue>::deserialize(d)? {
        None => Ok(None),
        Some(FlexValue::Bool(b)) => Ok(Some(b)),
        Some(FlexValue::Int(n)) => Ok(Some(n != 0)),
        Some(FlexValue::Text(s)) => parse_bool(&s)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("'{}' is not a boolean", s))),
    }
}

/// Integers are taken as-is (438 == 0o666); strings are octal ("644", "0o644").
fn de_flex_mode<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    match Option::<FlexValue>::deserialize(d)? {
        None => Ok(None),
        Some(FlexValue::Int(n)) => u32::try_from(n)
            .map(Some)
            .map_err(|_| de::Error::custom(format!("mode {} is out of range", n))),
        Some(FlexValue::Text(s)) => {
            let t = s.trim();
            if t.is_empty() {
                return Ok(None);
            }
            let digits = t.strip_prefix("0o").or_else(|| t.strip_prefix("0O")).unwrap_or(t);
            u32::from_str_radix(digits, 8)
                .map(Some)
                .map_err(|_| de::Error::custom(format!("'{}' is not an octal mode", s)))
        }
        Some(FlexValue::Bool(_)) => Err(de::Error::custom("mode must be a number or an octal string")),
    }
}

fn parse_encoding(name: Option<&str>) -> AppResult<Encoding> {
    match name {
        None => Ok(Encoding::Utf8),
        Some(n) if n.trim().is_empty() => Ok(Encoding::Utf8),
        Some(n) => n.parse::<Encoding>().map_err(|e| AppError::user("bad_encoding".to_string(), e)),
    }
}

fn check_mode(mode: u32) -> AppResult<u32> {
    if mode > MAX_MODE {
        return Err(AppError::user("bad_mode".to_string(), format!("mode {:o} exceeds {:o}", mode, MAX_MODE)));
    }
    Ok(mode)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub recursive: bool,
}

impl ListOptions {
    /// Only the literal `recursive=true` enables a recursive listing.
    pub fn from_query(q: &GetQuery) -> Self {
        Self { recursive: q.recursive.as_deref() == Some("true") }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    pub encoding: Encoding,
}

impl ReadOptions {
    pub fn from_query(q: &GetQuery) -> AppResult<Self> {
        Ok(Self { encoding: parse_encoding(q.encoding.as_deref())? })
    }
}

/// Options for create/replace. `mode` defaults by kind: 0o666 files, 0o777 directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOptions {
    pub mode: u32,
    pub encoding: Encoding,
    pub content: String,
}

impl CreateOptions {
    pub fn from_body(body: &RequestBody, kind: Kind) -> AppResult<Self> {
        let default_mode = match kind {
            Kind::File => DEFAULT_FILE_MODE,
            Kind::Directory => DEFAULT_DIR_MODE,
        };
        // A zero mode is treated as unset.
        let mode = match body.mode {
            Some(m) if m != 0 => check_mode(m)?,
            _ => default_mode,
        };
        Ok(Self {
            mode,
            encoding: parse_encoding(body.encoding.as_deref())?,
            content: body.content.clone().unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOptions {
    pub new_path: String,
    pub clobber: bool,
    pub mkdirp: bool,
}

impl MoveOptions {
    /// `None` unless the body names a non-empty destination.
    pub fn from_body(body: &RequestBody) -> Option<Self> {
        let new_path = body.new_path.as_deref().filter(|p| !p.is_empty())?;
        Some(Self {
            new_path: new_path.to_string(),
            clobber: body.clobber.unwrap_or(false),
            mkdirp: body.mkdirp.unwrap_or(false),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    pub clobber: bool,
}

impl DeleteOptions {
    pub fn from_body(body: &RequestBody) -> Self {
        Self { clobber: body.clobber.unwrap_or(false) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json(s: &str) -> RequestBody { serde_json::from_str(s).unwrap() }

    #[test]
    fn json_body_fields() {
        let b = json(r#"{"newPath":"/a/c.txt","clobber":true,"mkdirp":"yes","mode":438}"#);
        assert_eq!(b.new_path.as_deref(), Some("/a/c.txt"));
        assert_eq!(b.clobber, Some(true));
        assert_eq!(b.mkdirp, Some(true));
        assert_eq!(b.mode, Some(0o666));
    }

    #[test]
    fn string_modes_are_octal() {
        assert_eq!(json(r#"{"mode":"644"}"#).mode, Some(0o644));
        assert_eq!(json(r#"{"mode":"0o700"}"#).mode, Some(0o700));
        assert!(serde_json::from_str::<RequestBody>(r#"{"mode":"9z"}"#).is_err());
        assert!(serde_json::from_str::<RequestBody>(r#"{"clobber":"maybe"}"#).is_err());
    }

    #[test]
    fn create_defaults_depend_on_kind() {
        let b = RequestBody::default();
        let f = CreateOptions::from_body(&b, Kind::File).unwrap();
        assert_eq!((f.mode, f.encoding, f.content.as_str()), (0o666, Encoding::Utf8, ""));
        let d = CreateOptions::from_body(&b, Kind::Directory).unwrap();
        assert_eq!(d.mode, 0o777);
    }

    #[test]
    fn create_validates_before_driver() {
        let b = json(r#"{"encoding":"ebcdic"}"#);
        assert!(CreateOptions::from_body(&b, Kind::File).is_err());
        let b = json(r#"{"mode":65535}"#);
        assert!(CreateOptions::from_body(&b, Kind::File).is_err());
    }

    #[test]
    fn move_requires_a_destination() {
        assert!(MoveOptions::from_body(&RequestBody::default()).is_none());
        assert!(MoveOptions::from_body(&json(r#"{"newPath":""}"#)).is_none());
        let m = MoveOptions::from_body(&json(r#"{"newPath":"/b"}"#)).unwrap();
        assert!(!m.clobber && !m.mkdirp);
    }

    #[test]
    fn recursive_only_on_literal_true() {
        let q = GetQuery { recursive: Some("true".into()), encoding: None };
        assert!(ListOptions::from_query(&q).recursive);
        let q = GetQuery { recursive: Some("1".into()), encoding: None };
        assert!(!ListOptions::from_query(&q).recursive);
        assert!(!ListOptions::from_query(&GetQuery::default()).recursive);
    }
}
