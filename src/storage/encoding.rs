//! Text encodings accepted by `readFile`/`writeFile`.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use super::{FsError, FsResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    Ascii,
    Latin1,
    Base64,
    Hex,
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf8",
            Encoding::Ascii => "ascii",
            Encoding::Latin1 => "latin1",
            Encoding::Base64 => "base64",
            Encoding::Hex => "hex",
        }
    }

    /// Render raw file bytes as text in this encoding. UTF-8 is lossy.
    pub fn encode(&self, bytes: &[u8]) -> Vec<u8> {
        match self {
            Encoding::Utf8 => String::from_utf8_lossy(bytes).into_owned().into_bytes(),
            Encoding::Ascii => bytes.iter().map(|b| b & 0x7f).collect(),
            Encoding::Latin1 => bytes.iter().map(|&b| b as char).collect::<String>().into_bytes(),
            Encoding::Base64 => STANDARD.encode(bytes).into_bytes(),
            Encoding::Hex => {
                use std::fmt::Write as _;
                let mut out = String::with_capacity(bytes.len() * 2);
                for b in bytes { let _ = write!(&mut out, "{:02x}", b); }
                out.into_bytes()
            }
        }
    }

    /// Turn request text into the bytes to store.
    pub fn decode(&self, text: &str) -> FsResult<Vec<u8>> {
        match self {
            Encoding::Utf8 => Ok(text.as_bytes().to_vec()),
            Encoding::Ascii => Ok(text.chars().map(|c| (c as u32 & 0x7f) as u8).collect()),
            Encoding::Latin1 => Ok(text.chars().map(|c| (c as u32 & 0xff) as u8).collect()),
            Encoding::Base64 => STANDARD.decode(text.trim()).map_err(|e| self.invalid(e.to_string())),
            Encoding::Hex => {
                let t = text.trim().as_bytes();
                if !t.iter().all(|b| b.is_ascii_hexdigit()) {
                    return Err(self.invalid("only hex digits are allowed"));
                }
                if t.len() % 2 != 0 {
                    return Err(self.invalid("odd number of hex digits"));
                }
                Ok(t.chunks(2).map(|pair| (hex_value(pair[0]) << 4) | hex_value(pair[1])).collect())
            }
        }
    }

    fn invalid<S: Into<String>>(&self, reason: S) -> FsError {
        FsError::InvalidContent { encoding: self.as_str(), reason: reason.into() }
    }
}

/// Value of one ASCII hex digit; callers check `is_ascii_hexdigit` first.
fn hex_value(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        _ => b.to_ascii_lowercase() - b'a' + 10,
    }
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(Encoding::Utf8),
            "ascii" => Ok(Encoding::Ascii),
            "latin1" | "binary" => Ok(Encoding::Latin1),
            "base64" => Ok(Encoding::Base64),
            "hex" => Ok(Encoding::Hex),
            other => Err(format!("unknown encoding '{}'", other)),
        }
    }
}

impl Display for Encoding {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
