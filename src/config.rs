//!
//! fileserver configuration
//! ------------------------
//! Settings resolve in three layers: built-in defaults, then environment variables,
//! then command-line flags. Each layer only overrides what it actually specifies.
//!
//! | flag                 | env                            | default   |
//! |----------------------|--------------------------------|-----------|
//! | `--bind ADDR`        | `FILESERVER_BIND`              | `0.0.0.0` |
//! | `--http-port N`      | `FILESERVER_HTTP_PORT`         | `7878`    |
//! | `--root PATH`        | `FILESERVER_ROOT`              | `files`   |
//! | `--output-formatter` | `FILESERVER_OUTPUT_FORMATTER`  | none      |

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use path_absolutize::Absolutize;
use serde::{Deserialize, Serialize};

pub const USAGE: &str = "fileserver\n\nUSAGE:\n  fileserver [--bind ADDR] [--http-port N] [--root PATH] [--output-formatter NAME]\n\nOPTIONS:\n  --bind ADDR               Listen address (env: FILESERVER_BIND, default 0.0.0.0)\n  --http-port N             HTTP port (env: FILESERVER_HTTP_PORT, default 7878)\n  --root PATH               Directory served as the collection root (env: FILESERVER_ROOT, default ./files)\n  --output-formatter NAME   identity | uppercase-name | lowercase-name | strip-trailing-slash\n                            (env: FILESERVER_OUTPUT_FORMATTER, default none)\n  -h, --help                Print this help\n";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    pub bind_addr: IpAddr,
    pub http_port: u16,
    pub root_dir: PathBuf,
    /// Name of a built-in output formatter to install at startup.
    pub output_formatter: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::from([0, 0, 0, 0]),
            http_port: 7878,
            root_dir: PathBuf::from("files"),
            output_formatter: None,
        }
    }
}

/// Values one layer (env or CLI) supplies; `None` means "not specified here".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub bind_addr: Option<IpAddr>,
    pub http_port: Option<u16>,
    pub root_dir: Option<PathBuf>,
    pub output_formatter: Option<String>,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr { SocketAddr::new(self.bind_addr, self.http_port) }

    pub fn apply(&mut self, o: ConfigOverrides) {
        if let Some(v) = o.bind_addr { self.bind_addr = v; }
        if let Some(v) = o.http_port { self.http_port = v; }
        if let Some(v) = o.root_dir { self.root_dir = v; }
        if o.output_formatter.is_some() { self.output_formatter = o.output_formatter; }
    }

    /// Defaults, then the process environment, then `args` (without argv[0]).
    pub fn load(args: &[String]) -> Result<Self> {
        let mut cfg = ServerConfig::default();
        cfg.apply(overrides_from_env(|k| std::env::var(k).ok())?);
        cfg.apply(overrides_from_args(args)?);
        Ok(cfg)
    }

    /// Absolute form of the root directory, without resolving symlinks.
    pub fn absolute_root(&self) -> Result<PathBuf> {
        let abs = self
            .root_dir
            .absolutize()
            .with_context(|| format!("Failed to absolutize root directory: {}", self.root_dir.display()))?;
        Ok(abs.to_path_buf())
    }
}

pub fn wants_help(args: &[String]) -> bool {
    args.iter().any(|a| a == "--help" || a == "-h")
}

fn parse_port(name: &str, v: &str) -> Result<u16> {
    v.trim().parse::<u16>().with_context(|| format!("{}: '{}' is not a valid port", name, v))
}

fn parse_ip(name: &str, v: &str) -> Result<IpAddr> {
    v.trim().parse::<IpAddr>().with_context(|| format!("{}: '{}' is not a valid IP address", name, v))
}

/// Read overrides through `get`, so tests can supply a fake environment.
pub fn overrides_from_env<F: Fn(&str) -> Option<String>>(get: F) -> Result<ConfigOverrides> {
    let mut o = ConfigOverrides::default();
    if let Some(v) = get("FILESERVER_BIND") { o.bind_addr = Some(parse_ip("FILESERVER_BIND", &v)?); }
    if let Some(v) = get("FILESERVER_HTTP_PORT") { o.http_port = Some(parse_port("FILESERVER_HTTP_PORT", &v)?); }
    if let Some(v) = get("FILESERVER_ROOT") {
        if !v.trim().is_empty() { o.root_dir = Some(PathBuf::from(v)); }
    }
    if let Some(v) = get("FILESERVER_OUTPUT_FORMATTER") {
        if !v.trim().is_empty() { o.output_formatter = Some(v.trim().to_string()); }
    }
    Ok(o)
}

pub fn overrides_from_args(args: &[String]) -> Result<ConfigOverrides> {
    let mut o = ConfigOverrides::default();
    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        if flag == "--help" || flag == "-h" {
            i += 1;
            continue;
        }
        let Some(value) = args.get(i + 1) else {
            bail!("{} requires a value", flag);
        };
        match flag {
            "--bind" => o.bind_addr = Some(parse_ip(flag, value)?),
            "--http-port" => o.http_port = Some(parse_port(flag, value)?),
            "--root" => o.root_dir = Some(PathBuf::from(value)),
            "--output-formatter" => o.output_formatter = Some(value.clone()),
            other => bail!("unknown option '{}'\n\n{}", other, USAGE),
        }
        i += 2;
    }
    Ok(o)
}
