use std::path::PathBuf;
use std::time::Duration;

use zxart_core::compositor::RenderMode;
use zxart_core::config::ViewerConfig;

use crate::DesktopError;

pub const USAGE: &str = "Usage:\n  zxart-desktop [--mode standard|gigascreen|gigascreen-compat] [--host HOST[:PORT]] [--start N] [--limit N] [--min-rating N] [--timeout SECS] [--cache-dir DIR]\n  zxart-desktop render <input.scr> <output.png> [--mode standard|gigascreen|gigascreen-compat]\n  zxart-desktop --version\n\nDefaults: --mode standard --host zxart.ee --start 0 --limit 5 --min-rating 0 --timeout 10";

#[derive(Debug, PartialEq)]
pub enum Command {
    Version,
    View {
        config: ViewerConfig,
        cache_dir: PathBuf,
    },
    Render {
        input: PathBuf,
        output: PathBuf,
        mode: RenderMode,
    },
}

fn usage_error(message: impl Into<String>) -> DesktopError {
    DesktopError::Usage(message.into())
}

fn value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, DesktopError> {
    match args.next() {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(usage_error(format!("{flag} needs a value"))),
    }
}

fn number<T: std::str::FromStr>(
    args: &mut impl Iterator<Item = String>,
    flag: &str,
) -> Result<T, DesktopError> {
    let raw = value(args, flag)?;
    raw.parse()
        .map_err(|_| usage_error(format!("{flag}: not a number: {raw}")))
}

fn mode(args: &mut impl Iterator<Item = String>) -> Result<RenderMode, DesktopError> {
    let raw = value(args, "--mode")?;
    RenderMode::from_name(&raw).ok_or_else(|| usage_error(format!("unknown mode: {raw}")))
}

pub fn default_cache_dir() -> PathBuf {
    std::env::temp_dir().join("zxart-desktop")
}

/// Parses the arguments after the program name.
pub fn parse_args<I>(args: I) -> Result<Command, DesktopError>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter().peekable();
    match args.peek().map(String::as_str) {
        Some("--version" | "-V" | "version") => return Ok(Command::Version),
        Some("render") => {
            args.next();
            return parse_render(args);
        }
        _ => {}
    }

    let mut config = ViewerConfig::default();
    let mut cache_dir = default_cache_dir();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--mode" => config.mode = mode(&mut args)?,
            "--host" => config.host = value(&mut args, "--host")?,
            "--start" => config.start_offset = number(&mut args, "--start")?,
            "--limit" => {
                config.page_size = number(&mut args, "--limit")?;
                if config.page_size == 0 {
                    return Err(usage_error("--limit must be at least 1"));
                }
            }
            "--min-rating" => config.min_rating = number(&mut args, "--min-rating")?,
            "--timeout" => {
                config.fetch.idle_timeout = Duration::from_secs(number(&mut args, "--timeout")?)
            }
            "--cache-dir" => cache_dir = value(&mut args, "--cache-dir")?.into(),
            other => return Err(usage_error(format!("unexpected argument: {other}"))),
        }
    }
    Ok(Command::View { config, cache_dir })
}

fn parse_render(mut args: impl Iterator<Item = String>) -> Result<Command, DesktopError> {
    let input = value(&mut args, "render")?;
    let output = value(&mut args, "render")?;
    let mut render_mode = RenderMode::Standard;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--mode" => render_mode = mode(&mut args)?,
            other => return Err(usage_error(format!("unexpected argument: {other}"))),
        }
    }
    Ok(Command::Render {
        input: input.into(),
        output: output.into(),
        mode: render_mode,
    })
}
