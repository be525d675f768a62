//! Parsing of `--op` arguments into stage operations.
//!
//! Syntax is `name[:args]`, for example `fit:400x300:255,255,255,50`.

use std::str::FromStr;

use imgstage_core::{Background, ResizeMode, StageImage};

/// One step of a processing chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operation {
    Resize(ResizeMode),
    /// Clockwise rotation in degrees.
    Rotate { angle: f64, background: Background },
}

impl Operation {
    /// Apply this step to the stage.
    pub fn apply(&self, stage: &mut StageImage) -> imgstage_core::Result<()> {
        match *self {
            Operation::Resize(mode) => stage.resize(mode)?,
            Operation::Rotate { angle, background } => stage.rotate(angle, background)?,
        };
        Ok(())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let name = parts.next().unwrap_or_default().trim().to_ascii_lowercase();
        let arg = parts.next();
        let extra = parts.next();

        let need = |what: &str| arg.ok_or_else(|| format!("`{name}` needs {what}"));
        let no_extra = |op: Operation| match extra {
            Some(rest) => Err(format!("unexpected `:{rest}` after `{name}`")),
            None => Ok(op),
        };

        match name.as_str() {
            "deform" => {
                let (width, height) = parse_size(need("WxH")?)?;
                no_extra(Operation::Resize(ResizeMode::Deform { width, height }))
            }
            "fill" => {
                let (width, height) = parse_size(need("WxH")?)?;
                no_extra(Operation::Resize(ResizeMode::Fill { width, height }))
            }
            "fit" => {
                let (width, height) = parse_size(need("WxH")?)?;
                let background = extra.map(parse_background).transpose()?.unwrap_or_default();
                Ok(Operation::Resize(ResizeMode::Fit {
                    width,
                    height,
                    background,
                }))
            }
            "max" => {
                let (width, height) = parse_size(need("WxH")?)?;
                no_extra(Operation::Resize(ResizeMode::Max { width, height }))
            }
            "width" => no_extra(Operation::Resize(ResizeMode::Width {
                width: parse_number(need("a width")?)?,
            })),
            "height" => no_extra(Operation::Resize(ResizeMode::Height {
                height: parse_number(need("a height")?)?,
            })),
            "long-edge" | "longedge" => no_extra(Operation::Resize(ResizeMode::LongEdge {
                length: parse_number(need("a length")?)?,
            })),
            "scale" => {
                let raw = need("a percent")?.trim().trim_end_matches('%');
                let percent = raw
                    .parse::<f64>()
                    .map_err(|_| format!("invalid percent `{raw}`"))?;
                no_extra(Operation::Resize(ResizeMode::Scale { percent }))
            }
            "rotate" => {
                let raw = need("an angle")?.trim();
                let angle = raw.parse::<f64>().map_err(|_| format!("invalid angle `{raw}`"))?;
                let background = extra.map(parse_background).transpose()?.unwrap_or_default();
                Ok(Operation::Rotate { angle, background })
            }
            "cw" | "right" => Ok(Operation::Rotate {
                angle: 90.0,
                background: Background::BLACK,
            }),
            "ccw" | "left" => Ok(Operation::Rotate {
                angle: -90.0,
                background: Background::BLACK,
            }),
            other => Err(format!("unknown operation `{other}`")),
        }
    }
}

/// Parse `WxH`.
fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got `{s}`"))?;
    Ok((parse_number(w)?, parse_number(h)?))
}

fn parse_number(s: &str) -> Result<u32, String> {
    s.trim().parse::<u32>().map_err(|_| format!("invalid number `{s}`"))
}

/// Parse `R,G,B` or `R,G,B,A`.
fn parse_background(s: &str) -> Result<Background, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let channel = |v: &str| v.parse::<u8>().map_err(|_| format!("invalid colour channel `{v}`"));

    match parts.as_slice() {
        [r, g, b] => Ok(Background::rgb(channel(r)?, channel(g)?, channel(b)?)),
        [r, g, b, a] => {
            let opacity = a.parse::<f32>().map_err(|_| format!("invalid opacity `{a}`"))?;
            Ok(Background::rgba(channel(r)?, channel(g)?, channel(b)?, opacity))
        }
        _ => Err(format!("expected R,G,B[,A], got `{s}`")),
    }
}
