use crate::color::Rgb;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "nightglow",
    version,
    about = "Starry night terminal backdrop: twinkling sky, swirling nebula, pointer trails and click ripples",
    after_help = "Keys: 1-4 toggle starfield/spiral/trail/ripple, q, ESC or Ctrl+C to exit"
)]
pub struct Config {
    /// Layers to mount; they always stack starfield, spiral, trail, ripple
    #[arg(
        long,
        value_enum,
        value_delimiter = ',',
        default_values_t = EffectKind::ALL
    )]
    pub layers: Vec<EffectKind>,

    /// Background color as hex (e.g. --bg-color 1a1b26)
    #[arg(long, value_parser = parse_hex_color)]
    pub bg_color: Option<Rgb>,

    /// Logical pixels per device pixel (one device pixel is half a cell)
    #[arg(long, default_value_t = 8.0)]
    pub scale: f32,

    /// Fraction of the viewport taken by the spiral panel
    #[arg(long, default_value_t = 0.6)]
    pub panel: f32,

    /// Seed for reproducible particle layouts
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write logs to this file (the terminal is busy rendering)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn bg_color(&self) -> Rgb {
        self.bg_color.unwrap_or((0, 0, 0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum EffectKind {
    #[value(alias = "stars")]
    Starfield,
    #[value(alias = "nebula")]
    Spiral,
    #[value(alias = "path")]
    Trail,
    #[value(alias = "pulse")]
    Ripple,
}

impl EffectKind {
    /// Back-to-front stacking order.
    pub const ALL: [EffectKind; 4] = [
        EffectKind::Starfield,
        EffectKind::Spiral,
        EffectKind::Trail,
        EffectKind::Ripple,
    ];

    /// Maps the '1'..'4' toggle keys.
    pub fn from_key(c: char) -> Option<Self> {
        let idx = c.to_digit(10)? as usize;
        idx.checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }
}

pub fn parse_hex_color(hex: &str) -> Result<Rgb, String> {
    let hex = hex.trim_start_matches('#');
    let invalid = || format!("invalid hex color '{hex}', expected RRGGBB (e.g. 1a1b26)");
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(invalid());
    }

    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).map_err(|_| invalid());
    Ok((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_mount_every_layer() {
        let cfg = Config::parse_from(["nightglow"]);
        assert_eq!(cfg.layers, EffectKind::ALL.to_vec());
        assert_eq!(cfg.bg_color(), (0, 0, 0));
        assert_eq!(cfg.scale, 8.0);
        assert!(cfg.log_file.is_none());
    }

    #[test]
    fn layers_accept_comma_list_and_aliases() {
        let cfg = Config::parse_from(["nightglow", "--layers", "stars,pulse"]);
        assert_eq!(cfg.layers, vec![EffectKind::Starfield, EffectKind::Ripple]);
    }

    #[test]
    fn bg_color_is_parsed_from_hex() {
        let cfg = Config::parse_from(["nightglow", "--bg-color", "#1a1b26"]);
        assert_eq!(cfg.bg_color(), (0x1a, 0x1b, 0x26));
        assert!(Config::try_parse_from(["nightglow", "--bg-color", "zzz"]).is_err());
    }

    #[test]
    fn hex_parser_rejects_bad_input() {
        assert_eq!(parse_hex_color("ffffff"), Ok((255, 255, 255)));
        assert!(parse_hex_color("fffff").is_err());
        assert!(parse_hex_color("gg0000").is_err());
        assert!(parse_hex_color("ééé").is_err());
    }

    #[test]
    fn toggle_keys_map_in_stack_order() {
        assert_eq!(EffectKind::from_key('1'), Some(EffectKind::Starfield));
        assert_eq!(EffectKind::from_key('4'), Some(EffectKind::Ripple));
        assert_eq!(EffectKind::from_key('0'), None);
        assert_eq!(EffectKind::from_key('5'), None);
        assert_eq!(EffectKind::from_key('x'), None);
    }
}
