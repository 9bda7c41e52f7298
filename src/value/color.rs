use std::fmt;

/// A color value. Sass colors are stored canonically as RGBA but remember
/// which representation (and, when exact, which named keyword) they were
/// written in so round-tripping preserves the user's spelling (§3.3,
/// §4.J "Color rendering").
#[derive(Debug, Clone)]
pub struct SassColor {
    red: u8,
    green: u8,
    blue: u8,
    alpha: f64,
    /// Cached display name: a CSS keyword (`red`) or `None` if the color
    /// wasn't constructed from one (or no longer matches after an
    /// operation like `darken`).
    disp: Option<String>,
}

impl SassColor {
    pub fn from_rgba(red: u8, green: u8, blue: u8, alpha: f64) -> Self {
        SassColor {
            red,
            green,
            blue,
            alpha: alpha.clamp(0.0, 1.0),
            disp: None,
        }
    }

    pub fn from_keyword(name: &str, red: u8, green: u8, blue: u8) -> Self {
        SassColor {
            red,
            green,
            blue,
            alpha: 1.0,
            disp: Some(name.to_owned()),
        }
    }

    pub fn from_hsla(h: f64, s: f64, l: f64, alpha: f64) -> Self {
        let (r, g, b) = hsl_to_rgb(h, s.clamp(0.0, 100.0) / 100.0, l.clamp(0.0, 100.0) / 100.0);
        SassColor::from_rgba(r, g, b, alpha)
    }

    pub fn from_hwba(h: f64, w: f64, bl: f64, alpha: f64) -> Self {
        let (r, g, b) = hwb_to_rgb(h, w.clamp(0.0, 100.0) / 100.0, bl.clamp(0.0, 100.0) / 100.0);
        SassColor::from_rgba(r, g, b, alpha)
    }

    /// Parse a `#rgb`/`#rgba`/`#rrggbb`/`#rrggbbaa` literal (the `#` itself
    /// already consumed by the caller). `None` for any other length.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digit = |c: char| c.to_digit(16);
        let expand = |c: char| -> Option<u8> { Some((digit(c)? * 16 + digit(c)?) as u8) };
        let pair = |s: &str| -> Option<u8> {
            let mut chars = s.chars();
            let hi = digit(chars.next()?)?;
            let lo = digit(chars.next()?)?;
            Some((hi * 16 + lo) as u8)
        };
        match hex.len() {
            3 => {
                let mut chars = hex.chars();
                let r = expand(chars.next()?)?;
                let g = expand(chars.next()?)?;
                let b = expand(chars.next()?)?;
                Some(SassColor::from_rgba(r, g, b, 1.0))
            }
            4 => {
                let mut chars = hex.chars();
                let r = expand(chars.next()?)?;
                let g = expand(chars.next()?)?;
                let b = expand(chars.next()?)?;
                let a = expand(chars.next()?)?;
                Some(SassColor::from_rgba(r, g, b, f64::from(a) / 255.0))
            }
            6 => {
                let r = pair(&hex[0..2])?;
                let g = pair(&hex[2..4])?;
                let b = pair(&hex[4..6])?;
                Some(SassColor::from_rgba(r, g, b, 1.0))
            }
            8 => {
                let r = pair(&hex[0..2])?;
                let g = pair(&hex[2..4])?;
                let b = pair(&hex[4..6])?;
                let a = pair(&hex[6..8])?;
                Some(SassColor::from_rgba(r, g, b, f64::from(a) / 255.0))
            }
            _ => None,
        }
    }

    pub const fn red(&self) -> u8 {
        self.red
    }
    pub const fn green(&self) -> u8 {
        self.green
    }
    pub const fn blue(&self) -> u8 {
        self.blue
    }
    pub const fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn hue(&self) -> f64 {
        rgb_to_hsl(self.red, self.green, self.blue).0
    }
    pub fn saturation(&self) -> f64 {
        rgb_to_hsl(self.red, self.green, self.blue).1 * 100.0
    }
    pub fn lightness(&self) -> f64 {
        rgb_to_hsl(self.red, self.green, self.blue).2 * 100.0
    }

    pub fn whiteness(&self) -> f64 {
        rgb_to_hwb(self.red, self.green, self.blue).1 * 100.0
    }
    pub fn blackness(&self) -> f64 {
        rgb_to_hwb(self.red, self.green, self.blue).2 * 100.0
    }

    #[must_use]
    pub fn with_alpha(&self, alpha: f64) -> Self {
        let mut c = self.clone();
        c.alpha = alpha.clamp(0.0, 1.0);
        c
    }

    pub fn eq_rgba(&self, other: &SassColor) -> bool {
        self.red == other.red
            && self.green == other.green
            && self.blue == other.blue
            && (self.alpha - other.alpha).abs() < 1e-11
    }

    fn keyword_for_rgb(&self) -> Option<&'static str> {
        named_color_lookup(self.red, self.green, self.blue)
    }

    /// Shortest valid CSS rendering of this color (§4.J).
    pub fn to_css_string(&self) -> String {
        if self.alpha >= 1.0 {
            if let Some(name) = &self.disp {
                if self.keyword_for_rgb() == Some(name.as_str()) {
                    return name.clone();
                }
            }
            if let Some(name) = self.keyword_for_rgb() {
                return name.to_owned();
            }
            format!("#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
        } else {
            format!(
                "rgba({}, {}, {}, {})",
                self.red,
                self.green,
                self.blue,
                format_alpha(self.alpha)
            )
        }
    }

    /// Compressed-mode rendering: lowercase hex, `#rgb` shorthand when
    /// possible, no keyword lookup (keywords are rarely shortest).
    pub fn to_compressed_css_string(&self) -> String {
        if self.alpha >= 1.0 {
            let hex = format!("{:02x}{:02x}{:02x}", self.red, self.green, self.blue);
            let bytes = hex.as_bytes();
            if bytes[0] == bytes[1] && bytes[2] == bytes[3] && bytes[4] == bytes[5] {
                format!("#{}{}{}", bytes[0] as char, bytes[2] as char, bytes[4] as char)
            } else {
                format!("#{}", hex)
            }
        } else {
            format!(
                "rgba({},{},{},{})",
                self.red,
                self.green,
                self.blue,
                format_alpha(self.alpha)
            )
        }
    }
}

fn format_alpha(alpha: f64) -> String {
    let rounded = (alpha * 1000.0).round() / 1000.0;
    format!("{}", rounded)
}

fn rgb_to_hsl(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
    let r = f64::from(r) / 255.0;
    let g = f64::from(g) / 255.0;
    let b = f64::from(b) / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    if (max - min).abs() < 1e-11 {
        return (0.0, 0.0, l);
    }
    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };
    let h = if (max - r).abs() < 1e-11 {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if (max - g).abs() < 1e-11 {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };
    (h * 60.0, s, l)
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    if s.abs() < 1e-11 {
        let v = (l * 255.0).round() as u8;
        return (v, v, v);
    }
    let h = ((h % 360.0) + 360.0) % 360.0 / 360.0;
    let q = if l < 0.5 {
        l * (1.0 + s)
    } else {
        l + s - l * s
    };
    let p = 2.0 * l - q;
    let r = hue_to_rgb(p, q, h + 1.0 / 3.0);
    let g = hue_to_rgb(p, q, h);
    let b = hue_to_rgb(p, q, h - 1.0 / 3.0);
    (
        (r * 255.0).round() as u8,
        (g * 255.0).round() as u8,
        (b * 255.0).round() as u8,
    )
}

fn hue_to_rgb(p: f64, q: f64, t: f64) -> f64 {
    let mut t = t;
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        return p + (q - p) * 6.0 * t;
    }
    if t < 1.0 / 2.0 {
        return q;
    }
    if t < 2.0 / 3.0 {
        return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
    }
    p
}

fn rgb_to_hwb(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
    let (h, _, _) = rgb_to_hsl(r, g, b);
    let w = f64::from(r.min(g).min(b)) / 255.0;
    let black = 1.0 - f64::from(r.max(g).max(b)) / 255.0;
    (h, w, black)
}

fn hwb_to_rgb(h: f64, w: f64, bl: f64) -> (u8, u8, u8) {
    if w + bl >= 1.0 {
        let gray = (w / (w + bl) * 255.0).round() as u8;
        return (gray, gray, gray);
    }
    let (r, g, b) = hsl_to_rgb(h, 1.0, 0.5);
    let scale = |c: u8| -> u8 {
        let c = f64::from(c) / 255.0;
        let c = c * (1.0 - w - bl) + w;
        (c * 255.0).round() as u8
    };
    (scale(r), scale(g), scale(b))
}

fn named_color_lookup(r: u8, g: u8, b: u8) -> Option<&'static str> {
    const NAMED: &[(&str, u8, u8, u8)] = &[
        ("black", 0, 0, 0),
        ("white", 255, 255, 255),
        ("red", 255, 0, 0),
        ("green", 0, 128, 0),
        ("blue", 0, 0, 255),
        ("yellow", 255, 255, 0),
        ("transparent", 0, 0, 0),
        ("gray", 128, 128, 128),
        ("grey", 128, 128, 128),
        ("orange", 255, 165, 0),
        ("purple", 128, 0, 128),
        ("navy", 0, 0, 128),
        ("teal", 0, 128, 128),
        ("silver", 192, 192, 192),
        ("maroon", 128, 0, 0),
        ("olive", 128, 128, 0),
        ("lime", 0, 255, 0),
        ("aqua", 0, 255, 255),
        ("fuchsia", 255, 0, 255),
    ];
    NAMED
        .iter()
        .find(|(_, cr, cg, cb)| *cr == r && *cg == g && *cb == b)
        .map(|(name, ..)| *name)
}

impl fmt::Display for SassColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_css_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_hsl_round_trip() {
        let c = SassColor::from_rgba(200, 50, 100, 1.0);
        let (h, s, l) = rgb_to_hsl(c.red(), c.green(), c.blue());
        let (r, g, b) = hsl_to_rgb(h, s, l);
        assert!((i32::from(r) - i32::from(c.red())).abs() <= 1);
        assert!((i32::from(g) - i32::from(c.green())).abs() <= 1);
        assert!((i32::from(b) - i32::from(c.blue())).abs() <= 1);
    }

    #[test]
    fn rgb_hwb_round_trip() {
        let c = SassColor::from_rgba(10, 200, 90, 1.0);
        let (h, w, bl) = rgb_to_hwb(c.red(), c.green(), c.blue());
        let (r, g, b) = hwb_to_rgb(h, w, bl);
        assert!((i32::from(r) - i32::from(c.red())).abs() <= 1);
        assert!((i32::from(g) - i32::from(c.green())).abs() <= 1);
        assert!((i32::from(b) - i32::from(c.blue())).abs() <= 1);
    }

    #[test]
    fn named_keyword_round_trips() {
        let c = SassColor::from_keyword("red", 255, 0, 0);
        assert_eq!(c.to_css_string(), "red");
    }

    #[test]
    fn from_hex_expands_shorthand() {
        let c = SassColor::from_hex("abc").unwrap();
        assert_eq!((c.red(), c.green(), c.blue()), (0xaa, 0xbb, 0xcc));
    }

    #[test]
    fn from_hex_reads_eight_digit_with_alpha() {
        let c = SassColor::from_hex("11223380").unwrap();
        assert!((c.alpha() - 128.0 / 255.0).abs() < 1e-9);
    }
}
