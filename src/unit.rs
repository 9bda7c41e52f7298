use std::fmt;

/// A CSS/Sass unit. `None` is the unitless unit; `Unknown` preserves an
/// unrecognized unit string verbatim (Sass allows arbitrary unit names,
/// they just never participate in conversion).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Unit {
    None,
    Px,
    In,
    Cm,
    Mm,
    Q,
    Pt,
    Pc,
    Em,
    Rem,
    Ex,
    Ch,
    Vw,
    Vh,
    Vmin,
    Vmax,
    Deg,
    Grad,
    Rad,
    Turn,
    S,
    Ms,
    Hz,
    Khz,
    Dpi,
    Dpcm,
    Dppx,
    Percent,
    Unknown(String),
}

impl Unit {
    /// Which conversion family a unit belongs to, if any. Units compare
    /// compatible only within the same family (§4.E "unit-mismatch").
    fn family(&self) -> Option<&'static str> {
        match self {
            Unit::Px | Unit::In | Unit::Cm | Unit::Mm | Unit::Q | Unit::Pt | Unit::Pc => {
                Some("length")
            }
            Unit::Deg | Unit::Grad | Unit::Rad | Unit::Turn => Some("angle"),
            Unit::S | Unit::Ms => Some("time"),
            Unit::Hz | Unit::Khz => Some("frequency"),
            Unit::Dpi | Unit::Dpcm | Unit::Dppx => Some("resolution"),
            _ => None,
        }
    }

    /// Factor to multiply a value in `self` by to get the canonical base
    /// unit for its family (px for length, deg for angle, s for time, Hz
    /// for frequency, dppx for resolution).
    fn to_base_factor(&self) -> f64 {
        match self {
            Unit::Px => 1.0,
            Unit::In => 96.0,
            Unit::Cm => 96.0 / 2.54,
            Unit::Mm => 96.0 / 25.4,
            Unit::Q => 96.0 / 101.6,
            Unit::Pt => 96.0 / 72.0,
            Unit::Pc => 16.0,
            Unit::Deg => 1.0,
            Unit::Grad => 0.9,
            Unit::Rad => 180.0 / std::f64::consts::PI,
            Unit::Turn => 360.0,
            Unit::S => 1.0,
            Unit::Ms => 0.001,
            Unit::Hz => 1.0,
            Unit::Khz => 1000.0,
            Unit::Dpi => 1.0,
            Unit::Dpcm => 2.54,
            Unit::Dppx => 96.0,
            _ => 1.0,
        }
    }

    pub fn comparable(&self, other: &Unit) -> bool {
        if self == other {
            return true;
        }
        self.family().is_some() && self.family() == other.family()
    }

    /// Convert a value expressed in `self` units into `to` units. Panics
    /// (via `debug_assert`) if called on incomparable units; callers must
    /// check `comparable` first, which every arithmetic call site in
    /// `value::number` does.
    pub fn convert(&self, value: f64, to: &Unit) -> f64 {
        if self == to {
            return value;
        }
        debug_assert!(self.comparable(to), "incompatible unit conversion");
        let base = value * self.to_base_factor();
        base / to.to_base_factor()
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Unit::None => "",
            Unit::Px => "px",
            Unit::In => "in",
            Unit::Cm => "cm",
            Unit::Mm => "mm",
            Unit::Q => "Q",
            Unit::Pt => "pt",
            Unit::Pc => "pc",
            Unit::Em => "em",
            Unit::Rem => "rem",
            Unit::Ex => "ex",
            Unit::Ch => "ch",
            Unit::Vw => "vw",
            Unit::Vh => "vh",
            Unit::Vmin => "vmin",
            Unit::Vmax => "vmax",
            Unit::Deg => "deg",
            Unit::Grad => "grad",
            Unit::Rad => "rad",
            Unit::Turn => "turn",
            Unit::S => "s",
            Unit::Ms => "ms",
            Unit::Hz => "Hz",
            Unit::Khz => "kHz",
            Unit::Dpi => "dpi",
            Unit::Dpcm => "dpcm",
            Unit::Dppx => "dppx",
            Unit::Percent => "%",
            Unit::Unknown(u) => return write!(f, "{}", u),
        };
        write!(f, "{}", s)
    }
}

impl From<&str> for Unit {
    fn from(s: &str) -> Unit {
        match s.to_ascii_lowercase().as_str() {
            "" => Unit::None,
            "px" => Unit::Px,
            "in" => Unit::In,
            "cm" => Unit::Cm,
            "mm" => Unit::Mm,
            "q" => Unit::Q,
            "pt" => Unit::Pt,
            "pc" => Unit::Pc,
            "em" => Unit::Em,
            "rem" => Unit::Rem,
            "ex" => Unit::Ex,
            "ch" => Unit::Ch,
            "vw" => Unit::Vw,
            "vh" => Unit::Vh,
            "vmin" => Unit::Vmin,
            "vmax" => Unit::Vmax,
            "deg" => Unit::Deg,
            "grad" => Unit::Grad,
            "rad" => Unit::Rad,
            "turn" => Unit::Turn,
            "s" => Unit::S,
            "ms" => Unit::Ms,
            "hz" => Unit::Hz,
            "khz" => Unit::Khz,
            "dpi" => Unit::Dpi,
            "dpcm" => Unit::Dpcm,
            "dppx" => Unit::Dppx,
            "%" => Unit::Percent,
            _ => Unit::Unknown(s.to_owned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Unit;

    #[test]
    fn round_trips_through_conversion() {
        let x = 37.5_f64;
        let px_to_in = Unit::Px.convert(x, &Unit::In);
        let back = Unit::In.convert(px_to_in, &Unit::Px);
        assert!((back - x).abs() < 1e-9);
    }

    #[test]
    fn incompatible_families_are_not_comparable() {
        assert!(!Unit::Px.comparable(&Unit::Deg));
        assert!(Unit::Px.comparable(&Unit::In));
    }
}
