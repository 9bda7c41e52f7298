//! Color functions (§4.F), registered both globally and under `sass:color`
//! per dart-sass's backward-compatible dual exposure.

use codemap::Span;

use crate::error::{SassError, SassErrorKind, SassResult};
use crate::unit::Unit;
use crate::value::{SassColor, SassNumber, Value};

use super::{BoundArgs, BuiltinFn};

pub(crate) const FUNCTIONS: &[(&str, &str, BuiltinFn)] = &[
    ("rgb", "$red, $green: null, $blue: null, $alpha: null", rgb),
    ("rgba", "$red, $green: null, $blue: null, $alpha: null", rgb),
    ("hsl", "$hue, $saturation: null, $lightness: null, $alpha: null", hsl),
    ("hsla", "$hue, $saturation: null, $lightness: null, $alpha: null", hsl),
    ("red", "$color", red),
    ("green", "$color", green),
    ("blue", "$color", blue),
    ("alpha", "$color", alpha),
    ("opacity", "$color", alpha),
    ("hue", "$color", hue),
    ("saturation", "$color", saturation),
    ("lightness", "$color", lightness),
    ("whiteness", "$color", whiteness),
    ("blackness", "$color", blackness),
    ("mix", "$color1, $color2, $weight: 50%", mix),
    ("lighten", "$color, $amount", lighten),
    ("darken", "$color, $amount", darken),
    ("saturate", "$color, $amount", saturate),
    ("desaturate", "$color, $amount", desaturate),
    ("adjust-hue", "$color, $degrees", adjust_hue),
    ("complement", "$color", complement),
    ("invert", "$color, $weight: 100%", invert),
    ("grayscale", "$color", grayscale),
    ("transparentize", "$color, $amount", transparentize),
    ("fade-out", "$color, $amount", transparentize),
    ("opacify", "$color, $amount", opacify),
    ("fade-in", "$color, $amount", opacify),
];

fn color_arg(args: &BoundArgs, span: Span) -> SassResult<SassColor> {
    match args.get("color") {
        Value::Color(c) => Ok(c),
        other => Err(SassError::new(
            SassErrorKind::InvalidCssValue,
            format!("{} is not a color.", other.inspect(10)),
            span,
        )),
    }
}

fn channel_0_255(v: Value, default: u8, span: Span) -> SassResult<u8> {
    match v {
        Value::Null => Ok(default),
        other => {
            let n = other.assert_number(span)?;
            Ok(n.value.round().clamp(0.0, 255.0) as u8)
        }
    }
}

fn alpha_0_1(v: Value, default: f64, span: Span) -> SassResult<f64> {
    match v {
        Value::Null => Ok(default),
        other => {
            let n = other.assert_number(span)?;
            let a = if matches!(n.unit, Unit::Percent) { n.value / 100.0 } else { n.value };
            Ok(a.clamp(0.0, 1.0))
        }
    }
}

fn percent_0_100(v: &Value, default: f64, span: Span) -> SassResult<f64> {
    match v {
        Value::Null => Ok(default),
        other => Ok(other.assert_number(span)?.value.clamp(0.0, 100.0)),
    }
}

fn rgb(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let r = channel_0_255(args.get("red"), 0, span)?;
    let g = channel_0_255(args.get("green"), 0, span)?;
    let b = channel_0_255(args.get("blue"), 0, span)?;
    let a = alpha_0_1(args.get("alpha"), 1.0, span)?;
    Ok(Value::Color(SassColor::from_rgba(r, g, b, a)))
}

fn hsl(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let h = args.get("hue").assert_number(span)?.value;
    let s = percent_0_100(&args.get("saturation"), 0.0, span)?;
    let l = percent_0_100(&args.get("lightness"), 0.0, span)?;
    let a = alpha_0_1(args.get("alpha"), 1.0, span)?;
    Ok(Value::Color(SassColor::from_hsla(h, s, l, a)))
}

fn red(args: &BoundArgs, span: Span) -> SassResult<Value> {
    Ok(Value::Number(SassNumber::new(f64::from(color_arg(args, span)?.red()), Unit::None)))
}
fn green(args: &BoundArgs, span: Span) -> SassResult<Value> {
    Ok(Value::Number(SassNumber::new(f64::from(color_arg(args, span)?.green()), Unit::None)))
}
fn blue(args: &BoundArgs, span: Span) -> SassResult<Value> {
    Ok(Value::Number(SassNumber::new(f64::from(color_arg(args, span)?.blue()), Unit::None)))
}
fn alpha(args: &BoundArgs, span: Span) -> SassResult<Value> {
    Ok(Value::Number(SassNumber::new(color_arg(args, span)?.alpha(), Unit::None)))
}
fn hue(args: &BoundArgs, span: Span) -> SassResult<Value> {
    Ok(Value::Number(SassNumber::new(color_arg(args, span)?.hue(), Unit::Deg)))
}
fn saturation(args: &BoundArgs, span: Span) -> SassResult<Value> {
    Ok(Value::Number(SassNumber::new(color_arg(args, span)?.saturation(), Unit::Percent)))
}
fn lightness(args: &BoundArgs, span: Span) -> SassResult<Value> {
    Ok(Value::Number(SassNumber::new(color_arg(args, span)?.lightness(), Unit::Percent)))
}
fn whiteness(args: &BoundArgs, span: Span) -> SassResult<Value> {
    Ok(Value::Number(SassNumber::new(color_arg(args, span)?.whiteness(), Unit::Percent)))
}
fn blackness(args: &BoundArgs, span: Span) -> SassResult<Value> {
    Ok(Value::Number(SassNumber::new(color_arg(args, span)?.blackness(), Unit::Percent)))
}

/// Weighted RGBA blend (§4.F `mix`), following dart-sass's alpha-aware
/// weight adjustment so mixing a transparent and opaque color at 50%
/// doesn't just average the raw channel values.
fn mix(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let c1 = match args.get("color1") {
        Value::Color(c) => c,
        other => return Err(not_a_color(&other, span)),
    };
    let c2 = match args.get("color2") {
        Value::Color(c) => c,
        other => return Err(not_a_color(&other, span)),
    };
    let weight = percent_0_100(&args.get("weight"), 50.0, span)? / 100.0;

    let alpha_diff = c1.alpha() - c2.alpha();
    let w1 = 2.0 * weight - 1.0;
    let combined = if (w1 * alpha_diff).abs() >= 1.0 {
        w1
    } else {
        (w1 + alpha_diff) / (1.0 + w1 * alpha_diff)
    };
    let w1 = (combined + 1.0) / 2.0;
    let w2 = 1.0 - w1;

    let blend = |a: u8, b: u8| -> u8 { (f64::from(a) * w1 + f64::from(b) * w2).round() as u8 };
    let r = blend(c1.red(), c2.red());
    let g = blend(c1.green(), c2.green());
    let b = blend(c1.blue(), c2.blue());
    let a = c1.alpha() * weight + c2.alpha() * (1.0 - weight);
    Ok(Value::Color(SassColor::from_rgba(r, g, b, a)))
}

fn not_a_color(v: &Value, span: Span) -> SassError {
    SassError::new(SassErrorKind::InvalidCssValue, format!("{} is not a color.", v.inspect(10)), span)
}

fn adjust_lightness(args: &BoundArgs, span: Span, sign: f64) -> SassResult<Value> {
    let c = color_arg(args, span)?;
    let amount = args.get("amount").assert_number(span)?.value;
    let l = (c.lightness() + sign * amount).clamp(0.0, 100.0);
    Ok(Value::Color(SassColor::from_hsla(c.hue(), c.saturation(), l, c.alpha())))
}

fn lighten(args: &BoundArgs, span: Span) -> SassResult<Value> {
    adjust_lightness(args, span, 1.0)
}
fn darken(args: &BoundArgs, span: Span) -> SassResult<Value> {
    adjust_lightness(args, span, -1.0)
}

fn adjust_saturation(args: &BoundArgs, span: Span, sign: f64) -> SassResult<Value> {
    let c = color_arg(args, span)?;
    let amount = args.get("amount").assert_number(span)?.value;
    let s = (c.saturation() + sign * amount).clamp(0.0, 100.0);
    Ok(Value::Color(SassColor::from_hsla(c.hue(), s, c.lightness(), c.alpha())))
}

fn saturate(args: &BoundArgs, span: Span) -> SassResult<Value> {
    adjust_saturation(args, span, 1.0)
}
fn desaturate(args: &BoundArgs, span: Span) -> SassResult<Value> {
    adjust_saturation(args, span, -1.0)
}

fn adjust_hue(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let c = color_arg(args, span)?;
    let degrees = args.get("degrees").assert_number(span)?.value;
    Ok(Value::Color(SassColor::from_hsla(c.hue() + degrees, c.saturation(), c.lightness(), c.alpha())))
}

fn complement(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let c = color_arg(args, span)?;
    Ok(Value::Color(SassColor::from_hsla(c.hue() + 180.0, c.saturation(), c.lightness(), c.alpha())))
}

fn invert(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let c = color_arg(args, span)?;
    let weight = percent_0_100(&args.get("weight"), 100.0, span)? / 100.0;
    let inverted = SassColor::from_rgba(255 - c.red(), 255 - c.green(), 255 - c.blue(), c.alpha());
    let blend = |a: u8, b: u8| -> u8 { (f64::from(a) * weight + f64::from(b) * (1.0 - weight)).round() as u8 };
    Ok(Value::Color(SassColor::from_rgba(
        blend(inverted.red(), c.red()),
        blend(inverted.green(), c.green()),
        blend(inverted.blue(), c.blue()),
        c.alpha(),
    )))
}

fn grayscale(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let c = color_arg(args, span)?;
    Ok(Value::Color(SassColor::from_hsla(c.hue(), 0.0, c.lightness(), c.alpha())))
}

fn transparentize(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let c = color_arg(args, span)?;
    let amount = args.get("amount").assert_number(span)?.value;
    Ok(Value::Color(c.with_alpha(c.alpha() - amount)))
}

fn opacify(args: &BoundArgs, span: Span) -> SassResult<Value> {
    let c = color_arg(args, span)?;
    let amount = args.get("amount").assert_number(span)?.value;
    Ok(Value::Color(c.with_alpha(c.alpha() + amount)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        let mut map = codemap::CodeMap::new();
        map.add_file("t".into(), "x".into()).span
    }

    #[test]
    fn rgb_builds_opaque_color_by_default() {
        let bound = BoundArgs(vec![
            ("red".to_string(), Value::Number(SassNumber::new(10.0, Unit::None))),
            ("green".to_string(), Value::Number(SassNumber::new(20.0, Unit::None))),
            ("blue".to_string(), Value::Number(SassNumber::new(30.0, Unit::None))),
            ("alpha".to_string(), Value::Null),
        ]);
        let result = rgb(&bound, span()).unwrap();
        assert_eq!(result, Value::Color(SassColor::from_rgba(10, 20, 30, 1.0)));
    }

    #[test]
    fn lighten_increases_lightness_channel() {
        let bound = BoundArgs(vec![
            ("color".to_string(), Value::Color(SassColor::from_rgba(0, 0, 0, 1.0))),
            ("amount".to_string(), Value::Number(SassNumber::new(20.0, Unit::Percent))),
        ]);
        let result = lighten(&bound, span()).unwrap();
        match result {
            Value::Color(c) => assert!(c.lightness() > 15.0),
            _ => panic!("expected color"),
        }
    }

    #[test]
    fn complement_rotates_hue_by_half_circle() {
        let c = SassColor::from_rgba(255, 0, 0, 1.0);
        let bound = BoundArgs(vec![("color".to_string(), Value::Color(c.clone()))]);
        let result = complement(&bound, span()).unwrap();
        match result {
            Value::Color(out) => assert!((out.hue() - ((c.hue() + 180.0) % 360.0)).abs() < 1.0),
            _ => panic!("expected color"),
        }
    }
}
