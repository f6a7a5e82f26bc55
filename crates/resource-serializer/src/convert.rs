//! Primitive value conversion and URL literal formatting.
//!
//! Declared primitive types are authoritative: a runtime value is converted
//! to the declared kind before it reaches the wire. Conversions that would
//! lose information (integer overflow, text into numbers) are refused.

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

use crate::model::{PrimitiveKind, PrimitiveValue};
use crate::util::{
    format_date, format_datetime_offset, format_duration, format_time_of_day, local_micros,
};

const MICROSECONDS_PER_DAY: i64 = 86_400_000_000;

/// Decimals whose exponent magnitude exceeds this are written in `E` notation.
const MAX_PLAIN_DECIMAL_SCALE: u32 = 28;

/// Converts runtime primitive values to a declared primitive kind.
pub trait PrimitiveConverter: fmt::Debug {
    /// Returns the value represented as `target`, or `None` when the value
    /// has no representation in that kind.
    ///
    /// DateTimeOffset values are shifted into `time_zone_offset_min`; an
    /// instant whose local time overflows in that offset has no representation.
    fn convert(
        &self,
        value: &PrimitiveValue,
        target: PrimitiveKind,
        time_zone_offset_min: i16,
    ) -> Option<PrimitiveValue>;
}

/// Lossless numeric narrowing/widening plus time zone shifting.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPrimitiveConverter;

impl PrimitiveConverter for DefaultPrimitiveConverter {
    fn convert(
        &self,
        value: &PrimitiveValue,
        target: PrimitiveKind,
        time_zone_offset_min: i16,
    ) -> Option<PrimitiveValue> {
        if let Some(v) = value.as_i64() {
            return convert_integral(v, target);
        }

        match (value, target) {
            (PrimitiveValue::DateTimeOffset { epoch_us, .. }, PrimitiveKind::DateTimeOffset) => {
                local_micros(*epoch_us, time_zone_offset_min)?;
                Some(PrimitiveValue::DateTimeOffset {
                    epoch_us: *epoch_us,
                    offset_min: time_zone_offset_min,
                })
            }
            (PrimitiveValue::Date { days }, PrimitiveKind::DateTimeOffset) => {
                let epoch_us = i64::from(*days).checked_mul(MICROSECONDS_PER_DAY)?;
                local_micros(epoch_us, time_zone_offset_min)?;
                Some(PrimitiveValue::DateTimeOffset {
                    epoch_us,
                    offset_min: time_zone_offset_min,
                })
            }
            (PrimitiveValue::Single(v), PrimitiveKind::Double) => {
                Some(PrimitiveValue::Double(f64::from(*v)))
            }
            (PrimitiveValue::Double(v), PrimitiveKind::Single) => {
                let narrowed = *v as f32;
                (narrowed.is_finite() || !v.is_finite()).then_some(PrimitiveValue::Single(narrowed))
            }
            (PrimitiveValue::Decimal { mantissa, exponent }, PrimitiveKind::Double) => {
                Some(PrimitiveValue::Double(*mantissa as f64 * 10f64.powi(*exponent)))
            }
            (PrimitiveValue::Decimal { mantissa, exponent }, kind) if kind.is_integral() => {
                decimal_to_integral(*mantissa, *exponent).and_then(|v| convert_integral(v, kind))
            }
            (other, kind) if other.kind() == kind => Some(other.clone()),
            _ => None,
        }
    }
}

fn convert_integral(v: i64, target: PrimitiveKind) -> Option<PrimitiveValue> {
    match target {
        PrimitiveKind::Byte => u8::try_from(v).ok().map(PrimitiveValue::Byte),
        PrimitiveKind::SByte => i8::try_from(v).ok().map(PrimitiveValue::SByte),
        PrimitiveKind::Int16 => i16::try_from(v).ok().map(PrimitiveValue::Int16),
        PrimitiveKind::Int32 => i32::try_from(v).ok().map(PrimitiveValue::Int32),
        PrimitiveKind::Int64 => Some(PrimitiveValue::Int64(v)),
        PrimitiveKind::Single => Some(PrimitiveValue::Single(v as f32)),
        PrimitiveKind::Double => Some(PrimitiveValue::Double(v as f64)),
        PrimitiveKind::Decimal => Some(PrimitiveValue::Decimal {
            mantissa: v,
            exponent: 0,
        }),
        _ => None,
    }
}

fn decimal_to_integral(mantissa: i64, exponent: i32) -> Option<i64> {
    if exponent >= 0 {
        let scale = 10i64.checked_pow(u32::try_from(exponent).ok()?)?;
        return mantissa.checked_mul(scale);
    }
    let scale = 10i64.checked_pow(exponent.unsigned_abs())?;
    (mantissa % scale == 0).then_some(mantissa / scale)
}

fn format_decimal(mantissa: i64, exponent: i32) -> String {
    if exponent.unsigned_abs() > MAX_PLAIN_DECIMAL_SCALE {
        return format!("{}E{:+}", mantissa, exponent);
    }
    if exponent >= 0 {
        let zeros = "0".repeat(exponent as usize);
        return format!("{}{}", mantissa, zeros);
    }

    let sign = if mantissa < 0 { "-" } else { "" };
    let digits = mantissa.unsigned_abs().to_string();
    let scale = exponent.unsigned_abs() as usize;
    let padded = if digits.len() <= scale {
        format!("{}{}", "0".repeat(scale - digits.len() + 1), digits)
    } else {
        digits
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - scale);
    format!("{}{}.{}", sign, int_part, frac_part)
}

fn format_float(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "INF" } else { "-INF" }.to_string()
    } else {
        format!("{}", v)
    }
}

/// Formats a primitive value as a URL literal.
///
/// Returns `None` for a DateTimeOffset whose local time is out of range.
pub fn format_literal(value: &PrimitiveValue) -> Option<String> {
    let literal = match value {
        PrimitiveValue::Boolean(v) => v.to_string(),
        PrimitiveValue::Byte(v) => v.to_string(),
        PrimitiveValue::SByte(v) => v.to_string(),
        PrimitiveValue::Int16(v) => v.to_string(),
        PrimitiveValue::Int32(v) => v.to_string(),
        PrimitiveValue::Int64(v) => v.to_string(),
        PrimitiveValue::Single(v) => format_float(f64::from(*v)),
        PrimitiveValue::Double(v) => format_float(*v),
        PrimitiveValue::Decimal { mantissa, exponent } => format_decimal(*mantissa, *exponent),
        PrimitiveValue::String(s) => format!("'{}'", s.replace('\'', "''")),
        PrimitiveValue::Guid(g) => g.hyphenated().to_string(),
        PrimitiveValue::Binary(bytes) => format!("binary'{}'", URL_SAFE_NO_PAD.encode(bytes)),
        PrimitiveValue::Date { days } => format_date(*days),
        PrimitiveValue::TimeOfDay { micros } => format_time_of_day(*micros),
        PrimitiveValue::DateTimeOffset {
            epoch_us,
            offset_min,
        } => return format_datetime_offset(*epoch_us, *offset_min),
        PrimitiveValue::Duration { micros } => format!("duration'{}'", format_duration(*micros)),
    };
    Some(literal)
}

/// Formats key values as a key segment.
///
/// A single key is written bare (`(1)`); composite keys are named
/// (`(OrderId=1,Line=2)`).
pub fn format_key(keys: &[(&str, String)]) -> String {
    match keys {
        [(_, literal)] => format!("({})", literal),
        _ => {
            let parts: Vec<String> = keys
                .iter()
                .map(|(name, literal)| format!("{}={}", name, literal))
                .collect();
            format!("({})", parts.join(","))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn convert(value: PrimitiveValue, target: PrimitiveKind) -> Option<PrimitiveValue> {
        DefaultPrimitiveConverter.convert(&value, target, 0)
    }

    #[test]
    fn test_integral_narrowing() {
        assert_eq!(
            convert(PrimitiveValue::Int64(7), PrimitiveKind::Int32),
            Some(PrimitiveValue::Int32(7))
        );
        assert_eq!(convert(PrimitiveValue::Int64(300), PrimitiveKind::Byte), None);
        assert_eq!(convert(PrimitiveValue::Int32(-1), PrimitiveKind::Byte), None);
        assert_eq!(
            convert(PrimitiveValue::Byte(200), PrimitiveKind::Int16),
            Some(PrimitiveValue::Int16(200))
        );
    }

    #[test]
    fn test_numeric_widening() {
        assert_eq!(
            convert(PrimitiveValue::Int32(2), PrimitiveKind::Double),
            Some(PrimitiveValue::Double(2.0))
        );
        assert_eq!(
            convert(PrimitiveValue::Int32(12), PrimitiveKind::Decimal),
            Some(PrimitiveValue::Decimal {
                mantissa: 12,
                exponent: 0
            })
        );
        assert_eq!(
            convert(
                PrimitiveValue::Decimal {
                    mantissa: 1200,
                    exponent: -2
                },
                PrimitiveKind::Int32
            ),
            Some(PrimitiveValue::Int32(12))
        );
        assert_eq!(
            convert(
                PrimitiveValue::Decimal {
                    mantissa: 1250,
                    exponent: -2
                },
                PrimitiveKind::Int32
            ),
            None
        );
    }

    #[test]
    fn test_refuses_cross_kind() {
        assert_eq!(
            convert(PrimitiveValue::String("1".into()), PrimitiveKind::Int32),
            None
        );
        assert_eq!(convert(PrimitiveValue::Boolean(true), PrimitiveKind::String), None);
    }

    #[test]
    fn test_time_zone_shift() {
        let value = PrimitiveValue::DateTimeOffset {
            epoch_us: 0,
            offset_min: 0,
        };
        let shifted = DefaultPrimitiveConverter.convert(&value, PrimitiveKind::DateTimeOffset, 120);
        assert_eq!(
            shifted,
            Some(PrimitiveValue::DateTimeOffset {
                epoch_us: 0,
                offset_min: 120
            })
        );
        assert_eq!(
            format_literal(&shifted.unwrap()).unwrap(),
            "1970-01-01T02:00:00+02:00"
        );
    }

    #[test]
    fn test_time_zone_shift_out_of_range() {
        let late = PrimitiveValue::DateTimeOffset {
            epoch_us: i64::MAX - 10,
            offset_min: 0,
        };
        assert_eq!(
            DefaultPrimitiveConverter.convert(&late, PrimitiveKind::DateTimeOffset, 60),
            None
        );
        assert!(DefaultPrimitiveConverter
            .convert(&late, PrimitiveKind::DateTimeOffset, 0)
            .is_some());
        assert_eq!(
            format_literal(&PrimitiveValue::DateTimeOffset {
                epoch_us: i64::MAX - 10,
                offset_min: 60
            }),
            None
        );
    }

    #[test]
    fn test_format_literals() {
        let literal = |value: PrimitiveValue| format_literal(&value).unwrap();
        assert_eq!(literal(PrimitiveValue::Int32(1)), "1");
        assert_eq!(literal(PrimitiveValue::String("O'Neil".into())), "'O''Neil'");
        assert_eq!(
            literal(PrimitiveValue::Decimal {
                mantissa: -5,
                exponent: -2
            }),
            "-0.05"
        );
        assert_eq!(
            literal(PrimitiveValue::Decimal {
                mantissa: 12345,
                exponent: -2
            }),
            "123.45"
        );
        assert_eq!(literal(PrimitiveValue::Double(f64::NAN)), "NaN");
        assert_eq!(literal(PrimitiveValue::Binary(vec![0xfb, 0xff])), "binary'-_8'");
        assert_eq!(
            literal(PrimitiveValue::Guid(Uuid::nil())),
            "00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_large_decimal_exponents() {
        let decimal = |mantissa, exponent| {
            format_literal(&PrimitiveValue::Decimal { mantissa, exponent }).unwrap()
        };
        assert_eq!(decimal(15, 3), "15000");
        assert_eq!(decimal(1, 28), format!("1{}", "0".repeat(28)));
        assert_eq!(decimal(1, 100_000_000), "1E+100000000");
        assert_eq!(decimal(-7, -40), "-7E-40");
        assert_eq!(decimal(3, i32::MIN), format!("3E{}", i32::MIN));
    }

    #[test]
    fn test_format_key() {
        assert_eq!(format_key(&[("Id", "1".to_string())]), "(1)");
        assert_eq!(
            format_key(&[("OrderId", "1".to_string()), ("Line", "2".to_string())]),
            "(OrderId=1,Line=2)"
        );
    }
}
