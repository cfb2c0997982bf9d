//! Unit and time conversion.
//!
//! Pure functions converting scalars and buffers between named units.
//! Unit strings follow the conventions numerical models use for their
//! variable metadata (`"kg m-3"`, `"W/m^2"`, `"m s-1"`, `"degC"`,
//! `"days since 2000-01-01"`). Each unit is reduced to a scale and offset
//! relative to the SI base units plus a vector of base-dimension exponents;
//! two units are compatible exactly when their exponent vectors match.

use std::f64::consts::PI;

use chrono::NaiveDateTime;

use crate::error::{CouplingError, CouplingResult};

/// Number of tracked base dimensions.
const NDIMS: usize = 7;

/// Exponents of (length, mass, time, temperature, amount, current, luminosity).
type Dims = [i32; NDIMS];

const NONE: Dims = [0, 0, 0, 0, 0, 0, 0];
const LENGTH: Dims = [1, 0, 0, 0, 0, 0, 0];
const MASS: Dims = [0, 1, 0, 0, 0, 0, 0];
const TIME: Dims = [0, 0, 1, 0, 0, 0, 0];
const TEMPERATURE: Dims = [0, 0, 0, 1, 0, 0, 0];
const AMOUNT: Dims = [0, 0, 0, 0, 1, 0, 0];
const CURRENT: Dims = [0, 0, 0, 0, 0, 1, 0];
const LUMINOSITY: Dims = [0, 0, 0, 0, 0, 0, 1];
const AREA: Dims = [2, 0, 0, 0, 0, 0, 0];
const VOLUME: Dims = [3, 0, 0, 0, 0, 0, 0];
const FREQUENCY: Dims = [0, 0, -1, 0, 0, 0, 0];
const FORCE: Dims = [1, 1, -2, 0, 0, 0, 0];
const ENERGY: Dims = [2, 1, -2, 0, 0, 0, 0];
const POWER: Dims = [2, 1, -3, 0, 0, 0, 0];
const PRESSURE: Dims = [-1, 1, -2, 0, 0, 0, 0];

const SECONDS_PER_DAY: f64 = 86_400.0;

/// One entry of the symbol table: names, scale to SI, dimensions, and
/// whether SI prefixes may be attached.
struct Symbol {
    names: &'static [&'static str],
    scale: f64,
    dims: Dims,
    prefixable: bool,
}

const SYMBOLS: &[Symbol] = &[
    // Base units.
    Symbol { names: &["m", "meter", "meters", "metre", "metres"], scale: 1.0, dims: LENGTH, prefixable: true },
    Symbol { names: &["g", "gram", "grams"], scale: 1.0e-3, dims: MASS, prefixable: true },
    Symbol { names: &["s", "sec", "second", "seconds"], scale: 1.0, dims: TIME, prefixable: true },
    Symbol { names: &["K", "kelvin"], scale: 1.0, dims: TEMPERATURE, prefixable: false },
    Symbol { names: &["mol", "mole", "moles"], scale: 1.0, dims: AMOUNT, prefixable: true },
    Symbol { names: &["A", "ampere", "amperes"], scale: 1.0, dims: CURRENT, prefixable: true },
    Symbol { names: &["cd", "candela"], scale: 1.0, dims: LUMINOSITY, prefixable: false },
    // Calendar durations.
    Symbol { names: &["min", "minute", "minutes"], scale: 60.0, dims: TIME, prefixable: false },
    Symbol { names: &["h", "hr", "hour", "hours"], scale: 3_600.0, dims: TIME, prefixable: false },
    Symbol { names: &["d", "day", "days"], scale: SECONDS_PER_DAY, dims: TIME, prefixable: false },
    Symbol { names: &["wk", "week", "weeks"], scale: 7.0 * SECONDS_PER_DAY, dims: TIME, prefixable: false },
    Symbol { names: &["yr", "year", "years", "a"], scale: 365.25 * SECONDS_PER_DAY, dims: TIME, prefixable: false },
    Symbol { names: &["common_year", "common_years"], scale: 365.0 * SECONDS_PER_DAY, dims: TIME, prefixable: false },
    // Derived units.
    Symbol { names: &["N", "newton", "newtons"], scale: 1.0, dims: FORCE, prefixable: true },
    Symbol { names: &["J", "joule", "joules"], scale: 1.0, dims: ENERGY, prefixable: true },
    Symbol { names: &["W", "watt", "watts"], scale: 1.0, dims: POWER, prefixable: true },
    Symbol { names: &["Pa", "pascal", "pascals"], scale: 1.0, dims: PRESSURE, prefixable: true },
    Symbol { names: &["bar"], scale: 1.0e5, dims: PRESSURE, prefixable: true },
    Symbol { names: &["atm"], scale: 101_325.0, dims: PRESSURE, prefixable: false },
    Symbol { names: &["Hz", "hertz"], scale: 1.0, dims: FREQUENCY, prefixable: true },
    Symbol { names: &["L", "l", "liter", "liters", "litre", "litres"], scale: 1.0e-3, dims: VOLUME, prefixable: true },
    Symbol { names: &["t", "tonne", "tonnes"], scale: 1.0e3, dims: MASS, prefixable: true },
    Symbol { names: &["ha", "hectare", "hectares"], scale: 1.0e4, dims: AREA, prefixable: false },
    Symbol { names: &["ft", "foot", "feet"], scale: 0.3048, dims: LENGTH, prefixable: false },
    Symbol { names: &["in", "inch", "inches"], scale: 0.0254, dims: LENGTH, prefixable: false },
    Symbol { names: &["mi", "mile", "miles"], scale: 1_609.344, dims: LENGTH, prefixable: false },
    // Dimensionless.
    Symbol { names: &["rad", "radian", "radians"], scale: 1.0, dims: NONE, prefixable: true },
    Symbol {
        names: &["deg", "degree", "degrees", "degree_north", "degrees_north", "degree_east", "degrees_east"],
        scale: PI / 180.0,
        dims: NONE,
        prefixable: false,
    },
    Symbol { names: &["%", "percent"], scale: 0.01, dims: NONE, prefixable: false },
    Symbol { names: &["ppm"], scale: 1.0e-6, dims: NONE, prefixable: false },
    Symbol { names: &["ppb"], scale: 1.0e-9, dims: NONE, prefixable: false },
];

const PREFIXES: &[(&str, f64)] = &[
    ("da", 1.0e1),
    ("p", 1.0e-12),
    ("n", 1.0e-9),
    ("u", 1.0e-6),
    ("µ", 1.0e-6),
    ("μ", 1.0e-6),
    ("m", 1.0e-3),
    ("c", 1.0e-2),
    ("d", 1.0e-1),
    ("h", 1.0e2),
    ("k", 1.0e3),
    ("M", 1.0e6),
    ("G", 1.0e9),
    ("T", 1.0e12),
];

/// Units whose zero is shifted relative to kelvin: (names, scale, offset).
const OFFSET_TEMPERATURES: &[(&[&str], f64, f64)] = &[
    (&["degC", "deg_C", "°C", "celsius", "degree_Celsius", "degrees_Celsius"], 1.0, 273.15),
    (
        &["degF", "deg_F", "°F", "fahrenheit", "degree_Fahrenheit", "degrees_Fahrenheit"],
        5.0 / 9.0,
        459.67 * 5.0 / 9.0,
    ),
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

// ── Unit ──────────────────────────────────────────────────────────────

/// A parsed unit: `si = value * scale + offset`, plus an optional epoch for
/// reference-time units (`"days since 2000-01-01"`).
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    text: String,
    scale: f64,
    offset: f64,
    dims: Dims,
    epoch: Option<NaiveDateTime>,
}

impl Unit {
    /// Parse a unit string.
    pub fn parse(text: &str) -> CouplingResult<Unit> {
        let trimmed = text.trim();
        let invalid = |reason: &str| CouplingError::units(text, text, reason);

        if let Some((unit_part, date_part)) = split_since(trimmed) {
            let mut unit = Unit::parse(unit_part)?;
            if unit.dims != TIME {
                return Err(invalid("only time units may carry a reference date"));
            }
            unit.epoch = Some(parse_epoch(date_part).ok_or_else(|| invalid("unreadable reference date"))?);
            unit.text = trimmed.to_string();
            return Ok(unit);
        }

        if matches!(trimmed, "" | "1" | "-" | "none" | "dimensionless") {
            return Ok(Unit::dimensionless(trimmed));
        }

        for (names, scale, offset) in OFFSET_TEMPERATURES {
            if names.contains(&trimmed) {
                return Ok(Unit {
                    text: trimmed.to_string(),
                    scale: *scale,
                    offset: *offset,
                    dims: TEMPERATURE,
                    epoch: None,
                });
            }
        }

        let mut scale = 1.0;
        let mut dims = NONE;
        for (term, inverted) in tokenize(trimmed) {
            let (factor, term_dims) = parse_term(&term).ok_or_else(|| invalid(&format!("unknown unit term '{}'", term)))?;
            if inverted {
                scale /= factor;
                for (d, t) in dims.iter_mut().zip(term_dims.iter()) {
                    *d -= t;
                }
            } else {
                scale *= factor;
                for (d, t) in dims.iter_mut().zip(term_dims.iter()) {
                    *d += t;
                }
            }
        }

        Ok(Unit {
            text: trimmed.to_string(),
            scale,
            offset: 0.0,
            dims,
            epoch: None,
        })
    }

    fn dimensionless(text: &str) -> Unit {
        Unit {
            text: text.to_string(),
            scale: 1.0,
            offset: 0.0,
            dims: NONE,
            epoch: None,
        }
    }

    /// The string this unit was parsed from.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Whether values in `self` can be expressed in `other`.
    pub fn is_compatible(&self, other: &Unit) -> bool {
        self.dims == other.dims
    }

    /// Whether this is a unit of time (duration or reference time).
    pub fn is_time(&self) -> bool {
        self.dims == TIME
    }

    /// Whether this unit is dimensionless.
    pub fn is_dimensionless(&self) -> bool {
        self.dims == NONE
    }

    /// Whether `self` and `other` describe exactly the same quantity.
    pub fn equals(&self, other: &Unit) -> bool {
        self.dims == other.dims
            && approx_eq(self.scale, other.scale)
            && approx_eq(self.offset, other.offset)
            && self.epoch == other.epoch
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-12 * a.abs().max(b.abs()).max(1.0)
}

/// Split `"<unit> since <date>"`.
fn split_since(text: &str) -> Option<(&str, &str)> {
    let lower = text.to_ascii_lowercase();
    let idx = lower.find(" since ")?;
    Some((&text[..idx], text[idx + " since ".len()..].trim()))
}

fn parse_epoch(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim_end_matches(" UTC").trim_end_matches('Z').trim();
    for fmt in DATE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt);
        }
    }
    chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Split a compound unit into `(term, inverted)` pairs. A `/` inverts the
/// single term that follows it.
fn tokenize(text: &str) -> Vec<(String, bool)> {
    let normalized = text.replace("**", "^");
    let mut compact = String::with_capacity(normalized.len());
    let chars: Vec<char> = normalized.chars().collect();
    for (i, c) in chars.iter().enumerate() {
        if c.is_whitespace() {
            let prev = compact.chars().last();
            let next = chars[i + 1..].iter().copied().find(|c| !c.is_whitespace());
            if matches!(prev, Some('^') | Some('/')) || matches!(next, Some('^') | Some('/')) {
                continue;
            }
        }
        compact.push(*c);
    }

    let mut terms = Vec::new();
    let mut current = String::new();
    let mut inverted = false;
    let flush = |current: &mut String, inverted: &mut bool, terms: &mut Vec<(String, bool)>| {
        if !current.is_empty() {
            terms.push((std::mem::take(current), *inverted));
        }
        *inverted = false;
    };

    let chars: Vec<char> = compact.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        match c {
            '/' => {
                flush(&mut current, &mut inverted, &mut terms);
                inverted = true;
            }
            '*' | '·' => flush(&mut current, &mut inverted, &mut terms),
            c if c.is_whitespace() => flush(&mut current, &mut inverted, &mut terms),
            '.' if i > 0
                && chars[i - 1].is_alphabetic()
                && chars.get(i + 1).is_some_and(|n| n.is_alphabetic()) =>
            {
                flush(&mut current, &mut inverted, &mut terms)
            }
            c => current.push(c),
        }
    }
    flush(&mut current, &mut inverted, &mut terms);
    terms
}

/// Parse a single `symbol[^]exponent` term into a scale and dimensions.
fn parse_term(term: &str) -> Option<(f64, Dims)> {
    if let Ok(number) = term.parse::<f64>() {
        return Some((number, NONE));
    }

    let (symbol, exponent) = split_exponent(term)?;
    let (scale, dims) = lookup_symbol(symbol)?;
    let mut scaled = dims;
    for d in scaled.iter_mut() {
        *d *= exponent;
    }
    Some((scale.powi(exponent), scaled))
}

fn split_exponent(term: &str) -> Option<(&str, i32)> {
    if let Some((symbol, exp)) = term.split_once('^') {
        return Some((symbol, exp.parse().ok()?));
    }
    let digits_start = term
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i);
    match digits_start {
        Some(0) | None => Some((term, 1)),
        Some(i) => {
            let (head, digits) = term.split_at(i);
            let exponent: i32 = digits.parse().ok()?;
            match head.strip_suffix('-') {
                Some(symbol) if !symbol.is_empty() => Some((symbol, -exponent)),
                _ => match head.strip_suffix('+') {
                    Some(symbol) if !symbol.is_empty() => Some((symbol, exponent)),
                    _ => Some((head, exponent)),
                },
            }
        }
    }
}

fn lookup_symbol(symbol: &str) -> Option<(f64, Dims)> {
    for entry in SYMBOLS {
        if entry.names.contains(&symbol) {
            return Some((entry.scale, entry.dims));
        }
    }
    for (names, scale, _) in OFFSET_TEMPERATURES {
        if names.contains(&symbol) {
            return Some((*scale, TEMPERATURE));
        }
    }
    for (prefix, factor) in PREFIXES {
        if let Some(base) = symbol.strip_prefix(prefix) {
            for entry in SYMBOLS.iter().filter(|e| e.prefixable) {
                if entry.names.contains(&base) {
                    return Some((factor * entry.scale, entry.dims));
                }
            }
        }
    }
    None
}

// ── Converter ─────────────────────────────────────────────────────────

/// A precomputed affine conversion `to = from * factor + shift`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Converter {
    factor: f64,
    shift: f64,
}

impl Converter {
    /// Build the conversion from `from` to `to`.
    ///
    /// Reference-time units shift by the difference of their epochs when
    /// both sides carry one; otherwise they convert as plain durations.
    pub fn new(from: &Unit, to: &Unit) -> CouplingResult<Converter> {
        if !from.is_compatible(to) {
            return Err(CouplingError::units(
                from.as_str(),
                to.as_str(),
                "units are not physically compatible",
            ));
        }
        let epoch_shift = match (from.epoch, to.epoch) {
            (Some(a), Some(b)) => (a - b).num_milliseconds() as f64 / 1_000.0,
            _ => 0.0,
        };
        Ok(Converter {
            factor: from.scale / to.scale,
            shift: (from.offset - to.offset + epoch_shift) / to.scale,
        })
    }

    /// Conversion that leaves values unchanged.
    pub fn identity() -> Converter {
        Converter { factor: 1.0, shift: 0.0 }
    }

    /// Whether this conversion is a no-op.
    pub fn is_identity(&self) -> bool {
        self.factor == 1.0 && self.shift == 0.0
    }

    /// Convert one value.
    #[inline]
    pub fn apply(&self, value: f64) -> f64 {
        value * self.factor + self.shift
    }

    /// Convert a buffer in place.
    pub fn apply_in_place(&self, values: &mut [f64]) {
        if self.is_identity() {
            return;
        }
        for v in values.iter_mut() {
            *v = self.apply(*v);
        }
    }
}

// ── Free functions ────────────────────────────────────────────────────

/// Whether two unit strings describe the same physical dimension.
pub fn are_compatible(a: &str, b: &str) -> CouplingResult<bool> {
    Ok(Unit::parse(a)?.is_compatible(&Unit::parse(b)?))
}

/// Build a converter between two unit strings.
pub fn converter(from: &str, to: &str) -> CouplingResult<Converter> {
    Converter::new(&Unit::parse(from)?, &Unit::parse(to)?)
}

/// Convert `values` in place from `from` to `to`.
pub fn convert_in_place(values: &mut [f64], from: &str, to: &str) -> CouplingResult<()> {
    converter(from, to)?.apply_in_place(values);
    Ok(())
}

/// Convert a single value from `from` to `to`.
pub fn convert_scalar(value: f64, from: &str, to: &str) -> CouplingResult<f64> {
    Ok(converter(from, to)?.apply(value))
}

/// Convert a simulated time value between two time units.
///
/// Both sides must be time units (durations or reference times).
pub fn convert_time(value: f64, from: &str, to: &str) -> CouplingResult<f64> {
    let from_unit = Unit::parse(from)?;
    let to_unit = Unit::parse(to)?;
    if !from_unit.is_time() || !to_unit.is_time() {
        return Err(CouplingError::units(from, to, "not a unit of time"));
    }
    Ok(Converter::new(&from_unit, &to_unit)?.apply(value))
}

/// Convert a span of time (a step length, an interval) between time units.
///
/// Reference dates play no part in a span.
pub fn convert_duration(value: f64, from: &str, to: &str) -> CouplingResult<f64> {
    let from_unit = Unit::parse(from)?;
    let to_unit = Unit::parse(to)?;
    if !from_unit.is_time() || !to_unit.is_time() {
        return Err(CouplingError::units(from, to, "not a unit of time"));
    }
    Ok(value * from_unit.scale / to_unit.scale)
}
