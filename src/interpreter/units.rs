//! Quantity literals with physical units
//!
//! A literal is a numeric expression followed by an optional unit
//! expression:
//!
//! ```text
//! 60 celsius
//! 9.8 cm2/g
//! 10**(-0.30) mol/(m2*s)
//! 1e-12 mol
//! ```
//!
//! The numeric part is evaluated as plain arithmetic (`+ - * / **` and
//! parentheses). The unit part is a product/quotient of unit symbols, each
//! with an optional integer power written as a suffix (`m2`), with `^` or
//! with `**`. The value is converted to the SI base unit of its
//! [`QuantityClass`]:
//!
//! | Class          | SI unit        |
//! |----------------|----------------|
//! | Temperature    | K              |
//! | Pressure       | Pa             |
//! | Amount         | mol            |
//! | Mass           | kg             |
//! | Time           | s              |
//! | Rate           | mol/(m²·s)     |
//! | MolarEnergy    | J/mol          |
//! | Length         | m              |
//! | Area           | m²             |
//! | SpecificArea   | m²/kg          |
//!
//! A literal without a unit is taken to be already in the SI unit of its class.

use crate::error::UnitError;
use std::ops::{Div, Mul};

// =================================================================================================
// Dimensions
// =================================================================================================

/// Exponents of the base dimensions (kg, m, s, mol, K).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dimension {
    pub mass: i32,
    pub length: i32,
    pub time: i32,
    pub amount: i32,
    pub temperature: i32,
}

impl Dimension {
    pub const NONE: Dimension = Dimension::new(0, 0, 0, 0, 0);

    pub const fn new(mass: i32, length: i32, time: i32, amount: i32, temperature: i32) -> Self {
        Self { mass, length, time, amount, temperature }
    }

    fn powi(self, n: i32) -> Self {
        Self::new(
            self.mass * n,
            self.length * n,
            self.time * n,
            self.amount * n,
            self.temperature * n,
        )
    }
}

impl Mul for Dimension {
    type Output = Dimension;

    fn mul(self, rhs: Self) -> Self::Output {
        Dimension::new(
            self.mass + rhs.mass,
            self.length + rhs.length,
            self.time + rhs.time,
            self.amount + rhs.amount,
            self.temperature + rhs.temperature,
        )
    }
}

impl Div for Dimension {
    type Output = Dimension;

    fn div(self, rhs: Self) -> Self::Output {
        self * rhs.powi(-1)
    }
}

const MASS: Dimension = Dimension::new(1, 0, 0, 0, 0);
const LENGTH: Dimension = Dimension::new(0, 1, 0, 0, 0);
const TIME: Dimension = Dimension::new(0, 0, 1, 0, 0);
const AMOUNT: Dimension = Dimension::new(0, 0, 0, 1, 0);
const TEMPERATURE: Dimension = Dimension::new(0, 0, 0, 0, 1);
const ENERGY: Dimension = Dimension::new(1, 2, -2, 0, 0);
const PRESSURE: Dimension = Dimension::new(1, -1, -2, 0, 0);

// =================================================================================================
// Quantity classes
// =================================================================================================

/// The kind of physical quantity a document field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityClass {
    Temperature,
    Pressure,
    Amount,
    Mass,
    Time,
    Rate,
    MolarEnergy,
    Length,
    Area,
    SpecificArea,
    Dimensionless,
}

impl QuantityClass {
    /// Dimension of the SI unit of this class.
    pub fn dimension(&self) -> Dimension {
        match self {
            QuantityClass::Temperature => TEMPERATURE,
            QuantityClass::Pressure => PRESSURE,
            QuantityClass::Amount => AMOUNT,
            QuantityClass::Mass => MASS,
            QuantityClass::Time => TIME,
            QuantityClass::Rate => AMOUNT / LENGTH.powi(2) / TIME,
            QuantityClass::MolarEnergy => ENERGY / AMOUNT,
            QuantityClass::Length => LENGTH,
            QuantityClass::Area => LENGTH.powi(2),
            QuantityClass::SpecificArea => LENGTH.powi(2) / MASS,
            QuantityClass::Dimensionless => Dimension::NONE,
        }
    }

    /// Human-readable name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            QuantityClass::Temperature => "temperature",
            QuantityClass::Pressure => "pressure",
            QuantityClass::Amount => "amount",
            QuantityClass::Mass => "mass",
            QuantityClass::Time => "time",
            QuantityClass::Rate => "rate",
            QuantityClass::MolarEnergy => "molar energy",
            QuantityClass::Length => "length",
            QuantityClass::Area => "area",
            QuantityClass::SpecificArea => "specific surface area",
            QuantityClass::Dimensionless => "dimensionless",
        }
    }
}

// =================================================================================================
// Unit table
// =================================================================================================

struct UnitAtom {
    symbols: &'static [&'static str],
    factor: f64,
    offset: f64,
    dimension: Dimension,
}

const SECONDS_PER_DAY: f64 = 86_400.0;
const SECONDS_PER_YEAR: f64 = 365.25 * SECONDS_PER_DAY;

const UNIT_TABLE: &[UnitAtom] = &[
    // length
    UnitAtom { symbols: &["m"], factor: 1.0, offset: 0.0, dimension: LENGTH },
    UnitAtom { symbols: &["km"], factor: 1e3, offset: 0.0, dimension: LENGTH },
    UnitAtom { symbols: &["cm"], factor: 1e-2, offset: 0.0, dimension: LENGTH },
    UnitAtom { symbols: &["mm"], factor: 1e-3, offset: 0.0, dimension: LENGTH },
    UnitAtom { symbols: &["um"], factor: 1e-6, offset: 0.0, dimension: LENGTH },
    // mass
    UnitAtom { symbols: &["kg"], factor: 1.0, offset: 0.0, dimension: MASS },
    UnitAtom { symbols: &["g"], factor: 1e-3, offset: 0.0, dimension: MASS },
    UnitAtom { symbols: &["mg"], factor: 1e-6, offset: 0.0, dimension: MASS },
    UnitAtom { symbols: &["ug"], factor: 1e-9, offset: 0.0, dimension: MASS },
    UnitAtom { symbols: &["t", "tonne"], factor: 1e3, offset: 0.0, dimension: MASS },
    // time
    UnitAtom { symbols: &["s", "second", "seconds"], factor: 1.0, offset: 0.0, dimension: TIME },
    UnitAtom { symbols: &["ms"], factor: 1e-3, offset: 0.0, dimension: TIME },
    UnitAtom { symbols: &["min", "minute", "minutes"], factor: 60.0, offset: 0.0, dimension: TIME },
    UnitAtom { symbols: &["h", "hour", "hours"], factor: 3600.0, offset: 0.0, dimension: TIME },
    UnitAtom { symbols: &["day", "days"], factor: SECONDS_PER_DAY, offset: 0.0, dimension: TIME },
    UnitAtom { symbols: &["week", "weeks"], factor: 7.0 * SECONDS_PER_DAY, offset: 0.0, dimension: TIME },
    UnitAtom { symbols: &["month", "months"], factor: SECONDS_PER_YEAR / 12.0, offset: 0.0, dimension: TIME },
    UnitAtom { symbols: &["year", "years", "yr"], factor: SECONDS_PER_YEAR, offset: 0.0, dimension: TIME },
    // amount
    UnitAtom { symbols: &["mol"], factor: 1.0, offset: 0.0, dimension: AMOUNT },
    UnitAtom { symbols: &["kmol"], factor: 1e3, offset: 0.0, dimension: AMOUNT },
    UnitAtom { symbols: &["mmol"], factor: 1e-3, offset: 0.0, dimension: AMOUNT },
    UnitAtom { symbols: &["umol"], factor: 1e-6, offset: 0.0, dimension: AMOUNT },
    // temperature
    UnitAtom { symbols: &["K", "kelvin"], factor: 1.0, offset: 0.0, dimension: TEMPERATURE },
    UnitAtom { symbols: &["celsius", "degC"], factor: 1.0, offset: 273.15, dimension: TEMPERATURE },
    UnitAtom {
        symbols: &["fahrenheit", "degF"],
        factor: 5.0 / 9.0,
        offset: 459.67 * 5.0 / 9.0,
        dimension: TEMPERATURE,
    },
    // energy
    UnitAtom { symbols: &["J"], factor: 1.0, offset: 0.0, dimension: ENERGY },
    UnitAtom { symbols: &["kJ"], factor: 1e3, offset: 0.0, dimension: ENERGY },
    UnitAtom { symbols: &["cal"], factor: 4.184, offset: 0.0, dimension: ENERGY },
    UnitAtom { symbols: &["kcal"], factor: 4184.0, offset: 0.0, dimension: ENERGY },
    // pressure
    UnitAtom { symbols: &["Pa"], factor: 1.0, offset: 0.0, dimension: PRESSURE },
    UnitAtom { symbols: &["kPa"], factor: 1e3, offset: 0.0, dimension: PRESSURE },
    UnitAtom { symbols: &["MPa"], factor: 1e6, offset: 0.0, dimension: PRESSURE },
    UnitAtom { symbols: &["GPa"], factor: 1e9, offset: 0.0, dimension: PRESSURE },
    UnitAtom { symbols: &["bar"], factor: 1e5, offset: 0.0, dimension: PRESSURE },
    UnitAtom { symbols: &["atm"], factor: 101_325.0, offset: 0.0, dimension: PRESSURE },
    UnitAtom { symbols: &["psi"], factor: 6_894.757_293_168, offset: 0.0, dimension: PRESSURE },
];

fn lookup_atom(symbol: &str) -> Option<&'static UnitAtom> {
    UNIT_TABLE.iter().find(|atom| atom.symbols.contains(&symbol))
}

// =================================================================================================
// Unit expressions
// =================================================================================================

/// A parsed unit expression: `si = value * factor + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unit {
    pub factor: f64,
    pub offset: f64,
    pub dimension: Dimension,
}

impl Unit {
    /// The identity unit (dimensionless, factor 1).
    pub const ONE: Unit = Unit { factor: 1.0, offset: 0.0, dimension: Dimension::NONE };

    /// Parse a unit expression such as `mol/(m2*s)` or `kJ/mol`.
    ///
    /// An empty expression yields [`Unit::ONE`].
    pub fn parse(expression: &str) -> Result<Unit, UnitError> {
        let trimmed = expression.trim();
        if trimmed.is_empty() {
            return Ok(Unit::ONE);
        }

        let mut parser = UnitParser { chars: trimmed.chars().collect(), pos: 0, source: trimmed };
        let (unit, atoms) = parser.product()?;
        parser.skip_spaces();
        if parser.pos != parser.chars.len() {
            return Err(UnitError::MalformedUnit { expression: trimmed.to_string() });
        }

        // Offsets (celsius, fahrenheit) are only meaningful on their own.
        if unit.offset != 0.0 && atoms > 1 {
            return Err(UnitError::MalformedUnit { expression: trimmed.to_string() });
        }

        Ok(unit)
    }

    /// Convert a value expressed in this unit to SI.
    pub fn to_si(&self, value: f64) -> f64 {
        value * self.factor + self.offset
    }

    /// Convert an SI value to this unit.
    pub fn from_si(&self, value: f64) -> f64 {
        (value - self.offset) / self.factor
    }
}

struct UnitParser<'a> {
    chars: Vec<char>,
    pos: usize,
    source: &'a str,
}

impl UnitParser<'_> {
    fn malformed(&self) -> UnitError {
        UnitError::MalformedUnit { expression: self.source.to_string() }
    }

    fn skip_spaces(&mut self) {
        while self.pos < self.chars.len() && self.chars[self.pos].is_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    /// product := factor (('*' | '/' | ' ') factor)*
    fn product(&mut self) -> Result<(Unit, usize), UnitError> {
        let (mut unit, mut atoms) = self.factor()?;

        loop {
            self.skip_spaces();
            match self.peek() {
                Some('*') if self.chars.get(self.pos + 1) != Some(&'*') => {
                    self.pos += 1;
                    let (rhs, n) = self.factor()?;
                    unit = combine(unit, rhs, 1);
                    atoms += n;
                }
                Some('/') => {
                    self.pos += 1;
                    let (rhs, n) = self.factor()?;
                    unit = combine(unit, rhs, -1);
                    atoms += n;
                }
                Some(c) if c.is_alphabetic() || c == '(' => {
                    // juxtaposition: "N m" == "N*m"
                    let (rhs, n) = self.factor()?;
                    unit = combine(unit, rhs, 1);
                    atoms += n;
                }
                _ => break,
            }
        }

        Ok((unit, atoms))
    }

    /// factor := (symbol | '(' product ')') power?
    fn factor(&mut self) -> Result<(Unit, usize), UnitError> {
        self.skip_spaces();
        let (base, atoms) = match self.peek() {
            Some('(') => {
                self.pos += 1;
                let inner = self.product()?;
                self.skip_spaces();
                if self.peek() != Some(')') {
                    return Err(self.malformed());
                }
                self.pos += 1;
                inner
            }
            Some(c) if c.is_alphabetic() => {
                let start = self.pos;
                while self.pos < self.chars.len() && self.chars[self.pos].is_alphabetic() {
                    self.pos += 1;
                }
                let symbol: String = self.chars[start..self.pos].iter().collect();
                let atom = lookup_atom(&symbol)
                    .ok_or_else(|| UnitError::UnknownUnit { unit: symbol.clone() })?;
                (
                    Unit { factor: atom.factor, offset: atom.offset, dimension: atom.dimension },
                    1,
                )
            }
            _ => return Err(self.malformed()),
        };

        let power = self.power()?;
        if power == 1 {
            return Ok((base, atoms));
        }
        if base.offset != 0.0 {
            return Err(self.malformed());
        }
        Ok((
            Unit {
                factor: base.factor.powi(power),
                offset: 0.0,
                dimension: base.dimension.powi(power),
            },
            atoms,
        ))
    }

    /// power := digits | '^' int | '**' int
    fn power(&mut self) -> Result<i32, UnitError> {
        let explicit = match (self.peek(), self.chars.get(self.pos + 1)) {
            (Some('^'), _) => {
                self.pos += 1;
                true
            }
            (Some('*'), Some('*')) => {
                self.pos += 2;
                true
            }
            _ => false,
        };

        let start = self.pos;
        if explicit && matches!(self.peek(), Some('-') | Some('+')) {
            self.pos += 1;
        }
        while self.pos < self.chars.len() && self.chars[self.pos].is_ascii_digit() {
            self.pos += 1;
        }

        if self.pos == start {
            return if explicit { Err(self.malformed()) } else { Ok(1) };
        }

        let digits: String = self.chars[start..self.pos].iter().collect();
        digits.parse::<i32>().map_err(|_| self.malformed())
    }
}

fn combine(lhs: Unit, rhs: Unit, sign: i32) -> Unit {
    let factor = if sign > 0 { lhs.factor * rhs.factor } else { lhs.factor / rhs.factor };
    let dimension = if sign > 0 { lhs.dimension * rhs.dimension } else { lhs.dimension / rhs.dimension };
    Unit { factor, offset: lhs.offset + rhs.offset, dimension }
}

// =================================================================================================
// Numeric expressions
// =================================================================================================

struct NumberParser<'a> {
    chars: Vec<char>,
    pos: usize,
    source: &'a str,
}

impl NumberParser<'_> {
    fn error(&self, reason: &str) -> UnitError {
        UnitError::MalformedNumber { literal: self.source.to_string(), reason: reason.to_string() }
    }

    fn skip_spaces(&mut self) {
        while self.pos < self.chars.len() && self.chars[self.pos].is_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_after_spaces(&self, offset: usize) -> Option<char> {
        self.chars[self.pos + offset..].iter().copied().find(|c| !c.is_whitespace())
    }

    fn starts_operand(c: Option<char>) -> bool {
        matches!(c, Some(c) if c.is_ascii_digit() || c == '.' || c == '(' || c == '-' || c == '+')
    }

    /// expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<f64, UnitError> {
        let mut value = self.term()?;
        loop {
            self.skip_spaces();
            match self.peek() {
                Some('+') if Self::starts_operand(self.peek_after_spaces(1)) => {
                    self.pos += 1;
                    value += self.term()?;
                }
                Some('-') if Self::starts_operand(self.peek_after_spaces(1)) => {
                    self.pos += 1;
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    /// term := power (('*' | '/') power)*
    fn term(&mut self) -> Result<f64, UnitError> {
        let mut value = self.power()?;
        loop {
            self.skip_spaces();
            let next = self.chars.get(self.pos + 1).copied();
            match self.peek() {
                Some('*') if next != Some('*') && Self::starts_operand(self.peek_after_spaces(1)) => {
                    self.pos += 1;
                    value *= self.power()?;
                }
                Some('/') if Self::starts_operand(self.peek_after_spaces(1)) => {
                    self.pos += 1;
                    value /= self.power()?;
                }
                _ => return Ok(value),
            }
        }
    }

    /// power := unary ('**' power)?
    fn power(&mut self) -> Result<f64, UnitError> {
        let base = self.unary()?;
        self.skip_spaces();
        if self.peek() == Some('*') && self.chars.get(self.pos + 1) == Some(&'*') {
            self.pos += 2;
            let exponent = self.power()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    /// unary := ('-' | '+') unary | primary
    fn unary(&mut self) -> Result<f64, UnitError> {
        self.skip_spaces();
        match self.peek() {
            Some('-') => {
                self.pos += 1;
                Ok(-self.unary()?)
            }
            Some('+') => {
                self.pos += 1;
                self.unary()
            }
            _ => self.primary(),
        }
    }

    /// primary := number | '(' expr ')'
    fn primary(&mut self) -> Result<f64, UnitError> {
        self.skip_spaces();
        if self.peek() == Some('(') {
            self.pos += 1;
            let value = self.expr()?;
            self.skip_spaces();
            if self.peek() != Some(')') {
                return Err(self.error("unbalanced parenthesis"));
            }
            self.pos += 1;
            return Ok(value);
        }

        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '.') {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("expected a number"));
        }

        // scientific notation, only when digits follow the exponent marker
        if matches!(self.peek(), Some('e') | Some('E')) {
            let mut look = self.pos + 1;
            if matches!(self.chars.get(look), Some('-') | Some('+')) {
                look += 1;
            }
            if matches!(self.chars.get(look), Some(c) if c.is_ascii_digit()) {
                self.pos = look;
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
        }

        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<f64>().map_err(|_| self.error("invalid number"))
    }
}

/// Split a literal into its evaluated numeric part and its unit text.
///
/// ```rust
/// use kinpath::interpreter::units::split_literal;
///
/// let (value, unit) = split_literal("10**(-0.30) mol/(m2*s)").unwrap();
/// assert!((value - 10f64.powf(-0.30)).abs() < 1e-12);
/// assert_eq!(unit, "mol/(m2*s)");
/// ```
pub fn split_literal(literal: &str) -> Result<(f64, &str), UnitError> {
    let trimmed = literal.trim();
    let mut parser = NumberParser { chars: trimmed.chars().collect(), pos: 0, source: trimmed };
    let value = parser.expr()?;

    if !value.is_finite() {
        return Err(parser.error("value is not finite"));
    }

    let byte_offset: usize = parser.chars[..parser.pos].iter().map(|c| c.len_utf8()).sum();
    Ok((value, trimmed[byte_offset..].trim()))
}

/// Evaluate a unitless numeric literal (`1.0`, `-1`, `10**(-2)`, `1/2`).
pub fn parse_number(literal: &str) -> Result<f64, UnitError> {
    let (value, rest) = split_literal(literal)?;
    if !rest.is_empty() {
        return Err(UnitError::MalformedNumber {
            literal: literal.trim().to_string(),
            reason: format!("unexpected trailing '{}'", rest),
        });
    }
    Ok(value)
}

/// Parse a literal and convert it to the SI unit of `class`.
///
/// ```rust
/// use kinpath::interpreter::units::{parse_quantity, QuantityClass};
///
/// let t = parse_quantity("60 celsius", QuantityClass::Temperature).unwrap();
/// assert!((t - 333.15).abs() < 1e-9);
///
/// let p = parse_quantity("150 bar", QuantityClass::Pressure).unwrap();
/// assert!((p - 1.5e7).abs() < 1e-6);
/// ```
pub fn parse_quantity(literal: &str, class: QuantityClass) -> Result<f64, UnitError> {
    let (value, unit_text) = split_literal(literal)?;
    let unit = Unit::parse(unit_text)?;

    if unit_text.is_empty() {
        return Ok(value);
    }
    if unit.dimension != class.dimension() {
        return Err(UnitError::IncompatibleUnit { unit: unit_text.to_string(), expected: class.name() });
    }
    Ok(unit.to_si(value))
}

/// Parse a literal whose class is one of several candidates (e.g. an amount
/// given either in moles or in kilograms). Returns the SI value and the class
/// that matched.
pub fn parse_quantity_as(
    literal: &str,
    candidates: &[QuantityClass],
) -> Result<(f64, QuantityClass), UnitError> {
    let (value, unit_text) = split_literal(literal)?;
    let unit = Unit::parse(unit_text)?;

    let Some(first) = candidates.first() else {
        return Err(UnitError::MalformedUnit { expression: unit_text.to_string() });
    };
    if unit_text.is_empty() {
        return Ok((value, *first));
    }

    candidates
        .iter()
        .find(|class| class.dimension() == unit.dimension)
        .map(|class| (unit.to_si(value), *class))
        .ok_or_else(|| UnitError::IncompatibleUnit { unit: unit_text.to_string(), expected: first.name() })
}

/// Convert an SI value of `class` to `unit`.
pub fn convert_from_si(value: f64, unit: &str, class: QuantityClass) -> Result<f64, UnitError> {
    let parsed = Unit::parse(unit)?;
    if !unit.trim().is_empty() && parsed.dimension != class.dimension() {
        return Err(UnitError::IncompatibleUnit { unit: unit.to_string(), expected: class.name() });
    }
    Ok(parsed.from_si(value))
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-12 * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn test_demo_literals() {
        assert!(close(parse_quantity("60 celsius", QuantityClass::Temperature).unwrap(), 333.15));
        assert!(close(parse_quantity("150 bar", QuantityClass::Pressure).unwrap(), 1.5e7));
        assert!(close(parse_quantity("9.8 cm2/g", QuantityClass::SpecificArea).unwrap(), 0.98));
        assert!(close(parse_quantity("14.4 kJ/mol", QuantityClass::MolarEnergy).unwrap(), 14_400.0));
        assert!(close(
            parse_quantity("10**(-0.30) mol/(m2*s)", QuantityClass::Rate).unwrap(),
            10f64.powf(-0.30)
        ));
        assert!(close(parse_quantity("1e-12 mol", QuantityClass::Amount).unwrap(), 1e-12));
        assert!(close(parse_quantity("1 month", QuantityClass::Time).unwrap(), 2_629_800.0));
    }

    #[test]
    fn test_unitless_value_is_si() {
        assert_eq!(parse_quantity("0", QuantityClass::Time).unwrap(), 0.0);
        assert_eq!(parse_quantity("298.15", QuantityClass::Temperature).unwrap(), 298.15);
    }

    #[test]
    fn test_number_expressions() {
        assert!(close(parse_number("10**(-5.81)").unwrap(), 10f64.powf(-5.81)));
        assert!(close(parse_number("-1").unwrap(), -1.0));
        assert!(close(parse_number("1/2").unwrap(), 0.5));
        assert!(close(parse_number("2**3**2").unwrap(), 512.0));
        assert!(close(parse_number("(1 + 2) * 3").unwrap(), 9.0));
        assert!(parse_number("1 mol").is_err());
        assert!(parse_number("abc").is_err());
        assert!(parse_number("(1 + 2").is_err());
    }

    #[test]
    fn test_unit_powers() {
        let caret = Unit::parse("m^2").unwrap();
        let suffix = Unit::parse("m2").unwrap();
        let starstar = Unit::parse("m**2").unwrap();
        assert_eq!(caret, suffix);
        assert_eq!(suffix, starstar);
        assert_eq!(Unit::parse("s^-1").unwrap().dimension, Dimension::new(0, 0, -1, 0, 0));
    }

    #[test]
    fn test_unknown_unit() {
        let error = parse_quantity("3 furlongs", QuantityClass::Length).unwrap_err();
        assert_eq!(error, UnitError::UnknownUnit { unit: "furlongs".to_string() });
    }

    #[test]
    fn test_incompatible_unit() {
        let error = parse_quantity("3 mol", QuantityClass::Temperature).unwrap_err();
        assert!(matches!(error, UnitError::IncompatibleUnit { expected: "temperature", .. }));
    }

    #[test]
    fn test_malformed_units() {
        assert!(Unit::parse("mol/(m2*s").is_err());
        assert!(Unit::parse("mol/").is_err());
        assert!(Unit::parse("celsius/s").is_err());
        assert!(Unit::parse("celsius2").is_err());
    }

    #[test]
    fn test_amount_or_mass() {
        let (value, class) =
            parse_quantity_as("1 kg", &[QuantityClass::Amount, QuantityClass::Mass]).unwrap();
        assert_eq!(class, QuantityClass::Mass);
        assert_eq!(value, 1.0);

        let (value, class) =
            parse_quantity_as("10 mmol", &[QuantityClass::Amount, QuantityClass::Mass]).unwrap();
        assert_eq!(class, QuantityClass::Amount);
        assert!(close(value, 0.01));
    }

    #[test]
    fn test_round_trip_every_class() {
        let cases: &[(QuantityClass, &[&str])] = &[
            (QuantityClass::Temperature, &["K", "celsius", "fahrenheit"]),
            (QuantityClass::Pressure, &["Pa", "kPa", "MPa", "bar", "atm", "psi"]),
            (QuantityClass::Amount, &["mol", "mmol", "umol", "kmol"]),
            (QuantityClass::Mass, &["kg", "g", "mg"]),
            (QuantityClass::Time, &["s", "min", "hour", "day", "week", "month", "year"]),
            (QuantityClass::Rate, &["mol/(m2*s)", "mmol/(cm2*s)", "mol/(m^2*day)"]),
            (QuantityClass::MolarEnergy, &["J/mol", "kJ/mol", "kcal/mol"]),
            (QuantityClass::Length, &["m", "cm", "mm", "km"]),
            (QuantityClass::Area, &["m2", "cm2"]),
            (QuantityClass::SpecificArea, &["m2/g", "cm2/g", "m2/kg"]),
        ];

        for (class, units) in cases {
            for unit in *units {
                for x in [0.25, 3.0, 1234.5] {
                    let si = parse_quantity(&format!("{} {}", x, unit), *class).unwrap();
                    let back = convert_from_si(si, unit, *class).unwrap();
                    assert!(
                        (back - x).abs() <= 1e-9 * x.abs().max(1.0),
                        "{} {} round-tripped to {}",
                        x,
                        unit,
                        back
                    );
                }
            }
        }
    }
}
