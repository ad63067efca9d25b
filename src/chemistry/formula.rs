//! Chemical formulas
//!
//! Parses formulas such as `CaMg(CO3)2`, `HCO3-`, `Ca+2` or `CO2(aq)` into
//! element counts and an electrical charge.
//!
//! # Grammar
//!
//! ```text
//! formula := body charge? phase?
//! body    := group+
//! group   := (Element | '(' body ')') count?
//! charge  := ('+' | '-')+ | ('+' | '-') digits
//! phase   := '(aq)' | '(l)' | '(g)' | '(s)' | '(cr)'
//! ```
//!
//! The phase tag is accepted anywhere after the body (`CO2(aq)`, `H2O(l)`) and
//! carries no composition.

use crate::error::FormulaError;
use std::collections::BTreeMap;
use std::fmt;

/// Standard atomic masses (g/mol) of the supported elements.
const ATOMIC_MASSES: &[(&str, f64)] = &[
    ("H", 1.00794),
    ("He", 4.002602),
    ("Li", 6.941),
    ("B", 10.811),
    ("C", 12.0107),
    ("N", 14.0067),
    ("O", 15.9994),
    ("F", 18.998403),
    ("Na", 22.98977),
    ("Mg", 24.305),
    ("Al", 26.9815),
    ("Si", 28.0855),
    ("P", 30.973762),
    ("S", 32.065),
    ("Cl", 35.453),
    ("Ar", 39.948),
    ("K", 39.0983),
    ("Ca", 40.078),
    ("Mn", 54.938045),
    ("Fe", 55.845),
    ("Cu", 63.546),
    ("Zn", 65.38),
    ("Br", 79.904),
    ("Sr", 87.62),
    ("Ba", 137.327),
    ("U", 238.02891),
];

const PHASE_TAGS: &[&str] = &["(aq)", "(l)", "(g)", "(s)", "(cr)"];

/// Look up the atomic mass of an element in g/mol.
pub fn atomic_mass(symbol: &str) -> Option<f64> {
    ATOMIC_MASSES.iter().find(|(s, _)| *s == symbol).map(|(_, m)| *m)
}

fn canonical_symbol(symbol: &str) -> Option<&'static str> {
    ATOMIC_MASSES.iter().find(|(s, _)| *s == symbol).map(|(s, _)| *s)
}

/// Elemental composition plus charge of a chemical formula.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    elements: BTreeMap<&'static str, f64>,
    charge: f64,
}

impl Formula {
    /// Parse a formula string.
    ///
    /// # Example
    ///
    /// ```rust
    /// use kinpath::chemistry::Formula;
    ///
    /// let dolomite = Formula::parse("CaMg(CO3)2").unwrap();
    /// assert_eq!(dolomite.count("O"), 6.0);
    /// assert_eq!(dolomite.charge(), 0.0);
    ///
    /// let carbonate = Formula::parse("CO3-2").unwrap();
    /// assert_eq!(carbonate.charge(), -2.0);
    /// ```
    pub fn parse(text: &str) -> Result<Formula, FormulaError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(FormulaError::Malformed {
                formula: text.to_string(),
                reason: "empty formula".to_string(),
            });
        }

        let without_phase = strip_phase_tag(trimmed);
        let (body, charge) = split_charge(without_phase, trimmed)?;
        let without_phase = strip_phase_tag(body);

        let chars: Vec<char> = without_phase.chars().collect();
        let mut parser = FormulaParser { chars: &chars, pos: 0, source: trimmed };
        let elements = parser.body(0)?;
        if parser.pos != chars.len() {
            return Err(parser.malformed("unexpected character"));
        }
        if elements.is_empty() {
            return Err(parser.malformed("no elements"));
        }

        Ok(Formula { elements, charge })
    }

    /// Create a formula from explicit element counts.
    pub fn from_elements(elements: BTreeMap<&'static str, f64>, charge: f64) -> Self {
        Self { elements, charge }
    }

    /// Element counts, ordered by symbol.
    pub fn elements(&self) -> &BTreeMap<&'static str, f64> {
        &self.elements
    }

    /// Number of atoms of `symbol` (0 when absent).
    pub fn count(&self, symbol: &str) -> f64 {
        self.elements.get(symbol).copied().unwrap_or(0.0)
    }

    /// Electrical charge.
    pub fn charge(&self) -> f64 {
        self.charge
    }

    /// Molar mass in kg/mol.
    pub fn molar_mass(&self) -> f64 {
        self.elements
            .iter()
            .map(|(symbol, count)| atomic_mass(symbol).unwrap_or(0.0) * count)
            .sum::<f64>()
            * 1e-3
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (symbol, count) in &self.elements {
            if (*count - 1.0).abs() < f64::EPSILON {
                write!(f, "{}", symbol)?;
            } else {
                write!(f, "{}{}", symbol, count)?;
            }
        }
        if self.charge != 0.0 {
            write!(f, "{:+}", self.charge)?;
        }
        Ok(())
    }
}

fn strip_phase_tag(text: &str) -> &str {
    PHASE_TAGS
        .iter()
        .find_map(|tag| text.strip_suffix(tag))
        .unwrap_or(text)
}

/// Split `HCO3-` into (`HCO3`, -1), `Ca+2` into (`Ca`, 2), `Fe+++` into (`Fe`, 3).
fn split_charge<'a>(text: &'a str, source: &str) -> Result<(&'a str, f64), FormulaError> {
    let Some(start) = text.find(['+', '-']) else {
        return Ok((text, 0.0));
    };

    let (body, suffix) = text.split_at(start);
    let sign = if suffix.starts_with('+') { 1.0 } else { -1.0 };
    let sign_char = if sign > 0.0 { '+' } else { '-' };

    let repeated = suffix.chars().take_while(|c| *c == sign_char).count();
    let rest = &suffix[repeated..];

    // Charge may be followed by a phase tag: "CO3-2(aq)".
    let rest_without_phase = strip_phase_tag(rest);
    let magnitude = if rest_without_phase.is_empty() {
        repeated as f64
    } else if repeated == 1 && rest_without_phase.chars().all(|c| c.is_ascii_digit()) {
        rest_without_phase.parse::<f64>().map_err(|_| FormulaError::Malformed {
            formula: source.to_string(),
            reason: "invalid charge".to_string(),
        })?
    } else {
        return Err(FormulaError::Malformed {
            formula: source.to_string(),
            reason: "invalid charge".to_string(),
        });
    };

    Ok((body, sign * magnitude))
}

struct FormulaParser<'a> {
    chars: &'a [char],
    pos: usize,
    source: &'a str,
}

impl FormulaParser<'_> {
    fn malformed(&self, reason: &str) -> FormulaError {
        FormulaError::Malformed { formula: self.source.to_string(), reason: reason.to_string() }
    }

    fn body(&mut self, depth: usize) -> Result<BTreeMap<&'static str, f64>, FormulaError> {
        let mut elements = BTreeMap::new();

        while let Some(&c) = self.chars.get(self.pos) {
            let group = if c == '(' {
                self.pos += 1;
                let inner = self.body(depth + 1)?;
                if self.chars.get(self.pos) != Some(&')') {
                    return Err(self.malformed("unbalanced parenthesis"));
                }
                self.pos += 1;
                inner
            } else if c == ')' {
                if depth == 0 {
                    return Err(self.malformed("unbalanced parenthesis"));
                }
                break;
            } else if c.is_ascii_uppercase() {
                let start = self.pos;
                self.pos += 1;
                while matches!(self.chars.get(self.pos), Some(c) if c.is_ascii_lowercase()) {
                    self.pos += 1;
                }
                let symbol: String = self.chars[start..self.pos].iter().collect();
                let canonical = canonical_symbol(&symbol).ok_or_else(|| FormulaError::UnknownElement {
                    formula: self.source.to_string(),
                    element: symbol.clone(),
                })?;
                BTreeMap::from([(canonical, 1.0)])
            } else {
                return Err(self.malformed("unexpected character"));
            };

            let multiplier = self.count()?;
            for (symbol, n) in group {
                *elements.entry(symbol).or_insert(0.0) += n * multiplier;
            }
        }

        Ok(elements)
    }

    fn count(&mut self) -> Result<f64, FormulaError> {
        let start = self.pos;
        while matches!(self.chars.get(self.pos), Some(c) if c.is_ascii_digit() || *c == '.') {
            self.pos += 1;
        }
        if start == self.pos {
            return Ok(1.0);
        }
        let digits: String = self.chars[start..self.pos].iter().collect();
        digits.parse::<f64>().map_err(|_| self.malformed("invalid count"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_formulas() {
        let water = Formula::parse("H2O").unwrap();
        assert_eq!(water.count("H"), 2.0);
        assert_eq!(water.count("O"), 1.0);
        assert_eq!(water.charge(), 0.0);

        let salt = Formula::parse("NaCl").unwrap();
        assert_eq!(salt.elements().len(), 2);
    }

    #[test]
    fn test_parentheses() {
        let dolomite = Formula::parse("CaMg(CO3)2").unwrap();
        assert_eq!(dolomite.count("Ca"), 1.0);
        assert_eq!(dolomite.count("Mg"), 1.0);
        assert_eq!(dolomite.count("C"), 2.0);
        assert_eq!(dolomite.count("O"), 6.0);
    }

    #[test]
    fn test_charges() {
        assert_eq!(Formula::parse("H+").unwrap().charge(), 1.0);
        assert_eq!(Formula::parse("OH-").unwrap().charge(), -1.0);
        assert_eq!(Formula::parse("Ca+2").unwrap().charge(), 2.0);
        assert_eq!(Formula::parse("CO3-2").unwrap().charge(), -2.0);
        assert_eq!(Formula::parse("CO3--").unwrap().charge(), -2.0);
        assert_eq!(Formula::parse("Fe+++").unwrap().charge(), 3.0);
    }

    #[test]
    fn test_phase_tags() {
        let aq = Formula::parse("CO2(aq)").unwrap();
        assert_eq!(aq.count("C"), 1.0);
        assert_eq!(aq.count("O"), 2.0);
        assert_eq!(Formula::parse("H2O(l)").unwrap(), Formula::parse("H2O").unwrap());
        assert_eq!(Formula::parse("H2O(g)").unwrap().count("H"), 2.0);
    }

    #[test]
    fn test_molar_mass() {
        let calcite = Formula::parse("CaCO3").unwrap();
        assert!((calcite.molar_mass() - 0.1000869).abs() < 1e-6);

        let water = Formula::parse("H2O").unwrap();
        assert!((water.molar_mass() - 0.01801528).abs() < 1e-7);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(Formula::parse(""), Err(FormulaError::Malformed { .. })));
        assert!(matches!(Formula::parse("Ca(CO3"), Err(FormulaError::Malformed { .. })));
        assert!(matches!(Formula::parse("CaCO3)"), Err(FormulaError::Malformed { .. })));
        assert!(matches!(Formula::parse("Xx2O"), Err(FormulaError::UnknownElement { .. })));
        assert!(matches!(Formula::parse("calcite"), Err(FormulaError::Malformed { .. })));
        assert!(matches!(Formula::parse("Ca+-"), Err(FormulaError::Malformed { .. })));
    }
}
