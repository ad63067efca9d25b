//! Plot expressions and sampling
//!
//! A plot is a pair of scalar expressions evaluated after every accepted
//! step. Expressions are resolved against the chemical system when the
//! document is built, so evaluation cannot fail.
//!
//! | Expression          | Value                                  |
//! |---------------------|----------------------------------------|
//! | `t`, `t:<unit>`     | elapsed time since `From`              |
//! | `T`, `T:<unit>`     | temperature                            |
//! | `P`, `P:<unit>`     | pressure                               |
//! | `n[<Species>]`      | amount (mol)                           |
//! | `molality[<Species>]` | molality of an aqueous species (mol/kg) |
//! | `activity[<Species>]` | activity                             |
//! | `pH`                | `−log10 a(H+)`                         |
//! | `ionicStrength`     | ionic strength (mol/kg)                |
//!
//! Without a unit, `t`, `T` and `P` are reported in s, K and Pa.

use crate::chemistry::{ChemicalSystem, PhaseKind, Speciation};
use crate::error::{BuildError, ReferenceKind};
use crate::interpreter::units::{QuantityClass, Unit};
use std::fmt;

// =================================================================================================
// Expressions
// =================================================================================================

/// Output unit of a time, temperature or pressure axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisUnit {
    symbol: String,
    unit: Unit,
}

impl AxisUnit {
    fn parse(symbol: &str, class: QuantityClass) -> Result<Self, crate::error::UnitError> {
        let unit = Unit::parse(symbol)?;
        if !symbol.is_empty() && unit.dimension != class.dimension() {
            return Err(crate::error::UnitError::IncompatibleUnit {
                unit: symbol.to_string(),
                expected: class.name(),
            });
        }
        Ok(Self { symbol: symbol.to_string(), unit })
    }

    /// Unit as written, empty for SI.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    fn convert(&self, si: f64) -> f64 {
        self.unit.from_si(si)
    }
}

/// A species resolved to its index in the system.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesRef {
    /// Species name.
    pub name: String,
    /// Global species index.
    pub index: usize,
}

/// A resolved plot axis.
#[derive(Debug, Clone, PartialEq)]
pub enum PlotExpression {
    Time(AxisUnit),
    Temperature(AxisUnit),
    Pressure(AxisUnit),
    Amount(SpeciesRef),
    Molality(SpeciesRef),
    Activity(SpeciesRef),
    /// Index of `H+`.
    Ph(usize),
    IonicStrength,
}

/// `head[inner]` → `(head, inner)`.
fn bracketed(text: &str) -> Option<(&str, &str)> {
    let open = text.find('[')?;
    let inner = text[open + 1..].strip_suffix(']')?;
    Some((text[..open].trim(), inner.trim()))
}

impl PlotExpression {
    /// Resolve `text` against `system`.
    ///
    /// # Errors
    ///
    /// - [`BuildError::Reference`] for a species the system does not contain
    /// - [`BuildError::UnknownExpression`] for an unknown quantity, or `pH`
    ///   in a system without `H+`
    /// - [`BuildError::Unit`] for an axis unit of the wrong kind
    ///
    /// ```rust
    /// use kinpath::chemistry::{builtin_database, ChemicalSystem, PhaseSpec};
    /// use kinpath::output::PlotExpression;
    ///
    /// let system = ChemicalSystem::new(builtin_database(), &[PhaseSpec::aqueous(&["H2O(l)", "H+", "OH-"])]).unwrap();
    /// assert!(PlotExpression::parse("pH", &system, 1).is_ok());
    /// assert!(PlotExpression::parse("n[Calcite]", &system, 1).is_err());
    /// ```
    pub fn parse(text: &str, system: &ChemicalSystem, line: usize) -> Result<Self, BuildError> {
        let text = text.trim();
        let unknown = || BuildError::UnknownExpression { expression: text.to_string(), line };

        match text {
            "pH" => return system.species_index("H+").map(PlotExpression::Ph).ok_or_else(unknown),
            "ionicStrength" | "I" => return Ok(PlotExpression::IonicStrength),
            _ => {}
        }

        if let Some((head, name)) = bracketed(text) {
            let index = system
                .species_index(name)
                .ok_or_else(|| BuildError::reference(ReferenceKind::Species, name, line))?;
            let species = SpeciesRef { name: name.to_string(), index };

            return match head {
                "n" => Ok(PlotExpression::Amount(species)),
                "activity" | "a" => Ok(PlotExpression::Activity(species)),
                "molality" | "m" => {
                    if system.phase_of(index).kind() != PhaseKind::Aqueous {
                        return Err(unknown());
                    }
                    Ok(PlotExpression::Molality(species))
                }
                _ => Err(unknown()),
            };
        }

        let (head, symbol) = match text.split_once(':') {
            Some((head, symbol)) => (head.trim(), symbol.trim()),
            None => (text, ""),
        };
        let class = match head {
            "t" => QuantityClass::Time,
            "T" => QuantityClass::Temperature,
            "P" => QuantityClass::Pressure,
            _ => return Err(unknown()),
        };
        let axis = AxisUnit::parse(symbol, class).map_err(|source| BuildError::Unit { source, line })?;

        Ok(match class {
            QuantityClass::Time => PlotExpression::Time(axis),
            QuantityClass::Temperature => PlotExpression::Temperature(axis),
            _ => PlotExpression::Pressure(axis),
        })
    }

    /// Value at `elapsed` seconds into the path.
    pub fn evaluate(&self, elapsed: f64, speciation: &Speciation) -> f64 {
        match self {
            PlotExpression::Time(axis) => axis.convert(elapsed),
            PlotExpression::Temperature(axis) => axis.convert(speciation.temperature),
            PlotExpression::Pressure(axis) => axis.convert(speciation.pressure),
            PlotExpression::Amount(species) => speciation.amount(species.index),
            PlotExpression::Molality(species) => speciation.molality(species.index),
            PlotExpression::Activity(species) => speciation.activity(species.index),
            PlotExpression::Ph(h) => -speciation.ln_activities[*h] / std::f64::consts::LN_10,
            PlotExpression::IonicStrength => speciation.ionic_strength,
        }
    }
}

impl fmt::Display for PlotExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let axis = |f: &mut fmt::Formatter<'_>, head: &str, axis: &AxisUnit| {
            if axis.symbol.is_empty() { write!(f, "{}", head) } else { write!(f, "{}:{}", head, axis.symbol) }
        };
        match self {
            PlotExpression::Time(unit) => axis(f, "t", unit),
            PlotExpression::Temperature(unit) => axis(f, "T", unit),
            PlotExpression::Pressure(unit) => axis(f, "P", unit),
            PlotExpression::Amount(s) => write!(f, "n[{}]", s.name),
            PlotExpression::Molality(s) => write!(f, "molality[{}]", s.name),
            PlotExpression::Activity(s) => write!(f, "activity[{}]", s.name),
            PlotExpression::Ph(_) => f.write_str("pH"),
            PlotExpression::IonicStrength => f.write_str("ionicStrength"),
        }
    }
}

// =================================================================================================
// Plots and series
// =================================================================================================

/// A declared plot.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSpec {
    /// Block name, e.g. `Plot 1`.
    pub name: String,
    pub x: PlotExpression,
    pub y: PlotExpression,
}

/// Samples of one plot, in time order.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSeries {
    pub name: String,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<(f64, f64)>,
}

impl PlotSeries {
    pub fn xs(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.0).collect()
    }

    pub fn ys(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.1).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Accumulates one series per plot.
#[derive(Debug, Clone)]
pub struct Sampler {
    plots: Vec<PlotSpec>,
    series: Vec<PlotSeries>,
}

impl Sampler {
    pub fn new(plots: &[PlotSpec]) -> Self {
        let series = plots
            .iter()
            .map(|plot| PlotSeries {
                name: plot.name.clone(),
                x_label: plot.x.to_string(),
                y_label: plot.y.to_string(),
                points: Vec::new(),
            })
            .collect();
        Self { plots: plots.to_vec(), series }
    }

    /// Append one sample to every series.
    pub fn record(&mut self, elapsed: f64, speciation: &Speciation) {
        for (plot, series) in self.plots.iter().zip(self.series.iter_mut()) {
            series.points.push((plot.x.evaluate(elapsed, speciation), plot.y.evaluate(elapsed, speciation)));
        }
    }

    /// Number of samples recorded so far.
    pub fn samples(&self) -> usize {
        self.series.first().map_or(0, PlotSeries::len)
    }

    pub fn into_series(self) -> Vec<PlotSeries> {
        self.series
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chemistry::{PhaseSpec, SpeciesRole, builtin_database};
    use nalgebra::DVector;

    fn system() -> ChemicalSystem {
        ChemicalSystem::new(
            builtin_database(),
            &[PhaseSpec::aqueous(&["H2O(l)", "H+", "OH-", "Na+", "Cl-"]), PhaseSpec::mineral("Halite")],
        )
        .unwrap()
    }

    fn speciation() -> Speciation {
        let mut ln_a = DVector::zeros(6);
        ln_a[1] = (1e-3f64).ln();
        Speciation {
            temperature: 333.15,
            pressure: 1.5e7,
            amounts: DVector::from_vec(vec![55.5, 1e-3, 1e-11, 0.1, 0.1, 2.0]),
            ln_activities: ln_a,
            molalities: DVector::from_vec(vec![0.0, 1e-3, 1e-11, 0.1, 0.1, 0.0]),
            ionic_strength: 0.101,
            roles: vec![SpeciesRole::FastEquilibrium; 6],
            potentials: DVector::zeros(5),
            iterations: 0,
        }
    }

    #[test]
    fn test_time_axis_units() {
        let system = system();
        let month = PlotExpression::parse("t:month", &system, 3).unwrap();
        let seconds = PlotExpression::parse("t", &system, 3).unwrap();
        let s = speciation();

        let one_month = 365.25 * 86_400.0 / 12.0;
        assert!((month.evaluate(one_month, &s) - 1.0).abs() < 1e-12);
        assert_eq!(seconds.evaluate(42.0, &s), 42.0);
        assert_eq!(month.to_string(), "t:month");
    }

    #[test]
    fn test_state_quantities() {
        let system = system();
        let s = speciation();

        let ph = PlotExpression::parse("pH", &system, 1).unwrap();
        assert!((ph.evaluate(0.0, &s) - 3.0).abs() < 1e-12);

        let halite = PlotExpression::parse("n[Halite]", &system, 1).unwrap();
        assert_eq!(halite.evaluate(0.0, &s), 2.0);

        let celsius = PlotExpression::parse("T:celsius", &system, 1).unwrap();
        assert!((celsius.evaluate(0.0, &s) - 60.0).abs() < 1e-9);

        let bar = PlotExpression::parse("P:bar", &system, 1).unwrap();
        assert!((bar.evaluate(0.0, &s) - 150.0).abs() < 1e-9);

        let na = PlotExpression::parse("molality[Na+]", &system, 1).unwrap();
        assert_eq!(na.evaluate(0.0, &s), 0.1);

        let strength = PlotExpression::parse("ionicStrength", &system, 1).unwrap();
        assert_eq!(strength.evaluate(0.0, &s), 0.101);
    }

    #[test]
    fn test_unresolvable_expressions() {
        let system = system();

        assert!(matches!(
            PlotExpression::parse("n[Calcite]", &system, 7),
            Err(BuildError::Reference { kind: ReferenceKind::Species, line: 7, .. })
        ));
        assert!(matches!(
            PlotExpression::parse("entropy", &system, 8),
            Err(BuildError::UnknownExpression { line: 8, .. })
        ));
        assert!(matches!(
            PlotExpression::parse("molality[Halite]", &system, 9),
            Err(BuildError::UnknownExpression { .. })
        ));
        assert!(matches!(PlotExpression::parse("t:bar", &system, 10), Err(BuildError::Unit { line: 10, .. })));

        let no_acid = ChemicalSystem::new(builtin_database(), &[PhaseSpec::mineral("Quartz")]).unwrap();
        assert!(PlotExpression::parse("pH", &no_acid, 1).is_err());
    }

    #[test]
    fn test_sampler_records_every_plot() {
        let system = system();
        let plots = vec![
            PlotSpec {
                name: "Plot 1".to_string(),
                x: PlotExpression::parse("t:h", &system, 1).unwrap(),
                y: PlotExpression::parse("n[Halite]", &system, 1).unwrap(),
            },
            PlotSpec {
                name: "Plot 2".to_string(),
                x: PlotExpression::parse("t:h", &system, 1).unwrap(),
                y: PlotExpression::parse("pH", &system, 1).unwrap(),
            },
        ];

        let mut sampler = Sampler::new(&plots);
        let s = speciation();
        sampler.record(0.0, &s);
        sampler.record(7200.0, &s);
        assert_eq!(sampler.samples(), 2);

        let series = sampler.into_series();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].xs(), vec![0.0, 2.0]);
        assert_eq!(series[0].x_label, "t:h");
        assert_eq!(series[1].y_label, "pH");
    }
}
