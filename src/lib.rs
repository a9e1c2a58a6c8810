//! A brute-force gain search for a two-stage amplifier resistor network.
//!
//! Four resistors R1..R4 set the gain of the first stage. Depending on which of them are switched
//! in, the stage can produce four different gains:
//!
//! 1. `(R3 || R4) / R1`
//! 2. `R3 / R1`
//! 3. `(R3 || R4) / (R1 || R2)`
//! 4. `R3 / (R1 || R2)`
//!
//! For every combination of sensor range and travel distance on a fixed grid, at least one of
//! these gains must scale the sensor output into the acceptance window `[0.48, 0.99]`. The search
//! walks every combination of integer resistor values and reports those for which this holds in
//! every grid cell.
//!
//! # Example
//! ```rust no_run
//! use gain_calc::*;
//!
//! fn main() {
//!     let calc = GainCalc::new();
//!
//!     println!("Number of combinations: {}", calc.combinations());
//!
//!     let res = calc
//!         .calc(stage_gains)
//!         .expect("Error: invalid search settings");
//!
//!     res.print_all();
//! }
//! ```
//! Running this example produces the results:
//! ```text
//! Number of combinations: 810000
//! Good combination: (22, 4, 29, 19)
//! ```

#[macro_use]
extern crate lazy_static;

use itertools::{iproduct, Itertools};
use tracing::{debug, info, trace};

use std::{fmt, ops::RangeInclusive, str::FromStr};

mod error;

pub use error::CalcError;

#[cfg(feature = "expr_builder")]
mod expr_builder;

#[cfg(feature = "expr_builder")]
pub use expr_builder::GainBuilder;

/// First resistor value tried for each of R1..R4.
pub const TEST_START: u32 = 1;
/// Number of resistor values tried for each of R1..R4.
pub const TEST_RANGE: u32 = 30;
/// Gain of the second amplifier stage.
pub const STAGE2: f64 = 1.0;
/// Full scale sensor output.
pub const FULL_SCALE: f64 = 10.0;
/// Reference divisor applied to the full scale output.
pub const REF_DIVISOR: f64 = 1.195;
/// Sensor range values, the outer axis of the grid.
pub const RANGES: &[f64] = &[15.0, 30.0, 50.0, 100.0];
/// Travel distance values, the inner axis of the grid.
pub const TRAVELS: &[f64] = &[100.0, 250.0, 350.0, 500.0];
/// Window a scaled output must land in to be accepted.
pub const WINDOW: Window = Window { lo: 0.48, hi: 0.99 };

lazy_static! {
    /// The range/travel grid built from `RANGES` and `TRAVELS`.
    pub static ref GRID: Grid = Grid::new(RANGES, TRAVELS);
}

/// Combined resistance of `a` and `b` in parallel.
/// # Examples
/// ```
///     # use gain_calc::parallel;
///     assert_eq!(parallel(6.0, 3.0), 2.0);
///     assert_eq!(parallel(3.0, 6.0), 2.0);
/// ```
pub fn parallel(a: f64, b: f64) -> f64 {
    (a * b) / (a + b)
}

/// The four gains the first stage can be switched between.
pub fn stage_gains(rs: &RTuple) -> [f64; 4] {
    let [r1, r2, r3, r4] = rs.values();
    [
        parallel(r3, r4) / r1,
        r3 / r1,
        parallel(r3, r4) / parallel(r1, r2),
        r3 / parallel(r1, r2),
    ]
}

/// Prints a passing combination in the report format.
pub fn print_good(rs: &RTuple) {
    println!("Good combination: {}", rs);
}

/// A binding of integer values to R1, R2, R3 and R4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RTuple(pub [u32; 4]);

impl RTuple {
    pub fn new(r1: u32, r2: u32, r3: u32, r4: u32) -> Self {
        RTuple([r1, r2, r3, r4])
    }

    /// Retrieves the value of R{idx}, starting from R1.
    /// # Examples
    /// ```
    ///     # use gain_calc::RTuple;
    ///     let rs = RTuple::new(22, 4, 29, 19);
    ///     assert_eq!(rs.r(1), 22);
    ///     assert_eq!(rs.r(4), 19);
    /// ```
    pub fn r(&self, idx: usize) -> u32 {
        self.0[idx - 1]
    }

    /// The resistor values as floats, in R1..R4 order.
    pub fn values(&self) -> [f64; 4] {
        let [r1, r2, r3, r4] = self.0;
        [r1 as f64, r2 as f64, r3 as f64, r4 as f64]
    }
}

impl fmt::Display for RTuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({})", self.0.iter().join(", "))
    }
}

/// Parses `R1,R2,R3,R4`, optionally wrapped in parentheses as printed by `Display`.
impl FromStr for RTuple {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, CalcError> {
        let vals = s
            .trim()
            .trim_start_matches('(')
            .trim_end_matches(')')
            .split(',')
            .map(|v| v.trim().parse::<u32>())
            .collect::<Result<Vec<u32>, _>>()
            .map_err(|e| CalcError::Tuple(format!("{}: {}", s, e)))?;
        match vals[..] {
            [r1, r2, r3, r4] => Ok(RTuple([r1, r2, r3, r4])),
            _ => Err(CalcError::Tuple(format!(
                "{}: expected 4 values, got {}",
                s,
                vals.len()
            ))),
        }
    }
}

/// Closed interval of accepted output values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    lo: f64,
    hi: f64,
}

impl Window {
    pub fn new(lo: f64, hi: f64) -> Result<Self, CalcError> {
        if !lo.is_finite() || !hi.is_finite() || lo > hi {
            return Err(CalcError::Window { lo, hi });
        }
        Ok(Window { lo, hi })
    }

    pub const fn lo(&self) -> f64 {
        self.lo
    }

    pub const fn hi(&self) -> f64 {
        self.hi
    }

    /// Both bounds are inclusive.
    /// # Examples
    /// ```
    ///     # use gain_calc::WINDOW;
    ///     assert!(WINDOW.contains(0.48));
    ///     assert!(WINDOW.contains(0.99));
    ///     assert!(!WINDOW.contains(0.995));
    /// ```
    pub fn contains(&self, val: f64) -> bool {
        self.lo <= val && val <= self.hi
    }
}

/// One (range, travel) point of the grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub range: f64,
    pub travel: f64,
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "range {}, travel {}", self.range, self.travel)
    }
}

/// Cartesian product of range and travel values, ranges outermost.
#[derive(Debug, Clone)]
pub struct Grid {
    cells: Box<[Cell]>,
}

impl Grid {
    pub fn new(ranges: &[f64], travels: &[f64]) -> Self {
        Grid {
            cells: ranges
                .iter()
                .cartesian_product(travels.iter())
                .map(|(&range, &travel)| Cell { range, travel })
                .collect::<Vec<Cell>>()
                .into_boxed_slice(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cell> + Clone {
        self.cells.iter()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn validate(&self) -> Result<(), CalcError> {
        if self.is_empty() {
            return Err(CalcError::Grid("no range/travel cells".to_string()));
        }
        for cell in self.iter() {
            if !cell.range.is_finite() {
                return Err(CalcError::Grid(format!("range {} is not finite", cell.range)));
            }
            if !cell.travel.is_finite() || cell.travel == 0.0 {
                return Err(CalcError::Grid(format!(
                    "travel {} must be finite and non-zero",
                    cell.travel
                )));
            }
        }
        Ok(())
    }
}

/// Counters from a completed search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub examined: u64,
    pub passed: u64,
}

/// Stores the passing combinations of a search, in enumeration order.
#[derive(Debug, Default)]
pub struct GainRes {
    res: Vec<RTuple>,
}

impl GainRes {
    /// Print every passing combination, one per line.
    pub fn print_all(&self) {
        for rs in self.iter() {
            print_good(rs);
        }
    }

    /// Iterates the combinations in lexicographic `(R1, R2, R3, R4)` order.
    pub fn iter(&self) -> impl Iterator<Item = &RTuple> {
        self.res.iter()
    }

    pub fn len(&self) -> usize {
        self.res.len()
    }

    pub fn is_empty(&self) -> bool {
        self.res.is_empty()
    }
}

/// Scaled outputs of one grid cell for every gain.
#[derive(Debug, Clone)]
pub struct CellValues {
    pub cell: Cell,
    pub values: Vec<f64>,
    pub accepted: usize,
}

/// Scaled outputs of one combination over the whole grid.
#[derive(Debug, Clone)]
pub struct ValueMatrix {
    rows: Vec<CellValues>,
}

impl ValueMatrix {
    pub fn iter(&self) -> impl Iterator<Item = &CellValues> {
        self.rows.iter()
    }

    /// The first cell in grid order where no value was accepted.
    pub fn first_failing(&self) -> Option<&CellValues> {
        self.rows.iter().find(|row| row.accepted == 0)
    }

    pub fn passes(&self) -> bool {
        self.first_failing().is_none()
    }
}

impl fmt::Display for ValueMatrix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let sep = if f.alternate() { "\n\n" } else { "\n" };
        write!(
            f,
            "{}",
            self.rows
                .iter()
                .map(|row| format!(
                    "{}: [{}] {} accepted",
                    row.cell,
                    row.values.iter().map(|v| format!("{:.4}", v)).join(", "),
                    row.accepted
                ))
                .join(sep)
        )
    }
}

/// Main search struct
#[derive(Debug, Clone)]
pub struct GainCalc {
    start: u32,
    count: u32,
    stage2: f64,
    grid: Grid,
    window: Window,
}

impl Default for GainCalc {
    fn default() -> Self {
        GainCalc {
            start: TEST_START,
            count: TEST_RANGE,
            stage2: STAGE2,
            grid: GRID.clone(),
            window: WINDOW,
        }
    }
}

impl GainCalc {
    /// Creates a calculator over R1..R4 in `[1, 30]` with the standard grid and window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tries `count` values per resistor, starting at `start`.
    pub fn bounds(mut self, start: u32, count: u32) -> Self {
        self.start = start;
        self.count = count;
        self
    }

    pub fn stage2(mut self, stage2: f64) -> Self {
        self.stage2 = stage2;
        self
    }

    pub fn grid(mut self, grid: Grid) -> Self {
        self.grid = grid;
        self
    }

    pub fn window(mut self, window: Window) -> Self {
        self.window = window;
        self
    }

    /// Checks the settings, `search` and `calc` do this before enumerating.
    pub fn validate(&self) -> Result<(), CalcError> {
        if self.start == 0
            || self.count == 0
            || self.start.checked_add(self.count - 1).is_none()
        {
            return Err(CalcError::Bounds {
                start: self.start,
                count: self.count,
            });
        }
        if !self.stage2.is_finite() || self.stage2 == 0.0 {
            return Err(CalcError::Stage2(self.stage2));
        }
        self.grid.validate()
    }

    /// Returns the number of resistor combinations the search will examine.
    /// # Examples
    /// ```
    ///     # use gain_calc::GainCalc;
    ///     assert_eq!(GainCalc::new().combinations(), 810_000);
    ///     assert_eq!(GainCalc::new().bounds(1, 6).combinations(), 1296);
    /// ```
    pub fn combinations(&self) -> u128 {
        (self.count as u128).pow(4)
    }

    fn span(&self) -> RangeInclusive<u32> {
        self.start..=self.start + (self.count - 1)
    }

    /// The sensor output of `cell` when scaled by `gain`.
    pub fn value(&self, gain: f64, cell: &Cell) -> f64 {
        FULL_SCALE / REF_DIVISOR / self.stage2 / gain * cell.range / cell.travel
    }

    /// Number of `gains` whose output for `cell` lands in the window.
    pub fn accepted(&self, gains: &[f64], cell: &Cell) -> usize {
        gains
            .iter()
            .filter(|&&gain| self.window.contains(self.value(gain, cell)))
            .count()
    }

    /// The first cell in grid order where none of `gains` is accepted. Later cells are not
    /// evaluated.
    pub fn first_failing_cell(&self, gains: &[f64]) -> Option<Cell> {
        self.grid
            .iter()
            .find(|cell| self.accepted(gains, cell) == 0)
            .cloned()
    }

    pub fn passes(&self, gains: &[f64]) -> bool {
        self.first_failing_cell(gains).is_none()
    }

    /// Evaluates every cell for `gains`, without stopping at a failing one.
    pub fn value_matrix(&self, gains: &[f64]) -> ValueMatrix {
        ValueMatrix {
            rows: self
                .grid
                .iter()
                .map(|cell| {
                    let values = gains
                        .iter()
                        .map(|&gain| self.value(gain, cell))
                        .collect::<Vec<f64>>();
                    let accepted = values.iter().filter(|&&v| self.window.contains(v)).count();
                    CellValues {
                        cell: *cell,
                        values,
                        accepted,
                    }
                })
                .collect(),
        }
    }

    /// Walks every combination in lexicographic `(R1, R2, R3, R4)` order and hands each one that
    /// passes to `on_pass` as soon as it is found. `gains` maps a combination to the gains it can
    /// produce, `stage_gains` or a `GainBuilder` are the usual choices.
    pub fn search<G, F, P>(&self, gains: F, mut on_pass: P) -> Result<SearchStats, CalcError>
    where
        G: AsRef<[f64]>,
        F: Fn(&RTuple) -> G,
        P: FnMut(&RTuple),
    {
        self.validate()?;
        info!(
            combinations = %self.combinations(),
            cells = self.grid.len(),
            lo = self.window.lo(),
            hi = self.window.hi(),
            "searching resistor combinations"
        );

        let span = self.span();
        let mut stats = SearchStats::default();
        for (r1, r2, r3, r4) in iproduct!(span.clone(), span.clone(), span.clone(), span) {
            let rs = RTuple([r1, r2, r3, r4]);
            stats.examined += 1;
            match self.first_failing_cell(gains(&rs).as_ref()) {
                None => {
                    debug!(%rs, "good combination");
                    stats.passed += 1;
                    on_pass(&rs);
                }
                Some(cell) => trace!(%rs, %cell, "rejected"),
            }
        }

        info!(
            examined = stats.examined,
            passed = stats.passed,
            "search finished"
        );
        Ok(stats)
    }

    /// Runs `search` and collects the passing combinations. A search where nothing passes gives
    /// an empty `GainRes`.
    pub fn calc<G, F>(&self, gains: F) -> Result<GainRes, CalcError>
    where
        G: AsRef<[f64]>,
        F: Fn(&RTuple) -> G,
    {
        let mut res = Vec::new();
        self.search(gains, |rs| res.push(*rs))?;
        Ok(GainRes { res })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn all_ones_is_rejected_at_second_range() {
        let calc = GainCalc::new();
        let gains = stage_gains(&RTuple::new(1, 1, 1, 1));
        assert_eq!(gains, [0.5, 1.0, 1.0, 2.0]);

        let first = Cell {
            range: 15.0,
            travel: 100.0,
        };
        assert!(close(calc.value(gains[0], &first), 2.5105));
        assert!(close(calc.value(gains[1], &first), 1.2552));
        assert!(close(calc.value(gains[3], &first), 0.6276));
        assert_eq!(calc.accepted(&gains, &first), 1);

        assert_eq!(
            calc.first_failing_cell(&gains),
            Some(Cell {
                range: 30.0,
                travel: 100.0
            })
        );
        assert!(!calc.passes(&gains));
    }

    #[test]
    fn known_good_combination_passes_every_cell() {
        let calc = GainCalc::new();
        let matrix = calc.value_matrix(&stage_gains(&RTuple::new(22, 4, 29, 19)));
        assert_eq!(matrix.iter().count(), 16);
        assert!(matrix.passes());
        let first = matrix.iter().next().unwrap();
        assert!(close(first.values[1], 0.9522));
        assert_eq!(first.accepted, 1);
    }

    #[test]
    fn window_bounds_are_inclusive() {
        assert!(WINDOW.contains(0.48));
        assert!(WINDOW.contains(0.99));
        assert!(!WINDOW.contains(0.479_999_9));
        assert!(!WINDOW.contains(0.990_000_1));

        let cell = Cell {
            range: 15.0,
            travel: 500.0,
        };
        let gains = stage_gains(&RTuple::new(22, 4, 29, 19));
        let val = GainCalc::new().value(gains[0], &cell);
        let calc = GainCalc::new()
            .grid(Grid::new(&[15.0], &[500.0]))
            .window(Window::new(val, val).unwrap());
        assert_eq!(calc.accepted(&gains, &cell), 1);
        assert!(calc.passes(&gains));
    }

    #[test]
    fn point_window_rejects_everything() {
        let calc = GainCalc::new().window(Window::new(0.999_999, 0.999_999).unwrap());
        let stats = calc.search(stage_gains, |rs| panic!("{} passed", rs)).unwrap();
        assert_eq!(stats.examined, 810_000);
        assert_eq!(stats.passed, 0);
        assert!(calc.calc(stage_gains).unwrap().is_empty());
    }

    #[test]
    fn grid_is_range_major() {
        let cells = GRID.iter().cloned().collect::<Vec<_>>();
        assert_eq!(cells.len(), 16);
        assert_eq!(cells[1], Cell { range: 15.0, travel: 250.0 });
        assert_eq!(cells[4], Cell { range: 30.0, travel: 100.0 });
        assert_eq!(cells[15], Cell { range: 100.0, travel: 500.0 });
    }

    #[test]
    fn rejects_invalid_settings() {
        assert!(matches!(
            GainCalc::new().bounds(0, 30).validate(),
            Err(CalcError::Bounds { start: 0, count: 30 })
        ));
        assert!(GainCalc::new().bounds(1, 0).validate().is_err());
        assert!(GainCalc::new().bounds(u32::MAX, 2).validate().is_err());
        assert!(GainCalc::new().bounds(u32::MAX, 1).validate().is_ok());
        assert!(matches!(
            GainCalc::new().stage2(0.0).validate(),
            Err(CalcError::Stage2(_))
        ));
        assert!(matches!(
            GainCalc::new().grid(Grid::new(&[15.0], &[])).validate(),
            Err(CalcError::Grid(_))
        ));
        assert!(GainCalc::new().grid(Grid::new(&[15.0], &[0.0])).validate().is_err());
        assert!(Window::new(0.99, 0.48).is_err());
        assert!(Window::new(f64::NAN, 0.48).is_err());
        assert!(GainCalc::new().bounds(0, 30).calc(stage_gains).is_err());
    }

    #[test]
    fn tuple_display_and_parse() {
        let rs = RTuple::new(22, 4, 29, 19);
        assert_eq!(rs.to_string(), "(22, 4, 29, 19)");
        assert_eq!("(22, 4, 29, 19)".parse::<RTuple>().unwrap(), rs);
        assert_eq!("22,4,29,19".parse::<RTuple>().unwrap(), rs);
        assert!("1,2,3".parse::<RTuple>().is_err());
        assert!("1,2,x,4".parse::<RTuple>().is_err());
    }
}
