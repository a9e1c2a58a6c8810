use clap::Parser;

use gain_calc::{
    CalcError, GainCalc, Grid, RTuple, Window, RANGES, STAGE2, TEST_RANGE, TEST_START, TRAVELS,
    WINDOW,
};

#[derive(Parser)]
#[command(name = "gain-calc")]
#[command(
    version,
    about = "Search resistor combinations whose stage gains keep every range/travel cell in the acceptance window"
)]
pub struct Cli {
    /// First resistor value tried for R1..R4
    #[arg(long, default_value_t = TEST_START)]
    pub start: u32,

    /// Number of resistor values tried for R1..R4
    #[arg(long, default_value_t = TEST_RANGE)]
    pub count: u32,

    /// Gain of the second amplifier stage
    #[arg(long, default_value_t = STAGE2)]
    pub stage2: f64,

    /// Sensor range values (outer grid axis)
    #[arg(long, value_delimiter = ',', default_values_t = RANGES.to_vec())]
    pub ranges: Vec<f64>,

    /// Travel distance values (inner grid axis)
    #[arg(long, value_delimiter = ',', default_values_t = TRAVELS.to_vec())]
    pub travels: Vec<f64>,

    /// Lower bound of the acceptance window
    #[arg(long, default_value_t = WINDOW.lo())]
    pub lo: f64,

    /// Upper bound of the acceptance window
    #[arg(long, default_value_t = WINDOW.hi())]
    pub hi: f64,

    /// Gain expression over R1..R4, may be repeated (e.g. "par(R3, R4) / R1")
    #[arg(long = "gain", value_name = "EXPR")]
    pub gains: Vec<String>,

    /// Print the value matrix of one combination instead of searching
    #[arg(long, value_name = "R1,R2,R3,R4")]
    pub inspect: Option<RTuple>,
}

impl Cli {
    pub fn calc(&self) -> Result<GainCalc, CalcError> {
        let calc = GainCalc::new()
            .bounds(self.start, self.count)
            .stage2(self.stage2)
            .grid(Grid::new(&self.ranges, &self.travels))
            .window(Window::new(self.lo, self.hi)?);
        calc.validate()?;
        Ok(calc)
    }
}
