use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalcError {
    /// Resistor index bounds that are empty, start at zero or overflow.
    #[error("invalid resistor bounds: start {start}, count {count}")]
    Bounds { start: u32, count: u32 },

    /// Acceptance window with a non-finite bound or `lo > hi`.
    #[error("invalid acceptance window [{lo}, {hi}]")]
    Window { lo: f64, hi: f64 },

    #[error("invalid grid: {0}")]
    Grid(String),

    #[error("invalid stage 2 divisor: {0}")]
    Stage2(f64),

    /// A resistor tuple that could not be parsed from `R1,R2,R3,R4`.
    #[error("invalid resistor tuple: {0}")]
    Tuple(String),

    /// A gain expression that failed to parse or evaluate.
    #[error("gain expression `{expr}`: {reason}")]
    Gain { expr: String, reason: String },
}
