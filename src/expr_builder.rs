use tracing::debug;

use crate::{parallel, CalcError, RTuple};

const RNAMES: [&str; 4] = ["R1", "R2", "R3", "R4"];

const PROBE: RTuple = RTuple([1, 1, 1, 1]);

fn context(rs: &RTuple) -> meval::Context<'static> {
    let mut ctx = meval::Context::new();
    ctx.func2("par", parallel);
    for (name, val) in RNAMES.iter().zip(rs.values().iter()) {
        ctx.var(*name, *val);
    }
    ctx
}

fn gain_err(expr: &str, err: meval::Error) -> CalcError {
    CalcError::Gain {
        expr: expr.to_string(),
        reason: err.to_string(),
    }
}

/// Builder struct used to create gain sets for `GainCalc::search` from mathematical expressions.
#[derive(Default)]
pub struct GainBuilder {
    gains: Vec<(String, Result<meval::Expr, meval::Error>)>,
}

impl GainBuilder {
    /// Init a new builder.
    pub fn new() -> Self {
        GainBuilder { gains: Vec::new() }
    }

    /// A builder holding the four standard stage gains, the expression form of `stage_gains`.
    pub fn stage_gains() -> Self {
        GainBuilder::new()
            .gain("par(R3, R4) / R1")
            .gain("R3 / R1")
            .gain("par(R3, R4) / par(R1, R2)")
            .gain("R3 / par(R1, R2)")
    }

    /// Add a gain to the builder. `expr` is a math expression using R1, R2, R3, R4,
    /// the [supported expressions](https://docs.rs/meval/#supported-expressions) and
    /// `par(a, b)` for two resistances in parallel. Parse errors are reported by `finish`.
    pub fn gain(mut self, expr: &str) -> Self {
        self.gains.push((expr.to_string(), expr.parse()));
        self
    }

    /// Finishes the building and converts the struct into a function suitable to be passed to
    /// `GainCalc::search` or `GainCalc::calc`. Every expression is evaluated once against
    /// R1 = R2 = R3 = R4 = 1 so that unknown variables and functions fail here.
    pub fn finish(self) -> Result<impl Fn(&RTuple) -> Vec<f64>, CalcError> {
        if self.gains.is_empty() {
            return Err(CalcError::Gain {
                expr: String::new(),
                reason: "no gain expressions given".to_string(),
            });
        }

        let probe = context(&PROBE);
        let mut exprs = Vec::with_capacity(self.gains.len());
        for (src, parsed) in self.gains {
            let expr = parsed.map_err(|e| gain_err(&src, e))?;
            expr.eval_with_context(&probe)
                .map_err(|e| gain_err(&src, e))?;
            debug!(expr = %src, "gain expression ready");
            exprs.push(expr);
        }

        Ok(move |rs: &RTuple| {
            let ctx = context(rs);
            // A checked expression only fails to evaluate on a missing name, NaN is never accepted.
            exprs
                .iter()
                .map(|expr| expr.eval_with_context(&ctx).unwrap_or(f64::NAN))
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage_gains;

    #[test]
    fn expressions_match_native_gains() {
        let gains = GainBuilder::stage_gains().finish().unwrap();
        for rs in &[
            RTuple::new(1, 1, 1, 1),
            RTuple::new(22, 4, 29, 19),
            RTuple::new(3, 17, 8, 30),
        ] {
            assert_eq!(gains(rs), stage_gains(rs).to_vec());
        }
    }

    #[test]
    fn unknown_variable_is_rejected() {
        match GainBuilder::new().gain("R5 / R1").finish() {
            Err(CalcError::Gain { expr, .. }) => assert_eq!(expr, "R5 / R1"),
            _ => panic!("expected a gain error"),
        }
    }

    #[test]
    fn parse_error_is_rejected() {
        assert!(GainBuilder::new().gain("R3 / R1").gain("R1 +").finish().is_err());
    }

    #[test]
    fn empty_builder_is_rejected() {
        assert!(GainBuilder::new().finish().is_err());
    }
}
