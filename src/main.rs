use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gain_calc::*;

mod cli;

use cli::Cli;

fn main() -> Result<()> {
    // Results go to stdout, logging to stderr
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let calc = cli.calc()?;

    if cli.gains.is_empty() {
        run(&cli, &calc, stage_gains)
    } else {
        run(&cli, &calc, expr_gains(&cli.gains)?)
    }
}

#[cfg(feature = "expr_builder")]
fn expr_gains(exprs: &[String]) -> Result<impl Fn(&RTuple) -> Vec<f64>> {
    let builder = exprs
        .iter()
        .fold(GainBuilder::new(), |builder, expr| builder.gain(expr));
    Ok(builder.finish()?)
}

#[cfg(not(feature = "expr_builder"))]
fn expr_gains(_exprs: &[String]) -> Result<fn(&RTuple) -> Vec<f64>> {
    anyhow::bail!("--gain requires the expr_builder feature")
}

fn run<G: AsRef<[f64]>>(cli: &Cli, calc: &GainCalc, gains: impl Fn(&RTuple) -> G) -> Result<()> {
    match cli.inspect {
        Some(rs) => {
            let matrix = calc.value_matrix(gains(&rs).as_ref());
            println!("Values for {}:", rs);
            println!("{}", matrix);
            match matrix.first_failing() {
                Some(row) => println!("Rejected at {}", row.cell),
                None => print_good(&rs),
            }
        }
        None => {
            calc.search(gains, print_good)?;
        }
    }
    Ok(())
}
