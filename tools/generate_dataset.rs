//! Synthetic Dataset Generator
//!
//! Writes an AI4I-shaped CSV (identifiers, sensor readings, failure label and
//! the five failure-mode columns) for smoke-testing the training pipeline.

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::f64::consts::PI;
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "generate-dataset")]
#[command(about = "Generate a synthetic machine failure dataset", long_about = None)]
struct Cli {
    /// Number of rows to generate
    #[arg(short, long, default_value_t = 10_000)]
    rows: usize,

    /// Output CSV path
    #[arg(short, long, default_value = "data/ai4i2020.csv")]
    output: PathBuf,

    /// RNG seed
    #[arg(short, long, default_value_t = 42)]
    seed: u64,
}

/// One dataset row, with the column names of the AI4I 2020 dataset
#[derive(Debug, Clone, Serialize)]
struct Reading {
    #[serde(rename = "UDI")]
    udi: usize,
    #[serde(rename = "Product ID")]
    product_id: String,
    #[serde(rename = "Type")]
    product_type: char,
    #[serde(rename = "Air temperature [K]")]
    air_temperature: f64,
    #[serde(rename = "Process temperature [K]")]
    process_temperature: f64,
    #[serde(rename = "Rotational speed [rpm]")]
    rotational_speed: f64,
    #[serde(rename = "Torque [Nm]")]
    torque: f64,
    #[serde(rename = "Tool wear [min]")]
    tool_wear: f64,
    #[serde(rename = "Machine failure")]
    machine_failure: u8,
    #[serde(rename = "TWF")]
    twf: u8,
    #[serde(rename = "HDF")]
    hdf: u8,
    #[serde(rename = "PWF")]
    pwf: u8,
    #[serde(rename = "OSF")]
    osf: u8,
    #[serde(rename = "RNF")]
    rnf: u8,
}

/// Reading generator following the failure rules of the AI4I dataset
struct ReadingGenerator {
    rng: StdRng,
    counter: usize,
}

impl ReadingGenerator {
    fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            counter: 0,
        }
    }

    /// Approximately normal sample (Irwin-Hall with 12 terms)
    fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        let sum: f64 = (0..12).map(|_| self.rng.gen::<f64>()).sum();
        mean + (sum - 6.0) * std_dev
    }

    fn round1(value: f64) -> f64 {
        (value * 10.0).round() / 10.0
    }

    fn generate(&mut self) -> Reading {
        self.counter += 1;

        let draw: f64 = self.rng.gen();
        let (product_type, wear_step, strain_limit) = if draw < 0.6 {
            ('L', 2.0, 11_000.0)
        } else if draw < 0.9 {
            ('M', 3.0, 12_000.0)
        } else {
            ('H', 5.0, 13_000.0)
        };

        let air_temperature = Self::round1(self.normal(300.0, 2.0));
        let process_temperature = Self::round1(air_temperature + 10.0 + self.normal(0.0, 1.0));
        let rotational_speed = self.normal(1540.0, 180.0).max(1100.0).round();
        let torque = Self::round1(self.normal(40.0, 10.0).max(3.0));
        let tool_wear = (self.rng.gen_range(0.0f64..240.0) + wear_step).round();

        // tool wear failure somewhere between 200 and 240 minutes
        let twf = tool_wear >= 200.0 && tool_wear <= 240.0 && self.rng.gen_bool(0.08);
        let hdf = process_temperature - air_temperature < 8.6 && rotational_speed < 1380.0;
        let power_watts = torque * rotational_speed * 2.0 * PI / 60.0;
        let pwf = !(3500.0..=9000.0).contains(&power_watts);
        let osf = tool_wear * torque > strain_limit;
        let rnf = self.rng.gen_bool(0.001);

        let flags = [twf, hdf, pwf, osf, rnf].map(u8::from);

        Reading {
            udi: self.counter,
            product_id: format!("{}{}", product_type, self.rng.gen_range(10_000..100_000)),
            product_type,
            air_temperature,
            process_temperature,
            rotational_speed,
            torque,
            tool_wear,
            machine_failure: u8::from(flags.iter().any(|&f| f == 1)),
            twf: flags[0],
            hdf: flags[1],
            pwf: flags[2],
            osf: flags[3],
            rnf: flags[4],
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("generate_dataset=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    info!(
        rows = cli.rows,
        output = %cli.output.display(),
        seed = cli.seed,
        "Generating dataset"
    );

    if let Some(dir) = cli.output.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let mut writer = csv::Writer::from_path(&cli.output)
        .with_context(|| format!("Failed to open {}", cli.output.display()))?;

    let mut generator = ReadingGenerator::new(cli.seed);
    let mut failures = 0;
    for i in 0..cli.rows {
        let reading = generator.generate();
        failures += usize::from(reading.machine_failure);
        writer.serialize(&reading)?;

        if (i + 1) % 1000 == 0 {
            info!("Generated {}/{} rows ({} failures)", i + 1, cli.rows, failures);
        }
    }
    writer.flush()?;

    info!(
        "Completed! Wrote {} rows ({} failures) to {}",
        cli.rows,
        failures,
        cli.output.display()
    );

    Ok(())
}
