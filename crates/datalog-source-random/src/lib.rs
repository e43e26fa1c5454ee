// # Random Data Sources
//
// This crate provides synthetic data sources for the data logger.
//
// ## Purpose
//
// These sources simulate real hardware for:
// - Demos and first-time setup
// - CI/CD testing of outputs and rename tables
// - Exercising missing-value handling end to end
//
// ## Missing Values
//
// Each read can drop variables in two ways, both controlled by a rate in
// `[0, 1]`:
// - `key_missing_rate`: the variable is omitted from the record
// - `value_missing_rate`: the variable is present with `Value::Missing`
//
// Outputs treat both the same way, so these sources are a cheap way to
// check that they do.

use datalog_core::config::SourceKind;
use datalog_core::registry::PluginRegistry;
use datalog_core::traits::{DataSource, DataSourceFactory};
use datalog_core::{Error, Record, Result, Value};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};

/// Characters used by [`RandomStringSource`]
const STRING_ALPHABET: &[u8] = b"AaBbCcDdEe";

/// Upper bound (exclusive) of [`RandomDataSource`] values
const MAX_RANDOM_VALUE: f64 = 100.0;

/// Shared generator state of the random sources
struct Generator {
    rng: Mutex<StdRng>,
    key_missing_rate: f64,
    value_missing_rate: f64,
}

impl Generator {
    fn new(key_missing_rate: f64, value_missing_rate: f64) -> Result<Self> {
        check_rate("key_missing_rate", key_missing_rate)?;
        check_rate("value_missing_rate", value_missing_rate)?;
        Ok(Self {
            rng: Mutex::new(StdRng::from_entropy()),
            key_missing_rate,
            value_missing_rate,
        })
    }

    fn reseed(&mut self, seed: u64) {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
    }

    /// Produce one record over `names`, dropping keys and values at the
    /// configured rates
    fn sample(&self, names: &[String], mut generate: impl FnMut(&mut StdRng) -> Value) -> Record {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let mut record = Record::with_capacity(names.len());

        for name in names {
            if rng.gen_bool(self.key_missing_rate) {
                continue;
            }
            let value = if rng.gen_bool(self.value_missing_rate) {
                Value::Missing
            } else {
                generate(&mut *rng)
            };
            record.insert(name.clone(), value);
        }

        record
    }
}

fn check_rate(what: &str, rate: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&rate) {
        return Err(Error::config(format!(
            "{} must be within [0, 1], got {}",
            what, rate
        )));
    }
    Ok(())
}

fn variable_names(prefix: &str, size: usize) -> Vec<String> {
    (0..size).map(|n| format!("{}{}", prefix, n)).collect()
}

/// Random floating-point source
///
/// Advertises `RandData0 .. RandData<size-1>`, each read yielding a value
/// in `[0, 100)`.
pub struct RandomDataSource {
    names: Vec<String>,
    generator: Generator,
}

impl RandomDataSource {
    /// Create a new random number source
    ///
    /// # Errors
    ///
    /// `Error::Config` if `size` is zero or a rate is outside `[0, 1]`
    pub fn new(size: usize, key_missing_rate: f64, value_missing_rate: f64) -> Result<Self> {
        if size == 0 {
            return Err(Error::config("Random source size must be > 0"));
        }
        Ok(Self {
            names: variable_names("RandData", size),
            generator: Generator::new(key_missing_rate, value_missing_rate)?,
        })
    }

    /// Use a fixed seed, making every sequence of reads reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.generator.reseed(seed);
        self
    }
}

#[async_trait::async_trait]
impl DataSource for RandomDataSource {
    async fn read_data(&self) -> Result<Record> {
        Ok(self
            .generator
            .sample(&self.names, |rng| Value::Float(rng.gen_range(0.0..MAX_RANDOM_VALUE))))
    }

    fn all_variable_names(&self) -> &[String] {
        &self.names
    }
}

/// Random string source
///
/// Advertises `RandStr0 .. RandStr<size-1>`, each read yielding a string of
/// `str_length` characters drawn from `AaBbCcDdEe`.
pub struct RandomStringSource {
    names: Vec<String>,
    str_length: usize,
    generator: Generator,
}

impl RandomStringSource {
    /// Create a new random string source
    ///
    /// # Errors
    ///
    /// `Error::Config` if `size` or `str_length` is zero or a rate is outside `[0, 1]`
    pub fn new(
        size: usize,
        str_length: usize,
        key_missing_rate: f64,
        value_missing_rate: f64,
    ) -> Result<Self> {
        if size == 0 {
            return Err(Error::config("Random source size must be > 0"));
        }
        if str_length == 0 {
            return Err(Error::config("Random string length must be > 0"));
        }
        Ok(Self {
            names: variable_names("RandStr", size),
            str_length,
            generator: Generator::new(key_missing_rate, value_missing_rate)?,
        })
    }

    /// Use a fixed seed, making every sequence of reads reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.generator.reseed(seed);
        self
    }
}

#[async_trait::async_trait]
impl DataSource for RandomStringSource {
    async fn read_data(&self) -> Result<Record> {
        let length = self.str_length;
        Ok(self.generator.sample(&self.names, |rng| {
            let text: String = (0..length)
                .map(|_| STRING_ALPHABET[rng.gen_range(0..STRING_ALPHABET.len())] as char)
                .collect();
            Value::Text(text)
        }))
    }

    fn all_variable_names(&self) -> &[String] {
        &self.names
    }
}

/// Factory for creating random number sources
pub struct RandomNumbersFactory;

impl DataSourceFactory for RandomNumbersFactory {
    fn create(&self, config: &SourceKind) -> Result<Box<dyn DataSource>> {
        match config {
            SourceKind::RandomNumbers {
                size,
                key_missing_rate,
                value_missing_rate,
            } => Ok(Box::new(RandomDataSource::new(
                *size,
                *key_missing_rate,
                *value_missing_rate,
            )?)),
            _ => Err(Error::config("Invalid config for random number source")),
        }
    }
}

/// Factory for creating random string sources
pub struct RandomStringsFactory;

impl DataSourceFactory for RandomStringsFactory {
    fn create(&self, config: &SourceKind) -> Result<Box<dyn DataSource>> {
        match config {
            SourceKind::RandomStrings {
                size,
                str_length,
                key_missing_rate,
                value_missing_rate,
            } => Ok(Box::new(RandomStringSource::new(
                *size,
                *str_length,
                *key_missing_rate,
                *value_missing_rate,
            )?)),
            _ => Err(Error::config("Invalid config for random string source")),
        }
    }
}

/// Register the random sources with a registry
pub fn register(registry: &PluginRegistry) {
    registry.register_source("random_numbers", Box::new(RandomNumbersFactory));
    registry.register_source("random_strings", Box::new(RandomStringsFactory));
    tracing::debug!("Registered random_numbers and random_strings sources");
}
