// Simulation configuration for the EMOS simulator
use core::fmt;
use log::LevelFilter;

/// Number of MLFQ ready levels (0 = highest priority)
pub const LEVELS: usize = 3;

/// Lowest (last) ready level
pub const MAX_LEVEL: usize = LEVELS - 1;

/// Physical memory size of the reference configuration, in units
pub const MEMORY_SIZE: usize = 1024;

/// Quantum per level of the reference configuration, in ticks
pub const DEFAULT_QUANTA: [u32; LEVELS] = [4, 8, 16];

/// Ticks simulated by a `run` command that gives no count
pub const DEFAULT_RUN_TICKS: u64 = 200;

/// Environment variable consulted for the log level
pub const LOG_ENV: &str = "EMOS_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    pub memory_size: usize,
    pub quanta: [u32; LEVELS],
    /// Start new processes at their (clamped) priority hint instead of level 0
    pub honor_priority_hint: bool,
    pub log_level: LevelFilter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    ZeroMemory,
    ZeroQuantum,
    QuantaNotIncreasing,
    UnknownFlag(String),
    MissingValue(&'static str),
    BadValue(&'static str, String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::ZeroMemory => write!(f, "memory size must be greater than zero"),
            ConfigError::ZeroQuantum => write!(f, "every quantum must be greater than zero"),
            ConfigError::QuantaNotIncreasing => write!(f, "quanta must be strictly increasing"),
            ConfigError::UnknownFlag(flag) => write!(f, "unknown flag '{}'", flag),
            ConfigError::MissingValue(flag) => write!(f, "missing value for {}", flag),
            ConfigError::BadValue(flag, value) => write!(f, "bad value '{}' for {}", value, flag),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            memory_size: MEMORY_SIZE,
            quanta: DEFAULT_QUANTA,
            honor_priority_hint: false,
            log_level: LevelFilter::Info,
        }
    }
}

impl SimConfig {
    /// Check the memory size and the quantum table
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.memory_size == 0 {
            return Err(ConfigError::ZeroMemory);
        }
        if self.quanta.iter().any(|&q| q == 0) {
            return Err(ConfigError::ZeroQuantum);
        }
        if self.quanta.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ConfigError::QuantaNotIncreasing);
        }
        Ok(())
    }

    /// Build a configuration from command line arguments (program name already skipped).
    ///
    /// Recognised flags: `--memory N`, `--quanta a,b,c`, `--honor-priority`
    /// and `--log LEVEL`. Without `--log`, `EMOS_LOG` is used when set.
    pub fn from_args<I, S>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut config = SimConfig::default();
        let mut log_given = false;
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_ref() {
                "--memory" => {
                    let value = next_value(&mut args, "--memory")?;
                    config.memory_size = value
                        .parse()
                        .map_err(|_| ConfigError::BadValue("--memory", value))?;
                }
                "--quanta" => {
                    let value = next_value(&mut args, "--quanta")?;
                    config.quanta = parse_quanta(&value)?;
                }
                "--honor-priority" => config.honor_priority_hint = true,
                "--log" => {
                    let value = next_value(&mut args, "--log")?;
                    config.log_level = parse_level(&value)?;
                    log_given = true;
                }
                other => return Err(ConfigError::UnknownFlag(other.to_string())),
            }
        }

        if !log_given {
            if let Ok(value) = std::env::var(LOG_ENV) {
                config.log_level = parse_level(&value)?;
            }
        }

        config.validate()?;
        Ok(config)
    }
}

fn next_value<I, S>(args: &mut I, flag: &'static str) -> Result<String, ConfigError>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    args.next()
        .map(|s| s.as_ref().to_string())
        .ok_or(ConfigError::MissingValue(flag))
}

fn parse_quanta(value: &str) -> Result<[u32; LEVELS], ConfigError> {
    let bad = || ConfigError::BadValue("--quanta", value.to_string());
    let parsed: Vec<u32> = value
        .split(',')
        .map(|part| part.trim().parse::<u32>())
        .collect::<Result<_, _>>()
        .map_err(|_| bad())?;
    parsed.try_into().map_err(|_| bad())
}

fn parse_level(value: &str) -> Result<LevelFilter, ConfigError> {
    value
        .parse::<LevelFilter>()
        .map_err(|_| ConfigError::BadValue("--log", value.to_string()))
}
