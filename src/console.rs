// Console logging for the EMOS simulator
//
// Backs the `log` facade with a single writer shared by the whole program.
use alloc::boxed::Box;
use lazy_static::lazy_static;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use spin::Mutex;
use std::io::{self, Write};

lazy_static! {
    static ref SINK: Mutex<Box<dyn Write + Send>> = Mutex::new(Box::new(io::stderr()));
}

struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut sink = SINK.lock();
        // A failed log write is dropped; there is nowhere else to report it
        let _ = writeln!(sink, "[{:<5}] {}", record.level(), record.args());
    }

    fn flush(&self) {
        let _ = SINK.lock().flush();
    }
}

/// Install the console logger at `level`
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}

/// Send all further log lines to `sink`
pub fn redirect(sink: Box<dyn Write + Send>) {
    let mut current = SINK.lock();
    let _ = current.flush();
    *current = sink;
}
