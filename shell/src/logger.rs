//! Stderr logger behind the `log` facade.
//!
//! `-v` raises the level to Debug; the default stays at warnings so
//! interactive output is not polluted.

use log::{Level, LevelFilter, Log, Metadata, Record};

static LOGGER: Logger = Logger;

pub struct Logger;

pub fn init(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    log::set_logger(&LOGGER).map(|()| log::set_max_level(level))
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let tag = match record.level() {
                Level::Error => 'E',
                Level::Warn => 'W',
                Level::Info => '*',
                Level::Debug => 'D',
                Level::Trace => 'T',
            };
            eprintln!("[{tag}] {}", record.args());
        }
    }

    fn flush(&self) {}
}
