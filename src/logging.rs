//! Logger stderr de l'outil en ligne de commande
//!
//! Les messages sont écrits sous la forme `[LEVEL] message`. Le niveau vient
//! de la variable d'environnement `FATCHECK_LOG` (`off`, `error`, `warn`,
//! `info`, `debug`, `trace`); sans elle, `Debug` en build debug et `Warn` en
//! release.

use std::env;
use std::io::{self, Write};

use log::{LevelFilter, Log, Metadata, Record};

pub const LEVEL_VAR: &str = "FATCHECK_LOG";

static LOGGER: Logger = Logger;

pub struct Logger;

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let _ = writeln!(io::stderr().lock(), "[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

fn default_level() -> LevelFilter {
    #[cfg(debug_assertions)]
    {
        LevelFilter::Debug
    }
    #[cfg(not(debug_assertions))]
    {
        LevelFilter::Warn
    }
}

pub fn init() {
    let level = env::var(LEVEL_VAR)
        .ok()
        .and_then(|v| v.parse::<LevelFilter>().ok())
        .unwrap_or_else(default_level);

    // un second init garde le premier logger
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}
