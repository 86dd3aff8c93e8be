//! Browser console plumbing: a `log` backend and a panic hook.
//!
//! Both are no-ops off wasm32 so the bridge can be unit-tested natively.

use log::{Level, LevelFilter, Log, Metadata, Record};

/// Forwards `log` records to `console.*`.
struct ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!("[{}] {}", record.target(), record.args());
        write(record.level(), &line);
    }

    fn flush(&self) {}
}

#[cfg(target_arch = "wasm32")]
fn write(level: Level, line: &str) {
    let value = wasm_bindgen::JsValue::from_str(line);
    match level {
        Level::Error => web_sys::console::error_1(&value),
        Level::Warn => web_sys::console::warn_1(&value),
        Level::Info => web_sys::console::info_1(&value),
        Level::Debug | Level::Trace => web_sys::console::debug_1(&value),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn write(level: Level, line: &str) {
    if level <= Level::Warn {
        eprintln!("{line}");
    }
}

static LOGGER: ConsoleLogger = ConsoleLogger;

/// Install the console logger once. Later calls only adjust the level.
pub fn init_logging(level: LevelFilter) {
    // Already installed (by us or the embedding app) is fine.
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}

/// Route panics to `console.error` instead of an opaque `unreachable`.
pub fn install_panic_hook() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("Flow canvas WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

/// Parse a level name as sent by the host (`"warn"`, `"debug"`, ...).
pub fn parse_level(name: &str) -> LevelFilter {
    name.parse().unwrap_or(LevelFilter::Warn)
}
