use std::any::Any;
use std::panic::{self, AssertUnwindSafe, PanicHookInfo, catch_unwind};

use crate::error::{TileError, TileResult};
use crate::logging::{LogLevel, Logger, TARGET_RENDER, emit, json_kv, json_str};

type PanicHook = Box<dyn Fn(&PanicHookInfo<'_>) + Send + Sync + 'static>;

/// Run tile code inside the per-tile failure boundary. Both returned errors
/// and panics come back as `Err`.
pub fn contain<T, F>(f: F) -> TileResult<T>
where
    F: FnOnce() -> TileResult<T>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(TileError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Replaces the process panic hook while alive, so panics caught by
/// [`contain`] do not print to stderr over a full-screen terminal. The
/// message goes to the logger instead. Dropping restores the previous hook.
pub struct QuietPanicHook {
    previous: Option<PanicHook>,
}

impl QuietPanicHook {
    pub fn install(logger: Option<Logger>) -> Self {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let mut fields = vec![json_str("message", panic_message(info.payload()))];
            if let Some(location) = info.location() {
                fields.push(json_str("file", location.file()));
                fields.push(json_kv("line", location.line()));
            }
            emit(logger.as_ref(), LogLevel::Error, TARGET_RENDER, "panic", fields);
        }));
        Self {
            previous: Some(previous),
        }
    }
}

impl Drop for QuietPanicHook {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            panic::set_hook(previous);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemorySink;
    use serde_json::json;

    #[test]
    fn panics_become_errors() {
        let result: TileResult<()> = contain(|| panic!("boom"));
        assert_eq!(result, Err(TileError::Panicked("boom".into())));
    }

    #[test]
    fn quiet_hook_routes_panics_to_the_logger() {
        let sink = MemorySink::new();
        let hook = QuietPanicHook::install(Some(Logger::new(sink.clone())));
        let result: TileResult<()> = contain(|| panic!("tile blew up"));
        drop(hook);

        assert_eq!(result, Err(TileError::Panicked("tile blew up".into())));
        let events = sink.events();
        let event = events
            .iter()
            .find(|e| e.fields.get("message") == Some(&json!("tile blew up")))
            .unwrap();
        assert_eq!(event.level, LogLevel::Error);
        assert_eq!(event.message, "panic");
        assert!(event.fields.contains_key("line"));
    }

    #[test]
    fn errors_pass_through() {
        let result: TileResult<u8> = contain(|| Err(TileError::msg("bad")));
        assert_eq!(result, Err(TileError::msg("bad")));
        assert_eq!(contain(|| Ok(3)), Ok(3));
    }
}
