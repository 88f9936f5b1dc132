//! `tracing` output for targets without stdout.
//!
//! The macroquad wasm loader has no wasm-bindgen glue, so events are
//! flattened to one line each and handed to a sink; the browser build's
//! sink is miniquad's console logger.

use std::fmt::{self, Write as _};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

/// Renders an event as `target: message key=value ...`.
fn event_line(event: &Event<'_>) -> String {
    let mut visitor = LineVisitor::default();
    event.record(&mut visitor);
    format!(
        "{}: {}{}",
        event.metadata().target(),
        visitor.message,
        visitor.fields
    )
}

pub struct ConsoleLayer<F> {
    sink: F,
}

impl<F> ConsoleLayer<F>
where
    F: Fn(Level, &str) + Send + Sync + 'static,
{
    pub fn new(sink: F) -> Self {
        Self { sink }
    }
}

impl<S, F> Layer<S> for ConsoleLayer<F>
where
    S: Subscriber,
    F: Fn(Level, &str) + Send + Sync + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        (self.sink)(*event.metadata().level(), &event_line(event));
    }
}

#[cfg(target_arch = "wasm32")]
pub fn miniquad_sink(level: Level, line: &str) {
    use macroquad::miniquad;

    match level {
        Level::ERROR => miniquad::error!("{}", line),
        Level::WARN => miniquad::warn!("{}", line),
        Level::INFO => miniquad::info!("{}", line),
        _ => miniquad::debug!("{}", line),
    }
}
