use pulldown_cmark::{Parser, Options, html, Event as MdEvent};
use std::io;
use tracing::{Level, Metadata};
use tracing_subscriber::fmt::MakeWriter;
use web_sys::console;
use yew::{Html, AttrValue};

pub fn set_panic_hook() {
    // Routes panic messages to the browser console instead of "unreachable executed".
    console_error_panic_hook::set_once();
}

/// Installs the global `tracing` subscriber writing to the browser console.
pub fn init_logging(level: Level) {
    let result = tracing_subscriber::fmt()
        .with_writer(ConsoleMakeWriter)
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .try_init();
    if let Err(e) = result {
        console::warn_1(&format!("logging already initialized: {}", e).into());
    }
}

/// Buffers one formatted event and emits it on drop with the console method
/// matching its level.
pub struct ConsoleWriter {
    level: Level,
    buf: Vec<u8>,
}

impl io::Write for ConsoleWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&self.buf);
        let line = line.trim_end();
        match self.level {
            Level::ERROR => console::error_1(&line.into()),
            Level::WARN => console::warn_1(&line.into()),
            _ => console::log_1(&line.into()),
        }
        self.buf.clear();
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        let _ = io::Write::flush(self);
    }
}

pub struct ConsoleMakeWriter;

impl<'a> MakeWriter<'a> for ConsoleMakeWriter {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleWriter { level: Level::INFO, buf: Vec::new() }
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        ConsoleWriter { level: *meta.level(), buf: Vec::new() }
    }
}

/// Current time as Unix milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// First `max` characters of `text` (char-boundary safe).
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Markdown to HTML. Raw HTML in the source is emitted as escaped text.
pub fn markdown_to_html(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);

    let parser = Parser::new_ext(text, options).map(|event| match event {
        MdEvent::SoftBreak => MdEvent::HardBreak,
        MdEvent::Html(raw) => MdEvent::Text(raw),
        _ => event,
    });

    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);
    format!(r#"<div class="markdown-body">{}</div>"#, html_output)
}

pub fn render_markdown(text: &str) -> Html {
    Html::from_html_unchecked(AttrValue::from(markdown_to_html(text)))
}
