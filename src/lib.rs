// cargo: dep = "yew"
// cargo: dep = "serde"
// cargo: dep = "serde_json"
// cargo: dep = "reqwest"
// cargo: dep = "pulldown-cmark"
// cargo: dep = "wasm-bindgen"
// cargo: dep = "wasm-bindgen-futures"
// cargo: dep = "web-sys"
// cargo: dep = "uuid"
// cargo: dep = "js-sys"
// cargo: dep = "anyhow"
// cargo: dep = "console_error_panic_hook"
// cargo: dep = "thiserror"
// cargo: dep = "async-trait"
// cargo: dep = "base64"
// cargo: dep = "chrono"
// cargo: dep = "tracing"
// cargo: dep = "tracing-subscriber"

mod components;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
mod utils;
mod app;

use wasm_bindgen::prelude::*;
use app::App;

#[wasm_bindgen(start)]
pub fn run_app() {
    utils::set_panic_hook();
    utils::init_logging(config::AppConfig::from_env().log_level);
    yew::Renderer::<App>::new().render();
}
