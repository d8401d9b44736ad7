#![allow(non_snake_case)]

mod file_load;
mod selection_panel;
mod viewer_window;

use dioxus::{
    desktop::{Config, LogicalSize, WindowBuilder},
    prelude::*,
};
use viewer_window::ViewerWindow;

static CSS_STYLE: Asset = asset!("assets/viewer.css");

#[component]
fn App() -> Element {
    rsx! {
        document::Stylesheet { href: CSS_STYLE }
        div { class: "main_div", ViewerWindow {} }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    LaunchBuilder::new()
        .with_cfg(
            Config::new().with_window(
                WindowBuilder::new()
                    .with_title("SCope Viewer")
                    .with_always_on_top(false)
                    .with_inner_size(LogicalSize::new(1200.0, 900.0)),
            ),
        )
        .launch(App);
}
