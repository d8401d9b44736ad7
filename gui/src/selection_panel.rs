use dioxus::prelude::*;
use scope_viewer::LassoSelection;

/// Lists lasso selections with visibility, removal and export controls.
#[component]
pub fn SelectionPanel(
    selections: ReadSignal<Vec<LassoSelection>>,
    on_toggle: EventHandler<u32>,
    on_remove: EventHandler<u32>,
    on_export: EventHandler<u32>,
) -> Element {
    rsx! {
        div { class: "selection-panel",
            h3 { "Selections" }
            if selections.read().is_empty() {
                p { class: "hint", "Draw a lasso around cells to create a selection." }
            }
            for selection in selections.read().iter().cloned() {
                div { class: "selection-row", key: "{selection.id}",
                    input {
                        r#type: "checkbox",
                        checked: selection.selected,
                        onchange: move |_| on_toggle.call(selection.id),
                    }
                    span {
                        class: "swatch",
                        style: "background-color: {selection.color.to_css()};",
                    }
                    span { class: "selection-label",
                        "Selection {selection.id} ({selection.points.len()} cells)"
                    }
                    button { onclick: move |_| on_export.call(selection.id), "Export" }
                    button { onclick: move |_| on_remove.call(selection.id), "Remove" }
                }
            }
        }
    }
}
