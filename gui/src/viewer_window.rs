use std::cell::RefCell;
use std::fs::File;
use std::io::BufWriter;
use std::rc::Rc;

use dioxus::html::input_data::MouseButton;
use dioxus::prelude::*;
use scope_viewer::zoom::ZoomOutcome;
use scope_viewer::{
    BitmapSurface, Feature, FeatureKind, LassoSelection, Point, Settings, SettingsHandle, Tool,
    Viewer, ViewerConfig, ZoomBehavior, load_dataset, refresh_colors,
};

use crate::file_load::{CONFIG_FILE, DatasetFiles, load_backend};
use crate::selection_panel::SelectionPanel;

const FEATURE_KINDS: [&str; 5] = ["gene", "regulon", "metric", "annotation", "clustering"];

const TOOLS: [(&str, Tool); 3] = [
    ("Lasso", Tool::Lasso),
    ("Semantic zoom", Tool::SemanticZoom),
    ("Geometric zoom", Tool::GeometricZoom),
];

fn feature(kind: &str, value: &str) -> Feature {
    let value = value.trim();
    let kind = match kind {
        "regulon" => FeatureKind::Regulon,
        "metric" => FeatureKind::Metric,
        "annotation" => FeatureKind::Annotation,
        "clustering" => FeatureKind::Clustering(value.to_string()),
        _ => FeatureKind::Gene,
    };
    Feature::new(kind, value)
}

fn element_point(data: &MouseData) -> Point {
    let local_coords = data.coordinates().element();
    Point::new(local_coords.x as f32, local_coords.y as f32)
}

fn bump(mut revision: Signal<u64>) {
    *revision.write() += 1;
}

/// One viewer with its drawing surface and the wheel/drag accumulator that
/// feeds it gestures.
#[derive(Clone)]
pub struct Session {
    viewer: Rc<RefCell<Viewer>>,
    surface: Rc<RefCell<BitmapSurface>>,
    zoom: Rc<RefCell<ZoomBehavior>>,
    settings: SettingsHandle,
    size: (u32, u32),
}

impl Session {
    fn new() -> anyhow::Result<Self> {
        let config = ViewerConfig::load(CONFIG_FILE)?;
        let settings = SettingsHandle::new(Settings {
            sprite_scale: config.sprite_scale,
            ..Default::default()
        });
        let zoom = ZoomBehavior::new(config.scale_extent);
        let size = (config.width, config.height);
        let viewer = Viewer::new(config, settings.clone())?;
        Ok(Self {
            viewer: Rc::new(RefCell::new(viewer)),
            surface: Rc::new(RefCell::new(BitmapSurface::new())),
            zoom: Rc::new(RefCell::new(zoom)),
            settings,
            size,
        })
    }

    /// Presents a frame if the viewer changed and returns the new image.
    fn redraw(&self) -> Option<String> {
        let mut surface = self.surface.borrow_mut();
        match self.viewer.borrow_mut().render(&mut *surface) {
            Ok(true) => Some(surface.data_uri()),
            Ok(false) => None,
            Err(e) => {
                log::error!("Failed to render frame: {e:#}");
                None
            }
        }
    }
}

#[component]
pub fn ViewerWindow() -> Element {
    let session = use_hook(|| Session::new().map(Signal::new).map_err(|e| format!("{e:#}")));
    match session {
        Ok(session) => rsx! {
            ViewerPane { session }
        },
        Err(e) => rsx! {
            p { class: "error-message", "Error: {e}" }
        },
    }
}

#[component]
fn ViewerPane(session: Signal<Session>) -> Element {
    let mut message = use_signal(|| None::<String>);
    let mut image_src = use_signal(String::new);
    let mut selections = use_signal(Vec::<LassoSelection>::new);
    let frame_rev = use_signal(|| 0u64);
    let loaded_rev = use_signal(|| 0u64);
    let color_rev = use_signal(|| 0u64);
    let mut tool = use_signal(|| session.peek().viewer.borrow().tool());
    let mut sample_index = use_signal(|| 0usize);
    let mut hover = use_signal(Point::default);
    let mut drag_from = use_signal(|| None::<Point>);
    let mut draft_features =
        use_signal(|| std::array::from_fn::<_, 3, _>(|_| ("gene".to_string(), String::new())));
    let mut features = use_signal(Vec::<Feature>::new);
    let mut settings_view = use_signal(|| session.peek().settings.get());

    // normalisation changes refetch colors, any change redraws
    let subscription = use_hook(move || {
        let settings = session.peek().settings.clone();
        let mut normalization = settings.get().normalization();
        let id = settings.subscribe(move |s| {
            settings_view.set(*s);
            if s.normalization() != normalization {
                normalization = s.normalization();
                bump(color_rev);
            }
            bump(frame_rev);
        });
        (settings, id)
    });
    use_drop(move || {
        subscription.0.unsubscribe(subscription.1);
    });

    // RESOURCE 1: read every dataset in the working directory
    let backend = use_resource(move || async move {
        let files = DatasetFiles::from_paths_file()?;
        let backend = load_backend(files.clone()).await?;
        anyhow::Ok((files, Rc::new(backend)))
    });

    let current_dataset = use_memo(move || match &*backend.read() {
        Some(Ok((files, _))) => files
            .file_list()
            .get(*sample_index.read())
            .map(|f| f.name.clone()),
        _ => None,
    });
    let dataset_count = use_memo(move || match &*backend.read() {
        Some(Ok((files, _))) => files.file_list().len(),
        _ => 0,
    });

    // RESOURCE 2: coordinates of the current dataset
    let _ = use_resource(move || async move {
        let Some(name) = current_dataset() else {
            return;
        };
        let data = backend
            .peek()
            .as_ref()
            .and_then(|r| r.as_ref().ok())
            .map(|(_, b)| b.clone());
        let Some(data) = data else {
            return;
        };
        let viewer = session.peek().viewer.clone();
        match load_dataset(&viewer, &*data, &name).await {
            Ok(()) => {
                message.set(None);
                bump(loaded_rev);
            }
            Err(e) if e.is_stale() => {}
            Err(e) => message.set(Some(format!("Failed to load {name}: {e}"))),
        }
        bump(frame_rev);
    });

    // RESOURCE 3: feature colors, refetched on dataset, feature or
    // normalisation changes
    let _ = use_resource(move || async move {
        if loaded_rev() == 0 {
            return;
        }
        let _ = color_rev();
        let features = features();
        let data = backend
            .peek()
            .as_ref()
            .and_then(|r| r.as_ref().ok())
            .map(|(_, b)| b.clone());
        let Some(data) = data else {
            return;
        };
        let viewer = session.peek().viewer.clone();
        match refresh_colors(&viewer, &*data, &features).await {
            Ok(()) => {}
            Err(e) if e.is_stale() => {}
            Err(e) => message.set(Some(e.to_string())),
        }
        bump(frame_rev);
    });

    use_effect(move || {
        let _ = frame_rev();
        let session = session.peek();
        if let Some(src) = session.redraw() {
            image_src.set(src);
        }
        selections.set(session.viewer.borrow().selections().cloned().collect());
    });

    let mut set_tool = move |next: Tool| {
        let previous = *tool.peek();
        if previous == next {
            return;
        }
        let session = session.peek();
        session.viewer.borrow_mut().set_tool(next);
        if previous.zoom_mode() != next.zoom_mode() {
            session.zoom.borrow_mut().reset();
        }
        tool.set(next);
        bump(frame_rev);
    };

    let _ = frame_rev();
    let (width, height) = session.peek().size;
    let (cells, zoom_k, timings) = {
        let session = session.peek();
        let viewer = session.viewer.borrow();
        let mut timings: Vec<(String, f64)> = viewer
            .benchmarks()
            .iter()
            .map(|(name, took)| (name.to_string(), took.as_secs_f64() * 1000.0))
            .collect();
        timings.sort_by(|a, b| a.0.cmp(&b.0));
        (viewer.sprite_count(), viewer.zoom_scale(), timings)
    };

    rsx! {
        div {
            h1 { "SCope Viewer" }

            div { class: "controls",
                div { class: "control-group",
                    button {
                        disabled: dataset_count() < 2,
                        onclick: move |_| {
                            let count = dataset_count();
                            if count > 0 {
                                let next_index = (*sample_index.read() + 1) % count;
                                sample_index.set(next_index);
                            }
                        },
                        "Next Dataset"
                    }
                    p { "Current Dataset: {current_dataset().unwrap_or_default()}" }
                }

                div { class: "control-group",
                    for (label, t) in TOOLS {
                        button {
                            class: if tool() == t { "tool active" } else { "tool" },
                            onclick: move |_| set_tool(t),
                            "{label}"
                        }
                    }
                }

                for slot in 0..3 {
                    div { class: "control-group",
                        label { "Feature {slot + 1}:" }
                        select {
                            value: "{draft_features.read()[slot].0}",
                            onchange: move |evt| draft_features.write()[slot].0 = evt.value(),
                            for kind in FEATURE_KINDS {
                                option { value: kind, "{kind}" }
                            }
                        }
                        input {
                            r#type: "text",
                            value: "{draft_features.read()[slot].1}",
                            oninput: move |evt| draft_features.write()[slot].1 = evt.value(),
                            placeholder: "e.g., Actb",
                        }
                    }
                }
                div { class: "control-group",
                    button {
                        onclick: move |_| {
                            let parsed: Vec<Feature> = draft_features
                                .read()
                                .iter()
                                .filter(|(_, value)| !value.trim().is_empty())
                                .map(|(kind, value)| feature(kind, value))
                                .collect();
                            features.set(parsed);
                        },
                        "Apply Features"
                    }
                }

                div { class: "control-group",
                    label {
                        input {
                            r#type: "checkbox",
                            checked: settings_view().log_transform,
                            onchange: move |evt| {
                                let on = evt.checked();
                                session.peek().settings.update(|s| s.log_transform = on);
                            },
                        }
                        "Log transform"
                    }
                    label {
                        input {
                            r#type: "checkbox",
                            checked: settings_view().cpm_normalize,
                            onchange: move |evt| {
                                let on = evt.checked();
                                session.peek().settings.update(|s| s.cpm_normalize = on);
                            },
                        }
                        "CPM normalise"
                    }
                }
            }

            div { class: "status-message",
                {
                    match (&*backend.read(), message()) {
                        (Some(Err(e)), _) => rsx! {
                            p { class: "error-message", "Error: {e}" }
                        },
                        (_, Some(msg)) => rsx! {
                            p { class: "error-message", "{msg}" }
                        },
                        (Some(Ok(_)), None) => rsx! {
                            p { class: "loading-message", "{cells} cells, zoom x{zoom_k:.2}" }
                        },
                        (None, None) => rsx! {
                            p { class: "loading-message", "Loading datasets..." }
                        },
                    }
                }
                div { class: "timings",
                    for (name, ms) in timings {
                        span { class: "timing", key: "{name}", "{name}: {ms:.1} ms" }
                    }
                }
            }

            div { class: "viewer-row",
                img {
                    class: if tool() == Tool::Lasso { "viewer-canvas lasso" } else { "viewer-canvas" },
                    src: "{image_src()}",
                    width: "{width}",
                    height: "{height}",
                    draggable: "false",
                    onmousedown: move |evt| {
                        let p = element_point(&evt.data);
                        if *tool.peek() == Tool::Lasso {
                            session.peek().viewer.borrow_mut().pointer_down(p);
                            bump(frame_rev);
                        } else {
                            drag_from.set(Some(p));
                        }
                    },
                    onmousemove: move |evt| {
                        let p = element_point(&evt.data);
                        let primary = evt.data.held_buttons().contains(MouseButton::Primary);
                        hover.set(p);
                        let session = session.peek();
                        if *tool.peek() == Tool::Lasso {
                            if session.viewer.borrow_mut().pointer_move(p, primary) {
                                bump(frame_rev);
                            }
                        } else if let Some(from) = drag_from() {
                            if !primary {
                                drag_from.set(None);
                                return;
                            }
                            let gesture = session.zoom.borrow_mut().pan(p.x - from.x, p.y - from.y);
                            drag_from.set(Some(p));
                            session.viewer.borrow_mut().gesture(gesture);
                            bump(frame_rev);
                        }
                    },
                    onmouseup: move |_| {
                        drag_from.set(None);
                        if *tool.peek() != Tool::Lasso {
                            return;
                        }
                        let result = session.peek().viewer.borrow_mut().pointer_up();
                        match result {
                            Ok(Some(id)) => log::info!("Created lasso selection {id}"),
                            Ok(None) => {}
                            Err(e) => message.set(Some(e.to_string())),
                        }
                        bump(frame_rev);
                    },
                    onwheel: move |evt| {
                        evt.prevent_default();
                        let delta_y = evt.data.delta().strip_units().y as f32;
                        let session = session.peek();
                        let before = *session.zoom.borrow();
                        let gesture = session.zoom.borrow_mut().wheel(hover(), delta_y);
                        if session.viewer.borrow_mut().gesture(gesture) == ZoomOutcome::Ignored {
                            *session.zoom.borrow_mut() = before;
                        }
                        bump(frame_rev);
                    },
                }

                SelectionPanel {
                    selections,
                    on_toggle: move |id: u32| {
                        let result = session.peek().viewer.borrow_mut().toggle_selection(id);
                        if let Err(e) = result {
                            message.set(Some(e.to_string()));
                        }
                        bump(frame_rev);
                    },
                    on_remove: move |id: u32| {
                        let result = session.peek().viewer.borrow_mut().remove_selection(id);
                        if let Err(e) = result {
                            message.set(Some(e.to_string()));
                        }
                        bump(frame_rev);
                    },
                    on_export: move |id: u32| {
                        let dir = backend
                            .peek()
                            .as_ref()
                            .and_then(|r| r.as_ref().ok())
                            .map(|(files, _)| files.directory().to_path_buf())
                            .unwrap_or_default();
                        let path = dir.join(format!("selection_{id}.txt"));
                        let result = File::create(&path)
                            .map_err(anyhow::Error::from)
                            .and_then(|file| {
                                session.peek().viewer.borrow().export_selection(id, BufWriter::new(file))
                            });
                        match result {
                            Ok(()) => {
                                log::info!("Exported lasso selection {id} to {}", path.display());
                                message.set(None);
                            }
                            Err(e) => message.set(Some(format!("{e:#}"))),
                        }
                    },
                }
            }
        }
    }
}
