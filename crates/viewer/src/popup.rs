//! The paginated popup opened by clicking a feature.
//!
//! All page logic lives in `geo_join::pager`; this component owns the
//! authoritative `Pager` behind a `RefCell` (so two quick clicks cannot race
//! past the single-flight guard), keeps a rendered `PagerView` in yew state,
//! and drops late responses once the popup has been closed.

use std::rc::Rc;

use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

use geo_join::pager::PagerPhase;
use geo_join::query::Row;
use geo_join::{DisplayFields, Pager};

use crate::AppContext;

#[derive(Properties, PartialEq)]
pub struct PopupProps {
    /// Anchor, in css px inside the map container.
    pub x: f64,
    pub y: f64,
    /// Normalized join key; `None` renders the shell but never fetches.
    pub id: Option<String>,
    /// Source key of the clicked layer, shown next to the id.
    pub kind: String,
    /// Eager-join mode: the row annotation attached to the feature at
    /// startup (or `None` inside when the feature matched nothing).
    pub preloaded: Option<Option<Row>>,
    pub context: Rc<AppContext>,
    pub on_close: Callback<()>,
}

#[function_component(Popup)]
pub fn popup(props: &PopupProps) -> Html {
    let pager = use_mut_ref(|| Pager::new(props.context.config.backend.page_size));
    let view = use_state(|| pager.borrow().view());
    let rows: UseStateHandle<Rc<Vec<Row>>> = use_state(|| Rc::new(Vec::new()));
    let alive = use_mut_ref(|| true);

    let load_page = {
        let pager = pager.clone();
        let view = view.clone();
        let rows = rows.clone();
        let alive = alive.clone();
        let client = props.context.client.clone();
        let id = props.id.clone();
        Callback::from(move |page: usize| {
            let Some(key) = id.clone() else {
                return;
            };
            let window = pager.borrow_mut().begin(page);
            let Some(window) = window else {
                return;
            };
            view.set(pager.borrow().view());

            let pager = pager.clone();
            let view = view.clone();
            let rows = rows.clone();
            let alive = alive.clone();
            let client = client.clone();
            spawn_local(async move {
                let result = client.fetch_page(&key, window).await;
                if !*alive.borrow() {
                    // Popup closed mid-flight; never touch detached state.
                    return;
                }
                match result {
                    Ok(page_result) => {
                        pager.borrow_mut().finish(page_result.total);
                        rows.set(Rc::new(page_result.rows));
                    }
                    Err(e) => {
                        log::error!("page fetch failed: {e}");
                        pager.borrow_mut().fail(e.to_string());
                    }
                }
                view.set(pager.borrow().view());
            });
        })
    };

    {
        let load_page = load_page.clone();
        let alive = alive.clone();
        let eager = props.preloaded.is_some();
        use_effect_with((), move |_| {
            if !eager {
                load_page.emit(0);
            }
            move || {
                *alive.borrow_mut() = false;
            }
        });
    }

    let on_prev = {
        let pager = pager.clone();
        let load_page = load_page.clone();
        Callback::from(move |_: MouseEvent| {
            if let Some(page) = pager.borrow().prev_page() {
                load_page.emit(page);
            }
        })
    };
    let on_next = {
        let pager = pager.clone();
        let load_page = load_page.clone();
        Callback::from(move |_: MouseEvent| {
            if let Some(page) = pager.borrow().next_page() {
                load_page.emit(page);
            }
        })
    };
    let on_close = {
        let cb = props.on_close.clone();
        Callback::from(move |_: MouseEvent| cb.emit(()))
    };

    let projection = &props.context.config.display;

    // Eager mode renders its single preloaded page; per-click mode renders
    // whatever the pager says.
    let (view, items) = match &props.preloaded {
        Some(annotation) => {
            let rows: Vec<&Row> = annotation.iter().collect();
            let fields = rows.iter().map(|r| projection.project(r)).collect();
            (preloaded_view(rows.len()), render_items(fields, true))
        }
        None => {
            let fields = rows.iter().map(|r| projection.project(r)).collect();
            let loaded = matches!(*pager.borrow().phase(), PagerPhase::Loaded);
            let v = (*view).clone();
            let items = match &v.error {
                Some(message) => html! { <div class="muted">{message.clone()}</div> },
                None => render_items(fields, loaded),
            };
            (v, items)
        }
    };

    html! {
        <div class="popup" style={format!("left: {}px; top: {}px;", props.x, props.y)}>
            <div class="popup-row">
                <div>
                    <b>{"ID"}</b>{": "}
                    {props.id.clone().unwrap_or_else(|| "—".to_string())}
                    <span class="muted">{format!(" ({})", props.kind)}</span>
                </div>
                <button class="popup-close" onclick={on_close}>{"×"}</button>
            </div>
            <div class="muted">{view.status.clone()}</div>
            <hr />
            <div class="popup-items">{items}</div>
            <hr />
            <div class="popup-row popup-nav">
                <button disabled={!view.prev_enabled} onclick={on_prev}>{"◀ Prev"}</button>
                <div class="muted">{view.indicator.clone()}</div>
                <button disabled={!view.next_enabled} onclick={on_next}>{"Next ▶"}</button>
            </div>
        </div>
    }
}

// Only a completed load shows the empty-state placeholder; while a first
// fetch is in flight the items area stays blank.
fn render_items(fields: Vec<DisplayFields>, show_empty: bool) -> Html {
    if fields.is_empty() {
        if show_empty {
            return html! { <div class="muted">{"No associated data."}</div> };
        }
        return html! {};
    }
    html! {
        <>
            {for fields.into_iter().map(|f| html! {
                <div class="popup-item">
                    <div class="popup-item-title">{f.title}</div>
                    if let Some(subtitle) = f.subtitle {
                        <div class="popup-item-sub">{subtitle}</div>
                    }
                </div>
            })}
        </>
    }
}

fn preloaded_view(count: usize) -> geo_join::PagerView {
    geo_join::PagerView {
        indicator: "Page 1 / 1".to_string(),
        status: format!("{count} linked item(s)"),
        prev_enabled: false,
        next_enabled: false,
        error: None,
    }
}
