mod popup;
mod remote;
mod render;
mod tiles;

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use gloo::events::EventListener;
use gloo::utils::{document, window};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{HtmlCanvasElement, HtmlElement, PointerEvent, WheelEvent};
use yew::prelude::*;

use geo_join::config::JoinMode;
use geo_join::features::parse_collection;
use geo_join::mercator::Camera;
use geo_join::query::Row;
use geo_join::AtlasConfig;

use popup::Popup;
use remote::RowClient;
use render::{draw_map, hit_feature, prepare_layer, PreparedLayer};
use tiles::TileCache;

fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    install_global_alerts();
    yew::Renderer::<App>::new().render();
}

/// Built once at startup and passed explicitly to everything that talks to
/// the backend; there is no module-global map or client.
#[derive(PartialEq)]
pub struct AppContext {
    pub config: AtlasConfig,
    pub client: RowClient,
}

fn alert(message: &str) {
    let _ = window().alert_with_message(message);
}

/// Last-resort net: anything uncaught becomes a blocking alert.
fn install_global_alerts() {
    EventListener::new(&window(), "error", |event| {
        let message = event
            .dyn_ref::<web_sys::ErrorEvent>()
            .map(|e| e.message())
            .unwrap_or_else(|| "unknown error".to_string());
        alert(&format!("Error: {message}"));
    })
    .forget();
    EventListener::new(&window(), "unhandledrejection", |event| {
        let reason = event
            .dyn_ref::<web_sys::PromiseRejectionEvent>()
            .map(|e| e.reason())
            .unwrap_or(wasm_bindgen::JsValue::UNDEFINED);
        let message = reason
            .as_string()
            .unwrap_or_else(|| format!("{reason:?}"));
        alert(&format!("Error: {message}"));
    })
    .forget();
}

// ─── Map State ──────────────────────────────────────────────────────

struct PointerState {
    distance_travelled: f64,
    last_x: f64,
    last_y: f64,
    down_time: f64,
}

struct MapState {
    camera: Camera,
    tiles: TileCache,
    pointers: HashMap<i32, PointerState>,
}

#[derive(Clone, PartialEq)]
struct PopupRequest {
    seq: u32,
    lng: f64,
    lat: f64,
    id: Option<String>,
    kind: String,
    /// `Some` in eager-join mode: the row annotated onto the feature (or
    /// `None` inside when nothing matched).
    preloaded: Option<Option<Row>>,
}

fn map_canvas() -> Option<HtmlCanvasElement> {
    document()
        .get_element_by_id("map")
        .and_then(|el| el.dyn_into().ok())
}

fn map_container() -> Option<HtmlElement> {
    document()
        .get_element_by_id("mapcontainer")
        .and_then(|el| el.dyn_into().ok())
}

fn container_size() -> (f64, f64) {
    match map_container() {
        Some(el) => (el.client_width() as f64, el.client_height() as f64),
        None => (0.0, 0.0),
    }
}

fn set_map_cursor(cursor: &str) {
    if let Some(el) = map_container() {
        let _ = el.style().set_property("cursor", cursor);
    }
}

// ─── App Component ──────────────────────────────────────────────────

#[function_component(App)]
fn app() -> Html {
    let context: UseStateHandle<Option<Rc<AppContext>>> = use_state(|| None);
    let map_state: UseStateHandle<Option<Rc<RefCell<MapState>>>> = use_state(|| None);
    let layers: UseStateHandle<Vec<Rc<PreparedLayer>>> = use_state(Vec::new);
    let annotations: UseStateHandle<Option<Rc<HashMap<String, Row>>>> = use_state(|| None);
    let popup_req: UseStateHandle<Option<PopupRequest>> = use_state(|| None);
    let loading = use_state(|| true);
    let error: UseStateHandle<Option<String>> = use_state(|| None);

    // Monotonic redraw trigger. The counter lives outside yew state so
    // long-lived callbacks (tile loads, resize) never set a stale value.
    let redraw = use_state(|| 0u32);
    let epoch = use_mut_ref(|| 0u32);
    let bump = {
        let redraw = redraw.clone();
        let epoch = epoch.clone();
        Callback::from(move |_: ()| {
            let mut e = epoch.borrow_mut();
            *e += 1;
            redraw.set(*e);
        })
    };

    let popup_seq = use_mut_ref(|| 0u32);

    // ─── Bootstrap: config, camera, layers, eager join ──────────
    {
        let context = context.clone();
        let map_state = map_state.clone();
        let layers = layers.clone();
        let annotations = annotations.clone();
        let loading = loading.clone();
        let error = error.clone();
        let bump = bump.clone();

        use_effect_with((), move |_| {
            spawn_local(async move {
                let config = match remote::fetch_config("config.json").await {
                    Ok(config) => config,
                    Err(e) => {
                        error.set(Some(e.to_string()));
                        loading.set(false);
                        alert(&format!("Error: {e}"));
                        return;
                    }
                };

                let camera = Camera::new(
                    config.map.center[0],
                    config.map.center[1],
                    config.map.zoom,
                    config.map.basemap.max_zoom as f64,
                );
                let tiles = TileCache::new(
                    config.map.basemap.tile_url.clone(),
                    config.map.basemap.subdomains.clone(),
                    bump.clone(),
                );
                map_state.set(Some(Rc::new(RefCell::new(MapState {
                    camera,
                    tiles,
                    pointers: HashMap::new(),
                }))));

                let client = RowClient::new(&config.backend);
                let ctx = Rc::new(AppContext {
                    config: config.clone(),
                    client,
                });
                context.set(Some(ctx.clone()));
                loading.set(false);

                // Sources load in order; the first failure aborts the rest.
                let mut prepared: Vec<Rc<PreparedLayer>> = Vec::new();
                for source in &config.sources {
                    let raw = match remote::fetch_geojson(&source.url).await {
                        Ok(raw) => raw,
                        Err(e) => {
                            alert(&format!("Error: {e}"));
                            return;
                        }
                    };
                    match parse_collection(&raw, &source.id_property) {
                        Ok(features) => {
                            log::info!("{}: {} features", source.key, features.len());
                            prepared.push(Rc::new(prepare_layer(source, features)));
                            layers.set(prepared.clone());
                            bump.emit(());
                        }
                        Err(e) => {
                            alert(&format!("Error: {e}"));
                            return;
                        }
                    }
                }

                if config.backend.join_mode == JoinMode::Eager {
                    let ids: BTreeSet<String> = prepared
                        .iter()
                        .flat_map(|layer| layer.features.iter())
                        .filter_map(|f| f.id.clone())
                        .collect();
                    match ctx.client.fetch_all(&ids).await {
                        Ok(rows) => {
                            log::info!("eager join: {} of {} ids matched", rows.len(), ids.len());
                            annotations.set(Some(Rc::new(rows)));
                        }
                        Err(e) => alert(&format!("Error: {e}")),
                    }
                }
            });
            || ()
        });
    }

    // Redraw after every render once the map exists.
    {
        let map_state = map_state.clone();
        let layers = layers.clone();
        use_effect(move || {
            if let (Some(state), Some(canvas)) = ((*map_state).clone(), map_canvas()) {
                let dpr = window().device_pixel_ratio();
                let mut st = state.borrow_mut();
                let MapState {
                    ref camera,
                    ref mut tiles,
                    ..
                } = *st;
                draw_map(&canvas, camera, tiles, &layers, dpr);
            }
            || ()
        });
    }

    // Window resize re-renders (and therefore redraws).
    {
        let bump = bump.clone();
        use_effect_with((), move |_| {
            let listener = EventListener::new(&window(), "resize", move |_| bump.emit(()));
            move || drop(listener)
        });
    }

    // ─── Gestures ────────────────────────────────────────────────

    let on_wheel = {
        let map_state = map_state.clone();
        let bump = bump.clone();
        Callback::from(move |e: WheelEvent| {
            e.prevent_default();
            if let Some(state) = &*map_state {
                let mut st = state.borrow_mut();
                let mut delta = e.delta_y();
                if e.delta_mode() == 1 {
                    delta *= 30.0;
                } else if e.delta_mode() == 2 {
                    delta *= 300.0;
                }
                let (w, h) = container_size();
                let target = st.camera.zoom - delta / 250.0;
                st.camera
                    .zoom_about(target, e.offset_x() as f64, e.offset_y() as f64, w, h);
                bump.emit(());
            }
        })
    };

    let on_pointer_down = {
        let map_state = map_state.clone();
        Callback::from(move |e: PointerEvent| {
            e.prevent_default();
            if let Some(target) = e.target().and_then(|t| t.dyn_into::<HtmlElement>().ok()) {
                let _ = target.set_pointer_capture(e.pointer_id());
            }
            if let Some(state) = &*map_state {
                state.borrow_mut().pointers.insert(
                    e.pointer_id(),
                    PointerState {
                        distance_travelled: 0.0,
                        last_x: e.offset_x() as f64,
                        last_y: e.offset_y() as f64,
                        down_time: js_sys::Date::now(),
                    },
                );
            }
        })
    };

    let on_pointer_move = {
        let map_state = map_state.clone();
        let layers = layers.clone();
        let context = context.clone();
        let bump = bump.clone();
        Callback::from(move |e: PointerEvent| {
            let Some(state) = &*map_state else { return };
            let mut st = state.borrow_mut();
            let x = e.offset_x() as f64;
            let y = e.offset_y() as f64;

            if !st.pointers.contains_key(&e.pointer_id()) {
                // No button down: hover feedback only.
                let (w, h) = container_size();
                let hovering = hit_feature(&layers, &st.camera, x, y, w, h).is_some();
                set_map_cursor(if hovering { "pointer" } else { "" });
                return;
            }
            e.prevent_default();

            let gestures = match &*context {
                Some(ctx) => ctx.config.map.gestures.clone(),
                None => return,
            };
            let (w, h) = container_size();
            let MapState {
                ref mut camera,
                ref mut pointers,
                ..
            } = *st;
            let pointer_count = pointers.len();

            if pointer_count == 2 {
                // Pinch: zoom about the moving midpoint, pan by its drift.
                let other_id = *pointers.keys().find(|&&id| id != e.pointer_id()).unwrap();
                let (other_x, other_y) = {
                    let other = &pointers[&other_id];
                    (other.last_x, other.last_y)
                };
                let (last_x, last_y) = {
                    let current = &pointers[&e.pointer_id()];
                    (current.last_x, current.last_y)
                };

                let old_mid = [(last_x + other_x) / 2.0, (last_y + other_y) / 2.0];
                let new_mid = [(x + other_x) / 2.0, (y + other_y) / 2.0];
                let old_dist = ((last_x - other_x).powi(2) + (last_y - other_y).powi(2)).sqrt();
                let new_dist = ((x - other_x).powi(2) + (y - other_y).powi(2)).sqrt();

                if gestures.pan {
                    camera.pan_by(new_mid[0] - old_mid[0], new_mid[1] - old_mid[1]);
                }
                if old_dist > 1.0 && new_dist > 1.0 {
                    let factor = (new_dist / old_dist).clamp(0.5, 2.0);
                    let target = camera.zoom + factor.log2();
                    camera.zoom_about(target, new_mid[0], new_mid[1], w, h);
                }

                let pointer = pointers.get_mut(&e.pointer_id()).unwrap();
                pointer.distance_travelled += 100.0; // never a click
                pointer.last_x = x;
                pointer.last_y = y;
            } else {
                let pointer = pointers.get_mut(&e.pointer_id()).unwrap();
                let dx = x - pointer.last_x;
                let dy = y - pointer.last_y;
                pointer.distance_travelled += dx.abs() + dy.abs();
                pointer.last_x = x;
                pointer.last_y = y;
                if gestures.pan {
                    camera.pan_by(dx * gestures.pan_linearity, dy * gestures.pan_linearity);
                }
            }
            bump.emit(());
        })
    };

    let on_pointer_up = {
        let map_state = map_state.clone();
        let layers = layers.clone();
        let annotations = annotations.clone();
        let popup_req = popup_req.clone();
        let popup_seq = popup_seq.clone();
        Callback::from(move |e: PointerEvent| {
            let Some(state) = &*map_state else { return };
            let mut st = state.borrow_mut();

            let was_click = match st.pointers.get(&e.pointer_id()) {
                Some(p) => {
                    p.distance_travelled < 10.0 && js_sys::Date::now() - p.down_time <= 500.0
                }
                None => false,
            };
            st.pointers.remove(&e.pointer_id());

            if !(was_click && e.button() == 0) {
                return;
            }

            let x = e.offset_x() as f64;
            let y = e.offset_y() as f64;
            let (w, h) = container_size();

            match hit_feature(&layers, &st.camera, x, y, w, h) {
                Some((li, fi)) => {
                    let layer = &layers[li];
                    let id = layer.features[fi].id.clone();
                    let (lng, lat) = st.camera.screen_to_lng_lat(x, y, w, h);
                    let preloaded = (*annotations).as_ref().map(|rows| {
                        id.as_ref().and_then(|key| rows.get(key).cloned())
                    });
                    let seq = {
                        let mut s = popup_seq.borrow_mut();
                        *s += 1;
                        *s
                    };
                    popup_req.set(Some(PopupRequest {
                        seq,
                        lng,
                        lat,
                        id,
                        kind: layer.key.clone(),
                        preloaded,
                    }));
                }
                // Clicking open map closes the current popup.
                None => popup_req.set(None),
            }
        })
    };

    let on_pointer_cancel = {
        let map_state = map_state.clone();
        Callback::from(move |e: PointerEvent| {
            if let Some(state) = &*map_state {
                state.borrow_mut().pointers.remove(&e.pointer_id());
            }
        })
    };

    // ─── Render ─────────────────────────────────────────────────

    if *loading {
        return html! {
            <div class="fullscreen-note">{"Loading map…"}</div>
        };
    }
    if let Some(ref message) = *error {
        return html! {
            <div class="fullscreen-note fullscreen-error">{message.clone()}</div>
        };
    }

    let ctx = match &*context {
        Some(ctx) => ctx.clone(),
        None => return html! { <div class="fullscreen-note">{"No config"}</div> },
    };

    let nav_control = ctx.config.map.gestures.nav_control;
    let attribution = ctx.config.map.basemap.attribution.clone();

    let on_zoom = |delta: f64| {
        let map_state = map_state.clone();
        let bump = bump.clone();
        Callback::from(move |_: MouseEvent| {
            if let Some(state) = &*map_state {
                let mut st = state.borrow_mut();
                let (w, h) = container_size();
                let target = st.camera.zoom + delta;
                st.camera.zoom_about(target, w / 2.0, h / 2.0, w, h);
                bump.emit(());
            }
        })
    };

    let debug_line = ctx.config.debug_overlay.then(|| {
        (*map_state).as_ref().map(|state| {
            let st = state.borrow();
            format!(
                "lng {:.4}  lat {:.4}  zoom {:.2}  tiles {}",
                st.camera.lng,
                st.camera.lat,
                st.camera.zoom,
                st.tiles.loaded_count(),
            )
        })
    });

    let popup_html = popup_req.as_ref().and_then(|req| {
        (*map_state).as_ref().map(|state| {
            let (w, h) = container_size();
            let pos = state.borrow().camera.lng_lat_to_screen(req.lng, req.lat, w, h);
            let on_close = {
                let popup_req = popup_req.clone();
                Callback::from(move |_| popup_req.set(None))
            };
            html! {
                <Popup
                    key={req.seq.to_string()}
                    x={pos[0]}
                    y={pos[1]}
                    id={req.id.clone()}
                    kind={req.kind.clone()}
                    preloaded={req.preloaded.clone()}
                    context={ctx.clone()}
                    {on_close}
                />
            }
        })
    });

    html! {
        <div class="atlas">
            <div id="mapcontainer" class="mapcontainer"
                onwheel={on_wheel}
                onpointerdown={on_pointer_down}
                onpointermove={on_pointer_move}
                onpointerup={on_pointer_up}
                onpointercancel={on_pointer_cancel}>
                <canvas id="map"></canvas>
            </div>
            <div class="attribution">{attribution}</div>
            if nav_control {
                <div class="nav-control">
                    <button onclick={on_zoom(1.0)}>{"+"}</button>
                    <button onclick={on_zoom(-1.0)}>{"−"}</button>
                </div>
            }
            if let Some(Some(line)) = debug_line {
                <div class="debug-overlay">{line}</div>
            }
            {popup_html}
        </div>
    }
}
