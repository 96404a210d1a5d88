//! Raster basemap tile cache.
//!
//! Tiles load through detached `HtmlImageElement`s; finished loads bump the
//! viewer's redraw trigger, and slots are promoted from pending to
//! ready/failed lazily when the renderer next asks for them.

use std::collections::HashMap;

use gloo::events::EventListener;
use web_sys::HtmlImageElement;
use yew::Callback;

use geo_join::mercator::{tile_url, TileId};

enum TileSlot {
    Pending {
        img: HtmlImageElement,
        _on_load: EventListener,
        _on_error: EventListener,
    },
    Ready(HtmlImageElement),
    Failed,
}

pub struct TileCache {
    template: String,
    subdomains: Vec<String>,
    slots: HashMap<TileId, TileSlot>,
    on_update: Callback<()>,
}

impl TileCache {
    pub fn new(template: String, subdomains: Vec<String>, on_update: Callback<()>) -> Self {
        Self {
            template,
            subdomains,
            slots: HashMap::new(),
            on_update,
        }
    }

    /// The image for `id` if it has arrived; otherwise starts the load and
    /// returns None (the completion listener triggers a redraw).
    pub fn get(&mut self, id: TileId) -> Option<&HtmlImageElement> {
        if !self.slots.contains_key(&id) {
            self.slots.insert(id, self.begin_load(id));
        }

        let promoted = match self.slots.get(&id) {
            Some(TileSlot::Pending { img, .. }) if img.complete() => {
                Some(if img.natural_width() > 0 {
                    TileSlot::Ready(img.clone())
                } else {
                    log::warn!("tile failed to load: {}/{}/{}", id.z, id.x, id.y);
                    TileSlot::Failed
                })
            }
            _ => None,
        };
        if let Some(slot) = promoted {
            self.slots.insert(id, slot);
        }

        match self.slots.get(&id) {
            Some(TileSlot::Ready(img)) => Some(img),
            _ => None,
        }
    }

    pub fn loaded_count(&self) -> usize {
        self.slots
            .values()
            .filter(|s| matches!(s, TileSlot::Ready(_)))
            .count()
    }

    fn begin_load(&self, id: TileId) -> TileSlot {
        let img = HtmlImageElement::new().unwrap();
        img.set_cross_origin(Some("anonymous"));
        let on_load = {
            let cb = self.on_update.clone();
            EventListener::once(&img, "load", move |_| cb.emit(()))
        };
        let on_error = {
            let cb = self.on_update.clone();
            EventListener::once(&img, "error", move |_| cb.emit(()))
        };
        img.set_src(&tile_url(&self.template, &self.subdomains, id));
        TileSlot::Pending {
            img,
            _on_load: on_load,
            _on_error: on_error,
        }
    }
}
