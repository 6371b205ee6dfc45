//! Rendering output for the page strip.

use crate::ViewportGeometry;

/// Style of the scrollable page strip derived from viewport geometry.
///
/// This is a platform-agnostic representation of how the strip should
/// be presented; each consumer can map the properties onto its styling
/// backend.
#[derive(Clone, Debug, PartialEq)]
pub struct StripStyle {
    /// Column width of each page tile in pixels
    pub page_width: f64,
    /// Inline padding on both strip ends in pixels
    pub padding_inline: f64,
}

impl StripStyle {
    /// Derive the strip style from the current geometry.
    pub fn from_geometry(geometry: &ViewportGeometry) -> Self {
        Self {
            page_width: geometry.page_width,
            padding_inline: geometry.padding_inline,
        }
    }

    /// CSS properties for the strip element.
    ///
    /// The strip is a right-to-left column grid scrolling horizontally;
    /// native touch panning and overscroll chaining are disabled so the
    /// drag controller is the only pointer authority.
    pub fn css_properties(&self) -> Vec<(&'static str, String)> {
        vec![
            ("direction", "rtl".to_string()),
            ("display", "grid".to_string()),
            ("grid-auto-flow", "column".to_string()),
            ("grid-auto-columns", format!("{:.2}px", self.page_width)),
            ("grid-template-rows", "minmax(auto, 100%)".to_string()),
            ("height", "100%".to_string()),
            ("overflow-x", "scroll".to_string()),
            ("overflow-y", "hidden".to_string()),
            ("overscroll-behavior", "none".to_string()),
            ("padding-inline", format!("{:.2}px", self.padding_inline)),
            ("touch-action", "none".to_string()),
            ("cursor", "grab".to_string()),
            ("background-color", "black".to_string()),
        ]
    }
}

/// Web-specific rendering and event wiring.
#[cfg(feature = "web")]
pub mod web {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::{Clamped, JsCast};
    use web_sys::{
        CanvasRenderingContext2d, Element, Event, HtmlCanvasElement, HtmlElement,
        HtmlImageElement, ImageData, PointerEvent, ResizeObserver, ScrollBehavior,
        ScrollToOptions,
    };

    use crate::{
        resolve_image_url, snap_delta, unscramble, yield_to_event_loop, Bitmap, Episode,
        ImageRequest, ScrollCommand, ScrollMotion, TileRect, ViewerOptions, ViewerState,
    };

    /// Paint a decoded bitmap into a canvas render target.
    ///
    /// The canvas is sized to the bitmap's natural dimensions and marked
    /// as image content for assistive technology only after the paint
    /// fully succeeded; a failed paint leaves the canvas blank.
    pub fn paint_bitmap(canvas: &HtmlCanvasElement, bitmap: &Bitmap) -> Result<(), String> {
        canvas.set_width(bitmap.width);
        canvas.set_height(bitmap.height);

        let ctx = canvas
            .get_context("2d")
            .map_err(|_| "Failed to get 2d context")?
            .ok_or("No 2d context available")?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| "Failed to cast to CanvasRenderingContext2d")?;

        let image_data = ImageData::new_with_u8_clamped_array_and_sh(
            Clamped(&bitmap.rgba[..]),
            bitmap.width,
            bitmap.height,
        )
        .map_err(|_| "Failed to build image data")?;

        ctx.put_image_data(&image_data, 0.0, 0.0)
            .map_err(|_| "Failed to paint image data")?;

        canvas
            .set_attribute("role", "img")
            .map_err(|_| "Failed to set canvas role")?;

        Ok(())
    }

    /// Read back the pixels of a decoded image element.
    ///
    /// Uses an offscreen canvas since image elements expose no pixel
    /// access of their own.
    pub fn decode_image_element(image: &HtmlImageElement) -> Result<Bitmap, String> {
        let width = image.natural_width();
        let height = image.natural_height();
        if width == 0 || height == 0 {
            return Err("Image has no dimensions".to_string());
        }

        let window = web_sys::window().ok_or("No window available")?;
        let document = window.document().ok_or("No document available")?;
        let canvas = document
            .create_element("canvas")
            .map_err(|_| "Failed to create canvas element")?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| "Failed to cast element to HtmlCanvasElement")?;

        canvas.set_width(width);
        canvas.set_height(height);

        let ctx = canvas
            .get_context("2d")
            .map_err(|_| "Failed to get 2d context")?
            .ok_or("No 2d context available")?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| "Failed to cast to CanvasRenderingContext2d")?;

        ctx.draw_image_with_html_image_element(image, 0.0, 0.0)
            .map_err(|_| "Failed to draw image")?;

        let image_data = ctx
            .get_image_data(0.0, 0.0, width as f64, height as f64)
            .map_err(|_| "Failed to read image pixels")?;

        Bitmap::new(width, height, image_data.data().0).map_err(|e| e.to_string())
    }

    /// Fetch, natively decode, and unscramble one page image.
    pub async fn fetch_and_decode_page(url: &str) -> Result<Bitmap, String> {
        let image = HtmlImageElement::new().map_err(|_| "Failed to create image element")?;
        image.set_src(url);

        wasm_bindgen_futures::JsFuture::from(image.decode())
            .await
            .map_err(|_| format!("Failed to decode image at {url}"))?;

        let mut bitmap = decode_image_element(&image)?;
        unscramble(&mut bitmap);
        Ok(bitmap)
    }

    /// Apply the strip style for the current geometry to the scroll
    /// view element.
    pub fn apply_strip_style(
        scroll_view: &HtmlElement,
        geometry: &ViewportGeometry,
    ) -> Result<(), String> {
        let style = scroll_view.style();
        for (name, value) in StripStyle::from_geometry(geometry).css_properties() {
            style
                .set_property(name, &value)
                .map_err(|_| format!("Failed to set style property {name}"))?;
        }
        Ok(())
    }

    /// Measure the snap correction from live tile and viewport rects.
    pub fn measure_snap_delta(
        scroll_view: &Element,
        geometry: &ViewportGeometry,
    ) -> Option<f64> {
        let viewport_rect = scroll_view.get_bounding_client_rect();
        let viewport = TileRect {
            left: viewport_rect.left(),
            right: viewport_rect.right(),
        };

        let children = scroll_view.children();
        let mut tiles = Vec::with_capacity(children.length() as usize);
        for idx in 0..children.length() {
            if let Some(child) = children.item(idx) {
                let rect = child.get_bounding_client_rect();
                tiles.push(TileRect {
                    left: rect.left(),
                    right: rect.right(),
                });
            }
        }

        snap_delta(&tiles, &viewport, geometry.spread, geometry.page_width)
    }

    fn scroll_by(scroll_view: &Element, delta: f64, behavior: ScrollBehavior) {
        let options = ScrollToOptions::new();
        options.set_left(delta);
        options.set_behavior(behavior);
        scroll_view.scroll_by_with_scroll_to_options(&options);
    }

    /// Apply a scroll command to the strip element.
    ///
    /// Timer commands are the handle's job; see `restart_settle_timer`.
    pub fn apply_scroll_command(scroll_view: &Element, command: ScrollCommand) {
        match command {
            ScrollCommand::ScrollBy { delta, motion } => {
                let behavior = match motion {
                    ScrollMotion::Instant => ScrollBehavior::Instant,
                    ScrollMotion::Smooth => ScrollBehavior::Smooth,
                };
                scroll_by(scroll_view, delta, behavior);
            }
            ScrollCommand::CancelSettle => {
                // An instant zero-length scroll aborts a smooth scroll
                // already in flight.
                scroll_by(scroll_view, 0.0, ScrollBehavior::Instant);
            }
            ScrollCommand::RestartSettleTimer { .. } => {}
        }
    }

    type SettleCallback = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

    fn restart_settle_timer(
        settle_timeout: &Rc<Cell<Option<i32>>>,
        on_settle: &SettleCallback,
        delay_ms: u32,
    ) -> Result<(), String> {
        let window = web_sys::window().ok_or("No window available")?;

        if let Some(handle) = settle_timeout.take() {
            window.clear_timeout_with_handle(handle);
        }

        let guard = on_settle.borrow();
        let closure = guard.as_ref().ok_or("Settle callback not installed")?;
        let handle = window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                closure.as_ref().unchecked_ref(),
                delay_ms as i32,
            )
            .map_err(|_| "Failed to start settle timer")?;
        settle_timeout.set(Some(handle));
        Ok(())
    }

    fn dispatch_command(
        scroll_view: &Element,
        settle_timeout: &Rc<Cell<Option<i32>>>,
        on_settle: &SettleCallback,
        command: ScrollCommand,
    ) {
        match command {
            ScrollCommand::RestartSettleTimer { delay_ms } => {
                let _ = restart_settle_timer(settle_timeout, on_settle, delay_ms);
            }
            other => apply_scroll_command(scroll_view, other),
        }
    }

    /// A mounted comic viewer wired to its DOM elements.
    ///
    /// Attaching installs the resize observer, pointer handlers, and
    /// scroll handler exactly once; re-rendering the embedding page
    /// must reuse the handle rather than attach again. [`ViewerHandle::detach`]
    /// tears everything down synchronously.
    pub struct ViewerHandle {
        state: Rc<RefCell<ViewerState>>,
        options: ViewerOptions,
        container: HtmlElement,
        scroll_view: HtmlElement,
        resize_observer: ResizeObserver,
        on_resize: Closure<dyn FnMut(js_sys::Array, ResizeObserver)>,
        on_pointer_down: Closure<dyn FnMut(PointerEvent)>,
        on_pointer_move: Closure<dyn FnMut(PointerEvent)>,
        on_pointer_up: Closure<dyn FnMut(PointerEvent)>,
        on_scroll: Closure<dyn FnMut(Event)>,
        on_settle: SettleCallback,
        settle_timeout: Rc<Cell<Option<i32>>>,
    }

    impl ViewerHandle {
        /// Wire a viewer to its container and scroll view elements.
        ///
        /// The elements must already be attached to the document; a
        /// host rendering asynchronously calls this after its first
        /// paint, once the nodes exist.
        pub fn attach(
            container: HtmlElement,
            scroll_view: HtmlElement,
            options: &ViewerOptions,
        ) -> Result<Self, String> {
            let state = Rc::new(RefCell::new(ViewerState::new(options)));
            let settle_timeout = Rc::new(Cell::new(None::<i32>));
            let on_settle: SettleCallback = Rc::new(RefCell::new(None));

            {
                let state = Rc::clone(&state);
                let scroll_view = scroll_view.clone();
                let settle_timeout = Rc::clone(&settle_timeout);
                *on_settle.borrow_mut() = Some(Closure::wrap(Box::new(move || {
                    settle_timeout.set(None);
                    let mut state = state.borrow_mut();
                    let geometry = match state.geometry {
                        Some(g) => g,
                        None => return,
                    };
                    let delta = measure_snap_delta(&scroll_view, &geometry);
                    if let Some(command) = state.scroll.settle_elapsed(delta) {
                        apply_scroll_command(&scroll_view, command);
                    }
                }) as Box<dyn FnMut()>));
            }

            let on_resize = {
                let state = Rc::clone(&state);
                let container = container.clone();
                let scroll_view = scroll_view.clone();
                Closure::wrap(Box::new(move |_entries: js_sys::Array, _o: ResizeObserver| {
                    // Always measure afresh; observations may arrive
                    // while earlier effects are still settling.
                    let rect = container.get_bounding_client_rect();
                    let changed = state.borrow_mut().observe_resize(rect.width(), rect.height());
                    if let Some(geometry) = changed {
                        let _ = apply_strip_style(&scroll_view, &geometry);
                    }
                })
                    as Box<dyn FnMut(js_sys::Array, ResizeObserver)>)
            };

            let on_pointer_down = {
                let state = Rc::clone(&state);
                let scroll_view = scroll_view.clone();
                Closure::wrap(Box::new(move |event: PointerEvent| {
                    let command = state.borrow_mut().scroll.pointer_down(event.client_x() as f64);
                    let _ = scroll_view.set_pointer_capture(event.pointer_id());
                    apply_scroll_command(&scroll_view, command);
                }) as Box<dyn FnMut(PointerEvent)>)
            };

            let on_pointer_move = {
                let state = Rc::clone(&state);
                let scroll_view = scroll_view.clone();
                Closure::wrap(Box::new(move |event: PointerEvent| {
                    let command = state.borrow_mut().scroll.pointer_move(event.client_x() as f64);
                    if let Some(command) = command {
                        apply_scroll_command(&scroll_view, command);
                    }
                }) as Box<dyn FnMut(PointerEvent)>)
            };

            let on_pointer_up = {
                let state = Rc::clone(&state);
                let scroll_view = scroll_view.clone();
                let settle_timeout = Rc::clone(&settle_timeout);
                let on_settle = Rc::clone(&on_settle);
                Closure::wrap(Box::new(move |event: PointerEvent| {
                    let _ = scroll_view.release_pointer_capture(event.pointer_id());
                    let command = state.borrow_mut().scroll.pointer_up();
                    if let Some(command) = command {
                        dispatch_command(&scroll_view, &settle_timeout, &on_settle, command);
                    }
                }) as Box<dyn FnMut(PointerEvent)>)
            };

            let on_scroll = {
                let state = Rc::clone(&state);
                let scroll_view = scroll_view.clone();
                let settle_timeout = Rc::clone(&settle_timeout);
                let on_settle = Rc::clone(&on_settle);
                Closure::wrap(Box::new(move |_event: Event| {
                    let command = state.borrow_mut().scroll.scroll_event();
                    if let Some(command) = command {
                        dispatch_command(&scroll_view, &settle_timeout, &on_settle, command);
                    }
                }) as Box<dyn FnMut(Event)>)
            };

            // The observer reports asynchronously; seed geometry from a
            // synchronous measurement so the first render is sized.
            let rect = container.get_bounding_client_rect();
            let changed = state.borrow_mut().observe_resize(rect.width(), rect.height());
            if let Some(geometry) = changed {
                apply_strip_style(&scroll_view, &geometry)?;
            }

            let resize_observer = ResizeObserver::new(on_resize.as_ref().unchecked_ref())
                .map_err(|_| "Failed to create resize observer")?;
            resize_observer.observe(&container);

            scroll_view
                .add_event_listener_with_callback(
                    "pointerdown",
                    on_pointer_down.as_ref().unchecked_ref(),
                )
                .map_err(|_| "Failed to attach pointerdown listener")?;
            scroll_view
                .add_event_listener_with_callback(
                    "pointermove",
                    on_pointer_move.as_ref().unchecked_ref(),
                )
                .map_err(|_| "Failed to attach pointermove listener")?;
            scroll_view
                .add_event_listener_with_callback(
                    "pointerup",
                    on_pointer_up.as_ref().unchecked_ref(),
                )
                .map_err(|_| "Failed to attach pointerup listener")?;
            scroll_view
                .add_event_listener_with_callback("scroll", on_scroll.as_ref().unchecked_ref())
                .map_err(|_| "Failed to attach scroll listener")?;

            Ok(Self {
                state,
                options: options.clone(),
                container,
                scroll_view,
                resize_observer,
                on_resize,
                on_pointer_down,
                on_pointer_move,
                on_pointer_up,
                on_scroll,
                on_settle,
                settle_timeout,
            })
        }

        /// Shared viewer state.
        pub fn state(&self) -> Rc<RefCell<ViewerState>> {
            Rc::clone(&self.state)
        }

        /// The observed container element.
        pub fn container(&self) -> &HtmlElement {
            &self.container
        }

        /// The scroll strip element.
        pub fn scroll_view(&self) -> &HtmlElement {
            &self.scroll_view
        }

        /// Install an episode and build one canvas tile per page.
        ///
        /// Tiles carry their page id in a `data-page-id` attribute and
        /// are laid out in reading order by the strip's RTL grid.
        pub fn render_episode(&self, episode: Episode) -> Result<(), String> {
            let window = web_sys::window().ok_or("No window available")?;
            let document = window.document().ok_or("No document available")?;

            self.scroll_view.set_inner_html("");
            for page in &episode.pages {
                let canvas = document
                    .create_element("canvas")
                    .map_err(|_| "Failed to create canvas element")?
                    .dyn_into::<HtmlCanvasElement>()
                    .map_err(|_| "Failed to cast element to HtmlCanvasElement")?;
                canvas
                    .set_attribute("data-page-id", &page.id)
                    .map_err(|_| "Failed to set page id attribute")?;
                canvas
                    .style()
                    .set_property("width", "100%")
                    .map_err(|_| "Failed to set canvas width style")?;
                self.scroll_view
                    .append_child(&canvas)
                    .map_err(|_| "Failed to append page tile")?;
            }

            self.state.borrow_mut().episode_loaded(episode);
            Ok(())
        }

        /// Start decoding every page tile.
        ///
        /// Decodes run as independent tasks so tiles never block each
        /// other; the configured decode budget bounds how many are in
        /// flight at once. Each completion paints through its tile's
        /// ticket, so a tile retargeted or detached mid-decode receives
        /// zero writes.
        pub fn spawn_page_decodes(&self, image_base_url: &str) {
            let pages: Vec<(String, String)> = self
                .state
                .borrow()
                .tiles
                .iter()
                .map(|t| (t.page_id().to_string(), t.image_id().to_string()))
                .collect();

            for (page_id, image_id) in pages {
                let state = Rc::clone(&self.state);
                let scroll_view = self.scroll_view.clone();
                let format = self.options.format;
                let base_url = image_base_url.to_string();

                wasm_bindgen_futures::spawn_local(async move {
                    decode_one_page(state, scroll_view, base_url, page_id, image_id, format).await;
                });
            }
        }

        /// Tear down all listeners, the observer, and any pending
        /// settle timer, and invalidate in-flight decodes.
        pub fn detach(self) {
            self.resize_observer.disconnect();

            let _ = self.scroll_view.remove_event_listener_with_callback(
                "pointerdown",
                self.on_pointer_down.as_ref().unchecked_ref(),
            );
            let _ = self.scroll_view.remove_event_listener_with_callback(
                "pointermove",
                self.on_pointer_move.as_ref().unchecked_ref(),
            );
            let _ = self.scroll_view.remove_event_listener_with_callback(
                "pointerup",
                self.on_pointer_up.as_ref().unchecked_ref(),
            );
            let _ = self
                .scroll_view
                .remove_event_listener_with_callback("scroll", self.on_scroll.as_ref().unchecked_ref());

            if let Some(handle) = self.settle_timeout.take() {
                if let Some(window) = web_sys::window() {
                    window.clear_timeout_with_handle(handle);
                }
            }

            // The timer can no longer fire; drop its callback now. The
            // other closures drop with the handle, after the listeners
            // that referenced them are removed.
            self.on_settle.borrow_mut().take();

            self.state.borrow_mut().detach();
            drop(self.on_resize);
        }
    }

    async fn decode_one_page(
        state: Rc<RefCell<ViewerState>>,
        scroll_view: HtmlElement,
        base_url: String,
        page_id: String,
        image_id: String,
        format: crate::ImageFormat,
    ) {
        // Wait for a decode slot; siblings release theirs as they finish.
        loop {
            if state.borrow_mut().budget.try_acquire() {
                break;
            }
            yield_to_event_loop().await;
        }

        let ticket = {
            let mut state_ref = state.borrow_mut();
            match state_ref.tile_for_page_mut(&page_id) {
                Some(tile) => tile.begin_decode(),
                None => {
                    state_ref.budget.release();
                    return;
                }
            }
        };

        let request = ImageRequest::new(image_id, format);
        let url = resolve_image_url(&base_url, &request);
        let result = fetch_and_decode_page(&url).await;

        let mut state_ref = state.borrow_mut();
        state_ref.budget.release();

        match result {
            Ok(bitmap) => {
                // First real metadata supersedes the fallback sizing.
                let changed =
                    state_ref.set_page_intrinsic_size(bitmap.width as f64, bitmap.height as f64);
                if let Some(geometry) = changed {
                    let _ = apply_strip_style(&scroll_view, &geometry);
                }

                let painted = match state_ref.tile_for_page_mut(&page_id) {
                    Some(tile) => tile.complete_decode(ticket, bitmap),
                    None => false,
                };

                if painted {
                    if let Some(canvas) = find_page_canvas(&scroll_view, &page_id) {
                        if let Some(tile) = state_ref.tile_for_page_mut(&page_id) {
                            if let Some(bitmap) = tile.bitmap() {
                                let _ = paint_bitmap(&canvas, bitmap);
                            }
                        }
                    }
                }
            }
            Err(error) => {
                if let Some(tile) = state_ref.tile_for_page_mut(&page_id) {
                    tile.fail_decode(ticket, error);
                }
            }
        }
    }

    fn find_page_canvas(scroll_view: &Element, page_id: &str) -> Option<HtmlCanvasElement> {
        scroll_view
            .query_selector(&format!("canvas[data-page-id=\"{page_id}\"]"))
            .ok()
            .flatten()
            .and_then(|element| element.dyn_into::<HtmlCanvasElement>().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SpreadCount;

    #[test]
    fn test_strip_style_from_geometry() {
        let geometry = ViewportGeometry {
            spread: SpreadCount::Two,
            page_width: 423.456,
            padding_inline: 12.5,
        };
        let style = StripStyle::from_geometry(&geometry);

        let props = style.css_properties();
        let lookup = |name: &str| {
            props
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| v.clone())
        };

        assert_eq!(lookup("direction").as_deref(), Some("rtl"));
        assert_eq!(lookup("grid-auto-columns").as_deref(), Some("423.46px"));
        assert_eq!(lookup("padding-inline").as_deref(), Some("12.50px"));
        assert_eq!(lookup("overflow-x").as_deref(), Some("scroll"));
        assert_eq!(lookup("touch-action").as_deref(), Some("none"));
    }
}
