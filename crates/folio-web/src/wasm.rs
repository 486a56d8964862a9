#![forbid(unsafe_code)]

use core::cell::RefCell;
use core::time::Duration;

use folio_core::geometry::{Rect, Viewport};
use js_sys::{Function, Promise, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{
    Element, HtmlDocument, HtmlElement, HtmlTextAreaElement, KeyboardEvent, ScrollBehavior,
    ScrollToOptions, Window,
};
use web_time::Instant;

use crate::WebError;
use crate::app::PortfolioApp;
use crate::config::AppConfig;
use crate::dom::{Document, HostCapabilities, NodeId, NodeRegistry};
use crate::event::HostEvent;
use crate::notify::NotificationKind;
use crate::utils::{self, ClipboardError, ClipboardWriter};

fn log_js_err(result: Result<(), JsValue>, op: &'static str) {
    if let Err(err) = result {
        tracing::warn!(op, error = ?err, "DOM call failed");
    }
}

/// Attribute carrying an element's [`NodeId`].
const NODE_ID_ATTR: &str = "data-folio-id";

/// `web-sys` backed document.
///
/// Elements are registered on first sight and tagged with their id, so
/// seeing them again is a single attribute read. [`Document::remove`]
/// releases the removed subtree's ids.
pub(crate) struct DomDocument {
    window: Window,
    document: web_sys::Document,
    body: NodeId,
    registry: RefCell<NodeRegistry<Element>>,
    capabilities: HostCapabilities,
}

impl DomDocument {
    pub(crate) fn from_window() -> Result<Self, WebError> {
        let window = web_sys::window().ok_or(WebError::Unsupported("window"))?;
        let document = window
            .document()
            .ok_or(WebError::Unsupported("window.document"))?;
        let body: Element = document
            .body()
            .ok_or(WebError::Unsupported("document.body"))?
            .into();
        let capabilities = detect_capabilities(&window);
        tracing::debug!(?capabilities, "host capabilities");
        let mut this = Self {
            window,
            document,
            body: NodeId(0),
            registry: RefCell::new(NodeRegistry::new()),
            capabilities,
        };
        this.body = this
            .register(&body)
            .ok_or(WebError::Unsupported("element registry"))?;
        Ok(this)
    }

    fn register(&self, element: &Element) -> Option<NodeId> {
        if let Some(id) = Self::tagged_id(element)
            && self.registry.borrow().get(id) == Some(element)
        {
            return Some(id);
        }
        let Some(id) = self.registry.borrow_mut().insert(element.clone()) else {
            tracing::warn!("element registry full");
            return None;
        };
        log_js_err(
            element.set_attribute(NODE_ID_ATTR, &id.0.to_string()),
            "setAttribute",
        );
        Some(id)
    }

    fn tagged_id(element: &Element) -> Option<NodeId> {
        element
            .get_attribute(NODE_ID_ATTR)?
            .parse()
            .ok()
            .map(NodeId)
    }

    /// Release `element` and every tagged element below it.
    fn release_subtree(&self, element: &Element) {
        let mut registry = self.registry.borrow_mut();
        let mut release = |element: &Element| {
            if let Some(id) = Self::tagged_id(element)
                && registry.get(id) == Some(element)
            {
                registry.release(id);
            }
        };
        release(element);
        let selector = format!("[{NODE_ID_ATTR}]");
        if let Ok(list) = element.query_selector_all(&selector) {
            (0..list.length())
                .filter_map(|i| list.get(i))
                .filter_map(|node| node.dyn_into::<Element>().ok())
                .for_each(|child| release(&child));
        }
    }

    fn element(&self, node: NodeId) -> Option<Element> {
        self.registry.borrow().get(node).cloned()
    }

    fn html(&self, node: NodeId) -> Option<HtmlElement> {
        self.element(node)?.dyn_into::<HtmlElement>().ok()
    }

    fn register_list(
        &self,
        list: Result<web_sys::NodeList, JsValue>,
        selector: &str,
    ) -> Vec<NodeId> {
        let list = match list {
            Ok(list) => list,
            Err(err) => {
                tracing::warn!(selector, error = ?err, "invalid selector");
                return Vec::new();
            }
        };
        (0..list.length())
            .filter_map(|i| list.get(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .filter_map(|element| self.register(&element))
            .collect()
    }

    fn target_of(&self, event: &web_sys::Event) -> Option<NodeId> {
        let element = event.target()?.dyn_into::<Element>().ok()?;
        self.register(&element)
    }
}

fn detect_capabilities(window: &Window) -> HostCapabilities {
    let mut caps = HostCapabilities::empty();
    if Reflect::has(window, &"IntersectionObserver".into()).unwrap_or(false) {
        caps |= HostCapabilities::VISIBILITY_OBSERVER;
    }
    if css_supports(window, "scroll-behavior", "smooth") {
        caps |= HostCapabilities::SMOOTH_SCROLL;
    }
    let navigator = window.navigator();
    let clipboard = Reflect::get(&navigator, &"clipboard".into()).unwrap_or(JsValue::UNDEFINED);
    if !clipboard.is_undefined() && !clipboard.is_null() {
        caps |= HostCapabilities::ASYNC_CLIPBOARD;
    }
    caps
}

/// `CSS.supports(property, value)`; `false` when `CSS` itself is missing.
fn css_supports(window: &Window, property: &str, value: &str) -> bool {
    let Ok(css) = Reflect::get(window, &"CSS".into()) else {
        return false;
    };
    let Some(supports) = Reflect::get(&css, &"supports".into())
        .ok()
        .and_then(|f| f.dyn_into::<Function>().ok())
    else {
        return false;
    };
    supports
        .call2(&css, &property.into(), &value.into())
        .ok()
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

impl Document for DomDocument {
    fn body(&self) -> NodeId {
        self.body
    }

    fn query_selector_all(&self, selector: &str) -> Vec<NodeId> {
        self.register_list(self.document.query_selector_all(selector), selector)
    }

    fn query_within(&self, root: NodeId, selector: &str) -> Vec<NodeId> {
        let Some(root) = self.element(root) else {
            return Vec::new();
        };
        self.register_list(root.query_selector_all(selector), selector)
    }

    fn closest(&self, node: NodeId, selector: &str) -> Option<NodeId> {
        match self.element(node)?.closest(selector) {
            Ok(found) => found.and_then(|element| self.register(&element)),
            Err(err) => {
                tracing::warn!(selector, error = ?err, "invalid selector");
                None
            }
        }
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.element(node)
            .is_some_and(|element| element.class_list().contains(class))
    }

    fn add_class(&mut self, node: NodeId, class: &str) {
        if let Some(element) = self.element(node) {
            log_js_err(element.class_list().add_1(class), "classList.add");
        }
    }

    fn remove_class(&mut self, node: NodeId, class: &str) {
        if let Some(element) = self.element(node) {
            log_js_err(element.class_list().remove_1(class), "classList.remove");
        }
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.element(node)?.get_attribute(name)
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(element) = self.element(node) {
            log_js_err(element.set_attribute(name, value), "setAttribute");
        }
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        if let Some(element) = self.element(node) {
            element.set_text_content(Some(text));
        }
    }

    fn set_value(&mut self, node: NodeId, value: &str) {
        let Some(element) = self.element(node) else {
            return;
        };
        match element.dyn_ref::<HtmlTextAreaElement>() {
            Some(area) => area.set_value(value),
            None => log_js_err(element.set_attribute("value", value), "setAttribute"),
        }
    }

    fn set_style(&mut self, node: NodeId, property: &str, value: &str) {
        let Some(element) = self.html(node) else {
            return;
        };
        let style = element.style();
        if value.is_empty() {
            log_js_err(style.remove_property(property).map(drop), "style.removeProperty");
        } else {
            log_js_err(style.set_property(property, value), "style.setProperty");
        }
    }

    fn bounding_rect(&self, node: NodeId) -> Rect {
        self.element(node)
            .map(|element| {
                let rect = element.get_bounding_client_rect();
                Rect::new(rect.x(), rect.y(), rect.width(), rect.height())
            })
            .unwrap_or_default()
    }

    fn offset_top(&self, node: NodeId) -> f64 {
        self.html(node)
            .map_or(0.0, |element| f64::from(element.offset_top()))
    }

    fn offset_height(&self, node: NodeId) -> f64 {
        self.html(node)
            .map_or(0.0, |element| f64::from(element.offset_height()))
    }

    fn viewport(&self) -> Viewport {
        let dimension = |value: Result<JsValue, JsValue>| {
            value.ok().and_then(|v| v.as_f64()).unwrap_or(0.0)
        };
        Viewport::new(
            self.window.scroll_y().unwrap_or(0.0),
            dimension(self.window.inner_width()),
            dimension(self.window.inner_height()),
        )
    }

    fn scroll_to(&mut self, top: f64, smooth: bool) {
        let options = ScrollToOptions::new();
        options.set_top(top);
        options.set_behavior(if smooth {
            ScrollBehavior::Smooth
        } else {
            ScrollBehavior::Instant
        });
        self.window.scroll_to_with_scroll_to_options(&options);
    }

    fn focus(&mut self, node: NodeId) {
        if let Some(element) = self.html(node) {
            log_js_err(element.focus(), "focus");
        }
    }

    fn create_element(&mut self, tag: &str, class: &str) -> Option<NodeId> {
        match self.document.create_element(tag) {
            Ok(element) => {
                if !class.is_empty() {
                    element.set_class_name(class);
                }
                self.register(&element)
            }
            Err(err) => {
                tracing::warn!(tag, error = ?err, "createElement failed");
                None
            }
        }
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if let (Some(parent), Some(child)) = (self.element(parent), self.element(child)) {
            log_js_err(parent.append_child(&child).map(drop), "appendChild");
        }
    }

    fn remove(&mut self, node: NodeId) {
        if node == self.body {
            return;
        }
        if let Some(element) = self.element(node) {
            element.remove();
            self.release_subtree(&element);
        }
    }

    fn exec_copy(&mut self, node: NodeId) -> bool {
        if let Some(area) = self
            .element(node)
            .and_then(|e| e.dyn_into::<HtmlTextAreaElement>().ok())
        {
            area.select();
        }
        self.document
            .dyn_ref::<HtmlDocument>()
            .and_then(|doc| doc.exec_command("copy").ok())
            .unwrap_or(false)
    }

    fn capabilities(&self) -> HostCapabilities {
        self.capabilities
    }
}

/// `navigator.clipboard`. Rejections arrive after `write_text` returned, so
/// the legacy fallback for them runs from the spawned future.
struct NavigatorClipboard;

impl ClipboardWriter for NavigatorClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        let window = web_sys::window().ok_or(ClipboardError::Unavailable)?;
        let clipboard = Reflect::get(&window.navigator(), &"clipboard".into())
            .map_err(|_| ClipboardError::Unavailable)?;
        let write = Reflect::get(&clipboard, &"writeText".into())
            .ok()
            .and_then(|f| f.dyn_into::<Function>().ok())
            .ok_or(ClipboardError::Unavailable)?;
        let promise = write
            .call1(&clipboard, &text.into())
            .map_err(|err| ClipboardError::Rejected(format!("{err:?}")))?
            .dyn_into::<Promise>()
            .map_err(|_| ClipboardError::Rejected("writeText did not return a promise".into()))?;

        let text = text.to_owned();
        spawn_local(async move {
            if let Err(err) = JsFuture::from(promise).await {
                tracing::debug!(error = ?err, "clipboard write rejected, using legacy copy");
                if let Ok(mut doc) = DomDocument::from_window() {
                    utils::legacy_copy(&mut doc, &text);
                }
            }
        });
        Ok(())
    }
}

fn to_js(err: impl core::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// The page controller exposed to JavaScript.
///
/// The page script forwards `scroll`, `resize`, `load`, `click`, `keydown`
/// and `submit` events to [`handle_event`](Self::handle_event), calls
/// [`advance`](Self::advance) from a single `setTimeout` armed for
/// `nextDelayMs()`, and drives [`frame`](Self::frame) from
/// `requestAnimationFrame` while `needsFrame()` is true.
#[wasm_bindgen]
pub struct FolioWeb {
    app: PortfolioApp<DomDocument>,
    epoch: Instant,
}

#[wasm_bindgen]
impl FolioWeb {
    /// `options` is an optional JSON string of `AppConfig` fields.
    #[wasm_bindgen(constructor)]
    pub fn new(options: Option<String>) -> Result<FolioWeb, JsValue> {
        let config = match options {
            Some(json) => AppConfig::from_json_str(&json).map_err(to_js)?,
            None => AppConfig::default(),
        };
        let doc = DomDocument::from_window().map_err(to_js)?;
        let epoch = Instant::now();
        let app = PortfolioApp::new(doc, config, Duration::ZERO).map_err(to_js)?;
        Ok(Self { app, epoch })
    }

    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    fn translate(&self, event: &web_sys::Event) -> Option<HostEvent> {
        let doc = self.app.document();
        match event.type_().as_str() {
            "scroll" => Some(HostEvent::Scroll),
            "resize" => {
                let viewport = doc.viewport();
                Some(HostEvent::Resize {
                    width: viewport.width,
                    height: viewport.height,
                })
            }
            "load" => Some(HostEvent::Load),
            "click" => doc
                .target_of(event)
                .map(|target| HostEvent::Click { target }),
            "keydown" => event
                .dyn_ref::<KeyboardEvent>()
                .map(|key| HostEvent::KeyDown { key: key.key() }),
            "submit" => doc
                .target_of(event)
                .map(|target| HostEvent::Submit { target }),
            other => {
                tracing::trace!(kind = other, "ignoring unhandled event type");
                None
            }
        }
    }

    /// Feed a native DOM event.
    #[wasm_bindgen(js_name = handleEvent)]
    pub fn handle_event(&mut self, event: &web_sys::Event) {
        let Some(host_event) = self.translate(event) else {
            return;
        };
        let now = self.now();
        if self.app.handle_event(&host_event, now).prevent_default {
            event.prevent_default();
        }
    }

    /// Feed a JSON-encoded event. Returns whether the default action should
    /// be prevented.
    #[wasm_bindgen(js_name = handleJson)]
    pub fn handle_json(&mut self, json: &str) -> Result<bool, JsValue> {
        let event = HostEvent::from_json_str(json).map_err(to_js)?;
        let now = self.now();
        Ok(self.app.handle_event(&event, now).prevent_default)
    }

    /// Animation frame callback.
    pub fn frame(&mut self) {
        let now = self.now();
        self.app.handle_event(&HostEvent::Frame, now);
    }

    /// Timer callback: run everything due.
    pub fn advance(&mut self) {
        let now = self.now();
        self.app.advance_to(now);
    }

    /// Milliseconds until the next timer is due, `undefined` when idle.
    #[wasm_bindgen(js_name = nextDelayMs)]
    pub fn next_delay_ms(&self) -> Option<f64> {
        let deadline = self.app.next_deadline()?;
        Some(deadline.saturating_sub(self.now()).as_secs_f64() * 1000.0)
    }

    #[wasm_bindgen(js_name = needsFrame)]
    pub fn needs_frame(&self) -> bool {
        self.app.needs_animation_frame()
    }

    #[wasm_bindgen(js_name = scrollToElement)]
    pub fn scroll_to_element(&mut self, selector: &str, offset: Option<f64>) {
        self.app
            .scroll_to_element(selector, offset.unwrap_or(utils::DEFAULT_SCROLL_OFFSET));
    }

    #[wasm_bindgen(js_name = addRevealAnimation)]
    pub fn add_reveal_animation(&mut self, selector: &str) {
        self.app.add_reveal_animation(selector);
    }

    #[wasm_bindgen(js_name = copyToClipboard)]
    pub fn copy_to_clipboard(&mut self, text: &str) -> bool {
        self.app.copy_to_clipboard(&mut NavigatorClipboard, text)
    }

    /// `kind` is one of `info`, `success`, `warning`, `error`; anything else
    /// shows as `info`.
    #[wasm_bindgen(js_name = showNotification)]
    pub fn show_notification(&mut self, message: &str, kind: Option<String>) {
        let kind = match kind.as_deref().map(str::parse::<NotificationKind>) {
            Some(Ok(kind)) => kind,
            Some(Err(err)) => {
                tracing::debug!(%err, "defaulting notification kind");
                NotificationKind::Info
            }
            None => NotificationKind::Info,
        };
        let now = self.now();
        self.app.show_notification(message, kind, now);
    }

    /// Explicit teardown for JS callers.
    pub fn destroy(&mut self) {
        self.app.destroy();
    }
}
