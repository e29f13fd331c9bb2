//! Browser runtime
//!
//! Everything here runs on the page's single event loop. Each callback
//! borrows the shared runtime, feeds the event into the core, releases the
//! borrow, then performs whatever socket work the core asked for.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use glam::Vec2;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    CloseEvent, Document, EventTarget, HtmlCanvasElement, MessageEvent, MouseEvent, TouchEvent,
    WebSocket, Window,
};

use crate::Viewport;
use crate::game::Game;
use crate::input::{ClientRect, GestureClient, SocketId, TransportCommand};
use crate::settings::{GameSettings, InputMethod};
use crate::sim::Phase;

type Shared = Rc<RefCell<Runtime>>;

/// Milliseconds on the same clock as `requestAnimationFrame` timestamps
fn now() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map_or(0.0, |p| p.now())
}

fn client_rect(canvas: &HtmlCanvasElement) -> ClientRect {
    let rect = canvas.get_bounding_client_rect();
    ClientRect::new(
        rect.left() as f32,
        rect.top() as f32,
        rect.width() as f32,
        rect.height() as f32,
    )
}

fn viewport_of(canvas: &HtmlCanvasElement) -> Viewport {
    Viewport::new(canvas.client_width() as f32, canvas.client_height() as f32)
}

/// A WebSocket plus the callbacks wired into it
struct SocketHandle {
    socket: WebSocket,
    _on_open: Closure<dyn FnMut(web_sys::Event)>,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
    _on_close: Closure<dyn FnMut(CloseEvent)>,
    _on_error: Closure<dyn FnMut(web_sys::Event)>,
}

impl SocketHandle {
    /// Unhook the callbacks so the closures can be dropped
    fn detach(&self) {
        self.socket.set_onopen(None);
        self.socket.set_onmessage(None);
        self.socket.set_onclose(None);
        self.socket.set_onerror(None);
    }
}

struct Listener {
    target: EventTarget,
    kind: &'static str,
    closure: Closure<dyn FnMut(web_sys::Event)>,
}

struct Runtime {
    game: Game,
    canvas: HtmlCanvasElement,
    sockets: HashMap<SocketId, SocketHandle>,
    /// Closed sockets, dropped on the next frame (never inside their own callback)
    retired: Vec<SocketHandle>,
    listeners: Vec<Listener>,
    frame_request: Option<i32>,
    /// Pending `setTimeout` handle and the deadline it was armed for
    timeout: Option<(i32, f64)>,
    torn_down: bool,
}

impl Runtime {
    fn with_client(&mut self, f: impl FnOnce(&mut GestureClient)) {
        if let Some(client) = self.game.source_mut().gesture_mut() {
            f(client);
        }
    }
}

fn listen<E: JsCast + 'static>(
    rt: &Shared,
    target: &EventTarget,
    kind: &'static str,
    mut handler: impl FnMut(E) + 'static,
) -> Result<(), JsValue> {
    let closure = Closure::<dyn FnMut(web_sys::Event)>::new(move |event: web_sys::Event| {
        if let Ok(event) = event.dyn_into::<E>() {
            handler(event);
        }
    });
    target.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())?;
    rt.borrow_mut().listeners.push(Listener {
        target: target.clone(),
        kind,
        closure,
    });
    Ok(())
}

/// Perform socket work requested by the core
fn execute(rt: &Shared, commands: Vec<TransportCommand>) {
    for command in commands {
        match command {
            TransportCommand::Open { socket, url } => open_socket(rt, socket, &url),
            TransportCommand::Close {
                socket,
                code,
                reason,
            } => {
                let r = rt.borrow();
                if let Some(handle) = r.sockets.get(&socket) {
                    if let Err(e) = handle.socket.close_with_code_and_reason(code, reason) {
                        log::warn!("Socket close failed: {e:?}");
                    }
                }
            }
            TransportCommand::Send { socket, text } => {
                let r = rt.borrow();
                if let Some(handle) = r.sockets.get(&socket) {
                    if let Err(e) = handle.socket.send_with_str(&text) {
                        log::warn!("Socket send failed: {e:?}");
                    }
                }
            }
        }
    }
}

fn open_socket(rt: &Shared, id: SocketId, url: &str) {
    let socket = match WebSocket::new(url) {
        Ok(socket) => socket,
        Err(e) => {
            // Report as an abnormal close so the client schedules a retry
            log::warn!("Could not open gesture socket: {e:?}");
            rt.borrow_mut()
                .with_client(|c| c.on_close(id, 1006, now()));
            return;
        }
    };

    let weak = Rc::downgrade(rt);
    let on_open = Closure::<dyn FnMut(web_sys::Event)>::new(move |_event: web_sys::Event| {
        on_socket_event(&weak, |c| c.on_open(id));
    });

    let weak = Rc::downgrade(rt);
    let on_message = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
        match event.data().as_string() {
            Some(text) => on_socket_event(&weak, |c| c.on_message(id, &text)),
            None => log::warn!("Ignoring non-text gesture frame"),
        }
    });

    let weak = Rc::downgrade(rt);
    let on_close = Closure::<dyn FnMut(CloseEvent)>::new(move |event: CloseEvent| {
        let code = event.code();
        on_socket_event(&weak, |c| c.on_close(id, code, now()));
        if let Some(rt) = weak.upgrade() {
            let mut r = rt.borrow_mut();
            if let Some(handle) = r.sockets.remove(&id) {
                handle.detach();
                r.retired.push(handle);
            }
        }
    });

    let weak = Rc::downgrade(rt);
    let on_error = Closure::<dyn FnMut(web_sys::Event)>::new(move |_event: web_sys::Event| {
        on_socket_event(&weak, |c| c.on_error(id));
    });

    socket.set_onopen(Some(on_open.as_ref().unchecked_ref()));
    socket.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
    socket.set_onclose(Some(on_close.as_ref().unchecked_ref()));
    socket.set_onerror(Some(on_error.as_ref().unchecked_ref()));

    rt.borrow_mut().sockets.insert(
        id,
        SocketHandle {
            socket,
            _on_open: on_open,
            _on_message: on_message,
            _on_close: on_close,
            _on_error: on_error,
        },
    );
}

fn on_socket_event(weak: &Weak<RefCell<Runtime>>, f: impl FnOnce(&mut GestureClient)) {
    let Some(rt) = weak.upgrade() else {
        return;
    };
    {
        let mut r = rt.borrow_mut();
        if r.torn_down {
            return;
        }
        r.with_client(f);
    }
    arm_timeout(&rt);
}

/// Keep one `setTimeout` armed for the transport's next deadline, so
/// reconnects and control sends still happen while frames are throttled
fn arm_timeout(rt: &Shared) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let mut r = rt.borrow_mut();
    if r.torn_down {
        return;
    }
    let deadline = r.game.next_transport_deadline();
    if r.timeout.map(|(_, at)| at) == deadline {
        return;
    }
    if let Some((handle, _)) = r.timeout.take() {
        window.clear_timeout_with_handle(handle);
    }
    let Some(deadline) = deadline else {
        return;
    };

    let weak = Rc::downgrade(rt);
    let callback = Closure::once_into_js(move || {
        if let Some(rt) = weak.upgrade() {
            on_timeout(&rt);
        }
    });
    let delay = (deadline - now()).max(0.0).ceil() as i32;
    match window
        .set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), delay)
    {
        Ok(handle) => r.timeout = Some((handle, deadline)),
        Err(e) => log::error!("setTimeout failed: {e:?}"),
    }
}

fn on_timeout(rt: &Shared) {
    let commands = {
        let mut r = rt.borrow_mut();
        r.timeout = None;
        if r.torn_down {
            return;
        }
        r.retired.clear();
        r.game.poll_transport(now())
    };
    execute(rt, commands);
    arm_timeout(rt);
}

fn request_frame(rt: &Shared) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let weak = Rc::downgrade(rt);
    let callback = Closure::once_into_js(move |time: f64| {
        if let Some(rt) = weak.upgrade() {
            on_frame(&rt, time);
        }
    });
    match window.request_animation_frame(callback.unchecked_ref()) {
        Ok(id) => rt.borrow_mut().frame_request = Some(id),
        Err(e) => log::error!("requestAnimationFrame failed: {e:?}"),
    }
}

fn on_frame(rt: &Shared, time: f64) {
    let commands = {
        let mut r = rt.borrow_mut();
        r.frame_request = None;
        if r.torn_down {
            return;
        }
        r.retired.clear();
        let viewport = viewport_of(&r.canvas);
        r.game.set_viewport(viewport);
        r.game.frame(time)
    };
    execute(rt, commands);
    arm_timeout(rt);
    request_frame(rt);
}

/// Bind listeners for the configured pointer method only
fn bind_pointer(rt: &Shared, method: InputMethod, canvas: &HtmlCanvasElement) -> Result<(), JsValue> {
    let target: &EventTarget = canvas.as_ref();
    match method {
        InputMethod::Gesture => {}
        InputMethod::Mouse => {
            let (weak, canvas) = (Rc::downgrade(rt), canvas.clone());
            listen(rt, target, "mousemove", move |event: MouseEvent| {
                let Some(rt) = weak.upgrade() else { return };
                let client = Vec2::new(event.client_x() as f32, event.client_y() as f32);
                if let Some(pointer) = rt.borrow_mut().game.source_mut().pointer_mut() {
                    pointer.on_mouse_move(client, client_rect(&canvas));
                }
            })?;

            let (weak, canvas) = (Rc::downgrade(rt), canvas.clone());
            listen(rt, target, "mousedown", move |event: MouseEvent| {
                let Some(rt) = weak.upgrade() else { return };
                let client = Vec2::new(event.client_x() as f32, event.client_y() as f32);
                if let Some(pointer) = rt.borrow_mut().game.source_mut().pointer_mut() {
                    pointer.on_mouse_down(event.button(), client, client_rect(&canvas), now());
                }
            })?;
        }
        InputMethod::Touch => {
            fn first_touch(event: &TouchEvent) -> Option<Vec2> {
                event
                    .touches()
                    .get(0)
                    .map(|t| Vec2::new(t.client_x() as f32, t.client_y() as f32))
            }

            let (weak, canvas) = (Rc::downgrade(rt), canvas.clone());
            listen(rt, target, "touchstart", move |event: TouchEvent| {
                event.prevent_default();
                let Some(rt) = weak.upgrade() else { return };
                if let Some(pointer) = rt.borrow_mut().game.source_mut().pointer_mut() {
                    pointer.on_touch_start(first_touch(&event), client_rect(&canvas), now());
                }
            })?;

            let (weak, canvas) = (Rc::downgrade(rt), canvas.clone());
            listen(rt, target, "touchmove", move |event: TouchEvent| {
                event.prevent_default();
                let Some(rt) = weak.upgrade() else { return };
                if let Some(pointer) = rt.borrow_mut().game.source_mut().pointer_mut() {
                    pointer.on_touch_move(first_touch(&event), client_rect(&canvas));
                }
            })?;
        }
    }
    Ok(())
}

fn auto_pause(rt: &Shared, reason: &str) {
    let mut r = rt.borrow_mut();
    if r.game.phase() == Phase::Playing {
        r.game.pause();
        log::info!("Auto-paused ({reason})");
    }
}

fn bind_auto_pause(rt: &Shared, window: &Window, document: &Document) -> Result<(), JsValue> {
    let (weak, doc) = (Rc::downgrade(rt), document.clone());
    listen(rt, document.as_ref(), "visibilitychange", move |_event: web_sys::Event| {
        if doc.visibility_state() == web_sys::VisibilityState::Hidden {
            if let Some(rt) = weak.upgrade() {
                auto_pause(&rt, "tab hidden");
            }
        }
    })?;

    let weak = Rc::downgrade(rt);
    listen(rt, window.as_ref(), "blur", move |_event: web_sys::FocusEvent| {
        if let Some(rt) = weak.upgrade() {
            auto_pause(&rt, "window blur");
        }
    })?;
    Ok(())
}

/// Route `log` to the browser console. Safe to call more than once.
pub fn init_logging() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        log::debug!("Logger already initialized");
    }
}

/// Game handle exposed to JavaScript
#[wasm_bindgen]
pub struct MathShot {
    runtime: Shared,
}

#[wasm_bindgen]
impl MathShot {
    /// Mount on the canvas with id `canvas_id`, configured from the page URL
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str) -> Result<MathShot, JsValue> {
        init_logging();
        Self::mount(canvas_id, GameSettings::load())
    }

    pub fn start(&self) {
        self.runtime.borrow_mut().game.start();
    }

    pub fn pause(&self) {
        self.runtime.borrow_mut().game.pause();
    }

    pub fn reset(&self) {
        self.runtime.borrow_mut().game.reset();
    }

    /// Current frame as JSON
    pub fn snapshot(&self) -> Result<String, JsValue> {
        let view = self.runtime.borrow().game.snapshot();
        serde_json::to_string(&view).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Round events since the last call, as a JSON array
    pub fn events(&self) -> Result<String, JsValue> {
        let events = self.runtime.borrow_mut().game.drain_events();
        serde_json::to_string(&events).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Stop the loop, unbind listeners and close the socket
    pub fn teardown(&self) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let mut r = self.runtime.borrow_mut();
        if r.torn_down {
            return;
        }
        r.torn_down = true;

        if let Some(id) = r.frame_request.take() {
            let _ = window.cancel_animation_frame(id);
        }
        if let Some((handle, _)) = r.timeout.take() {
            window.clear_timeout_with_handle(handle);
        }
        for listener in r.listeners.drain(..) {
            let _ = listener.target.remove_event_listener_with_callback(
                listener.kind,
                listener.closure.as_ref().unchecked_ref(),
            );
        }

        if let Some(TransportCommand::Close {
            socket,
            code,
            reason,
        }) = r.game.teardown()
        {
            if let Some(handle) = r.sockets.get(&socket) {
                let _ = handle.socket.close_with_code_and_reason(code, reason);
            }
        }
        for (_, handle) in r.sockets.drain() {
            handle.detach();
        }
        r.retired.clear();
        log::info!("Math Shot torn down");
    }
}

/// Dropping the handle from JS (`free()`) must not leave listeners behind
impl Drop for MathShot {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl MathShot {
    pub fn mount(canvas_id: &str, settings: GameSettings) -> Result<MathShot, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let canvas: HtmlCanvasElement = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| JsValue::from_str("no canvas"))?
            .dyn_into()
            .map_err(|_| JsValue::from_str("not a canvas"))?;

        let seed = js_sys::Date::now() as u64;
        let method = settings.input_method;
        let mut game = Game::new(settings, seed);
        game.set_viewport(viewport_of(&canvas));
        log::info!("Game initialized with seed: {}", seed);

        let runtime = Rc::new(RefCell::new(Runtime {
            game,
            canvas: canvas.clone(),
            sockets: HashMap::new(),
            retired: Vec::new(),
            listeners: Vec::new(),
            frame_request: None,
            timeout: None,
            torn_down: false,
        }));

        bind_pointer(&runtime, method, &canvas)?;
        bind_auto_pause(&runtime, &window, &document)?;
        request_frame(&runtime);

        Ok(MathShot { runtime })
    }
}
