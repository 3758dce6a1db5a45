use std::sync::{Arc, Mutex};
use glam::Vec2;
use instant::Instant;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorIcon, Window},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;
#[cfg(target_arch = "wasm32")]
use once_cell::sync::OnceCell;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen_futures::future_to_promise;
#[cfg(target_arch = "wasm32")]
use js_sys::Promise;

pub mod animation;
pub mod camera;
pub mod camera_animator;
pub mod controller;
pub mod font_loader;
pub mod interaction;
pub mod models;
pub mod options;
pub mod overlay;
pub mod scene;
pub mod ui_events;
pub mod view_shell;
mod app_state;

use app_state::State;
use interaction::CursorStyle;
use options::PortfolioOptions;
use scene::panel::PanelKey;
use ui_events::UserCommand;

#[cfg(target_arch = "wasm32")]
static WASM_API_INSTANCE: OnceCell<WasmApi> = OnceCell::new();

#[cfg(target_arch = "wasm32")]
static WASM_READY_FLUME_CHANNEL: OnceCell<(flume::Sender<()>, flume::Receiver<()>)> = OnceCell::new();

// 一行滚轮对应的像素
const WHEEL_LINE_PIXELS: f32 = 40.0;

struct App {
    window: Option<Arc<Window>>,
    state: Arc<Mutex<Option<State>>>,
    proxy: EventLoopProxy<UserCommand>,
    options: PortfolioOptions,
}

impl App {
    fn new(event_loop: &EventLoop<UserCommand>, options: PortfolioOptions) -> Self {
        let app_proxy = event_loop.create_proxy();

        #[cfg(target_arch = "wasm32")]
        {
            let wasm_api_instance = WasmApi { proxy: app_proxy.clone() };
            if WASM_API_INSTANCE.set(wasm_api_instance).is_err() {
                log::warn!("WASM_API_INSTANCE was already set. This should only happen once.");
            }
        }

        Self {
            window: None,
            state: Arc::new(Mutex::new(None)),
            proxy: app_proxy,
            options,
        }
    }

    fn dispose_state(&mut self) {
        let taken = match self.state.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(state) = taken {
            state.dispose();
        }
    }
}

fn cursor_icon(style: CursorStyle) -> CursorIcon {
    match style {
        CursorStyle::Pointer => CursorIcon::Pointer,
        CursorStyle::Default => CursorIcon::Default,
    }
}

fn panel_for_key(code: KeyCode) -> Option<PanelKey> {
    match code {
        KeyCode::Digit1 => Some(PanelKey::About),
        KeyCode::Digit2 => Some(PanelKey::Skills),
        KeyCode::Digit3 => Some(PanelKey::Experience),
        KeyCode::Digit4 => Some(PanelKey::Projects),
        _ => None,
    }
}

impl ApplicationHandler<UserCommand> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes()
            .with_title("Orbitfolio");

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let canvas = wgpu::web_sys::window()
                .and_then(|w| w.document())
                .and_then(|d| d.get_element_by_id(CANVAS_ID));
            match canvas {
                Some(canvas) => {
                    window_attributes = window_attributes.with_canvas(Some(canvas.unchecked_into()));
                }
                None => log::error!("Canvas element #{} not found, winit will create one.", CANVAS_ID),
            }
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };
        self.window = Some(window.clone());

        #[cfg(not(target_arch = "wasm32"))]
        {
            match pollster::block_on(State::new(window.clone(), &self.options)) {
                Ok(mut state) => {
                    let current_size = window.inner_size();
                    state.resize(current_size.width, current_size.height);
                    if let Ok(mut guard) = self.state.lock() {
                        guard.replace(state);
                    }
                    font_loader::spawn_font_fetch(self.options.font.url.clone(), self.proxy.clone());
                    window.request_redraw();
                }
                Err(e) => {
                    log::error!("Failed to create State: {:?}", e);
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            // Clone Arc<Mutex<Option<State>>> and Arc<Window> for the async task
            let state_arc_for_spawn = self.state.clone();
            let window_for_state_new = window.clone();
            let proxy_for_init_notification = self.proxy.clone();
            let options = self.options.clone();

            wasm_bindgen_futures::spawn_local(async move {
                match State::new(window_for_state_new.clone(), &options).await {
                    Ok(mut state_instance) => {
                        log::info!("WASM State created in async task.");
                        let initial_size = window_for_state_new.inner_size();
                        state_instance.resize(initial_size.width, initial_size.height);

                        if let Ok(mut app_state_guard) = state_arc_for_spawn.lock() {
                            app_state_guard.replace(state_instance);
                        }
                        log::info!("WASM State assigned to App. Sending initialization notification.");
                        if proxy_for_init_notification.send_event(UserCommand::StateInitialized).is_err() {
                            log::error!("Failed to send StateInitialized event.");
                        }
                        font_loader::spawn_font_fetch(options.font.url.clone(), proxy_for_init_notification);
                    },
                    Err(e) => log::error!("Failed to create State in WASM: {:?}", e),
                }
            });
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: UserCommand) {
        match event {
            UserCommand::StateInitialized => {
                log::info!("WASM State initialized and ready.");
                // Signal to the promise resolver
                #[cfg(target_arch = "wasm32")]
                if let Some((sender, _)) = WASM_READY_FLUME_CHANNEL.get() {
                    if let Err(e) = sender.send(()) {
                        log::error!("Failed to send WASM ready signal: {:?}", e);
                    }
                }
                if let Some(w_handle) = self.window.as_ref() {
                    w_handle.request_redraw();
                }
            }
            _ => {
                let Ok(mut guard) = self.state.lock() else {
                    return;
                };
                if let Some(state) = guard.as_mut() {
                    state.process_command(event);
                } else {
                    log::warn!("Received a command before state was initialized (via proxy). Ignoring: {:?}", event);
                }
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        if let WindowEvent::CloseRequested = event {
            self.dispose_state();
            event_loop.exit();
            return;
        }

        let Some(window_handle) = self.window.clone() else {
            return;
        };
        let Ok(mut guard) = self.state.lock() else {
            log::error!("State mutex poisoned, ignoring window event.");
            return;
        };
        let Some(state) = guard.as_mut() else {
            log::warn!("Window event received before State was initialized, ignoring.");
            return;
        };

        match event {
            WindowEvent::Resized(size) => {
                state.resize(size.width, size.height);
                window_handle.request_redraw();
            }
            WindowEvent::RedrawRequested => {
                let output = state.update(Instant::now());
                if let Some(style) = output.cursor {
                    window_handle.set_cursor(cursor_icon(style));
                }
                match state.render() {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        state.resize(state.config.width, state.config.height)
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Surface out of memory, exiting.");
                        event_loop.exit();
                    }
                    Err(e) => log::error!("{:?}", e),
                }
                // 持续渲染：浮动、旋转和补间每帧都在变化
                window_handle.request_redraw();
            }
            WindowEvent::MouseInput { state: mouse_button_state, button: MouseButton::Left, .. } => {
                if mouse_button_state.is_pressed() {
                    state.controller.pointer_pressed();
                } else {
                    state.controller.pointer_released(Instant::now());
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                state.controller.pointer_moved(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::CursorLeft { .. } => {
                state.controller.pointer_left();
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let y_scroll_delta = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y * WHEEL_LINE_PIXELS,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32,
                };
                state.controller.wheel(y_scroll_delta);
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: key_state,
                        repeat,
                        ..
                    },
                ..
            } => {
                if key_state.is_pressed() && !repeat {
                    let now = Instant::now();
                    if code == KeyCode::Escape {
                        state.controller.close_panel(now);
                    } else if let Some(key) = panel_for_key(code) {
                        state.controller.select(key, now);
                    }
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.dispose_state();
    }
}

pub fn run() -> anyhow::Result<()> {
    cfg_if::cfg_if! {
        if #[cfg(target_arch = "wasm32")] {
            console_error_panic_hook::set_once();
            console_log::init_with_level(log::Level::Info)
                .map_err(|e| anyhow::anyhow!("failed to initialize console logger: {e}"))?;
            log::info!("Starting Orbitfolio.");
            let (sender, receiver) = flume::unbounded();
            if WASM_READY_FLUME_CHANNEL.set((sender, receiver)).is_err() {
                log::warn!("WASM ready channel was already initialized.");
            }
            log::info!("WASM ready channel created and stored.");
        } else {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
        }
    }

    let options = PortfolioOptions::load();
    let event_loop = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, options);
    event_loop.run_app(&mut app)?;

    Ok(())
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> Result<(), wasm_bindgen::JsValue> {
    run().map_err(|e| JsValue::from_str(&format!("{e:#}")))
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
#[derive(Clone, Debug)]
pub struct WasmApi {
    proxy: EventLoopProxy<UserCommand>,
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
impl WasmApi {
    /// `key` 为 "about" | "skills" | "experience" | "projects"
    #[wasm_bindgen(js_name = openPanel)]
    pub fn open_panel(&self, key: &str) -> Result<(), JsValue> {
        let key: PanelKey = key
            .parse()
            .map_err(|e: anyhow::Error| JsValue::from_str(&e.to_string()))?;
        log::info!("Received openPanel({}) from JS.", key);
        self.send(UserCommand::OpenPanel(key))
    }

    #[wasm_bindgen(js_name = closePanel)]
    pub fn close_panel(&self) -> Result<(), JsValue> {
        self.send(UserCommand::ClosePanel)
    }

    fn send(&self, command: UserCommand) -> Result<(), JsValue> {
        if self.proxy.send_event(command).is_err() {
            return Err(JsValue::from_str("Failed to send command to event loop."));
        }
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(js_name = getWasmApi)]
pub fn get_wasm_api() -> Result<WasmApi, JsValue> {
    WASM_API_INSTANCE.get()
        .cloned()
        .ok_or_else(|| JsValue::from_str("WasmApi is not initialized. Call run_web() first."))
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(js_name = getWasmReadyPromise)]
pub fn get_wasm_ready_promise() -> Result<Promise, JsValue> {
    let (_, receiver) = WASM_READY_FLUME_CHANNEL.get()
        .ok_or_else(|| JsValue::from_str("WASM ready channel not initialized. Call run_web() first."))?;
    let receiver = receiver.clone();

    // 将 Rust Future 转换为 JS Promise
    let ready_promise = future_to_promise(async move {
        receiver
            .recv_async()
            .await
            .map_err(|e| JsValue::from_str(&format!("ready channel closed: {e}")))?;
        Ok(JsValue::NULL)
    });

    Ok(ready_promise)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_keys_map_to_panels_in_order() {
        let keys: Vec<_> = [KeyCode::Digit1, KeyCode::Digit2, KeyCode::Digit3, KeyCode::Digit4]
            .into_iter()
            .filter_map(panel_for_key)
            .collect();
        assert_eq!(keys, PanelKey::ALL.to_vec());
        assert_eq!(panel_for_key(KeyCode::KeyA), None);
    }
}
