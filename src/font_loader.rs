// src/font_loader.rs
// 节点标签字体：启动时异步下载，结果通过 EventLoopProxy 送回事件循环
use winit::event_loop::EventLoopProxy;

use crate::ui_events::UserCommand;

/// Result of the label font request, delivered as [`UserCommand::FontFetched`].
#[derive(Debug)]
pub enum FontLoadOutcome {
    Loaded(Vec<u8>),
    Failed(String),
}

fn deliver(proxy: &EventLoopProxy<UserCommand>, outcome: FontLoadOutcome) {
    if proxy.send_event(UserCommand::FontFetched(outcome)).is_err() {
        log::warn!("Event loop closed before the font request finished.");
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn fetch_blocking(url: &str) -> anyhow::Result<Vec<u8>> {
    let response = reqwest::blocking::get(url)?.error_for_status()?;
    Ok(response.bytes()?.to_vec())
}

#[cfg(target_arch = "wasm32")]
async fn fetch(url: &str) -> anyhow::Result<Vec<u8>> {
    let response = reqwest::get(url).await?.error_for_status()?;
    Ok(response.bytes().await?.to_vec())
}

/// Starts the font download without blocking the render loop.
pub fn spawn_font_fetch(url: String, proxy: EventLoopProxy<UserCommand>) {
    log::info!("Fetching label font from {}", url);

    #[cfg(not(target_arch = "wasm32"))]
    {
        let spawned = std::thread::Builder::new()
            .name("font-fetch".to_string())
            .spawn({
                let proxy = proxy.clone();
                let url = url.clone();
                move || {
                    let outcome = match fetch_blocking(&url) {
                        Ok(bytes) => FontLoadOutcome::Loaded(bytes),
                        Err(e) => FontLoadOutcome::Failed(format!("{e:#}")),
                    };
                    deliver(&proxy, outcome);
                }
            });
        if let Err(e) = spawned {
            deliver(&proxy, FontLoadOutcome::Failed(format!("failed to spawn font thread: {e}")));
        }
    }

    #[cfg(target_arch = "wasm32")]
    {
        wasm_bindgen_futures::spawn_local(async move {
            let outcome = match fetch(&url).await {
                Ok(bytes) => FontLoadOutcome::Loaded(bytes),
                Err(e) => FontLoadOutcome::Failed(format!("{e:#}")),
            };
            deliver(&proxy, outcome);
        });
    }
}

/// Adds font bytes to the glyphon font system and returns the family name of
/// the new face, or `None` if the data held no usable face.
pub fn register_font(font_system: &mut glyphon::FontSystem, bytes: Vec<u8>) -> Option<String> {
    let before = font_system.db().len();
    font_system.db_mut().load_font_data(bytes);
    if font_system.db().len() == before {
        return None;
    }
    font_system
        .db()
        .faces()
        .last()
        .and_then(|face| face.families.first())
        .map(|(family, _)| family.clone())
}
