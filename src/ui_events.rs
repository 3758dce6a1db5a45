use instant::Instant;

use crate::app_state::State;
use crate::font_loader::{FontLoadOutcome, register_font};
use crate::scene::panel::PanelKey;


#[derive(Debug)]
pub enum UserCommand {
    OpenPanel(PanelKey),
    ClosePanel,
    FontFetched(FontLoadOutcome),
    StateInitialized, // Notifies App that State setup is complete
}

impl State {
    pub fn process_command(&mut self, command: UserCommand) {
        let now = Instant::now();
        match command {
            UserCommand::OpenPanel(key) => {
                log::info!("Open panel command received: {}", key);
                self.controller.select(key, now);
            }
            UserCommand::ClosePanel => {
                self.controller.close_panel(now);
            }
            UserCommand::FontFetched(outcome) => self.apply_font(outcome, now),
            UserCommand::StateInitialized => {
                // This command is handled in App::user_event
            }
        }
    }

    fn apply_font(&mut self, outcome: FontLoadOutcome, now: Instant) {
        let family = match outcome {
            FontLoadOutcome::Loaded(bytes) => {
                let size = bytes.len();
                match register_font(&mut self.glyphon_font_system, bytes) {
                    Some(family) => {
                        log::info!("Label font '{}' registered ({} bytes).", family, size);
                        Some(family)
                    }
                    None => {
                        log::warn!("Downloaded font data ({} bytes) contained no usable face.", size);
                        None
                    }
                }
            }
            FontLoadOutcome::Failed(reason) => {
                log::warn!("Label font unavailable, continuing without labels: {}", reason);
                None
            }
        };

        if let Some(name) = &family {
            // 浏览器中没有系统字体，界面文字也使用这个字体
            self.glyphon_font_system.db_mut().set_sans_serif_family(name.clone());
            self.invalidate_text();
        }
        let labels_available = family.is_some();
        self.label_family = family;
        self.controller.font_settled(labels_available, now);
    }
}
