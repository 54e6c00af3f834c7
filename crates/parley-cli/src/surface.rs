// ABOUTME: Terminal implementations of the client's UI surface
// ABOUTME: Interactive surface with a live status line, plus a quiet one for scripting

use parley_client::{Role, UiSurface};
use std::io::Write;
use std::sync::Mutex;

/// Interactive surface: assistant turns go to stdout, the status indicator
/// is a single rewritten line on stderr.
#[derive(Default)]
pub struct TerminalSurface {
    state: Mutex<SurfaceState>,
}

#[derive(Default)]
struct SurfaceState {
    /// Active indicator, if any: (id, last text shown)
    indicator: Option<(String, String)>,
}

impl TerminalSurface {
    fn redraw_status(&self, text: &str) {
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "\r\x1b[2K· {}", text);
        let _ = stderr.flush();
    }

    fn clear_status_line(&self) {
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "\r\x1b[2K");
        let _ = stderr.flush();
    }
}

impl UiSurface for TerminalSurface {
    fn set_status(&self, text: &str, healthy: bool) {
        tracing::debug!(status = %text, healthy, "ambient status");
    }

    fn show_error(&self, text: &str) {
        self.clear_status_line();
        eprintln!("error: {}", text);
    }

    fn append_transcript_entry(&self, role: Role, text: &str) {
        // The user's own line is already on screen from typing it.
        if role == Role::Assistant {
            self.clear_status_line();
            println!("agent> {}", text);
        }
    }

    fn set_send_enabled(&self, _enabled: bool) {}

    fn create_indicator(&self, id: &str, text: &str) {
        let mut state = self.state.lock().expect("surface state lock poisoned");
        state.indicator = Some((id.to_string(), text.to_string()));
        drop(state);
        self.redraw_status(text);
    }

    fn update_indicator(&self, id: &str, text: &str) {
        let mut state = self.state.lock().expect("surface state lock poisoned");
        match &mut state.indicator {
            Some((active_id, active_text)) if active_id == id => {
                *active_text = text.to_string();
            }
            // Update for an indicator that no longer exists: nothing to do.
            _ => return,
        }
        drop(state);
        self.redraw_status(text);
    }

    fn remove_indicator(&self, id: &str) {
        let mut state = self.state.lock().expect("surface state lock poisoned");
        let matches = state
            .indicator
            .as_ref()
            .map(|(active_id, _)| active_id == id)
            .unwrap_or(false);
        if matches {
            state.indicator = None;
            drop(state);
            self.clear_status_line();
        }
    }
}

/// Scripting surface: only the assistant's response reaches stdout. Errors
/// are reported through the send result, so nothing is printed here.
#[derive(Default)]
pub struct QuietSurface;

impl UiSurface for QuietSurface {
    fn set_status(&self, _text: &str, _healthy: bool) {}

    fn show_error(&self, _text: &str) {}

    fn append_transcript_entry(&self, role: Role, text: &str) {
        if role == Role::Assistant {
            println!("{}", text);
        }
    }

    fn set_send_enabled(&self, _enabled: bool) {}
    fn create_indicator(&self, _id: &str, _text: &str) {}
    fn update_indicator(&self, _id: &str, _text: &str) {}
    fn remove_indicator(&self, _id: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_for_unknown_indicator_is_a_noop() {
        let surface = TerminalSurface::default();
        surface.update_indicator("ghost", "text");
        assert!(surface.state.lock().unwrap().indicator.is_none());
    }

    #[test]
    fn test_indicator_lifecycle_tracks_active_id() {
        let surface = TerminalSurface::default();
        surface.create_indicator("ind-1", "Working");
        surface.update_indicator("ind-1", "Searching");
        {
            let state = surface.state.lock().unwrap();
            let (id, text) = state.indicator.as_ref().unwrap();
            assert_eq!(id, "ind-1");
            assert_eq!(text, "Searching");
        }
        // A stale id must not clear the active indicator.
        surface.remove_indicator("ind-0");
        assert!(surface.state.lock().unwrap().indicator.is_some());
        surface.remove_indicator("ind-1");
        assert!(surface.state.lock().unwrap().indicator.is_none());
    }
}
