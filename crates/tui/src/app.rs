use std::sync::mpsc;

use sortie_core::poll::CancelToken;
use sortie_core::types::{RunState, SharedStatus};

use crate::confirm::ConfirmDialog;

/// Most log lines kept in memory for the log panel.
const LOG_CAPACITY: usize = 5000;

pub struct App {
    pub status: SharedStatus,
    pub log_visible: bool,
    pub log_messages: Vec<String>,
    pub log_scroll: usize, // scroll offset from bottom (0 = latest)
    pub log_rx: mpsc::Receiver<String>,
    pub cancel: CancelToken,
    pub confirm: Option<ConfirmDialog>,
    pub should_quit: bool,
}

impl App {
    pub fn new(status: SharedStatus, log_rx: mpsc::Receiver<String>, cancel: CancelToken) -> Self {
        Self {
            status,
            log_visible: true,
            log_messages: Vec::new(),
            log_scroll: 0,
            log_rx,
            cancel,
            confirm: None,
            should_quit: false,
        }
    }

    pub fn drain_logs(&mut self) {
        while let Ok(msg) = self.log_rx.try_recv() {
            self.log_messages.push(msg);
            // keep the view pinned to the line the user is reading
            if self.log_scroll > 0 {
                self.log_scroll += 1;
            }
        }
        if self.log_messages.len() > LOG_CAPACITY {
            let excess = self.log_messages.len() - LOG_CAPACITY;
            self.log_messages.drain(..excess);
        }
    }

    pub fn scroll_log_up(&mut self, n: usize) {
        self.log_scroll = self.log_scroll.saturating_add(n);
    }

    pub fn scroll_log_down(&mut self, n: usize) {
        self.log_scroll = self.log_scroll.saturating_sub(n);
    }

    pub fn toggle_log(&mut self) {
        self.log_visible = !self.log_visible;
    }

    pub fn run_state(&self) -> RunState {
        self.status.lock().map(|s| s.state).unwrap_or(RunState::Failed)
    }

    /// Ask the runner to stop after the current attempt.
    pub fn stop(&mut self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        if let Ok(mut st) = self.status.lock() {
            if st.state == RunState::Running {
                st.state = RunState::Stopping;
            }
        }
    }

    /// Quit right away when idle; ask first while a run is in progress.
    pub fn request_quit(&mut self) {
        if self.run_state() == RunState::Running {
            self.confirm = Some(ConfirmDialog::new("Stop the run and quit?"));
        } else {
            self.quit();
        }
    }

    /// Close the dialog; `yes` quits.
    pub fn answer_confirm(&mut self, yes: bool) {
        self.confirm = None;
        if yes {
            self.quit();
        }
    }

    pub fn quit(&mut self) {
        self.stop();
        self.should_quit = true;
    }
}
