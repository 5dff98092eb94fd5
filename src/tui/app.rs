use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use kioskflow::flow::{FlowEvent, ScreenState};
use kioskflow::scan::ScanFeed;
use kioskflow::wedge::{KeyWedge, WedgeKey};
use kioskflow::Kiosk;

use super::event::AppEvent;

/// Terminal state around the running kiosk
pub struct App {
    pub kiosk: Kiosk,
    scan_feed: ScanFeed,
    wedge: KeyWedge,
    pub spinner_frame: usize,
    pub should_quit: bool,
}

impl App {
    pub fn new(kiosk: Kiosk, scan_feed: ScanFeed) -> Self {
        Self {
            kiosk,
            scan_feed,
            wedge: KeyWedge::new(),
            spinner_frame: 0,
            should_quit: false,
        }
    }

    /// Characters typed into the fob or address reader so far
    pub fn typed(&self) -> &str {
        self.wedge.pending()
    }

    /// Handle a terminal event. Returns false when the app should exit.
    pub fn handle_event(&mut self, event: AppEvent) -> bool {
        match event {
            AppEvent::Quit => {
                self.should_quit = true;
            }
            AppEvent::Tick => {
                self.spinner_frame = self.spinner_frame.wrapping_add(1);
            }
            AppEvent::Key(key) => {
                if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
                    self.should_quit = true;
                } else {
                    self.handle_key(key);
                }
            }
        }
        !self.should_quit
    }

    fn handle_key(&mut self, key: KeyEvent) {
        let controller = self.kiosk.controller();
        let alert_open = controller.alert().is_some();
        let prompt_open = controller.prompt().is_some();
        let screen = controller.screen();

        // Any key acknowledges an alert.
        if alert_open {
            self.kiosk.handle(FlowEvent::DismissAlert);
            return;
        }

        if prompt_open {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    self.kiosk.handle(FlowEvent::Confirm)
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.kiosk.handle(FlowEvent::Decline)
                }
                _ => {}
            }
            self.sync_wedge();
            return;
        }

        if key.code == KeyCode::Esc {
            self.wedge.clear();
            self.kiosk.handle(FlowEvent::RequestReturnHome);
            return;
        }

        match screen {
            ScreenState::Main => self.handle_main_key(key),
            ScreenState::AwaitFob => {
                if let Some(fob_id) = self.wedge.push(wedge_key(key)) {
                    self.kiosk.handle(FlowEvent::FobEntered(fob_id));
                }
            }
            ScreenState::ScanAddress => {
                if let Some(payload) = self.wedge.push(wedge_key(key)) {
                    self.scan_feed.push(Ok(payload));
                }
            }
            ScreenState::FobResolved => {
                if matches!(key.code, KeyCode::Enter | KeyCode::Char('p')) {
                    self.kiosk.handle(FlowEvent::PayMembership);
                }
            }
            ScreenState::InsertBill | ScreenState::MembershipInsertBill => {
                if matches!(key.code, KeyCode::Enter | KeyCode::Char('d')) {
                    self.kiosk.handle(FlowEvent::PressDone);
                }
            }
            _ => {}
        }
    }

    fn handle_main_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char(c) if c.is_ascii_digit() => {
                let index = (c as usize).wrapping_sub('1' as usize);
                let product = self.kiosk.controller().products().get(index).copied();
                if let Some(product) = product {
                    self.wedge.clear();
                    self.kiosk.handle(FlowEvent::SelectProduct(product));
                }
            }
            KeyCode::Char('E') => self.kiosk.handle(FlowEvent::RequestEmptyPayout),
            KeyCode::Char('R') => self.kiosk.handle(FlowEvent::RequestResetMachine),
            _ => {}
        }
    }

    /// Typed input belongs to the screen it was typed on.
    fn sync_wedge(&mut self) {
        let screen = self.kiosk.controller().screen();
        if !matches!(screen, ScreenState::AwaitFob | ScreenState::ScanAddress) {
            self.wedge.clear();
        }
    }
}

fn wedge_key(key: KeyEvent) -> WedgeKey {
    match key.code {
        KeyCode::Char(c) => WedgeKey::Char(c),
        KeyCode::Enter => WedgeKey::Enter,
        _ => WedgeKey::Other,
    }
}
