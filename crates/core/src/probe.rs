//! Single-shot template probes against the live screen.
//!
//! A miss is a normal answer, not an error: callers decide whether to
//! retry. Every action a probe fires is followed by a fresh search on the
//! next attempt, never by trusting that the tap landed.

use crate::error::BotError;
use crate::logger;
use crate::platform::Platform;
use crate::poll::CancelToken;
use crate::types::*;

/// What to do with a match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Click at the match location plus the template's offset.
    Click,
    /// Drag from the match location.
    Drag { by: Offset, secs: f64 },
}

/// The single control thread's handle on the client screen.
pub struct Screen {
    platform: Box<dyn Platform>,
    cancel: CancelToken,
}

impl Screen {
    pub fn new(platform: Box<dyn Platform>, cancel: CancelToken) -> Self {
        Self { platform, cancel }
    }

    pub fn platform(&mut self) -> &mut dyn Platform {
        self.platform.as_mut()
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn check_cancel(&self) -> Result<(), BotError> {
        if self.cancel.is_cancelled() {
            return Err(BotError::Cancelled);
        }
        Ok(())
    }

    /// Search once and optionally act on the match.
    pub fn probe_outcome(&mut self, template: &Template, action: Option<Action>) -> Result<ProbeOutcome, BotError> {
        let Some(at) = self.platform.search_image(template)? else {
            return Ok(ProbeOutcome::default());
        };
        match action {
            Some(Action::Click) => {
                let target = at.shifted(template.offset);
                logger::info_p("probe", &format!("tap {} at ({}, {})", template.name(), target.x, target.y));
                self.platform.click(target)?;
            }
            Some(Action::Drag { by, secs }) => {
                logger::info_p("probe", &format!("drag {} by ({}, {})", template.name(), by.dx, by.dy));
                self.platform.drag(at, by, secs)?;
            }
            None => {}
        }
        Ok(ProbeOutcome { matched: true, location: Some(at) })
    }

    pub fn probe(&mut self, template: &Template, action: Option<Action>) -> Result<bool, BotError> {
        Ok(self.probe_outcome(template, action)?.matched)
    }

    pub fn seen(&mut self, template: &Template) -> Result<bool, BotError> {
        self.probe(template, None)
    }

    pub fn tap_if_seen(&mut self, template: &Template) -> Result<bool, BotError> {
        self.probe(template, Some(Action::Click))
    }

    pub fn drag_if_seen(&mut self, template: &Template, by: Offset, secs: f64) -> Result<bool, BotError> {
        self.probe(template, Some(Action::Drag { by, secs }))
    }

    pub fn tap(&mut self, at: Point) -> Result<bool, BotError> {
        Ok(self.platform.click(at)?)
    }

    pub fn drag(&mut self, from: Point, by: Offset, secs: f64) -> Result<bool, BotError> {
        Ok(self.platform.drag(from, by, secs)?)
    }

    pub fn key(&mut self, key: &str) -> Result<(), BotError> {
        Ok(self.platform.press_key(key)?)
    }

    pub fn wait(&mut self, secs: f64) {
        if secs > 0.0 {
            self.platform.sleep(secs);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::script::{Call, ScriptedPlatform};

    fn screen(script: &ScriptedPlatform) -> Screen {
        Screen::new(Box::new(script.clone()), CancelToken::new())
    }

    #[test]
    fn miss_is_not_an_error() {
        let script = ScriptedPlatform::new();
        let mut s = screen(&script);
        let t = Template::new("assets/other/menu.png", 0.95);
        assert!(!s.tap_if_seen(&t).unwrap());
        assert_eq!(script.calls(), vec![Call::Search("menu".into())]);
    }

    #[test]
    fn click_applies_template_offset() {
        let script = ScriptedPlatform::new();
        script.always("next", true).locate("next", Point::new(300, 400));
        let mut s = screen(&script);
        let t = Template::new("next.png", 0.95).with_offset(Offset::new(10, -5));
        let out = s.probe_outcome(&t, Some(Action::Click)).unwrap();
        assert_eq!(out, ProbeOutcome { matched: true, location: Some(Point::new(300, 400)) });
        assert_eq!(script.clicks_at(Point::new(310, 395)), 1);
    }

    #[test]
    fn drag_starts_at_match() {
        let script = ScriptedPlatform::new();
        script.always("scroll", true).locate("scroll", Point::new(1800, 200));
        let mut s = screen(&script);
        assert!(s.drag_if_seen(&Template::new("scroll.png", 0.95), Offset::new(0, 55), 0.3).unwrap());
        assert!(script.calls().contains(&Call::Drag(Point::new(1800, 200), Offset::new(0, 55))));
    }

    #[test]
    fn backend_failure_surfaces() {
        let script = ScriptedPlatform::new();
        script.fail_search("notice");
        let mut s = screen(&script);
        let err = s.seen(&Template::new("notice.png", 0.95)).unwrap_err();
        assert!(matches!(err, BotError::Backend(_)));
    }

    #[test]
    fn zero_wait_does_not_sleep() {
        let script = ScriptedPlatform::new();
        let mut s = screen(&script);
        s.wait(0.0);
        s.wait(0.5);
        assert_eq!(script.sleeps(), 1);
    }
}
