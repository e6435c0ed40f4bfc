pub mod helper;
pub mod script;
pub mod stub;

use anyhow::Result;

use crate::logger;
use crate::settings::Settings;
use crate::sleep;
use crate::types::*;

/// The vision-and-input backend plus client lifecycle control.
///
/// Absence of a match is `Ok(None)`, never an error; errors mean the
/// backend itself failed.
pub trait Platform: Send {
    fn search_image(&mut self, template: &Template) -> Result<Option<Point>>;
    fn click(&mut self, at: Point) -> Result<bool>;
    fn drag(&mut self, from: Point, by: Offset, secs: f64) -> Result<bool>;
    fn press_key(&mut self, key: &str) -> Result<()>;
    fn kill_client(&mut self, confidence: f64) -> Result<bool>;
    fn relaunch_client(&mut self, icon: &Template) -> Result<bool>;

    /// Inter-attempt pause. Test platforms override this to record instead.
    fn sleep(&mut self, secs: f64) {
        sleep::sleep_jitter(secs);
    }
}

/// Create the platform the settings ask for. Falls back to the stub when
/// no helper is configured.
pub fn create_platform(settings: &Settings, force_stub: bool) -> Box<dyn Platform> {
    if !force_stub {
        if let Some(helper) = &settings.helper {
            logger::register_prefix("helper", logger::COLOR_GRAY);
            return Box::new(helper::HelperPlatform::new(helper.clone(), settings.jitter));
        }
        logger::warn("no helper configured, running against the stub platform");
    }
    logger::register_prefix("stub", logger::COLOR_GRAY);
    Box::new(stub::StubPlatform::new(settings.jitter))
}
