use rand::Rng;
use std::thread;
use std::time::Duration;

/// Sleep for `secs` seconds with +/-30% random jitter.
pub fn sleep_jitter(secs: f64) {
    if secs <= 0.0 {
        return;
    }
    let jitter = secs * 0.3;
    let actual = secs + rand::thread_rng().gen_range(-jitter..jitter);
    thread::sleep(Duration::from_secs_f64(actual.max(0.01)));
}

/// Sleep for exactly `secs` seconds.
pub fn sleep_secs(secs: f64) {
    if secs > 0.0 {
        thread::sleep(Duration::from_secs_f64(secs));
    }
}
