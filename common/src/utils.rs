use std::time::Duration;

pub fn format_elapsed(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs >= 60.0 {
        let mins = duration.as_secs() / 60;
        let rem = secs - (mins * 60) as f64;
        format!("{}m {:.2}s", mins, rem)
    } else {
        format!("{:.2}s", secs)
    }
}
