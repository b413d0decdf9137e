//! Human-readable formatting helpers

use std::time::Duration;

/// Format a duration the way run summaries print it: `350ms`, `4.20s`, `2m 3.50s`.
#[must_use]
pub fn format_elapsed(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    if millis < 1000 {
        return format!("{millis}ms");
    }

    let minutes = elapsed.as_secs() / 60;
    #[allow(clippy::cast_precision_loss)]
    let seconds = elapsed.as_secs_f64() - (minutes * 60) as f64;

    if minutes > 0 {
        format!("{minutes}m {seconds:.2}s")
    } else {
        format!("{seconds:.2}s")
    }
}
