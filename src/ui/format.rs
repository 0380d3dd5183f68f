/// Elapsed time as `m:ss`. Minutes are not folded into hours.
pub fn format_time(ms: u64) -> String {
    let total_seconds = ms / 1000;
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

pub fn volume_icon(volume: f32) -> &'static str {
    if volume <= 0.0 {
        "🔇"
    } else if volume < 0.5 {
        "🔉"
    } else {
        "🔊"
    }
}
