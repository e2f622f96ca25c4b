pub mod audit;
pub mod checkins;
pub mod doctor;
pub mod recall;
pub mod reset;
pub mod stats;

/// Truncate to `max` characters, appending `...` when cut.
pub(crate) fn preview(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}
