use chrono::{DateTime, Local, TimeZone};

pub fn format_timestamp(timestamp: i64) -> String {
    let datetime: DateTime<Local> = match Local.timestamp_millis_opt(timestamp).single() {
        Some(dt) => dt,
        None => return "-".to_string(),
    };

    datetime.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn preview_text(input: &str, max_len: usize) -> String {
    if input.chars().count() <= max_len {
        return input.to_string();
    }

    let mut preview = input.chars().take(max_len).collect::<String>();
    preview.push('…');
    preview
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_on_char_boundary() {
        assert_eq!(preview_text("short", 10), "short");
        assert_eq!(preview_text("héllo wörld", 5), "héllo…");
    }

    #[test]
    fn out_of_range_timestamp_renders_dash() {
        assert_eq!(format_timestamp(i64::MAX), "-");
        assert_ne!(format_timestamp(0), "-");
    }
}
