use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub const NOT_AVAILABLE: &str = "N/A";

pub fn truncate_unicode(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    let mut result = String::new();
    let mut width = 0;
    for ch in s.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if width + ch_width > max_width.saturating_sub(1) {
            result.push('\u{2026}');
            break;
        }
        result.push(ch);
        width += ch_width;
    }
    result
}

/// Human-readable size for a value counted in kibibytes.
pub fn format_kb(kb: u64) -> String {
    const MB: u64 = 1024;
    const GB: u64 = 1024 * 1024;

    if kb >= GB {
        format!("{:.1} GB", kb as f64 / GB as f64)
    } else if kb >= MB {
        format!("{:.1} MB", kb as f64 / MB as f64)
    } else {
        format!("{kb} KB")
    }
}

pub fn format_optional_kb(kb: Option<u64>) -> String {
    kb.map(format_kb)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

pub fn format_optional<T: ToString>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

pub fn format_percent(percent: f32) -> String {
    format!("{percent:.1}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kb_units() {
        assert_eq!(format_kb(512), "512 KB");
        assert_eq!(format_kb(2048), "2.0 MB");
        assert_eq!(format_kb(3 * 1024 * 1024 + 512 * 1024), "3.5 GB");
    }

    #[test]
    fn missing_values_render_not_available() {
        assert_eq!(format_optional_kb(None), "N/A");
        assert_eq!(format_optional::<u32>(None), "N/A");
        assert_eq!(format_optional(Some(12u32)), "12");
    }

    #[test]
    fn truncation_adds_ellipsis() {
        assert_eq!(truncate_unicode("systemd", 10), "systemd");
        assert_eq!(truncate_unicode("systemd-journald", 8), "systemd\u{2026}");
    }

    #[test]
    fn percent_has_one_decimal() {
        assert_eq!(format_percent(0.376_884), "0.4%");
        assert_eq!(format_percent(100.0), "100.0%");
    }
}
