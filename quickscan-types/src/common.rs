//! Common helpers shared across models

/// Convert bytes to a human-readable string using base-1024 steps (e.g. "10.00 GB")
pub fn human_readable_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];
    let mut unit_index = 0;
    let mut value = bytes as f64;

    while value >= 1024.0 && unit_index < UNITS.len() - 1 {
        value /= 1024.0;
        unit_index += 1;
    }

    format!("{value:.2} {}", UNITS[unit_index])
}

#[cfg(test)]
mod tests {
    use super::human_readable_size;

    #[test]
    fn scales_by_1024_with_two_decimals() {
        assert_eq!(human_readable_size(0), "0.00 B");
        assert_eq!(human_readable_size(1023), "1023.00 B");
        assert_eq!(human_readable_size(1024), "1.00 KB");
        assert_eq!(human_readable_size(1536), "1.50 KB");
        assert_eq!(human_readable_size(10 * 1024 * 1024 * 1024), "10.00 GB");
    }

    #[test]
    fn stops_at_largest_unit() {
        let exbibyte = 1024_u64.pow(6);
        assert_eq!(human_readable_size(exbibyte), "1024.00 PB");
    }
}
