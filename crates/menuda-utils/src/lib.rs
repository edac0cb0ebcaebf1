//! Utility functions and helpers

/// Insert `separator` between groups of three digits
fn group_digits(digits: &str, separator: &str) -> String {
    let mut result = String::new();
    let mut count = 0;
    for c in digits.chars().rev() {
        if count == 3 {
            result.push_str(&separator.chars().rev().collect::<String>());
            count = 0;
        }
        result.push(c);
        count += 1;
    }
    result.chars().rev().collect()
}

/// Separators and symbol used when rendering money
#[derive(Debug, Clone, Copy)]
pub struct NumberFormat<'a> {
    pub symbol: &'a str,
    pub thousands_separator: &'a str,
    pub decimal_separator: &'a str,
}

impl Default for NumberFormat<'_> {
    fn default() -> Self {
        Self {
            symbol: "$",
            thousands_separator: ",",
            decimal_separator: ".",
        }
    }
}

/// Render an already-rounded plain decimal string ("-1234.50") as money ("-$1,234.50")
pub fn format_money(plain: &str, format: &NumberFormat<'_>) -> String {
    let (negative, unsigned) = match plain.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, plain),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(format.symbol);
    out.push_str(&group_digits(int_part, format.thousands_separator));
    if let Some(frac) = frac_part {
        out.push_str(format.decimal_separator);
        out.push_str(frac);
    }
    out
}

/// Escape text for safe interpolation into HTML content and attributes
pub fn escape_html(content: &str) -> String {
    let mut escaped = String::with_capacity(content.len());
    for c in content.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Appends a version parameter to static asset URLs so browsers refetch them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheBuster {
    pub version: String,
}

impl CacheBuster {
    pub fn new(version: impl Into<String>) -> Self {
        Self { version: version.into() }
    }

    /// Add the version parameter; data URLs and absolute URLs are left untouched
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("data:") || path.starts_with("http") {
            return path.to_string();
        }
        let separator = if path.contains('?') { '&' } else { '?' };
        format!("{}{}v={}", path, separator, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_digits() {
        assert_eq!(group_digits("0", ","), "0");
        assert_eq!(group_digits("999", ","), "999");
        assert_eq!(group_digits("1000", ","), "1,000");
        assert_eq!(group_digits("1234567", " "), "1 234 567");
    }

    #[test]
    fn test_format_money() {
        let format = NumberFormat::default();
        assert_eq!(format_money("1234.50", &format), "$1,234.50");
        assert_eq!(format_money("-12.00", &format), "-$12.00");
        assert_eq!(format_money("7", &format), "$7");
    }

    #[test]
    fn test_format_money_custom_separators() {
        let format = NumberFormat {
            symbol: "€",
            thousands_separator: ".",
            decimal_separator: ",",
        };
        assert_eq!(format_money("-1234567.89", &format), "-€1.234.567,89");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_cache_buster() {
        let buster = CacheBuster::new("1700000000000");
        assert_eq!(buster.url("/assets/app.js"), "/assets/app.js?v=1700000000000");
        assert_eq!(buster.url("/assets/app.js?x=1"), "/assets/app.js?x=1&v=1700000000000");
        assert_eq!(buster.url("https://cdn.example.com/a.js"), "https://cdn.example.com/a.js");
        assert_eq!(buster.url("data:image/png;base64,AAAA"), "data:image/png;base64,AAAA");
    }
}
