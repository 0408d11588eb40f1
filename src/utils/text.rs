//! 文本格式化辅助函数

/// 按字符截取前 `max_chars` 个字符（不追加省略号）
pub fn take_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// 格式化分数：整数不带小数点，其余保留必要的小数位
///
/// `20.0` → `"20"`，`1.5` → `"1.5"`
pub fn format_marks(marks: f64) -> String {
    if marks.is_finite() && marks.fract() == 0.0 {
        format!("{}", marks as i64)
    } else {
        let text = format!("{:.2}", marks);
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_chars_respects_char_boundaries() {
        assert_eq!(take_chars("héllo", 2), "hé");
        assert_eq!(take_chars("short", 100), "short");
        assert_eq!(take_chars("", 3), "");
    }

    #[test]
    fn test_format_marks() {
        assert_eq!(format_marks(20.0), "20");
        assert_eq!(format_marks(0.0), "0");
        assert_eq!(format_marks(1.5), "1.5");
        assert_eq!(format_marks(2.25), "2.25");
    }
}
