/// Arithmetic mean of the trailing `period` values.
/// Returns `None` if `period` is zero or there are fewer than `period` values.
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let window = &values[values.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_of_trailing_window() {
        let closes = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(sma(&closes, 2), Some(4.5));
        assert_eq!(sma(&closes, 5), Some(3.0));
    }

    #[test]
    fn sma_none_when_short() {
        assert_eq!(sma(&[1.0, 2.0], 3), None);
        assert_eq!(sma(&[1.0, 2.0], 0), None);
    }
}
