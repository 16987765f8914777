use common::Candle;

/// Average True Range over the trailing `period` true ranges.
/// Needs `period + 1` candles because each true range looks at the previous close.
pub fn atr(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || candles.len() < period + 1 {
        return None;
    }

    let window = &candles[candles.len() - (period + 1)..];
    let total: f64 = window
        .windows(2)
        .map(|w| {
            let (prev, cur) = (&w[0], &w[1]);
            (cur.high - cur.low)
                .max((cur.high - prev.close).abs())
                .max((cur.low - prev.close).abs())
        })
        .sum();

    Some(total / period as f64)
}
