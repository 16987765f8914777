use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLCV candle as produced by a candle source. Never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub timestamp: DateTime<Utc>,
}

impl Candle {
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn upper_wick(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    pub fn lower_wick(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// Oldest-first window of candles for one evaluation cycle.
///
/// Rebuilt from every fetch; there is no way to push into an existing series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    /// Build a series, sorting by timestamp so sources may return any order.
    pub fn new(mut candles: Vec<Candle>) -> Self {
        candles.sort_by_key(|c| c.timestamp);
        Self { candles }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn as_slice(&self) -> &[Candle] {
        &self.candles
    }

    /// The most recent candle.
    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// The candle before the most recent one.
    pub fn previous(&self) -> Option<&Candle> {
        self.candles.len().checked_sub(2).map(|i| &self.candles[i])
    }

    /// The trailing `n` candles, or the whole series if it is shorter.
    pub fn trailing(&self, n: usize) -> &[Candle] {
        let start = self.candles.len().saturating_sub(n);
        &self.candles[start..]
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }
}

impl From<Vec<Candle>> for CandleSeries {
    fn from(candles: Vec<Candle>) -> Self {
        Self::new(candles)
    }
}

/// Latest 24h ticker returned by a candle source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: String,
    pub last: f64,
    pub bid: f64,
    pub ask: f64,
    pub volume_24h: f64,
    /// 24h change in percent.
    pub change_24h: f64,
}

/// Candle pattern detected on the most recent candle(s).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Pattern {
    BullishEngulfing,
    Hammer,
    PinbarBullish,
    Doji,
    #[default]
    None,
}

impl Pattern {
    /// Confidence contribution of this pattern.
    pub fn weight(&self) -> u8 {
        match self {
            Pattern::BullishEngulfing => 30,
            Pattern::Hammer => 25,
            Pattern::PinbarBullish => 25,
            Pattern::Doji => 10,
            Pattern::None => 0,
        }
    }

    pub fn is_none(&self) -> bool {
        *self == Pattern::None
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pattern::BullishEngulfing => write!(f, "BULLISH_ENGULFING"),
            Pattern::Hammer => write!(f, "HAMMER"),
            Pattern::PinbarBullish => write!(f, "PINBAR_BULLISH"),
            Pattern::Doji => write!(f, "DOJI"),
            Pattern::None => write!(f, "NONE"),
        }
    }
}

/// The six trade-setup checks, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConditionId {
    EntryZone,
    PatternPresent,
    SmaCross,
    PriceAboveSmaSlow,
    RsiZone,
    VolumeAboveAverage,
}

impl ConditionId {
    pub const ALL: [ConditionId; 6] = [
        ConditionId::EntryZone,
        ConditionId::PatternPresent,
        ConditionId::SmaCross,
        ConditionId::PriceAboveSmaSlow,
        ConditionId::RsiZone,
        ConditionId::VolumeAboveAverage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionId::EntryZone => "entry-zone",
            ConditionId::PatternPresent => "pattern-present",
            ConditionId::SmaCross => "sma-cross",
            ConditionId::PriceAboveSmaSlow => "price-above-sma-slow",
            ConditionId::RsiZone => "rsi-zone",
            ConditionId::VolumeAboveAverage => "volume-above-average",
        }
    }
}

impl std::fmt::Display for ConditionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one trade-setup check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub id: ConditionId,
    pub description: String,
    pub satisfied: bool,
    pub weight: u8,
}

/// Result of one monitor cycle. Built once, never modified, handed to the gate
/// and, if admitted, to dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvaluation {
    pub symbol: String,
    pub current_price: f64,
    pub pattern: Pattern,
    /// Descriptions of the satisfied conditions, in evaluation order.
    pub conditions_met: Vec<String>,
    /// 0..=100
    pub confidence_score: u8,
    pub timestamp: DateTime<Utc>,
}

/// Direction of an alert. The monitor only emits `Long`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalType {
    #[default]
    Long,
    Short,
    Close,
}

impl std::fmt::Display for SignalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalType::Long => write!(f, "LONG"),
            SignalType::Short => write!(f, "SHORT"),
            SignalType::Close => write!(f, "CLOSE"),
        }
    }
}

/// Render a price as `$94,200.50`.
pub fn format_price(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}${grouped}.{frac_part}")
}
