use chrono::{TimeZone, Utc};
use common::{Pattern, SignalEvaluation, SignalPayload, TradeConfig};
use proptest::prelude::*;

fn pattern() -> impl Strategy<Value = Pattern> {
    prop_oneof![
        Just(Pattern::BullishEngulfing),
        Just(Pattern::Hammer),
        Just(Pattern::PinbarBullish),
        Just(Pattern::Doji),
        Just(Pattern::None),
    ]
}

proptest! {
    /// Every field survives JSON encoding bit for bit.
    #[test]
    fn payload_survives_json(
        price in 0.0001f64..1_000_000.0,
        zone_min in 1.0f64..500_000.0,
        zone_width in 0.0f64..10_000.0,
        stop_gap in 0.01f64..10_000.0,
        tp1_gap in 0.01f64..50_000.0,
        tp2 in proptest::option::of(1.0f64..1_000_000.0),
        tp3 in proptest::option::of(1.0f64..1_000_000.0),
        confidence in 0u8..=100,
        conditions in prop::collection::vec(".{0,40}", 0..6),
        pattern in pattern(),
        secs in 0i64..4_000_000_000,
    ) {
        let trade = TradeConfig {
            entry_zone_min: zone_min,
            entry_zone_max: zone_min + zone_width,
            stop_loss: zone_min - stop_gap,
            tp1: zone_min + zone_width + tp1_gap,
            tp2,
            tp3,
            ..TradeConfig::default()
        };
        let eval = SignalEvaluation {
            symbol: "BTCUSDT".into(),
            current_price: price,
            pattern,
            conditions_met: conditions,
            confidence_score: confidence,
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
        };

        let payload = SignalPayload::new(&eval, &trade, "1h", "notes");
        let back = SignalPayload::from_json(&payload.to_json().unwrap()).unwrap();

        prop_assert_eq!(back.current_price.to_bits(), price.to_bits());
        prop_assert_eq!(&back, &payload);
        prop_assert_eq!(back.evaluation(), eval);
    }
}
