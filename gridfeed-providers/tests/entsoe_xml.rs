use chrono::{Duration, TimeZone, Utc};
use gridfeed_providers::entsoe::xml::{flatten, parse_market_document};
use proptest::prelude::*;

const NS: &str = "urn:iec62325.351:tc57wg16:451-3:publicationdocument:7:3";

fn price_document(periods: &[(String, Vec<f64>)]) -> String {
    let mut xml = format!(r#"<Publication_MarketDocument xmlns="{NS}"><TimeSeries>"#);
    for (start, values) in periods {
        xml.push_str(&format!(
            "<Period><timeInterval><start>{start}</start></timeInterval><resolution>PT60M</resolution>"
        ));
        for (i, v) in values.iter().enumerate() {
            xml.push_str(&format!(
                "<Point><position>{}</position><price.amount>{v}</price.amount></Point>",
                i + 1
            ));
        }
        xml.push_str("</Period>");
    }
    xml.push_str("</TimeSeries></Publication_MarketDocument>");
    xml
}

#[test]
fn two_hourly_prices_map_to_consecutive_hours() {
    let xml = price_document(&[("2024-01-01T00:00Z".to_string(), vec![45.2, 47.8])]);
    let series = parse_market_document("entsoe", &xml).unwrap();
    let points = flatten(&series);
    let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    assert_eq!(
        points,
        vec![(t0, 45.2), (t0 + Duration::hours(1), 47.8)]
    );
}

#[test]
fn points_are_ordered_even_when_positions_are_shuffled() {
    let xml = format!(
        r#"<Publication_MarketDocument xmlns="{NS}"><TimeSeries><Period>
            <timeInterval><start>2024-01-01T00:00Z</start></timeInterval>
            <resolution>PT60M</resolution>
            <Point><position>3</position><price.amount>3</price.amount></Point>
            <Point><position>1</position><price.amount>1</price.amount></Point>
            <Point><position>2</position><price.amount>2</price.amount></Point>
        </Period></TimeSeries></Publication_MarketDocument>"#
    );
    let points = flatten(&parse_market_document("entsoe", &xml).unwrap());
    let values: Vec<f64> = points.iter().map(|(_, v)| *v).collect();
    assert_eq!(values, vec![1.0, 2.0, 3.0]);
}

proptest! {
    #[test]
    fn consecutive_periods_yield_strictly_increasing_hours(
        lengths in prop::collection::vec(1usize..30, 1..5),
        seed in 0.0f64..500.0,
    ) {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let mut offset = 0i64;
        let mut periods = Vec::new();
        for len in &lengths {
            let start = base + Duration::hours(offset);
            let values = (0..*len).map(|i| seed + i as f64).collect();
            periods.push((start.format("%Y-%m-%dT%H:%MZ").to_string(), values));
            offset += *len as i64;
        }
        let xml = price_document(&periods);
        let points = flatten(&parse_market_document("entsoe", &xml).unwrap());

        let total: usize = lengths.iter().sum();
        prop_assert_eq!(points.len(), total);
        prop_assert!(points.windows(2).all(|w| w[0].0 < w[1].0));
        for (i, (at, _)) in points.iter().enumerate() {
            prop_assert_eq!(*at, base + Duration::hours(i as i64));
        }
    }
}
