//! Parser for the market feed's XML time-series documents.
//!
//! Grammar, by local element name (namespaces are ignored):
//!
//! ```text
//! *_MarketDocument
//!   TimeSeries*
//!     MktPSRType/psrType?
//!     Period+
//!       timeInterval/start
//!       resolution?            (PT15M | PT30M | PT60M | PT1H; default PT60M)
//!       Point+
//!         position             (1-based)
//!         price.amount | quantity
//! ```
//!
//! An `Acknowledgement_MarketDocument` or a `Reason` element is the provider's
//! own error report and becomes `FetchError::Provider`.

use chrono::{DateTime, Duration, Utc};
use gridfeed_core::FetchError;
use roxmltree::{Document, Node};

use super::codes::PsrType;
use crate::wire::parse_instant;

/// Values of one `TimeSeries` element.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSeries {
    /// Production type, for generation documents.
    pub psr_type: Option<PsrType>,
    /// `(instant, value)` pairs sorted by instant.
    pub points: Vec<(DateTime<Utc>, f64)>,
}

fn child<'a, 'i>(node: Node<'a, 'i>, name: &str) -> Option<Node<'a, 'i>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == name)
}

fn children<'a, 'i: 'a>(
    node: Node<'a, 'i>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'i>> + 'a {
    node.children()
        .filter(move |c| c.is_element() && c.tag_name().name() == name)
}

fn text<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    child(node, name).and_then(|n| n.text()).map(str::trim)
}

/// Step length of a `resolution` value such as `PT15M`.
fn parse_resolution(raw: &str) -> Option<Duration> {
    let body = raw.trim().strip_prefix("PT")?;
    if let Some(minutes) = body.strip_suffix('M') {
        let m: i64 = minutes.parse().ok()?;
        return Duration::try_minutes(m).filter(|d| *d > Duration::zero());
    }
    if let Some(hours) = body.strip_suffix('H') {
        let h: i64 = hours.parse().ok()?;
        return Duration::try_hours(h).filter(|d| *d > Duration::zero());
    }
    None
}

fn provider_failure(provider: &str, doc: &Document<'_>) -> Option<FetchError> {
    let root = doc.root_element();
    let is_ack = root.tag_name().name().starts_with("Acknowledgement");
    let reason = doc
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == "Reason");
    if !is_ack && reason.is_none() {
        return None;
    }
    let detail = reason
        .map(|r| {
            let code = text(r, "code").unwrap_or("");
            let txt = text(r, "text").unwrap_or("");
            match (code.is_empty(), txt.is_empty()) {
                (false, false) => format!("{code}: {txt}"),
                (true, false) => txt.to_string(),
                (false, true) => code.to_string(),
                (true, true) => "unspecified reason".to_string(),
            }
        })
        .unwrap_or_else(|| "acknowledgement document".to_string());
    Some(FetchError::provider(provider, detail))
}

fn parse_period(
    provider: &str,
    period: Node<'_, '_>,
    out: &mut Vec<(DateTime<Utc>, f64)>,
) -> Result<(), FetchError> {
    let start = child(period, "timeInterval")
        .and_then(|ti| text(ti, "start"))
        .ok_or_else(|| FetchError::protocol(provider, "Period without timeInterval/start"))?;
    let start = parse_instant(start)
        .ok_or_else(|| FetchError::protocol(provider, format!("bad period start: {start}")))?;
    let step = match text(period, "resolution") {
        Some(raw) => parse_resolution(raw)
            .ok_or_else(|| FetchError::protocol(provider, format!("bad resolution: {raw}")))?,
        None => Duration::hours(1),
    };
    for point in children(period, "Point") {
        let position: i64 = text(point, "position")
            .and_then(|p| p.parse().ok())
            .filter(|p| *p >= 1)
            .ok_or_else(|| FetchError::protocol(provider, "Point without a valid position"))?;
        let raw = text(point, "price.amount")
            .or_else(|| text(point, "quantity"))
            .ok_or_else(|| FetchError::protocol(provider, "Point without price.amount or quantity"))?;
        let value: f64 = raw
            .parse()
            .map_err(|_| FetchError::protocol(provider, format!("non-numeric value: {raw}")))?;
        let offset = step
            .checked_mul(i32::try_from(position - 1).unwrap_or(i32::MAX))
            .ok_or_else(|| FetchError::protocol(provider, "position out of range"))?;
        out.push((start + offset, value));
    }
    Ok(())
}

/// Parse a market document into its time series.
///
/// # Errors
/// `Provider` for acknowledgement/error documents or a document with no
/// `TimeSeries`; `Protocol` for malformed XML or missing required elements.
pub fn parse_market_document(provider: &str, xml: &str) -> Result<Vec<MarketSeries>, FetchError> {
    let doc = Document::parse(xml)
        .map_err(|e| FetchError::protocol(provider, format!("invalid XML: {e}")))?;
    if let Some(err) = provider_failure(provider, &doc) {
        return Err(err);
    }
    let mut series = Vec::new();
    for ts in doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "TimeSeries")
    {
        let psr_type = child(ts, "MktPSRType")
            .and_then(|m| text(m, "psrType"))
            .and_then(PsrType::from_code);
        let mut points = Vec::new();
        for period in children(ts, "Period") {
            parse_period(provider, period, &mut points)?;
        }
        points.sort_by_key(|(at, _)| *at);
        series.push(MarketSeries { psr_type, points });
    }
    if series.is_empty() {
        return Err(FetchError::provider(
            provider,
            "document contains no TimeSeries",
        ));
    }
    Ok(series)
}

/// All points of all series, concatenated and sorted by instant.
#[must_use]
pub fn flatten(series: &[MarketSeries]) -> Vec<(DateTime<Utc>, f64)> {
    let mut all: Vec<_> = series.iter().flat_map(|s| s.points.iter().copied()).collect();
    all.sort_by_key(|(at, _)| *at);
    all
}
