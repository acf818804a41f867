use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal::Decimal;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_points(raw: &str) -> Result<Decimal, String> {
    let points = raw
        .trim()
        .parse::<Decimal>()
        .map_err(|err| format!("failed to parse '{raw}' as a point amount ({err})"))?;
    if points < Decimal::ZERO {
        return Err(format!("point amount '{raw}' must not be negative"));
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iso_dates() {
        assert_eq!(
            parse_date(" 2026-03-01 "),
            Ok(NaiveDate::from_ymd_opt(2026, 3, 1).expect("valid"))
        );
        assert!(parse_date("01/03/2026").is_err());
    }

    #[test]
    fn parses_fractional_points() {
        assert_eq!(parse_points("1.5"), Ok(Decimal::new(15, 1)));
        assert!(parse_points("-3").is_err());
        assert!(parse_points("lots").is_err());
    }
}
