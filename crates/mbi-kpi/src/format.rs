//! Human-readable number formatting shared by the prompt and report renderers.

use rust_decimal::Decimal;

use crate::types::{Metric, MetricUnit, MetricValue};

/// Placeholder shown for a metric with a zero denominator.
pub const NOT_AVAILABLE: &str = "N/A";

/// Round to `dp` places and group the integer digits with commas.
#[must_use]
pub fn grouped(value: impl Into<Decimal>, dp: u32) -> String {
    let rounded = value.into().round_dp(dp);
    let text = format!("{rounded:.prec$}", prec = dp as usize);
    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut out = String::with_capacity(text.len() + int_part.len() / 3);
    out.push_str(sign);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(digit);
    }
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// `$1,234.50` style, with the sign ahead of the currency symbol.
#[must_use]
pub fn currency(value: Decimal, dp: u32) -> String {
    if value.is_sign_negative() && !value.round_dp(dp).is_zero() {
        format!("-${}", grouped(value.abs(), dp))
    } else {
        format!("${}", grouped(value.abs(), dp))
    }
}

/// A ratio shown as a percentage, e.g. `0.1` becomes `10.00%`.
#[must_use]
pub fn percent(rate: Decimal) -> String {
    format!("{}%", grouped(rate * Decimal::ONE_HUNDRED, 2))
}

/// Format a metric value in its display unit, or [`NOT_AVAILABLE`].
#[must_use]
pub fn metric_value(metric: Metric, value: MetricValue) -> String {
    let Some(v) = value.value() else {
        return NOT_AVAILABLE.to_string();
    };
    match metric.unit() {
        MetricUnit::Multiple => format!("{}x", grouped(v, 2)),
        MetricUnit::Currency => currency(v, 2),
        MetricUnit::Rate => percent(v),
    }
}

/// Format a target or actual figure for `metric` (always computable).
#[must_use]
pub fn metric_figure(metric: Metric, value: Decimal) -> String {
    metric_value(metric, MetricValue::Value(value))
}
