//! C `printf("%.*g")` number rendering.
//!
//! Frequencies and R² are written with 3 significant figures, matrix values
//! with the `%g` default of 6.

/// Significant figures for frequencies, fractions and R².
pub const INFO_PRECISION: usize = 3;

/// Significant figures for dosage and covariate matrix values.
pub const MATRIX_PRECISION: usize = 6;

/// Render `value` like C's `%.{precision}g`.
pub fn format_general(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let precision = precision.max(1);
    let scientific = format!("{:.*e}", precision - 1, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= precision as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exponent.abs())
    } else {
        let decimals = (precision as i32 - 1 - exponent) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

/// `%.3g`, or `.` (VCF missing) for `None`.
pub fn format_info(value: Option<f64>) -> String {
    value.map_or_else(|| ".".to_string(), |v| format_general(v, INFO_PRECISION))
}

/// `%g`.
pub fn format_matrix(value: f64) -> String {
    format_general(value, MATRIX_PRECISION)
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}
