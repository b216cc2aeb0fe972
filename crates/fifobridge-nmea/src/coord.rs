//! Degrees-and-decimal-minutes rendering (`DDMM.MMMM,N` / `DDDMM.MMMM,E`).

const TEN_THOUSANDTHS_PER_DEGREE: f64 = 60.0 * 10_000.0;

/// Render a latitude in radians as `DDMM.MMMM,H`.
pub fn format_latitude(latitude: f64) -> String {
    let hemisphere = if latitude >= 0.0 { 'N' } else { 'S' };
    format_sexagesimal(latitude.to_degrees().abs(), 2, hemisphere)
}

/// Render a longitude in radians as `DDDMM.MMMM,H`.
pub fn format_longitude(longitude: f64) -> String {
    let hemisphere = if longitude >= 0.0 { 'E' } else { 'W' };
    format_sexagesimal(longitude.to_degrees().abs(), 3, hemisphere)
}

/// Rounding happens once on the total so that 59.99995' carries into the degrees.
fn format_sexagesimal(degrees: f64, degree_width: usize, hemisphere: char) -> String {
    let total = (degrees * TEN_THOUSANDTHS_PER_DEGREE).round() as u64;
    let per_degree = TEN_THOUSANDTHS_PER_DEGREE as u64;
    let whole_degrees = total / per_degree;
    let minutes = total % per_degree;
    format!(
        "{whole_degrees:0degree_width$}{:02}.{:04},{hemisphere}",
        minutes / 10_000,
        minutes % 10_000
    )
}
