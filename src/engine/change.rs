//! # engine::change
//!
//! Percentage move of a price against a reference price.
//!
//! previous close หายไป / เป็น 0 / ไม่ใช่ตัวเลขจริง → `None` ("ไม่ทราบ")
//! ไม่ใช่ error และไม่มีการหารด้วยศูนย์

/// `(price - previous_close) / previous_close * 100`, or `None` when the
/// reference is absent or zero, or when any input or the result is not finite.
pub fn compute_pct_change(price: f64, previous_close: Option<f64>) -> Option<f64> {
    let prev = previous_close?;
    if prev == 0.0 || !prev.is_finite() || !price.is_finite() {
        return None;
    }

    let pct = (price - prev) / prev * 100.0;
    pct.is_finite().then_some(pct)
}
