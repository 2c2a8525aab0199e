use crate::models::{DerivedMetrics, FinancialSnapshot, SectorStat, SnapshotField};
use crate::utils::positive;

/// Graham number multiplier (15 x P/E times 1.5 x P/B).
const GRAHAM_MULTIPLIER: f64 = 22.5;

pub fn calculate_pe_actual(price: f64, eps: f64) -> Option<f64> {
    Some(positive(price)? / positive(eps)?)
}

pub fn calculate_book_value_per_share(price: f64, price_to_book: f64) -> Option<f64> {
    Some(positive(price)? / positive(price_to_book)?)
}

/// `sqrt(22.5 * eps * bvps)`, defined for positive inputs only.
pub fn calculate_intrinsic_value(eps: f64, book_value_per_share: f64) -> Option<f64> {
    let product = GRAHAM_MULTIPLIER * positive(eps)? * positive(book_value_per_share)?;
    Some(product.sqrt())
}

/// Percent above (positive) or below (negative) the intrinsic value.
pub fn calculate_valuation_gap(price: f64, intrinsic_value: f64) -> Option<f64> {
    let intrinsic_value = positive(intrinsic_value)?;
    Some((price - intrinsic_value) / intrinsic_value * 100.0)
}

pub fn calculate_payout_ratio(dividend_rate: f64, eps: f64) -> Option<f64> {
    Some(positive(dividend_rate)? / positive(eps)? * 100.0)
}

/// Derived metrics for one company. Without a snapshot only the sector
/// benchmark can be filled in.
pub fn derive_metrics(
    snapshot: Option<&FinancialSnapshot>,
    sector: Option<&SectorStat>,
) -> DerivedMetrics {
    let sector_average_pe = sector.map(|stat| stat.average_pe);
    let Some(snapshot) = snapshot else {
        return DerivedMetrics {
            sector_average_pe,
            ..DerivedMetrics::default()
        };
    };

    let price = snapshot.value(SnapshotField::Price);
    let eps = snapshot.value(SnapshotField::Eps);
    let price_to_book = snapshot.value(SnapshotField::PriceToBook);
    let dividend_rate = snapshot.value(SnapshotField::DividendRate);

    let book_value_per_share = calculate_book_value_per_share(price, price_to_book);
    let intrinsic_value =
        book_value_per_share.and_then(|bvps| calculate_intrinsic_value(eps, bvps));

    DerivedMetrics {
        sector_average_pe,
        pe_actual: calculate_pe_actual(price, eps),
        book_value_per_share,
        intrinsic_value,
        valuation_gap_pct: intrinsic_value.and_then(|iv| calculate_valuation_gap(price, iv)),
        payout_ratio_pct: calculate_payout_ratio(dividend_rate, eps),
    }
}
