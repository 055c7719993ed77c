//! Jackpot/winner backfill from a secondary source

use crate::models::Draw;

/// True when the draw is missing metadata that a secondary source could fill
pub fn needs_enrichment(draw: &Draw) -> bool {
    !draw.source.enhanced && (draw.is_mock() || draw.jackpot_amount <= 0.0)
}

/// Copy jackpot and winner count from `secondary` into `draw`.
///
/// Only applies when `draw` needs enrichment and both draws carry exactly the
/// same numbers. The result keeps its original provenance with the
/// `_enhanced` suffix. Anything else returns `draw` unchanged, so applying
/// this repeatedly is a no-op after the first time.
pub fn enhance(draw: &Draw, secondary: &Draw) -> Draw {
    if !needs_enrichment(draw) || !draw.same_numbers(secondary) {
        return draw.clone();
    }
    if secondary.jackpot_amount <= 0.0 && secondary.winners == 0 {
        return draw.clone();
    }

    tracing::info!(
        "Enriching draw {} ({}) with jackpot {} and {} winners from {}",
        draw.draw_number,
        draw.source,
        secondary.jackpot_amount,
        secondary.winners,
        secondary.source
    );

    let mut enriched = draw.clone();
    if secondary.jackpot_amount > 0.0 {
        enriched.jackpot_amount = secondary.jackpot_amount;
    }
    enriched.winners = enriched.winners.max(secondary.winners);
    if enriched.prize_breakdown.is_none() {
        enriched.prize_breakdown = secondary.prize_breakdown.clone();
    }
    enriched.source = draw.source.enhanced();
    enriched
}
