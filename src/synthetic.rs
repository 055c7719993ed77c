//! Synthetic draw generation
//!
//! Last-resort fallback when every real source fails. Output is structurally
//! valid but never real, and always tagged `mock_data`.

use crate::models::{Draw, Provenance, SourceTag, POWERBALL_MAX, WHITE_BALL_MAX};
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

/// Jackpot band for a single "latest" mock, in millions
const LATEST_JACKPOT_MILLIONS: (u32, u32) = (50, 500);
/// Starting jackpot band for historical mocks, in millions
const HISTORY_BASE_MILLIONS: (u32, u32) = (20, 50);
/// Jackpot after a simulated winner, in millions
const RESET_JACKPOT_MILLIONS: (u32, u32) = (20, 40);
/// Per-draw jackpot growth going back in time
const HISTORY_GROWTH: f64 = 1.05;
/// Probability of 0, 1 or 2 jackpot winners on a historical mock
const WINNER_WEIGHTS: [f64; 3] = [0.90, 0.09, 0.01];

/// Mock draw generator
pub struct MockDrawGenerator {
    rng: Mutex<StdRng>,
}

impl Default for MockDrawGenerator {
    fn default() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }
}

impl MockDrawGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deterministic generator for tests and reproducible fills
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut rng)
    }

    /// One mock "latest" draw
    pub fn generate_latest(&self, draw_number: u32, draw_date: NaiveDate) -> Draw {
        self.with_rng(|rng| {
            let (white_balls, powerball) = random_numbers(rng);
            let millions = rng.gen_range(LATEST_JACKPOT_MILLIONS.0..=LATEST_JACKPOT_MILLIONS.1);

            Draw {
                draw_number,
                draw_date,
                white_balls,
                powerball,
                jackpot_amount: millions as f64 * 1_000_000.0,
                winners: 0,
                source: Provenance::new(SourceTag::MockData),
                prize_breakdown: None,
            }
        })
    }

    /// Mock draws walking back in time from `newest_date`.
    ///
    /// `draw_numbers` supplies one number per draw, newest first. Dates step
    /// back 3 or 4 days per draw. The jackpot grows geometrically the further
    /// back the draw is and resets whenever a simulated winner hits.
    pub fn generate_history(&self, newest_date: NaiveDate, draw_numbers: &[u32]) -> Vec<Draw> {
        self.with_rng(|rng| {
            let base = rng.gen_range(HISTORY_BASE_MILLIONS.0..=HISTORY_BASE_MILLIONS.1) as f64
                * 1_000_000.0;
            let mut date = newest_date;
            let mut draws = Vec::with_capacity(draw_numbers.len());

            for (i, &draw_number) in draw_numbers.iter().enumerate() {
                if i > 0 {
                    date -= Duration::days(rng.gen_range(3..=4));
                }

                let (white_balls, powerball) = random_numbers(rng);
                let winners = pick_winners(rng);
                let jackpot_amount = if winners > 0 {
                    rng.gen_range(RESET_JACKPOT_MILLIONS.0..=RESET_JACKPOT_MILLIONS.1) as f64
                        * 1_000_000.0
                } else {
                    (base * HISTORY_GROWTH.powi(i as i32)).round()
                };

                draws.push(Draw {
                    draw_number,
                    draw_date: date,
                    white_balls,
                    powerball,
                    jackpot_amount,
                    winners,
                    source: Provenance::new(SourceTag::MockData),
                    prize_breakdown: None,
                });
            }

            draws
        })
    }
}

/// Five distinct sorted white balls and a powerball
fn random_numbers(rng: &mut StdRng) -> ([u8; 5], u8) {
    let mut whites = [0u8; 5];
    for (slot, i) in whites
        .iter_mut()
        .zip(index::sample(rng, WHITE_BALL_MAX as usize, 5).into_iter())
    {
        *slot = i as u8 + 1;
    }
    whites.sort_unstable();
    let powerball = rng.gen_range(1..=POWERBALL_MAX);
    (whites, powerball)
}

fn pick_winners(rng: &mut StdRng) -> u32 {
    let roll: f64 = rng.gen();
    if roll < WINNER_WEIGHTS[0] {
        0
    } else if roll < WINNER_WEIGHTS[0] + WINNER_WEIGHTS[1] {
        1
    } else {
        2
    }
}
