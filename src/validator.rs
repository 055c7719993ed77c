//! Draw invariant checks
//!
//! Every candidate passes through [`validate`] before it can reach a caller.

use crate::error::FetchError;
use chrono::NaiveDate;
use crate::models::{
    Draw, Provenance, RawCandidate, POWERBALL_MAX, WHITE_BALL_COUNT, WHITE_BALL_MAX,
};

/// A candidate whose numbers, date and amounts satisfy the draw invariants.
///
/// The draw number may still be missing; the reconciler supplies it when
/// turning this into a [`Draw`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidCandidate {
    pub(crate) draw_number: Option<u32>,
    pub(crate) draw: Draw,
}

impl ValidCandidate {
    pub fn draw_number(&self) -> Option<u32> {
        self.draw_number
    }

    pub fn draw_date(&self) -> NaiveDate {
        self.draw.draw_date
    }

    /// Finish the draw with the given number
    pub fn into_draw(self, draw_number: u32) -> Result<Draw, FetchError> {
        if draw_number == 0 {
            return Err(FetchError::validation("draw number must be positive"));
        }
        Ok(Draw {
            draw_number,
            ..self.draw
        })
    }
}

/// Validate a raw candidate.
///
/// A draw number of 0 is treated as "not reported" rather than rejected, so
/// that sources which emit a placeholder still get reconciled.
pub fn validate(candidate: RawCandidate) -> Result<ValidCandidate, FetchError> {
    let white_balls = validate_white_balls(&candidate.white_balls)?;
    let powerball = validate_powerball(candidate.powerball)?;
    validate_jackpot(candidate.jackpot_amount)?;

    let draw_number = candidate.draw_number.filter(|&n| n > 0);

    Ok(ValidCandidate {
        draw_number,
        draw: Draw {
            draw_number: 0,
            draw_date: candidate.draw_date,
            white_balls,
            powerball,
            jackpot_amount: candidate.jackpot_amount,
            winners: candidate.winners,
            source: Provenance::new(candidate.source),
            prize_breakdown: candidate.prize_breakdown,
        },
    })
}

/// Check a finished draw against every invariant
pub fn validate_draw(draw: &Draw) -> Result<(), FetchError> {
    if draw.draw_number == 0 {
        return Err(FetchError::validation("draw number must be positive"));
    }
    let whites: Vec<u32> = draw.white_balls.iter().map(|&b| b as u32).collect();
    validate_white_balls(&whites)?;
    validate_powerball(draw.powerball as u32)?;
    validate_jackpot(draw.jackpot_amount)
}

fn validate_white_balls(balls: &[u32]) -> Result<[u8; WHITE_BALL_COUNT], FetchError> {
    if balls.len() != WHITE_BALL_COUNT {
        return Err(FetchError::validation(format!(
            "exactly {} white balls required, got {}",
            WHITE_BALL_COUNT,
            balls.len()
        )));
    }

    let mut out = [0u8; WHITE_BALL_COUNT];
    for (i, &ball) in balls.iter().enumerate() {
        if !(1..=WHITE_BALL_MAX as u32).contains(&ball) {
            return Err(FetchError::validation(format!(
                "white ball must be between 1 and {}, got {}",
                WHITE_BALL_MAX, ball
            )));
        }
        if balls[..i].contains(&ball) {
            return Err(FetchError::validation(format!(
                "duplicate white ball {}",
                ball
            )));
        }
        out[i] = ball as u8;
    }

    Ok(out)
}

fn validate_powerball(ball: u32) -> Result<u8, FetchError> {
    if !(1..=POWERBALL_MAX as u32).contains(&ball) {
        return Err(FetchError::validation(format!(
            "powerball must be between 1 and {}, got {}",
            POWERBALL_MAX, ball
        )));
    }
    Ok(ball as u8)
}

fn validate_jackpot(amount: f64) -> Result<(), FetchError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(FetchError::validation(format!(
            "jackpot must be non-negative, got {}",
            amount
        )));
    }
    Ok(())
}
