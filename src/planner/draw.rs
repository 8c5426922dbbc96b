//! Drawing meals out of the hat
//!
//! A meal is drawn uniformly at random from the meals that pass the recency
//! check for the target date. The eligible subset is computed once per draw,
//! so an empty hat or a hat with only recently drawn meals yields
//! [`PlannerError::NoEligibleMeals`] instead of retrying.

use crate::planner::error::{PlannerError, PlannerResult};
use crate::planner::types::{DrawnMeal, Meal};
use chrono::NaiveDate;
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Meals that may be drawn on `today`
pub fn eligible_meals(meals: &[Meal], today: NaiveDate) -> Vec<&Meal> {
    meals.iter().filter(|m| m.is_eligible_on(today)).collect()
}

/// Draw one eligible meal for `today`
pub fn draw_meal<'a, R: Rng + ?Sized>(
    meals: &'a [Meal],
    today: NaiveDate,
    rng: &mut R,
) -> PlannerResult<&'a Meal> {
    eligible_meals(meals, today)
        .choose(rng)
        .copied()
        .ok_or(PlannerError::NoEligibleMeals(today))
}

/// Draw a replacement for `previous` on `date`, preferring any other
/// eligible meal.
pub fn redraw_meal<'a, R: Rng + ?Sized>(
    meals: &'a [Meal],
    previous: &DrawnMeal,
    rng: &mut R,
) -> PlannerResult<&'a Meal> {
    let date = previous.assigned_date;
    let eligible = eligible_meals(meals, date);
    let others: Vec<&Meal> = eligible
        .iter()
        .copied()
        .filter(|m| m.id != previous.meal_id)
        .collect();

    let pool = if others.is_empty() { &eligible } else { &others };
    pool.choose(rng)
        .copied()
        .ok_or(PlannerError::NoEligibleMeals(date))
}

/// An inclusive range of calendar dates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> PlannerResult<Self> {
        if end < start {
            return Err(PlannerError::InvalidRange {
                start,
                end,
                reason: "end is before start".to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Like [`DateRange::new`], rejecting ranges longer than `max_days`
    pub fn bounded(start: NaiveDate, end: NaiveDate, max_days: u32) -> PlannerResult<Self> {
        let range = Self::new(start, end)?;
        if range.len() > max_days as usize {
            return Err(PlannerError::InvalidRange {
                start,
                end,
                reason: format!("spans more than {} days", max_days),
            });
        }
        Ok(range)
    }

    /// Number of dates in the range
    pub fn len(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

/// Result of drawing meals across a date range
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DrawOutcome {
    /// New schedule entries (ids are assigned when stored)
    pub drawn: Vec<DrawnMeal>,
    /// Dates that already had a meal
    pub skipped: Vec<NaiveDate>,
    /// Dates for which no meal was eligible
    pub unfilled: Vec<NaiveDate>,
    /// New `lastDrawn` date per meal id
    pub last_drawn: BTreeMap<String, NaiveDate>,
}

/// Draw one meal for every date in `range` that has nothing scheduled yet.
///
/// Each date is drawn with that date as "today", and a chosen meal counts as
/// drawn on that date for the rest of the batch, so the recency constraint
/// holds between meals drawn in the same call.
pub fn draw_range<R: Rng + ?Sized>(
    meals: &[Meal],
    existing: &[DrawnMeal],
    range: DateRange,
    rng: &mut R,
) -> DrawOutcome {
    let mut working = meals.to_vec();
    let scheduled: HashSet<NaiveDate> = existing.iter().map(|d| d.assigned_date).collect();
    let mut outcome = DrawOutcome::default();

    for date in range.dates() {
        if scheduled.contains(&date) {
            outcome.skipped.push(date);
            continue;
        }

        let meal_id = match draw_meal(&working, date, rng) {
            Ok(meal) => meal.id.clone(),
            Err(_) => {
                outcome.unfilled.push(date);
                continue;
            }
        };

        if let Some(meal) = working.iter_mut().find(|m| m.id == meal_id) {
            meal.last_drawn = Some(meal.last_drawn.map_or(date, |last| last.max(date)));
        }
        outcome.last_drawn.insert(meal_id.clone(), date);
        outcome.drawn.push(DrawnMeal::new(String::new(), meal_id, date));
    }

    outcome
}
