//! Date and weekday records.

use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate};
use serde_json::json;

use crate::error::Result;
use crate::graph::{EdgeType, GraphStore, Mutation, Properties};
use crate::roster::types::{date_ref, format_date, parse_date, props, Weekday};

/// Monday of the calendar week containing `date`.
pub fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// ISO-8601 week number of `date`.
pub fn iso_week(date: NaiveDate) -> u32 {
    date.iso_week().week()
}

/// Idempotently creates Date records and links them to their Weekday.
#[derive(Clone)]
pub struct CalendarEnsurer {
    store: Arc<dyn GraphStore>,
}

impl CalendarEnsurer {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Merge the seven weekday records.
    pub async fn seed_weekdays(&self) -> Result<()> {
        let mutations = Weekday::ALL.iter().map(weekday_mutation).collect();
        self.store.apply(mutations).await?;
        tracing::debug!("Weekday records seeded");
        Ok(())
    }

    /// Ensure the Date record for a `YYYY-MM-DD` string exists.
    pub async fn ensure_date_exists(&self, date: &str) -> Result<NaiveDate> {
        let date = parse_date(date)?;
        self.ensure_date(date).await?;
        Ok(date)
    }

    /// Ensure the Date record exists and is linked to its weekday.
    pub async fn ensure_date(&self, date: NaiveDate) -> Result<()> {
        self.store.apply(date_mutations(date)).await?;
        Ok(())
    }
}

/// Merge a weekday record with its code, name and ISO number.
pub(crate) fn weekday_mutation(weekday: &Weekday) -> Mutation {
    Mutation::MergeNode {
        node: weekday.node_ref(),
        on_create: props([
            ("code", json!(weekday.code())),
            ("name", json!(weekday.name())),
            ("number", json!(weekday.number())),
        ]),
        on_match: Properties::new(),
    }
}

/// Mutations that create `date` and its weekday link, for inclusion in a
/// larger batch.
pub(crate) fn date_mutations(date: NaiveDate) -> Vec<Mutation> {
    let weekday = Weekday::from_date(date);
    vec![
        weekday_mutation(&weekday),
        Mutation::MergeNode {
            node: date_ref(date),
            on_create: props([
                ("date", json!(format_date(date))),
                ("week", json!(iso_week(date))),
            ]),
            on_match: Properties::new(),
        },
        Mutation::merge_edge(date_ref(date), EdgeType::IsOnWeekday, weekday.node_ref()),
    ]
}
