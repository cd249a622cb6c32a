use chrono::{Duration, NaiveDate};
use rand::Rng;
use tracing::{info, warn};

use crate::error::{ConfigError, SchedulerError};
use crate::helpers::{calendar, client::SubmissionClient, slots};
use crate::models::config::Config;
use crate::models::entry::{EntryRecord, format_hours};

/// Whether a run actually submits entries or only describes them.
pub enum RunMode {
    /// Compute and log the would-be entries, touch nothing remote.
    DryRun,
    /// Submit every entry through the given client.
    Live(SubmissionClient),
}

/// What a completed run produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub entries: usize,
    pub total_worked: Duration,
}

impl Default for RunSummary {
    fn default() -> Self {
        Self {
            entries: 0,
            total_worked: Duration::zero(),
        }
    }
}

/// The orchestrator: filters the date range, generates a day's slots,
/// builds the entry pair and hands it to the client (or the log).
pub struct SchedulerService {
    config: Config,
    mode: RunMode,
}

impl SchedulerService {
    pub fn new(config: Config, mode: RunMode) -> Self {
        Self { config, mode }
    }

    /// Generate one day's pair of entries.
    fn day_entries<R: Rng>(
        &self,
        day: NaiveDate,
        rng: &mut R,
    ) -> Result<(EntryRecord, EntryRecord), ConfigError> {
        let (before_break, after_break) = slots::generate_slots(
            day,
            &self.config.start_time_options,
            self.config.end_time,
            self.config.break_minutes,
            self.config.timezone,
            rng,
        )?;

        Ok(EntryRecord::pair_for_day(before_break, after_break, &self.config))
    }

    fn working_days<F>(&self, is_holiday: F) -> Vec<NaiveDate>
    where
        F: FnMut(NaiveDate) -> bool,
    {
        let days = calendar::eligible_days(
            self.config.start_date,
            self.config.end_date,
            &self.config.excluded_dates,
            is_holiday,
        );

        info!(
            "Scheduling {} working days between {} and {}",
            days.len(),
            self.config.start_date,
            self.config.end_date
        );

        days
    }

    /// Compute every entry the run would submit, in submission order.
    ///
    /// Draws from the generator exactly as [`SchedulerService::run`] does,
    /// so under the same seed this describes precisely the entries a run
    /// would create.
    pub fn plan<R, F>(&self, rng: &mut R, is_holiday: F) -> Result<Vec<EntryRecord>, ConfigError>
    where
        R: Rng,
        F: FnMut(NaiveDate) -> bool,
    {
        let days = self.working_days(is_holiday);

        let mut entries = Vec::with_capacity(days.len() * 2);
        for day in days {
            let (first, second) = self.day_entries(day, rng)?;
            entries.push(first);
            entries.push(second);
        }

        Ok(entries)
    }

    /// Execute the run, one day at a time: generate a day's pair, submit
    /// (or log) both entries, then move to the next day.
    ///
    /// The first submission failure aborts the whole run so a day is never
    /// left with only one of its two entries unreported.
    pub async fn run<R, F>(&self, rng: &mut R, is_holiday: F) -> Result<RunSummary, SchedulerError>
    where
        R: Rng,
        F: FnMut(NaiveDate) -> bool,
    {
        let days = self.working_days(is_holiday);

        if days.is_empty() {
            warn!("No work entries generated");
            return Ok(RunSummary::default());
        }

        info!("Creating {} time entries...", days.len() * 2);
        let mut summary = RunSummary::default();

        for day in days {
            let (first, second) = self.day_entries(day, rng)?;

            for entry in [first, second] {
                match &self.mode {
                    RunMode::DryRun => info!("DRY RUN: would create entry {}", entry),
                    RunMode::Live(client) => {
                        client.submit(&entry).await?;
                    }
                }

                summary.entries += 1;
                summary.total_worked = summary.total_worked + entry.duration();
            }
        }

        info!(
            "Successfully created {} entries, total work time {}",
            summary.entries,
            format_hours(summary.total_worked)
        );

        Ok(summary)
    }
}
