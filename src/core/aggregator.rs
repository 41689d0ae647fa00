//! Day-by-day monthly usage loop.
//!
//! Dates are processed strictly in order with at most one request in flight. After
//! every date (including the last) the loop pauses for the configured delay to stay
//! under the endpoint's rate limit.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::cost::calculator::CostCalculator;
use crate::core::error::{AggregateError, ErrorKind, UsageError};
use crate::core::models::cost::{DailyCostSummary, DayError, DayRecord, MonthlyUsage};
use crate::core::month::YearMonth;
use crate::core::providers::fetch::UsageSource;

pub const DEFAULT_WAIT: Duration = Duration::from_secs(12);

/// Receives the fraction of the month processed, in `[0.0, 1.0]`.
pub trait ProgressReporter {
    fn report(&mut self, fraction: f64);
}

impl<F: FnMut(f64)> ProgressReporter for F {
    fn report(&mut self, fraction: f64) {
        self(fraction)
    }
}

/// Discards progress; for tests and headless runs.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&mut self, _fraction: f64) {}
}

/// Waits between requests.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, delay: Duration);
}

/// Sleeps on the tokio timer, waking early if the run is cancelled.
pub struct TokioPacer {
    cancel: CancellationToken,
}

impl TokioPacer {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }
}

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, delay: Duration) {
        if delay.is_zero() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = self.cancel.cancelled() => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// First failing day ends the run and discards everything collected so far.
    #[default]
    Abort,
    /// Record an error marker for the failing day and keep going.
    Continue,
}

#[derive(Debug, Clone)]
pub struct AggregatorOptions {
    pub month: YearMonth,
    pub delay: Duration,
    pub dry_run: bool,
    pub on_error: ErrorPolicy,
}

impl AggregatorOptions {
    pub fn new(month: YearMonth) -> Self {
        Self {
            month,
            delay: DEFAULT_WAIT,
            dry_run: false,
            on_error: ErrorPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running { date: NaiveDate },
    Completed,
    Failed { date: NaiveDate, kind: ErrorKind },
    Cancelled { date: NaiveDate },
}

pub struct MonthlyUsageAggregator<'a> {
    source: &'a dyn UsageSource,
    calculator: CostCalculator<'a>,
    pacer: &'a dyn Pacer,
    options: AggregatorOptions,
    cancel: CancellationToken,
    state: RunState,
}

impl<'a> MonthlyUsageAggregator<'a> {
    pub fn new(
        source: &'a dyn UsageSource,
        calculator: CostCalculator<'a>,
        pacer: &'a dyn Pacer,
        options: AggregatorOptions,
    ) -> Self {
        Self {
            source,
            calculator,
            pacer,
            options,
            cancel: CancellationToken::new(),
            state: RunState::Idle,
        }
    }

    /// Checked once at the top of every iteration.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn options(&self) -> &AggregatorOptions {
        &self.options
    }

    async fn process_day(&self, date: NaiveDate) -> Result<DailyCostSummary, UsageError> {
        let payload = self.source.fetch_daily_usage(date).await?;
        debug!(
            %date,
            token_entries = payload.token_entries.len(),
            audio_entries = payload.audio_entries.len(),
            "Fetched daily usage"
        );
        self.calculator.compute_daily(&payload)
    }

    /// Walk every day of the month and return the finished map.
    ///
    /// Progress is reported once per date as `day_of_month / days_in_month`.
    pub async fn run(
        &mut self,
        progress: &mut dyn ProgressReporter,
    ) -> Result<MonthlyUsage, AggregateError> {
        let month = self.options.month;
        let total_days = month.days_in_month();
        let mut usage = MonthlyUsage::default();
        info!(%month, days = total_days, dry_run = self.options.dry_run, "Starting monthly run");

        for date in month.days() {
            if self.cancel.is_cancelled() {
                info!(%date, "Run cancelled");
                self.state = RunState::Cancelled { date };
                return Err(AggregateError::Cancelled { date });
            }
            self.state = RunState::Running { date };

            let record = if self.options.dry_run {
                DayRecord::Summary(DailyCostSummary::default())
            } else {
                match self.process_day(date).await {
                    Ok(summary) => DayRecord::Summary(summary),
                    Err(source) => match self.options.on_error {
                        ErrorPolicy::Abort => {
                            self.state = RunState::Failed {
                                date,
                                kind: source.kind(),
                            };
                            info!(%date, kind = %source.kind(), "Run failed");
                            return Err(AggregateError::Day { date, source });
                        }
                        ErrorPolicy::Continue => {
                            warn!(%date, kind = %source.kind(), error = %source, "Recording failed day");
                            DayRecord::Failed {
                                error: DayError {
                                    kind: source.kind(),
                                    message: source.to_string(),
                                },
                            }
                        }
                    },
                }
            };
            usage.insert(date.format("%Y-%m-%d").to_string(), record);

            progress.report(date.day() as f64 / total_days as f64);

            self.pacer.pause(self.options.delay).await;
        }

        self.state = RunState::Completed;
        info!(%month, total = usage.total_costs(), "Monthly run completed");
        Ok(usage)
    }
}
