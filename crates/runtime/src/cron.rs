//! Cron scheduling (spec §4.8): 5-field cron parsing plus the named
//! aliases, and a `CronScheduler` that ticks every 60s per generation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Timelike, Utc};

use forge_core::{Clock, ForgeError};

use crate::error::RuntimeError;

/// A parsed field is simply the set of values (within the field's valid
/// range) it matches — every comma-separated item (`*`, `n`, `a-b`, `*/s`,
/// `a-b/s`) expands into this set at parse time.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Field(Vec<bool>);

impl Field {
    fn matches(&self, value: u32) -> bool {
        self.0.get(value as usize).copied().unwrap_or(false)
    }

    fn parse(raw: &str, min: u32, max: u32) -> Result<Self, RuntimeError> {
        let mut allowed = vec![false; max as usize + 1];
        for part in raw.split(',') {
            let (range, step) = match part.split_once('/') {
                Some((range, step)) => {
                    let step: u32 =
                        step.parse().map_err(|_| RuntimeError::InvalidCron(format!("bad step in '{raw}'")))?;
                    if step == 0 {
                        return Err(RuntimeError::InvalidCron(format!("zero step in '{raw}'")));
                    }
                    (range, step)
                }
                None => (part, 1),
            };
            let (lo, hi) = if range == "*" {
                (min, max)
            } else if let Some((lo, hi)) = range.split_once('-') {
                let lo: u32 = lo.parse().map_err(|_| RuntimeError::InvalidCron(format!("bad range in '{raw}'")))?;
                let hi: u32 = hi.parse().map_err(|_| RuntimeError::InvalidCron(format!("bad range in '{raw}'")))?;
                (lo, hi)
            } else {
                let v: u32 = range.parse().map_err(|_| RuntimeError::InvalidCron(format!("bad value in '{raw}'")))?;
                (v, v)
            };
            if lo > hi || lo < min || hi > max {
                return Err(RuntimeError::InvalidCron(format!("value out of bounds in '{raw}'")));
            }
            let mut v = lo;
            while v <= hi {
                allowed[v as usize] = true;
                v += step;
            }
        }
        Ok(Field(allowed))
    }
}

/// A parsed 5-field cron expression: minute, hour, day-of-month, month,
/// day-of-week.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    source: String,
    minute: Field,
    hour: Field,
    day_of_month: Field,
    month: Field,
    day_of_week: Field,
}

impl CronSchedule {
    pub fn parse(expr: &str) -> Result<Self, RuntimeError> {
        let source = expr.trim();
        let expanded = match source {
            "@yearly" | "@annually" => "0 0 1 1 *",
            "@monthly" => "0 0 1 * *",
            "@weekly" => "0 0 * * 0",
            "@daily" | "@midnight" => "0 0 * * *",
            "@hourly" => "0 * * * *",
            other => other,
        };
        let fields: Vec<&str> = expanded.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(RuntimeError::InvalidCron(format!("expected 5 fields, got {}: '{expr}'", fields.len())));
        }
        Ok(Self {
            source: source.to_string(),
            minute: Field::parse(fields[0], 0, 59)?,
            hour: Field::parse(fields[1], 0, 23)?,
            day_of_month: Field::parse(fields[2], 1, 31)?,
            month: Field::parse(fields[3], 1, 12)?,
            day_of_week: Field::parse(fields[4], 0, 6)?,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, now: DateTime<Utc>) -> bool {
        self.minute.matches(now.minute())
            && self.hour.matches(now.hour())
            && self.day_of_month.matches(now.day())
            && self.month.matches(now.month())
            && self.day_of_week.matches(now.weekday().num_days_from_sunday())
    }
}

/// Injected by the runtime crate's dispatcher to invoke the user's
/// `scheduled(controller, env, ctx)` handler.
#[async_trait]
pub trait ScheduledHandler: Send + Sync {
    async fn scheduled(&self, cron: &str, scheduled_time_ms: i64) -> Result<(), ForgeError>;
}

pub const TICK_INTERVAL_MS: u64 = 60_000;

/// One per generation: ticks every 60s and fires every configured
/// expression that matches the current minute.
pub struct CronScheduler<C: Clock, H: ScheduledHandler> {
    schedules: Vec<CronSchedule>,
    clock: C,
    handler: Arc<H>,
    stopped: AtomicBool,
}

impl<C: Clock, H: ScheduledHandler> CronScheduler<C, H> {
    pub fn new(schedules: Vec<CronSchedule>, clock: C, handler: Arc<H>) -> Self {
        Self { schedules, clock, handler, stopped: AtomicBool::new(false) }
    }

    /// One tick: fires the handler once per matching expression.
    pub async fn tick_once(&self) {
        let now_ms = self.clock.epoch_ms();
        let now = DateTime::<Utc>::from_timestamp_millis(now_ms).unwrap_or_else(Utc::now);
        for schedule in &self.schedules {
            if schedule.matches(now) {
                if let Err(err) = self.handler.scheduled(schedule.source(), now_ms).await {
                    tracing::warn!(cron = schedule.source(), error = %err, "scheduled handler failed");
                }
            }
        }
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Spawns the tick loop; aborted by the generation on drain.
    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()>
    where
        C: 'static,
        H: 'static,
    {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(TICK_INTERVAL_MS));
            loop {
                ticker.tick().await;
                if self.stopped.load(Ordering::SeqCst) {
                    return;
                }
                self.tick_once().await;
            }
        })
    }
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
