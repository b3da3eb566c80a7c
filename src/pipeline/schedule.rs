//! Weekly trigger for unattended runs.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Datelike, Days, Local, NaiveTime, TimeDelta, TimeZone, Weekday};

use crate::error::Result;
use crate::models::{RunOutcome, ScheduleSettings};

/// Upper bound on a single sleep, so suspended machines catch up promptly.
const POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Fires once a week at a fixed weekday and wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklySchedule {
    day: Weekday,
    time: NaiveTime,
}

impl WeeklySchedule {
    pub fn new(day: Weekday, time: NaiveTime) -> Self {
        Self { day, time }
    }

    pub fn from_settings(settings: &ScheduleSettings) -> Self {
        Self::new(settings.day, settings.time)
    }

    /// First fire time strictly after `now`, in `now`'s timezone.
    pub fn next_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Tz> {
        let tz = now.timezone();
        let today = now.date_naive();

        for offset in 0..=7 {
            let date = today + Days::new(offset);
            if date.weekday() != self.day {
                continue;
            }

            let naive = date.and_time(self.time);
            // A time inside a DST gap does not exist that day; use the hour after.
            let candidate = naive
                .and_local_timezone(tz.clone())
                .earliest()
                .or_else(|| {
                    (naive + TimeDelta::hours(1))
                        .and_local_timezone(tz.clone())
                        .earliest()
                });

            if let Some(candidate) = candidate {
                if candidate > *now {
                    return candidate;
                }
            }
        }

        now.clone() + TimeDelta::days(7)
    }
}

impl std::fmt::Display for WeeklySchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let day = match self.day {
            Weekday::Mon => "Monday",
            Weekday::Tue => "Tuesday",
            Weekday::Wed => "Wednesday",
            Weekday::Thu => "Thursday",
            Weekday::Fri => "Friday",
            Weekday::Sat => "Saturday",
            Weekday::Sun => "Sunday",
        };
        write!(f, "Every {} at {}", day, self.time.format("%H:%M"))
    }
}

/// Run `job` at every fire time until Ctrl+C.
///
/// Runs never overlap: the next fire time is computed only after the
/// previous job returned.
pub async fn run_weekly<F, Fut>(schedule: &WeeklySchedule, mut job: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RunOutcome>,
{
    log::info!("Schedule: {} (local time)", schedule);

    loop {
        let next = schedule.next_after(&Local::now());
        log::info!("Next run at {}", next.format("%A %Y-%m-%d %H:%M %:z"));

        loop {
            let now = Local::now();
            if now >= next {
                break;
            }
            let wait = (next - now).to_std().unwrap_or_default().min(POLL_INTERVAL);

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                signal = tokio::signal::ctrl_c() => {
                    signal?;
                    log::info!("Scheduler stopped by user");
                    return Ok(());
                }
            }
        }

        log::info!("Scheduled job triggered");
        let outcome = job().await;
        if outcome.success {
            log::info!("Job completed: {} new results sent", outcome.novel_results);
        } else {
            log::error!(
                "Job failed after stage {}: {}",
                outcome.stage,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}
