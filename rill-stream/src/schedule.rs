// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Stepped timing policies and their drivers.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

/// The schedule has run to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleDone;

/// A resettable timing policy: step index in, delay plus output out,
/// `None` once the schedule is exhausted.
pub struct Schedule<C> {
    steps: Arc<dyn Fn(usize) -> Option<(Duration, C)> + Send + Sync>,
}

impl<C> Clone for Schedule<C> {
    fn clone(&self) -> Self {
        Self {
            steps: Arc::clone(&self.steps),
        }
    }
}

impl<C> Schedule<C>
where
    C: Clone + Send + Sync + 'static,
{
    /// A schedule from its step function.
    pub fn from_steps<F>(steps: F) -> Self
    where
        F: Fn(usize) -> Option<(Duration, C)> + Send + Sync + 'static,
    {
        Self {
            steps: Arc::new(steps),
        }
    }

    /// Transforms every output.
    pub fn map<D, F>(self, f: F) -> Schedule<D>
    where
        D: Clone + Send + Sync + 'static,
        F: Fn(C) -> D + Send + Sync + 'static,
    {
        let steps = self.steps;
        Schedule {
            steps: Arc::new(move |index| {
                steps(index).map(|(delay, out)| (delay, f(out)))
            }),
        }
    }

    /// An incremental driver over this schedule.
    pub fn driver(&self) -> ScheduleDriver<C> {
        ScheduleDriver {
            schedule: self.clone(),
            index: 0,
            deadline: None,
            last: None,
        }
    }
}

impl Schedule<u64> {
    /// Fires every `interval`, forever, outputting the tick count.
    pub fn spaced(interval: Duration) -> Schedule<u64> {
        Schedule::from_steps(move |index| Some((interval, index as u64 + 1)))
    }

    /// Fires every `interval` up to `times` times, then completes.
    pub fn recurs(times: usize, interval: Duration) -> Schedule<u64> {
        Schedule::from_steps(move |index| {
            (index < times).then_some((interval, index as u64 + 1))
        })
    }
}

/// Drives one [`Schedule`] step by step.
///
/// `next` is cancel safe: the step's deadline is fixed the first time the
/// returned future is polled, so abandoning it and calling `next` again
/// resumes the same step rather than restarting its delay.
pub struct ScheduleDriver<C> {
    schedule: Schedule<C>,
    index: usize,
    deadline: Option<Instant>,
    last: Option<C>,
}

impl<C> ScheduleDriver<C>
where
    C: Clone + Send + Sync + 'static,
{
    /// Waits out the current step's delay and returns its output, or
    /// [`ScheduleDone`] once the schedule is exhausted.
    pub async fn next(&mut self) -> Result<C, ScheduleDone> {
        let (delay, out) = (self.schedule.steps)(self.index).ok_or(ScheduleDone)?;
        let deadline = *self
            .deadline
            .get_or_insert_with(|| Instant::now() + delay);
        tokio::time::sleep_until(deadline).await;
        self.deadline = None;
        self.index += 1;
        self.last = Some(out.clone());
        Ok(out)
    }

    /// The most recent output, if any step has fired.
    pub fn last(&self) -> Option<C> {
        self.last.clone()
    }

    /// Drops the current step's fixed deadline without advancing the
    /// schedule, so the next [`Self::next`] starts the delay afresh.
    pub fn rearm(&mut self) {
        self.deadline = None;
    }

    /// Restarts the schedule from its first step.
    pub fn reset(&mut self) {
        self.index = 0;
        self.deadline = None;
    }
}
