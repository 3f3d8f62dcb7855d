//! Weekly sentiment trend per sender

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{NormalizedMessage, Sender};
use crate::utils::centred_rolling_mean;

/// Width of the smoothing window, in weeks
pub const ROLLING_WINDOW_WEEKS: usize = 4;

/// Mean sentiment for one Monday-aligned week
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklySentiment {
    /// Monday starting the week
    pub week_start: NaiveDate,
    /// Messages in the week
    pub messages: usize,
    /// Mean over both senders
    pub overall: Option<f64>,
    /// Mean over your messages
    pub you: Option<f64>,
    /// Mean over their messages
    pub them: Option<f64>,
    /// Centred rolling mean of `overall`
    pub overall_rolling: Option<f64>,
    /// Centred rolling mean of `you`
    pub you_rolling: Option<f64>,
    /// Centred rolling mean of `them`
    pub them_rolling: Option<f64>,
}

/// Weekly series plus whole-history means
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentTrend {
    /// Weeks in ascending order; only weeks with messages appear
    pub weeks: Vec<WeeklySentiment>,
    /// Your mean over all messages
    pub you_mean: Option<f64>,
    /// Their mean over all messages
    pub them_mean: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Running {
    sum: f64,
    count: usize,
}

impl Running {
    fn push(&mut self, value: f32) {
        self.sum += f64::from(value);
        self.count += 1;
    }

    fn merged(self, other: Self) -> Self {
        Self {
            sum: self.sum + other.sum,
            count: self.count + other.count,
        }
    }

    fn mean(self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Build the weekly trend from per-message scores
#[must_use]
pub fn sentiment_trend(messages: &[NormalizedMessage]) -> SentimentTrend {
    let mut weeks: BTreeMap<NaiveDate, [Running; 2]> = BTreeMap::new();
    let mut totals = [Running::default(); 2];

    for message in messages {
        let slot = message.sender.index();
        weeks.entry(message.week_start).or_default()[slot].push(message.sentiment);
        totals[slot].push(message.sentiment);
    }

    let me = Sender::Me.index();
    let them = Sender::Them.index();

    let overall: Vec<Option<f64>> = weeks.values().map(|w| w[me].merged(w[them]).mean()).collect();
    let yours: Vec<Option<f64>> = weeks.values().map(|w| w[me].mean()).collect();
    let theirs: Vec<Option<f64>> = weeks.values().map(|w| w[them].mean()).collect();

    let overall_rolling = centred_rolling_mean(&overall, ROLLING_WINDOW_WEEKS);
    let you_rolling = centred_rolling_mean(&yours, ROLLING_WINDOW_WEEKS);
    let them_rolling = centred_rolling_mean(&theirs, ROLLING_WINDOW_WEEKS);

    let weeks = weeks
        .iter()
        .enumerate()
        .map(|(i, (&week_start, w))| WeeklySentiment {
            week_start,
            messages: w[me].count + w[them].count,
            overall: overall[i],
            you: yours[i],
            them: theirs[i],
            overall_rolling: overall_rolling[i],
            you_rolling: you_rolling[i],
            them_rolling: them_rolling[i],
        })
        .collect();

    SentimentTrend {
        weeks,
        you_mean: totals[me].mean(),
        them_mean: totals[them].mean(),
    }
}
