/// Running totals for one ping run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunStatistics {
    transmitted: u64,
    received: u64,
    rtt_min: f64,
    rtt_max: f64,
    rtt_sum: f64,
    rtt_sum_squared: f64,
}

impl Default for RunStatistics {
    fn default() -> Self {
        RunStatistics {
            transmitted: 0,
            received: 0,
            rtt_min: f64::MAX,
            rtt_max: 0.0,
            rtt_sum: 0.0,
            rtt_sum_squared: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RttSummary {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
    pub stddev: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub transmitted: u64,
    pub received: u64,
    /// Whole percent, rounded down.
    pub loss_percent: u64,
    /// `None` when nothing was received.
    pub rtt: Option<RttSummary>,
}

impl RunStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transmitted(&self) -> u64 {
        self.transmitted
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn record_transmit(&mut self) {
        self.transmitted += 1;
    }

    /// Records one reply with the given round-trip time in milliseconds.
    pub fn record(&mut self, rtt_ms: f64) {
        self.received += 1;
        self.rtt_min = self.rtt_min.min(rtt_ms);
        self.rtt_max = self.rtt_max.max(rtt_ms);
        self.rtt_sum += rtt_ms;
        self.rtt_sum_squared += rtt_ms * rtt_ms;
    }

    pub fn summary(&self) -> Summary {
        let loss_percent = if self.transmitted > 0 {
            self.transmitted.saturating_sub(self.received) * 100 / self.transmitted
        } else {
            0
        };

        let rtt = (self.received > 0).then(|| {
            let received = self.received as f64;
            let avg = self.rtt_sum / received;
            // Clamp: rounding can push E[x^2] - E[x]^2 slightly below zero.
            let variance = (self.rtt_sum_squared / received - avg * avg).max(0.0);
            RttSummary {
                min: self.rtt_min,
                avg,
                max: self.rtt_max,
                stddev: variance.sqrt(),
            }
        });

        Summary {
            transmitted: self.transmitted,
            received: self.received,
            loss_percent,
            rtt,
        }
    }
}
