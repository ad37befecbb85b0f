//! Live signal plot state.
//!
//! The reader thread never touches plot state directly. It sends
//! [`PlotEvent`]s through a channel, and whichever thread owns the display
//! applies them to its [`PlotBuffer`] and reads back the axis ranges.

use crate::error::AppResult;
use crate::serial::channel::{Channel, ChannelMap};
use crate::serial::pipeline::{SampleRecord, SampleSink};
use crossbeam_channel::{Receiver, Sender};
use std::collections::VecDeque;

/// Y-range before any data arrived.
pub const INITIAL_Y_RANGE: (f64, f64) = (-0.5, 3.5);

/// Y-range after a clear.
pub const CLEARED_Y_RANGE: (f64, f64) = (-1.0, 1.0);

/// Message from the acquisition side to the plot owner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlotEvent {
    /// New point on a channel's trace
    Sample {
        /// Trace
        channel: Channel,
        /// Seconds since receive start
        time: f64,
        /// Volts
        value: f64,
    },
    /// Operator marker line
    Marker {
        /// Seconds since receive start
        time: f64,
    },
    /// Drop all traces and markers
    Clear,
    /// Recompute axes and repaint
    Redraw,
}

/// Axis ranges to draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotView {
    /// Visible time span
    pub x_range: (f64, f64),
    /// Visible voltage span
    pub y_range: (f64, f64),
}

/// Time-windowed traces of both channels plus marker times.
#[derive(Debug, Clone)]
pub struct PlotBuffer {
    window: f64,
    traces: ChannelMap<VecDeque<(f64, f64)>>,
    markers: VecDeque<f64>,
    view: PlotView,
}

impl PlotBuffer {
    /// Buffer showing the last `window` seconds.
    pub fn new(window: f64) -> Self {
        Self {
            window,
            traces: ChannelMap::default(),
            markers: VecDeque::new(),
            view: PlotView {
                x_range: (0.0, window),
                y_range: INITIAL_Y_RANGE,
            },
        }
    }

    /// Append a point, trimming the trace to the window.
    pub fn push_sample(&mut self, channel: Channel, time: f64, value: f64) {
        let trace = &mut self.traces[channel];
        trace.push_back((time, value));
        while let (Some(first), Some(last)) = (trace.front(), trace.back()) {
            if last.0 - first.0 > self.window {
                trace.pop_front();
            } else {
                break;
            }
        }
    }

    /// Add a marker line.
    pub fn push_marker(&mut self, time: f64) {
        self.markers.push_back(time);
    }

    /// Forget all data and reset the axes.
    pub fn clear(&mut self) {
        for (_, trace) in self.traces.iter_mut() {
            trace.clear();
        }
        self.markers.clear();
        self.view = PlotView {
            x_range: (0.0, self.window),
            y_range: CLEARED_Y_RANGE,
        };
        self.refresh();
    }

    /// Recompute axis ranges and prune markers left of the view.
    ///
    /// The x-axis stays at `[0, window]` until data passes the window, then
    /// follows the newest point. The y-axis fits the data with a 10 % margin
    /// once two points exist; otherwise it keeps its previous range.
    pub fn refresh(&mut self) -> PlotView {
        let points = || self.traces.iter().flat_map(|(_, trace)| trace.iter());

        if let Some(latest) = points().map(|p| p.0).reduce(f64::max) {
            self.view.x_range = if latest <= self.window {
                (0.0, self.window)
            } else {
                (latest - self.window, latest)
            };
        }

        let x_min = self.view.x_range.0;
        while self.markers.front().is_some_and(|t| *t < x_min) {
            self.markers.pop_front();
        }

        if points().count() > 1 {
            let (min, max) = points().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.1), hi.max(p.1))
            });
            let range = max - min;
            let margin = if range < 1e-9 { 0.2 } else { range * 0.1 };
            self.view.y_range = (min - margin, max + margin);
        }
        self.view
    }

    /// Apply one event. Returns `true` when the view was recomputed.
    pub fn apply(&mut self, event: PlotEvent) -> bool {
        match event {
            PlotEvent::Sample {
                channel,
                time,
                value,
            } => {
                self.push_sample(channel, time, value);
                false
            }
            PlotEvent::Marker { time } => {
                self.push_marker(time);
                false
            }
            PlotEvent::Clear => {
                self.clear();
                true
            }
            PlotEvent::Redraw => {
                self.refresh();
                true
            }
        }
    }

    /// Apply every event waiting on `events` without blocking.
    ///
    /// Returns the number of redraws requested.
    pub fn drain(&mut self, events: &Receiver<PlotEvent>) -> usize {
        events.try_iter().filter(|event| self.apply(*event)).count()
    }

    /// Current axis ranges.
    pub fn view(&self) -> PlotView {
        self.view
    }

    /// Points currently held for `channel`, oldest first.
    pub fn trace(&self, channel: Channel) -> &VecDeque<(f64, f64)> {
        &self.traces[channel]
    }

    /// Marker times still in view.
    pub fn markers(&self) -> &VecDeque<f64> {
        &self.markers
    }

    /// Visible time span.
    pub fn window(&self) -> f64 {
        self.window
    }
}

/// Sink forwarding samples to a plot owner.
#[derive(Debug, Clone)]
pub struct PlotFeed {
    events: Sender<PlotEvent>,
}

impl PlotFeed {
    /// Feed sending into `events`.
    pub fn new(events: Sender<PlotEvent>) -> Self {
        Self { events }
    }
}

// A closed or full plot is not an acquisition failure, so send errors are ignored.
impl SampleSink for PlotFeed {
    fn accept(&mut self, record: &SampleRecord) -> AppResult<()> {
        let _ = self.events.try_send(PlotEvent::Sample {
            channel: record.channel,
            time: record.time,
            value: record.voltage,
        });
        Ok(())
    }

    fn end_batch(&mut self) -> AppResult<()> {
        let _ = self.events.try_send(PlotEvent::Redraw);
        Ok(())
    }
}
