use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::container::{ProcessingState, SignalSourceContainer};
use crate::processing::DataProcessor;
use crate::region::Region;
use crate::variant::DataVariant;

/// Single-cursor video frame extractor. Advances the cursor with
/// wall-clock fractional accumulation so the configured frame rate is
/// preserved regardless of how often `process` is actually called.
pub struct FrameAccessProcessor {
    frame_rate: f64,
    frames_per_batch: u64,
    current_frame: AtomicU64,
    fractional_accum: Mutex<f64>,
    last_tick: Mutex<Option<Instant>>,
    processing: AtomicBool,
}

impl FrameAccessProcessor {
    pub fn new(frame_rate: f64, frames_per_batch: u64) -> Self {
        Self {
            frame_rate,
            frames_per_batch: frames_per_batch.max(1),
            current_frame: AtomicU64::new(0),
            fractional_accum: Mutex::new(0.0),
            last_tick: Mutex::new(None),
            processing: AtomicBool::new(false),
        }
    }

    pub fn current_frame(&self) -> u64 {
        self.current_frame.load(Ordering::Acquire)
    }

    /// Accumulates `elapsed_secs · frame_rate`, advances the cursor by
    /// the integer part, and carries the fractional remainder into the
    /// next call. Exposed directly so callers (and tests) can drive the
    /// cursor without real wall-clock delays.
    pub fn advance_by_elapsed(&self, elapsed_secs: f64) -> u64 {
        let mut accum = self.fractional_accum.lock().unwrap();
        *accum += elapsed_secs * self.frame_rate;
        let whole = accum.floor().max(0.0);
        *accum -= whole;
        self.current_frame.fetch_add(whole as u64, Ordering::AcqRel) + whole as u64
    }

    fn tick(&self) -> f64 {
        let mut last = self.last_tick.lock().unwrap();
        let now = Instant::now();
        let elapsed = last.map(|t| now.duration_since(t).as_secs_f64()).unwrap_or(0.0);
        *last = Some(now);
        elapsed
    }
}

impl DataProcessor for FrameAccessProcessor {
    fn on_attach(&self, _container: Arc<dyn SignalSourceContainer>) {
        *self.last_tick.lock().unwrap() = None;
        *self.fractional_accum.lock().unwrap() = 0.0;
    }

    fn on_detach(&self, _container: Arc<dyn SignalSourceContainer>) {}

    fn process(&self, container: Arc<dyn SignalSourceContainer>) {
        if !container.begin_processing_cycle() {
            return;
        }
        self.processing.store(true, Ordering::Release);

        let elapsed = self.tick();
        self.advance_by_elapsed(elapsed);

        let dims = container.dimensions();
        let start_frame = self.current_frame();
        let mut start = vec![start_frame];
        let mut end = vec![start_frame + self.frames_per_batch - 1];
        for dim in dims.iter().skip(1) {
            start.push(0);
            end.push(dim.size.saturating_sub(1));
        }

        match container.get_region_data(&Region::new(start, end)) {
            Ok(mut data) => {
                let frame = if data.is_empty() { DataVariant::U8(Vec::new()) } else { data.remove(0) };
                container.set_processed_data(vec![frame]);
                let _ = container.update_processing_state(ProcessingState::Processed);
            }
            Err(err) => {
                log::error!("FrameAccessProcessor: {err}");
                let _ = container.update_processing_state(ProcessingState::Error);
            }
        }
        self.processing.store(false, Ordering::Release);
    }

    fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractional_accumulation_preserves_frame_rate() {
        let processor = FrameAccessProcessor::new(30.0, 1);
        let frames: Vec<u64> = [0.010, 0.030, 0.025, 0.045]
            .iter()
            .map(|dt| processor.advance_by_elapsed(*dt))
            .collect();
        assert_eq!(frames, vec![0, 1, 1, 3]);
    }

    #[test]
    fn current_frame_never_regresses() {
        let processor = FrameAccessProcessor::new(24.0, 1);
        let mut last = 0;
        for dt in [0.02, 0.04, 0.01, 0.09, 0.005] {
            let frame = processor.advance_by_elapsed(dt);
            assert!(frame >= last);
            last = frame;
        }
    }
}
