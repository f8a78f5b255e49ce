use std::{rc::Rc, time::Duration};

use futures::future::{AbortHandle, Abortable, FutureExt, LocalBoxFuture};
use serde_json::{Number, Value};
use tracing::debug;

use super::handle::FormHandle;
use super::tree::NodeId;

/// Step sizes and repeat timing for numeric fields.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericTuning {
    pub integer: bool,
    pub integer_step: i64,
    pub integer_fast_step: Option<i64>,
    pub float_step: f64,
    pub float_fast_step: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Hold time before repeating starts.
    pub repeat_delay: Duration,
    pub repeat_interval: Duration,
}

impl NumericTuning {
    #[inline]
    pub fn step_i64(&self, fast: bool) -> i64 {
        if fast {
            self.integer_fast_step.unwrap_or(self.integer_step)
        } else {
            self.integer_step
        }
    }

    #[inline]
    pub fn step_f64(&self, fast: bool) -> f64 {
        if fast {
            self.float_fast_step.unwrap_or(self.float_step)
        } else {
            self.float_step
        }
    }

    pub fn floats(mut self) -> Self {
        self.integer = false;
        self
    }

    pub fn with_integer_step(mut self, step: i64) -> Self {
        self.integer_step = step.max(1);
        self
    }

    pub fn with_float_step(mut self, step: f64) -> Self {
        self.float_step = step.max(f64::EPSILON);
        self
    }

    pub fn with_bounds(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn with_repeat(mut self, delay: Duration, interval: Duration) -> Self {
        self.repeat_delay = delay;
        self.repeat_interval = interval;
        self
    }

    fn clamp(&self, value: f64) -> f64 {
        let value = self.min.map_or(value, |min| value.max(min));
        self.max.map_or(value, |max| value.min(max))
    }

    /// `value` moved one step in `direction`; non-numeric input counts as 0.
    pub fn step_value(&self, value: &Value, direction: SpinDirection, fast: bool) -> Value {
        let sign = direction.sign();
        if self.integer {
            let current = value
                .as_i64()
                .or_else(|| value.as_str().and_then(|text| text.trim().parse().ok()))
                .unwrap_or(0);
            let next = current.saturating_add(sign * self.step_i64(fast));
            Value::from(self.clamp(next as f64) as i64)
        } else {
            let current = value
                .as_f64()
                .or_else(|| value.as_str().and_then(|text| text.trim().parse().ok()))
                .unwrap_or(0.0);
            let next = self.clamp(current + sign as f64 * self.step_f64(fast));
            Number::from_f64(next).map(Value::Number).unwrap_or(Value::Null)
        }
    }
}

impl Default for NumericTuning {
    fn default() -> Self {
        Self {
            integer: true,
            integer_step: 1,
            integer_fast_step: Some(10),
            float_step: 1.0,
            float_fast_step: Some(10.0),
            min: None,
            max: None,
            repeat_delay: Duration::from_millis(400),
            repeat_interval: Duration::from_millis(80),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinDirection {
    Up,
    Down,
}

impl SpinDirection {
    fn sign(self) -> i64 {
        match self {
            SpinDirection::Up => 1,
            SpinDirection::Down => -1,
        }
    }
}

/// Timer source used by press-and-hold repetition.
pub type Sleeper = Rc<dyn Fn(Duration) -> LocalBoxFuture<'static, ()>>;

/// Owned press-and-hold repetition. Stops on [`SpinRepeat::stop`] and when
/// dropped, so a torn-down widget never leaves a timer behind.
#[derive(Debug)]
pub struct SpinRepeat {
    abort: AbortHandle,
}

impl SpinRepeat {
    pub fn stop(&self) {
        self.abort.abort();
    }

    pub fn is_stopped(&self) -> bool {
        self.abort.is_aborted()
    }
}

impl Drop for SpinRepeat {
    fn drop(&mut self) {
        self.abort.abort();
    }
}

impl FormHandle {
    /// Moves a numeric field one step. Returns whether the value changed.
    pub fn step(&self, id: NodeId, direction: SpinDirection, fast: bool) -> bool {
        self.update(|tree| {
            let Some(field) = tree.field(id) else {
                return false;
            };
            let super::FieldRole::Number(tuning) = field.role() else {
                return false;
            };
            let next = tuning.step_value(&field.get_value(), direction, fast);
            tree.set_value(id, next, false)
        })
    }

    /// Steps once now, then keeps stepping while held. The returned future
    /// must be spawned on the local executor; the handle ends it.
    pub fn start_spin(
        &self,
        id: NodeId,
        direction: SpinDirection,
        fast: bool,
        sleeper: Sleeper,
    ) -> (SpinRepeat, LocalBoxFuture<'static, ()>) {
        let timing = self.read(|tree| match tree.field(id).map(|field| field.role()) {
            Some(super::FieldRole::Number(tuning)) => {
                Some((tuning.repeat_delay, tuning.repeat_interval))
            }
            _ => None,
        });
        let (abort, registration) = AbortHandle::new_pair();
        let form = self.clone();
        let repeat = async move {
            let Some((delay, interval)) = timing else {
                return;
            };
            form.step(id, direction, fast);
            sleeper(delay).await;
            loop {
                form.step(id, direction, fast);
                sleeper(interval).await;
            }
        };
        let task = Abortable::new(repeat, registration).map(move |outcome| {
            if outcome.is_err() {
                debug!(field = %id, "spin released");
            }
        });
        (SpinRepeat { abort }, Box::pin(task))
    }
}
