//! Frame-generation order for multi-frame interpolation.
//!
//! Only midpoints of already known frames can be synthesized, so raising the frame rate by a
//! power-of-two factor is a depth-first bisection of each input interval.

use serde::Serialize;

use crate::foundation::error::{NetError, NetResult};

/// Synthesize frame `mid` from frames `left` and `right`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct MidpointStep {
    pub left: usize,
    pub right: usize,
    pub mid: usize,
}

/// `true` for 1, 2, 4, 8, ...
pub fn is_power_of_two_factor(n: usize) -> bool {
    n.is_power_of_two()
}

/// Depth-first bisection order of `[start, end]`.
///
/// `interpolation_order(4, 0)` yields `0,4 -> 2`, `0,2 -> 1`, `2,4 -> 3`. Every split must
/// have an even `left + right`, otherwise the midpoint is not a frame index.
pub fn interpolation_order(end: usize, start: usize) -> NetResult<Vec<MidpointStep>> {
    if end < start {
        return Err(NetError::validation(format!(
            "interpolation range {start}..={end} is reversed"
        )));
    }
    let mut steps = Vec::new();
    bisect(start, end, &mut steps)?;
    Ok(steps)
}

fn bisect(left: usize, right: usize, steps: &mut Vec<MidpointStep>) -> NetResult<()> {
    if right - left <= 1 {
        return Ok(());
    }
    if (left + right) % 2 != 0 {
        return Err(NetError::validation(format!(
            "cannot bisect {left}..={right}: {left} + {right} is odd"
        )));
    }
    let mid = (left + right) / 2;
    steps.push(MidpointStep { left, right, mid });
    bisect(left, mid, steps)?;
    bisect(mid, right, steps)
}

/// Raise the frame rate of a stream of frames by `factor`, handing each output frame to
/// `emit` as soon as its interval is done.
///
/// At most `factor + 1` frames are held at a time: the next input is pulled from `frames`
/// only after every frame of the current interval has been emitted. `midpoint` is called
/// once per synthesized frame, in [`interpolation_order`] within each interval. Returns the
/// number of emitted frames, `(n - 1) * factor + 1` for `n` inputs.
pub fn interpolate_stream<T, I, F, E>(
    frames: I,
    factor: usize,
    mut midpoint: F,
    mut emit: E,
) -> NetResult<usize>
where
    I: IntoIterator<Item = NetResult<T>>,
    F: FnMut(&T, &T) -> NetResult<T>,
    E: FnMut(&T) -> NetResult<()>,
{
    if !is_power_of_two_factor(factor) {
        return Err(NetError::validation(format!(
            "factor must be a power of two, got {factor}"
        )));
    }
    let order = interpolation_order(factor, 0)?;
    let mut frames = frames.into_iter();

    let Some(mut left) = frames.next().transpose()? else {
        return Ok(0);
    };
    emit(&left)?;
    let mut emitted = 1usize;

    for (interval, right) in frames.enumerate() {
        let mut slots: Vec<Option<T>> =
            std::iter::repeat_with(|| None).take(factor + 1).collect();
        slots[0] = Some(left);
        slots[factor] = Some(right?);
        for step in &order {
            let (Some(a), Some(b)) = (&slots[step.left], &slots[step.right]) else {
                return Err(NetError::validation(format!(
                    "step {step:?} reads a frame that is not synthesized yet"
                )));
            };
            let frame = midpoint(a, b)?;
            slots[step.mid] = Some(frame);
        }
        for (index, slot) in slots.iter().enumerate().skip(1) {
            let frame = slot.as_ref().ok_or_else(|| {
                NetError::validation(format!("frame {index} of interval {interval} is missing"))
            })?;
            emit(frame)?;
        }
        emitted += factor;
        tracing::debug!(interval, synthesized = order.len(), "interpolated interval");
        left = slots
            .pop()
            .flatten()
            .ok_or_else(|| NetError::validation("interval lost its right frame"))?;
    }
    Ok(emitted)
}

/// Collecting form of [`interpolate_stream`] for frames already in memory.
pub fn interpolate_sequence<T, F>(frames: &[T], factor: usize, midpoint: F) -> NetResult<Vec<T>>
where
    T: Clone,
    F: FnMut(&T, &T) -> NetResult<T>,
{
    let mut out = Vec::new();
    interpolate_stream(frames.iter().cloned().map(Ok), factor, midpoint, |frame| {
        out.push(frame.clone());
        Ok(())
    })?;
    Ok(out)
}

#[cfg(test)]
#[path = "../tests/unit/schedule.rs"]
mod tests;
