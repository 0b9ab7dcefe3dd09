use crate::foundation::error::{StoryreelError, StoryreelResult};

/// Largest fade allowed, as a fraction of the shortest slot.
pub const MAX_FADE_FRACTION: f64 = 0.4;

/// Split `audio_duration` into `n_slots` positive display durations that sum to it exactly.
///
/// Slot 0 is pinned to `intro_hold` and the last slot to `outro_hold` when those are positive; every
/// other slot shares what is left. The last shared slot takes the floating-point remainder so the
/// sum is exact.
pub fn allocate(
    n_slots: usize,
    audio_duration: f64,
    intro_hold: f64,
    outro_hold: f64,
) -> StoryreelResult<Vec<f64>> {
    if n_slots == 0 {
        return Err(StoryreelError::allocation("no assets to schedule"));
    }
    if !audio_duration.is_finite() || audio_duration <= 0.0 {
        return Err(StoryreelError::allocation(format!(
            "audio duration must be positive, got {audio_duration}"
        )));
    }
    for (what, hold) in [("intro", intro_hold), ("outro", outro_hold)] {
        if !hold.is_finite() || hold < 0.0 {
            return Err(StoryreelError::allocation(format!(
                "{what} hold must be a finite value >= 0, got {hold}"
            )));
        }
    }
    if intro_hold + outro_hold >= audio_duration {
        return Err(StoryreelError::allocation(format!(
            "intro hold {intro_hold}s + outro hold {outro_hold}s leaves no time within {audio_duration}s of audio"
        )));
    }

    if n_slots == 1 {
        return Ok(vec![audio_duration]);
    }
    if intro_hold == 0.0 && outro_hold == 0.0 {
        return Ok(split_evenly(audio_duration, n_slots));
    }

    let pin_intro = intro_hold > 0.0;
    let pin_outro = outro_hold > 0.0;
    let residual = audio_duration - intro_hold - outro_hold;

    // Two slots, both pinned: no interior slot exists to absorb the residual.
    if n_slots == 2 && pin_intro && pin_outro {
        let first = intro_hold + residual / 2.0;
        return Ok(vec![first, audio_duration - first]);
    }

    let pinned = usize::from(pin_intro) + usize::from(pin_outro);
    let interior = split_evenly(residual, n_slots - pinned);
    let mut out = Vec::with_capacity(n_slots);
    if pin_intro {
        out.push(intro_hold);
    }
    out.extend(interior);
    if pin_outro {
        out.push(outro_hold);
    }
    Ok(out)
}

fn split_evenly(total: f64, n: usize) -> Vec<f64> {
    let each = total / n as f64;
    let mut out = vec![each; n];
    let head: f64 = out[..n - 1].iter().sum();
    out[n - 1] = total - head;
    out
}

/// Whole-frame length of each slot at `fps`.
///
/// Slots are cut at the rounded cumulative boundaries, so the counts sum to `round(total * fps)`
/// and per-slot rounding never accumulates. Every slot keeps at least one frame.
pub fn frame_spans(durations: &[f64], fps: u32) -> Vec<u64> {
    let fps = f64::from(fps);
    let mut out = Vec::with_capacity(durations.len());
    let mut elapsed = 0.0;
    let mut prev = 0u64;
    for d in durations {
        elapsed += d;
        let boundary = ((elapsed * fps).round().max(0.0) as u64).max(prev + 1);
        out.push(boundary - prev);
        prev = boundary;
    }
    out
}

/// Clamp a requested fade so it never exceeds 40% of the shortest allocated slot.
pub fn clamp_fade(requested: f64, durations: &[f64]) -> f64 {
    let shortest = durations.iter().copied().fold(f64::INFINITY, f64::min);
    if !shortest.is_finite() {
        return requested.max(0.0);
    }
    requested.max(0.0).min(shortest * MAX_FADE_FRACTION)
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/alloc.rs"]
mod tests;
