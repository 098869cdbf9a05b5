//! Keyframe interpolation.
//!
//! A clip's keyframes are turned into a chronological list of [`TweenStep`]s (percent fields
//! converted to milliseconds, relative keyframes resolved against their absolute neighbour), and
//! sampled by running every step that has started up to the requested local time.

use crate::animation::ease::Ease;
use crate::animation::keyframe::{Keyframe, KeyframeKind, KeyframeProps, Lerp};
use crate::animation::presets::Transition;

/// One resolved tween on the clip-local timeline.
#[derive(Clone, Debug, PartialEq)]
pub struct TweenStep {
    pub kind: KeyframeKind,
    pub start_ms: f64,
    pub duration_ms: f64,
    pub ease: Ease,
    /// Absolute target values (relative deltas already applied).
    pub target: KeyframeProps,
}

/// Where a clip-local time falls relative to the clip's visible window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Phase {
    /// Outside every window: nothing is drawn.
    Hidden,
    /// Inside the enter transition; `progress` runs `0 -> 1` towards the active window.
    Entering { progress: f64 },
    /// `0 <= local < duration`.
    Active,
    /// Inside the exit transition; `progress` runs `0 -> 1` away from the active window.
    Exiting { progress: f64 },
}

impl Phase {
    pub fn is_visible(self) -> bool {
        !matches!(self, Phase::Hidden)
    }
}

/// Classify `local_ms` against the active window and both transition windows.
pub fn phase_at(local_ms: f64, duration_ms: f64, enter: &Transition, exit: &Transition) -> Phase {
    if local_ms >= 0.0 && local_ms < duration_ms {
        return Phase::Active;
    }
    if local_ms < 0.0 && enter.is_active() && -local_ms <= enter.duration_ms {
        return Phase::Entering {
            progress: (enter.duration_ms + local_ms) / enter.duration_ms,
        };
    }
    let past_end = local_ms - duration_ms;
    if local_ms >= duration_ms && exit.is_active() && past_end < exit.duration_ms {
        return Phase::Exiting {
            progress: past_end / exit.duration_ms,
        };
    }
    Phase::Hidden
}

/// Resolve keyframes into chronologically ordered tween steps.
///
/// Relative keyframes whose chronological neighbour is missing or not absolute have no defined
/// target and are dropped.
pub fn build_steps(keyframes: &[Keyframe], duration_ms: f64) -> Vec<TweenStep> {
    let mut sorted: Vec<&Keyframe> = keyframes.iter().collect();
    sorted.sort_by(|a, b| a.time_point.total_cmp(&b.time_point));

    let to_ms = |percent: f64| percent / 100.0 * duration_ms;

    sorted
        .iter()
        .enumerate()
        .filter_map(|(i, k)| {
            let anchor = match k.kind {
                KeyframeKind::Absolute => None,
                KeyframeKind::RelativeToNext => Some(sorted.get(i + 1)?),
                KeyframeKind::RelativeToPrevious => Some(sorted.get(i.checked_sub(1)?)?),
            };
            let target = match anchor {
                None => k.props,
                Some(a) if a.kind == KeyframeKind::Absolute => a.props.offset_by(&k.props),
                Some(_) => return None,
            };
            Some(TweenStep {
                kind: k.kind,
                start_ms: to_ms(k.time_point),
                duration_ms: to_ms(k.duration),
                ease: k.ease,
                target,
            })
        })
        .collect()
}

/// Property state at `local_ms`. `None` when there are no steps.
pub fn sample_steps(steps: &[TweenStep], local_ms: f64) -> Option<KeyframeProps> {
    let mut state = steps.first()?.target;
    for step in steps {
        if local_ms < step.start_ms {
            break;
        }
        let end = step.start_ms + step.duration_ms;
        if step.duration_ms <= 0.0 || local_ms >= end {
            state = step.target;
            continue;
        }
        let p = (local_ms - step.start_ms) / step.duration_ms;
        state = KeyframeProps::lerp(&state, &step.target, step.ease.apply(p));
        break;
    }
    Some(state)
}

/// Concrete property snapshot for one render call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedProps {
    pub phase: Phase,
    pub props: KeyframeProps,
}

/// Derive the effective properties of a clip at `local_ms`, including enter/exit transitions.
///
/// Returns `None` when the clip draws nothing at that time.
pub fn resolve_properties(
    keyframes: &[Keyframe],
    duration_ms: f64,
    enter: &Transition,
    exit: &Transition,
    local_ms: f64,
) -> Option<ResolvedProps> {
    let phase = phase_at(local_ms, duration_ms, enter, exit);
    let steps = build_steps(keyframes, duration_ms);

    let props = match phase {
        Phase::Hidden => return None,
        Phase::Active => sample_steps(&steps, local_ms)?,
        Phase::Entering { progress } => {
            let first = steps
                .iter()
                .find(|s| s.kind == KeyframeKind::Absolute)
                .or_else(|| steps.first())?
                .target;
            let from = enter.preset.apply(&first);
            let t = enter.preset.ease().unwrap_or_default().apply(progress);
            KeyframeProps::lerp(&from, &first, t)
        }
        Phase::Exiting { progress } => {
            let last = sample_steps(&steps, duration_ms)?;
            let to = exit.preset.apply(&last);
            let t = exit.preset.ease().unwrap_or_default().apply(progress);
            KeyframeProps::lerp(&last, &to, t)
        }
    };

    Some(ResolvedProps { phase, props })
}

#[cfg(test)]
#[path = "../../tests/unit/animation/resolve.rs"]
mod tests;
